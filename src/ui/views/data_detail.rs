use super::take_settled;
use super::update_modal::UpdateModal;
use crate::api::types::ExampleData;
use crate::api::{Mutation, Query};
use crate::cache::{MutationId, Subscription};
use crate::client::Api;
use crate::ui::components::{draw_loader, KeyResult};
use crate::ui::view::{Access, ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// One entry, read from its own cache entry so optimistic edits show here
/// before the server confirms them
pub struct DataDetailView {
  id: u64,
  record: Subscription,
  modal: Option<UpdateModal>,
  pending_delete: Option<MutationId>,
  ticks: usize,
}

impl DataDetailView {
  pub fn new(id: u64, api: &mut Api) -> Self {
    Self {
      id,
      record: api.subscribe(Query::GetDataPoint(id)),
      modal: None,
      pending_delete: None,
      ticks: 0,
    }
  }

  fn data(&self, api: &Api) -> Option<ExampleData> {
    api.entry(&self.record).and_then(|e| e.decode())
  }

  fn render_record(&self, frame: &mut Frame, area: Rect, api: &Api) {
    let block = Block::default()
      .title(format!(" Entry #{} ", self.id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let entry = api.entry(&self.record);
    let Some(record) = self.data(api) else {
      match entry.and_then(|e| e.error()) {
        Some(err) => {
          let text = format!("Failed to load entry: {}. Press 'r' to retry.", err);
          let paragraph = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(Color::Red));
          frame.render_widget(paragraph, area);
        }
        None => {
          frame.render_widget(block, area);
          draw_loader(frame, area, self.ticks);
        }
      }
      return;
    };

    let label = |text: &'static str| {
      Span::styled(format!("{:<10}", text), Style::default().fg(Color::DarkGray))
    };
    let created = record
      .created_at
      .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
      .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
      Line::from(vec![
        label("Name"),
        Span::styled(record.name.clone(), Style::default().bold()),
      ]),
      Line::from(vec![label("Email"), Span::raw(record.email.clone())]),
      Line::from(vec![label("Created"), Span::raw(created)]),
      Line::raw(""),
      Line::from(label("Comments")),
    ];
    lines.extend(
      record
        .message
        .as_deref()
        .unwrap_or("")
        .lines()
        .map(|l| Line::raw(l.to_string())),
    );
    if self.pending_delete.is_some() {
      lines.push(Line::raw(""));
      lines.push(Line::styled("Deleting...", Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }
}

impl View for DataDetailView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    if let Some(modal) = &mut self.modal {
      if let KeyResult::Event(()) = modal.handle_key(key, api) {
        self.modal = None;
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('u') => {
        if let Some(record) = self.data(api) {
          self.modal = Some(UpdateModal::new(record));
        }
      }
      KeyCode::Char('d') if self.pending_delete.is_none() => {
        self.pending_delete = Some(api.mutate(Mutation::DeleteData(self.id)));
      }
      KeyCode::Char('r') => api.refetch(&self.record),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, api: &Api) {
    self.render_record(frame, area, api);
    if let Some(modal) = &self.modal {
      modal.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    format!("Entry #{}", self.id)
  }

  fn access(&self) -> Access {
    Access::Private
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    self.ticks = self.ticks.wrapping_add(1);

    if let Some(modal) = &mut self.modal {
      if modal.tick(api) {
        self.modal = None;
      }
    }

    match take_settled(api, &mut self.pending_delete) {
      Some(Ok(_)) => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.modal.is_some() {
      return vec![
        ShortcutInfo::new("enter", "save").with_priority(10),
        ShortcutInfo::new("esc", "close").with_priority(30),
      ];
    }
    vec![
      ShortcutInfo::new("u", "update").with_priority(10),
      ShortcutInfo::new("d", "delete").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(25),
      ShortcutInfo::new("esc", "back").with_priority(30),
    ]
  }
}
