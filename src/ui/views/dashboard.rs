use super::update_modal::UpdateModal;
use super::{show_failure, take_settled};
use crate::api::types::{ExampleData, NewExampleData, Page};
use crate::api::{Mutation, Query};
use crate::cache::{MutationId, Subscription};
use crate::client::Api;
use crate::pagination::PaginationState;
use crate::ui::components::{
  draw_loader, Field, Form, FormEvent, KeyResult, PaginationBar, PaginationEvent,
};
use crate::ui::renderfns::truncate;
use crate::ui::view::{Access, ShortcutInfo, View, ViewAction};
use crate::ui::views::DataDetailView;
use crate::validation::{check_required, MAX_EMAIL_LEN, MAX_MESSAGE_LEN, MAX_NAME_LEN};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

const ADD_ERROR: &str =
  "There was an error adding the data. Please check the details and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Table,
  AddForm,
}

/// The signed-in user's data: an add form above a paginated table
pub struct DashboardView {
  pagination: PaginationState,
  list: Subscription,
  table_state: TableState,
  add_form: Form,
  pending_add: Option<MutationId>,
  modal: Option<UpdateModal>,
  focus: Focus,
  ticks: usize,
}

impl DashboardView {
  pub fn new(api: &mut Api) -> Self {
    let pagination = PaginationState::new(api.default_limit());
    let list = api.subscribe(Query::GetData(pagination.list_args()));

    Self {
      pagination,
      list,
      table_state: TableState::default(),
      add_form: Form::new(vec![
        Field::text("name", "Name", MAX_NAME_LEN),
        Field::email("email", "Email", MAX_EMAIL_LEN),
        Field::text("message", "Comments", MAX_MESSAGE_LEN),
      ]),
      pending_add: None,
      modal: None,
      focus: Focus::Table,
      ticks: 0,
    }
  }

  fn page(&self, api: &Api) -> Option<Page<ExampleData>> {
    api.entry(&self.list).and_then(|e| e.decode())
  }

  fn selected(&self, api: &Api) -> Option<ExampleData> {
    let index = self.table_state.selected()?;
    self.page(api).and_then(|p| p.results.into_iter().nth(index))
  }

  fn bar(&self, api: &Api) -> PaginationBar {
    let total = self.page(api).map(|p| p.pagination.total_pages).unwrap_or(0);
    PaginationBar::new(total, self.pagination.page_number(), self.pagination.page_limit())
  }

  /// Subscribe to the current page, then drop the old subscription
  fn resubscribe(&mut self, api: &mut Api) {
    let list = api.subscribe(Query::GetData(self.pagination.list_args()));
    let old = std::mem::replace(&mut self.list, list);
    api.unsubscribe(old);
    self.table_state.select(None);
  }

  fn submit_add(&mut self, api: &mut Api) {
    if self.pending_add.is_some() {
      return;
    }
    let entry = NewExampleData {
      name: self.add_form.value("name"),
      email: self.add_form.value("email"),
      message: self.add_form.value("message"),
    };

    self.add_form.hide_banner();
    let errors = self.add_form.errors_mut();
    check_required(errors, "name", &entry.name);
    api.validator().check_email(errors, &entry.email);
    if !self.add_form.errors().is_empty() {
      return;
    }
    self.pending_add = Some(api.mutate(Mutation::AddData(entry)));
  }

  fn handle_table_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    match self.bar(api).handle_key(key) {
      KeyResult::Event(PaginationEvent::GoTo(page)) => {
        self.pagination.set_page(page);
        self.resubscribe(api);
        return ViewAction::None;
      }
      KeyResult::Event(PaginationEvent::Limit(limit)) => {
        self.pagination.set_page_limit(limit);
        self.resubscribe(api);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('a') => self.focus = Focus::AddForm,
      KeyCode::Char('r') => api.refetch(&self.list),
      KeyCode::Char('u') => {
        if let Some(record) = self.selected(api) {
          self.modal = Some(UpdateModal::new(record));
        }
      }
      KeyCode::Char('d') => {
        if let Some(record) = self.selected(api) {
          // Result is reported by the flash message
          let id = api.mutate(Mutation::DeleteData(record.id));
          api.release_mutation(id);
        }
      }
      KeyCode::Enter => {
        if let Some(record) = self.selected(api) {
          return ViewAction::Push(Box::new(DataDetailView::new(record.id, api)));
        }
      }
      KeyCode::Char('q') => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect, api: &Api) {
    let entry = api.entry(&self.list);
    let page = self.page(api);

    let title = match (&page, entry) {
      (Some(page), _) => format!(" Data ({}) ", page.pagination.count),
      (None, Some(e)) if e.is_error() => " Data (error) ".to_string(),
      _ => " Data (loading...) ".to_string(),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(if self.focus == Focus::Table {
        Style::default().fg(Color::Blue)
      } else {
        Style::default().fg(Color::DarkGray)
      });

    let Some(page) = page else {
      let failed = entry.is_some_and(|e| e.is_error());
      if failed {
        let paragraph = Paragraph::new("Failed to load data. Press 'r' to retry.")
          .block(block)
          .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
      } else {
        frame.render_widget(block, area);
        draw_loader(frame, area, self.ticks);
      }
      return;
    };

    if page.results.is_empty() {
      let paragraph = Paragraph::new("No data yet. Press 'a' to add some.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    if self.table_state.selected().is_none() {
      self.table_state.select(Some(0));
    }
    if let Some(selected) = self.table_state.selected() {
      if selected >= page.results.len() {
        self.table_state.select(Some(page.results.len() - 1));
      }
    }

    let header = Row::new(["ID", "Name", "Email", "Comments"])
      .style(Style::default().fg(Color::Yellow).bold());
    let rows: Vec<Row> = page
      .results
      .iter()
      .map(|row| {
        Row::new(vec![
          Cell::from(row.id.to_string()).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&row.name, 24)),
          Cell::from(truncate(&row.email, 32)),
          Cell::from(truncate(row.message.as_deref().unwrap_or(""), 60)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(6),
        Constraint::Length(24),
        Constraint::Length(32),
        Constraint::Min(10),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);

    // Still showing the previous result while a refetch runs
    if entry.is_some_and(|e| e.is_fetching()) {
      draw_loader(frame, area, self.ticks);
    }
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    if let Some(modal) = &mut self.modal {
      if let KeyResult::Event(()) = modal.handle_key(key, api) {
        self.modal = None;
      }
      return ViewAction::None;
    }

    match self.focus {
      Focus::AddForm => {
        match self.add_form.handle_key(key) {
          KeyResult::Event(FormEvent::Submit) => self.submit_add(api),
          KeyResult::Event(FormEvent::Cancel) => self.focus = Focus::Table,
          KeyResult::Handled | KeyResult::NotHandled => {}
        }
        ViewAction::None
      }
      Focus::Table => self.handle_table_key(key, api),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, api: &Api) {
    let form_height = self.add_form.height() + 2;
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(form_height),
        Constraint::Min(5),
        Constraint::Length(1),
      ])
      .split(area);

    let form_block = Block::default()
      .title(" Add data ")
      .borders(Borders::ALL)
      .border_style(if self.focus == Focus::AddForm {
        Style::default().fg(Color::Blue)
      } else {
        Style::default().fg(Color::DarkGray)
      });
    let form_area = form_block.inner(chunks[0]);
    frame.render_widget(form_block, chunks[0]);
    self.add_form.render(frame, form_area, self.focus == Focus::AddForm);

    self.render_table(frame, chunks[1], api);
    self.bar(api).render(frame, chunks[2]);

    if let Some(modal) = &self.modal {
      modal.render(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    format!("Dashboard [page {}]", self.pagination.page_number())
  }

  fn access(&self) -> Access {
    Access::Private
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    self.ticks = self.ticks.wrapping_add(1);

    match take_settled(api, &mut self.pending_add) {
      Some(Ok(_)) => {
        self.add_form.clear();
        self.focus = Focus::Table;
      }
      Some(Err(err)) => show_failure(&mut self.add_form, &err, ADD_ERROR),
      None => {}
    }

    if let Some(modal) = &mut self.modal {
      if modal.tick(api) {
        self.modal = None;
      }
    }

    // Deleting the last row of the last page leaves us past the end
    let total = self.page(api).map(|p| p.pagination.total_pages);
    if let Some(total) = total {
      if total > 0 && self.pagination.page_number() > total {
        self.pagination.set_page(total);
        self.resubscribe(api);
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.modal.is_some() || self.focus == Focus::AddForm {
      return vec![
        ShortcutInfo::new("enter", "save").with_priority(10),
        ShortcutInfo::new("tab", "next field").with_priority(20),
        ShortcutInfo::new("esc", "close").with_priority(30),
      ];
    }
    vec![
      ShortcutInfo::new("a", "add").with_priority(10),
      ShortcutInfo::new("u", "update").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("enter", "open").with_priority(40),
      ShortcutInfo::new("[/]", "page").with_priority(50),
      ShortcutInfo::new("+", "page size").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
      ShortcutInfo::new("^l", "logout").with_priority(80),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
