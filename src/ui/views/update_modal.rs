use super::{show_failure, take_settled};
use crate::api::types::{DataPatch, ExampleData};
use crate::api::Mutation;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::{Field, Form, FormEvent, KeyResult};
use crate::ui::renderfns::centered;
use crate::validation::{MAX_MESSAGE_LEN, MAX_NAME_LEN};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const UPDATE_ERROR: &str = "There was an error updating the entry. Please try again.";

/// Overlay editing one entry. The email is shown but cannot be changed.
pub struct UpdateModal {
  record: ExampleData,
  form: Form,
  pending: Option<MutationId>,
}

impl UpdateModal {
  pub fn new(record: ExampleData) -> Self {
    let mut form = Form::new(vec![
      Field::text("name", "Name", MAX_NAME_LEN),
      Field::read_only("email", "Email"),
      Field::text("message", "Comments", MAX_MESSAGE_LEN),
    ]);
    form.set_value("name", &record.name);
    form.set_value("email", &record.email);
    form.set_value("message", record.message.as_deref().unwrap_or_default());

    Self {
      record,
      form,
      pending: None,
    }
  }

  /// Returns `Event(())` when the modal should close. Esc while the update
  /// is in flight aborts it.
  pub fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> KeyResult<()> {
    if let Some(id) = self.pending {
      if key.code == KeyCode::Esc {
        api.abort_mutation(id);
        api.release_mutation(id);
        self.pending = None;
        return KeyResult::Event(());
      }
      return KeyResult::Handled;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => {
        self.form.hide_banner();
        let patch = DataPatch::from_form(
          &self.record,
          &self.form.value("name"),
          &self.form.value("message"),
        );
        self.pending = Some(api.mutate(Mutation::UpdateData(patch)));
        KeyResult::Handled
      }
      KeyResult::Event(FormEvent::Cancel) => KeyResult::Event(()),
      KeyResult::Handled => KeyResult::Handled,
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Returns true once the update has gone through
  pub fn tick(&mut self, api: &mut Api) -> bool {
    match take_settled(api, &mut self.pending) {
      Some(Ok(_)) => true,
      Some(Err(err)) => {
        show_failure(&mut self.form, &err, UPDATE_ERROR);
        false
      }
      None => false,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let overlay_area = centered(area, 64, self.form.height() + 4);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" Update entry #{} ", self.record.id));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(0), Constraint::Length(1)])
      .split(inner);
    self.form.render(frame, chunks[0], self.pending.is_none());

    let status = if self.pending.is_some() {
      Paragraph::new("Saving... (esc cancels)").style(Style::default().fg(Color::Yellow))
    } else {
      Paragraph::new("enter saves, esc closes").style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(status, chunks[1]);
  }
}
