use super::{draw_card, hint, show_failure, take_settled};
use crate::api::types::ActivateRequest;
use crate::api::Mutation;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::{draw_notice, Field, Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::LoginView;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const ACTIVATE_ERROR: &str = "There was an error with your registration.";
const ACTIVATED: &str = "Thanks for activating your email address. You can now Login here.";

/// Confirms an account with the id and token from the activation email.
/// Given both up front it sends them on the first tick.
pub struct ActivateView {
  form: Form,
  pending: Option<MutationId>,
  auto_submit: bool,
  activated: bool,
}

impl ActivateView {
  pub fn new(link: Option<ActivateRequest>) -> Self {
    let mut form = Form::new(vec![
      Field::text("id", "User id", 64),
      Field::text("token", "Token", 128),
    ]);
    let auto_submit = link.is_some();
    if let Some(link) = link {
      form.set_value("id", &link.id);
      form.set_value("token", &link.token);
    }

    Self {
      form,
      pending: None,
      auto_submit,
      activated: false,
    }
  }

  fn submit(&mut self, api: &mut Api) {
    if self.pending.is_some() {
      return;
    }
    self.form.hide_banner();
    self.pending = Some(api.mutate(Mutation::ActivateUser(ActivateRequest {
      id: self.form.value("id"),
      token: self.form.value("token"),
    })));
  }
}

impl View for ActivateView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    if self.activated {
      return ViewAction::Replace(Box::new(LoginView::new()));
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(api),
      KeyResult::Event(FormEvent::Cancel) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _api: &Api) {
    if self.activated {
      let inner = draw_card(frame, area, "Activate account", 5);
      let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1)])
        .split(inner);
      draw_notice(frame, chunks[0], ACTIVATED, Color::Green);
      frame.render_widget(hint("", "any key", "Login"), chunks[1]);
      return;
    }

    let inner = draw_card(frame, area, "Activate account", self.form.height() + 2);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(self.form.height()),
        Constraint::Min(0),
      ])
      .split(inner);
    let text = if self.pending.is_some() {
      "Activating..."
    } else {
      "Enter the id and token from your activation email. "
    };
    frame.render_widget(hint(text, "enter", "activate"), chunks[0]);
    self.form.render(frame, chunks[1], true);
  }

  fn breadcrumb_label(&self) -> String {
    "Activate".to_string()
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    if self.auto_submit {
      self.auto_submit = false;
      self.submit(api);
    }
    match take_settled(api, &mut self.pending) {
      Some(Ok(_)) => self.activated = true,
      Some(Err(err)) => show_failure(&mut self.form, &err, ACTIVATE_ERROR),
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "activate").with_priority(10),
      ShortcutInfo::new("esc", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::Method;
  use crate::api::{ApiError, ErrorBody};
  use crate::ui::views::testing::{api, key};
  use crossterm::event::KeyCode;
  use serde_json::json;

  fn link() -> Option<ActivateRequest> {
    Some(ActivateRequest {
      id: "MQ".to_string(),
      token: "abc-123".to_string(),
    })
  }

  #[tokio::test]
  async fn test_prefilled_link_submits_on_first_tick() {
    let fake = FakeTransport::new();
    fake.respond(Method::Post, "/auth/activate", Ok(json!({"user": null, "token": null})));
    let mut api = api(&fake, None);
    let mut view = ActivateView::new(link());

    view.tick(&mut api);
    assert!(view.pending.is_some());
    api.settle().await;
    view.tick(&mut api);

    assert!(view.activated);
    assert_eq!(fake.call_count(Method::Post, "/auth/activate"), 1);
    assert!(matches!(
      view.handle_key(key(KeyCode::Enter), &mut api),
      ViewAction::Replace(_)
    ));
  }

  #[tokio::test]
  async fn test_failure_uses_default_message() {
    let fake = FakeTransport::new();
    fake.respond(
      Method::Post,
      "/auth/activate",
      Err(ApiError::Status {
        status: 400,
        body: ErrorBody::default(),
      }),
    );
    let mut api = api(&fake, None);
    let mut view = ActivateView::new(link());

    view.tick(&mut api);
    api.settle().await;
    view.tick(&mut api);

    assert!(!view.activated);
    assert_eq!(view.form.banner(), Some(ACTIVATE_ERROR));
  }

  #[tokio::test]
  async fn test_empty_form_waits_for_input() {
    let fake = FakeTransport::new();
    let mut api = api(&fake, None);
    let mut view = ActivateView::new(None);

    view.tick(&mut api);
    assert!(view.pending.is_none());
  }
}
