use super::{draw_card, hint, show_failure, take_settled, GENERIC_ERROR};
use crate::api::types::{PasswordResetConfirm, PasswordResetRequest};
use crate::api::Mutation;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::{draw_notice, Field, Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::LoginView;
use crate::validation::{MAX_EMAIL_LEN, PASSWORDS_DIFFER, PASSWORD_HELP};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const LINK_SENT: &str = "Please check your email for a link to change your password.";
const CHANGED: &str = "Thanks! Your password has now been changed. Log in";
const CHANGE_ERROR: &str =
  "There was an issue changing your password. Please request a new link.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
  /// Ask for a reset link by email
  Request,
  /// Set a new password with the token from the link
  Change { token: String },
}

pub struct PasswordResetView {
  mode: Mode,
  form: Form,
  pending: Option<MutationId>,
  done: bool,
}

impl PasswordResetView {
  pub fn request() -> Self {
    Self {
      mode: Mode::Request,
      form: Form::new(vec![Field::email("email", "Email", MAX_EMAIL_LEN)]),
      pending: None,
      done: false,
    }
  }

  pub fn change(token: String) -> Self {
    Self {
      mode: Mode::Change { token },
      form: Form::new(vec![
        Field::secret("password", "New password", 100),
        Field::secret("password2", "Confirm new password", 100),
      ]),
      pending: None,
      done: false,
    }
  }

  fn submit(&mut self, api: &mut Api) {
    if self.pending.is_some() {
      return;
    }
    self.form.hide_banner();

    let mutation = match &self.mode {
      Mode::Request => {
        let email = self.form.value("email");
        api.validator().check_email(self.form.errors_mut(), &email);
        if !self.form.errors().is_empty() {
          return;
        }
        Mutation::RequestNewPassword(PasswordResetRequest { email })
      }
      Mode::Change { token } => {
        let password = self.form.value("password");
        // Mismatch is reported before the password rules
        if password != self.form.value("password2") {
          self.form.errors_mut().set("password2", PASSWORDS_DIFFER);
          return;
        }
        if !api.validator().valid_password(&password) {
          self.form.errors_mut().set("password", PASSWORD_HELP);
          return;
        }
        Mutation::ChangeNewPassword(PasswordResetConfirm {
          password,
          token: token.clone(),
        })
      }
    };
    self.pending = Some(api.mutate(mutation));
  }

  fn title(&self) -> &'static str {
    match self.mode {
      Mode::Request => "Reset password",
      Mode::Change { .. } => "Change password",
    }
  }
}

impl View for PasswordResetView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    if self.done {
      return match self.mode {
        Mode::Request => ViewAction::Pop,
        Mode::Change { .. } => ViewAction::Replace(Box::new(LoginView::new())),
      };
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(api),
      KeyResult::Event(FormEvent::Cancel) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _api: &Api) {
    if self.done {
      let text = match self.mode {
        Mode::Request => LINK_SENT,
        Mode::Change { .. } => CHANGED,
      };
      let inner = draw_card(frame, area, self.title(), 5);
      let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1)])
        .split(inner);
      draw_notice(frame, chunks[0], text, Color::Green);
      frame.render_widget(hint("", "any key", "continue"), chunks[1]);
      return;
    }

    let inner = draw_card(frame, area, self.title(), self.form.height() + 2);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(self.form.height()),
        Constraint::Min(0),
      ])
      .split(inner);
    let text = match (&self.mode, self.pending.is_some()) {
      (_, true) => "Sending...",
      (Mode::Request, false) => "We'll email you a link to change your password. ",
      (Mode::Change { .. }, false) => "Please enter a new password below. ",
    };
    frame.render_widget(hint(text, "enter", "send"), chunks[0]);
    self.form.render(frame, chunks[1], true);
  }

  fn breadcrumb_label(&self) -> String {
    self.title().to_string()
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    match take_settled(api, &mut self.pending) {
      Some(Ok(_)) => {
        self.done = true;
        self.form.clear();
      }
      Some(Err(err)) => {
        let default = match self.mode {
          Mode::Request => GENERIC_ERROR,
          Mode::Change { .. } => CHANGE_ERROR,
        };
        show_failure(&mut self.form, &err, default);
      }
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "send").with_priority(10),
      ShortcutInfo::new("esc", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::Method;
  use crate::ui::views::testing::{api, key, type_str};
  use crossterm::event::KeyCode;
  use serde_json::json;

  #[tokio::test]
  async fn test_request_link() {
    let fake = FakeTransport::new();
    fake.respond(Method::Post, "/auth/password-reset/", Ok(json!({"status": "OK"})));
    let mut api = api(&fake, None);
    let mut view = PasswordResetView::request();

    type_str(&mut view, &mut api, "ann@x.com");
    view.handle_key(key(KeyCode::Enter), &mut api);
    api.settle().await;
    view.tick(&mut api);

    assert!(view.done);
    assert!(matches!(view.handle_key(key(KeyCode::Enter), &mut api), ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_change_checks_mismatch_first() {
    let fake = FakeTransport::new();
    let mut api = api(&fake, None);
    let mut view = PasswordResetView::change("tok".to_string());

    type_str(&mut view, &mut api, "short");
    view.handle_key(key(KeyCode::Tab), &mut api);
    type_str(&mut view, &mut api, "other");
    view.handle_key(key(KeyCode::Enter), &mut api);

    assert_eq!(view.form.errors().get("password2"), Some(PASSWORDS_DIFFER));
    assert_eq!(view.form.errors().get("password"), None);

    view.form.clear();
    type_str(&mut view, &mut api, "short");
    view.handle_key(key(KeyCode::Tab), &mut api);
    type_str(&mut view, &mut api, "short");
    view.handle_key(key(KeyCode::Enter), &mut api);
    assert_eq!(view.form.errors().get("password"), Some(PASSWORD_HELP));
    assert!(view.pending.is_none());
  }

  #[tokio::test]
  async fn test_change_sends_token() {
    let fake = FakeTransport::new();
    fake.respond(
      Method::Post,
      "/auth/password-reset/confirm/",
      Ok(json!({"status": "OK"})),
    );
    let mut api = api(&fake, None);
    let mut view = PasswordResetView::change("tok".to_string());

    type_str(&mut view, &mut api, "Passw0rd");
    view.handle_key(key(KeyCode::Tab), &mut api);
    type_str(&mut view, &mut api, "Passw0rd");
    view.handle_key(key(KeyCode::Enter), &mut api);
    api.settle().await;
    view.tick(&mut api);

    assert!(view.done);
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body.as_ref().unwrap()["token"], "tok");
    assert!(matches!(
      view.handle_key(key(KeyCode::Enter), &mut api),
      ViewAction::Replace(_)
    ));
  }
}
