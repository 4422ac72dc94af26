use super::{draw_card, hint, show_failure, take_settled};
use crate::api::types::LoginRequest;
use crate::api::Mutation;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::{Field, Form, FormEvent, KeyResult};
use crate::ui::view::{Access, ShortcutInfo, View, ViewAction};
use crate::ui::views::{ActivateView, PasswordResetView, RegisterView};
use crate::validation::MAX_EMAIL_LEN;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const LOGIN_ERROR: &str = "There was an error with logging in. Please check your username and password and try again.";

/// Email and password sign-in
pub struct LoginView {
  form: Form,
  pending: Option<MutationId>,
}

impl LoginView {
  pub fn new() -> Self {
    Self {
      form: Form::new(vec![
        Field::email("email", "Email", MAX_EMAIL_LEN),
        Field::secret("password", "Password", 100),
      ]),
      pending: None,
    }
  }

  fn submit(&mut self, api: &mut Api) {
    if self.pending.is_some() {
      return;
    }
    let email = self.form.value("email");
    self.form.hide_banner();
    api.validator().check_email(self.form.errors_mut(), &email);
    if self.form.errors().get("email").is_some() {
      return;
    }

    self.pending = Some(api.mutate(Mutation::LoginUser(LoginRequest {
      email,
      password: self.form.value("password"),
    })));
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(api),
      KeyResult::Handled | KeyResult::Event(FormEvent::Cancel) => {}
      KeyResult::NotHandled if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return match key.code {
          KeyCode::Char('r') => ViewAction::Push(Box::new(RegisterView::new())),
          KeyCode::Char('f') => ViewAction::Push(Box::new(PasswordResetView::request())),
          KeyCode::Char('t') => ViewAction::Push(Box::new(ActivateView::new(None))),
          _ => ViewAction::None,
        };
      }
      KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _api: &Api) {
    let inner = draw_card(frame, area, "Login", self.form.height() + 4);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(self.form.height()),
        Constraint::Length(1),
        Constraint::Min(0),
      ])
      .split(inner);

    frame.render_widget(hint("Don't have an account? ", "^r", "Register"), chunks[0]);
    self.form.render(frame, chunks[1], true);
    if self.pending.is_some() {
      frame.render_widget(
        Paragraph::new("Logging in...").style(Style::default().fg(Color::Yellow)),
        chunks[2],
      );
    } else {
      frame.render_widget(hint("Forgot your password? ", "^f", "Reset it"), chunks[2]);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn access(&self) -> Access {
    Access::GuestOnly
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    match take_settled(api, &mut self.pending) {
      // The session is now authenticated; the app moves on to the dashboard
      Some(Ok(_)) => self.form.clear(),
      Some(Err(err)) => show_failure(&mut self.form, &err, LOGIN_ERROR),
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "login").with_priority(10),
      ShortcutInfo::new("tab", "next field").with_priority(20),
      ShortcutInfo::new("^r", "register").with_priority(30),
      ShortcutInfo::new("^f", "forgot password").with_priority(40),
      ShortcutInfo::new("^t", "activate").with_priority(50),
    ]
  }
}
