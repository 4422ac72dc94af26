use super::{draw_card, hint, show_failure, take_settled};
use crate::api::types::RegisterRequest;
use crate::api::Mutation;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::{draw_notice, Field, Form, FormEvent, KeyResult};
use crate::ui::view::{Access, ShortcutInfo, View, ViewAction};
use crate::validation::{
  check_required, MAX_EMAIL_LEN, MAX_NAME_LEN, PASSWORDS_DIFFER, PASSWORD_HELP, TITLES,
};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const REGISTER_ERROR: &str = "There was an error with registering. Please try again.";
const REGISTERED: &str =
  "Your registration is successful. Please check your email for a verification request.";

/// New account form. Registering does not sign the user in; they have to
/// confirm their email first.
pub struct RegisterView {
  form: Form,
  pending: Option<MutationId>,
  registered: bool,
}

impl RegisterView {
  pub fn new() -> Self {
    Self {
      form: Form::new(vec![
        Field::email("email", "Email address", MAX_EMAIL_LEN),
        Field::secret("password", "Password", 100),
        Field::secret("password2", "Confirm password", 100),
        Field::choice("title", "Title", &TITLES),
        Field::text("firstName", "First name", MAX_NAME_LEN),
        Field::text("lastName", "Last name", MAX_NAME_LEN),
        Field::text("jobTitle", "Job title", MAX_NAME_LEN),
      ]),
      pending: None,
      registered: false,
    }
  }

  fn submit(&mut self, api: &mut Api) {
    if self.pending.is_some() {
      return;
    }
    let request = RegisterRequest {
      email: self.form.value("email"),
      password: self.form.value("password"),
      title: self.form.value("title"),
      first_name: self.form.value("firstName"),
      last_name: self.form.value("lastName"),
      job_title: self.form.value("jobTitle"),
    };

    let confirmed = request.password == self.form.value("password2");

    self.form.hide_banner();
    let validator = api.validator();
    let errors = self.form.errors_mut();
    if !confirmed {
      errors.set("password2", PASSWORDS_DIFFER);
    }
    validator.check_email(errors, &request.email);
    if !validator.valid_password(&request.password) {
      errors.set("password", PASSWORD_HELP);
    }
    check_required(errors, "title", &request.title);
    check_required(errors, "firstName", &request.first_name);
    check_required(errors, "lastName", &request.last_name);
    check_required(errors, "jobTitle", &request.job_title);
    if !self.form.errors().is_empty() {
      return;
    }

    self.pending = Some(api.mutate(Mutation::RegisterUser(request)));
  }
}

impl View for RegisterView {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction {
    if self.registered {
      return ViewAction::Pop;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(api),
      KeyResult::Event(FormEvent::Cancel) => return ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _api: &Api) {
    if self.registered {
      let inner = draw_card(frame, area, "Register for an account", 6);
      let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
      draw_notice(frame, chunks[0], REGISTERED, Color::Green);
      frame.render_widget(hint("Already confirmed? ", "any key", "Login"), chunks[1]);
      return;
    }

    let inner = draw_card(frame, area, "Register for an account", self.form.height() + 3);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(self.form.height()),
        Constraint::Min(0),
      ])
      .split(inner);

    frame.render_widget(hint("Already have an account? ", "esc", "Login"), chunks[0]);
    let status = if self.pending.is_some() {
      Paragraph::new("Registering...").style(Style::default().fg(Color::Yellow))
    } else {
      Paragraph::new("Please fill in all fields in the form below.")
    };
    frame.render_widget(status, chunks[1]);
    self.form.render(frame, chunks[2], true);
  }

  fn breadcrumb_label(&self) -> String {
    "Register".to_string()
  }

  fn access(&self) -> Access {
    Access::GuestOnly
  }

  fn tick(&mut self, api: &mut Api) -> ViewAction {
    match take_settled(api, &mut self.pending) {
      Some(Ok(_)) => {
        self.registered = true;
        self.form.clear();
      }
      Some(Err(err)) => show_failure(&mut self.form, &err, REGISTER_ERROR),
      None => {}
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "register").with_priority(10),
      ShortcutInfo::new("tab", "next field").with_priority(20),
      ShortcutInfo::new("←/→", "title").with_priority(25),
      ShortcutInfo::new("esc", "back").with_priority(30),
    ]
  }
}
