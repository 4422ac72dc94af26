use super::{InputResult, KeyResult, TextInput};
use crate::validation::FormErrors;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// How a field takes input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  /// Rendered as asterisks
  Secret,
  /// Cycled with left/right; nothing selected means an empty value
  Choice(&'static [&'static str]),
  /// Shown but not editable
  ReadOnly,
}

#[derive(Debug, Clone)]
pub struct Field {
  /// Server-side field name, used to match error messages
  pub name: &'static str,
  pub label: &'static str,
  kind: FieldKind,
  input: TextInput,
  choice: Option<usize>,
}

impl Field {
  pub fn text(name: &'static str, label: &'static str, max_len: usize) -> Self {
    Self {
      name,
      label,
      kind: FieldKind::Text,
      input: TextInput::new(max_len),
      choice: None,
    }
  }

  /// Text field that folds input to lowercase
  pub fn email(name: &'static str, label: &'static str, max_len: usize) -> Self {
    Self {
      input: TextInput::new(max_len).lowercase(),
      ..Self::text(name, label, max_len)
    }
  }

  pub fn secret(name: &'static str, label: &'static str, max_len: usize) -> Self {
    Self {
      kind: FieldKind::Secret,
      ..Self::text(name, label, max_len)
    }
  }

  pub fn choice(name: &'static str, label: &'static str, options: &'static [&'static str]) -> Self {
    Self {
      kind: FieldKind::Choice(options),
      ..Self::text(name, label, usize::MAX)
    }
  }

  pub fn read_only(name: &'static str, label: &'static str) -> Self {
    Self {
      kind: FieldKind::ReadOnly,
      ..Self::text(name, label, usize::MAX)
    }
  }

  pub fn value(&self) -> String {
    match self.kind {
      FieldKind::Choice(options) => self
        .choice
        .and_then(|i| options.get(i))
        .map(|s| s.to_string())
        .unwrap_or_default(),
      _ => self.input.value(),
    }
  }

  fn set_value(&mut self, value: &str) {
    match self.kind {
      FieldKind::Choice(options) => self.choice = options.iter().position(|o| *o == value),
      _ => self.input.set_value(value),
    }
  }

  fn clear(&mut self) {
    self.input.clear();
    self.choice = None;
  }

  /// Text as drawn on screen
  fn display_value(&self) -> String {
    match self.kind {
      FieldKind::Secret => "*".repeat(self.input.len()),
      FieldKind::Choice(_) => match self.choice {
        Some(_) => format!("< {} >", self.value()),
        None => "< --- >".to_string(),
      },
      _ => self.input.value(),
    }
  }

  fn cycle(&mut self, forward: bool) {
    let FieldKind::Choice(options) = self.kind else {
      return;
    };
    if options.is_empty() {
      return;
    }
    let last = options.len() - 1;
    self.choice = match (self.choice, forward) {
      (None, true) => Some(0),
      (None, false) => Some(last),
      (Some(i), true) if i == last => None,
      (Some(i), true) => Some(i + 1),
      (Some(0), false) => None,
      (Some(i), false) => Some(i - 1),
    };
  }
}

/// Events emitted by a form that the parent view handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  Submit,
  Cancel,
}

/// A column of fields with one focused at a time, per-field error text and
/// an error banner above the fields.
#[derive(Debug, Clone)]
pub struct Form {
  fields: Vec<Field>,
  focus: usize,
  errors: FormErrors,
  banner: Option<String>,
}

impl Form {
  pub fn new(fields: Vec<Field>) -> Self {
    Self {
      fields,
      focus: 0,
      errors: FormErrors::new(),
      banner: None,
    }
  }

  pub fn value(&self, name: &str) -> String {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(Field::value)
      .unwrap_or_default()
  }

  pub fn set_value(&mut self, name: &str, value: &str) {
    if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
      field.set_value(value);
    }
  }

  /// Empty every field and drop all errors
  pub fn clear(&mut self) {
    for field in &mut self.fields {
      field.clear();
    }
    self.errors.reset();
    self.banner = None;
    self.focus = 0;
  }

  pub fn errors(&self) -> &FormErrors {
    &self.errors
  }

  pub fn errors_mut(&mut self) -> &mut FormErrors {
    &mut self.errors
  }

  /// Show the error banner: the server's general message, else `default`
  pub fn show_banner(&mut self, default: &str) {
    self.banner = Some(self.errors.banner(default));
  }

  pub fn hide_banner(&mut self) {
    self.banner = None;
  }

  pub fn banner(&self) -> Option<&str> {
    self.banner.as_deref()
  }

  pub fn focused(&self) -> Option<&str> {
    self.fields.get(self.focus).map(|f| f.name)
  }

  fn move_focus(&mut self, forward: bool) {
    let len = self.fields.len();
    if len == 0 {
      return;
    }
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        return KeyResult::Handled;
      }
      KeyCode::Enter => return KeyResult::Event(FormEvent::Submit),
      KeyCode::Esc => return KeyResult::Event(FormEvent::Cancel),
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::NotHandled;
    };
    match field.kind {
      FieldKind::ReadOnly => KeyResult::Handled,
      FieldKind::Choice(_) => {
        match key.code {
          KeyCode::Right | KeyCode::Char(' ') => field.cycle(true),
          KeyCode::Left => field.cycle(false),
          _ => return KeyResult::Handled,
        }
        self.errors.clear(field.name);
        KeyResult::Handled
      }
      FieldKind::Text | FieldKind::Secret => match field.input.handle_key(key) {
        InputResult::Consumed => {
          self.errors.clear(field.name);
          KeyResult::Handled
        }
        InputResult::NotHandled => KeyResult::NotHandled,
        // Enter and Esc are taken above
        InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
      },
    }
  }

  /// Rows needed to draw the form
  pub fn height(&self) -> u16 {
    let banner = if self.banner.is_some() { 2 } else { 0 };
    banner + 3 * self.fields.len() as u16
  }

  /// Draw the banner and fields. `active` places the terminal cursor in
  /// the focused field.
  pub fn render(&self, frame: &mut Frame, area: Rect, active: bool) {
    let mut constraints = Vec::new();
    if self.banner.is_some() {
      constraints.push(Constraint::Length(2));
    }
    constraints.extend(self.fields.iter().map(|_| Constraint::Length(3)));
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints(constraints)
      .split(area);

    let mut rows = chunks.iter();
    if let Some(banner) = &self.banner {
      if let Some(row) = rows.next() {
        let paragraph = Paragraph::new(banner.as_str())
          .style(Style::default().fg(Color::Red))
          .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, *row);
      }
    }

    for (i, (field, row)) in self.fields.iter().zip(rows).enumerate() {
      let focused = active && i == self.focus;
      let error = self.errors.get(field.name);

      let border = match (error, focused) {
        (Some(_), _) => Style::default().fg(Color::Red),
        (None, true) => Style::default().fg(Color::Yellow),
        (None, false) => Style::default().fg(Color::DarkGray),
      };
      let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!(" {} ", field.label));
      if let Some(error) = error {
        block = block.title_bottom(Line::styled(
          format!(" {} ", error),
          Style::default().fg(Color::Red),
        ));
      }

      let style = if field.kind == FieldKind::ReadOnly {
        Style::default().fg(Color::DarkGray)
      } else {
        Style::default().fg(Color::White)
      };
      let inner = block.inner(*row);
      frame.render_widget(Paragraph::new(field.display_value()).style(style).block(block), *row);

      if focused && matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
        let x = inner.x + (field.input.cursor_position() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position((x, inner.y));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut Form, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  const OPTIONS: &[&str] = &["Mr", "Dr"];

  fn login_form() -> Form {
    Form::new(vec![
      Field::email("email", "Email", 100),
      Field::secret("password", "Password", 100),
      Field::choice("title", "Title", OPTIONS),
    ])
  }

  #[test]
  fn test_focus_moves_and_wraps() {
    let mut form = login_form();
    assert_eq!(form.focused(), Some("email"));
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focused(), Some("password"));
    form.handle_key(key(KeyCode::BackTab));
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focused(), Some("title"));
  }

  #[test]
  fn test_typing_clears_field_error() {
    let mut form = login_form();
    form.errors_mut().set("email", "bad");
    form.errors_mut().set("password", "also bad");
    type_str(&mut form, "A@b.com");

    assert_eq!(form.value("email"), "a@b.com");
    assert_eq!(form.errors().get("email"), None);
    assert_eq!(form.errors().get("password"), Some("also bad"));
  }

  #[test]
  fn test_secret_is_masked() {
    let mut form = login_form();
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "Secret1");
    assert_eq!(form.value("password"), "Secret1");
    assert_eq!(form.fields[1].display_value(), "*******");
  }

  #[test]
  fn test_choice_cycles_through_blank() {
    let mut form = login_form();
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.value("title"), "");
    form.handle_key(key(KeyCode::Right));
    assert_eq!(form.value("title"), "Mr");
    form.handle_key(key(KeyCode::Right));
    form.handle_key(key(KeyCode::Right));
    assert_eq!(form.value("title"), "");
    form.handle_key(key(KeyCode::Left));
    assert_eq!(form.value("title"), "Dr");
  }

  #[test]
  fn test_enter_and_esc_are_events() {
    let mut form = login_form();
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Event(FormEvent::Submit));
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Event(FormEvent::Cancel));
  }

  #[test]
  fn test_clear_resets_values_and_errors() {
    let mut form = login_form();
    type_str(&mut form, "a@b.com");
    form.errors_mut().set("password", "bad");
    form.show_banner("failed");
    form.clear();

    assert_eq!(form.value("email"), "");
    assert!(form.errors().is_empty());
    assert_eq!(form.banner(), None);
  }

  #[test]
  fn test_banner_prefers_general_error() {
    let mut form = login_form();
    form.show_banner("default text");
    assert_eq!(form.banner(), Some("default text"));
  }
}
