mod activate;
mod dashboard;
mod data_detail;
mod login;
mod password_reset;
mod register;
mod update_modal;

pub use activate::ActivateView;
pub use dashboard::DashboardView;
pub use data_detail::DataDetailView;
pub use login::LoginView;
pub use password_reset::PasswordResetView;
pub use register::RegisterView;

use crate::api::ApiError;
use crate::cache::MutationId;
use crate::client::Api;
use crate::ui::components::Form;
use crate::ui::renderfns::centered;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use serde_json::Value;

/// Generic fallback for forms without a more specific message
pub const GENERIC_ERROR: &str = "There has been an error.";

/// Outcome of a tracked mutation, taken once it has settled. The mutation
/// is released and `pending` cleared.
pub(crate) fn take_settled(
  api: &mut Api,
  pending: &mut Option<MutationId>,
) -> Option<Result<Value, ApiError>> {
  let id = (*pending)?;
  let outcome = match api.mutation(id) {
    None => {
      *pending = None;
      return None;
    }
    Some(entry) if entry.is_loading() => return None,
    Some(entry) => match entry.error() {
      Some(err) => Err(err.clone()),
      None => Ok(entry.data().cloned().unwrap_or(Value::Null)),
    },
  };
  api.release_mutation(id);
  *pending = None;
  Some(outcome)
}

/// Put a failed request's errors on a form: server field errors go next to
/// their fields, the banner shows the general message or `default`.
pub(crate) fn show_failure(form: &mut Form, err: &ApiError, default: &str) {
  match err.body() {
    Some(body) => {
      form.errors_mut().merge_server(body);
      form.show_banner(default);
    }
    None => form.show_banner(&err.to_string()),
  }
}

/// Draw a titled card in the middle of `area` and return its inner rect
pub(crate) fn draw_card(frame: &mut Frame, area: Rect, title: &str, height: u16) -> Rect {
  let card = centered(area, 64, height + 2);
  let block = Block::default()
    .title(format!(" {} ", title))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let inner = block.inner(card);
  frame.render_widget(block, card);
  inner
}

/// One dimmed line of hint text, with `key` highlighted
pub(crate) fn hint(text: &str, key: &str, action: &str) -> Paragraph<'static> {
  Paragraph::new(Line::from(vec![
    Span::styled(text.to_string(), Style::default().fg(Color::DarkGray)),
    Span::styled(format!("<{}>", key), Style::default().fg(Color::Cyan)),
    Span::styled(format!(" {}", action), Style::default().fg(Color::DarkGray)),
  ]))
}

#[cfg(test)]
pub(crate) mod testing {
  use crate::api::transport::fake::FakeTransport;
  use crate::api::Credentials;
  use crate::client::Api;
  use crate::config::Config;
  use crate::session::{SessionStore, SqliteTokenStorage, TokenStorage};
  use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
  use std::sync::Arc;

  /// An `Api` over a fake transport, optionally with a stored token
  pub fn api(fake: &FakeTransport, token: Option<&str>) -> Api {
    let storage = SqliteTokenStorage::in_memory().unwrap();
    storage.save(token).unwrap();
    let session = SessionStore::new(Box::new(storage), Credentials::default());
    Api::new(&Config::default(), Arc::new(fake.clone()), session)
  }

  pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  pub fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
  }

  pub fn type_str(view: &mut dyn crate::ui::view::View, api: &mut Api, text: &str) {
    for c in text.chars() {
      view.handle_key(key(KeyCode::Char(c)), api);
    }
  }
}
