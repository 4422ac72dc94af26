//! Flash messages raised by data mutations.

use std::time::{Duration, Instant};

use crate::api::{ApiError, EndpointKind};
use crate::cache::{LifecycleEvent, Phase};

pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// How long a message stays on screen
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub alert_type: AlertType,
  pub msg: String,
  pub raised_at: Instant,
}

/// The current flash message, if any. A new message replaces the old one.
#[derive(Debug, Default)]
pub struct Messages {
  current: Option<Message>,
}

impl Messages {
  pub fn new() -> Self {
    Self::default()
  }

  /// Raise a message; no payload means an unknown error.
  pub fn create(&mut self, payload: Option<(AlertType, String)>) {
    let (alert_type, msg) =
      payload.unwrap_or_else(|| (AlertType::Error, UNKNOWN_ERROR.to_string()));
    self.current = Some(Message {
      alert_type,
      msg,
      raised_at: Instant::now(),
    });
  }

  pub fn current(&self) -> Option<&Message> {
    self.current.as_ref()
  }

  pub fn dismiss(&mut self) {
    self.current = None;
  }

  /// Drop the message once it has been shown long enough. Returns true if
  /// one was dropped.
  pub fn expire(&mut self, now: Instant) -> bool {
    let expired = self
      .current
      .as_ref()
      .is_some_and(|m| now.saturating_duration_since(m.raised_at) >= MESSAGE_TIMEOUT);
    if expired {
      self.current = None;
    }
    expired
  }

  /// Raise the message belonging to a settled data mutation. Returns true
  /// if a message was raised.
  pub fn apply(&mut self, event: &LifecycleEvent) -> bool {
    let success = match event.kind {
      EndpointKind::AddData => "Entry Added",
      EndpointKind::DeleteData => "Entry Deleted",
      EndpointKind::UpdateData => "Entry Updated",
      _ => return false,
    };

    match &event.phase {
      Phase::Pending => return false,
      Phase::Fulfilled(_) => self.create(Some((AlertType::Success, success.to_string()))),
      // Cancelled by the user, nothing to report
      Phase::Rejected(ApiError::Aborted) => return false,
      Phase::Rejected(err) => self.create(error_text(err).map(|msg| (AlertType::Error, msg))),
    }
    true
  }
}

fn error_text(err: &ApiError) -> Option<String> {
  match err {
    ApiError::Status { body, .. } => body.general_message(),
    other => Some(other.to_string()),
  }
}
