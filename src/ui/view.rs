use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::client::Api;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Who may see a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
  /// Anyone
  #[default]
  Public,
  /// Signed-in users only; others are sent to the login screen
  Private,
  /// Signed-out users only; signed-in users land on the dashboard
  GuestOnly,
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the whole stack with a new root
  Replace(Box<dyn View>),
}

/// Trait for view behavior
///
/// Views own their subscriptions and form state and talk to the server
/// only through [`Api`]. They return actions for the App to execute.
/// Dropping a view drops its subscriptions, which releases them.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent, api: &mut Api) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect, api: &Api);

  fn breadcrumb_label(&self) -> String;

  fn access(&self) -> Access {
    Access::Public
  }

  /// Called on each tick after the cache store has been polled, so views
  /// can pick up settled mutations
  fn tick(&mut self, _api: &mut Api) -> ViewAction {
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("esc", "back").with_priority(30)]
  }
}
