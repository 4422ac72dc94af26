pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use components::{draw_alert, draw_loader};
use ratatui::prelude::*;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Length(1), // Flash message
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let shortcuts = app
    .current_view()
    .map(|v| v.shortcuts())
    .unwrap_or_default();
  draw_header(
    frame,
    chunks[0],
    app.api_url(),
    app.api().session(),
    &shortcuts,
  );

  if let Some(message) = app.api().messages().current() {
    draw_alert(frame, chunks[1], message);
  }

  let ticks = app.ticks();
  let (view, api) = app.current_view_mut();
  if let Some(view) = view {
    view.render(frame, chunks[2], api);
  }
  // Session checks cover everything until they settle
  if api.session().is_fetching {
    draw_loader(frame, chunks[2], ticks);
  }

  draw_footer(frame, chunks[3], &app.view_breadcrumb());
}
