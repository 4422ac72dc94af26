use crate::messages::{AlertType, Message};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Draw the flash message as a one-line bar
pub fn draw_alert(frame: &mut Frame, area: Rect, message: &Message) {
  let (prefix, color) = match message.alert_type {
    AlertType::Success => (" ✓ ", Color::Green),
    AlertType::Error => (" ✗ ", Color::Red),
  };
  let line = Line::from(vec![
    Span::styled(prefix, Style::default().fg(Color::Black).bg(color).bold()),
    Span::styled(format!(" {}", message.msg), Style::default().fg(color)),
  ]);
  frame.render_widget(Paragraph::new(line), area);
}

/// Centered "Loading" box, with a spinner frame picked by `step`
pub fn draw_loader(frame: &mut Frame, area: Rect, step: usize) {
  let width = 20.min(area.width);
  let height = 3.min(area.height);
  let x = area.x + area.width.saturating_sub(width) / 2;
  let y = area.y + area.height.saturating_sub(height) / 2;
  let overlay_area = Rect::new(x, y, width, height);

  frame.render_widget(Clear, overlay_area);
  let paragraph = Paragraph::new(format!("{} Loading...", SPINNER[step % SPINNER.len()]))
    .alignment(Alignment::Center)
    .block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
  frame.render_widget(paragraph, overlay_area);
}

/// A bordered notice, used for success screens
pub fn draw_notice(frame: &mut Frame, area: Rect, text: &str, color: Color) {
  let paragraph = Paragraph::new(text)
    .style(Style::default().fg(color))
    .wrap(Wrap { trim: true })
    .block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color)),
    );
  frame.render_widget(paragraph, area);
}
