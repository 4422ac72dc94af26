use crate::session::SessionState;
use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: name, server, signed-in user and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  api_url: &str,
  session: &SessionState,
  shortcuts: &[ShortcutInfo],
) {
  let domain = extract_domain(api_url);

  let mut spans = vec![
    Span::styled(" exdash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
  ];

  // Nothing about the user until the session has settled
  if !session.is_fetching {
    let who = match (&session.user, session.is_authenticated) {
      (Some(user), true) => format!(" Welcome {}! ", user.email),
      (None, true) => " Signed in ".to_string(),
      (_, false) => " Guest ".to_string(),
    };
    spans.push(Span::styled(who, Style::default().fg(Color::Yellow).bold()));
  }
  spans.push(Span::raw("  "));

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host and port of the API URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
