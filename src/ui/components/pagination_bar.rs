use super::KeyResult;
use crate::pagination::{PageControl, PageLimit, PageSlot};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Requests from the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationEvent {
  GoTo(u32),
  Limit(PageLimit),
}

/// Page buttons and the page-size selector under the data table
#[derive(Debug, Clone, Copy)]
pub struct PaginationBar {
  control: PageControl,
  active: u32,
  limit: PageLimit,
}

impl PaginationBar {
  pub fn new(total_pages: u32, active: u32, limit: PageLimit) -> Self {
    Self {
      control: PageControl::new(total_pages),
      active,
      limit,
    }
  }

  /// `[`/`]` step a page, `{`/`}` jump to the ends, `+` cycles the size
  pub fn handle_key(&self, key: KeyEvent) -> KeyResult<PaginationEvent> {
    let target = match key.code {
      KeyCode::Char('+') => return KeyResult::Event(PaginationEvent::Limit(self.limit.next())),
      KeyCode::Char(']') | KeyCode::Right => Some(self.active + 1),
      KeyCode::Char('[') | KeyCode::Left => Some(self.active.saturating_sub(1)),
      KeyCode::Char('{') | KeyCode::Home => self.control.first(self.active),
      KeyCode::Char('}') | KeyCode::End => self.control.last(self.active),
      _ => return KeyResult::NotHandled,
    };

    if !self.control.is_visible() {
      return KeyResult::Handled;
    }
    match target.map(|page| self.control.clamp(page)) {
      Some(page) if page != self.active => KeyResult::Event(PaginationEvent::GoTo(page)),
      _ => KeyResult::Handled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Cyan);
    let mut spans = vec![Span::raw(" ")];

    if self.control.is_visible() {
      let first = self.control.first(self.active).is_some();
      spans.push(Span::styled("«", enabled(first)));
      for slot in self.control.slots(self.active) {
        spans.push(Span::raw(" "));
        spans.push(match slot {
          PageSlot::Page(n) if n == self.active => Span::styled(
            format!("[{}]", n),
            Style::default().fg(Color::Yellow).bold(),
          ),
          PageSlot::Page(n) => Span::styled(n.to_string(), Style::default().fg(Color::White)),
          PageSlot::Ellipsis => Span::styled("…", Style::default().fg(Color::DarkGray)),
        });
      }
      spans.push(Span::raw(" "));
      let last = self.control.last(self.active).is_some();
      spans.push(Span::styled("»", enabled(last)));
      spans.push(Span::raw("   "));
    }

    spans.push(Span::styled("<+>", key_style));
    spans.push(Span::styled(
      format!(" {}", self.limit.label()),
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }
}

fn enabled(on: bool) -> Style {
  if on {
    Style::default().fg(Color::Cyan)
  } else {
    Style::default().fg(Color::DarkGray)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  #[test]
  fn test_step_and_jump() {
    let bar = PaginationBar::new(10, 4, PageLimit::Ten);
    assert_eq!(bar.handle_key(key(']')), KeyResult::Event(PaginationEvent::GoTo(5)));
    assert_eq!(bar.handle_key(key('[')), KeyResult::Event(PaginationEvent::GoTo(3)));
    assert_eq!(bar.handle_key(key('{')), KeyResult::Event(PaginationEvent::GoTo(1)));
    assert_eq!(bar.handle_key(key('}')), KeyResult::Event(PaginationEvent::GoTo(10)));
  }

  #[test]
  fn test_edges_are_clamped() {
    let bar = PaginationBar::new(10, 10, PageLimit::Ten);
    assert_eq!(bar.handle_key(key(']')), KeyResult::Handled);
    assert_eq!(bar.handle_key(key('}')), KeyResult::Handled);

    let bar = PaginationBar::new(10, 1, PageLimit::Ten);
    assert_eq!(bar.handle_key(key('[')), KeyResult::Handled);
  }

  #[test]
  fn test_single_page_has_no_navigation() {
    let bar = PaginationBar::new(1, 1, PageLimit::Ten);
    assert_eq!(bar.handle_key(key(']')), KeyResult::Handled);
    assert_eq!(
      bar.handle_key(key('+')),
      KeyResult::Event(PaginationEvent::Limit(PageLimit::Twenty))
    );
  }

  #[test]
  fn test_other_keys_pass_through() {
    let bar = PaginationBar::new(3, 1, PageLimit::Ten);
    assert_eq!(bar.handle_key(key('d')), KeyResult::NotHandled);
  }
}
