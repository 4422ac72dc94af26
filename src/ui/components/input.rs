use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key changed the value or moved the cursor
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input with a character cap. The cursor counts
/// characters, not bytes.
#[derive(Debug, Clone)]
pub struct TextInput {
  buffer: Vec<char>,
  cursor: usize,
  max_len: usize,
  lowercase: bool,
}

impl Default for TextInput {
  fn default() -> Self {
    Self::new(usize::MAX)
  }
}

impl TextInput {
  pub fn new(max_len: usize) -> Self {
    Self {
      buffer: Vec::new(),
      cursor: 0,
      max_len,
      lowercase: false,
    }
  }

  /// Fold typed letters to lowercase (email fields)
  pub fn lowercase(mut self) -> Self {
    self.lowercase = true;
    self
  }

  pub fn value(&self) -> String {
    self.buffer.iter().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  /// Replace the value, applying the cap
  pub fn set_value(&mut self, value: &str) {
    self.buffer = value.chars().take(self.max_len).collect();
    if self.lowercase {
      self.buffer = self.buffer.iter().flat_map(|c| c.to_lowercase()).collect();
    }
    self.cursor = self.buffer.len();
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.value()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          self.buffer.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.cursor < self.buffer.len() {
          self.buffer.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = (self.cursor + 1).min(self.buffer.len());
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.buffer.len();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.buffer.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let mut start = self.cursor;
        while start > 0 && self.buffer[start - 1] == ' ' {
          start -= 1;
        }
        while start > 0 && self.buffer[start - 1] != ' ' {
          start -= 1;
        }
        self.buffer.drain(start..self.cursor);
        self.cursor = start;
        InputResult::Consumed
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        if self.buffer.len() < self.max_len {
          let c = if self.lowercase { c.to_ascii_lowercase() } else { c };
          self.buffer.insert(self.cursor, c);
          self.cursor += 1;
        }
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Cursor position in characters, for rendering
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }
}
