//! Pagination state for the data table and the compact page control.

use serde::{Deserialize, Serialize};

use crate::api::types::ListArgs;

/// Allowed page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageLimit {
  Five,
  #[default]
  Ten,
  Twenty,
  Fifty,
}

impl PageLimit {
  pub const ALL: [PageLimit; 4] = [Self::Five, Self::Ten, Self::Twenty, Self::Fifty];

  pub fn value(self) -> u32 {
    match self {
      Self::Five => 5,
      Self::Ten => 10,
      Self::Twenty => 20,
      Self::Fifty => 50,
    }
  }

  /// The next larger size, wrapping around
  pub fn next(self) -> Self {
    match self {
      Self::Five => Self::Ten,
      Self::Ten => Self::Twenty,
      Self::Twenty => Self::Fifty,
      Self::Fifty => Self::Five,
    }
  }

  pub fn label(self) -> String {
    format!("Show {}", self.value())
  }
}

impl TryFrom<u32> for PageLimit {
  type Error = String;

  fn try_from(value: u32) -> Result<Self, Self::Error> {
    Self::ALL
      .into_iter()
      .find(|l| l.value() == value)
      .ok_or_else(|| format!("page limit must be one of 5, 10, 20, 50 (got {})", value))
  }
}

impl From<PageLimit> for u32 {
  fn from(limit: PageLimit) -> Self {
    limit.value()
  }
}

/// Page number and size of one table. Not shared, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
  page_number: u32,
  page_limit: PageLimit,
}

impl Default for PaginationState {
  fn default() -> Self {
    Self::new(PageLimit::default())
  }
}

impl PaginationState {
  pub fn new(page_limit: PageLimit) -> Self {
    Self {
      page_number: 1,
      page_limit,
    }
  }

  pub fn page_number(&self) -> u32 {
    self.page_number
  }

  pub fn page_limit(&self) -> PageLimit {
    self.page_limit
  }

  /// Pages are numbered from 1; 0 is clamped.
  pub fn set_page(&mut self, page: u32) {
    self.page_number = page.max(1);
  }

  /// Change the page size. Always goes back to page 1.
  pub fn set_page_limit(&mut self, limit: PageLimit) {
    self.page_limit = limit;
    self.page_number = 1;
  }

  /// Arguments of the list query for the current page
  pub fn list_args(&self) -> ListArgs {
    ListArgs {
      limit: self.page_limit.value(),
      page: self.page_number,
    }
  }
}

/// One slot of the page control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
  Page(u32),
  Ellipsis,
}

/// Pages shown by the compact control: every page when there are at most
/// seven, otherwise the first and last page around a five-slot window.
pub fn page_window(active: u32, min: u32, max: u32) -> Vec<PageSlot> {
  use PageSlot::{Ellipsis, Page};

  if max < min {
    return Vec::new();
  }
  if max - min + 1 <= 7 {
    return (min..=max).map(Page).collect();
  }

  let mut slots = vec![Page(min)];
  if active <= min + 3 {
    slots.extend((min + 1..=min + 4).map(Page));
    slots.push(Ellipsis);
  } else if active >= max - 3 {
    slots.push(Ellipsis);
    slots.extend((max - 4..=max - 1).map(Page));
  } else {
    slots.push(Ellipsis);
    slots.extend((active - 1..=active + 1).map(Page));
    slots.push(Ellipsis);
  }
  slots.push(Page(max));
  slots
}

/// Options of the page control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageControl {
  pub min_value: u32,
  pub max_value: u32,
  pub fully_expanded: bool,
  pub show_previous_next: bool,
  pub show_first_last: bool,
}

impl PageControl {
  pub fn new(total_pages: u32) -> Self {
    Self {
      min_value: 1,
      max_value: total_pages,
      fully_expanded: false,
      show_previous_next: false,
      show_first_last: true,
    }
  }

  /// The control is only drawn when there is more than one page
  pub fn is_visible(&self) -> bool {
    self.max_value > self.min_value
  }

  pub fn slots(&self, active: u32) -> Vec<PageSlot> {
    if self.fully_expanded {
      return (self.min_value..=self.max_value).map(PageSlot::Page).collect();
    }
    page_window(active, self.min_value, self.max_value)
  }

  /// Target of the "first" button; `None` when disabled
  pub fn first(&self, active: u32) -> Option<u32> {
    (self.show_first_last && active != self.min_value).then_some(self.min_value)
  }

  pub fn last(&self, active: u32) -> Option<u32> {
    (self.show_first_last && active != self.max_value).then_some(self.max_value)
  }

  pub fn previous(&self, active: u32) -> Option<u32> {
    (self.show_previous_next && active > self.min_value).then(|| active - 1)
  }

  pub fn next(&self, active: u32) -> Option<u32> {
    (self.show_previous_next && active < self.max_value).then(|| active + 1)
  }

  /// Clamp a requested page into range
  pub fn clamp(&self, page: u32) -> u32 {
    page.clamp(self.min_value, self.max_value.max(self.min_value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use PageSlot::{Ellipsis, Page};

  fn pages(numbers: &[u32]) -> Vec<PageSlot> {
    numbers.iter().copied().map(Page).collect()
  }

  #[test]
  fn test_window_near_start() {
    assert_eq!(
      page_window(1, 1, 10),
      vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(10)]
    );
    assert_eq!(page_window(4, 1, 10), page_window(1, 1, 10));
  }

  #[test]
  fn test_window_centered() {
    assert_eq!(
      page_window(5, 1, 10),
      vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Ellipsis, Page(10)]
    );
  }

  #[test]
  fn test_window_near_end() {
    assert_eq!(
      page_window(9, 1, 10),
      vec![Page(1), Ellipsis, Page(6), Page(7), Page(8), Page(9), Page(10)]
    );
    assert_eq!(page_window(7, 1, 10), page_window(9, 1, 10));
  }

  #[test]
  fn test_small_sets_show_everything() {
    assert_eq!(page_window(3, 1, 6), pages(&[1, 2, 3, 4, 5, 6]));
    assert_eq!(page_window(1, 1, 7), pages(&[1, 2, 3, 4, 5, 6, 7]));
    assert_eq!(page_window(1, 1, 1), pages(&[1]));
  }

  #[test]
  fn test_window_has_at_most_seven_slots() {
    for total in 8..30 {
      for active in 1..=total {
        let slots = page_window(active, 1, total);
        assert_eq!(slots.len(), 7, "total {} active {}", total, active);
        assert!(slots.contains(&Page(active)));
      }
    }
  }

  #[test]
  fn test_set_page_limit_resets_page() {
    for limit in PageLimit::ALL {
      let mut state = PaginationState::default();
      state.set_page(7);
      state.set_page_limit(limit);
      assert_eq!(state.page_number(), 1);
      assert_eq!(state.page_limit(), limit);
    }
  }

  #[test]
  fn test_list_args() {
    let mut state = PaginationState::new(PageLimit::Twenty);
    state.set_page(3);
    assert_eq!(state.list_args(), ListArgs { limit: 20, page: 3 });
    assert_eq!(PaginationState::default().list_args(), ListArgs::default());
  }

  #[test]
  fn test_page_limit_parsing() {
    assert_eq!(PageLimit::try_from(50), Ok(PageLimit::Fifty));
    assert!(PageLimit::try_from(15).is_err());
    assert_eq!(PageLimit::Fifty.next(), PageLimit::Five);
    assert_eq!(PageLimit::default().label(), "Show 10");
  }

  #[test]
  fn test_control_buttons() {
    let control = PageControl::new(10);
    assert!(control.is_visible());
    assert_eq!(control.first(1), None);
    assert_eq!(control.first(4), Some(1));
    assert_eq!(control.last(10), None);
    assert_eq!(control.last(4), Some(10));
    // prev/next hidden by default
    assert_eq!(control.next(4), None);

    let control = PageControl {
      show_previous_next: true,
      ..PageControl::new(10)
    };
    assert_eq!(control.previous(1), None);
    assert_eq!(control.next(4), Some(5));
    assert!(!PageControl::new(1).is_visible());
  }
}
