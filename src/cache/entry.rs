//! Cache entry and mutation state.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

use super::tags::Tag;
use crate::api::{ApiError, EndpointKind, Query};

/// Fetch lifecycle of a cache entry or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Nothing has been requested yet
  #[default]
  Uninitialized,
  /// A request is in flight
  Pending,
  /// The last request succeeded
  Fulfilled,
  /// The last request failed
  Rejected,
}

/// Identifies one dispatched request, so late results can be matched to
/// the request that produced them
pub type RequestId = u64;

/// One cached query result.
///
/// Data from the last successful fetch is kept while a re-fetch is pending
/// or after it fails, so views can keep showing it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// The query this entry caches, used to re-fetch and to compute tags
  pub(super) query: Query,
  pub(super) status: QueryStatus,
  pub(super) data: Option<Value>,
  pub(super) error: Option<ApiError>,
  pub(super) subscriber_count: usize,
  pub(super) provided_tags: Vec<Tag>,
  pub(super) stale: bool,
  pub(super) in_flight: Option<RequestId>,
  pub(super) unused_since: Option<Instant>,
  /// Distinguishes this entry from a later one created under the same key
  pub(super) generation: u64,
}

impl CacheEntry {
  pub(super) fn new(query: Query, generation: u64) -> Self {
    Self {
      query,
      status: QueryStatus::Uninitialized,
      data: None,
      error: None,
      subscriber_count: 0,
      provided_tags: Vec::new(),
      stale: false,
      in_flight: None,
      unused_since: None,
      generation,
    }
  }

  pub fn query(&self) -> &Query {
    &self.query
  }

  pub fn kind(&self) -> EndpointKind {
    self.query.kind()
  }

  pub fn status(&self) -> QueryStatus {
    self.status
  }

  pub fn data(&self) -> Option<&Value> {
    self.data.as_ref()
  }

  /// Decode the cached payload; `None` when absent or of the wrong shape
  pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
    self
      .data
      .as_ref()
      .and_then(|v| crate::api::types::decode(v).ok())
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn subscriber_count(&self) -> usize {
    self.subscriber_count
  }

  pub fn provided_tags(&self) -> &[Tag] {
    &self.provided_tags
  }

  /// Marked for re-fetch by an invalidation
  pub fn is_stale(&self) -> bool {
    self.stale
  }

  /// A request is in flight (first load or refresh)
  pub fn is_fetching(&self) -> bool {
    self.status == QueryStatus::Pending
  }

  /// First load: in flight with nothing to show yet
  pub fn is_loading(&self) -> bool {
    self.is_fetching() && self.data.is_none()
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Rejected
  }
}

/// State of one dispatched mutation, readable by the view that started it
#[derive(Debug, Clone)]
pub struct MutationEntry {
  pub(super) kind: EndpointKind,
  pub(super) status: QueryStatus,
  pub(super) data: Option<Value>,
  pub(super) error: Option<ApiError>,
}

impl MutationEntry {
  pub(super) fn pending(kind: EndpointKind) -> Self {
    Self {
      kind,
      status: QueryStatus::Pending,
      data: None,
      error: None,
    }
  }

  pub fn kind(&self) -> EndpointKind {
    self.kind
  }

  pub fn status(&self) -> QueryStatus {
    self.status
  }

  pub fn data(&self) -> Option<&Value> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Pending
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Fulfilled
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Rejected
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_new_entry_is_uninitialized() {
    let entry = CacheEntry::new(Query::GetDataPoint(1), 1);
    assert_eq!(entry.status(), QueryStatus::Uninitialized);
    assert!(entry.data().is_none());
    assert_eq!(entry.subscriber_count(), 0);
    assert!(!entry.is_loading());
  }

  #[test]
  fn test_loading_vs_fetching() {
    let mut entry = CacheEntry::new(Query::GetDataPoint(1), 1);
    entry.status = QueryStatus::Pending;
    assert!(entry.is_loading());

    entry.data = Some(json!({"id": 1}));
    assert!(entry.is_fetching());
    assert!(!entry.is_loading());
  }

  #[test]
  fn test_decode() {
    let mut entry = CacheEntry::new(Query::FetchUserByToken, 1);
    entry.data = Some(json!({"id": 3, "email": "a@b.com"}));
    let user: Option<crate::api::types::User> = entry.decode();
    assert_eq!(user.map(|u| u.id), Some(3));

    let wrong: Option<Vec<u8>> = entry.decode();
    assert!(wrong.is_none());
  }
}
