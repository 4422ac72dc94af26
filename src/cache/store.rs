//! The cache store: single owner of every cached query and mutation.
//!
//! Requests run on spawned tasks and report back through an inbox channel.
//! The UI thread drains that inbox in [`CacheStore::poll`] once per tick, so
//! all state changes happen in one place, in arrival order.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::{CacheEntry, MutationEntry, QueryStatus, RequestId};
use super::key::CacheKey;
use super::optimistic::{assign, OptimisticPatch};
use super::tags::{Tag, TagIndex};
use crate::api::{ApiError, EndpointKind, Mutation, Query, Transport};

pub type MutationId = u64;
type SubscriptionId = u64;

/// Where an endpoint call is in its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
  Pending,
  Fulfilled(Value),
  Rejected(ApiError),
}

/// Emitted for every query and mutation transition, for observers such as
/// the session and the flash messages.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
  pub kind: EndpointKind,
  pub phase: Phase,
}

enum StoreMessage {
  QuerySettled {
    key: CacheKey,
    request: RequestId,
    result: Result<Value, ApiError>,
  },
  MutationSettled {
    id: MutationId,
    result: Result<Value, ApiError>,
  },
  Release(SubscriptionId),
}

/// Keeps a cache entry alive. Dropping the handle releases the
/// subscription on the store's next poll.
#[derive(Debug)]
pub struct Subscription {
  id: SubscriptionId,
  key: CacheKey,
  inbox: mpsc::UnboundedSender<StoreMessage>,
  released: bool,
}

impl Subscription {
  pub fn key(&self) -> &CacheKey {
    &self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if !self.released {
      let _ = self.inbox.send(StoreMessage::Release(self.id));
    }
  }
}

impl std::fmt::Debug for StoreMessage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::QuerySettled { key, request, .. } => write!(f, "QuerySettled({}, #{})", key, request),
      Self::MutationSettled { id, .. } => write!(f, "MutationSettled(#{})", id),
      Self::Release(id) => write!(f, "Release(#{})", id),
    }
  }
}

struct MutationRecord {
  mutation: Mutation,
  state: MutationEntry,
  patch: Option<OptimisticPatch>,
  task: Option<JoinHandle<()>>,
  /// The dispatching view no longer reads the result
  released: bool,
}

pub struct CacheStore {
  transport: Arc<dyn Transport>,
  entries: HashMap<CacheKey, CacheEntry>,
  tags: TagIndex,
  subscriptions: HashMap<SubscriptionId, CacheKey>,
  mutations: HashMap<MutationId, MutationRecord>,
  events: Vec<LifecycleEvent>,
  inbox_tx: mpsc::UnboundedSender<StoreMessage>,
  inbox_rx: mpsc::UnboundedReceiver<StoreMessage>,
  keep_unused_for: Duration,
  next_id: u64,
}

impl CacheStore {
  pub fn new(transport: Arc<dyn Transport>, keep_unused_for: Duration) -> Self {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    Self {
      transport,
      entries: HashMap::new(),
      tags: TagIndex::new(),
      subscriptions: HashMap::new(),
      mutations: HashMap::new(),
      events: Vec::new(),
      inbox_tx,
      inbox_rx,
      keep_unused_for,
      next_id: 1,
    }
  }

  fn next_id(&mut self) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// Start using a query. Fetches unless a usable result is cached or a
  /// request for the same key is already in flight.
  ///
  /// The entry is readable through [`CacheStore::get_entry`] with the
  /// handle's key for as long as the handle lives.
  pub fn subscribe(&mut self, query: Query) -> Subscription {
    let key = query.cache_key();
    let id = self.next_id();
    let generation = self.next_id();

    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(query, generation));
    entry.subscriber_count += 1;
    entry.unused_since = None;
    let needs_fetch = entry.in_flight.is_none()
      && (entry.stale
        || matches!(entry.status, QueryStatus::Uninitialized | QueryStatus::Rejected));

    self.subscriptions.insert(id, key.clone());
    debug!(%key, subscription = id, "subscribed");
    if needs_fetch {
      self.start_fetch(&key);
    }

    Subscription {
      id,
      key,
      inbox: self.inbox_tx.clone(),
      released: false,
    }
  }

  /// Stop using a query. The entry stays cached for the grace period.
  pub fn unsubscribe(&mut self, mut subscription: Subscription) {
    subscription.released = true;
    self.release(subscription.id);
  }

  fn release(&mut self, id: SubscriptionId) {
    let Some(key) = self.subscriptions.remove(&id) else {
      return;
    };
    if let Some(entry) = self.entries.get_mut(&key) {
      entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
      if entry.subscriber_count == 0 {
        entry.unused_since = Some(Instant::now());
      }
    }
    debug!(%key, subscription = id, "released");
  }

  pub fn get_entry(&self, key: &CacheKey) -> Option<&CacheEntry> {
    self.entries.get(key)
  }

  /// Fetch again on user request, unless a request is already in flight.
  pub fn refetch(&mut self, subscription: &Subscription) {
    let idle = self
      .entries
      .get(&subscription.key)
      .is_some_and(|e| e.in_flight.is_none());
    if idle {
      self.start_fetch(&subscription.key.clone());
    }
  }

  fn start_fetch(&mut self, key: &CacheKey) {
    let request_id = self.next_id();
    let Some(entry) = self.entries.get_mut(key) else {
      return;
    };
    entry.status = QueryStatus::Pending;
    entry.in_flight = Some(request_id);
    entry.stale = false;
    let request = entry.query.request();
    let kind = entry.query.kind();

    self.events.push(LifecycleEvent {
      kind,
      phase: Phase::Pending,
    });
    debug!(%key, request = request_id, "fetching {}", request.describe());

    let transport = Arc::clone(&self.transport);
    let inbox = self.inbox_tx.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = transport.send(request).await;
      let _ = inbox.send(StoreMessage::QuerySettled {
        key,
        request: request_id,
        result,
      });
    });
  }

  fn settle_query(&mut self, key: CacheKey, request: RequestId, result: Result<Value, ApiError>) {
    let Some(entry) = self.entries.get_mut(&key) else {
      debug!(%key, "dropping result for evicted entry");
      return;
    };
    if entry.in_flight != Some(request) {
      debug!(%key, request, "dropping superseded result");
      return;
    }
    entry.in_flight = None;

    let phase = match result {
      Ok(data) => {
        let tags = entry.query.provides_tags(&data);
        self.tags.register_tags(&key, tags.iter().copied());
        entry.provided_tags = tags;
        entry.data = Some(data.clone());
        entry.error = None;
        entry.status = QueryStatus::Fulfilled;
        Phase::Fulfilled(data)
      }
      Err(err) => {
        warn!(%key, "query failed: {}", err);
        let tags = entry.query.provides_tags(&Value::Null);
        self.tags.register_tags(&key, tags.iter().copied());
        entry.provided_tags = tags;
        entry.error = Some(err.clone());
        entry.status = QueryStatus::Rejected;
        Phase::Rejected(err)
      }
    };
    let kind = entry.query.kind();
    let refetch = entry.stale && entry.subscriber_count > 0;

    self.events.push(LifecycleEvent { kind, phase });
    if refetch {
      debug!(%key, "invalidated while in flight, fetching again");
      self.start_fetch(&key);
    }
  }

  /// Mark every entry providing one of `tags` stale, and re-fetch those
  /// that are subscribed. Entries with a request in flight re-fetch once it
  /// completes.
  pub fn invalidate_tags(&mut self, tags: &[Tag]) {
    if tags.is_empty() {
      return;
    }
    for key in self.tags.keys_providing(tags) {
      let Some(entry) = self.entries.get_mut(&key) else {
        continue;
      };
      entry.stale = true;
      let refetch = entry.subscriber_count > 0 && entry.in_flight.is_none();
      debug!(%key, refetch, "invalidated");
      if refetch {
        self.start_fetch(&key);
      }
    }
  }

  /// Dispatch a mutation. Its optimistic patch, if any, is applied before
  /// this returns.
  pub fn mutate(&mut self, mutation: Mutation) -> MutationId {
    let id = self.next_id();
    let kind = mutation.kind();

    let patch = mutation.optimistic_patch().and_then(|target| {
      let entry = self.entries.get_mut(&target.key)?;
      OptimisticPatch::begin(&target.key, entry, |draft| assign(draft, &target.fields))
    });

    self.events.push(LifecycleEvent {
      kind,
      phase: Phase::Pending,
    });
    let request = mutation.request();
    debug!(mutation = id, "{} {}", kind.name(), request.describe());

    let transport = Arc::clone(&self.transport);
    let inbox = self.inbox_tx.clone();
    let task = tokio::spawn(async move {
      let result = transport.send(request).await;
      let _ = inbox.send(StoreMessage::MutationSettled { id, result });
    });

    self.mutations.insert(
      id,
      MutationRecord {
        mutation,
        state: MutationEntry::pending(kind),
        patch,
        task: Some(task),
        released: false,
      },
    );
    id
  }

  pub fn mutation(&self, id: MutationId) -> Option<&MutationEntry> {
    self.mutations.get(&id).map(|r| &r.state)
  }

  /// Forget a mutation's result. A pending mutation still settles (and
  /// still invalidates) but nobody is told about the outcome.
  pub fn release_mutation(&mut self, id: MutationId) {
    let Some(record) = self.mutations.get_mut(&id) else {
      return;
    };
    if record.state.status == QueryStatus::Pending {
      record.released = true;
    } else {
      self.mutations.remove(&id);
    }
  }

  /// Cancel a pending mutation. It settles as rejected, so its optimistic
  /// patch is rolled back.
  pub fn abort_mutation(&mut self, id: MutationId) {
    let Some(record) = self.mutations.get_mut(&id) else {
      return;
    };
    if record.state.status != QueryStatus::Pending {
      return;
    }
    if let Some(task) = record.task.take() {
      task.abort();
    }
    self.settle_mutation(id, Err(ApiError::Aborted));
  }

  fn settle_mutation(&mut self, id: MutationId, result: Result<Value, ApiError>) {
    let Some(record) = self.mutations.get_mut(&id) else {
      return;
    };
    if record.state.status != QueryStatus::Pending {
      return;
    }
    record.task = None;

    let tags = record.mutation.invalidates_tags(result.as_ref());
    let patch = record.patch.take();
    let phase = match result {
      Ok(data) => {
        if let Some(patch) = patch {
          patch.commit();
        }
        record.state.status = QueryStatus::Fulfilled;
        record.state.data = Some(data.clone());
        Phase::Fulfilled(data)
      }
      Err(err) => {
        warn!(mutation = id, "{} failed: {}", record.state.kind.name(), err);
        if let Some(patch) = patch {
          patch.rollback(&mut self.entries);
        }
        record.state.status = QueryStatus::Rejected;
        record.state.error = Some(err.clone());
        Phase::Rejected(err)
      }
    };
    let kind = record.state.kind;
    if record.released {
      self.mutations.remove(&id);
    }

    self.events.push(LifecycleEvent { kind, phase });
    self.invalidate_tags(&tags);
  }

  /// Evict entries unused for longer than the grace period. Returns how
  /// many were evicted.
  pub fn collect_garbage(&mut self, now: Instant) -> usize {
    let keep = self.keep_unused_for;
    let expired: Vec<CacheKey> = self
      .entries
      .iter()
      .filter(|(_, e)| {
        e.subscriber_count == 0
          && e
            .unused_since
            .is_some_and(|since| now.saturating_duration_since(since) >= keep)
      })
      .map(|(k, _)| k.clone())
      .collect();

    for key in &expired {
      self.entries.remove(key);
      self.tags.remove_key(key);
      debug!(%key, "evicted");
    }
    expired.len()
  }

  /// Drop every cached result, as on logout. Subscribed entries are kept
  /// but emptied, and fetch again on their next subscribe or refetch.
  pub fn reset(&mut self) {
    self.entries.retain(|_, e| e.subscriber_count > 0);
    self.tags = TagIndex::new();
    for entry in self.entries.values_mut() {
      entry.status = QueryStatus::Uninitialized;
      entry.data = None;
      entry.error = None;
      entry.provided_tags.clear();
      entry.in_flight = None;
      entry.stale = true;
    }
    debug!("cache reset");
  }

  /// Apply every result that arrived since the last call, then evict
  /// expired entries. Returns true if anything changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(message) = self.inbox_rx.try_recv() {
      self.handle(message);
      changed = true;
    }
    changed |= self.collect_garbage(Instant::now()) > 0;
    changed
  }

  fn handle(&mut self, message: StoreMessage) {
    match message {
      StoreMessage::QuerySettled {
        key,
        request,
        result,
      } => self.settle_query(key, request, result),
      StoreMessage::MutationSettled { id, result } => self.settle_mutation(id, result),
      StoreMessage::Release(id) => self.release(id),
    }
  }

  /// Lifecycle events since the last drain, oldest first
  pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
    std::mem::take(&mut self.events)
  }

  /// Number of queries and mutations awaiting a response
  pub fn in_flight(&self) -> usize {
    let queries = self.entries.values().filter(|e| e.in_flight.is_some()).count();
    let mutations = self
      .mutations
      .values()
      .filter(|r| r.state.status == QueryStatus::Pending)
      .count();
    queries + mutations
  }

  /// Wait for every in-flight request, including re-fetches triggered
  /// along the way.
  #[cfg(test)]
  pub async fn settle(&mut self) {
    while self.in_flight() > 0 {
      match self.inbox_rx.recv().await {
        Some(message) => self.handle(message),
        None => break,
      }
    }
    while let Ok(message) = self.inbox_rx.try_recv() {
      self.handle(message);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::{ApiRequest, Method};
  use crate::api::types::{DataPatch, ListArgs, NewExampleData};
  use crate::api::ErrorBody;
  use async_trait::async_trait;
  use serde_json::json;

  const LIST: &str = "/examples/";

  fn store_with(fake: &FakeTransport) -> CacheStore {
    CacheStore::new(Arc::new(fake.clone()), Duration::from_secs(60))
  }

  fn bad_request() -> ApiError {
    ApiError::Status {
      status: 400,
      body: ErrorBody::default(),
    }
  }

  fn page(rows: Value) -> Value {
    json!({"pagination": {"count": 1, "currentPage": 1, "totalPages": 1}, "results": rows})
  }

  #[tokio::test]
  async fn test_concurrent_subscribers_share_one_request() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, LIST, Ok(page(json!([]))));
    let mut store = store_with(&fake);

    let a = store.subscribe(Query::GetData(ListArgs::default()));
    let b = store.subscribe(Query::GetData(ListArgs::default()));
    store.settle().await;

    assert_eq!(fake.call_count(Method::Get, LIST), 1);
    let entry = store.get_entry(a.key()).unwrap();
    assert_eq!(entry.status(), QueryStatus::Fulfilled);
    assert_eq!(entry.subscriber_count(), 2);
    assert_eq!(a.key(), b.key());
  }

  #[tokio::test]
  async fn test_cached_result_reused_on_resubscribe() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    store.unsubscribe(sub);

    let sub = store.subscribe(Query::GetDataPoint(1));
    assert!(!store.get_entry(sub.key()).unwrap().is_fetching());
    store.settle().await;
    assert_eq!(fake.call_count(Method::Get, "/examples/1/"), 1);
  }

  #[tokio::test]
  async fn test_rejected_entry_fetches_on_next_subscribe() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Err(bad_request()));
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    assert!(store.get_entry(sub.key()).unwrap().is_error());
    store.unsubscribe(sub);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    let entry = store.get_entry(sub.key()).unwrap();
    assert_eq!(entry.status(), QueryStatus::Fulfilled);
    assert!(entry.error().is_none());
  }

  #[tokio::test]
  async fn test_invalidation_refetches_only_subscribed_entries() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    fake.respond(Method::Get, "/examples/2/", Ok(json!({"id": 2})));
    fake.respond(Method::Get, LIST, Ok(page(json!([{"id": 1}, {"id": 2}]))));
    let mut store = store_with(&fake);

    let list = store.subscribe(Query::GetData(ListArgs::default()));
    let one = store.subscribe(Query::GetDataPoint(1));
    let two = store.subscribe(Query::GetDataPoint(2));
    store.settle().await;
    let two_key = two.key().clone();
    store.unsubscribe(two);

    store.invalidate_tags(&[Tag::id("data", 2)]);
    assert!(store.get_entry(list.key()).unwrap().is_fetching());
    assert!(!store.get_entry(one.key()).unwrap().is_stale());
    let two_entry = store.get_entry(&two_key).unwrap();
    assert!(two_entry.is_stale());
    assert!(!two_entry.is_fetching());

    store.settle().await;
    assert_eq!(fake.call_count(Method::Get, LIST), 2);
    assert_eq!(fake.call_count(Method::Get, "/examples/1/"), 1);
    assert_eq!(fake.call_count(Method::Get, "/examples/2/"), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_fetches_on_resubscribe() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/2/", Ok(json!({"id": 2})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(2));
    store.settle().await;
    store.unsubscribe(sub);
    store.invalidate_tags(&[Tag::id("data", 2)]);

    let _sub = store.subscribe(Query::GetDataPoint(2));
    store.settle().await;
    assert_eq!(fake.call_count(Method::Get, "/examples/2/"), 2);
  }

  #[tokio::test]
  async fn test_invalidated_while_pending_fetches_again() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;

    store.refetch(&sub);
    store.invalidate_tags(&[Tag::id("data", 1)]);
    assert!(store.get_entry(sub.key()).unwrap().is_stale());

    store.settle().await;
    assert_eq!(fake.call_count(Method::Get, "/examples/1/"), 3);
    assert!(!store.get_entry(sub.key()).unwrap().is_stale());
  }

  #[tokio::test]
  async fn test_add_then_list_shows_new_row() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, LIST, Ok(page(json!([]))));
    fake.respond(
      Method::Get,
      LIST,
      Ok(page(json!([{"id": 1, "name": "Joe", "email": "joe@x.com"}]))),
    );
    fake.respond(Method::Post, LIST, Ok(json!({"id": 1, "name": "Joe"})));
    let mut store = store_with(&fake);

    let list = store.subscribe(Query::GetData(ListArgs::default()));
    store.settle().await;

    let id = store.mutate(Mutation::AddData(NewExampleData {
      name: "Joe".to_string(),
      email: "joe@x.com".to_string(),
      message: "hi".to_string(),
    }));
    store.settle().await;

    assert!(store.mutation(id).unwrap().is_success());
    let data = store.get_entry(list.key()).unwrap().data().unwrap();
    assert_eq!(data["results"][0]["name"], "Joe");
    assert_eq!(fake.call_count(Method::Get, LIST), 2);
  }

  fn rename(id: u64, name: &str) -> Mutation {
    Mutation::UpdateData(DataPatch {
      id,
      name: Some(name.to_string()),
      email: None,
      message: None,
    })
  }

  #[tokio::test]
  async fn test_failed_update_rolls_back() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1, "name": "Ann"})));
    fake.respond(Method::Patch, "/examples/1/", Err(bad_request()));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;

    let id = store.mutate(rename(1, "Bob"));
    assert_eq!(store.get_entry(sub.key()).unwrap().data().unwrap()["name"], "Bob");

    store.settle().await;
    assert!(store.mutation(id).unwrap().is_error());
    assert_eq!(store.get_entry(sub.key()).unwrap().data().unwrap()["name"], "Ann");
    // the failure still invalidates the record
    assert_eq!(fake.call_count(Method::Get, "/examples/1/"), 2);
  }

  #[tokio::test]
  async fn test_successful_update_keeps_patch_until_refetch() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1, "name": "Ann"})));
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1, "name": "Bob"})));
    fake.respond(Method::Patch, "/examples/1/", Ok(json!({"id": 1, "name": "Bob"})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    store.mutate(rename(1, "Bob"));
    store.settle().await;

    assert_eq!(store.get_entry(sub.key()).unwrap().data().unwrap()["name"], "Bob");
  }

  #[tokio::test]
  async fn test_successful_update_survives_failed_refetch() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1, "name": "Ann"})));
    fake.respond(
      Method::Get,
      "/examples/1/",
      Err(ApiError::Network("connection reset".to_string())),
    );
    fake.respond(Method::Patch, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    let id = store.mutate(rename(1, "Bob"));
    store.settle().await;

    assert!(store.mutation(id).unwrap().is_success());
    assert_eq!(fake.call_count(Method::Get, "/examples/1/"), 2);
    let entry = store.get_entry(sub.key()).unwrap();
    assert!(entry.is_error());
    assert_eq!(entry.data().unwrap()["name"], "Bob");
  }

  #[tokio::test]
  async fn test_lifecycle_events_in_order() {
    let fake = FakeTransport::new();
    fake.respond(Method::Post, "/auth/logout", Ok(json!("")));
    let mut store = store_with(&fake);

    store.mutate(Mutation::LogoutUser);
    store.settle().await;

    let phases: Vec<Phase> = store.drain_events().into_iter().map(|e| e.phase).collect();
    assert_eq!(phases, vec![Phase::Pending, Phase::Fulfilled(json!(""))]);
    assert!(store.drain_events().is_empty());
  }

  #[tokio::test]
  async fn test_eviction_after_grace_period() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    let key = sub.key().clone();

    assert_eq!(store.collect_garbage(Instant::now() + Duration::from_secs(120)), 0);
    store.unsubscribe(sub);
    assert_eq!(store.collect_garbage(Instant::now()), 0);
    assert_eq!(store.collect_garbage(Instant::now() + Duration::from_secs(61)), 1);
    assert!(store.get_entry(&key).is_none());
    assert!(store.tags.keys_providing(&[Tag::id("data", 1)]).is_empty());
  }

  #[tokio::test]
  async fn test_dropped_handle_releases_on_poll() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    let mut store = store_with(&fake);

    let sub = store.subscribe(Query::GetDataPoint(1));
    store.settle().await;
    let key = sub.key().clone();
    drop(sub);

    assert_eq!(store.get_entry(&key).unwrap().subscriber_count(), 1);
    store.poll();
    assert_eq!(store.get_entry(&key).unwrap().subscriber_count(), 0);
  }

  struct StalledTransport;

  #[async_trait]
  impl Transport for StalledTransport {
    async fn send(&self, _request: ApiRequest) -> Result<Value, ApiError> {
      std::future::pending().await
    }
  }

  #[tokio::test]
  async fn test_abort_settles_as_rejected() {
    let mut store = CacheStore::new(Arc::new(StalledTransport), Duration::from_secs(60));
    let id = store.mutate(Mutation::DeleteData(4));
    assert!(store.mutation(id).unwrap().is_loading());

    store.abort_mutation(id);
    let entry = store.mutation(id).unwrap();
    assert!(entry.is_error());
    assert_eq!(entry.error(), Some(&ApiError::Aborted));
    assert_eq!(store.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_released_mutation_is_forgotten_after_settling() {
    let fake = FakeTransport::new();
    fake.respond(Method::Delete, "/examples/4", Ok(Value::Null));
    let mut store = store_with(&fake);

    let id = store.mutate(Mutation::DeleteData(4));
    store.release_mutation(id);
    assert!(store.mutation(id).is_some());
    store.settle().await;
    assert!(store.mutation(id).is_none());
  }

  #[tokio::test]
  async fn test_reset_empties_cache() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    fake.respond(Method::Get, "/auth/user", Ok(json!({"id": 1, "email": "a@b.com"})));
    let mut store = store_with(&fake);

    let old = store.subscribe(Query::GetDataPoint(1));
    let user = store.subscribe(Query::FetchUserByToken);
    store.settle().await;
    let old_key = old.key().clone();
    store.unsubscribe(old);

    store.reset();
    assert!(store.get_entry(&old_key).is_none());
    let entry = store.get_entry(user.key()).unwrap();
    assert!(entry.data().is_none());
    assert_eq!(entry.status(), QueryStatus::Uninitialized);
  }
}
