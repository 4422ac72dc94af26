//! The `Api` facade: cache store, session and flash messages wired together.
//!
//! Views only talk to this type. Each tick the app calls [`Api::poll`],
//! which applies finished requests to the cache and then routes the
//! resulting lifecycle events to the session and the message store.

use color_eyre::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::api::{Credentials, HttpTransport, Mutation, Query, Transport};
use crate::cache::{CacheEntry, CacheStore, MutationEntry, MutationId, Subscription};
use crate::config::Config;
use crate::messages::Messages;
use crate::pagination::PageLimit;
use crate::session::{SessionState, SessionStore, SqliteTokenStorage};
use crate::validation::Validator;

pub struct Api {
  store: CacheStore,
  session: SessionStore,
  messages: Messages,
  validator: Validator,
  default_limit: PageLimit,
}

impl Api {
  pub fn new(config: &Config, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
    Self {
      store: CacheStore::new(transport, config.cache.keep_unused_for()),
      session,
      messages: Messages::new(),
      validator: Validator::new(&config.validation),
      default_limit: config.pagination.default_limit,
    }
  }

  /// Open the token database and build the HTTP transport from config.
  pub fn connect(config: &Config) -> Result<Self> {
    let db_path = match &config.state_db {
      Some(path) => path.clone(),
      None => SqliteTokenStorage::default_path()?,
    };
    let storage = SqliteTokenStorage::open(&db_path)?;

    let credentials = Credentials::default();
    let session = SessionStore::new(Box::new(storage), credentials.clone());
    let transport = HttpTransport::new(&config.api, credentials)?;
    info!(url = %config.api.url, "connected");

    Ok(Self::new(config, Arc::new(transport), session))
  }

  pub fn session(&self) -> &SessionState {
    self.session.state()
  }

  pub fn messages(&self) -> &Messages {
    &self.messages
  }

  pub fn messages_mut(&mut self) -> &mut Messages {
    &mut self.messages
  }

  pub fn validator(&self) -> &Validator {
    &self.validator
  }

  pub fn default_limit(&self) -> PageLimit {
    self.default_limit
  }

  pub fn subscribe(&mut self, query: Query) -> Subscription {
    self.store.subscribe(query)
  }

  pub fn unsubscribe(&mut self, subscription: Subscription) {
    self.store.unsubscribe(subscription);
  }

  pub fn refetch(&mut self, subscription: &Subscription) {
    self.store.refetch(subscription);
  }

  /// The entry a subscription keeps alive
  pub fn entry(&self, subscription: &Subscription) -> Option<&CacheEntry> {
    self.store.get_entry(subscription.key())
  }

  pub fn mutate(&mut self, mutation: Mutation) -> MutationId {
    self.store.mutate(mutation)
  }

  pub fn mutation(&self, id: MutationId) -> Option<&MutationEntry> {
    self.store.mutation(id)
  }

  pub fn release_mutation(&mut self, id: MutationId) {
    self.store.release_mutation(id);
  }

  pub fn abort_mutation(&mut self, id: MutationId) {
    self.store.abort_mutation(id);
  }

  /// Log out. Cached results are dropped once the server confirms, like
  /// every other sign-out, when [`Api::poll`] routes the event.
  pub fn logout(&mut self) -> MutationId {
    let id = self.store.mutate(Mutation::LogoutUser);
    self.store.release_mutation(id);
    id
  }

  /// Apply finished requests and route their events. Returns true if
  /// anything visible changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.store.poll();
    changed |= self.route_events();
    changed |= self.messages.expire(Instant::now());
    changed
  }

  fn route_events(&mut self) -> bool {
    let mut changed = false;
    for event in self.store.drain_events() {
      let was_authenticated = self.session.is_authenticated();
      changed |= self.session.apply(&event);
      changed |= self.messages.apply(&event);

      if was_authenticated && !self.session.is_authenticated() {
        info!("signed out, clearing cached data");
        self.store.reset();
      }
    }
    changed
  }

  #[cfg(test)]
  pub async fn settle(&mut self) {
    self.store.settle().await;
    self.route_events();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::fake::FakeTransport;
  use crate::api::transport::Method;
  use crate::api::types::{ListArgs, LoginRequest, NewExampleData};
  use crate::api::{ApiError, ErrorBody};
  use crate::messages::AlertType;
  use crate::session::TokenStorage;
  use serde_json::json;

  fn api_with(fake: &FakeTransport, credentials: Credentials, token: Option<&str>) -> Api {
    let storage = SqliteTokenStorage::in_memory().unwrap();
    storage.save(token).unwrap();
    let session = SessionStore::new(Box::new(storage), credentials);
    Api::new(&Config::default(), Arc::new(fake.clone()), session)
  }

  fn unauthorized() -> ApiError {
    ApiError::Status {
      status: 401,
      body: ErrorBody::from_value(&json!({"detail": "Invalid token."})),
    }
  }

  #[tokio::test]
  async fn test_startup_with_bad_token_signs_out() {
    let credentials = Credentials::default();
    let fake = FakeTransport::with_credentials(credentials.clone());
    fake.respond(Method::Get, "/auth/user", Err(unauthorized()));
    let mut api = api_with(&fake, credentials.clone(), Some("stale"));

    assert!(api.session().is_authenticated);
    let _user = api.subscribe(Query::FetchUserByToken);
    api.settle().await;

    assert!(!api.session().is_authenticated);
    assert!(!api.session().is_fetching);
    assert_eq!(credentials.token(), None);
    assert_eq!(fake.seen_tokens(), vec![Some("stale".to_string())]);
  }

  #[tokio::test]
  async fn test_startup_with_unreachable_server_shows_anonymous() {
    let fake = FakeTransport::new();
    fake.respond(
      Method::Get,
      "/auth/user",
      Err(ApiError::Network("connection refused".to_string())),
    );
    let mut api = api_with(&fake, Credentials::default(), Some("abc"));

    let _user = api.subscribe(Query::FetchUserByToken);
    api.settle().await;

    assert!(!api.session().is_authenticated);
    assert!(!api.session().is_fetching);
    assert!(api.session().user.is_none());
  }

  #[tokio::test]
  async fn test_login_token_used_by_later_requests() {
    let credentials = Credentials::default();
    let fake = FakeTransport::with_credentials(credentials.clone());
    fake.respond(
      Method::Post,
      "/auth/login",
      Ok(json!({"user": {"id": 1, "email": "joe@x.com"}, "token": "t0k"})),
    );
    fake.respond(Method::Get, "/examples/", Ok(json!({"pagination": {}, "results": []})));
    let mut api = api_with(&fake, credentials.clone(), None);

    api.mutate(Mutation::LoginUser(LoginRequest {
      email: "joe@x.com".to_string(),
      password: "Passw0rd".to_string(),
    }));
    api.settle().await;
    assert!(api.session().is_authenticated);
    assert_eq!(api.session().user.as_ref().map(|u| u.email.as_str()), Some("joe@x.com"));

    let _list = api.subscribe(Query::GetData(ListArgs::default()));
    api.settle().await;
    assert_eq!(fake.seen_tokens(), vec![None, Some("t0k".to_string())]);
  }

  #[tokio::test]
  async fn test_add_entry_refreshes_list_and_flashes() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/", Ok(json!({"pagination": {}, "results": []})));
    fake.respond(
      Method::Get,
      "/examples/",
      Ok(json!({"pagination": {}, "results": [{"id": 1, "name": "Joe", "email": "joe@x.com", "message": "hi"}]})),
    );
    fake.respond(Method::Post, "/examples/", Ok(json!({"id": 1})));
    let mut api = api_with(&fake, Credentials::default(), Some("abc"));

    let list = api.subscribe(Query::GetData(ListArgs::default()));
    api.settle().await;
    api.mutate(Mutation::AddData(NewExampleData {
      name: "Joe".to_string(),
      email: "joe@x.com".to_string(),
      message: "hi".to_string(),
    }));
    api.settle().await;

    let page: crate::api::types::Page<crate::api::types::ExampleData> =
      api.entry(&list).and_then(|e| e.decode()).unwrap();
    assert_eq!(page.results[0].name, "Joe");
    let message = api.messages().current().unwrap();
    assert_eq!(message.alert_type, AlertType::Success);
    assert_eq!(message.msg, "Entry Added");
  }

  #[tokio::test]
  async fn test_unauthorized_data_request_clears_cache() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/examples/1/", Ok(json!({"id": 1})));
    fake.respond(Method::Delete, "/examples/1", Err(unauthorized()));
    let mut api = api_with(&fake, Credentials::default(), Some("abc"));

    let detail = api.subscribe(Query::GetDataPoint(1));
    api.settle().await;
    assert!(api.entry(&detail).and_then(|e| e.data()).is_some());

    api.mutate(Mutation::DeleteData(1));
    api.settle().await;
    assert!(!api.session().is_authenticated);
    assert!(api.entry(&detail).and_then(|e| e.data()).is_none());
  }

  #[tokio::test]
  async fn test_failed_logout_keeps_cached_list() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/auth/user", Ok(json!({"id": 1, "email": "joe@x.com"})));
    fake.respond(
      Method::Get,
      "/examples/",
      Ok(json!({"pagination": {}, "results": [{"id": 1, "name": "Joe", "email": "joe@x.com"}]})),
    );
    fake.respond(
      Method::Post,
      "/auth/logout",
      Err(ApiError::Status {
        status: 500,
        body: ErrorBody::default(),
      }),
    );
    let mut api = api_with(&fake, Credentials::default(), Some("abc"));
    let _user = api.subscribe(Query::FetchUserByToken);
    let list = api.subscribe(Query::GetData(ListArgs::default()));
    api.settle().await;

    api.logout();
    assert!(api.entry(&list).and_then(|e| e.data()).is_some());
    api.settle().await;

    assert!(api.session().is_authenticated);
    let entry = api.entry(&list).unwrap();
    assert!(entry.data().is_some());
    assert!(!entry.is_fetching());
  }

  #[tokio::test]
  async fn test_confirmed_logout_clears_cache() {
    let fake = FakeTransport::new();
    fake.respond(Method::Get, "/auth/user", Ok(json!({"id": 1, "email": "joe@x.com"})));
    fake.respond(Method::Get, "/examples/", Ok(json!({"pagination": {}, "results": []})));
    fake.respond(Method::Post, "/auth/logout", Ok(json!("")));
    let mut api = api_with(&fake, Credentials::default(), Some("abc"));
    let _user = api.subscribe(Query::FetchUserByToken);
    let list = api.subscribe(Query::GetData(ListArgs::default()));
    api.settle().await;

    api.logout();
    api.settle().await;

    assert!(!api.session().is_authenticated);
    assert!(api.entry(&list).and_then(|e| e.data()).is_none());
  }
}
