//! Session state, driven by the lifecycle of auth endpoints.
//!
//! The session never talks to the network itself. The cache store emits a
//! [`LifecycleEvent`] for every request phase; [`SessionStore::apply`] looks
//! the (endpoint, phase) pair up in a transition table and applies the
//! result. The token is persisted in a small SQLite key/value table and
//! published to the transport through [`Credentials`].

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::types::{decode, User};
use crate::api::{Credentials, EndpointKind};
use crate::cache::{LifecycleEvent, Phase};

const TOKEN_KEY: &str = "token";
/// Stored in place of a token when signed out
const NO_TOKEN: &str = "null";

/// Durable storage for the bearer token
pub trait TokenStorage: Send {
  fn load(&self) -> Result<Option<String>>;
  /// Persist `token`; `None` writes the "no token" marker
  fn save(&self, token: Option<&str>) -> Result<()>;
}

/// Token storage in a SQLite key/value table.
pub struct SqliteTokenStorage {
  conn: Mutex<Connection>,
}

impl SqliteTokenStorage {
  /// Open (or create) the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create state directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open state database at {}: {}", path.display(), e))?;
    Self::with_connection(conn)
  }

  /// Non-persistent storage.
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Default database location in the platform data directory.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("exdash").join("state.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run state migrations: {}", e))?;
    Ok(())
  }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl TokenStorage for SqliteTokenStorage {
  fn load(&self) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let value: Option<String> = conn
      .query_row(
        "SELECT value FROM kv WHERE key = ?",
        params![TOKEN_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read token: {}", e))?;

    Ok(value.filter(|v| v != NO_TOKEN))
  }

  fn save(&self, token: Option<&str>) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![TOKEN_KEY, token.unwrap_or(NO_TOKEN)],
      )
      .map_err(|e| eyre!("Failed to write token: {}", e))?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
  pub user: Option<User>,
  pub token: Option<String>,
  pub is_authenticated: bool,
  pub is_fetching: bool,
}

/// Phase of an event, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
  Pending,
  Fulfilled,
  Rejected,
}

impl From<&Phase> for PhaseKind {
  fn from(phase: &Phase) -> Self {
    match phase {
      Phase::Pending => Self::Pending,
      Phase::Fulfilled(_) => Self::Fulfilled,
      Phase::Rejected(_) => Self::Rejected,
    }
  }
}

/// What a lifecycle event does to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
  Ignore,
  StartFetching,
  StopFetching,
  /// Take the user (and token, if any) from the payload
  Authenticate,
  /// An account exists but is not yet usable
  Registered,
  /// The stored token could not be checked. The user sees the login
  /// screen, but the token is kept for the next start.
  Unverified,
  SignOut,
}

/// The transition table. Authorization failures are handled before the
/// lookup, since they apply to every endpoint.
fn transition(kind: EndpointKind, phase: PhaseKind) -> Transition {
  use EndpointKind::*;
  use PhaseKind::*;

  if !kind.is_auth() {
    return Transition::Ignore;
  }
  match (kind, phase) {
    (_, Pending) => Transition::StartFetching,
    (LoginUser | FetchUserByToken, Fulfilled) => Transition::Authenticate,
    (RegisterUser, Fulfilled) => Transition::Registered,
    (LogoutUser, Fulfilled) => Transition::SignOut,
    (ActivateUser | RequestNewPassword | ChangeNewPassword, Fulfilled) => Transition::StopFetching,
    (FetchUserByToken, Rejected) => Transition::Unverified,
    (_, Rejected) => Transition::StopFetching,
    _ => Transition::Ignore,
  }
}

pub struct SessionStore {
  state: SessionState,
  storage: Box<dyn TokenStorage>,
  credentials: Credentials,
}

impl SessionStore {
  /// Load the persisted token. The session starts out authenticated so the
  /// guarded views do not flash the login screen while the token is checked.
  pub fn new(storage: Box<dyn TokenStorage>, credentials: Credentials) -> Self {
    let token = storage.load().unwrap_or_else(|e| {
      warn!("Could not load persisted token: {}", e);
      None
    });
    credentials.set(token.clone());

    Self {
      state: SessionState {
        user: None,
        token,
        is_authenticated: true,
        is_fetching: false,
      },
      storage,
      credentials,
    }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn is_authenticated(&self) -> bool {
    self.state.is_authenticated
  }

  pub fn is_fetching(&self) -> bool {
    self.state.is_fetching
  }

  /// Apply one lifecycle event. Returns true if the session changed.
  pub fn apply(&mut self, event: &LifecycleEvent) -> bool {
    let before = self.state.clone();

    let forced_out = matches!(&event.phase, Phase::Rejected(err) if err.is_unauthorized());
    let step = if forced_out {
      info!("{} was rejected as unauthorized, signing out", event.kind.name());
      Transition::SignOut
    } else {
      transition(event.kind, PhaseKind::from(&event.phase))
    };

    match step {
      Transition::Ignore => {}
      Transition::StartFetching => self.state.is_fetching = true,
      Transition::StopFetching => self.state.is_fetching = false,
      Transition::Authenticate => {
        if let Phase::Fulfilled(payload) = &event.phase {
          self.authenticate(payload);
        }
      }
      Transition::Registered => {
        self.state.is_fetching = false;
        self.state.is_authenticated = false;
        self.set_token(None);
      }
      Transition::Unverified => {
        self.state.is_fetching = false;
        self.state.is_authenticated = false;
        self.state.user = None;
      }
      Transition::SignOut => {
        self.state.is_fetching = false;
        self.state.is_authenticated = false;
        self.state.user = None;
        self.set_token(None);
      }
    }

    if self.state != before {
      debug!(
        authenticated = self.state.is_authenticated,
        fetching = self.state.is_fetching,
        "session updated by {}",
        event.kind.name()
      );
      true
    } else {
      false
    }
  }

  fn authenticate(&mut self, payload: &Value) {
    let user = payload.get("user").unwrap_or(payload);
    self.state.user = decode(user).ok();
    self.state.is_authenticated = true;
    self.state.is_fetching = false;

    let token = payload
      .get("token")
      .and_then(Value::as_str)
      .filter(|t| *t != NO_TOKEN);
    if let Some(token) = token {
      self.set_token(Some(token.to_string()));
    }
  }

  fn set_token(&mut self, token: Option<String>) {
    if let Err(e) = self.storage.save(token.as_deref()) {
      warn!("Could not persist token: {}", e);
    }
    self.credentials.set(token.clone());
    self.state.token = token;
  }
}
