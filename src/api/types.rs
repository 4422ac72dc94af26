//! Serde types matching the dashboard API's request and response bodies.
//!
//! The server renders JSON in camelCase, so every type here renames its
//! fields accordingly.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Decode an opaque cached payload into a typed value.
pub fn decode<T: DeserializeOwned>(value: &Value) -> serde_json::Result<T> {
  T::deserialize(value)
}

// ============================================================================
// Example data
// ============================================================================

/// One row of example data owned by the logged in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleData {
  pub id: u64,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub owner: Option<u64>,
}

/// Body for creating a new entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExampleData {
  pub name: String,
  pub email: String,
  pub message: String,
}

/// Partial update of an entry. The id travels in the path, not the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPatch {
  #[serde(skip)]
  pub id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl DataPatch {
  /// Build the patch sent by the update form: blank fields fall back to the
  /// record's current values and the email is never changed.
  pub fn from_form(current: &ExampleData, name: &str, message: &str) -> Self {
    let name = if name.is_empty() {
      current.name.clone()
    } else {
      name.to_string()
    };
    let message = if message.is_empty() {
      current.message.clone().unwrap_or_default()
    } else {
      message.to_string()
    };

    Self {
      id: current.id,
      name: Some(name),
      email: Some(current.email.clone()),
      message: Some(message),
    }
  }
}

// ============================================================================
// Pagination envelope
// ============================================================================

/// Pagination metadata returned alongside list results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
  pub previous: Option<String>,
  pub next: Option<String>,
  pub count: u64,
  pub current_page: u32,
  pub total_pages: u32,
  pub items_on_page: u32,
}

/// A page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  #[serde(default)]
  pub pagination: PageInfo,
  pub results: Vec<T>,
}

/// Arguments of the paginated list query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListArgs {
  pub limit: u32,
  pub page: u32,
}

impl Default for ListArgs {
  fn default() -> Self {
    Self { limit: 10, page: 1 }
  }
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub email: String,
}

/// Response of login, register and activate.
///
/// `token` is null for register and activate so the user has to confirm
/// their email before logging in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
  pub user: Option<User>,
  #[serde(default)]
  pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
  pub email: String,
  pub password: String,
  pub title: String,
  pub first_name: String,
  pub last_name: String,
  pub job_title: String,
}

/// Encoded user id and activation token from the emailed link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateRequest {
  pub id: String,
  pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetRequest {
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
  pub password: String,
  pub token: String,
}
