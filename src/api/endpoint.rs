//! Endpoint definitions: request shape, tag rules and optimistic patches.

use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use super::transport::{ApiRequest, Method};
use super::types::{
  ActivateRequest, DataPatch, ListArgs, LoginRequest, NewExampleData, PasswordResetConfirm,
  PasswordResetRequest, RegisterRequest,
};
use crate::cache::{CacheKey, Tag};

/// Tag resource for example data
pub const DATA: &str = "data";

/// Every endpoint the client talks to, without its argument.
///
/// Lifecycle events and cache keys are identified by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
  RegisterUser,
  ActivateUser,
  RequestNewPassword,
  ChangeNewPassword,
  LoginUser,
  LogoutUser,
  FetchUserByToken,
  GetData,
  GetDataPoint,
  AddData,
  UpdateData,
  DeleteData,
}

impl EndpointKind {
  pub fn name(self) -> &'static str {
    match self {
      Self::RegisterUser => "registerUser",
      Self::ActivateUser => "activateUser",
      Self::RequestNewPassword => "requestNewPassword",
      Self::ChangeNewPassword => "changeNewPassword",
      Self::LoginUser => "loginUser",
      Self::LogoutUser => "logoutUser",
      Self::FetchUserByToken => "fetchUserByToken",
      Self::GetData => "getData",
      Self::GetDataPoint => "getDataPoint",
      Self::AddData => "addData",
      Self::UpdateData => "updateData",
      Self::DeleteData => "deleteData",
    }
  }

  /// Endpoints whose lifecycle drives the session state
  pub fn is_auth(self) -> bool {
    matches!(
      self,
      Self::RegisterUser
        | Self::ActivateUser
        | Self::RequestNewPassword
        | Self::ChangeNewPassword
        | Self::LoginUser
        | Self::LogoutUser
        | Self::FetchUserByToken
    )
  }
}

/// Cached, subscribable reads
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
  FetchUserByToken,
  GetData(ListArgs),
  GetDataPoint(u64),
}

impl Query {
  pub fn kind(&self) -> EndpointKind {
    match self {
      Self::FetchUserByToken => EndpointKind::FetchUserByToken,
      Self::GetData(_) => EndpointKind::GetData,
      Self::GetDataPoint(_) => EndpointKind::GetDataPoint,
    }
  }

  pub fn cache_key(&self) -> CacheKey {
    let name = self.kind().name();
    match self {
      Self::FetchUserByToken => CacheKey::new(name, &()),
      Self::GetData(args) => CacheKey::new(name, args),
      Self::GetDataPoint(id) => CacheKey::new(name, id),
    }
  }

  pub fn request(&self) -> ApiRequest {
    match self {
      Self::FetchUserByToken => ApiRequest::new(Method::Get, "/auth/user"),
      Self::GetData(args) => ApiRequest::new(Method::Get, "/examples/")
        .with_query("limit", args.limit)
        .with_query("page", args.page),
      Self::GetDataPoint(id) => ApiRequest::new(Method::Get, format!("/examples/{}/", id)),
    }
  }

  /// Tags provided by a fulfilled result of this query
  pub fn provides_tags(&self, result: &Value) -> Vec<Tag> {
    match self {
      Self::FetchUserByToken => Vec::new(),
      Self::GetData(_) => {
        let mut tags: Vec<Tag> = result
          .get("results")
          .and_then(Value::as_array)
          .map(|rows| {
            rows
              .iter()
              .filter_map(|row| row.get("id").and_then(Value::as_u64))
              .map(|id| Tag::id(DATA, id))
              .collect()
          })
          .unwrap_or_default();
        tags.push(Tag::list(DATA));
        tags
      }
      Self::GetDataPoint(id) => vec![Tag::id(DATA, *id)],
    }
  }
}

/// One-shot writes, never cached
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  RegisterUser(RegisterRequest),
  ActivateUser(ActivateRequest),
  RequestNewPassword(PasswordResetRequest),
  ChangeNewPassword(PasswordResetConfirm),
  LoginUser(LoginRequest),
  LogoutUser,
  AddData(NewExampleData),
  UpdateData(DataPatch),
  DeleteData(u64),
}

/// A speculative change to apply to a cached query before the server
/// confirms the mutation
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSpec {
  pub key: CacheKey,
  /// Fields assigned onto the cached object
  pub fields: Value,
}

impl Mutation {
  pub fn kind(&self) -> EndpointKind {
    match self {
      Self::RegisterUser(_) => EndpointKind::RegisterUser,
      Self::ActivateUser(_) => EndpointKind::ActivateUser,
      Self::RequestNewPassword(_) => EndpointKind::RequestNewPassword,
      Self::ChangeNewPassword(_) => EndpointKind::ChangeNewPassword,
      Self::LoginUser(_) => EndpointKind::LoginUser,
      Self::LogoutUser => EndpointKind::LogoutUser,
      Self::AddData(_) => EndpointKind::AddData,
      Self::UpdateData(_) => EndpointKind::UpdateData,
      Self::DeleteData(_) => EndpointKind::DeleteData,
    }
  }

  pub fn request(&self) -> ApiRequest {
    let post = |path: &str, body: Value| ApiRequest::new(Method::Post, path).with_body(body);
    match self {
      Self::RegisterUser(body) => post("/auth/register", to_body(body)),
      Self::ActivateUser(body) => post("/auth/activate", to_body(body)),
      Self::RequestNewPassword(body) => post("/auth/password-reset/", to_body(body)),
      Self::ChangeNewPassword(body) => post("/auth/password-reset/confirm/", to_body(body)),
      Self::LoginUser(body) => post("/auth/login", to_body(body)),
      Self::LogoutUser => ApiRequest::new(Method::Post, "/auth/logout").as_text(),
      Self::AddData(body) => post("/examples/", to_body(body)),
      Self::UpdateData(patch) => {
        ApiRequest::new(Method::Patch, format!("/examples/{}/", patch.id)).with_body(to_body(patch))
      }
      Self::DeleteData(id) => ApiRequest::new(Method::Delete, format!("/examples/{}", id)),
    }
  }

  /// Tags invalidated once this mutation settles. Evaluated for failures
  /// too: a rejected write still means the server copy may have moved.
  pub fn invalidates_tags(&self, _result: Result<&Value, &ApiError>) -> Vec<Tag> {
    match self {
      Self::AddData(_) => vec![Tag::list(DATA)],
      Self::UpdateData(patch) => vec![Tag::id(DATA, patch.id)],
      Self::DeleteData(id) => vec![Tag::id(DATA, *id)],
      _ => Vec::new(),
    }
  }

  /// Optimistic patch for the single-item cache of an updated record
  pub fn optimistic_patch(&self) -> Option<PatchSpec> {
    match self {
      Self::UpdateData(patch) => Some(PatchSpec {
        key: Query::GetDataPoint(patch.id).cache_key(),
        fields: to_body(patch),
      }),
      _ => None,
    }
  }
}

fn to_body(value: &impl Serialize) -> Value {
  serde_json::to_value(value).unwrap_or(Value::Null)
}
