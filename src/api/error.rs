//! Error types for the API boundary.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
  #[error("Network error: {0}")]
  Network(String),
  #[error("Request failed with status {status}")]
  Status { status: u16, body: ErrorBody },
  #[error("Unexpected response: {0}")]
  Decode(String),
  #[error("Request aborted")]
  Aborted,
}

impl ApiError {
  /// HTTP status of the failed response, if the server answered at all
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// True when the server rejected the request's credentials
  pub fn is_unauthorized(&self) -> bool {
    self.status() == Some(401)
  }

  /// Error payload returned by the server, if any
  pub fn body(&self) -> Option<&ErrorBody> {
    match self {
      Self::Status { body, .. } => Some(body),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

/// A server error message: either a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ErrorText {
  One(String),
  Many(Vec<String>),
}

impl ErrorText {
  /// Collapse into one line, joining lists with a space
  pub fn joined(&self) -> String {
    match self {
      Self::One(s) => s.clone(),
      Self::Many(v) => v.join(" "),
    }
  }
}

/// Error payload of a non-2xx response.
///
/// `nonFieldErrors` and `detail` apply to the whole request; everything else
/// is keyed by the offending field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
  #[serde(default, alias = "non_field_errors")]
  pub non_field_errors: Option<ErrorText>,
  #[serde(default)]
  pub detail: Option<ErrorText>,
  #[serde(flatten)]
  pub fields: BTreeMap<String, ErrorText>,
}

impl ErrorBody {
  /// Parse an error body leniently. Bodies that are not error-shaped JSON
  /// (plain text, HTML error pages) become a `detail` message.
  pub fn from_value(value: &Value) -> Self {
    match value {
      Value::Object(_) => Self::deserialize(value).unwrap_or_else(|_| {
        // Fields of unexpected shape (numbers, nested objects) are dropped
        let mut body = Self::default();
        if let Value::Object(map) = value {
          for (key, v) in map {
            let Ok(text) = ErrorText::deserialize(v) else {
              continue;
            };
            match key.as_str() {
              "nonFieldErrors" | "non_field_errors" => body.non_field_errors = Some(text),
              "detail" => body.detail = Some(text),
              _ => {
                body.fields.insert(key.clone(), text);
              }
            }
          }
        }
        body
      }),
      Value::String(s) if !s.is_empty() => Self {
        detail: Some(ErrorText::One(s.clone())),
        ..Self::default()
      },
      _ => Self::default(),
    }
  }

  /// The message shown in a form's banner, if the server sent one
  pub fn general_message(&self) -> Option<String> {
    self
      .non_field_errors
      .as_ref()
      .or(self.detail.as_ref())
      .map(ErrorText::joined)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_error_body_fields_and_general() {
    let body = ErrorBody::from_value(&json!({
      "email": ["Enter a valid email address.", "Too long."],
      "nonFieldErrors": ["Password incorrect. Please try again."]
    }));

    assert_eq!(
      body.fields.get("email").map(ErrorText::joined).as_deref(),
      Some("Enter a valid email address. Too long.")
    );
    assert_eq!(
      body.general_message().as_deref(),
      Some("Password incorrect. Please try again.")
    );
  }

  #[test]
  fn test_error_body_snake_case_alias() {
    let body = ErrorBody::from_value(&json!({"non_field_errors": "nope"}));
    assert_eq!(body.general_message().as_deref(), Some("nope"));
    assert!(body.fields.is_empty());
  }

  #[test]
  fn test_error_body_detail_fallback() {
    let body = ErrorBody::from_value(&json!({"detail": "Invalid token."}));
    assert_eq!(body.general_message().as_deref(), Some("Invalid token."));
  }

  #[test]
  fn test_error_body_from_text() {
    let body = ErrorBody::from_value(&json!("Bad gateway"));
    assert_eq!(body.general_message().as_deref(), Some("Bad gateway"));
  }

  #[test]
  fn test_error_body_skips_odd_fields() {
    let body = ErrorBody::from_value(&json!({"name": "Required.", "code": 12}));
    assert_eq!(body.fields.len(), 1);
    assert!(body.fields.contains_key("name"));
  }

  #[test]
  fn test_unauthorized() {
    let err = ApiError::Status {
      status: 401,
      body: ErrorBody::default(),
    };
    assert!(err.is_unauthorized());
    assert!(!ApiError::Network("down".to_string()).is_unauthorized());
  }
}
