//! Cache keys: one per (endpoint, argument) pair.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Identifies one query instance.
///
/// The argument is stored as canonical JSON (object keys sorted), so two
/// structurally equal arguments produce the same key regardless of how they
/// were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  endpoint: &'static str,
  arg: String,
}

impl CacheKey {
  pub fn new(endpoint: &'static str, arg: &impl Serialize) -> Self {
    let arg = serde_json::to_value(arg)
      .map(|v| canonical(&v))
      .unwrap_or_else(|_| "null".to_string());
    Self { endpoint, arg }
  }

  pub fn endpoint(&self) -> &'static str {
    self.endpoint
  }

  /// Canonical JSON of the argument
  pub fn arg(&self) -> &str {
    &self.arg
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.endpoint, self.arg)
  }
}

/// Serialize with object keys in sorted order, independent of whether
/// serde_json was built with `preserve_order`.
fn canonical(value: &Value) -> String {
  match value {
    Value::Object(map) => {
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();
      let fields: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{}:{}", Value::String(k.clone()), canonical(&map[k])))
        .collect();
      format!("{{{}}}", fields.join(","))
    }
    Value::Array(items) => {
      let items: Vec<String> = items.iter().map(canonical).collect();
      format!("[{}]", items.join(","))
    }
    other => other.to_string(),
  }
}
