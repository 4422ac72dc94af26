//! Optimistic updates.
//!
//! A patch is applied to a cached value before the server confirms the
//! mutation. The record keeps the inverse of the change, so a failed
//! mutation can undo exactly what was patched. Fields the patch did not
//! touch, including ones refreshed by a fetch in the meantime, are left
//! alone on rollback.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::entry::CacheEntry;
use super::key::CacheKey;

/// How to undo a patch
#[derive(Debug, Clone, PartialEq)]
enum Inverse {
  /// Previous value of each top-level field the patch changed
  /// (`None` = the field did not exist)
  Fields(Vec<(String, Option<Value>)>),
  /// Whole previous value, for non-object payloads
  Snapshot(Value),
}

/// A speculative change awaiting the settlement of its mutation.
///
/// `commit` and `rollback` consume the record; they are its only terminal
/// operations.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an optimistic patch must be committed or rolled back"]
pub struct OptimisticPatch {
  key: CacheKey,
  generation: u64,
  inverse: Inverse,
}

impl OptimisticPatch {
  /// Apply `patch_fn` to the entry's cached value immediately and record
  /// how to undo it. Returns `None` when the entry holds no data yet.
  pub fn begin(
    key: &CacheKey,
    entry: &mut CacheEntry,
    patch_fn: impl FnOnce(&mut Value),
  ) -> Option<Self> {
    let current = entry.data.as_mut()?;
    let before = current.clone();
    patch_fn(current);

    let fields = match (&before, &*current) {
      (Value::Object(old), Value::Object(new)) => Some(field_inverse(old, new)),
      _ => None,
    };
    let inverse = match fields {
      Some(fields) => Inverse::Fields(fields),
      None => Inverse::Snapshot(before),
    };
    debug!(%key, "applied optimistic patch");

    Some(Self {
      key: key.clone(),
      generation: entry.generation,
      inverse,
    })
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  /// Keep the patch. Fresh data from the next invalidation-driven fetch
  /// replaces it anyway.
  pub fn commit(self) {
    debug!(key = %self.key, "committed optimistic patch");
  }

  /// Undo the patch. A no-op when the entry was evicted (or evicted and
  /// re-created) since the patch began.
  pub fn rollback(self, entries: &mut HashMap<CacheKey, CacheEntry>) {
    let Some(entry) = entries.get_mut(&self.key) else {
      debug!(key = %self.key, "rollback skipped: entry evicted");
      return;
    };
    if entry.generation != self.generation {
      debug!(key = %self.key, "rollback skipped: entry replaced");
      return;
    }

    match self.inverse {
      Inverse::Snapshot(before) => entry.data = Some(before),
      Inverse::Fields(fields) => {
        if let Some(Value::Object(map)) = entry.data.as_mut() {
          for (field, old) in fields {
            match old {
              Some(v) => {
                map.insert(field, v);
              }
              None => {
                map.remove(&field);
              }
            }
          }
        }
      }
    }
    debug!(key = %self.key, "rolled back optimistic patch");
  }
}

/// Shallow-merge `fields` into an object value (`Object.assign` semantics).
pub fn assign(target: &mut Value, fields: &Value) {
  if let (Value::Object(target), Value::Object(fields)) = (target, fields) {
    for (k, v) in fields {
      target.insert(k.clone(), v.clone());
    }
  }
}

fn field_inverse(old: &Map<String, Value>, new: &Map<String, Value>) -> Vec<(String, Option<Value>)> {
  let mut inverse = Vec::new();
  for (k, v) in new {
    if old.get(k) != Some(v) {
      inverse.push((k.clone(), old.get(k).cloned()));
    }
  }
  for (k, v) in old {
    if !new.contains_key(k) {
      inverse.push((k.clone(), Some(v.clone())));
    }
  }
  inverse
}
