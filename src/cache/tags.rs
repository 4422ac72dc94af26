//! Tag invalidation index.
//!
//! Queries declare which tags their result provides; mutations declare which
//! tags they invalidate. The index maps each tag to the cache keys that
//! currently provide it, so invalidation never needs to know which queries
//! happen to be cached.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use super::key::CacheKey;

/// Which record(s) of a resource a tag refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagId {
  /// The collection as a whole
  List,
  /// A single record
  Id(u64),
}

/// A symbolic label for the resource(s) a cached result represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
  pub resource: &'static str,
  pub id: TagId,
}

impl Tag {
  pub const fn list(resource: &'static str) -> Self {
    Self {
      resource,
      id: TagId::List,
    }
  }

  pub const fn id(resource: &'static str, id: u64) -> Self {
    Self {
      resource,
      id: TagId::Id(id),
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.id {
      TagId::List => write!(f, "{}:LIST", self.resource),
      TagId::Id(id) => write!(f, "{}:{}", self.resource, id),
    }
  }
}

/// Mapping from tags to the keys providing them, with the reverse mapping
/// kept alongside so a key's previous tags can be replaced.
#[derive(Debug, Default)]
pub struct TagIndex {
  by_tag: HashMap<Tag, HashSet<CacheKey>>,
  by_key: HashMap<CacheKey, BTreeSet<Tag>>,
}

impl TagIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record that `key` provides `tags`, replacing whatever it provided before.
  pub fn register_tags(&mut self, key: &CacheKey, tags: impl IntoIterator<Item = Tag>) {
    self.remove_key(key);

    let tags: BTreeSet<Tag> = tags.into_iter().collect();
    if tags.is_empty() {
      return;
    }
    for tag in &tags {
      self.by_tag.entry(*tag).or_default().insert(key.clone());
    }
    self.by_key.insert(key.clone(), tags);
  }

  /// Forget every tag `key` provides (called when an entry is evicted).
  pub fn remove_key(&mut self, key: &CacheKey) {
    let Some(old) = self.by_key.remove(key) else {
      return;
    };
    for tag in old {
      if let Some(keys) = self.by_tag.get_mut(&tag) {
        keys.remove(key);
        if keys.is_empty() {
          self.by_tag.remove(&tag);
        }
      }
    }
  }

  /// Tags currently provided by `key`
  pub fn tags_for(&self, key: &CacheKey) -> Option<&BTreeSet<Tag>> {
    self.by_key.get(key)
  }

  /// Every key whose provided tags intersect `tags`, in a stable order.
  pub fn keys_providing(&self, tags: &[Tag]) -> Vec<CacheKey> {
    let keys: BTreeSet<&CacheKey> = tags
      .iter()
      .filter_map(|tag| self.by_tag.get(tag))
      .flatten()
      .collect();
    keys.into_iter().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(n: u64) -> CacheKey {
    CacheKey::new("getDataPoint", &n)
  }

  #[test]
  fn test_display() {
    assert_eq!(Tag::list("data").to_string(), "data:LIST");
    assert_eq!(Tag::id("data", 7).to_string(), "data:7");
  }

  #[test]
  fn test_keys_providing_intersection() {
    let mut index = TagIndex::new();
    let list = CacheKey::new("getData", &(10, 1));
    index.register_tags(&list, [Tag::id("data", 1), Tag::id("data", 2), Tag::list("data")]);
    index.register_tags(&key(2), [Tag::id("data", 2)]);
    index.register_tags(&key(3), [Tag::id("data", 3)]);

    let hit = index.keys_providing(&[Tag::id("data", 2)]);
    assert_eq!(hit.len(), 2);
    assert!(hit.contains(&list));
    assert!(hit.contains(&key(2)));

    assert_eq!(index.keys_providing(&[Tag::list("data")]), vec![list]);
    assert!(index.keys_providing(&[Tag::id("data", 9)]).is_empty());
  }

  #[test]
  fn test_register_replaces_previous_tags() {
    let mut index = TagIndex::new();
    index.register_tags(&key(1), [Tag::id("data", 1), Tag::list("data")]);
    index.register_tags(&key(1), [Tag::id("data", 1)]);

    assert!(index.keys_providing(&[Tag::list("data")]).is_empty());
    assert_eq!(index.tags_for(&key(1)).map(|t| t.len()), Some(1));
  }

  #[test]
  fn test_remove_key() {
    let mut index = TagIndex::new();
    index.register_tags(&key(1), [Tag::id("data", 1)]);
    index.remove_key(&key(1));
    assert!(index.keys_providing(&[Tag::id("data", 1)]).is_empty());
    assert!(index.tags_for(&key(1)).is_none());
  }

  #[test]
  fn test_each_key_reported_once() {
    let mut index = TagIndex::new();
    index.register_tags(&key(1), [Tag::id("data", 1), Tag::list("data")]);
    let hit = index.keys_providing(&[Tag::id("data", 1), Tag::list("data")]);
    assert_eq!(hit, vec![key(1)]);
  }
}
