//! Normalized request cache.
//!
//! Query results are cached per (endpoint, argument) key and shared by every
//! view subscribed to that key. Mutations invalidate tags, which marks the
//! entries providing those tags stale and re-fetches the ones still in use.
//! Unused entries are evicted after a grace period.

mod entry;
mod key;
mod optimistic;
mod store;
mod tags;

pub use entry::{CacheEntry, MutationEntry, QueryStatus, RequestId};
pub use key::CacheKey;
pub use optimistic::{assign, OptimisticPatch};
pub use store::{CacheStore, LifecycleEvent, MutationId, Phase, Subscription};
pub use tags::{Tag, TagId, TagIndex};
