//! Cache entry storage.
//!
//! Holds the cached values with their dependency tags. Eviction is purely
//! event-driven; there is no TTL and no capacity limit.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use time::OffsetDateTime;

use crate::keys::{CacheKey, Tag};
use crate::lock::{rw_read, rw_write};

const SOURCE: &str = "store";

/// A cached value with its dependency tags.
///
/// Entries are owned by the store. Callers replace them through
/// recomputation, never in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub tags: HashSet<Tag>,
    pub created_at: OffsetDateTime,
    /// Invalidation epoch observed when the entry was committed.
    pub revision: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, tags: HashSet<Tag>, revision: u64) -> Self {
        Self {
            value,
            tags,
            created_at: OffsetDateTime::now_utc(),
            revision,
        }
    }
}

/// Keyed storage for cache entries.
///
/// Lookups take the read lock only, so concurrent hits never block each
/// other.
pub struct EntryStore<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone> EntryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        rw_read(&self.entries, SOURCE, "get")
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// Dependency tags of a live entry, for observability.
    pub fn entry_tags(&self, key: &CacheKey) -> Option<HashSet<Tag>> {
        rw_read(&self.entries, SOURCE, "entry_tags")
            .get(key)
            .map(|entry| entry.tags.clone())
    }

    pub fn insert(&self, key: CacheKey, entry: CacheEntry<V>) {
        rw_write(&self.entries, SOURCE, "insert").insert(key, entry);
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        rw_write(&self.entries, SOURCE, "remove")
            .remove(key)
            .is_some()
    }

    /// Keys of live entries built using the given context pair.
    pub fn keys_with_context(&self, name: &str, value: &str) -> Vec<CacheKey> {
        rw_read(&self.entries, SOURCE, "keys_with_context")
            .keys()
            .filter(|key| key.uses_context(name, value))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for EntryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
