//! Bidirectional tag index.
//!
//! Tracks which cache entries depend on which tags, enabling exact
//! invalidation when host data changes.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::keys::{CacheKey, Tag};
use crate::lock::{rw_read, rw_write};

const SOURCE: &str = "registry";

/// Tracks tag → cache keys and cache key → tags mappings.
///
/// Invariant: every indexed (tag → key) pair corresponds to a live entry
/// at that key whose dependency set contains that tag. The coordinator
/// maintains this by serializing commits and evictions.
pub struct TagRegistry {
    /// Maps tags to all cache keys that depend on them
    tag_to_keys: RwLock<HashMap<Tag, HashSet<CacheKey>>>,
    /// Maps cache keys to all tags they depend on
    key_to_tags: RwLock<HashMap<CacheKey, HashSet<Tag>>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache entry with its dependency tags.
    pub fn register(&self, key: CacheKey, tags: HashSet<Tag>) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        for tag in &tags {
            t2k.entry(tag.clone()).or_default().insert(key.clone());
        }
        k2t.insert(key, tags);
    }

    /// All cache keys currently depending on a tag.
    pub fn keys_for_tag(&self, tag: &Tag) -> HashSet<CacheKey> {
        rw_read(&self.tag_to_keys, SOURCE, "keys_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// All tags a cache key depends on.
    pub fn tags_for_key(&self, key: &CacheKey) -> HashSet<Tag> {
        rw_read(&self.key_to_tags, SOURCE, "tags_for_key")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a cache key from the index entirely.
    ///
    /// Strips the key from every tag bucket it appears in and prunes empty
    /// buckets, so no dangling references remain after eviction.
    pub fn unregister(&self, key: &CacheKey) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Clear all mappings.
    pub fn clear(&self) {
        rw_write(&self.tag_to_keys, SOURCE, "clear.tag_to_keys").clear();
        rw_write(&self.key_to_tags, SOURCE, "clear.key_to_tags").clear();
    }

    /// Number of tags with at least one dependent entry.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    /// Number of indexed cache keys.
    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[Tag]) -> HashSet<Tag> {
        list.iter().cloned().collect()
    }

    #[test]
    fn register_and_lookup() {
        let registry = TagRegistry::new();
        let key = CacheKey::new("articles.latest");
        let tag = Tag::item("article", 1);

        registry.register(key.clone(), tags(&[tag.clone()]));

        assert!(registry.keys_for_tag(&tag).contains(&key));
        assert!(registry.tags_for_key(&key).contains(&tag));
    }

    #[test]
    fn unregister_cleans_up_both_directions() {
        let registry = TagRegistry::new();
        let key = CacheKey::new("articles.latest");

        registry.register(
            key.clone(),
            tags(&[Tag::item("article", 1), Tag::list("article")]),
        );
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.tag_count(), 2);

        registry.unregister(&key);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn unregister_keeps_buckets_shared_with_other_keys() {
        let registry = TagRegistry::new();
        let key1 = CacheKey::new("articles.latest");
        let key2 = CacheKey::new("articles.archive");
        let shared = Tag::list("article");

        registry.register(key1.clone(), tags(&[shared.clone()]));
        registry.register(key2.clone(), tags(&[shared.clone()]));

        registry.unregister(&key1);

        let remaining = registry.keys_for_tag(&shared);
        assert_eq!(remaining.len(), 1);
        assert!(remaining.contains(&key2));
    }

    #[test]
    fn multiple_keys_for_same_tag() {
        let registry = TagRegistry::new();
        let tag = Tag::list("article");
        let key1 = CacheKey::new("articles.latest");
        let key2 = CacheKey::new("articles.preferred").with_context("preferred_category", "7");

        registry.register(key1.clone(), tags(&[tag.clone()]));
        registry.register(key2.clone(), tags(&[tag.clone()]));

        let keys = registry.keys_for_tag(&tag);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&key1));
        assert!(keys.contains(&key2));
    }

    #[test]
    fn unknown_tag_has_no_keys() {
        let registry = TagRegistry::new();
        assert!(registry.keys_for_tag(&Tag::item("article", 999)).is_empty());
    }

    #[test]
    fn clear_removes_all_mappings() {
        let registry = TagRegistry::new();
        registry.register(
            CacheKey::new("articles.latest"),
            tags(&[Tag::list("article")]),
        );
        assert!(registry.key_count() > 0);

        registry.clear();
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }
}
