//! Cache key and tag definitions.
//!
//! Defines `Tag` for dependency identities and `CacheKey` for
//! context-qualified cache entries.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a piece of host data whose change invalidates dependent
/// cache entries.
///
/// Tags are opaque strings with two conventional shapes: `kind:id` for a
/// single item and `list:kind` for an item collection. One tag may guard
/// many entries; one entry may declare many tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag for a single content item, e.g. `article:42`.
    pub fn item(kind: &str, id: impl fmt::Display) -> Self {
        Self(format!("{kind}:{id}"))
    }

    /// Collection-level tag, e.g. `list:article`.
    ///
    /// Listing producers declare this in addition to per-item tags so that
    /// a newly created item, which has no per-item tag anywhere yet, still
    /// invalidates cached lists.
    pub fn list(kind: &str) -> Self {
        Self(format!("list:{kind}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context-qualified cache key.
///
/// A key is a base identity plus the ordered list of (context name,
/// resolved value) pairs the entry was built under. Keys are structured
/// rather than delimiter-joined strings, so two distinct (base, pairs)
/// tuples can never collide. Pair order is the declaration order of the
/// contexts and is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    base: String,
    contexts: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            contexts: Vec::new(),
        }
    }

    /// Append a resolved context pair.
    pub fn with_context(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.contexts.push((name.into(), value.into()));
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The ordered context pairs this key was built under.
    pub fn contexts(&self) -> &[(String, String)] {
        &self.contexts
    }

    /// Whether this key was built using the given context pair.
    pub fn uses_context(&self, name: &str, value: &str) -> bool {
        self.contexts
            .iter()
            .any(|(n, v)| n == name && v == value)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for (name, value) in &self.contexts {
            write!(f, "|{name}={value}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Hash Utilities
// ============================================================================

/// Compute a hash for any hashable value.
///
/// Useful for deriving base keys from query filters the host does not want
/// to serialize into the key itself.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
