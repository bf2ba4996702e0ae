//! Invalidation plan generation.
//!
//! Merges a batch of cache events into a deduplicated set of invalidation
//! actions.

use std::collections::HashSet;
use std::fmt;

use crate::events::{CacheEvent, EventKind};
use crate::keys::Tag;

/// Actions to execute for cache consistency.
#[derive(Debug, Default)]
pub struct InvalidationPlan {
    /// Tags to invalidate.
    pub tags: HashSet<Tag>,
    /// Context pairs to invalidate.
    pub context_values: HashSet<(String, String)>,
    /// Whether to flush everything, superseding the individual actions.
    pub flush: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ tags: {}, contexts: {}, flush: {} }}",
            self.tags.len(),
            self.context_values.len(),
            self.flush,
        )
    }
}

impl InvalidationPlan {
    /// Merge a batch of events into a plan, deduplicating by event ID.
    ///
    /// Item events yield both the item tag and the collection tag: entries
    /// caching a list never carry a per-item tag for an item created after
    /// they were produced, so the collection tag is what evicts them.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            match event.kind {
                EventKind::ItemUpserted { kind, id } | EventKind::ItemDeleted { kind, id } => {
                    plan.tags.insert(Tag::item(&kind, &id));
                    plan.tags.insert(Tag::list(&kind));
                }
                EventKind::ContextChanged { context, value } => {
                    plan.context_values.insert((context, value));
                }
                EventKind::FlushAll => plan.flush = true,
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.flush && self.tags.is_empty() && self.context_values.is_empty()
    }
}
