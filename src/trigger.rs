//! Cache trigger service.
//!
//! High-level API for publishing cache events from the host's write paths
//! and consuming them immediately.

use std::sync::Arc;

use tracing::debug;

use crate::config::CacheConfig;
use crate::consumer::CacheConsumer;
use crate::events::{EventKind, EventQueue};

/// Cache trigger for publishing change events.
///
/// Wraps the event queue and consumer with convenience methods for the
/// host's write operations.
///
/// # Usage
///
/// ```ignore
/// // After a successful article update:
/// trigger.item_upserted("article", &article.id);
/// ```
pub struct CacheTrigger<V> {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    consumer: Arc<CacheConsumer<V>>,
}

impl<V: Clone + Send + Sync + 'static> CacheTrigger<V> {
    pub fn new(config: CacheConfig, queue: Arc<EventQueue>, consumer: Arc<CacheConsumer<V>>) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish an event and optionally consume immediately.
    ///
    /// With `consume_now` false, events wait for the next explicit
    /// consumption pass, e.g. from a background interval.
    pub fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.enabled {
            debug!(event_kind = ?kind, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.consumer.consume();
        }
    }

    /// Trigger an item upsert event (create or update).
    pub fn item_upserted(&self, kind: &str, id: &str) {
        self.trigger(
            EventKind::ItemUpserted {
                kind: kind.to_string(),
                id: id.to_string(),
            },
            true,
        );
    }

    /// Trigger an item delete event.
    pub fn item_deleted(&self, kind: &str, id: &str) {
        self.trigger(
            EventKind::ItemDeleted {
                kind: kind.to_string(),
                id: id.to_string(),
            },
            true,
        );
    }

    /// Trigger a context value change, e.g. an edited profile preference.
    pub fn context_changed(&self, context: &str, value: &str) {
        self.trigger(
            EventKind::ContextChanged {
                context: context.to_string(),
                value: value.to_string(),
            },
            true,
        );
    }

    /// Trigger an administrative full flush.
    pub fn flush_all(&self) {
        self.trigger(EventKind::FlushAll, true);
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<CacheConsumer<V>> {
        &self.consumer
    }
}
