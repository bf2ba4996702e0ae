//! Cache consumer.
//!
//! Drains the event queue in batches and applies the resulting
//! invalidation plan to the coordinator.

use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::coordinator::Coordinator;
use crate::events::EventQueue;
use crate::planner::InvalidationPlan;

const METRIC_CONSUME_MS: &str = "ventata_consume_ms";

/// Applies queued change events to the coordinator.
pub struct CacheConsumer<V> {
    config: CacheConfig,
    coordinator: Arc<Coordinator<V>>,
    queue: Arc<EventQueue>,
}

impl<V: Clone + Send + Sync + 'static> CacheConsumer<V> {
    pub fn new(
        config: CacheConfig,
        coordinator: Arc<Coordinator<V>>,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self {
            config,
            coordinator,
            queue,
        }
    }

    /// Consume pending events and apply the plan.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub fn consume(&self) -> bool {
        let consume_started = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = InvalidationPlan::from_events(events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Cache consumption starting"
        );

        let mut evicted = 0;
        if plan.flush {
            self.coordinator.flush_all();
        } else {
            for tag in &plan.tags {
                evicted += self.coordinator.invalidate_tag(tag);
            }
            for (context, value) in &plan.context_values {
                evicted += self.coordinator.invalidate_context_value(context, value);
            }
        }

        let elapsed_ms = consume_started.elapsed().as_millis() as f64;
        histogram!(METRIC_CONSUME_MS).record(elapsed_ms);

        info!(event_count, evicted, elapsed_ms, "Cache consumption complete");
        true
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn coordinator(&self) -> &Arc<Coordinator<V>> {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextRegistry;
    use crate::coordinator::Production;
    use crate::events::EventKind;
    use crate::keys::{CacheKey, Tag};

    fn consumer() -> CacheConsumer<String> {
        let config = CacheConfig::default();
        let coordinator = Arc::new(Coordinator::new(config.clone(), ContextRegistry::new()));
        let queue = Arc::new(EventQueue::new());
        CacheConsumer::new(config, coordinator, queue)
    }

    async fn seed_listing(consumer: &CacheConsumer<String>, key: &CacheKey, ids: &[u32]) {
        consumer
            .coordinator()
            .get_or_compute(key.clone(), || async move {
                Ok(Production::new("listing".to_string())
                    .with_tag(Tag::list("article"))
                    .with_tags(ids.iter().map(|id| Tag::item("article", id))))
            })
            .await
            .expect("production should succeed");
    }

    #[tokio::test]
    async fn consume_on_empty_queue_is_a_no_op() {
        let consumer = consumer();
        assert!(!consumer.consume());
    }

    #[tokio::test]
    async fn item_event_evicts_dependent_entries() {
        let consumer = consumer();
        let key = CacheKey::new("articles.latest");
        seed_listing(&consumer, &key, &[1, 2, 3]).await;

        consumer.queue().publish(EventKind::ItemUpserted {
            kind: "article".to_string(),
            id: "4".to_string(),
        });

        assert!(consumer.consume());
        assert!(consumer.coordinator().is_empty());
    }

    #[tokio::test]
    async fn flush_event_supersedes_individual_evictions() {
        let consumer = consumer();
        seed_listing(&consumer, &CacheKey::new("articles.latest"), &[1]).await;
        seed_listing(&consumer, &CacheKey::new("articles.archive"), &[2]).await;

        consumer.queue().publish(EventKind::FlushAll);
        assert!(consumer.consume());

        assert!(consumer.coordinator().is_empty());
        assert_eq!(consumer.coordinator().tag_count(), 0);
    }

    #[tokio::test]
    async fn batch_limit_leaves_excess_events_queued() {
        let config = CacheConfig {
            consume_batch_limit: 1,
            ..Default::default()
        };
        let coordinator = Arc::new(Coordinator::new(config.clone(), ContextRegistry::new()));
        let queue = Arc::new(EventQueue::new());
        let consumer: CacheConsumer<String> = CacheConsumer::new(config, coordinator, queue);

        for id in ["1", "2"] {
            consumer.queue().publish(EventKind::ItemUpserted {
                kind: "article".to_string(),
                id: id.to_string(),
            });
        }

        assert!(consumer.consume());
        assert_eq!(consumer.queue().len(), 1);
        assert!(consumer.consume());
        assert!(consumer.queue().is_empty());
    }
}
