//! Cache coordinator.
//!
//! Serves cached values keyed by context-qualified identity, with at most
//! one producer invocation per key under concurrency and tag-driven
//! invalidation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use crate::config::CacheConfig;
use crate::context::{ContextRegistry, Viewer};
use crate::error::{CacheError, ProducerError};
use crate::flight::{Flight, FlightTable};
use crate::keys::{CacheKey, Tag};
use crate::lock::mutex_lock;
use crate::registry::TagRegistry;
use crate::store::{CacheEntry, EntryStore};

const SOURCE: &str = "coordinator";

const METRIC_HITS: &str = "ventata_hits_total";
const METRIC_MISSES: &str = "ventata_misses_total";
const METRIC_EVICTIONS: &str = "ventata_evictions_total";
const METRIC_PRODUCE_MS: &str = "ventata_produce_ms";

/// A produced value together with the complete set of dependency tags the
/// producer consulted.
///
/// The producer enumerates its dependencies; the coordinator does not infer
/// them. Listing producers must declare the collection-level
/// [`Tag::list`] tag in addition to per-item tags, even for zero-item
/// results: a newly created item has no per-item tag in any entry yet, so
/// the list tag is what invalidates cached short or empty lists.
#[derive(Debug, Clone)]
pub struct Production<V> {
    pub value: V,
    pub tags: HashSet<Tag>,
}

impl<V> Production<V> {
    pub fn new(value: V) -> Self {
        Self {
            value,
            tags: HashSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_tags<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = Tag>,
    {
        self.tags.extend(tags);
        self
    }
}

/// Coordinates context-qualified caching for one value type.
///
/// Shared across request handlers behind an `Arc`. Cache hits take a read
/// lock only; invalidation and commits are serialized against each other so
/// a production overlapping an invalidation is never left cached.
pub struct Coordinator<V> {
    config: CacheConfig,
    contexts: ContextRegistry,
    store: EntryStore<V>,
    registry: TagRegistry,
    flights: FlightTable<V>,
    /// Bumped by every invalidation. Commits compare it against the value
    /// observed at production start and discard stale results.
    epoch: AtomicU64,
    /// Serializes commits against invalidation passes.
    commit: Mutex<()>,
}

impl<V: Clone + Send + Sync + 'static> Coordinator<V> {
    pub fn new(config: CacheConfig, contexts: ContextRegistry) -> Self {
        Self {
            config,
            contexts,
            store: EntryStore::new(),
            registry: TagRegistry::new(),
            flights: FlightTable::new(),
            epoch: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ========================================================================
    // Context resolution and key building
    // ========================================================================

    /// Resolve a context by name for the given viewer.
    ///
    /// Pure with respect to caching: this never reads or writes entries.
    /// Unresolvable cases degrade to the `"none"` sentinel.
    pub fn resolve_context(&self, name: &str, viewer: &dyn Viewer) -> String {
        self.contexts.resolve(name, viewer)
    }

    /// Build a cache key from a base identity and the named contexts,
    /// resolved for the viewer in declaration order.
    pub fn build_key(&self, base: &str, context_names: &[&str], viewer: &dyn Viewer) -> CacheKey {
        let mut key = CacheKey::new(base);
        for name in context_names {
            let value = self.contexts.resolve(name, viewer);
            key = key.with_context(*name, value);
        }
        key
    }

    // ========================================================================
    // Get-or-compute
    // ========================================================================

    /// Return the cached value for a key, producing it on miss.
    ///
    /// On a hit the stored value is returned without side effects. On a
    /// miss the producer runs exactly once per key even under concurrent
    /// callers; everyone waiting on that production receives the same value
    /// or the same error. A failed production leaves no partial state and
    /// the next call retries.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, producer: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Production<V>, ProducerError>>,
    {
        if !self.config.enabled {
            debug!(cache_key = %key, "cache disabled, producing without storing");
            return match producer().await {
                Ok(production) => Ok(production.value),
                Err(error) => Err(CacheError::producer(&key, error)),
            };
        }

        let guard = loop {
            if let Some(value) = self.store.get(&key) {
                counter!(METRIC_HITS).increment(1);
                debug!(cache_key = %key, outcome = "hit", "serving cached value");
                return Ok(value);
            }

            match self.flights.join(&key) {
                Flight::Follower(mut outcome) => {
                    debug!(cache_key = %key, outcome = "join", "awaiting in-flight production");
                    match outcome.recv().await {
                        Ok(result) => return result,
                        // The leader vanished without publishing; retry from
                        // the store.
                        Err(_) => continue,
                    }
                }
                Flight::Leader(guard) => break guard,
            }
        };

        counter!(METRIC_MISSES).increment(1);
        debug!(cache_key = %key, outcome = "miss", "producing value");

        let started_epoch = self.epoch.load(Ordering::SeqCst);
        let produce_started = Instant::now();
        let outcome = producer().await;
        histogram!(METRIC_PRODUCE_MS).record(produce_started.elapsed().as_millis() as f64);

        match outcome {
            Ok(production) => {
                if !self.commit(&key, &production, started_epoch) {
                    debug!(
                        cache_key = %key,
                        "production overlapped an invalidation, result not cached"
                    );
                }
                let value = production.value;
                guard.publish(Ok(value.clone()));
                Ok(value)
            }
            Err(error) => {
                let error = CacheError::producer(&key, error);
                guard.publish(Err(error.clone()));
                Err(error)
            }
        }
    }

    /// Store a production and index its tags, unless an invalidation
    /// happened since the production started.
    fn commit(&self, key: &CacheKey, production: &Production<V>, started_epoch: u64) -> bool {
        let _serial = mutex_lock(&self.commit, SOURCE, "commit");
        let epoch = self.epoch.load(Ordering::SeqCst);
        if epoch != started_epoch {
            return false;
        }
        self.store.insert(
            key.clone(),
            CacheEntry::new(production.value.clone(), production.tags.clone(), epoch),
        );
        self.registry.register(key.clone(), production.tags.clone());
        true
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Evict every entry depending on a tag.
    ///
    /// Evicted keys are removed from all other tag buckets as well. A tag
    /// with no dependent entries is a no-op. Returns the eviction count.
    #[instrument(skip_all, fields(tag = %tag))]
    pub fn invalidate_tag(&self, tag: &Tag) -> usize {
        let _serial = mutex_lock(&self.commit, SOURCE, "invalidate_tag");
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let keys = self.registry.keys_for_tag(tag);
        for key in &keys {
            self.store.remove(key);
            self.registry.unregister(key);
        }

        if !keys.is_empty() {
            counter!(METRIC_EVICTIONS).increment(keys.len() as u64);
            info!(evicted = keys.len(), "tag invalidation evicted entries");
        }
        keys.len()
    }

    /// Evict every entry whose key was built using the given context pair.
    ///
    /// Returns the eviction count; an unused pair is a no-op.
    #[instrument(skip(self))]
    pub fn invalidate_context_value(&self, name: &str, value: &str) -> usize {
        let _serial = mutex_lock(&self.commit, SOURCE, "invalidate_context_value");
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let keys = self.store.keys_with_context(name, value);
        for key in &keys {
            self.store.remove(key);
            self.registry.unregister(key);
        }

        if !keys.is_empty() {
            counter!(METRIC_EVICTIONS).increment(keys.len() as u64);
            info!(evicted = keys.len(), "context invalidation evicted entries");
        }
        keys.len()
    }

    /// Clear every entry and the whole tag index.
    #[instrument(skip(self))]
    pub fn flush_all(&self) {
        let _serial = mutex_lock(&self.commit, SOURCE, "flush_all");
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let evicted = self.store.len();
        self.store.clear();
        self.registry.clear();

        if evicted > 0 {
            counter!(METRIC_EVICTIONS).increment(evicted as u64);
        }
        info!(evicted, "cache flushed");
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Dependency tags of a live entry.
    pub fn entry_tags(&self, key: &CacheKey) -> Option<HashSet<Tag>> {
        self.store.entry_tags(key)
    }

    /// Number of tags with at least one dependent entry.
    pub fn tag_count(&self) -> usize {
        self.registry.tag_count()
    }
}
