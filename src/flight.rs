//! In-flight production tracking.
//!
//! Ensures at most one producer runs per cache key: the first caller for a
//! cold key becomes the leader, concurrent callers subscribe to its outcome.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::CacheError;
use crate::keys::CacheKey;

type Outcome<V> = Result<V, CacheError>;

/// Table of productions currently in flight, one slot per cache key.
pub(crate) struct FlightTable<V> {
    inner: Arc<DashMap<CacheKey, broadcast::Sender<Outcome<V>>>>,
}

/// Role assigned to a caller joining a cold key.
pub(crate) enum Flight<V> {
    /// This caller runs the producer and publishes the outcome.
    Leader(FlightGuard<V>),
    /// Another caller is already producing; await its broadcast.
    Follower(broadcast::Receiver<Outcome<V>>),
}

impl<V: Clone> FlightTable<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Join the flight for a key, becoming leader or follower.
    pub fn join(&self, key: &CacheKey) -> Flight<V> {
        use dashmap::mapref::entry::Entry;

        match self.inner.entry(key.clone()) {
            Entry::Occupied(slot) => Flight::Follower(slot.get().subscribe()),
            Entry::Vacant(slot) => {
                let (sender, _first) = broadcast::channel(1);
                slot.insert(sender.clone());
                Flight::Leader(FlightGuard {
                    key: key.clone(),
                    sender,
                    table: Arc::clone(&self.inner),
                })
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Leadership over one in-flight production.
///
/// Dropping the guard releases the slot, so a leader that panics or is
/// cancelled never wedges the key: followers observe a closed channel and
/// retry from the store.
pub(crate) struct FlightGuard<V> {
    key: CacheKey,
    sender: broadcast::Sender<Outcome<V>>,
    table: Arc<DashMap<CacheKey, broadcast::Sender<Outcome<V>>>>,
}

impl<V: Clone> FlightGuard<V> {
    /// Publish the outcome to all current followers and release the slot.
    pub fn publish(self, outcome: Outcome<V>) {
        // No followers is fine; the send result is irrelevant.
        let _ = self.sender.send(outcome);
    }
}

impl<V> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        self.table.remove(&self.key);
    }
}
