//! Ventata Cache Coordination
//!
//! Serves cached values keyed by context-qualified identity for
//! content-serving hosts, with tag-driven invalidation:
//!
//! - **Contexts** are named axes along which cached output legitimately
//!   varies per viewer (e.g. a preferred category). They resolve a viewer
//!   handle to a string that becomes part of the cache key; unresolvable
//!   cases degrade to the `"none"` sentinel instead of failing.
//! - **Tags** identify the host data a cached value was computed from.
//!   Producers declare them; invalidating a tag evicts exactly the entries
//!   that depend on it.
//! - **Singleflight** production: concurrent callers for one cold key share
//!   a single producer invocation, and an invalidation arriving while a
//!   production is in flight discards the stale result.
//!
//! The crate has no network, file, or CLI surface. The host supplies viewer
//! handles, producer closures over its own data sources, and change events
//! (via [`CacheTrigger`] or direct invalidation calls).
//!
//! ## Configuration
//!
//! The host embeds [`CacheConfig`] in its own configuration file:
//!
//! ```toml
//! [cache]
//! enabled = true
//! consume_batch_limit = 100
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut contexts = ContextRegistry::new();
//! contexts.register(Arc::new(PreferredCategoryContext::new(directory)));
//!
//! let coordinator = Arc::new(Coordinator::new(config, contexts));
//! let key = coordinator.build_key("articles.preferred", &["preferred_category"], &viewer);
//! let listing = coordinator
//!     .get_or_compute(key, || async {
//!         let articles = source.latest_in_category(&category, 5).await?;
//!         Ok(Production::new(render(&articles))
//!             .with_tag(Tag::list("article"))
//!             .with_tags(articles.iter().map(|a| Tag::item("article", a.id))))
//!     })
//!     .await?;
//! ```

mod config;
mod consumer;
mod context;
mod coordinator;
mod error;
mod events;
mod flight;
mod keys;
mod lock;
mod planner;
mod registry;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use consumer::CacheConsumer;
pub use context::{
    CacheContext, ContextRegistry, NONE_CONTEXT, PreferredCategoryContext, Viewer, ViewerDirectory,
    ViewerIdentityContext,
};
pub use coordinator::{Coordinator, Production};
pub use error::{CacheError, ProducerError};
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use keys::{CacheKey, Tag, hash_value};
pub use planner::InvalidationPlan;
pub use registry::TagRegistry;
pub use store::{CacheEntry, EntryStore};
pub use trigger::CacheTrigger;
