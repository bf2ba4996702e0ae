//! Cache contexts.
//!
//! A context is a named axis along which cached output legitimately varies
//! per viewer, e.g. the viewer's preferred category. Contexts resolve a
//! viewer handle to a string value that becomes part of the cache key.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

/// Sentinel value standing in for "no applicable value".
///
/// Anonymous viewers and identified viewers whose data cannot be resolved
/// both map to this sentinel, so callers cannot distinguish the two cases
/// from the context value alone.
pub const NONE_CONTEXT: &str = "none";

/// Viewer handle supplied by the host for each inbound request.
pub trait Viewer {
    fn is_anonymous(&self) -> bool;

    /// Stable identity, `None` for anonymous viewers.
    fn id(&self) -> Option<&str>;
}

/// Host-side profile storage consulted by attribute-backed contexts.
pub trait ViewerDirectory: Send + Sync {
    /// Look up a named attribute for an identified viewer.
    fn attribute(&self, viewer_id: &str, attribute: &str) -> Option<String>;
}

/// One variation axis for cached output.
///
/// Resolution must not fail: any unresolvable case (anonymous viewer,
/// missing attribute, unknown identity) degrades to [`NONE_CONTEXT`]. A
/// context never reads or writes the cache itself.
pub trait CacheContext: Send + Sync {
    /// Unique context name, used in cache keys and invalidation calls.
    fn name(&self) -> &'static str;

    fn resolve(&self, viewer: &dyn Viewer) -> String;
}

/// Explicit registry of cache contexts.
///
/// Contexts are registered at startup; there is no runtime discovery.
#[derive(Default)]
pub struct ContextRegistry {
    contexts: HashMap<&'static str, Arc<dyn CacheContext>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context under its name. The last registration wins.
    pub fn register(&mut self, context: Arc<dyn CacheContext>) {
        self.contexts.insert(context.name(), context);
    }

    /// Resolve a context by name.
    ///
    /// An unregistered name resolves to the sentinel rather than failing.
    pub fn resolve(&self, name: &str, viewer: &dyn Viewer) -> String {
        match self.contexts.get(name) {
            Some(context) => context.resolve(viewer),
            None => {
                warn!(
                    context = name,
                    "unregistered cache context resolves to sentinel"
                );
                NONE_CONTEXT.to_string()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Varies cached output by viewer identity.
pub struct ViewerIdentityContext;

impl CacheContext for ViewerIdentityContext {
    fn name(&self) -> &'static str {
        "viewer_identity"
    }

    fn resolve(&self, viewer: &dyn Viewer) -> String {
        match viewer.id() {
            Some(id) => id.to_string(),
            None => NONE_CONTEXT.to_string(),
        }
    }
}

/// Varies cached output by the viewer's preferred category attribute.
///
/// An identified viewer with no preference set resolves to the same
/// sentinel as an anonymous viewer.
pub struct PreferredCategoryContext {
    directory: Arc<dyn ViewerDirectory>,
}

impl PreferredCategoryContext {
    pub const ATTRIBUTE: &'static str = "preferred_category";

    pub fn new(directory: Arc<dyn ViewerDirectory>) -> Self {
        Self { directory }
    }
}

impl CacheContext for PreferredCategoryContext {
    fn name(&self) -> &'static str {
        "preferred_category"
    }

    fn resolve(&self, viewer: &dyn Viewer) -> String {
        if viewer.is_anonymous() {
            return NONE_CONTEXT.to_string();
        }
        let Some(id) = viewer.id() else {
            return NONE_CONTEXT.to_string();
        };
        self.directory
            .attribute(id, Self::ATTRIBUTE)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| NONE_CONTEXT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubViewer {
        id: Option<&'static str>,
    }

    impl Viewer for StubViewer {
        fn is_anonymous(&self) -> bool {
            self.id.is_none()
        }

        fn id(&self) -> Option<&str> {
            self.id
        }
    }

    #[derive(Default)]
    struct StubDirectory {
        attributes: HashMap<(String, String), String>,
    }

    impl StubDirectory {
        fn with_attribute(mut self, viewer_id: &str, attribute: &str, value: &str) -> Self {
            self.attributes
                .insert((viewer_id.to_string(), attribute.to_string()), value.to_string());
            self
        }
    }

    impl ViewerDirectory for StubDirectory {
        fn attribute(&self, viewer_id: &str, attribute: &str) -> Option<String> {
            self.attributes
                .get(&(viewer_id.to_string(), attribute.to_string()))
                .cloned()
        }
    }

    fn preferred_category(directory: StubDirectory) -> PreferredCategoryContext {
        PreferredCategoryContext::new(Arc::new(directory))
    }

    #[test]
    fn anonymous_viewer_resolves_to_sentinel() {
        let context = preferred_category(StubDirectory::default());
        let viewer = StubViewer { id: None };
        assert_eq!(context.resolve(&viewer), NONE_CONTEXT);
    }

    #[test]
    fn identified_viewer_without_preference_matches_anonymous() {
        let context = preferred_category(StubDirectory::default());
        let identified = StubViewer { id: Some("42") };
        let anonymous = StubViewer { id: None };
        assert_eq!(context.resolve(&identified), context.resolve(&anonymous));
    }

    #[test]
    fn preference_resolves_to_its_value() {
        let directory =
            StubDirectory::default().with_attribute("42", PreferredCategoryContext::ATTRIBUTE, "7");
        let context = preferred_category(directory);
        let viewer = StubViewer { id: Some("42") };
        assert_eq!(context.resolve(&viewer), "7");
    }

    #[test]
    fn empty_preference_resolves_to_sentinel() {
        let directory =
            StubDirectory::default().with_attribute("42", PreferredCategoryContext::ATTRIBUTE, "");
        let context = preferred_category(directory);
        let viewer = StubViewer { id: Some("42") };
        assert_eq!(context.resolve(&viewer), NONE_CONTEXT);
    }

    #[test]
    fn resolution_is_deterministic_for_fixed_directory() {
        let directory =
            StubDirectory::default().with_attribute("42", PreferredCategoryContext::ATTRIBUTE, "7");
        let context = preferred_category(directory);
        let viewer = StubViewer { id: Some("42") };
        assert_eq!(context.resolve(&viewer), context.resolve(&viewer));
    }

    #[test]
    fn identity_context_uses_viewer_id() {
        let context = ViewerIdentityContext;
        assert_eq!(context.resolve(&StubViewer { id: Some("42") }), "42");
        assert_eq!(context.resolve(&StubViewer { id: None }), NONE_CONTEXT);
    }

    #[test]
    fn registry_resolves_registered_contexts() {
        let mut registry = ContextRegistry::new();
        registry.register(Arc::new(ViewerIdentityContext));
        let viewer = StubViewer { id: Some("42") };
        assert_eq!(registry.resolve("viewer_identity", &viewer), "42");
    }

    #[test]
    fn unregistered_context_resolves_to_sentinel() {
        let registry = ContextRegistry::new();
        let viewer = StubViewer { id: Some("42") };
        assert_eq!(registry.resolve("preferred_category", &viewer), NONE_CONTEXT);
    }
}
