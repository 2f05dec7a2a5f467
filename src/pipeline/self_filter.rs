//! Self-exclusion
//!
//! Painting highlights makes the overlay's own nodes change, which would
//! feed straight back into the next cycle. Nodes owned by the overlay or by
//! this tool's UI are dropped before any work is done.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::host::{HostAdapter, NodeTag};
use crate::store::IdentifyingAttributes;

/// Links walked when looking for an overlay ancestor
pub const MAX_EXCLUSION_DEPTH: usize = 50;

/// Bound on remembered positive results
pub const EXCLUSION_CACHE_CAPACITY: usize = 500;

/// Component names of the overlay and tool UI
pub const OVERLAY_NAMES: &[&str] = &[
    "RenderCauseOverlay",
    "RenderCauseHighlights",
    "HighlightRect",
    "RenderCausePanel",
    "RenderCauseBubble",
    "RenderCauseModal",
];

/// Test identifier prefixes of the overlay and tool UI
pub const OVERLAY_ID_PREFIXES: &[&str] = &["__rendercause", "rendercause-"];

/// Owner-chain check with a positive-only cache
///
/// Negative results are never cached: a node can be re-parented under the
/// overlay between cycles.
#[derive(Debug)]
pub struct SelfExclusionFilter {
    names: Vec<String>,
    id_prefixes: Vec<String>,
    excluded: LruCache<NodeTag, ()>,
}

impl Default for SelfExclusionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfExclusionFilter {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(EXCLUSION_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            names: OVERLAY_NAMES.iter().map(|s| s.to_string()).collect(),
            id_prefixes: OVERLAY_ID_PREFIXES.iter().map(|s| s.to_string()).collect(),
            excluded: LruCache::new(capacity),
        }
    }

    /// Also exclude subtrees owned by `name`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Also exclude nodes whose test identifier starts with `prefix`
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefixes.push(prefix.into());
        self
    }

    fn is_overlay<A: HostAdapter>(&self, adapter: &A, node: &A::Node) -> bool {
        if let Some(name) = adapter.display_name(node) {
            if self.names.iter().any(|n| *n == name) {
                return true;
            }
        }
        let props = adapter.props(node);
        IdentifyingAttributes::from_inputs(props.as_ref())
            .test_id
            .is_some_and(|id| self.id_prefixes.iter().any(|p| id.starts_with(p.as_str())))
    }

    /// Whether `node` belongs to the overlay or tool UI
    pub fn is_excluded<A: HostAdapter>(&mut self, adapter: &A, node: &A::Node) -> bool {
        let tag = adapter.tag(node);
        if self.excluded.get(&tag).is_some() {
            return true;
        }
        let mut cursor = Some(node.clone());
        for _ in 0..MAX_EXCLUSION_DEPTH {
            let Some(current) = cursor else {
                break;
            };
            if self.is_overlay(adapter, &current) {
                self.excluded.put(tag, ());
                return true;
            }
            cursor = adapter.debug_owner(&current).or_else(|| adapter.parent(&current));
        }
        false
    }

    /// Number of cached positive results
    pub fn cached(&self) -> usize {
        self.excluded.len()
    }

    pub fn clear(&mut self) {
        self.excluded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryHost, NodeSpec};
    use serde_json::json;

    #[test]
    fn test_overlay_descendants_are_excluded() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "RenderCauseOverlay"));
        let rect = host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let app = host.mount(NodeSpec::view(3, "RCTView"));

        let mut filter = SelfExclusionFilter::new();
        assert!(filter.is_excluded(&host, &rect));
        assert!(!filter.is_excluded(&host, &app));
        assert_eq!(filter.cached(), 1);
    }

    #[test]
    fn test_id_prefix() {
        let host = MemoryHost::new();
        let node = host.mount(NodeSpec::view(1, "RCTView").props(json!({"testID": "__rendercause_badge"})));
        assert!(SelfExclusionFilter::new().is_excluded(&host, &node));

        let custom = host.mount(NodeSpec::view(2, "RCTView").props(json!({"testID": "devtools-panel"})));
        let mut filter = SelfExclusionFilter::new().with_id_prefix("devtools-");
        assert!(filter.is_excluded(&host, &custom));
    }

    #[test]
    fn test_negative_results_are_not_cached() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Inspector"));
        let node = host.mount(NodeSpec::view(2, "RCTView"));
        let mut filter = SelfExclusionFilter::new().with_name("Inspector");
        assert!(!filter.is_excluded(&host, &node));
        assert_eq!(filter.cached(), 0);

        // Re-parented under the tool between cycles
        let node = host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        assert!(filter.is_excluded(&host, &node));
    }
}
