//! Owner resolution
//!
//! Walks the debug-owner chain (structural parent as fallback) to the first
//! named component that is not framework plumbing.

use crate::host::HostAdapter;

/// Maximum links walked
pub const MAX_OWNER_DEPTH: usize = 30;

/// Framework, runtime and dev-tool component names
const INTERNAL_NAMES: &[&str] = &[
    "AppContainer",
    "RootComponent",
    "RenderErrorBoundary",
    "ErrorBoundary",
    "LogBoxStateSubscription",
    "LogBox",
    "DebuggingOverlay",
    "DebuggingOverlayRegistrySubscription",
    "PerformanceLoggerContext",
    "RootTagContext",
    "Provider",
    "Consumer",
    "Fragment",
    "StrictMode",
    "Suspense",
    "Profiler",
    "View",
    "Text",
    "TextAncestorContext",
    "ScrollView",
    "VirtualizedList",
    "VirtualizedListContextProvider",
    "CellRenderer",
    "TouchableOpacity",
    "TouchableHighlight",
    "Pressable",
    "AnimatedComponent",
];

/// Higher-order wrapper prefixes
const WRAPPER_PREFIXES: &[&str] = &[
    "Animated(",
    "ForwardRef(",
    "Memo(",
    "withDevTools(",
    "Context.",
    "Connect(",
    "Styled(",
];

/// Whether a component name is framework plumbing rather than app code
pub fn is_internal_name(name: &str) -> bool {
    if INTERNAL_NAMES.contains(&name) || WRAPPER_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }
    // withFoo(Bar) style wrappers
    name.strip_prefix("with")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
        && name.ends_with(')')
}

/// The component a node is attributed to
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOwner<N> {
    pub node: N,
    pub name: String,
    /// True when only framework owners were found
    pub internal: bool,
}

fn next_link<A: HostAdapter>(adapter: &A, node: &A::Node) -> Option<A::Node> {
    adapter.debug_owner(node).or_else(|| adapter.parent(node))
}

/// Find the owning component of `node`
///
/// Returns the first named, non-internal owner within `MAX_OWNER_DEPTH`
/// links, else the first internal owner seen, else `None`.
pub fn resolve_owner<A: HostAdapter>(adapter: &A, node: &A::Node) -> Option<ResolvedOwner<A::Node>> {
    let mut fallback: Option<ResolvedOwner<A::Node>> = None;
    let mut cursor = next_link(adapter, node);

    for _ in 0..MAX_OWNER_DEPTH {
        let Some(current) = cursor else {
            break;
        };
        if let Some(name) = adapter.display_name(&current).filter(|n| !n.is_empty()) {
            if !is_internal_name(&name) {
                return Some(ResolvedOwner {
                    node: current,
                    name,
                    internal: false,
                });
            }
            if fallback.is_none() {
                fallback = Some(ResolvedOwner {
                    node: current.clone(),
                    name,
                    internal: true,
                });
            }
        }
        cursor = next_link(adapter, &current);
    }
    fallback
}
