//! Extraction adapter over a host runtime's node internals
//!
//! The attribution core only talks to a host through this trait. Everything
//! version-sensitive about a host (how buffers pair up, where committed inputs
//! live, how state slots are chained) belongs in one implementation of it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::CommittedState;
use super::value::HostValue;
use crate::slots::{extract_slots, StateSlotSnapshot};

/// Stable per-node tag; shared by both of a node's buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTag(pub u64);

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one buffer; only stable within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferKey(pub u64);

/// Behavioral kind of a host view type, for input diffing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Text-bearing; `children` is content
    Text,
    /// Generic container; `children` holds child nodes
    Container,
    /// Image-like; `source` is always tracked
    Image,
    Other,
}

impl ViewKind {
    /// Classify a host view type label
    pub fn classify(view_type: &str) -> ViewKind {
        let name = view_type.strip_prefix("RCT").unwrap_or(view_type);
        if name.contains("Text") {
            ViewKind::Text
        } else if name.contains("Image") {
            ViewKind::Image
        } else if name.ends_with("View") || name.contains("ScrollView") || name == "SafeAreaView" {
            ViewKind::Container
        } else {
            ViewKind::Other
        }
    }
}

/// Read-only view of a host runtime's node tree
pub trait HostAdapter {
    /// Reference to one buffer of a node
    type Node: Clone;

    /// Stable tag of the node the buffer belongs to
    fn tag(&self, node: &Self::Node) -> NodeTag;

    /// Identity of this particular buffer
    fn buffer_key(&self, node: &Self::Node) -> BufferKey;

    /// The paired buffer, if the node has been committed more than once
    fn alternate(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Host view type label (`None` for logical components)
    fn view_type(&self, node: &Self::Node) -> Option<String>;

    /// Component name (`None` for host views and anonymous nodes)
    fn display_name(&self, node: &Self::Node) -> Option<String>;

    /// Committed inputs
    fn props(&self, node: &Self::Node) -> Option<HostValue>;

    /// Committed local state
    fn state(&self, node: &Self::Node) -> Option<CommittedState>;

    /// Structural parent
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Debug owner: the component that created this node
    fn debug_owner(&self, node: &Self::Node) -> Option<Self::Node>;

    /// True for concrete visual nodes
    fn is_host_view(&self, node: &Self::Node) -> bool {
        self.view_type(node).is_some()
    }

    /// View kind used for input diffing
    fn view_kind(&self, node: &Self::Node) -> ViewKind {
        self.view_type(node)
            .map(|t| ViewKind::classify(&t))
            .unwrap_or(ViewKind::Other)
    }

    /// Ordered state slots, or `None` when the state is not a slot chain
    fn extract_slots(&self, node: &Self::Node) -> Option<Vec<StateSlotSnapshot>> {
        self.state(node).as_ref().and_then(extract_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_kind_classification() {
        assert_eq!(ViewKind::classify("RCTText"), ViewKind::Text);
        assert_eq!(ViewKind::classify("RCTVirtualText"), ViewKind::Text);
        assert_eq!(ViewKind::classify("RCTView"), ViewKind::Container);
        assert_eq!(ViewKind::classify("RCTScrollView"), ViewKind::Container);
        assert_eq!(ViewKind::classify("RCTImageView"), ViewKind::Image);
        assert_eq!(ViewKind::classify("RCTSwitch"), ViewKind::Other);
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(NodeTag(42).to_string(), "42");
    }
}
