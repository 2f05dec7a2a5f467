//! In-memory host runtime
//!
//! A small retained tree with real double buffering: each node owns up to two
//! buffers, every update writes the non-current buffer and flips the current
//! pointer. It implements the adapter, the introspection hook and geometry
//! measurement, and backs the replay CLI and the test suites.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use futures_util::future::{self, FutureExt, LocalBoxFuture};

use super::adapter::{BufferKey, HostAdapter, NodeTag};
use super::state::CommittedState;
use super::value::HostValue;
use crate::bridge::{CommitBatch, CommitSender, HookSubscription, IntrospectionHook, RootId};
use crate::pipeline::{GeometryProvider, MeasureError, MeasureResult, RawGeometry};

/// Reference to one buffer of a node in a `MemoryHost`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryNode {
    buffer: usize,
}

/// Description of a node to mount
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub tag: u64,
    pub root: RootId,
    pub view_type: Option<String>,
    pub name: Option<String>,
    pub props: HostValue,
    pub state: Option<CommittedState>,
    pub parent: Option<NodeTag>,
    pub owner: Option<NodeTag>,
}

impl NodeSpec {
    /// Concrete visual node
    pub fn view(tag: u64, view_type: impl Into<String>) -> Self {
        Self {
            tag,
            view_type: Some(view_type.into()),
            props: HostValue::object(Vec::<(String, HostValue)>::new()),
            ..Self::default()
        }
    }

    /// Logical component
    pub fn component(tag: u64, name: impl Into<String>) -> Self {
        Self {
            tag,
            name: Some(name.into()),
            props: HostValue::object(Vec::<(String, HostValue)>::new()),
            ..Self::default()
        }
    }

    pub fn root(mut self, root: RootId) -> Self {
        self.root = root;
        self
    }

    pub fn parent(mut self, tag: u64) -> Self {
        self.parent = Some(NodeTag(tag));
        self
    }

    pub fn owner(mut self, tag: u64) -> Self {
        self.owner = Some(NodeTag(tag));
        self
    }

    /// Parent and owner set to the same node
    pub fn child_of(self, tag: u64) -> Self {
        self.parent(tag).owner(tag)
    }

    pub fn props(mut self, props: impl Into<HostValue>) -> Self {
        self.props = props.into();
        self
    }

    pub fn state(mut self, state: Option<CommittedState>) -> Self {
        self.state = state;
        self
    }
}

/// Changes applied by one commit of a node
///
/// Unset fields keep the previous buffer's values by reference.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    props: Option<HostValue>,
    state: Option<CommittedState>,
    slots: Vec<(usize, HostValue)>,
}

impl NodeUpdate {
    /// Re-commit with identical inputs and state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(mut self, props: impl Into<HostValue>) -> Self {
        self.props = Some(props.into());
        self
    }

    pub fn state(mut self, state: CommittedState) -> Self {
        self.state = Some(state);
        self
    }

    /// Replace one slot's memoized value
    pub fn slot(mut self, index: usize, value: impl Into<HostValue>) -> Self {
        self.slots.push((index, value.into()));
        self
    }
}

#[derive(Debug)]
struct Buffer {
    tag: NodeTag,
    alternate: Option<usize>,
    props: HostValue,
    state: Option<CommittedState>,
}

#[derive(Debug)]
struct NodeEntry {
    view_type: Option<String>,
    name: Option<String>,
    parent: Option<NodeTag>,
    owner: Option<NodeTag>,
    current: usize,
}

#[derive(Debug, Default)]
struct MemoryTree {
    buffers: Vec<Buffer>,
    nodes: HashMap<NodeTag, NodeEntry>,
    roots: BTreeSet<RootId>,
    enabled_roots: HashSet<RootId>,
    subscribers: BTreeMap<u64, CommitSender<MemoryNode>>,
    next_subscription: u64,
    geometry: HashMap<NodeTag, RawGeometry>,
    failing: HashSet<NodeTag>,
}

impl MemoryTree {
    fn entry(&self, node: &MemoryNode) -> Option<&NodeEntry> {
        let tag = self.buffers.get(node.buffer)?.tag;
        self.nodes.get(&tag)
    }

    fn current_of(&self, tag: NodeTag) -> Option<MemoryNode> {
        self.nodes.get(&tag).map(|e| MemoryNode { buffer: e.current })
    }
}

/// In-memory host; clones share the same tree
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    tree: Rc<RefCell<MemoryTree>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a node (first commit); returns its only buffer
    ///
    /// Mounting an existing tag replaces its static description and commits
    /// the new inputs like an update.
    pub fn mount(&self, spec: NodeSpec) -> MemoryNode {
        let tag = NodeTag(spec.tag);
        let existing = self.tree.borrow().nodes.get(&tag).map(|e| e.current);
        if let Some(current) = existing {
            {
                let mut tree = self.tree.borrow_mut();
                if let Some(entry) = tree.nodes.get_mut(&tag) {
                    entry.view_type = spec.view_type;
                    entry.name = spec.name;
                    entry.parent = spec.parent;
                    entry.owner = spec.owner;
                }
            }
            let mut update = NodeUpdate::new().props(spec.props);
            if let Some(state) = spec.state {
                update = update.state(state);
            }
            return self
                .update(tag, update)
                .unwrap_or(MemoryNode { buffer: current });
        }

        let mut tree = self.tree.borrow_mut();
        let buffer = tree.buffers.len();
        tree.buffers.push(Buffer {
            tag,
            alternate: None,
            props: spec.props,
            state: spec.state,
        });
        tree.roots.insert(spec.root);
        tree.nodes.insert(
            tag,
            NodeEntry {
                view_type: spec.view_type,
                name: spec.name,
                parent: spec.parent,
                owner: spec.owner,
                current: buffer,
            },
        );
        MemoryNode { buffer }
    }

    /// Commit a node again; writes the alternate buffer and makes it current
    pub fn update(&self, tag: NodeTag, update: NodeUpdate) -> Option<MemoryNode> {
        let mut tree = self.tree.borrow_mut();
        let current = tree.nodes.get(&tag)?.current;

        let props = update
            .props
            .unwrap_or_else(|| tree.buffers[current].props.clone());
        let mut state = update
            .state
            .or_else(|| tree.buffers[current].state.clone());
        for (index, value) in update.slots {
            state = match state {
                Some(s) => Some(s.with_slot(index, value).unwrap_or(s)),
                None => None,
            };
        }

        let target = match tree.buffers[current].alternate {
            Some(alternate) => alternate,
            None => {
                let index = tree.buffers.len();
                tree.buffers.push(Buffer {
                    tag,
                    alternate: Some(current),
                    props: HostValue::Null,
                    state: None,
                });
                tree.buffers[current].alternate = Some(index);
                index
            }
        };
        tree.buffers[target].props = props;
        tree.buffers[target].state = state;
        if let Some(entry) = tree.nodes.get_mut(&tag) {
            entry.current = target;
        }
        Some(MemoryNode { buffer: target })
    }

    /// Buffer currently holding the committed data
    pub fn current(&self, tag: NodeTag) -> Option<MemoryNode> {
        self.tree.borrow().current_of(tag)
    }

    /// Buffer holding the previous commit's data
    pub fn stale(&self, tag: NodeTag) -> Option<MemoryNode> {
        let tree = self.tree.borrow();
        let current = tree.nodes.get(&tag)?.current;
        tree.buffers[current].alternate.map(|buffer| MemoryNode { buffer })
    }

    /// Deliver a commit notification for `root` to every subscriber
    ///
    /// Returns the number of subscribers reached; nothing is sent while the
    /// root's notifications are disabled.
    pub fn commit(&self, root: RootId, nodes: Vec<MemoryNode>) -> usize {
        let mut tree = self.tree.borrow_mut();
        if !tree.enabled_roots.contains(&root) {
            return 0;
        }
        let mut delivered = 0;
        tree.subscribers.retain(|_, sender| {
            let open = sender
                .send(CommitBatch {
                    root,
                    nodes: nodes.clone(),
                })
                .is_ok();
            if open {
                delivered += 1;
            }
            open
        });
        delivered
    }

    /// Fix the geometry reported for a node
    pub fn set_geometry(&self, tag: NodeTag, geometry: RawGeometry) {
        self.tree.borrow_mut().geometry.insert(tag, geometry);
    }

    /// Make measurement of a node fail
    pub fn fail_measurement(&self, tag: NodeTag) {
        self.tree.borrow_mut().failing.insert(tag);
    }

    pub fn notifications_enabled(&self, root: RootId) -> bool {
        self.tree.borrow().enabled_roots.contains(&root)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tree.borrow().subscribers.len()
    }
}

impl HostAdapter for MemoryHost {
    type Node = MemoryNode;

    fn tag(&self, node: &MemoryNode) -> NodeTag {
        self.tree
            .borrow()
            .buffers
            .get(node.buffer)
            .map(|b| b.tag)
            .unwrap_or(NodeTag(u64::MAX))
    }

    fn buffer_key(&self, node: &MemoryNode) -> BufferKey {
        BufferKey(node.buffer as u64)
    }

    fn alternate(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let tree = self.tree.borrow();
        tree.buffers
            .get(node.buffer)?
            .alternate
            .map(|buffer| MemoryNode { buffer })
    }

    fn view_type(&self, node: &MemoryNode) -> Option<String> {
        self.tree.borrow().entry(node)?.view_type.clone()
    }

    fn display_name(&self, node: &MemoryNode) -> Option<String> {
        self.tree.borrow().entry(node)?.name.clone()
    }

    fn props(&self, node: &MemoryNode) -> Option<HostValue> {
        let tree = self.tree.borrow();
        tree.buffers.get(node.buffer).map(|b| b.props.clone())
    }

    fn state(&self, node: &MemoryNode) -> Option<CommittedState> {
        let tree = self.tree.borrow();
        tree.buffers.get(node.buffer)?.state.clone()
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let tree = self.tree.borrow();
        let parent = tree.entry(node)?.parent?;
        tree.current_of(parent)
    }

    fn debug_owner(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let tree = self.tree.borrow();
        let owner = tree.entry(node)?.owner?;
        tree.current_of(owner)
    }
}

impl IntrospectionHook<MemoryNode> for MemoryHost {
    fn subscribe(&mut self, sender: CommitSender<MemoryNode>) -> HookSubscription {
        let mut tree = self.tree.borrow_mut();
        tree.next_subscription += 1;
        let id = tree.next_subscription;
        tree.subscribers.insert(id, sender);
        HookSubscription(id)
    }

    fn unsubscribe(&mut self, subscription: HookSubscription) {
        self.tree.borrow_mut().subscribers.remove(&subscription.0);
    }

    fn set_notifications_enabled(&mut self, root: RootId, enabled: bool) {
        let mut tree = self.tree.borrow_mut();
        tree.roots.insert(root);
        if enabled {
            tree.enabled_roots.insert(root);
        } else {
            tree.enabled_roots.remove(&root);
        }
    }

    fn roots(&self) -> Vec<RootId> {
        self.tree.borrow().roots.iter().copied().collect()
    }
}

impl GeometryProvider<MemoryNode> for MemoryHost {
    fn measure(&self, node: &MemoryNode) -> LocalBoxFuture<'static, MeasureResult<RawGeometry>> {
        let tag = self.tag(node);
        let tree = self.tree.borrow();
        let result = if tree.failing.contains(&tag) {
            Err(MeasureError::Unavailable(format!("node {} is not laid out", tag)))
        } else if !tree.nodes.contains_key(&tag) {
            Err(MeasureError::Detached)
        } else {
            Ok(tree.geometry.get(&tag).copied().unwrap_or_else(|| {
                let cell = tag.0 % 400;
                RawGeometry::complete(((cell % 20) * 20) as f64, ((cell / 20) * 20) as f64, 18.0, 18.0)
            }))
        };
        future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_update_alternates_buffers() {
        let host = MemoryHost::new();
        let first = host.mount(NodeSpec::view(1, "RCTView").props(HostValue::object([("a", HostValue::from(1))])));
        assert!(host.alternate(&first).is_none());

        let second = host.update(NodeTag(1), NodeUpdate::new().props(HostValue::object([("a", HostValue::from(2))]))).unwrap();
        assert_ne!(first, second);
        assert_eq!(host.alternate(&second), Some(first));
        assert_eq!(host.tag(&first), host.tag(&second));

        let third = host.update(NodeTag(1), NodeUpdate::new()).unwrap();
        assert_eq!(third, first);
        assert_eq!(host.stale(NodeTag(1)), Some(second));
        assert_eq!(host.props(&third).unwrap().field("a"), HostValue::from(2));
    }

    #[test]
    fn test_update_without_props_keeps_identity() {
        let host = MemoryHost::new();
        let node = host.mount(NodeSpec::view(1, "RCTView").props(HostValue::object([("a", HostValue::from(1))])));
        let before = host.props(&node).unwrap();
        let next = host.update(NodeTag(1), NodeUpdate::new()).unwrap();
        assert!(host.props(&next).unwrap().same_identity(&before));
    }

    #[test]
    fn test_parent_and_owner_resolve_to_current_buffers() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Screen"));
        let child = host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let owner_now = host.update(NodeTag(1), NodeUpdate::new()).unwrap();
        assert_eq!(host.debug_owner(&child), Some(owner_now));
        assert_eq!(host.parent(&child), Some(owner_now));
        assert_eq!(host.display_name(&owner_now).as_deref(), Some("Screen"));
        assert!(host.display_name(&child).is_none());
        assert!(host.is_host_view(&child));
    }

    #[test]
    fn test_commit_respects_root_notifications() {
        let mut host = MemoryHost::new();
        let node = host.mount(NodeSpec::view(1, "RCTView"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        host.subscribe(tx);

        assert_eq!(host.commit(RootId::default(), vec![node]), 0);
        host.set_notifications_enabled(RootId::default(), true);
        assert_eq!(host.commit(RootId::default(), vec![node]), 1);
        assert_eq!(rx.try_recv().unwrap().nodes, vec![node]);
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let mut host = MemoryHost::new();
        host.set_notifications_enabled(RootId::default(), true);
        let (tx, rx) = mpsc::unbounded_channel();
        host.subscribe(tx);
        drop(rx);
        assert_eq!(host.commit(RootId::default(), Vec::new()), 0);
        assert_eq!(host.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_measure_default_and_failure() {
        let host = MemoryHost::new();
        let a = host.mount(NodeSpec::view(1, "RCTView"));
        let b = host.mount(NodeSpec::view(2, "RCTView"));
        host.fail_measurement(NodeTag(2));

        let geometry = host.measure(&a).await.unwrap();
        assert!(geometry.resolve().is_some());
        assert!(matches!(host.measure(&b).await, Err(MeasureError::Unavailable(_))));
    }
}
