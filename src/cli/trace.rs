//! Recorded commit traces
//!
//! A trace is a JSON document listing commit cycles against an in-memory
//! host:
//!
//! ```json
//! {
//!   "settings": { "batchSize": 50 },
//!   "cycles": [
//!     { "mount": [ { "tag": 1, "name": "Counter" },
//!                  { "tag": 2, "viewType": "RCTText", "owner": 1,
//!                    "props": { "children": "0" } } ] },
//!     { "update": [ { "tag": 2, "props": { "children": "1" } } ] }
//!   ]
//! }
//! ```
//!
//! Each cycle commits the tags it mounts or updates, in that order, unless
//! it lists `commit` explicitly. Functions are written `{"$fn": "name"}`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::errors::{TraceError, TraceResult};
use crate::bridge::RootId;
use crate::config::{FilterConfig, SettingsPatch};
use crate::host::{CommittedState, HostValue, MemoryHost, MemoryNode, NodeSpec, NodeTag, NodeUpdate, StateLink};
use crate::pipeline::RawGeometry;

/// Whole trace file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceFile {
    pub settings: Option<SettingsPatch>,
    pub filters: Option<FilterConfig>,
    pub cycles: Vec<TraceCycle>,
}

impl TraceFile {
    pub fn load(path: &Path) -> TraceResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| TraceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> TraceResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// One commit of one root
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceCycle {
    pub root: u32,
    pub mount: Vec<TraceNode>,
    pub update: Vec<TraceUpdate>,
    /// Tags to report as changed; defaults to every mounted and updated tag
    pub commit: Option<Vec<u64>>,
}

/// A node mounted (or re-described) in a cycle
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceNode {
    pub tag: u64,
    /// Host view type; absent for component nodes
    pub view_type: Option<String>,
    /// Component name
    pub name: Option<String>,
    pub parent: Option<u64>,
    pub owner: Option<u64>,
    pub props: Option<Value>,
    pub state: Option<TraceState>,
    pub geometry: Option<TraceGeometry>,
    /// Make every measurement of this node fail
    pub unmeasurable: bool,
}

/// A re-commit of a mounted node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceUpdate {
    pub tag: u64,
    pub props: Option<Value>,
    pub state: Option<TraceState>,
    /// Slot index to new memoized value
    pub slots: BTreeMap<usize, Value>,
}

/// Committed state: a slot chain or a plain value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceState {
    Slots(Vec<TraceSlot>),
    Value(Value),
}

impl TraceState {
    fn committed(&self) -> Option<CommittedState> {
        match self {
            TraceState::Slots(slots) => CommittedState::chain(slots.iter().map(TraceSlot::link)),
            TraceState::Value(value) => Some(CommittedState::Value(HostValue::from(value))),
        }
    }
}

/// One slot of a chain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceSlot {
    State(Value),
    Reference(Value),
    Derived(Value),
    Effect(i32),
    Memo(Value),
}

impl TraceSlot {
    fn link(&self) -> StateLink {
        match self {
            TraceSlot::State(v) => StateLink::state(HostValue::from(v)),
            TraceSlot::Reference(v) => StateLink::reference(HostValue::from(v)),
            TraceSlot::Derived(v) => StateLink::derived(HostValue::from(v), HostValue::array([])),
            TraceSlot::Effect(tag) => StateLink::effect(*tag),
            TraceSlot::Memo(v) => StateLink::memo(HostValue::from(v)),
        }
    }
}

/// Fixed geometry for a node; missing fields make the measurement incomplete
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct TraceGeometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl From<TraceGeometry> for RawGeometry {
    fn from(g: TraceGeometry) -> Self {
        RawGeometry {
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
        }
    }
}

/// Apply one cycle to `host`; returns the root and the nodes to report
pub fn apply_cycle(host: &MemoryHost, index: usize, cycle: &TraceCycle) -> TraceResult<(RootId, Vec<MemoryNode>)> {
    let root = RootId(cycle.root);
    let mut touched = Vec::new();

    for node in &cycle.mount {
        let mut spec = match &node.name {
            Some(name) => NodeSpec::component(node.tag, name.clone()),
            None => NodeSpec::view(node.tag, "RCTView"),
        }
        .root(root);
        if node.view_type.is_some() {
            spec.view_type = node.view_type.clone();
        }
        if let Some(parent) = node.parent {
            spec = spec.parent(parent);
        }
        if let Some(owner) = node.owner {
            spec = spec.owner(owner);
        }
        if let Some(props) = &node.props {
            spec = spec.props(props);
        }
        spec = spec.state(node.state.as_ref().and_then(TraceState::committed));
        host.mount(spec);

        let tag = NodeTag(node.tag);
        if let Some(geometry) = node.geometry {
            host.set_geometry(tag, geometry.into());
        }
        if node.unmeasurable {
            host.fail_measurement(tag);
        }
        touched.push(node.tag);
    }

    for update in &cycle.update {
        let mut change = NodeUpdate::new();
        if let Some(props) = &update.props {
            change = change.props(props);
        }
        if let Some(state) = update.state.as_ref().and_then(TraceState::committed) {
            change = change.state(state);
        }
        for (slot, value) in &update.slots {
            change = change.slot(*slot, value);
        }
        host.update(NodeTag(update.tag), change)
            .ok_or(TraceError::UnknownTag { cycle: index, tag: update.tag })?;
        touched.push(update.tag);
    }

    let tags = cycle.commit.clone().unwrap_or(touched);
    let nodes = tags
        .into_iter()
        .map(|tag| {
            host.current(NodeTag(tag))
                .ok_or(TraceError::UnknownTag { cycle: index, tag })
        })
        .collect::<TraceResult<Vec<_>>>()?;
    Ok((root, nodes))
}
