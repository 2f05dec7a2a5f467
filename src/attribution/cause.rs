//! Verdict model
//!
//! One `CauseVerdict` per render event, immutable once produced:
//! - `native_cause`: what changed on the concrete visual node
//! - `component_cause`: why the owning logical component recomputed

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::slots::SlotChangeDescription;

/// Native-level cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NativeCause {
    /// First observation of the node
    Mount,
    /// Committed inputs changed
    InputChange,
    /// Committed state changed
    StateChange,
    /// Only non-settable slots moved (references, memoized values)
    SlotChange,
    /// No local change; an ancestor recomputed
    InheritedFromAncestor,
    /// Nothing recognizable
    Unknown,
}

impl NativeCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeCause::Mount => "Mount",
            NativeCause::InputChange => "InputChange",
            NativeCause::StateChange => "StateChange",
            NativeCause::SlotChange => "SlotChange",
            NativeCause::InheritedFromAncestor => "InheritedFromAncestor",
            NativeCause::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for NativeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Component-level cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentCause {
    Mount,
    /// Different inputs from the parent
    InputChange,
    /// The component's own state changed
    StateChange,
    /// Recomputed with no local change
    InheritedFromAncestor,
    Unknown,
}

impl ComponentCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCause::Mount => "Mount",
            ComponentCause::InputChange => "InputChange",
            ComponentCause::StateChange => "StateChange",
            ComponentCause::InheritedFromAncestor => "InheritedFromAncestor",
            ComponentCause::Unknown => "Unknown",
        }
    }

    /// A concrete local reason (inputs or state)
    pub fn is_concrete(&self) -> bool {
        matches!(self, ComponentCause::InputChange | ComponentCause::StateChange)
    }
}

impl fmt::Display for ComponentCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Component verdicts relabeled at native level
impl From<ComponentCause> for NativeCause {
    fn from(cause: ComponentCause) -> Self {
        match cause {
            ComponentCause::Mount => NativeCause::Mount,
            ComponentCause::InputChange => NativeCause::InputChange,
            ComponentCause::StateChange => NativeCause::StateChange,
            ComponentCause::InheritedFromAncestor => NativeCause::InheritedFromAncestor,
            ComponentCause::Unknown => NativeCause::Unknown,
        }
    }
}

/// How one changed input key changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputChangeKind {
    /// The value is different
    Value,
    /// New reference, structurally equal value
    ReferenceOnly,
    /// A function input was recreated
    FunctionReference,
}

impl InputChangeKind {
    /// Whether this is only an identity change
    pub fn is_hint(&self) -> bool {
        !matches!(self, InputChangeKind::Value)
    }
}

/// One changed top-level input key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputKeyChange {
    pub key: String,
    pub kind: InputChangeKind,
}

impl InputKeyChange {
    pub fn new(key: impl Into<String>, kind: InputChangeKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }
}

/// Two-level verdict for one render event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseVerdict {
    pub native_cause: NativeCause,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_input_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_changes: Option<Vec<InputKeyChange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_slot_indices: Option<Vec<usize>>,
    /// Changed top-level fields of plain (class-style) state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_state_keys: Option<Vec<String>>,
    /// Slot diff of the owning component, set only with a component-level
    /// `StateChange`; a node's own slot changes are in `changed_slot_indices`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_changes: Option<Vec<SlotChangeDescription>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_cause: Option<ComponentCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CauseVerdict {
    /// Verdict with only a native cause
    pub fn new(native_cause: NativeCause, timestamp: i64) -> Self {
        Self {
            native_cause,
            changed_input_keys: None,
            input_changes: None,
            changed_slot_indices: None,
            changed_state_keys: None,
            slot_changes: None,
            component_cause: None,
            owner_name: None,
            timestamp,
        }
    }

    /// Whether every reported input change is identity-only
    pub fn is_reference_only(&self) -> bool {
        self.input_changes
            .as_ref()
            .is_some_and(|changes| !changes.is_empty() && changes.iter().all(|c| c.kind.is_hint()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
