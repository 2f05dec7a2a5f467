//! Slot diffing
//!
//! `diff_slots` is the full, component-level differ. `structural_changes`
//! is the cheaper walk used at native level: raw identity per slot and
//! top-level scalar fields of plain state, nothing deeper.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::extract::{classify_link, SlotKind, StateSlotSnapshot, MAX_SLOT_DEPTH};
use super::format::format_value;
use crate::host::{CommittedState, HostValue};

const ABSENT: &str = "(none)";

/// One reportable slot change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotChangeDescription {
    pub index: usize,
    pub kind: SlotKind,
    pub previous_value: String,
    pub current_value: String,
    pub description: String,
}

impl SlotChangeDescription {
    fn changed(previous: &StateSlotSnapshot, current: &StateSlotSnapshot) -> Self {
        let previous_value = format_value(&previous.value);
        let current_value = format_value(&current.value);
        let description = if previous.kind != current.kind {
            format!(
                "slot {} changed kind: {} -> {}",
                current.index, previous.kind, current.kind
            )
        } else {
            format!(
                "{} slot {}: {} -> {}",
                current.kind, current.index, previous_value, current_value
            )
        };
        Self {
            index: current.index,
            kind: current.kind,
            previous_value,
            current_value,
            description,
        }
    }

    fn added(current: &StateSlotSnapshot) -> Self {
        let current_value = format_value(&current.value);
        Self {
            index: current.index,
            kind: current.kind,
            previous_value: ABSENT.to_string(),
            description: format!("{} slot {} added: {}", current.kind, current.index, current_value),
            current_value,
        }
    }

    fn removed(previous: &StateSlotSnapshot) -> Self {
        let previous_value = format_value(&previous.value);
        Self {
            index: previous.index,
            kind: previous.kind,
            current_value: ABSENT.to_string(),
            description: format!("{} slot {} removed (was {})", previous.kind, previous.index, previous_value),
            previous_value,
        }
    }
}

fn is_reportable(kind: SlotKind) -> bool {
    matches!(kind, SlotKind::StateValue | SlotKind::ReferenceValue)
}

/// Diff two extractions index by index
///
/// Unchanged raw identities are skipped, as are effect, callback and
/// derived slots. Added or removed slots are always reported. Returns `None`
/// when nothing is reportable.
pub fn diff_slots(
    previous: &[StateSlotSnapshot],
    current: &[StateSlotSnapshot],
) -> Option<Vec<SlotChangeDescription>> {
    let mut changes = Vec::new();
    for index in 0..previous.len().max(current.len()) {
        match (previous.get(index), current.get(index)) {
            (Some(prev), Some(curr)) => {
                if prev.same_identity(curr) {
                    continue;
                }
                if prev.kind != curr.kind || is_reportable(curr.kind) {
                    changes.push(SlotChangeDescription::changed(prev, curr));
                }
            }
            (None, Some(curr)) => changes.push(SlotChangeDescription::added(curr)),
            (Some(prev), None) => changes.push(SlotChangeDescription::removed(prev)),
            (None, None) => {}
        }
    }
    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}

/// Result of the cheap native-level state walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralDiff {
    /// Chain indices whose raw identity moved (including added/removed links)
    pub changed_slots: Vec<usize>,
    /// Whether any moved link is a settable state slot
    pub state_slot_changed: bool,
    /// Top-level scalar fields of plain state that changed
    pub changed_fields: Vec<String>,
    /// The two states have different shapes (chain vs plain)
    pub shape_changed: bool,
}

impl StructuralDiff {
    pub fn is_empty(&self) -> bool {
        self.changed_slots.is_empty() && self.changed_fields.is_empty() && !self.shape_changed
    }
}

/// Compare two committed states by slot identity and scalar fields
pub fn structural_changes(previous: &CommittedState, current: &CommittedState) -> StructuralDiff {
    let mut diff = StructuralDiff::default();
    match (previous, current) {
        (CommittedState::Chain(prev), CommittedState::Chain(curr)) => {
            let mut a = Some(prev.as_ref());
            let mut b = Some(curr.as_ref());
            for index in 0..MAX_SLOT_DEPTH {
                match (a, b) {
                    (None, None) => break,
                    (Some(p), Some(c)) => {
                        if !p.memoized.same_identity(&c.memoized) {
                            diff.changed_slots.push(index);
                            diff.state_slot_changed |= classify_link(c) == SlotKind::StateValue;
                        }
                    }
                    (Some(link), None) | (None, Some(link)) => {
                        diff.changed_slots.push(index);
                        diff.state_slot_changed |= classify_link(link) == SlotKind::StateValue;
                    }
                }
                a = a.and_then(|l| l.next.as_deref());
                b = b.and_then(|l| l.next.as_deref());
            }
        }
        (CommittedState::Value(prev), CommittedState::Value(curr)) => {
            diff.changed_fields = changed_scalar_fields(prev, curr);
        }
        _ => diff.shape_changed = true,
    }
    diff
}

fn changed_scalar_fields(previous: &HostValue, current: &HostValue) -> Vec<String> {
    let (Some(prev), Some(curr)) = (previous.as_object(), current.as_object()) else {
        let scalar = previous.is_scalar() || current.is_scalar();
        return if scalar && !previous.same_identity(current) {
            vec![String::new()]
        } else {
            Vec::new()
        };
    };
    let keys: BTreeSet<&String> = prev.keys().chain(curr.keys()).collect();
    keys.into_iter()
        .filter(|key| {
            let a = prev.get(*key).cloned().unwrap_or_default();
            let b = curr.get(*key).cloned().unwrap_or_default();
            (a.is_scalar() || b.is_scalar()) && !a.same_identity(&b)
        })
        .cloned()
        .collect()
}
