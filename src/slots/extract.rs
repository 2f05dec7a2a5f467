//! Slot extraction by shape

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{CommittedState, HostValue, StateLink};

/// Hard limit on chain links walked
pub const MAX_SLOT_DEPTH: usize = 50;

/// Kind of a state slot, inferred from its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    StateValue,
    DerivedValue,
    CallbackValue,
    ReferenceValue,
    EffectValue,
    Unknown,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::StateValue => "state",
            SlotKind::DerivedValue => "derived",
            SlotKind::CallbackValue => "callback",
            SlotKind::ReferenceValue => "reference",
            SlotKind::EffectValue => "effect",
            SlotKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One extracted slot. Never mutated; re-extracted every cycle.
#[derive(Debug, Clone, Serialize)]
pub struct StateSlotSnapshot {
    pub index: usize,
    pub kind: SlotKind,
    /// Display value, unwrapped per kind
    pub value: HostValue,
    /// The slot's memoized value, for identity comparison only
    #[serde(skip)]
    pub raw: HostValue,
}

impl StateSlotSnapshot {
    /// Same raw identity as `other`
    pub fn same_identity(&self, other: &StateSlotSnapshot) -> bool {
        self.raw.same_identity(&other.raw)
    }
}

/// Classify one link of a slot chain
pub fn classify_link(link: &StateLink) -> SlotKind {
    if link.queue.is_some() {
        return SlotKind::StateValue;
    }
    match &link.memoized {
        HostValue::Object(map) if map.len() == 1 && map.contains_key("current") => {
            SlotKind::ReferenceValue
        }
        HostValue::Array(items) if items.len() == 2 && is_dependency_list(&items[1]) => {
            if items[0].is_function() {
                SlotKind::CallbackValue
            } else {
                SlotKind::DerivedValue
            }
        }
        HostValue::Object(map)
            if map.contains_key("tag") && (map.contains_key("create") || map.contains_key("destroy")) =>
        {
            SlotKind::EffectValue
        }
        _ => SlotKind::Unknown,
    }
}

fn is_dependency_list(value: &HostValue) -> bool {
    matches!(value, HostValue::Array(_) | HostValue::Null)
}

fn display_value(kind: SlotKind, memoized: &HostValue) -> HostValue {
    match kind {
        SlotKind::ReferenceValue => memoized.field("current"),
        SlotKind::CallbackValue | SlotKind::DerivedValue => memoized
            .as_array()
            .and_then(|items| items.first().cloned())
            .unwrap_or_default(),
        _ => memoized.clone(),
    }
}

/// Extract the ordered slots of a committed state
///
/// Returns `None` when the state is not a slot chain (plain class-style
/// state). Walks at most `MAX_SLOT_DEPTH` links.
pub fn extract_slots(state: &CommittedState) -> Option<Vec<StateSlotSnapshot>> {
    let head = state.head()?;
    let slots = head
        .iter()
        .take(MAX_SLOT_DEPTH)
        .enumerate()
        .map(|(index, link)| {
            let kind = classify_link(link);
            StateSlotSnapshot {
                index,
                kind,
                value: display_value(kind, &link.memoized),
                raw: link.memoized.clone(),
            }
        })
        .collect();
    Some(slots)
}

/// Value of the first settable state slot, without a full extraction
pub fn first_state_value(state: &CommittedState) -> Option<HostValue> {
    state
        .head()?
        .iter()
        .take(MAX_SLOT_DEPTH)
        .find(|link| link.queue.is_some())
        .map(|link| link.memoized.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps() -> HostValue {
        HostValue::array([HostValue::from(1)])
    }

    #[test]
    fn test_classifies_each_shape() {
        let state = CommittedState::chain([
            StateLink::state(5),
            StateLink::reference(HostValue::from("node")),
            StateLink::callback(HostValue::function("onPress"), deps()),
            StateLink::derived(HostValue::from(42), deps()),
            StateLink::effect(5),
            StateLink::memo(HostValue::from("opaque")),
        ])
        .unwrap();

        let slots = extract_slots(&state).unwrap();
        let kinds: Vec<_> = slots.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SlotKind::StateValue,
                SlotKind::ReferenceValue,
                SlotKind::CallbackValue,
                SlotKind::DerivedValue,
                SlotKind::EffectValue,
                SlotKind::Unknown,
            ]
        );
        assert_eq!(slots[0].value, HostValue::from(5));
        assert_eq!(slots[1].value, HostValue::from("node"));
        assert!(slots[2].value.is_function());
        assert_eq!(slots[3].value, HostValue::from(42));
        assert_eq!(slots.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_state_slot_holding_pair_is_still_state() {
        let pair = HostValue::array([HostValue::function("f"), HostValue::array([])]);
        let state = CommittedState::chain([StateLink::state(pair)]).unwrap();
        assert_eq!(extract_slots(&state).unwrap()[0].kind, SlotKind::StateValue);
    }

    #[test]
    fn test_plain_state_is_not_a_chain() {
        let state = CommittedState::Value(HostValue::object([("count", HostValue::from(1))]));
        assert!(extract_slots(&state).is_none());
        assert!(first_state_value(&state).is_none());
    }

    #[test]
    fn test_depth_limit() {
        let state = CommittedState::chain((0..80).map(StateLink::state)).unwrap();
        assert_eq!(extract_slots(&state).unwrap().len(), MAX_SLOT_DEPTH);
    }

    #[test]
    fn test_first_state_value_skips_non_state_links() {
        let state = CommittedState::chain([
            StateLink::reference(HostValue::Null),
            StateLink::state("first"),
            StateLink::state("second"),
        ])
        .unwrap();
        assert_eq!(first_state_value(&state), Some(HostValue::from("first")));
    }
}
