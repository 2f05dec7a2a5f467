//! Input and state comparison at both levels
//!
//! Native level looks at the concrete visual node, with per-view-kind
//! handling of content fields. Component level is a plain shallow compare.

use std::collections::BTreeSet;

use super::cause::{InputChangeKind, InputKeyChange};
use crate::host::{HostValue, ViewKind};
use crate::reconcile::StoredSnapshot;
use crate::slots::{structural_changes, StructuralDiff};

/// Key reported when the inputs are not an object and changed as a whole
pub const WHOLE_INPUTS_KEY: &str = "(inputs)";

const CONTENT_KEY: &str = "children";
const SOURCE_KEY: &str = "source";

/// What changed locally on a node between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub enum LocalChange {
    Inputs(Vec<InputKeyChange>),
    State(StructuralDiff),
    None,
}

fn keys_of<'a>(
    previous: &'a HostValue,
    current: &'a HostValue,
) -> Option<BTreeSet<&'a String>> {
    let (a, b) = (previous.as_object()?, current.as_object()?);
    Some(a.keys().chain(b.keys()).collect())
}

fn classify(kind: ViewKind, key: &str, previous: &HostValue, current: &HostValue) -> Option<InputChangeKind> {
    if previous.same_identity(current) {
        return None;
    }
    match (kind, key) {
        (ViewKind::Container, CONTENT_KEY) => return None,
        (ViewKind::Text, CONTENT_KEY) | (ViewKind::Image, SOURCE_KEY) => {
            return Some(InputChangeKind::Value)
        }
        _ => {}
    }
    if previous.is_function() && current.is_function() {
        Some(InputChangeKind::FunctionReference)
    } else if previous.is_composite() && current.is_composite() && previous == current {
        Some(InputChangeKind::ReferenceOnly)
    } else {
        Some(InputChangeKind::Value)
    }
}

/// Changed top-level input keys of a concrete view
pub fn changed_inputs(
    kind: ViewKind,
    previous: Option<&HostValue>,
    current: Option<&HostValue>,
) -> Vec<InputKeyChange> {
    let undefined = HostValue::Undefined;
    let previous = previous.unwrap_or(&undefined);
    let current = current.unwrap_or(&undefined);
    if previous.same_identity(current) {
        return Vec::new();
    }
    let Some(keys) = keys_of(previous, current) else {
        return vec![InputKeyChange::new(WHOLE_INPUTS_KEY, InputChangeKind::Value)];
    };
    keys.into_iter()
        .filter_map(|key| {
            let a = previous.field(key);
            let b = current.field(key);
            classify(kind, key, &a, &b).map(|change| InputKeyChange::new(key.clone(), change))
        })
        .collect()
}

/// Top-level keys whose values differ by identity
///
/// Identical references short-circuit to no change.
pub fn shallow_changed_keys(previous: Option<&HostValue>, current: Option<&HostValue>) -> Vec<String> {
    let undefined = HostValue::Undefined;
    let previous = previous.unwrap_or(&undefined);
    let current = current.unwrap_or(&undefined);
    if previous.same_identity(current) {
        return Vec::new();
    }
    match keys_of(previous, current) {
        Some(keys) => keys
            .into_iter()
            .filter(|key| !previous.field(key).same_identity(&current.field(key)))
            .cloned()
            .collect(),
        None => vec![WHOLE_INPUTS_KEY.to_string()],
    }
}

/// Compare a node's prior and current snapshots
pub fn local_change(kind: ViewKind, prior: &StoredSnapshot, current: &StoredSnapshot) -> LocalChange {
    let inputs = changed_inputs(kind, prior.props.as_ref(), current.props.as_ref());
    if !inputs.is_empty() {
        return LocalChange::Inputs(inputs);
    }
    if prior.same_state(current) {
        return LocalChange::None;
    }
    match (&prior.state, &current.state) {
        (Some(a), Some(b)) => LocalChange::State(structural_changes(a, b)),
        // State appeared or disappeared
        _ => LocalChange::State(StructuralDiff {
            shape_changed: true,
            ..StructuralDiff::default()
        }),
    }
}
