//! Tracked records and history events

use std::collections::VecDeque;

use serde::Serialize;
use uuid::Uuid;

use crate::attribution::CauseVerdict;
use crate::host::{HostValue, NodeTag};
use crate::pipeline::Geometry;

/// One history entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEvent {
    pub id: String,
    pub timestamp: i64,
    pub cause: CauseVerdict,
    pub render_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_inputs: Option<HostValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_state: Option<HostValue>,
}

impl RenderEvent {
    pub fn new(cause: CauseVerdict, render_number: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: cause.timestamp,
            cause,
            render_number,
            captured_inputs: None,
            captured_state: None,
        }
    }
}

/// Identifying attributes read from a node's committed inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifyingAttributes {
    pub test_id: Option<String>,
    pub accessibility_label: Option<String>,
}

impl IdentifyingAttributes {
    /// Read `testID` (or `nativeID`) and `accessibilityLabel` (or `aria-label`)
    pub fn from_inputs(inputs: Option<&HostValue>) -> Self {
        let text = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                inputs
                    .and_then(|value| value.get(key))
                    .and_then(HostValue::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        };
        Self {
            test_id: text(&["testID", "nativeID"]),
            accessibility_label: text(&["accessibilityLabel", "aria-label"]),
        }
    }
}

/// Human-facing name for a host view type
pub fn friendly_name(view_type: &str) -> String {
    view_type.strip_prefix("RCT").unwrap_or(view_type).to_string()
}

/// Everything the pipeline knows about one tracked render
#[derive(Debug, Clone)]
pub struct RenderUpdate {
    pub tag: NodeTag,
    pub view_type: String,
    /// Component name when the node is a named component
    pub display_name: Option<String>,
    pub attributes: IdentifyingAttributes,
    pub owner_name: Option<String>,
    pub geometry: Option<Geometry>,
    pub color: String,
    pub cause: CauseVerdict,
    /// Offered for capture; kept only when the settings allow
    pub inputs: Option<HostValue>,
    pub state: Option<HostValue>,
}

/// Per-tag record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedComponentRecord {
    pub tag: NodeTag,
    pub view_type: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub render_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub geometry: Option<Geometry>,
    pub color: String,
    pub last_cause: Option<CauseVerdict>,
    /// Oldest first; `None` while history is off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<VecDeque<RenderEvent>>,
    /// Store-wide write sequence, tie-breaker for eviction and ordering
    #[serde(skip)]
    pub(crate) update_seq: u64,
}

impl TrackedComponentRecord {
    pub(crate) fn new(update: &RenderUpdate, seq: u64) -> Self {
        let display_name = update
            .display_name
            .clone()
            .unwrap_or_else(|| friendly_name(&update.view_type));
        Self {
            tag: update.tag,
            view_type: update.view_type.clone(),
            display_name,
            test_id: None,
            accessibility_label: None,
            owner_name: None,
            render_count: 0,
            first_seen: update.cause.timestamp,
            last_seen: update.cause.timestamp,
            geometry: None,
            color: update.color.clone(),
            last_cause: None,
            history: None,
            update_seq: seq,
        }
    }

    /// Recency key: newest has the greatest key
    pub(crate) fn recency(&self) -> (i64, u64) {
        (self.last_seen, self.update_seq)
    }

    /// Drop the oldest history events beyond `depth`
    pub(crate) fn truncate_history(&mut self, depth: usize) {
        if let Some(history) = self.history.as_mut() {
            while history.len() > depth {
                history.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifying_attributes() {
        let inputs = HostValue::from(json!({"testID": "login", "aria-label": "Log in"}));
        let attrs = IdentifyingAttributes::from_inputs(Some(&inputs));
        assert_eq!(attrs.test_id.as_deref(), Some("login"));
        assert_eq!(attrs.accessibility_label.as_deref(), Some("Log in"));

        let fallback = HostValue::from(json!({"nativeID": "n1", "testID": ""}));
        assert_eq!(IdentifyingAttributes::from_inputs(Some(&fallback)).test_id.as_deref(), Some("n1"));
        assert_eq!(IdentifyingAttributes::from_inputs(None), IdentifyingAttributes::default());
    }

    #[test]
    fn test_friendly_name() {
        assert_eq!(friendly_name("RCTView"), "View");
        assert_eq!(friendly_name("AndroidSwitch"), "AndroidSwitch");
    }

    #[test]
    fn test_render_event_ids_are_unique() {
        let verdict = CauseVerdict::new(crate::attribution::NativeCause::Mount, 5);
        let a = RenderEvent::new(verdict.clone(), 1);
        let b = RenderEvent::new(verdict, 1);
        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, 5);
    }
}
