//! Two-level cause attribution
//!
//! Per node and cycle:
//! 1. Reconcile the node's buffers and load last cycle's snapshot
//! 2. Resolve the owning component and its (cycle-cached) component cause
//! 3. Decide the native cause, falling back to the component verdict when
//!    nothing changed locally

use std::collections::{HashMap, HashSet};

use super::cause::{CauseVerdict, ComponentCause, NativeCause};
use super::native::{local_change, shallow_changed_keys, LocalChange};
use super::owner::{resolve_owner, ResolvedOwner};
use crate::host::{HostAdapter, NodeTag};
use crate::observability::{Event, Logger};
use crate::reconcile::{BufferReconciler, Orientation, StoredSnapshot};
use crate::slots::{diff_slots, SlotChangeDescription};

/// Per-cycle inputs shared by every node of the cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleScope<'a> {
    pub cycle: u64,
    /// Tags of every node received this cycle
    pub batch: &'a HashSet<NodeTag>,
    /// Run the full attribution (slot extraction, diffs)
    pub attribute_causes: bool,
    pub timestamp: i64,
}

/// Component-level verdict for one owner in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentVerdict {
    pub cause: ComponentCause,
    pub changed_input_keys: Vec<String>,
    pub slot_changes: Option<Vec<SlotChangeDescription>>,
}

impl ComponentVerdict {
    fn of(cause: ComponentCause) -> Self {
        Self {
            cause,
            changed_input_keys: Vec::new(),
            slot_changes: None,
        }
    }
}

/// Everything learned about one node in one cycle
#[derive(Debug, Clone)]
pub struct Attribution<N> {
    pub tag: NodeTag,
    /// The buffer holding the newly committed data
    pub current: N,
    pub orientation: Orientation,
    /// Snapshot of the current buffer
    pub snapshot: StoredSnapshot,
    pub owner: Option<ResolvedOwner<N>>,
    pub verdict: CauseVerdict,
}

/// Attribution state carried across cycles
#[derive(Debug)]
pub struct AttributionEngine {
    nodes: BufferReconciler,
    owners: BufferReconciler,
    component_cycle: u64,
    component_verdicts: HashMap<NodeTag, ComponentVerdict>,
    logger: Logger,
}

impl AttributionEngine {
    pub fn new(logger: Logger) -> Self {
        Self {
            nodes: BufferReconciler::new(logger.clone()),
            owners: BufferReconciler::new(logger.clone()),
            component_cycle: 0,
            component_verdicts: HashMap::new(),
            logger,
        }
    }

    /// Whether a node tag has been attributed before
    pub fn has_seen(&self, tag: NodeTag) -> bool {
        self.nodes.contains(tag)
    }

    /// Drop every stored snapshot
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.owners.clear();
        self.component_verdicts.clear();
    }

    /// Attribute one received node
    pub fn attribute<A: HostAdapter>(
        &mut self,
        adapter: &A,
        node: &A::Node,
        scope: &CycleScope<'_>,
    ) -> Attribution<A::Node> {
        let reconciled = self.nodes.reconcile(adapter, node, scope.cycle, false);
        let owner = resolve_owner(adapter, &reconciled.current);
        let owner_name = owner.as_ref().map(|o| o.name.clone());

        // Ownerless nodes stand in for their own component
        let subject = owner
            .as_ref()
            .map(|o| o.node.clone())
            .unwrap_or_else(|| reconciled.current.clone());

        let verdict = if !scope.attribute_causes {
            // Keep the owner table current so a later full pass has a prior
            self.owners.reconcile(adapter, &subject, scope.cycle, false);
            let cause = if reconciled.is_first_observation() {
                NativeCause::Mount
            } else {
                NativeCause::Unknown
            };
            let mut verdict = CauseVerdict::new(cause, scope.timestamp);
            verdict.owner_name = owner_name;
            verdict
        } else {
            let component = self.component_verdict(adapter, &subject, scope.cycle);

            let mut verdict = match &reconciled.prior {
                None => {
                    let mut verdict = CauseVerdict::new(NativeCause::Mount, scope.timestamp);
                    verdict.component_cause = Some(ComponentCause::Mount);
                    verdict
                }
                Some(prior) => {
                    // A node seen before under an owner not yet stored did not mount
                    let component = if component.cause == ComponentCause::Mount {
                        ComponentVerdict::of(ComponentCause::InheritedFromAncestor)
                    } else {
                        component
                    };
                    let change = local_change(adapter.view_kind(&reconciled.current), prior, &reconciled.snapshot);
                    let parent_in_batch = adapter
                        .parent(&reconciled.current)
                        .is_some_and(|parent| scope.batch.contains(&adapter.tag(&parent)));
                    native_verdict(change, &component, parent_in_batch, scope.timestamp)
                }
            };
            verdict.owner_name = owner_name;
            verdict
        };

        self.logger.trace(
            Event::NodeAttributed,
            &[
                ("tag", &reconciled.tag.to_string()),
                ("native", verdict.native_cause.as_str()),
                (
                    "component",
                    verdict.component_cause.map(|c| c.as_str()).unwrap_or("-"),
                ),
                ("orientation", reconciled.orientation.as_str()),
            ],
        );

        Attribution {
            tag: reconciled.tag,
            current: reconciled.current,
            orientation: reconciled.orientation,
            snapshot: reconciled.snapshot,
            owner,
            verdict,
        }
    }

    /// Component cause for `subject`, computed once per owner per cycle
    fn component_verdict<A: HostAdapter>(
        &mut self,
        adapter: &A,
        subject: &A::Node,
        cycle: u64,
    ) -> ComponentVerdict {
        if self.component_cycle != cycle {
            self.component_cycle = cycle;
            self.component_verdicts.clear();
        }
        let tag = adapter.tag(subject);
        if let Some(verdict) = self.component_verdicts.get(&tag) {
            return verdict.clone();
        }

        let reconciled = self.owners.reconcile(adapter, subject, cycle, true);
        let verdict = match &reconciled.prior {
            None => ComponentVerdict::of(ComponentCause::Mount),
            Some(prior) => component_cause(prior, &reconciled.snapshot),
        };
        self.component_verdicts.insert(tag, verdict.clone());
        verdict
    }
}

/// Component-level decision between two owner snapshots
pub fn component_cause(prior: &StoredSnapshot, current: &StoredSnapshot) -> ComponentVerdict {
    let keys = shallow_changed_keys(prior.props.as_ref(), current.props.as_ref());
    if !keys.is_empty() {
        return ComponentVerdict {
            cause: ComponentCause::InputChange,
            changed_input_keys: keys,
            slot_changes: None,
        };
    }
    if !prior.same_state(current) {
        let slot_changes = match (&prior.slots, &current.slots) {
            (Some(a), Some(b)) => diff_slots(a, b),
            _ => None,
        };
        return ComponentVerdict {
            cause: ComponentCause::StateChange,
            changed_input_keys: Vec::new(),
            slot_changes,
        };
    }
    ComponentVerdict::of(ComponentCause::InheritedFromAncestor)
}

fn native_verdict(
    change: LocalChange,
    component: &ComponentVerdict,
    parent_in_batch: bool,
    timestamp: i64,
) -> CauseVerdict {
    let mut verdict = CauseVerdict::new(NativeCause::Unknown, timestamp);
    verdict.component_cause = Some(component.cause);
    if component.cause == ComponentCause::StateChange {
        verdict.slot_changes = component.slot_changes.clone();
    }

    match change {
        LocalChange::Inputs(changes) => {
            verdict.native_cause = NativeCause::InputChange;
            verdict.changed_input_keys = Some(changes.iter().map(|c| c.key.clone()).collect());
            verdict.input_changes = Some(changes);
        }
        LocalChange::State(diff) => {
            verdict.native_cause = if !diff.changed_slots.is_empty() && !diff.state_slot_changed {
                NativeCause::SlotChange
            } else {
                NativeCause::StateChange
            };
            if !diff.changed_slots.is_empty() {
                verdict.changed_slot_indices = Some(diff.changed_slots);
            }
            if !diff.changed_fields.is_empty() {
                verdict.changed_state_keys = Some(diff.changed_fields);
            }
        }
        LocalChange::None => {
            verdict.native_cause = if component.cause.is_concrete() || !parent_in_batch {
                NativeCause::from(component.cause)
            } else {
                NativeCause::InheritedFromAncestor
            };
            if component.cause == ComponentCause::InputChange && !component.changed_input_keys.is_empty() {
                verdict.changed_input_keys = Some(component.changed_input_keys.clone());
            }
        }
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugVerbosity;
    use crate::host::{CommittedState, HostValue, MemoryHost, NodeSpec, NodeUpdate, StateLink};
    use serde_json::json;

    fn engine() -> AttributionEngine {
        AttributionEngine::new(Logger::new(DebugVerbosity::Off))
    }

    fn run(
        engine: &mut AttributionEngine,
        host: &MemoryHost,
        cycle: u64,
        tags: &[u64],
    ) -> Vec<CauseVerdict> {
        let batch: HashSet<NodeTag> = tags.iter().map(|t| NodeTag(*t)).collect();
        let scope = CycleScope {
            cycle,
            batch: &batch,
            attribute_causes: true,
            timestamp: cycle as i64,
        };
        tags.iter()
            .map(|t| {
                let node = host.current(NodeTag(*t)).unwrap();
                engine.attribute(host, &node, &scope).verdict
            })
            .collect()
    }

    #[test]
    fn test_mount_then_input_change() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::view(42, "RCTView").props(json!({"value": 1})));
        let mut engine = engine();

        let first = run(&mut engine, &host, 1, &[42]);
        assert_eq!(first[0].native_cause, NativeCause::Mount);
        assert_eq!(first[0].component_cause, Some(ComponentCause::Mount));

        host.update(NodeTag(42), NodeUpdate::new().props(json!({"value": 2})));
        let second = run(&mut engine, &host, 2, &[42]);
        assert_eq!(second[0].native_cause, NativeCause::InputChange);
        assert_eq!(second[0].changed_input_keys, Some(vec!["value".to_string()]));
        assert_eq!(second[0].component_cause, Some(ComponentCause::InputChange));
    }

    #[test]
    fn test_owner_state_change_wins_over_inheritance() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Counter").state(CommittedState::chain([StateLink::state(5)])));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        host.mount(NodeSpec::view(3, "RCTText").child_of(2).owner(1));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[2, 3]);

        host.update(NodeTag(1), NodeUpdate::new().slot(0, 6));
        host.update(NodeTag(2), NodeUpdate::new());
        host.update(NodeTag(3), NodeUpdate::new());
        let verdicts = run(&mut engine, &host, 2, &[2, 3]);

        for verdict in &verdicts {
            assert_eq!(verdict.native_cause, NativeCause::StateChange);
            assert_eq!(verdict.component_cause, Some(ComponentCause::StateChange));
            assert_eq!(verdict.owner_name.as_deref(), Some("Counter"));
            let changes = verdict.slot_changes.as_ref().unwrap();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].index, 0);
            assert_eq!(changes[0].previous_value, "5");
            assert_eq!(changes[0].current_value, "6");
        }
    }

    #[test]
    fn test_inherited_when_parent_in_batch() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "List"));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        host.mount(NodeSpec::view(3, "RCTView").child_of(2).owner(1));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[2, 3]);

        host.update(NodeTag(2), NodeUpdate::new().props(json!({"testID": "row"})));
        host.update(NodeTag(3), NodeUpdate::new());
        let verdicts = run(&mut engine, &host, 2, &[2, 3]);
        assert_eq!(verdicts[0].native_cause, NativeCause::InputChange);
        assert_eq!(verdicts[1].native_cause, NativeCause::InheritedFromAncestor);
        assert_eq!(verdicts[1].component_cause, Some(ComponentCause::InheritedFromAncestor));
    }

    #[test]
    fn test_no_local_change_and_no_parent_uses_component_verdict() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Card"));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[2]);

        host.update(NodeTag(2), NodeUpdate::new());
        let verdicts = run(&mut engine, &host, 2, &[2]);
        assert_eq!(verdicts[0].native_cause, NativeCause::InheritedFromAncestor);
        assert_eq!(verdicts[0].component_cause, Some(ComponentCause::InheritedFromAncestor));
    }

    #[test]
    fn test_native_slot_change_on_reference_only() {
        let host = MemoryHost::new();
        let state = CommittedState::chain([StateLink::reference(HostValue::Null), StateLink::state(1)]);
        host.mount(NodeSpec::view(5, "RCTView").state(state));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[5]);

        host.update(NodeTag(5), NodeUpdate::new().slot(0, HostValue::object([("current", HostValue::from(1))])));
        let verdicts = run(&mut engine, &host, 2, &[5]);
        assert_eq!(verdicts[0].native_cause, NativeCause::SlotChange);
        assert_eq!(verdicts[0].changed_slot_indices, Some(vec![0]));
    }

    #[test]
    fn test_cheap_verdicts_when_attribution_disabled() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::view(9, "RCTView"));
        let mut engine = engine();
        let batch = HashSet::from([NodeTag(9)]);
        let scope = |cycle| CycleScope {
            cycle,
            batch: &batch,
            attribute_causes: false,
            timestamp: 0,
        };

        let node = host.current(NodeTag(9)).unwrap();
        let first = engine.attribute(&host, &node, &scope(1)).verdict;
        assert_eq!(first.native_cause, NativeCause::Mount);
        assert!(first.component_cause.is_none());

        let node = host.update(NodeTag(9), NodeUpdate::new().props(json!({"a": 1}))).unwrap();
        let second = engine.attribute(&host, &node, &scope(2)).verdict;
        assert_eq!(second.native_cause, NativeCause::Unknown);
        assert!(engine.has_seen(NodeTag(9)));
    }

    #[test]
    fn test_component_cause_exclusive_after_first_observation() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Form").props(json!({"mode": "edit"})));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[2]);

        let updates = [
            NodeUpdate::new().props(json!({"mode": "view"})),
            NodeUpdate::new().state(CommittedState::Value(HostValue::from(json!({"dirty": true})))),
            NodeUpdate::new(),
        ];
        for (offset, update) in updates.into_iter().enumerate() {
            host.update(NodeTag(1), update);
            host.update(NodeTag(2), NodeUpdate::new());
            let verdicts = run(&mut engine, &host, 2 + offset as u64, &[2]);
            let cause = verdicts[0].component_cause.unwrap();
            assert!(matches!(
                cause,
                ComponentCause::InputChange | ComponentCause::StateChange | ComponentCause::InheritedFromAncestor
            ));
        }
    }

    #[test]
    fn test_full_pass_after_cheap_pass_is_not_mount() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Panel"));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let mut engine = engine();
        let batch = HashSet::from([NodeTag(2)]);
        let cheap = CycleScope {
            cycle: 1,
            batch: &batch,
            attribute_causes: false,
            timestamp: 0,
        };
        let node = host.current(NodeTag(2)).unwrap();
        engine.attribute(&host, &node, &cheap);

        host.update(NodeTag(2), NodeUpdate::new());
        let verdicts = run(&mut engine, &host, 2, &[2]);
        assert_ne!(verdicts[0].native_cause, NativeCause::Mount);
        assert_eq!(verdicts[0].component_cause, Some(ComponentCause::InheritedFromAncestor));
    }

    #[test]
    fn test_moving_to_unseen_owner_is_not_mount() {
        let host = MemoryHost::new();
        host.mount(NodeSpec::component(1, "Left"));
        host.mount(NodeSpec::component(5, "Right"));
        host.mount(NodeSpec::view(2, "RCTView").child_of(1));
        let mut engine = engine();
        run(&mut engine, &host, 1, &[2]);

        host.mount(NodeSpec::view(2, "RCTView").child_of(5));
        let verdicts = run(&mut engine, &host, 2, &[2]);
        assert_ne!(verdicts[0].native_cause, NativeCause::Mount);
        assert_eq!(verdicts[0].component_cause, Some(ComponentCause::InheritedFromAncestor));
        assert_eq!(verdicts[0].owner_name.as_deref(), Some("Right"));
    }
}
