//! Committed local state as handed over by a host adapter
//!
//! Function-style components keep an ordered chain of state slots; class-style
//! components keep a single plain state value. Links are immutable and shared,
//! so an untouched slot keeps its identity across commits.

use std::sync::Arc;

use super::value::HostValue;

/// Marker for a slot that owns an update queue (a settable state slot)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateQueue {
    /// Updates pending at commit time
    pub pending: u32,
}

/// One link of a state slot chain
#[derive(Debug, Clone, Default)]
pub struct StateLink {
    /// Memoized value of the slot
    pub memoized: HostValue,
    /// Present for settable state slots
    pub queue: Option<UpdateQueue>,
    /// Next slot in declaration order
    pub next: Option<Arc<StateLink>>,
}

impl StateLink {
    /// Settable state slot
    pub fn state(value: impl Into<HostValue>) -> Self {
        Self {
            memoized: value.into(),
            queue: Some(UpdateQueue::default()),
            next: None,
        }
    }

    /// Mutable reference slot, `{current: value}`
    pub fn reference(value: impl Into<HostValue>) -> Self {
        Self::memo(HostValue::object([("current", value.into())]))
    }

    /// Memoized callback slot, `[fn, deps]`
    pub fn callback(callback: HostValue, deps: HostValue) -> Self {
        Self::memo(HostValue::array([callback, deps]))
    }

    /// Memoized derived value slot, `[value, deps]`
    pub fn derived(value: impl Into<HostValue>, deps: HostValue) -> Self {
        Self::memo(HostValue::array([value.into(), deps]))
    }

    /// Effect slot with `tag`, `create`, `destroy` fields
    pub fn effect(tag: i32) -> Self {
        Self::memo(HostValue::object([
            ("tag", HostValue::from(tag)),
            ("create", HostValue::function("create")),
            ("destroy", HostValue::Undefined),
        ]))
    }

    /// Slot with an arbitrary memoized value and no queue
    pub fn memo(memoized: HostValue) -> Self {
        Self {
            memoized,
            queue: None,
            next: None,
        }
    }

    /// Iterate this link and its successors
    pub fn iter(&self) -> StateLinkIter<'_> {
        StateLinkIter { next: Some(self) }
    }
}

/// Iterator over a slot chain
pub struct StateLinkIter<'a> {
    next: Option<&'a StateLink>,
}

impl<'a> Iterator for StateLinkIter<'a> {
    type Item = &'a StateLink;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next?;
        self.next = link.next.as_deref();
        Some(link)
    }
}

/// A node's committed state
#[derive(Debug, Clone)]
pub enum CommittedState {
    /// Ordered slot chain
    Chain(Arc<StateLink>),
    /// Plain (class-style) state value
    Value(HostValue),
}

impl CommittedState {
    /// Build a chain from links in declaration order; `None` when empty
    pub fn chain(links: impl IntoIterator<Item = StateLink>) -> Option<Self> {
        let links: Vec<StateLink> = links.into_iter().collect();
        let mut head: Option<Arc<StateLink>> = None;
        for mut link in links.into_iter().rev() {
            link.next = head;
            head = Some(Arc::new(link));
        }
        head.map(CommittedState::Chain)
    }

    /// Head of the chain, if this is a chain
    pub fn head(&self) -> Option<&StateLink> {
        match self {
            CommittedState::Chain(head) => Some(head),
            CommittedState::Value(_) => None,
        }
    }

    /// Reference identity of the committed state
    pub fn same_identity(&self, other: &CommittedState) -> bool {
        match (self, other) {
            (CommittedState::Chain(a), CommittedState::Chain(b)) => Arc::ptr_eq(a, b),
            (CommittedState::Value(a), CommittedState::Value(b)) => a.same_identity(b),
            _ => false,
        }
    }

    /// Copy of the chain with slot `index` replaced
    ///
    /// Links after `index` are shared with the original. Returns `None` for
    /// plain state or an out-of-range index.
    pub fn with_slot(&self, index: usize, memoized: HostValue) -> Option<CommittedState> {
        let head = self.head()?;
        let mut prefix: Vec<StateLink> = Vec::new();
        let mut cursor = Some(head);
        for _ in 0..index {
            let link = cursor?;
            prefix.push(StateLink {
                memoized: link.memoized.clone(),
                queue: link.queue,
                next: None,
            });
            cursor = link.next.as_deref();
        }
        let target = cursor?;
        let mut rebuilt = Arc::new(StateLink {
            memoized,
            queue: target.queue,
            next: target.next.clone(),
        });
        for mut link in prefix.into_iter().rev() {
            link.next = Some(rebuilt);
            rebuilt = Arc::new(link);
        }
        Some(CommittedState::Chain(rebuilt))
    }

    /// Identity-preserving display snapshot: slot values as an array, or the plain value
    pub fn to_value(&self) -> HostValue {
        match self {
            CommittedState::Chain(head) => HostValue::array(head.iter().map(|l| l.memoized.clone())),
            CommittedState::Value(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_preserves_order() {
        let state = CommittedState::chain([StateLink::state(1), StateLink::state(2), StateLink::state(3)]).unwrap();
        let values: Vec<_> = state.head().unwrap().iter().map(|l| l.memoized.clone()).collect();
        assert_eq!(values, vec![HostValue::from(1), HostValue::from(2), HostValue::from(3)]);
    }

    #[test]
    fn test_empty_chain_is_none() {
        assert!(CommittedState::chain(Vec::new()).is_none());
    }

    #[test]
    fn test_with_slot_shares_tail_and_keeps_untouched_identity() {
        let shared = HostValue::object([("current", HostValue::from(0))]);
        let state = CommittedState::chain([
            StateLink::state(1),
            StateLink::memo(shared.clone()),
            StateLink::state("tail"),
        ])
        .unwrap();

        let updated = state.with_slot(0, HostValue::from(9)).unwrap();
        assert!(!updated.same_identity(&state));

        let links: Vec<_> = updated.head().unwrap().iter().collect();
        assert_eq!(links[0].memoized, HostValue::from(9));
        assert!(links[0].queue.is_some());
        assert!(links[1].memoized.same_identity(&shared));

        let original_tail = state.head().unwrap().next.as_ref().unwrap().next.clone().unwrap();
        let updated_tail = updated.head().unwrap().next.as_ref().unwrap().next.clone().unwrap();
        assert!(Arc::ptr_eq(&original_tail, &updated_tail));
    }

    #[test]
    fn test_with_slot_out_of_range() {
        let state = CommittedState::chain([StateLink::state(1)]).unwrap();
        assert!(state.with_slot(3, HostValue::Null).is_none());
        assert!(CommittedState::Value(HostValue::Null).with_slot(0, HostValue::Null).is_none());
    }
}
