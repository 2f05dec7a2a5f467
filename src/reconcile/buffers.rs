//! Double-buffer orientation
//!
//! The host flips which of a node's two buffers is current on every commit,
//! and the reference delivered with a notification may point at either. The
//! reconciler compares both buffers against what it stored for the node's
//! tag last cycle and decides which one holds the new data.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::host::{BufferKey, CommittedState, HostAdapter, HostValue, NodeTag};
use crate::observability::{Event, Logger};
use crate::slots::{first_state_value, StateSlotSnapshot};

/// Default bound on remembered tags
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 2_000;

/// Salient fields of a resolved current buffer, kept for the next cycle
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub buffer_key: BufferKey,
    pub props: Option<HostValue>,
    pub state: Option<CommittedState>,
    /// Extracted slots, only when the caller asked for them
    pub slots: Option<Vec<StateSlotSnapshot>>,
    /// First settable state slot value at record time
    pub comparable: Option<HostValue>,
}

impl StoredSnapshot {
    /// Capture a buffer
    pub fn capture<A: HostAdapter>(adapter: &A, node: &A::Node, with_slots: bool) -> Self {
        let state = adapter.state(node);
        let comparable = state.as_ref().and_then(first_state_value);
        let slots = if with_slots {
            adapter.extract_slots(node)
        } else {
            None
        };
        Self {
            buffer_key: adapter.buffer_key(node),
            props: adapter.props(node),
            state,
            slots,
            comparable,
        }
    }

    /// Same committed inputs by reference
    pub fn same_props(&self, other: &StoredSnapshot) -> bool {
        match (&self.props, &other.props) {
            (Some(a), Some(b)) => a.same_identity(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Same committed state by reference
    pub fn same_state(&self, other: &StoredSnapshot) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => a.same_identity(b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// How the received reference was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Nothing stored for the tag yet
    FirstObservation,
    /// The received buffer is current
    AsReceived,
    /// The received buffer was stale; its alternate is current
    Swapped,
    /// No comparable value on either buffer; received buffer trusted
    Unverified,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::FirstObservation => "first",
            Orientation::AsReceived => "as_received",
            Orientation::Swapped => "swapped",
            Orientation::Unverified => "unverified",
        }
    }

    pub fn is_swapped(&self) -> bool {
        matches!(self, Orientation::Swapped)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one reconciliation
#[derive(Debug, Clone)]
pub struct Reconciled<N> {
    pub tag: NodeTag,
    /// Buffer holding the newly committed data
    pub current: N,
    /// The paired buffer, if any
    pub alternate: Option<N>,
    pub orientation: Orientation,
    /// Snapshot of `current`, as persisted for next cycle
    pub snapshot: StoredSnapshot,
    /// Snapshot persisted by the previous cycle that saw this tag
    pub prior: Option<StoredSnapshot>,
}

impl<N> Reconciled<N> {
    pub fn is_first_observation(&self) -> bool {
        self.prior.is_none()
    }
}

#[derive(Debug)]
struct Entry {
    cycle: u64,
    orientation: Orientation,
    current: StoredSnapshot,
    prior: Option<StoredSnapshot>,
}

/// Decide which buffer is current, without touching any store
///
/// `stored` is what the previous cycle persisted for the node's tag. The
/// heuristic compares one representative value from each buffer against it:
/// when the received buffer still matches the stored value and its
/// alternate does not, the received buffer is stale.
pub fn resolve<A: HostAdapter>(adapter: &A, node: &A::Node, stored: Option<&StoredSnapshot>) -> Orientation {
    let Some(stored) = stored else {
        return Orientation::FirstObservation;
    };
    let Some(alternate) = adapter.alternate(node) else {
        return Orientation::AsReceived;
    };

    let by_state = stored.comparable.as_ref().and_then(|value| {
        let received = adapter.state(node).as_ref().and_then(first_state_value);
        let paired = adapter.state(&alternate).as_ref().and_then(first_state_value);
        (received.is_some() || paired.is_some()).then(|| (received, paired, value.clone()))
    });
    // Without a state slot on either buffer, committed inputs decide
    let (received, paired, reference) = match by_state {
        Some(compared) => compared,
        None => {
            let Some(reference) = stored.props.clone() else {
                return Orientation::Unverified;
            };
            (adapter.props(node), adapter.props(&alternate), reference)
        }
    };
    if received.is_none() && paired.is_none() {
        return Orientation::Unverified;
    }

    let matches = |value: &Option<HostValue>| value.as_ref().is_some_and(|v| v.same_identity(&reference));
    if matches(&received) && !matches(&paired) {
        Orientation::Swapped
    } else {
        Orientation::AsReceived
    }
}

/// Per-tag snapshot table plus the orientation heuristic
#[derive(Debug)]
pub struct BufferReconciler {
    entries: LruCache<NodeTag, Entry>,
    logger: Logger,
}

impl BufferReconciler {
    /// Reconciler remembering up to `DEFAULT_SNAPSHOT_CAPACITY` tags
    pub fn new(logger: Logger) -> Self {
        Self::with_capacity(DEFAULT_SNAPSHOT_CAPACITY, logger)
    }

    pub fn with_capacity(capacity: usize, logger: Logger) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            logger,
        }
    }

    /// Resolve orientation for `node`, persist its current snapshot and
    /// return the one stored by the previous cycle
    ///
    /// Reconciling the same tag again within `cycle` reuses the first
    /// decision and the same prior snapshot.
    pub fn reconcile<A: HostAdapter>(
        &mut self,
        adapter: &A,
        node: &A::Node,
        cycle: u64,
        with_slots: bool,
    ) -> Reconciled<A::Node> {
        let tag = adapter.tag(node);

        if let Some(entry) = self.entries.get(&tag) {
            if entry.cycle == cycle {
                let (current, alternate) = if adapter.buffer_key(node) == entry.current.buffer_key {
                    (node.clone(), adapter.alternate(node))
                } else {
                    match adapter.alternate(node) {
                        Some(other) => (other, Some(node.clone())),
                        None => (node.clone(), None),
                    }
                };
                return Reconciled {
                    tag,
                    current,
                    alternate,
                    orientation: entry.orientation,
                    snapshot: entry.current.clone(),
                    prior: entry.prior.clone(),
                };
            }
        }

        let prior = self.entries.pop(&tag).map(|entry| entry.current);
        let orientation = resolve(adapter, node, prior.as_ref());
        let (current, alternate) = match (orientation, adapter.alternate(node)) {
            (Orientation::Swapped, Some(other)) => (other, Some(node.clone())),
            (_, other) => (node.clone(), other),
        };

        match orientation {
            Orientation::Swapped => self.logger.trace(Event::BufferSwapped, &[("tag", &tag.to_string())]),
            Orientation::Unverified => self.logger.trace(Event::BufferUnverified, &[("tag", &tag.to_string())]),
            _ => {}
        }

        let snapshot = StoredSnapshot::capture(adapter, &current, with_slots);
        self.entries.put(
            tag,
            Entry {
                cycle,
                orientation,
                current: snapshot.clone(),
                prior: prior.clone(),
            },
        );

        Reconciled {
            tag,
            current,
            alternate,
            orientation,
            snapshot,
            prior,
        }
    }

    /// Snapshot stored for a tag, without touching recency
    pub fn stored(&self, tag: NodeTag) -> Option<&StoredSnapshot> {
        self.entries.peek(&tag).map(|entry| &entry.current)
    }

    /// Whether a tag has been seen
    pub fn contains(&self, tag: NodeTag) -> bool {
        self.entries.contains(&tag)
    }

    pub fn forget(&mut self, tag: NodeTag) {
        self.entries.pop(&tag);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
