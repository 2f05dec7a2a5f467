//! Snapshot buffer reconciliation
//!
//! Decides which of a node's two alternating buffers holds the newly
//! committed data, and keeps one salient snapshot per stable tag for the next
//! cycle's comparison. Keyed on the tag, never on buffer references.
//!
//! The heuristic is best effort: a comparable value that returns to its
//! previous value between two cycles can produce a false swap.

mod buffers;

pub use buffers::{
    resolve, BufferReconciler, Orientation, Reconciled, StoredSnapshot, DEFAULT_SNAPSHOT_CAPACITY,
};
