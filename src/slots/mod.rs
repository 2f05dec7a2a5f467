//! State Slot Extractor & Differ
//!
//! Walks a node's ordered state slot chain, classifies each slot by its
//! shape, and diffs two extractions index by index. Values are only ever
//! rendered through `format_value`, which bounds output size regardless of
//! application data size.

mod diff;
mod extract;
mod format;

pub use diff::{diff_slots, structural_changes, SlotChangeDescription, StructuralDiff};
pub use extract::{classify_link, extract_slots, first_state_value, SlotKind, StateSlotSnapshot, MAX_SLOT_DEPTH};
pub use format::{format_value, MAX_STRING_PREVIEW};
