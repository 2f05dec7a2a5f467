//! Tree Introspection Bridge
//!
//! Subscribes to the host runtime's "nodes changed this cycle" event and
//! toggles that notification per root. Batches arrive over an unbounded
//! channel and are drained by the context, one pipeline cycle per batch.

mod errors;
mod hook;
mod tree_bridge;

pub use errors::{BridgeError, BridgeResult};
pub use hook::{CommitBatch, CommitReceiver, CommitSender, HookSubscription, IntrospectionHook, RootId};
pub use tree_bridge::TreeBridge;
