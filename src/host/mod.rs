//! Host runtime adapter layer
//!
//! - `HostValue` / `CommittedState`: adapter-neutral shapes for committed
//!   inputs and state
//! - `HostAdapter`: the only interface attribution uses to read a host tree
//! - `MemoryHost`: a double-buffered in-memory host implementing the adapter,
//!   the introspection hook and geometry measurement

mod adapter;
mod memory;
mod state;
mod value;

pub use adapter::{BufferKey, HostAdapter, NodeTag, ViewKind};
pub use memory::{MemoryHost, MemoryNode, NodeSpec, NodeUpdate};
pub use state::{CommittedState, StateLink, StateLinkIter, UpdateQueue};
pub use value::{FunctionValue, HostValue, MAX_DEEP_EQUAL_DEPTH};
