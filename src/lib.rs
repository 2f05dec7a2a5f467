//! rendercause - explains why a UI tree node was recomputed on a given cycle
//!
//! The crate receives "nodes changed this cycle" notifications from a host
//! runtime, works out which of each node's two buffers is the committed one,
//! diffs inputs and ordered state slots, and records a two-level cause verdict
//! (concrete node + owning component) into a bounded, queryable store.
//!
//! Subsystems, leaves first:
//! - `host`: adapter trait and value model for host runtime internals
//! - `bridge`: subscription to the host's commit notifications
//! - `reconcile`: double-buffer orientation
//! - `slots`: state slot extraction and diffing
//! - `attribution`: native and component cause verdicts
//! - `pipeline`: per-cycle orchestration and phase timing
//! - `store`: tracked records, history, filtering, subscriptions
//! - `context`: the explicit instance that ties them together

pub mod attribution;
pub mod bridge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod context;
pub mod host;
pub mod observability;
pub mod pipeline;
pub mod reconcile;
pub mod slots;
pub mod store;

pub use attribution::{CauseVerdict, ComponentCause, NativeCause};
pub use config::{DebugVerbosity, FilterConfig, FilterField, FilterPattern, Settings, SettingsPatch};
pub use context::{ContextBuilder, RenderCauseContext};
pub use host::{HostAdapter, HostValue, NodeTag};
pub use store::{RenderTrackingStore, TrackedComponentRecord};
