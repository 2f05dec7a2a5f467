//! Cause attribution
//!
//! Produces a two-level verdict for every received node:
//! - native cause: what changed on the concrete visual node
//! - component cause: why its owning component recomputed
//!
//! Attribution is heuristic. Shapes the host adapter cannot classify degrade
//! to `Unknown`; nothing here returns an error.

mod cause;
mod engine;
mod native;
mod owner;

pub use cause::{CauseVerdict, ComponentCause, InputChangeKind, InputKeyChange, NativeCause};
pub use engine::{component_cause, Attribution, AttributionEngine, ComponentVerdict, CycleScope};
pub use native::{changed_inputs, local_change, shallow_changed_keys, LocalChange, WHOLE_INPUTS_KEY};
pub use owner::{is_internal_name, resolve_owner, ResolvedOwner, MAX_OWNER_DEPTH};
