//! Render tracking store
//!
//! Per-tag records with render count, last cause and a bounded history,
//! plus filtered queries, stats and subscriptions.

mod errors;
mod query;
mod record;
mod tracking;

pub use errors::{ListenerError, ListenerResult};
pub use query::{field_values, matches_search, CompiledFilters, CompiledPattern};
pub use record::{friendly_name, IdentifyingAttributes, RenderEvent, RenderUpdate, TrackedComponentRecord};
pub use tracking::{
    Listener, MostRendered, RenderTrackingStore, StoreStats, Subscription, SubscriptionKind,
    TrackingState,
};
