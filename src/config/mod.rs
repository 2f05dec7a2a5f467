//! Process-wide settings and query-time filter configuration
//!
//! Both shapes are serde round-trippable so an external key-value store can
//! persist them; this crate only consumes the deserialized values.

mod errors;
mod filters;
mod settings;

pub use errors::{ConfigError, ConfigResult};
pub use filters::{FilterConfig, FilterField, FilterPattern};
pub use settings::{
    DebugVerbosity, Settings, SettingsPatch, BATCH_SIZE_RANGE, DEFAULT_BATCH_SIZE,
    DEFAULT_HISTORY_DEPTH, HISTORY_DEPTH_RANGE, MAX_TRACKED_COMPONENTS,
};
