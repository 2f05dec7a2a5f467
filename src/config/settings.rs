//! Tracking settings
//!
//! Settings start at defaults, change only through explicit patches, and are
//! clamped into their documented ranges on every update.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// Default number of nodes measured per cycle
pub const DEFAULT_BATCH_SIZE: usize = 150;

/// Allowed batch sizes
pub const BATCH_SIZE_RANGE: RangeInclusive<usize> = 10..=500;

/// Default per-record history depth
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// Allowed history depths
pub const HISTORY_DEPTH_RANGE: RangeInclusive<usize> = 5..=50;

/// Hard cap on distinct tracked records
pub const MAX_TRACKED_COMPONENTS: usize = 200;

/// Debug log verbosity
///
/// Warnings and errors are written at every level; the levels only gate
/// diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugVerbosity {
    /// No diagnostic output
    #[default]
    Off,
    /// One line per cycle
    Minimal,
    /// Per-node decisions
    Verbose,
    /// Everything, including buffer orientation and slot walks
    Trace,
}

impl DebugVerbosity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DebugVerbosity::Off => "off",
            DebugVerbosity::Minimal => "minimal",
            DebugVerbosity::Verbose => "verbose",
            DebugVerbosity::Trace => "trace",
        }
    }
}

impl fmt::Display for DebugVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide tracking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Maximum nodes measured and tracked per cycle
    pub batch_size: usize,
    /// Whether render counts are incremented
    pub count_renders: bool,
    /// Whether cause attribution (and slot extraction) runs
    pub attribute_causes: bool,
    /// Whether per-record render history is kept
    pub keep_history: bool,
    /// Events retained per record
    pub history_depth: usize,
    /// Whether committed inputs are captured into history events
    pub capture_inputs: bool,
    /// Whether committed state is captured into history events
    pub capture_state: bool,
    /// Diagnostic log level
    pub debug_verbosity: DebugVerbosity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            count_renders: true,
            attribute_causes: true,
            keep_history: true,
            history_depth: DEFAULT_HISTORY_DEPTH,
            capture_inputs: false,
            capture_state: false,
            debug_verbosity: DebugVerbosity::Off,
        }
    }
}

impl Settings {
    /// Apply a partial update, clamping numeric fields into range
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(batch_size) = patch.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(count_renders) = patch.count_renders {
            self.count_renders = count_renders;
        }
        if let Some(attribute_causes) = patch.attribute_causes {
            self.attribute_causes = attribute_causes;
        }
        if let Some(keep_history) = patch.keep_history {
            self.keep_history = keep_history;
        }
        if let Some(history_depth) = patch.history_depth {
            self.history_depth = history_depth;
        }
        if let Some(capture_inputs) = patch.capture_inputs {
            self.capture_inputs = capture_inputs;
        }
        if let Some(capture_state) = patch.capture_state {
            self.capture_state = capture_state;
        }
        if let Some(debug_verbosity) = patch.debug_verbosity {
            self.debug_verbosity = debug_verbosity;
        }
        self.clamp();
    }

    /// Return a copy with a patch applied
    pub fn with(mut self, patch: &SettingsPatch) -> Self {
        self.apply(patch);
        self
    }

    pub(crate) fn clamp(&mut self) {
        self.batch_size = self
            .batch_size
            .clamp(*BATCH_SIZE_RANGE.start(), *BATCH_SIZE_RANGE.end());
        self.history_depth = self
            .history_depth
            .clamp(*HISTORY_DEPTH_RANGE.start(), *HISTORY_DEPTH_RANGE.end());
    }

    /// Decode persisted settings; missing fields take defaults
    pub fn from_json(payload: &str) -> ConfigResult<Self> {
        let mut settings: Settings = serde_json::from_str(payload)
            .map_err(|source| ConfigError::Decode { what: "settings", source })?;
        settings.clamp();
        Ok(settings)
    }

    /// Encode for persistence
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string(self).map_err(|source| ConfigError::Encode { what: "settings", source })
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_renders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_causes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_history: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_inputs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_verbosity: Option<DebugVerbosity>,
}

impl SettingsPatch {
    /// Patch that only sets the batch size
    pub fn batch_size(value: usize) -> Self {
        Self {
            batch_size: Some(value),
            ..Self::default()
        }
    }

    /// Patch that only sets the history depth
    pub fn history_depth(value: usize) -> Self {
        Self {
            history_depth: Some(value),
            ..Self::default()
        }
    }
}
