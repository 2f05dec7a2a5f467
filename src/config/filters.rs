//! Query-time filter configuration
//!
//! Filters never change what is tracked, only what a query surfaces.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// Identifying field a pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    /// Host view type label
    ViewType,
    /// Friendly display name
    DisplayName,
    /// Test identifier attribute
    TestId,
    /// Accessible label attribute
    AccessibilityLabel,
    /// Owning component name
    OwnerName,
    /// Any identifying field
    Any,
}

impl FilterField {
    /// Every concrete field (excludes `Any`)
    pub const CONCRETE: [FilterField; 5] = [
        FilterField::ViewType,
        FilterField::DisplayName,
        FilterField::TestId,
        FilterField::AccessibilityLabel,
        FilterField::OwnerName,
    ];

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::ViewType => "viewType",
            FilterField::DisplayName => "displayName",
            FilterField::TestId => "testId",
            FilterField::AccessibilityLabel => "accessibilityLabel",
            FilterField::OwnerName => "ownerName",
            FilterField::Any => "any",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `(field, pattern)` pair
///
/// Patterns are case-insensitive substrings; a pattern written as `/expr/`
/// is a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilterPattern {
    pub field: FilterField,
    pub pattern: String,
}

impl FilterPattern {
    pub fn new(field: FilterField, pattern: impl Into<String>) -> Self {
        Self {
            field,
            pattern: pattern.into(),
        }
    }
}

/// Include and exclude pattern sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// If non-empty, a record must match at least one
    pub include: BTreeSet<FilterPattern>,
    /// A record matching any is hidden
    pub exclude: BTreeSet<FilterPattern>,
}

impl FilterConfig {
    /// Empty configuration: everything is visible
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern
    pub fn include(mut self, field: FilterField, pattern: impl Into<String>) -> Self {
        self.include.insert(FilterPattern::new(field, pattern));
        self
    }

    /// Add an exclude pattern
    pub fn exclude(mut self, field: FilterField, pattern: impl Into<String>) -> Self {
        self.exclude.insert(FilterPattern::new(field, pattern));
        self
    }

    /// True when no pattern of either kind is configured
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Decode a persisted configuration (sets are stored as arrays)
    pub fn from_json(payload: &str) -> ConfigResult<Self> {
        serde_json::from_str(payload).map_err(|source| ConfigError::Decode { what: "filters", source })
    }

    /// Encode for persistence
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string(self).map_err(|source| ConfigError::Encode { what: "filters", source })
    }
}
