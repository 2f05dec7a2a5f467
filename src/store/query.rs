//! Query-time filtering
//!
//! Order: free-text search, then include patterns (keep on any match), then
//! exclude patterns (drop on any match). Patterns written as `/expr/` are
//! regular expressions; everything else is a case-insensitive substring.

use regex::{Regex, RegexBuilder};

use super::record::TrackedComponentRecord;
use crate::config::{FilterConfig, FilterField, FilterPattern};

enum Matcher {
    Regex(Regex),
    Substring(String),
}

impl Matcher {
    fn compile(pattern: &str) -> Self {
        let delimited = pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/');
        if delimited {
            let body = &pattern[1..pattern.len() - 1];
            match RegexBuilder::new(body).case_insensitive(true).build() {
                Ok(regex) => Matcher::Regex(regex),
                // Invalid expressions degrade to a plain substring match
                Err(_) => Matcher::Substring(body.to_lowercase()),
            }
        } else {
            Matcher::Substring(pattern.to_lowercase())
        }
    }

    fn is_match(&self, value: &str) -> bool {
        match self {
            Matcher::Regex(regex) => regex.is_match(value),
            Matcher::Substring(needle) => value.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// A pattern compiled once per query
pub struct CompiledPattern {
    field: FilterField,
    matcher: Matcher,
}

impl CompiledPattern {
    pub fn new(pattern: &FilterPattern) -> Self {
        Self {
            field: pattern.field,
            matcher: Matcher::compile(&pattern.pattern),
        }
    }

    pub fn matches(&self, record: &TrackedComponentRecord) -> bool {
        field_values(record, self.field)
            .into_iter()
            .any(|value| self.matcher.is_match(value))
    }
}

/// Values of one identifying field; `Any` yields all of them
pub fn field_values(record: &TrackedComponentRecord, field: FilterField) -> Vec<&str> {
    match field {
        FilterField::ViewType => vec![record.view_type.as_str()],
        FilterField::DisplayName => vec![record.display_name.as_str()],
        FilterField::TestId => record.test_id.as_deref().into_iter().collect(),
        FilterField::AccessibilityLabel => record.accessibility_label.as_deref().into_iter().collect(),
        FilterField::OwnerName => record.owner_name.as_deref().into_iter().collect(),
        FilterField::Any => FilterField::CONCRETE
            .iter()
            .flat_map(|f| field_values(record, *f))
            .collect(),
    }
}

/// Case-insensitive search over identifying fields and the tag
pub fn matches_search(record: &TrackedComponentRecord, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record.tag.to_string().contains(&needle)
        || field_values(record, FilterField::Any)
            .into_iter()
            .any(|value| value.to_lowercase().contains(&needle))
}

/// Compiled include/exclude sets
pub struct CompiledFilters {
    include: Vec<CompiledPattern>,
    exclude: Vec<CompiledPattern>,
}

impl CompiledFilters {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            include: config.include.iter().map(CompiledPattern::new).collect(),
            exclude: config.exclude.iter().map(CompiledPattern::new).collect(),
        }
    }

    pub fn is_visible(&self, record: &TrackedComponentRecord) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(record));
        included && !self.exclude.iter().any(|p| p.matches(record))
    }
}
