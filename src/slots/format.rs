//! Bounded value rendering for logs, diffs and storage

use crate::host::HostValue;

/// Strings longer than this are truncated with an ellipsis
pub const MAX_STRING_PREVIEW: usize = 30;

/// Render a value as a short, size-bounded description
///
/// Scalars render literally (strings quoted and truncated); arrays, objects
/// and functions render as a type and size summary, never their contents.
pub fn format_value(value: &HostValue) -> String {
    match value {
        HostValue::Undefined => "undefined".to_string(),
        HostValue::Null => "null".to_string(),
        HostValue::Bool(b) => b.to_string(),
        HostValue::Number(n) => format_number(*n),
        HostValue::String(s) => {
            if s.chars().count() > MAX_STRING_PREVIEW {
                let head: String = s.chars().take(MAX_STRING_PREVIEW).collect();
                format!("\"{}…\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        HostValue::Array(items) => format!("Array({})", items.len()),
        HostValue::Object(map) => match map.len() {
            1 => "Object(1 key)".to_string(),
            n => format!("Object({} keys)", n),
        },
        HostValue::Function(f) => match &f.name {
            Some(name) if !name.is_empty() => format!("fn {}", name),
            _ => "fn anonymous".to_string(),
        },
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
