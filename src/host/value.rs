//! Adapter-neutral values for committed inputs and state
//!
//! Shared variants (arrays, objects, functions) live behind `Arc`, so two
//! values can be compared either by identity (`same_identity`) or by
//! structure (`==`). Attribution relies on the distinction: a new object
//! that is structurally equal to the old one is a reference-only change.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Recursion bound for structural equality; deeper values compare unequal
pub const MAX_DEEP_EQUAL_DEPTH: usize = 32;

/// A callable value. Identity is the `Arc` it lives in.
#[derive(Debug, Default)]
pub struct FunctionValue {
    pub name: Option<String>,
}

/// A host value
#[derive(Debug, Clone, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Array(Arc<Vec<HostValue>>),
    Object(Arc<BTreeMap<String, HostValue>>),
    Function(Arc<FunctionValue>),
}

impl HostValue {
    /// New string value
    pub fn string(s: impl AsRef<str>) -> Self {
        HostValue::String(Arc::from(s.as_ref()))
    }

    /// New array value
    pub fn array(items: impl IntoIterator<Item = HostValue>) -> Self {
        HostValue::Array(Arc::new(items.into_iter().collect()))
    }

    /// New object value
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, HostValue)>) -> Self {
        HostValue::Object(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// New function value with a fresh identity
    pub fn function(name: impl Into<String>) -> Self {
        HostValue::Function(Arc::new(FunctionValue {
            name: Some(name.into()),
        }))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, HostValue::Function(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// Arrays and objects
    pub fn is_composite(&self) -> bool {
        matches!(self, HostValue::Array(_) | HostValue::Object(_))
    }

    /// Scalars (no shared identity)
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            HostValue::Undefined
                | HostValue::Null
                | HostValue::Bool(_)
                | HostValue::Number(_)
                | HostValue::String(_)
        )
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, HostValue>> {
        match self {
            HostValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field of an object value
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Field of an object value, `Undefined` when absent
    pub fn field(&self, key: &str) -> HostValue {
        self.get(key).cloned().unwrap_or_default()
    }

    /// Reference identity for shared variants, value identity for scalars
    ///
    /// Strings compare by content, and `NaN` is identical to itself.
    pub fn same_identity(&self, other: &HostValue) -> bool {
        match (self, other) {
            (HostValue::Undefined, HostValue::Undefined) => true,
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => Arc::ptr_eq(a, b),
            (HostValue::Object(a), HostValue::Object(b)) => Arc::ptr_eq(a, b),
            (HostValue::Function(a), HostValue::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn deep_equal(&self, other: &HostValue, depth: usize) -> bool {
        if self.same_identity(other) {
            return true;
        }
        if depth >= MAX_DEEP_EQUAL_DEPTH {
            return false;
        }
        match (self, other) {
            (HostValue::Array(a), HostValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_equal(y, depth + 1))
            }
            (HostValue::Object(a), HostValue::Object(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                        ka == kb && va.deep_equal(vb, depth + 1)
                    })
            }
            _ => false,
        }
    }

    /// Convert to JSON; functions render as `{"$fn": name}`
    pub fn to_json(&self) -> Value {
        match self {
            HostValue::Undefined | HostValue::Null => Value::Null,
            HostValue::Bool(b) => Value::Bool(*b),
            HostValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            HostValue::String(s) => Value::String(s.to_string()),
            HostValue::Array(items) => Value::Array(items.iter().map(HostValue::to_json).collect()),
            HostValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            HostValue::Function(f) => {
                let mut map = Map::new();
                map.insert(
                    "$fn".to_string(),
                    Value::String(f.name.clone().unwrap_or_else(|| "anonymous".to_string())),
                );
                Value::Object(map)
            }
        }
    }
}

/// Structural equality; functions compare by identity
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other, 0)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Number(value as f64)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Number(value as f64)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::string(value)
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::String(Arc::from(value))
    }
}

/// JSON conversion; `{"$fn": "name"}` becomes a function value
impl From<&Value> for HostValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => HostValue::Null,
            Value::Bool(b) => HostValue::Bool(*b),
            Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => HostValue::string(s),
            Value::Array(items) => HostValue::array(items.iter().map(HostValue::from)),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(name)) = map.get("$fn") {
                        return HostValue::function(name.clone());
                    }
                }
                HostValue::object(map.iter().map(|(k, v)| (k.clone(), HostValue::from(v))))
            }
        }
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        HostValue::from(&value)
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::slots::format_value(self))
    }
}
