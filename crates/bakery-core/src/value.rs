//! Engine-independent field values.
//!
//! Host structs expose scalar fields of a handful of primitive types. Choice
//! (enum) fields carry their identifier as a string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value read from, or written to, a host struct field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// An unset pointer or an explicitly empty value.
    Null,
    /// Boolean field.
    Bool(bool),
    /// Integer field.
    Int(i64),
    /// Float field.
    Float(f64),
    /// String or choice field.
    Str(String),
    /// Fixed-length float array (colors, vectors).
    Array(Vec<f64>),
}

impl Value {
    /// Returns a short name for the value's type, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true if the value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Array(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Array(v)
    }
}

/// A snapshot entry: either a captured value or the unassigned marker.
///
/// `Unassigned` is a separate variant so it can never be confused with a
/// legitimate `Null`, empty string, or `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Slot {
    /// The field is tracked but intentionally has no value yet.
    Unassigned,
    /// The field holds a value to apply.
    Assigned(Value),
}

impl Slot {
    /// Returns the assigned value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Slot::Unassigned => None,
            Slot::Assigned(v) => Some(v),
        }
    }

    /// Returns true if this slot is the unassigned marker.
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Slot::Unassigned)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Unassigned => write!(f, "<unassigned>"),
            Slot::Assigned(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_differs_from_falsey_values() {
        let marker = Slot::Unassigned;
        assert_ne!(marker, Slot::Assigned(Value::Null));
        assert_ne!(marker, Slot::Assigned(Value::Str(String::new())));
        assert_ne!(marker, Slot::Assigned(Value::Bool(false)));
        assert_ne!(marker, Slot::Assigned(Value::Int(0)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("CYCLES").to_string(), "'CYCLES'");
        assert_eq!(Value::Null.to_string(), "None");
        assert_eq!(Value::from(vec![1.0, 0.5]).to_string(), "(1, 0.5)");
    }

    #[test]
    fn test_slot_serializes_with_state_tag() {
        let json = serde_json::to_string(&Slot::Unassigned).unwrap();
        assert_eq!(json, r#"{"state":"unassigned"}"#);

        let json = serde_json::to_string(&Slot::Assigned(Value::Int(64))).unwrap();
        assert_eq!(json, r#"{"state":"assigned","value":64}"#);
    }
}
