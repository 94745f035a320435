//! Attribute values and query result rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single attribute value, as stored on a record instance or bound as a
/// query parameter.
///
/// `Document` holds a structured value that serializes to its canonical
/// JSON text form for storage (see the record lifecycle's mutate/demutate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL / unset.
    Null,
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Text.
    Text(String),
    /// Structured document, stored as JSON text.
    Document(serde_json::Value),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the document payload, if this is a `Document`.
    #[must_use]
    pub fn as_document(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(doc: serde_json::Value) -> Self {
        Self::Document(doc)
    }
}

/// A result row: column name to value.
pub type Row = HashMap<String, Value>;

/// A record's attribute store: field name to raw value.
pub type Attributes = HashMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::text("hey").as_text(), Some("hey"));
        assert_eq!(Value::text("hey").as_int(), None);
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from("yo"), Value::Text("yo".to_string()));
        assert_eq!(Value::from(true), Value::Bool(true));
    }
}
