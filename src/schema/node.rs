//! Untyped schema tree.

use serde::Deserialize;
use serde_json::Value;

/// A node of a JSON-Schema-like document.
///
/// Objects keep their keys in document order; flattening output order follows it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum SchemaNode {
    Array(Vec<SchemaNode>),
    Object(Vec<(String, SchemaNode)>),
    Scalar(Scalar),
}

/// Leaf values. Only strings ever carry meaning for flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl SchemaNode {
    /// Look up a key on an object node. Non-objects have no keys.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The string value of a scalar string node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// String value of `key`, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Self::as_str)
    }
}

impl From<Value> for SchemaNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            // `preserve_order` keeps the map in document order
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Null => Self::Scalar(Scalar::Null),
        }
    }
}

impl From<&Value> for SchemaNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.iter().map(|(k, v)| (k.clone(), Self::from(v))).collect())
            }
            Value::String(s) => Self::Scalar(Scalar::String(s.clone())),
            Value::Number(n) => Self::Scalar(Scalar::Number(n.clone())),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Null => Self::Scalar(Scalar::Null),
        }
    }
}
