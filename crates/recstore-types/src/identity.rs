use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Identity of a record within its resource type.
///
/// A `RecordId` is the value found at the resource's identity field. Only
/// strings and integers qualify; the JSON value is converted once at
/// injection time so tables can key on a hashable, totally ordered type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Convert a JSON identity value.
    ///
    /// Unsigned integers above `i64::MAX`, floats, booleans, `null`,
    /// arrays and objects are rejected.
    pub fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Ok(Self::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| TypeError::InvalidIdentity(n.to_string())),
            other => Err(TypeError::InvalidIdentity(other.to_string())),
        }
    }

    /// The JSON form written back into relation fields.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Returns `true` if `value` is the JSON form of this identity.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (Self::Text(s), Value::String(v)) => s == v,
            _ => false,
        }
    }
}

impl TryFrom<&Value> for RecordId {
    type Error = TypeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "RecordId({i})"),
            Self::Text(s) => write!(f, "RecordId({s:?})"),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
