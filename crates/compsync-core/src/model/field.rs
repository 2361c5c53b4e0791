// ── Field values ──
//
// Component attributes are schema-driven: each kind declares which named
// fields it carries, and values are one of a small set of scalar shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ObjectId;

/// Ordered field name -> value mapping. `BTreeMap` keeps diffs and
/// serialized output deterministic.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Interpret the value as a foreign key. Negative numbers and
    /// non-numeric text are not ids.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Int(n) => u64::try_from(*n).ok().map(ObjectId::new),
            Self::Text(s) => s.parse().ok(),
            Self::Null | Self::Bool(_) => None,
        }
    }

    /// Render as text; `Null` becomes the empty string.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<ObjectId> for FieldValue {
    fn from(id: ObjectId) -> Self {
        i64::try_from(id.get()).map_or_else(|_| Self::Text(id.to_string()), Self::Int)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

// ── FieldSource ─────────────────────────────────────────────────────

/// Read access to a component or template instance.
///
/// The record factory and the apply engine only ever see instances
/// through this interface, so any host representation can be compared
/// as long as it can enumerate and read its fields.
pub trait FieldSource {
    fn id(&self) -> ObjectId;

    fn field_names(&self) -> Vec<&str>;

    /// `None` means the field does not exist on this instance, which is
    /// different from a field holding `FieldValue::Null`.
    fn field_value(&self, name: &str) -> Option<FieldValue>;
}
