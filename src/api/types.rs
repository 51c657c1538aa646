use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Set of strings stored under a single key.
pub type StringSet = BTreeSet<String>;

/// Typed value held by a namespace entry.
///
/// `Null` is write-only: it asks the endpoint to remove a key (or, at
/// namespace scope, to clear the namespace). Stores never hand it back.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    StringSet(StringSet),
    Int(i32),
    Long(i64),
    Float(f32),
    Boolean(bool),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::String(_) => TypeTag::String,
            Value::StringSet(_) => TypeTag::StringSet,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Boolean(_) => TypeTag::Boolean,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string_set(&self) -> Option<&StringSet> {
        match self {
            Value::StringSet(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_string_set(self) -> Option<StringSet> {
        match self {
            Value::StringSet(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<StringSet> for Value {
    fn from(value: StringSet) -> Self {
        Value::StringSet(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// Discriminant carried by every [`WireRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TypeTag {
    Null = 0,
    String = 1,
    StringSet = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Boolean = 6,
}

impl TypeTag {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> StoreResult<Self> {
        match code {
            0 => Ok(TypeTag::Null),
            1 => Ok(TypeTag::String),
            2 => Ok(TypeTag::StringSet),
            3 => Ok(TypeTag::Int),
            4 => Ok(TypeTag::Long),
            5 => Ok(TypeTag::Float),
            6 => Ok(TypeTag::Boolean),
            other => Err(StoreError::invalid_value(format!(
                "unknown type code {other}"
            ))),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::String => "string",
            TypeTag::StringSet => "string set",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl From<TypeTag> for u8 {
    fn from(tag: TypeTag) -> Self {
        tag.code()
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = StoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TypeTag::from_code(code)
    }
}

/// Primitive wire form of a value.
///
/// Strings carry both `String` and serialized `StringSet` values, booleans
/// travel as `Int(0 | 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Null,
    Text(String),
    Int(i32),
    Long(i64),
    Float(f32),
}

impl WireValue {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Text(_) => "text",
            WireValue::Int(_) => "int",
            WireValue::Long(_) => "long",
            WireValue::Float(_) => "float",
        }
    }
}

/// Unit exchanged on the wire for reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRow {
    /// Entry key. Optional in write payloads when the address carries it,
    /// and absent from read results when the key column was not requested.
    pub key: Option<String>,
    pub tag: TypeTag,
    pub value: WireValue,
}

impl WireRow {
    pub fn new(key: impl Into<String>, tag: TypeTag, value: WireValue) -> Self {
        Self {
            key: Some(key.into()),
            tag,
            value,
        }
    }

    /// Row without a key; the address supplies it (or the row targets the
    /// whole namespace).
    pub fn unkeyed(tag: TypeTag, value: WireValue) -> Self {
        Self {
            key: None,
            tag,
            value,
        }
    }

    /// Removal of a single key.
    pub fn removal(key: impl Into<String>) -> Self {
        Self::new(key, TypeTag::Null, WireValue::Null)
    }

    /// Namespace-wide clear.
    pub fn clear() -> Self {
        Self::unkeyed(TypeTag::Null, WireValue::Null)
    }

    /// Key with empty strings folded into `None`.
    pub fn effective_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.is_empty())
    }
}

/// Column projection for reads. The type column is always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub key: bool,
    pub value: bool,
}

impl Columns {
    pub const fn all() -> Self {
        Self {
            key: true,
            value: true,
        }
    }

    pub const fn type_only() -> Self {
        Self {
            key: false,
            value: false,
        }
    }

    pub const fn type_and_value() -> Self {
        Self {
            key: false,
            value: true,
        }
    }
}

impl Default for Columns {
    fn default() -> Self {
        Self::all()
    }
}

/// Notification that a key, or a whole namespace (`key == None`), changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub namespace: String,
    pub key: Option<String>,
}

impl ChangeEvent {
    pub fn key(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: Some(key.into()),
        }
    }

    pub fn cleared(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: None,
        }
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_set_accessor_only_matches_sets() {
        let set: StringSet = ["b", "a"].into_iter().map(String::from).collect();
        let value = Value::from(set.clone());
        assert_eq!(value.as_string_set(), Some(&set));
        assert_eq!(value.type_tag(), TypeTag::StringSet);

        assert_eq!(Value::from("a;b").as_string_set(), None);
        assert_eq!(Value::Null.as_string_set(), None);
    }

    #[test]
    fn type_tags_use_stable_codes() {
        let expected = [
            (TypeTag::Null, 0),
            (TypeTag::String, 1),
            (TypeTag::StringSet, 2),
            (TypeTag::Int, 3),
            (TypeTag::Long, 4),
            (TypeTag::Float, 5),
            (TypeTag::Boolean, 6),
        ];
        for (tag, code) in expected {
            assert_eq!(tag.code(), code);
            assert_eq!(TypeTag::from_code(code).unwrap(), tag);
        }
        assert!(matches!(
            TypeTag::from_code(7),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn value_reports_its_tag() {
        assert_eq!(Value::from("x").type_tag(), TypeTag::String);
        assert_eq!(Value::from(1i32).type_tag(), TypeTag::Int);
        assert_eq!(Value::from(1i64).type_tag(), TypeTag::Long);
        assert_eq!(Value::from(true).type_tag(), TypeTag::Boolean);
        assert_eq!(Value::Null.type_tag(), TypeTag::Null);
    }

    #[test]
    fn empty_row_key_is_treated_as_absent() {
        let row = WireRow::new("", TypeTag::Null, WireValue::Null);
        assert_eq!(row.effective_key(), None);
        assert_eq!(WireRow::removal("k").effective_key(), Some("k"));
    }
}
