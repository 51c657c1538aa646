//! Conversions between [`Value`] and its wire representation.
//!
//! String sets are flattened into a single string: every element has `\`
//! and `;` escaped with a backslash and is followed by an unescaped `;`.
//! The empty set encodes as the empty string.

use crate::error::{StoreError, StoreResult};
use crate::types::{StringSet, TypeTag, Value, WireValue};

const ESCAPE: char = '\\';
const TERMINATOR: char = ';';

/// Splits a value into its type tag and wire form.
pub fn encode(value: &Value) -> (TypeTag, WireValue) {
    let raw = match value {
        Value::Null => WireValue::Null,
        Value::String(text) => WireValue::Text(text.clone()),
        Value::StringSet(set) => WireValue::Text(serialize_string_set(set)),
        Value::Int(value) => WireValue::Int(*value),
        Value::Long(value) => WireValue::Long(*value),
        Value::Float(value) => WireValue::Float(*value),
        Value::Boolean(value) => WireValue::Int(i32::from(*value)),
    };
    (value.type_tag(), raw)
}

/// Rebuilds a value from its declared tag and wire form.
///
/// The wire form must natively satisfy the tag; nothing is coerced except
/// booleans, which accept any integer (non-zero is `true`).
pub fn decode(tag: TypeTag, raw: WireValue) -> StoreResult<Value> {
    match (tag, raw) {
        (TypeTag::Null, WireValue::Null) => Ok(Value::Null),
        (TypeTag::String, WireValue::Text(text)) => Ok(Value::String(text)),
        (TypeTag::StringSet, WireValue::Text(text)) => {
            deserialize_string_set(&text).map(Value::StringSet)
        }
        (TypeTag::Int, WireValue::Int(value)) => Ok(Value::Int(value)),
        (TypeTag::Long, WireValue::Long(value)) => Ok(Value::Long(value)),
        (TypeTag::Float, WireValue::Float(value)) => Ok(Value::Float(value)),
        (TypeTag::Boolean, WireValue::Int(value)) => Ok(Value::Boolean(value != 0)),
        (TypeTag::Boolean, WireValue::Long(value)) => Ok(Value::Boolean(value != 0)),
        (TypeTag::Null, raw) => Err(StoreError::invalid_value(format!(
            "expected null, got {}",
            raw.kind()
        ))),
        (tag, raw) => Err(StoreError::type_mismatch(tag, raw.kind())),
    }
}

/// Flattens a set of strings. Elements are written in iteration order.
pub fn serialize_string_set<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for item in items {
        for ch in item.as_ref().chars() {
            if ch == ESCAPE || ch == TERMINATOR {
                out.push(ESCAPE);
            }
            out.push(ch);
        }
        out.push(TERMINATOR);
    }
    out
}

/// Parses the output of [`serialize_string_set`].
pub fn deserialize_string_set(encoded: &str) -> StoreResult<StringSet> {
    let mut set = StringSet::new();
    let mut current = String::new();
    let mut pending = false;
    let mut chars = encoded.chars();

    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => {
                let escaped = chars.next().ok_or(StoreError::MalformedEncoding {
                    reason: "dangling escape character",
                })?;
                current.push(escaped);
                pending = true;
            }
            TERMINATOR => {
                set.insert(std::mem::take(&mut current));
                pending = false;
            }
            other => {
                current.push(other);
                pending = true;
            }
        }
    }

    if pending {
        return Err(StoreError::MalformedEncoding {
            reason: "last element is not terminated",
        });
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> StringSet {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn serializes_with_escapes_in_given_order() {
        let encoded = serialize_string_set(["foo", "bar;", "baz", ""]);
        assert_eq!(encoded, "foo;bar\\;;baz;;");
    }

    #[test]
    fn empty_set_is_empty_string() {
        assert_eq!(serialize_string_set(StringSet::new().iter()), "");
        assert_eq!(deserialize_string_set("").unwrap(), StringSet::new());
    }

    #[test]
    fn string_sets_survive_encoding() {
        let cases = [
            set(&[]),
            set(&[""]),
            set(&["foo", "bar;", "baz", ""]),
            set(&["\\", ";", "\\;", ";;\\\\", "plain"]),
            set(&["ünïcødé", "日本"]),
        ];
        for case in cases {
            let encoded = serialize_string_set(&case);
            assert_eq!(deserialize_string_set(&encoded).unwrap(), case);
        }
    }

    #[test]
    fn unterminated_element_is_malformed() {
        for encoded in ["foo;bar", "foo", "a;\\;", "a;\\"] {
            assert!(
                matches!(
                    deserialize_string_set(encoded),
                    Err(StoreError::MalformedEncoding { .. })
                ),
                "{encoded:?} should be rejected"
            );
        }
    }

    #[test]
    fn booleans_travel_as_integers() {
        assert_eq!(encode(&Value::Boolean(true)), (TypeTag::Boolean, WireValue::Int(1)));
        assert_eq!(encode(&Value::Boolean(false)), (TypeTag::Boolean, WireValue::Int(0)));
        assert_eq!(
            decode(TypeTag::Boolean, WireValue::Int(7)).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn decode_refuses_to_coerce() {
        assert!(matches!(
            decode(TypeTag::Int, WireValue::Float(1.5)),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            decode(TypeTag::Long, WireValue::Int(3)),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            decode(TypeTag::Null, WireValue::Text("x".into())),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(matches!(
            decode(TypeTag::StringSet, WireValue::Text("open".into())),
            Err(StoreError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn encode_then_decode_preserves_every_kind() {
        let values = [
            Value::from("text"),
            Value::StringSet(set(&["a", "b;"])),
            Value::Int(-4),
            Value::Long(1 << 40),
            Value::Float(0.25),
            Value::Boolean(true),
            Value::Null,
        ];
        for value in values {
            let (tag, raw) = encode(&value);
            assert_eq!(decode(tag, raw).unwrap(), value);
        }
    }
}
