//! Single-step property reads and writes.

use json_observe_value::{Value, MAX_ARRAY_GROWTH};

use crate::PathKey;

const LENGTH: &str = "length";

/// Reads one property of `target`.
///
/// Objects are read by key (an index key reads its decimal form). Arrays are
/// read by index and expose `length`. Strings expose `length` and
/// single-character indexing. Anything else reads as `Undefined`.
pub fn read_key(target: &Value, key: &PathKey) -> Value {
    match (target, key) {
        (Value::Object(obj), PathKey::Name(name)) => obj.get(name).unwrap_or_default(),
        (Value::Object(obj), PathKey::Index(i)) => obj.get(&i.to_string()).unwrap_or_default(),
        (Value::Array(arr), PathKey::Index(i)) => arr.get(*i).unwrap_or_default(),
        (Value::Array(arr), PathKey::Name(name)) if name == LENGTH => Value::from(arr.len()),
        (Value::String(s), PathKey::Name(name)) if name == LENGTH => {
            Value::from(s.chars().count())
        }
        (Value::String(s), PathKey::Index(i)) => s
            .chars()
            .nth(*i)
            .map_or(Value::Undefined, |c| Value::from(c.to_string())),
        _ => Value::Undefined,
    }
}

/// Assigns one property of `target`. Returns false when `target` cannot
/// hold the property.
///
/// Only objects and arrays are writable. Arrays accept an index (growing
/// with holes) or `length` set to a non-negative integer; growth past
/// [`MAX_ARRAY_GROWTH`] elements is refused.
pub fn write_key(target: &Value, key: &PathKey, value: Value) -> bool {
    match (target, key) {
        (Value::Object(obj), key) => {
            obj.insert(key.to_string(), value);
            true
        }
        (Value::Array(arr), PathKey::Index(i)) => arr.try_set(*i, value),
        (Value::Array(arr), PathKey::Name(name)) if name == LENGTH => {
            array_length(&value).is_some_and(|len| arr.try_resize(len))
        }
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn array_length(value: &Value) -> Option<usize> {
    let n = value.as_number()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then(|| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_object_and_array() {
        let doc = Value::from(json!({"a": [10, 20], "7": "seven"}));
        let a = read_key(&doc, &PathKey::name("a"));
        assert_eq!(read_key(&a, &PathKey::Index(1)), Value::from(20));
        assert_eq!(read_key(&a, &PathKey::name("length")), Value::from(2));
        assert!(read_key(&a, &PathKey::Index(5)).is_undefined());
        assert_eq!(read_key(&doc, &PathKey::Index(7)), Value::from("seven"));
    }

    #[test]
    fn test_read_string() {
        let s = Value::from("héllo");
        assert_eq!(read_key(&s, &PathKey::name("length")), Value::from(5));
        assert_eq!(read_key(&s, &PathKey::Index(1)), Value::from("é"));
        assert!(read_key(&s, &PathKey::name("x")).is_undefined());
    }

    #[test]
    fn test_read_primitives_is_undefined() {
        assert!(read_key(&Value::Null, &PathKey::name("a")).is_undefined());
        assert!(read_key(&Value::from(3), &PathKey::name("a")).is_undefined());
    }

    #[test]
    fn test_write_array_length() {
        let arr = Value::from(json!([1, 2, 3]));
        assert!(write_key(&arr, &PathKey::name("length"), Value::from(1)));
        assert_eq!(arr.to_json(), json!([1]));
        assert!(!write_key(&arr, &PathKey::name("length"), Value::from(-1)));
        assert!(!write_key(&arr, &PathKey::name("length"), Value::from(1.5)));
        assert!(!write_key(&arr, &PathKey::name("other"), Value::from(1)));
    }

    #[test]
    fn test_write_primitive_fails() {
        assert!(!write_key(&Value::from("s"), &PathKey::Index(0), Value::from(1)));
        assert!(!write_key(&Value::Undefined, &PathKey::name("a"), Value::from(1)));
    }
}
