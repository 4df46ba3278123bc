use std::rc::Rc;

use crate::Value;

/// SameValue equality, the relation used for all change detection.
///
/// - `NaN` is equal to `NaN`.
/// - `+0` and `-0` are distinct.
/// - Strings compare by content.
/// - Arrays and objects compare by identity: two handles are equal only when
///   they point at the same storage.
///
/// # Examples
///
/// ```
/// use json_observe_value::{same_value, Value};
///
/// assert!(same_value(&Value::from(f64::NAN), &Value::from(f64::NAN)));
/// assert!(!same_value(&Value::from(0.0), &Value::from(-0.0)));
/// assert!(same_value(&Value::from("a"), &Value::from("a")));
/// assert!(!same_value(&Value::array(vec![]), &Value::array(vec![])));
/// ```
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
        (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b) || a == b,
        (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
        (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// SameValue on numbers: `NaN` equals itself and the sign of zero matters.
pub fn same_number(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a == b && a.is_sign_negative() == b.is_sign_negative()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_equals_nan() {
        assert!(same_number(f64::NAN, f64::NAN));
        assert!(!same_number(f64::NAN, 1.0));
    }

    #[test]
    fn test_signed_zero_is_distinct() {
        assert!(!same_number(0.0, -0.0));
        assert!(same_number(-0.0, -0.0));
        assert!(same_number(0.0, 0.0));
    }

    #[test]
    fn test_mixed_kinds_are_never_equal() {
        assert!(!same_value(&Value::Undefined, &Value::Null));
        assert!(!same_value(&Value::from(1), &Value::from("1")));
        assert!(!same_value(&Value::from(false), &Value::from(0)));
    }

    #[test]
    fn test_containers_compare_by_identity() {
        let arr = Value::array(vec![Value::from(1)]);
        let alias = arr.clone();
        assert!(same_value(&arr, &alias));
        assert!(!same_value(&arr, &Value::array(vec![Value::from(1)])));

        let obj = Value::empty_object();
        assert!(same_value(&obj, &obj.clone()));
        assert!(!same_value(&obj, &Value::empty_object()));
    }
}
