use std::rc::Rc;

use jsx::ast::BinaryOp;

use crate::error::RuntimeError;
use crate::runtime_value::{ObjectKind, RuntimeValue};

/// Apply a binary operator to two evaluated operands.
pub fn binary(op: BinaryOp, left: &RuntimeValue, right: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    use BinaryOp::*;
    let value = match op {
        Add => add(left, right),
        Sub => RuntimeValue::Number(left.to_number() - right.to_number()),
        Mul => RuntimeValue::Number(left.to_number() * right.to_number()),
        Div => RuntimeValue::Number(left.to_number() / right.to_number()),
        Rem => RuntimeValue::Number(left.to_number() % right.to_number()),
        Exp => RuntimeValue::Number(left.to_number().powf(right.to_number())),
        Eq => RuntimeValue::Bool(loose_equals(left, right)),
        NotEq => RuntimeValue::Bool(!loose_equals(left, right)),
        StrictEq => RuntimeValue::Bool(strict_equals(left, right)),
        StrictNotEq => RuntimeValue::Bool(!strict_equals(left, right)),
        Lt => RuntimeValue::Bool(compare(left, right, |o| o.is_lt())),
        Gt => RuntimeValue::Bool(compare(left, right, |o| o.is_gt())),
        LtEq => RuntimeValue::Bool(compare(left, right, |o| o.is_le())),
        GtEq => RuntimeValue::Bool(compare(left, right, |o| o.is_ge())),
        BitAnd => RuntimeValue::Number((to_int32(left) & to_int32(right)) as f64),
        BitOr => RuntimeValue::Number((to_int32(left) | to_int32(right)) as f64),
        BitXor => RuntimeValue::Number((to_int32(left) ^ to_int32(right)) as f64),
        Shl => RuntimeValue::Number(to_int32(left).wrapping_shl(to_uint32(right) & 31) as f64),
        Shr => RuntimeValue::Number(to_int32(left).wrapping_shr(to_uint32(right) & 31) as f64),
        UShr => RuntimeValue::Number(to_uint32(left).wrapping_shr(to_uint32(right) & 31) as f64),
        In => RuntimeValue::Bool(has_property(right, &property_key(left))?),
        InstanceOf => RuntimeValue::Bool(instance_of(left, right)?),
    };
    Ok(value)
}

/// `+`: string concatenation if either side is (or converts to) a string,
/// numeric addition otherwise.
pub fn add(left: &RuntimeValue, right: &RuntimeValue) -> RuntimeValue {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => {
            let mut s = left.to_js_string();
            s.push_str(&right.to_js_string());
            RuntimeValue::String(Rc::from(s))
        }
        _ => RuntimeValue::Number(left.to_number() + right.to_number()),
    }
}

/// Objects, arrays and functions convert to their string form; primitives
/// stay as they are.
fn to_primitive(value: &RuntimeValue) -> RuntimeValue {
    match value {
        RuntimeValue::Array(_)
        | RuntimeValue::Object(_)
        | RuntimeValue::Function(_)
        | RuntimeValue::Element(_) => RuntimeValue::from(value.to_js_string()),
        other => other.clone(),
    }
}

pub fn strict_equals(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    match (left, right) {
        (RuntimeValue::Undefined, RuntimeValue::Undefined) => true,
        (RuntimeValue::Null, RuntimeValue::Null) => true,
        (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a == b,
        (RuntimeValue::Number(a), RuntimeValue::Number(b)) => a == b,
        (RuntimeValue::String(a), RuntimeValue::String(b)) => a == b,
        (RuntimeValue::Symbol(a), RuntimeValue::Symbol(b)) => a == b,
        _ => same_reference(left, right),
    }
}

/// Identity comparison for reference values.
pub fn same_reference(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    match (left, right) {
        (RuntimeValue::Array(a), RuntimeValue::Array(b)) => Rc::ptr_eq(a, b),
        (RuntimeValue::Object(a), RuntimeValue::Object(b)) => Rc::ptr_eq(a, b),
        (RuntimeValue::Function(a), RuntimeValue::Function(b)) => Rc::ptr_eq(a, b),
        (RuntimeValue::Element(a), RuntimeValue::Element(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// `SameValueZero`, used by `includes`: like `===` except NaN equals NaN.
pub fn same_value_zero(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    match (left, right) {
        (RuntimeValue::Number(a), RuntimeValue::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => strict_equals(left, right),
    }
}

pub fn loose_equals(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    use RuntimeValue as V;
    match (left, right) {
        (V::Undefined | V::Null, V::Undefined | V::Null) => true,
        (V::Undefined | V::Null, _) | (_, V::Undefined | V::Null) => false,
        (V::Number(_), V::String(_)) | (V::String(_), V::Number(_)) => {
            left.to_number() == right.to_number()
        }
        (V::Bool(_), _) => loose_equals(&V::Number(left.to_number()), right),
        (_, V::Bool(_)) => loose_equals(left, &V::Number(right.to_number())),
        (V::Number(_) | V::String(_), V::Array(_) | V::Object(_))
        | (V::Array(_) | V::Object(_), V::Number(_) | V::String(_)) => {
            loose_equals(&to_primitive(left), &to_primitive(right))
        }
        _ => strict_equals(left, right),
    }
}

/// Relational comparison: lexicographic when both sides are strings,
/// numeric otherwise. Any comparison involving NaN is false.
fn compare(left: &RuntimeValue, right: &RuntimeValue, test: fn(std::cmp::Ordering) -> bool) -> bool {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (RuntimeValue::String(a), RuntimeValue::String(b)) = (&left, &right) {
        return test(a.encode_utf16().cmp(b.encode_utf16()));
    }
    match left.to_number().partial_cmp(&right.to_number()) {
        Some(ordering) => test(ordering),
        None => false,
    }
}

/// JavaScript `ToInt32`.
pub fn to_int32(value: &RuntimeValue) -> i32 {
    to_uint32(value) as i32
}

/// JavaScript `ToUint32`.
pub fn to_uint32(value: &RuntimeValue) -> u32 {
    let n = value.to_number();
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}

/// JavaScript `ToIntegerOrInfinity`, used by index arguments.
pub fn to_integer(value: &RuntimeValue) -> f64 {
    let n = value.to_number();
    if n.is_nan() { 0.0 } else { n.trunc() }
}

/// Resolve a relative index (negative counts from the end) into `0..=len`.
pub fn relative_index(value: &RuntimeValue, len: usize, default: usize) -> usize {
    if matches!(value, RuntimeValue::Undefined) {
        return default;
    }
    let n = to_integer(value);
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}

/// Property key for a computed access: numbers print canonically.
pub fn property_key(value: &RuntimeValue) -> String {
    value.to_js_string()
}

/// Longest array a block may build. Growing past it is a `RangeError`
/// rather than an allocation the process cannot survive.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

/// Longest string `repeat` and `padStart`/`padEnd` may produce.
pub const MAX_STRING_LENGTH: usize = 1 << 24;

/// Interpret a property key as an array index. Like JavaScript, only
/// integers below 2^32 - 1 are indices.
pub fn array_index(key: &str) -> Option<usize> {
    if key == "0" {
        return Some(0);
    }
    if key.starts_with('0') || key.is_empty() {
        return None;
    }
    if key.bytes().all(|b| b.is_ascii_digit()) {
        key.parse::<u32>().ok().filter(|&i| i < u32::MAX).map(|i| i as usize)
    } else {
        None
    }
}

/// Check a requested array length against [`MAX_ARRAY_LENGTH`].
pub fn array_length(len: f64) -> Result<usize, RuntimeError> {
    if !len.is_finite() || len < 0.0 || len.fract() != 0.0 || len > MAX_ARRAY_LENGTH as f64 {
        return Err(RuntimeError::RangeError("Invalid array length".to_string()));
    }
    Ok(len as usize)
}

fn has_property(target: &RuntimeValue, key: &str) -> Result<bool, RuntimeError> {
    match target {
        RuntimeValue::Object(object) => Ok(object.borrow().contains(key)),
        RuntimeValue::Array(items) => Ok(key == "length"
            || array_index(key).is_some_and(|i| i < items.borrow().len())),
        RuntimeValue::Element(_) => Ok(matches!(key, "type" | "props" | "key")),
        RuntimeValue::Function(_) => Ok(false),
        other => Err(RuntimeError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key,
            other.to_js_string()
        ))),
    }
}

fn instance_of(value: &RuntimeValue, constructor: &RuntimeValue) -> Result<bool, RuntimeError> {
    let RuntimeValue::Function(function) = constructor else {
        return Err(RuntimeError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    let result = match function.name() {
        "Array" => matches!(value, RuntimeValue::Array(_)),
        "Object" => matches!(
            value,
            RuntimeValue::Array(_)
                | RuntimeValue::Object(_)
                | RuntimeValue::Function(_)
                | RuntimeValue::Element(_)
        ),
        "Error" => error_name(value).is_some(),
        name @ ("TypeError" | "RangeError" | "ReferenceError") => {
            error_name(value).as_deref() == Some(name)
        }
        _ => false,
    };
    Ok(result)
}

fn error_name(value: &RuntimeValue) -> Option<String> {
    match value {
        RuntimeValue::Object(object) => {
            let object = object.borrow();
            (object.kind == ObjectKind::Error)
                .then(|| object.get("name").map(|n| n.to_js_string()).unwrap_or_default())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> RuntimeValue {
        RuntimeValue::Number(n)
    }

    fn s(text: &str) -> RuntimeValue {
        RuntimeValue::from(text)
    }

    #[test]
    fn addition_concatenates_strings() {
        assert_eq!(add(&s("a"), &num(1.0)).to_js_string(), "a1");
        assert_eq!(add(&num(1.0), &num(2.0)).to_number(), 3.0);
        assert_eq!(add(&RuntimeValue::array(vec![num(1.0), num(2.0)]), &s("")).to_js_string(), "1,2");
        assert!(add(&RuntimeValue::Undefined, &num(1.0)).to_number().is_nan());
    }

    #[test]
    fn loose_equality() {
        assert!(loose_equals(&RuntimeValue::Null, &RuntimeValue::Undefined));
        assert!(loose_equals(&s("1"), &num(1.0)));
        assert!(loose_equals(&RuntimeValue::Bool(true), &num(1.0)));
        assert!(!loose_equals(&RuntimeValue::Null, &num(0.0)));
        assert!(!loose_equals(&num(f64::NAN), &num(f64::NAN)));
    }

    #[test]
    fn strict_equality_uses_identity_for_objects() {
        let a = RuntimeValue::array(vec![]);
        assert!(strict_equals(&a, &a.clone()));
        assert!(!strict_equals(&a, &RuntimeValue::array(vec![])));
        assert!(!strict_equals(&s("1"), &num(1.0)));
    }

    #[test]
    fn comparisons() {
        assert!(binary(BinaryOp::Lt, &s("a"), &s("b")).unwrap().is_truthy());
        assert!(!binary(BinaryOp::Lt, &s("10"), &num(9.0)).unwrap().is_truthy());
        assert!(!binary(BinaryOp::GtEq, &num(f64::NAN), &num(1.0)).unwrap().is_truthy());
    }

    #[test]
    fn bitwise_operators_wrap() {
        assert_eq!(binary(BinaryOp::BitOr, &num(4294967297.0), &num(0.0)).unwrap().to_number(), 1.0);
        assert_eq!(binary(BinaryOp::UShr, &num(-1.0), &num(0.0)).unwrap().to_number(), 4294967295.0);
        assert_eq!(binary(BinaryOp::Shl, &num(1.0), &num(33.0)).unwrap().to_number(), 2.0);
    }

    #[test]
    fn array_lengths_are_capped() {
        assert_eq!(array_length(3.0).unwrap(), 3);
        assert_eq!(array_length(MAX_ARRAY_LENGTH as f64).unwrap(), MAX_ARRAY_LENGTH);
        for len in [-1.0, 1.5, f64::NAN, f64::INFINITY, 1e9, 4294967295.0] {
            assert!(
                matches!(array_length(len), Err(RuntimeError::RangeError(_))),
                "{len} was accepted"
            );
        }
    }

    #[test]
    fn array_indices() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("4294967294"), Some(4294967294));
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("4294967296"), None);
        assert_eq!(array_index("99999999999999999999"), None);
        assert_eq!(relative_index(&num(-2.0), 5, 0), 3);
        assert_eq!(relative_index(&RuntimeValue::Undefined, 5, 5), 5);
    }
}
