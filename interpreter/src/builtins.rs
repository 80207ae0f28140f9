//! Language intrinsics available to bound code: the global functions and
//! namespaces, and the methods reachable through property access on
//! strings, arrays, numbers and objects.
//!
//! Nothing here touches the outside world. There is no console, timer,
//! network, storage or randomness.

use std::cmp::Ordering;
use std::rc::Rc;

use serde::Serialize;

use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::evaluator::Interpreter;
use crate::evaluator_helpers::{
    MAX_STRING_LENGTH, array_length, relative_index, same_value_zero, strict_equals, to_integer,
};
use crate::pattern::{iterate, own_entries};
use crate::runtime_value::{NativeFn, Object, ObjectKind, RuntimeValue, number_to_string};

/// Names bound in the global scope. Bound code may reference these and
/// nothing else besides its own bindings and the host library parameter.
pub const INTRINSICS: &[&str] = &[
    "undefined",
    "NaN",
    "Infinity",
    "Math",
    "JSON",
    "Object",
    "Array",
    "String",
    "Number",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
    "Error",
    "TypeError",
    "RangeError",
];

type Method = (&'static str, NativeFn);

pub fn install(globals: &Rc<Scope>) {
    globals.define("undefined", RuntimeValue::Undefined, false);
    globals.define("NaN", RuntimeValue::Number(f64::NAN), false);
    globals.define("Infinity", RuntimeValue::Number(f64::INFINITY), false);
    globals.define("Math", math_object(), false);
    globals.define("JSON", json_object(), false);

    let functions: [Method; 11] = [
        ("Object", object_constructor),
        ("Array", array_constructor),
        ("String", string_constructor),
        ("Number", number_constructor),
        ("Boolean", boolean_constructor),
        ("parseInt", parse_int),
        ("parseFloat", parse_float),
        ("isNaN", is_nan),
        ("Error", error_constructor),
        ("TypeError", type_error_constructor),
        ("RangeError", range_error_constructor),
    ];
    for (name, call) in functions {
        globals.define(name, RuntimeValue::native(name, call), false);
    }
}

/// Native functions that may be used with `new`.
pub fn is_constructor(name: &str) -> bool {
    matches!(
        name,
        "Object" | "Array" | "String" | "Number" | "Boolean" | "Error" | "TypeError" | "RangeError"
    )
}

fn arg(args: &[RuntimeValue], index: usize) -> RuntimeValue {
    args.get(index).cloned().unwrap_or(RuntimeValue::Undefined)
}

fn callback(value: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(RuntimeError::type_error(format!(
            "{} is not a function",
            value.to_js_string()
        )))
    }
}

fn object_of(value: &RuntimeValue) -> Result<(), RuntimeError> {
    if value.is_nullish() {
        Err(RuntimeError::type_error(
            "Cannot convert undefined or null to object",
        ))
    } else {
        Ok(())
    }
}

pub fn value_to_string(_: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::from(this.to_js_string()))
}

// ---------------------------------------------------------------------------
// Global functions and constructors
// ---------------------------------------------------------------------------

fn object_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let value = arg(&args, 0);
    if value.is_nullish() {
        Ok(RuntimeValue::object(Object::new()))
    } else {
        Ok(value)
    }
}

fn array_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    if let [RuntimeValue::Number(n)] = args.as_slice() {
        return Ok(RuntimeValue::array(vec![RuntimeValue::Undefined; array_length(*n)?]));
    }
    Ok(RuntimeValue::array(args))
}

fn string_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(match args.first() {
        Some(value) => RuntimeValue::from(value.to_js_string()),
        None => RuntimeValue::from(""),
    })
}

fn number_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Number(args.first().map_or(0.0, |v| v.to_number())))
}

fn boolean_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(arg(&args, 0).is_truthy()))
}

fn make_error(name: &str, args: &[RuntimeValue]) -> RuntimeValue {
    let message = match arg(args, 0) {
        RuntimeValue::Undefined => String::new(),
        other => other.to_js_string(),
    };
    RuntimeValue::object(Object::error(name, &message))
}

fn error_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(make_error("Error", &args))
}

fn type_error_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(make_error("TypeError", &args))
}

fn range_error_constructor(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(make_error("RangeError", &args))
}

fn is_nan(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(arg(&args, 0).to_number().is_nan()))
}

fn parse_int(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let text = arg(&args, 0).to_js_string();
    let radix = match arg(&args, 1) {
        RuntimeValue::Undefined => 0,
        other => to_integer(&other) as i64,
    };
    Ok(RuntimeValue::Number(parse_int_str(&text, radix)))
}

/// JavaScript `parseInt`: the longest valid prefix in the given radix.
pub fn parse_int_str(text: &str, radix: i64) -> f64 {
    let text = text.trim_start();
    let (negative, mut digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut radix = radix;
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 0 || radix == 16 {
        if let Some(rest) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            digits = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    let mut value = 0.0f64;
    let mut any = false;
    for c in digits.chars() {
        match c.to_digit(radix as u32) {
            Some(d) => {
                value = value * radix as f64 + d as f64;
                any = true;
            }
            None => break,
        }
    }
    if !any {
        return f64::NAN;
    }
    if negative { -value } else { value }
}

fn parse_float(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Number(parse_float_str(&arg(&args, 0).to_js_string())))
}

/// JavaScript `parseFloat`: the longest prefix that is a decimal literal.
pub fn parse_float_str(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if text[end..].starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let mantissa = &text[digits_start..end];
    if mantissa.is_empty() || mantissa == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    text[..end].parse().unwrap_or(f64::NAN)
}

/// Static members of the native constructors, e.g. `Object.keys`.
pub fn static_member(function: &str, key: &str) -> Option<RuntimeValue> {
    let method: Method = match (function, key) {
        ("Object", "keys") => ("keys", object_keys),
        ("Object", "values") => ("values", object_values),
        ("Object", "entries") => ("entries", object_entries),
        ("Object", "assign") => ("assign", object_assign),
        ("Object", "fromEntries") => ("fromEntries", object_from_entries),
        ("Object", "freeze") => ("freeze", object_freeze),
        ("Array", "isArray") => ("isArray", array_is_array),
        ("Array", "from") => ("from", array_from),
        ("Array", "of") => ("of", array_of),
        ("Number", "isInteger") => ("isInteger", number_is_integer),
        ("Number", "isFinite") => ("isFinite", number_is_finite),
        ("Number", "isNaN") => ("isNaN", number_is_nan),
        ("Number", "parseFloat") => ("parseFloat", parse_float),
        ("Number", "parseInt") => ("parseInt", parse_int),
        ("Number", "MAX_SAFE_INTEGER") => return Some(RuntimeValue::Number(9007199254740991.0)),
        ("Number", "MIN_SAFE_INTEGER") => return Some(RuntimeValue::Number(-9007199254740991.0)),
        ("Number", "EPSILON") => return Some(RuntimeValue::Number(f64::EPSILON)),
        _ => return None,
    };
    Some(RuntimeValue::native(method.0, method.1))
}

fn object_keys(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let target = arg(&args, 0);
    object_of(&target)?;
    Ok(RuntimeValue::array(
        own_entries(&target)
            .into_iter()
            .map(|(k, _)| RuntimeValue::from(k))
            .collect(),
    ))
}

fn object_values(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let target = arg(&args, 0);
    object_of(&target)?;
    Ok(RuntimeValue::array(
        own_entries(&target).into_iter().map(|(_, v)| v).collect(),
    ))
}

fn object_entries(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let target = arg(&args, 0);
    object_of(&target)?;
    Ok(RuntimeValue::array(
        own_entries(&target)
            .into_iter()
            .map(|(k, v)| RuntimeValue::array(vec![RuntimeValue::from(k), v]))
            .collect(),
    ))
}

fn object_assign(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let target = arg(&args, 0);
    object_of(&target)?;
    for source in args.iter().skip(1) {
        for (key, value) in own_entries(source) {
            interp.set_property(&target, &key, value)?;
        }
    }
    Ok(target)
}

fn object_from_entries(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut object = Object::new();
    for entry in iterate(&arg(&args, 0))? {
        let key = interp.get_property(&entry, "0")?.to_js_string();
        let value = interp.get_property(&entry, "1")?;
        object.set(&key, value);
    }
    Ok(RuntimeValue::object(object))
}

fn object_freeze(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let target = arg(&args, 0);
    if let RuntimeValue::Object(object) = &target {
        object.borrow_mut().frozen = true;
    }
    Ok(target)
}

fn array_is_array(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(matches!(arg(&args, 0), RuntimeValue::Array(_))))
}

fn array_from(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let source = arg(&args, 0);
    let items = match &source {
        RuntimeValue::Array(_) | RuntimeValue::String(_) => iterate(&source)?,
        RuntimeValue::Object(object) => {
            // Array-like: `Array.from({ length: n }, ...)`
            let length = object
                .borrow()
                .get("length")
                .map(|l| to_integer(l).max(0.0))
                .unwrap_or(0.0);
            let length = array_length(length)?;
            let mut items = Vec::with_capacity(length);
            for i in 0..length {
                items.push(interp.get_property(&source, &i.to_string())?);
            }
            items
        }
        other => {
            object_of(other)?;
            Vec::new()
        }
    };
    let items = match arg(&args, 1) {
        RuntimeValue::Undefined => items,
        map => {
            let map = callback(map)?;
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(&map, vec![item, RuntimeValue::Number(i as f64)])?);
            }
            mapped
        }
    };
    Ok(RuntimeValue::array(items))
}

fn array_of(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::array(args))
}

fn number_is_integer(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(
        matches!(arg(&args, 0), RuntimeValue::Number(n) if n.is_finite() && n.fract() == 0.0),
    ))
}

fn number_is_finite(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(
        matches!(arg(&args, 0), RuntimeValue::Number(n) if n.is_finite()),
    ))
}

fn number_is_nan(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Bool(
        matches!(arg(&args, 0), RuntimeValue::Number(n) if n.is_nan()),
    ))
}

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

fn math_object() -> RuntimeValue {
    let mut math = Object::new();
    let constants = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("SQRT2", std::f64::consts::SQRT_2),
    ];
    for (name, value) in constants {
        math.set(name, RuntimeValue::Number(value));
    }
    let functions: [Method; 22] = [
        ("abs", |_, _, a| unary_math(&a, f64::abs)),
        ("floor", |_, _, a| unary_math(&a, f64::floor)),
        ("ceil", |_, _, a| unary_math(&a, f64::ceil)),
        ("round", |_, _, a| unary_math(&a, |x| (x + 0.5).floor())),
        ("trunc", |_, _, a| unary_math(&a, f64::trunc)),
        ("sign", |_, _, a| {
            unary_math(&a, |x| if x == 0.0 || x.is_nan() { x } else { x.signum() })
        }),
        ("sqrt", |_, _, a| unary_math(&a, f64::sqrt)),
        ("cbrt", |_, _, a| unary_math(&a, f64::cbrt)),
        ("log", |_, _, a| unary_math(&a, f64::ln)),
        ("log10", |_, _, a| unary_math(&a, f64::log10)),
        ("log2", |_, _, a| unary_math(&a, f64::log2)),
        ("exp", |_, _, a| unary_math(&a, f64::exp)),
        ("sin", |_, _, a| unary_math(&a, f64::sin)),
        ("cos", |_, _, a| unary_math(&a, f64::cos)),
        ("tan", |_, _, a| unary_math(&a, f64::tan)),
        ("atan", |_, _, a| unary_math(&a, f64::atan)),
        ("pow", |_, _, a| {
            Ok(RuntimeValue::Number(
                arg(&a, 0).to_number().powf(arg(&a, 1).to_number()),
            ))
        }),
        ("atan2", |_, _, a| {
            Ok(RuntimeValue::Number(
                arg(&a, 0).to_number().atan2(arg(&a, 1).to_number()),
            ))
        }),
        ("min", |_, _, a| Ok(RuntimeValue::Number(fold_math(&a, f64::INFINITY, f64::min)))),
        ("max", |_, _, a| Ok(RuntimeValue::Number(fold_math(&a, f64::NEG_INFINITY, f64::max)))),
        ("hypot", |_, _, a| {
            let sum: f64 = a.iter().map(|v| v.to_number().powi(2)).sum();
            Ok(RuntimeValue::Number(sum.sqrt()))
        }),
        ("clz32", |_, _, a| {
            let n = crate::evaluator_helpers::to_uint32(&arg(&a, 0));
            Ok(RuntimeValue::Number(n.leading_zeros() as f64))
        }),
    ];
    for (name, call) in functions {
        math.set(name, RuntimeValue::native(name, call));
    }
    RuntimeValue::object(math)
}

fn unary_math(args: &[RuntimeValue], f: fn(f64) -> f64) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Number(f(arg(args, 0).to_number())))
}

/// `Math.min`/`Math.max`: NaN if any argument is NaN.
fn fold_math(args: &[RuntimeValue], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = f(acc, n);
    }
    acc
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

const MAX_JSON_DEPTH: usize = 128;

fn json_object() -> RuntimeValue {
    let mut json = Object::new();
    json.set("stringify", RuntimeValue::native("stringify", json_stringify));
    json.set("parse", RuntimeValue::native("parse", json_parse));
    RuntimeValue::object(json)
}

fn json_stringify(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let Some(json) = to_json(&arg(&args, 0), 0)? else {
        return Ok(RuntimeValue::Undefined);
    };
    let indent = match arg(&args, 2) {
        RuntimeValue::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        RuntimeValue::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        json.serialize(&mut serializer)
            .map(|()| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(RuntimeValue::from)
        .map_err(|e| RuntimeError::type_error(e.to_string()))
}

/// `None` for values JSON omits (`undefined`, functions, symbols).
fn to_json(value: &RuntimeValue, depth: usize) -> Result<Option<serde_json::Value>, RuntimeError> {
    use serde_json::Value as Json;
    if depth > MAX_JSON_DEPTH {
        return Err(RuntimeError::type_error(
            "Converting circular structure to JSON",
        ));
    }
    let json = match value {
        RuntimeValue::Undefined | RuntimeValue::Function(_) | RuntimeValue::Symbol(_) => {
            return Ok(None);
        }
        RuntimeValue::Null => Json::Null,
        RuntimeValue::Bool(b) => Json::Bool(*b),
        RuntimeValue::Number(n) => json_number(*n),
        RuntimeValue::String(s) => Json::String(s.to_string()),
        RuntimeValue::Array(items) => {
            let items = items.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(to_json(item, depth + 1)?.unwrap_or(Json::Null));
            }
            Json::Array(out)
        }
        RuntimeValue::Object(_) | RuntimeValue::Element(_) => {
            let is_error =
                matches!(value, RuntimeValue::Object(o) if o.borrow().kind == ObjectKind::Error);
            let mut map = serde_json::Map::new();
            if !is_error {
                for (key, item) in own_entries(value) {
                    if let Some(item) = to_json(&item, depth + 1)? {
                        map.insert(key, item);
                    }
                }
            }
            Json::Object(map)
        }
    };
    Ok(Some(json))
}

fn json_number(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9007199254740992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn json_parse(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let text = arg(&args, 0).to_js_string();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(from_json(json)),
        Err(e) => Err(RuntimeError::Thrown(RuntimeValue::object(Object::error(
            "SyntaxError",
            &e.to_string(),
        )))),
    }
}

fn from_json(json: serde_json::Value) -> RuntimeValue {
    use serde_json::Value as Json;
    match json {
        Json::Null => RuntimeValue::Null,
        Json::Bool(b) => RuntimeValue::Bool(b),
        Json::Number(n) => RuntimeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => RuntimeValue::from(s),
        Json::Array(items) => RuntimeValue::array(items.into_iter().map(from_json).collect()),
        Json::Object(map) => RuntimeValue::object(
            map.into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Array methods
// ---------------------------------------------------------------------------

pub fn array_method(key: &str) -> Option<Method> {
    let method: NativeFn = match key {
        "map" => array_map,
        "filter" => array_filter,
        "forEach" => array_for_each,
        "reduce" => array_reduce,
        "find" => array_find,
        "findIndex" => array_find_index,
        "some" => array_some,
        "every" => array_every,
        "includes" => array_includes,
        "indexOf" => array_index_of,
        "lastIndexOf" => array_last_index_of,
        "join" => array_join,
        "toString" => array_to_string,
        "slice" => array_slice,
        "splice" => array_splice,
        "concat" => array_concat,
        "push" => array_push,
        "pop" => array_pop,
        "shift" => array_shift,
        "unshift" => array_unshift,
        "reverse" => array_reverse,
        "sort" => array_sort,
        "flat" => array_flat,
        "flatMap" => array_flat_map,
        "fill" => array_fill,
        "at" => array_at,
        _ => return None,
    };
    Some((static_name(key), method))
}

/// The `&'static str` spelling of a known method name.
fn static_name(key: &str) -> &'static str {
    const NAMES: &[&str] = &[
        "map", "filter", "forEach", "reduce", "find", "findIndex", "some", "every", "includes",
        "indexOf", "lastIndexOf", "join", "toString", "slice", "splice", "concat", "push", "pop",
        "shift", "unshift", "reverse", "sort", "flat", "flatMap", "fill", "at", "toUpperCase",
        "toLowerCase", "trim", "trimStart", "trimEnd", "split", "substring", "startsWith",
        "endsWith", "replace", "replaceAll", "repeat", "padStart", "padEnd", "charAt",
        "charCodeAt", "localeCompare", "toFixed", "toLocaleString", "hasOwnProperty", "valueOf",
    ];
    NAMES.iter().copied().find(|n| *n == key).unwrap_or("method")
}

fn items_of(this: &RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match this {
        RuntimeValue::Array(items) => Ok(items.borrow().clone()),
        other => Err(RuntimeError::type_error(format!(
            "{} is not an array",
            other.to_js_string()
        ))),
    }
}

fn with_items<T>(this: &RuntimeValue, f: impl FnOnce(&mut Vec<RuntimeValue>) -> T) -> Result<T, RuntimeError> {
    match this {
        RuntimeValue::Array(items) => Ok(f(&mut items.borrow_mut())),
        other => Err(RuntimeError::type_error(format!(
            "{} is not an array",
            other.to_js_string()
        ))),
    }
}

/// Call `f(item, index, array)` for each item of a snapshot of the array,
/// stopping early when `visit` returns `Some`.
fn each_item<T>(
    interp: &mut Interpreter,
    this: &RuntimeValue,
    args: &[RuntimeValue],
    mut visit: impl FnMut(usize, RuntimeValue, RuntimeValue) -> Option<T>,
) -> Result<Option<T>, RuntimeError> {
    let f = callback(arg(args, 0))?;
    for (i, item) in items_of(this)?.into_iter().enumerate() {
        let result = interp.call(
            &f,
            vec![item.clone(), RuntimeValue::Number(i as f64), this.clone()],
        )?;
        if let Some(done) = visit(i, item, result) {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn array_map(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut out = Vec::new();
    each_item::<()>(interp, this, &args, |_, _, result| {
        out.push(result);
        None
    })?;
    Ok(RuntimeValue::array(out))
}

fn array_filter(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut out = Vec::new();
    each_item::<()>(interp, this, &args, |_, item, result| {
        if result.is_truthy() {
            out.push(item);
        }
        None
    })?;
    Ok(RuntimeValue::array(out))
}

fn array_for_each(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    each_item::<()>(interp, this, &args, |_, _, _| None)?;
    Ok(RuntimeValue::Undefined)
}

fn array_find(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let found = each_item(interp, this, &args, |_, item, result| {
        result.is_truthy().then_some(item)
    })?;
    Ok(found.unwrap_or(RuntimeValue::Undefined))
}

fn array_find_index(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let found = each_item(interp, this, &args, |i, _, result| result.is_truthy().then_some(i))?;
    Ok(RuntimeValue::Number(found.map_or(-1.0, |i| i as f64)))
}

fn array_some(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let found = each_item(interp, this, &args, |_, _, result| result.is_truthy().then_some(()))?;
    Ok(RuntimeValue::Bool(found.is_some()))
}

fn array_every(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let failed = each_item(interp, this, &args, |_, _, result| (!result.is_truthy()).then_some(()))?;
    Ok(RuntimeValue::Bool(failed.is_none()))
}

fn array_reduce(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let f = callback(arg(&args, 0))?;
    let items = items_of(this)?;
    let mut items = items.into_iter().enumerate();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match items.next() {
            Some((_, first)) => first,
            None => {
                return Err(RuntimeError::type_error(
                    "Reduce of empty array with no initial value",
                ));
            }
        },
    };
    for (i, item) in items {
        acc = interp.call(
            &f,
            vec![acc, item, RuntimeValue::Number(i as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn array_includes(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let needle = arg(&args, 0);
    let items = items_of(this)?;
    let from = relative_index(&arg(&args, 1), items.len(), 0);
    Ok(RuntimeValue::Bool(
        items[from..].iter().any(|item| same_value_zero(item, &needle)),
    ))
}

fn array_index_of(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let needle = arg(&args, 0);
    let items = items_of(this)?;
    let from = relative_index(&arg(&args, 1), items.len(), 0);
    let index = items[from..]
        .iter()
        .position(|item| strict_equals(item, &needle))
        .map(|i| i + from);
    Ok(RuntimeValue::Number(index.map_or(-1.0, |i| i as f64)))
}

fn array_last_index_of(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let needle = arg(&args, 0);
    let items = items_of(this)?;
    let index = items.iter().rposition(|item| strict_equals(item, &needle));
    Ok(RuntimeValue::Number(index.map_or(-1.0, |i| i as f64)))
}

fn array_join(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let separator = match arg(&args, 0) {
        RuntimeValue::Undefined => ",".to_string(),
        other => other.to_js_string(),
    };
    let items = items_of(this)?;
    let parts: Vec<String> = items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_js_string()
            }
        })
        .collect();
    Ok(RuntimeValue::from(parts.join(&separator)))
}

fn array_to_string(interp: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    array_join(interp, this, Vec::new())
}

fn array_slice(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let items = items_of(this)?;
    let start = relative_index(&arg(&args, 0), items.len(), 0);
    let end = relative_index(&arg(&args, 1), items.len(), items.len());
    let slice = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(RuntimeValue::array(slice))
}

fn array_splice(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let removed = with_items(this, |items| {
        let len = items.len();
        let start = relative_index(&arg(&args, 0), len, 0);
        let delete = match args.get(1) {
            None => len - start,
            Some(count) => (to_integer(count).max(0.0) as usize).min(len - start),
        };
        let inserted = args.iter().skip(2).cloned();
        items.splice(start..start + delete, inserted).collect::<Vec<_>>()
    })?;
    Ok(RuntimeValue::array(removed))
}

fn array_concat(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut out = items_of(this)?;
    for value in args {
        match &value {
            RuntimeValue::Array(items) => out.extend(items.borrow().iter().cloned()),
            _ => out.push(value),
        }
    }
    Ok(RuntimeValue::array(out))
}

fn array_push(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let len = with_items(this, |items| {
        items.extend(args);
        items.len()
    })?;
    Ok(RuntimeValue::Number(len as f64))
}

fn array_pop(_: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(with_items(this, |items| items.pop())?.unwrap_or(RuntimeValue::Undefined))
}

fn array_shift(_: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let first = with_items(this, |items| {
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    })?;
    Ok(first.unwrap_or(RuntimeValue::Undefined))
}

fn array_unshift(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let len = with_items(this, |items| {
        items.splice(0..0, args);
        items.len()
    })?;
    Ok(RuntimeValue::Number(len as f64))
}

fn array_reverse(_: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    with_items(this, |items| items.reverse())?;
    Ok(this.clone())
}

fn array_sort(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let comparator = match arg(&args, 0) {
        RuntimeValue::Undefined => None,
        other => Some(callback(other)?),
    };
    let mut items = items_of(this)?;
    // Insertion sort: stable, and the comparator may fail or call back into
    // the interpreter, which rules out `sort_by`.
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 {
            let ordering = match &comparator {
                Some(f) => {
                    let result = interp.call(f, vec![items[j - 1].clone(), items[j].clone()])?;
                    result.to_number().partial_cmp(&0.0).unwrap_or(Ordering::Equal)
                }
                None => default_order(&items[j - 1], &items[j]),
            };
            if ordering != Ordering::Greater {
                break;
            }
            items.swap(j - 1, j);
            j -= 1;
        }
    }
    with_items(this, |target| *target = items)?;
    Ok(this.clone())
}

/// Default sort order: `undefined` last, everything else by string value.
fn default_order(a: &RuntimeValue, b: &RuntimeValue) -> Ordering {
    match (a, b) {
        (RuntimeValue::Undefined, RuntimeValue::Undefined) => Ordering::Equal,
        (RuntimeValue::Undefined, _) => Ordering::Greater,
        (_, RuntimeValue::Undefined) => Ordering::Less,
        _ => a
            .to_js_string()
            .encode_utf16()
            .cmp(b.to_js_string().encode_utf16()),
    }
}

fn flatten_into(out: &mut Vec<RuntimeValue>, items: &[RuntimeValue], depth: f64) {
    for item in items {
        match item {
            RuntimeValue::Array(inner) if depth >= 1.0 => {
                let inner = inner.borrow().clone();
                flatten_into(out, &inner, depth - 1.0);
            }
            other => out.push(other.clone()),
        }
    }
}

fn array_flat(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let depth = match arg(&args, 0) {
        RuntimeValue::Undefined => 1.0,
        other => to_integer(&other).min(MAX_JSON_DEPTH as f64),
    };
    let mut out = Vec::new();
    flatten_into(&mut out, &items_of(this)?, depth);
    Ok(RuntimeValue::array(out))
}

fn array_flat_map(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mapped = array_map(interp, this, args)?;
    let mut out = Vec::new();
    flatten_into(&mut out, &items_of(&mapped)?, 1.0);
    Ok(RuntimeValue::array(out))
}

fn array_fill(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let value = arg(&args, 0);
    with_items(this, |items| {
        let len = items.len();
        let start = relative_index(&arg(&args, 1), len, 0);
        let end = relative_index(&arg(&args, 2), len, len);
        for item in items.iter_mut().take(end).skip(start) {
            *item = value.clone();
        }
    })?;
    Ok(this.clone())
}

fn array_at(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let items = items_of(this)?;
    Ok(at_index(&arg(&args, 0), items.len())
        .and_then(|i| items.get(i).cloned())
        .unwrap_or(RuntimeValue::Undefined))
}

/// Index for `at()`: negative counts from the end, out of range is `None`.
fn at_index(value: &RuntimeValue, len: usize) -> Option<usize> {
    let n = to_integer(value);
    let index = if n < 0.0 { len as f64 + n } else { n };
    (index >= 0.0 && index < len as f64).then_some(index as usize)
}

// ---------------------------------------------------------------------------
// String methods
// ---------------------------------------------------------------------------

pub fn string_method(key: &str) -> Option<Method> {
    let method: NativeFn = match key {
        "toUpperCase" => |_, this, _| Ok(RuntimeValue::from(this.to_js_string().to_uppercase())),
        "toLowerCase" => |_, this, _| Ok(RuntimeValue::from(this.to_js_string().to_lowercase())),
        "trim" => |_, this, _| Ok(RuntimeValue::from(this.to_js_string().trim())),
        "trimStart" => |_, this, _| Ok(RuntimeValue::from(this.to_js_string().trim_start())),
        "trimEnd" => |_, this, _| Ok(RuntimeValue::from(this.to_js_string().trim_end())),
        "toString" | "valueOf" => value_to_string,
        "split" => string_split,
        "slice" => string_slice,
        "substring" => string_substring,
        "includes" => string_includes,
        "startsWith" => string_starts_with,
        "endsWith" => string_ends_with,
        "indexOf" => string_index_of,
        "lastIndexOf" => string_last_index_of,
        "replace" => string_replace,
        "replaceAll" => string_replace_all,
        "repeat" => string_repeat,
        "padStart" => |_, this, args| string_pad(this, &args, true),
        "padEnd" => |_, this, args| string_pad(this, &args, false),
        "charAt" => string_char_at,
        "charCodeAt" => string_char_code_at,
        "at" => string_at,
        "concat" => string_concat,
        "localeCompare" => string_locale_compare,
        _ => return None,
    };
    Some((static_name(key), method))
}

fn chars_of(value: &RuntimeValue) -> Vec<char> {
    value.to_js_string().chars().collect()
}

fn from_chars(chars: &[char]) -> RuntimeValue {
    RuntimeValue::from(chars.iter().collect::<String>())
}

/// Character index of the first occurrence of `needle` at or after `from`.
fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn string_split(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let s = this.to_js_string();
    let limit = match arg(&args, 1) {
        RuntimeValue::Undefined => usize::MAX,
        other => crate::evaluator_helpers::to_uint32(&other) as usize,
    };
    let parts: Vec<RuntimeValue> = match arg(&args, 0) {
        RuntimeValue::Undefined => vec![RuntimeValue::from(s)],
        separator => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                s.chars().map(|c| RuntimeValue::from(c.to_string())).collect()
            } else {
                s.split(separator.as_str()).map(RuntimeValue::from).collect()
            }
        }
    };
    Ok(RuntimeValue::array(parts.into_iter().take(limit).collect()))
}

fn string_slice(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let start = relative_index(&arg(&args, 0), chars.len(), 0);
    let end = relative_index(&arg(&args, 1), chars.len(), chars.len());
    Ok(if start < end {
        from_chars(&chars[start..end])
    } else {
        RuntimeValue::from("")
    })
}

fn string_substring(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let len = chars.len() as f64;
    let clamp = |value: RuntimeValue, default: f64| match value {
        RuntimeValue::Undefined => default,
        other => to_integer(&other).clamp(0.0, len),
    };
    let a = clamp(arg(&args, 0), 0.0) as usize;
    let b = clamp(arg(&args, 1), len) as usize;
    Ok(from_chars(&chars[a.min(b)..a.max(b)]))
}

fn string_includes(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(&args, 0));
    let from = to_integer(&arg(&args, 1)).clamp(0.0, chars.len() as f64) as usize;
    Ok(RuntimeValue::Bool(find_chars(&chars, &needle, from).is_some()))
}

fn string_starts_with(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(&args, 0));
    let from = to_integer(&arg(&args, 1)).clamp(0.0, chars.len() as f64) as usize;
    Ok(RuntimeValue::Bool(chars[from..].starts_with(&needle)))
}

fn string_ends_with(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(&args, 0));
    let end = match arg(&args, 1) {
        RuntimeValue::Undefined => chars.len(),
        other => to_integer(&other).clamp(0.0, chars.len() as f64) as usize,
    };
    Ok(RuntimeValue::Bool(chars[..end].ends_with(&needle)))
}

fn string_index_of(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(&args, 0));
    let from = to_integer(&arg(&args, 1)).clamp(0.0, chars.len() as f64) as usize;
    let index = find_chars(&chars, &needle, from);
    Ok(RuntimeValue::Number(index.map_or(-1.0, |i| i as f64)))
}

fn string_last_index_of(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let needle = chars_of(&arg(&args, 0));
    let index = if needle.len() > chars.len() {
        None
    } else {
        (0..=chars.len() - needle.len())
            .rev()
            .find(|&i| chars[i..i + needle.len()] == *needle)
    };
    Ok(RuntimeValue::Number(index.map_or(-1.0, |i| i as f64)))
}

/// Shared by `replace` and `replaceAll`; the replacement may be a function
/// called with `(match, offset, string)`.
fn replace_matches(interp: &mut Interpreter, this: &RuntimeValue, args: &[RuntimeValue], all: bool) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    let pattern = chars_of(&arg(args, 0));
    let replacement = arg(args, 1);
    let mut out = String::new();
    let mut position = 0;
    let mut search_from = 0;
    while let Some(index) = find_chars(&chars, &pattern, search_from) {
        out.extend(&chars[position..index]);
        let matched = from_chars(&chars[index..index + pattern.len()]);
        let text = if replacement.is_callable() {
            interp
                .call(
                    &replacement,
                    vec![matched, RuntimeValue::Number(index as f64), this.clone()],
                )?
                .to_js_string()
        } else {
            replacement.to_js_string()
        };
        out.push_str(&text);
        position = index + pattern.len();
        // An empty pattern matches between every character
        search_from = if pattern.is_empty() { position + 1 } else { position };
        if !all || search_from > chars.len() {
            break;
        }
    }
    out.extend(&chars[position.min(chars.len())..]);
    Ok(RuntimeValue::from(out))
}

fn string_replace(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    replace_matches(interp, this, &args, false)
}

fn string_replace_all(interp: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    replace_matches(interp, this, &args, true)
}

fn string_repeat(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let count = to_integer(&arg(&args, 0));
    if count < 0.0 || count.is_infinite() {
        return Err(RuntimeError::RangeError(format!(
            "Invalid count value: {}",
            number_to_string(count)
        )));
    }
    let s = this.to_js_string();
    if count * s.chars().count() as f64 > MAX_STRING_LENGTH as f64 {
        return Err(RuntimeError::RangeError("Invalid string length".to_string()));
    }
    Ok(RuntimeValue::from(s.repeat(count as usize)))
}

fn string_pad(this: &RuntimeValue, args: &[RuntimeValue], start: bool) -> Result<RuntimeValue, RuntimeError> {
    let s = this.to_js_string();
    let target = to_integer(&arg(args, 0)).max(0.0);
    if target > MAX_STRING_LENGTH as f64 {
        return Err(RuntimeError::RangeError("Invalid string length".to_string()));
    }
    let target = target as usize;
    let fill: Vec<char> = match arg(args, 1) {
        RuntimeValue::Undefined => vec![' '],
        other => other.to_js_string().chars().collect(),
    };
    let len = s.chars().count();
    if target <= len || fill.is_empty() {
        return Ok(RuntimeValue::from(s));
    }
    let padding: String = fill.iter().cycle().take(target - len).collect();
    Ok(RuntimeValue::from(if start {
        padding + &s
    } else {
        s + &padding
    }))
}

fn string_char_at(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let index = to_integer(&arg(&args, 0));
    let c = (index >= 0.0)
        .then(|| this.to_js_string().chars().nth(index as usize))
        .flatten();
    Ok(RuntimeValue::from(c.map(String::from).unwrap_or_default()))
}

fn string_char_code_at(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let index = to_integer(&arg(&args, 0));
    let c = (index >= 0.0)
        .then(|| this.to_js_string().chars().nth(index as usize))
        .flatten();
    Ok(RuntimeValue::Number(c.map_or(f64::NAN, |c| c as u32 as f64)))
}

fn string_at(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let chars = chars_of(this);
    Ok(at_index(&arg(&args, 0), chars.len())
        .map(|i| RuntimeValue::from(chars[i].to_string()))
        .unwrap_or(RuntimeValue::Undefined))
}

fn string_concat(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut s = this.to_js_string();
    for value in &args {
        s.push_str(&value.to_js_string());
    }
    Ok(RuntimeValue::from(s))
}

fn string_locale_compare(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let ordering = this.to_js_string().cmp(&arg(&args, 0).to_js_string());
    Ok(RuntimeValue::Number(match ordering {
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
        Ordering::Greater => 1.0,
    }))
}

// ---------------------------------------------------------------------------
// Number and object methods
// ---------------------------------------------------------------------------

pub fn number_method(key: &str) -> Option<Method> {
    let method: NativeFn = match key {
        "toFixed" => number_to_fixed,
        "toString" => number_to_string_radix,
        "toLocaleString" => number_to_locale_string,
        "valueOf" => |_, this, _| Ok(this.clone()),
        _ => return None,
    };
    Some((static_name(key), method))
}

fn number_to_fixed(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let n = this.to_number();
    let digits = to_integer(&arg(&args, 0));
    if !(0.0..=100.0).contains(&digits) {
        return Err(RuntimeError::RangeError(
            "toFixed() digits argument must be between 0 and 100".to_string(),
        ));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(RuntimeValue::from(number_to_string(n)));
    }
    Ok(RuntimeValue::from(format!("{:.*}", digits as usize, n)))
}

fn number_to_string_radix(_: &mut Interpreter, this: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let n = this.to_number();
    let radix = match arg(&args, 0) {
        RuntimeValue::Undefined => 10,
        other => to_integer(&other) as u32,
    };
    if !(2..=36).contains(&radix) {
        return Err(RuntimeError::RangeError(
            "toString() radix must be between 2 and 36".to_string(),
        ));
    }
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 || n.abs() > 9007199254740991.0 {
        return Ok(RuntimeValue::from(number_to_string(n)));
    }
    let mut magnitude = n.abs() as u64;
    let mut digits = Vec::new();
    loop {
        let digit = (magnitude % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        magnitude /= radix as u64;
        if magnitude == 0 {
            break;
        }
    }
    if n < 0.0 {
        digits.push('-');
    }
    Ok(RuntimeValue::from(digits.iter().rev().collect::<String>()))
}

/// `en-US` style: thousands separators and at most three fraction digits.
fn number_to_locale_string(_: &mut Interpreter, this: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let n = this.to_number();
    if !n.is_finite() {
        return Ok(RuntimeValue::from(if n.is_nan() {
            "NaN"
        } else if n > 0.0 {
            "∞"
        } else {
            "-∞"
        }));
    }
    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let frac_part = frac_part.trim_end_matches('0');
    let sign = if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    Ok(RuntimeValue::from(if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }))
}

pub fn object_method(key: &str) -> Option<Method> {
    let method: NativeFn = match key {
        "hasOwnProperty" => |_, this, args| {
            let key = arg(&args, 0).to_js_string();
            Ok(RuntimeValue::Bool(match this {
                RuntimeValue::Object(object) => object.borrow().contains(&key),
                _ => false,
            }))
        },
        "toString" => value_to_string,
        _ => return None,
    };
    Some((static_name(key), method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_int_prefixes() {
        assert_eq!(parse_int_str("  42px", 0), 42.0);
        assert_eq!(parse_int_str("0x1A", 0), 26.0);
        assert_eq!(parse_int_str("-17", 10), -17.0);
        assert_eq!(parse_int_str("101", 2), 5.0);
        assert!(parse_int_str("px", 10).is_nan());
        assert!(parse_int_str("1", 37).is_nan());
    }

    #[test]
    fn parse_float_prefixes() {
        assert_eq!(parse_float_str("3.25rem"), 3.25);
        assert_eq!(parse_float_str(".5"), 0.5);
        assert_eq!(parse_float_str("1e3x"), 1000.0);
        assert_eq!(parse_float_str("2e"), 2.0);
        assert_eq!(parse_float_str("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float_str("abc").is_nan());
    }

    #[test]
    fn json_numbers_print_like_javascript() {
        assert_eq!(json_number(3.0).to_string(), "3");
        assert_eq!(json_number(0.5).to_string(), "0.5");
        assert_eq!(json_number(f64::NAN).to_string(), "null");
    }

    #[test]
    fn default_sort_order_is_by_string() {
        let mut items = vec![
            RuntimeValue::Number(10.0),
            RuntimeValue::Undefined,
            RuntimeValue::Number(9.0),
        ];
        items.sort_by(default_order);
        let printed: Vec<String> = items.iter().map(|v| v.to_js_string()).collect();
        assert_eq!(printed, vec!["10", "9", "undefined"]);
    }

    #[test]
    fn intrinsic_names_are_all_installed() {
        let interp = Interpreter::new(8);
        for name in INTRINSICS {
            assert!(interp.globals().has_own(name), "{} missing", name);
        }
    }
}
