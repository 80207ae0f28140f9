use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jsx::ast;

use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::evaluator::Interpreter;

/// Signature of host-implemented functions. The second argument is the
/// receiver the function was read from (`"abc"` in `"abc".toUpperCase()`),
/// or `undefined` for free functions.
pub type NativeFn =
    fn(&mut Interpreter, &RuntimeValue, Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError>;

/// A runtime value produced by evaluating an expression.
#[derive(Clone)]
pub enum RuntimeValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<RuntimeValue>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Function>),
    /// An element produced by the host's `createElement`.
    Element(Rc<Element>),
    /// Well-known symbol, e.g. `React.Fragment`.
    Symbol(&'static str),
}

pub const FRAGMENT: &str = "react.fragment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    /// Created by `Error`, `TypeError` or `RangeError`.
    Error,
}

/// An object with string keys in insertion order.
#[derive(Debug, Clone)]
pub struct Object {
    pub kind: ObjectKind,
    /// Set by `Object.freeze`; writes are ignored.
    pub frozen: bool,
    properties: Vec<(String, RuntimeValue)>,
}

impl Object {
    pub fn new() -> Self {
        Object {
            kind: ObjectKind::Plain,
            frozen: false,
            properties: Vec::new(),
        }
    }

    pub fn error(name: &str, message: &str) -> Self {
        let mut object = Object {
            kind: ObjectKind::Error,
            frozen: false,
            properties: Vec::new(),
        };
        object.set("name", RuntimeValue::from(name));
        object.set("message", RuntimeValue::from(message));
        object
    }

    pub fn get(&self, key: &str) -> Option<&RuntimeValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, key: &str, value: RuntimeValue) {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RuntimeValue> {
        let index = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(index).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn entries(&self) -> &[(String, RuntimeValue)] {
        &self.properties
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(k, _)| k.as_str())
    }
}

impl Default for Object {
    fn default() -> Self {
        Object::new()
    }
}

impl FromIterator<(String, RuntimeValue)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, RuntimeValue)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.set(&key, value);
        }
        object
    }
}

pub enum Function {
    /// A function written in the bound source, closed over its defining scope.
    Closure {
        func: Rc<ast::Function>,
        scope: Rc<Scope>,
    },
    /// A host function. `receiver` is set when the function was read as a
    /// method of a value.
    Native {
        name: &'static str,
        call: NativeFn,
        receiver: Option<RuntimeValue>,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Closure { func, .. } => {
                func.name.as_ref().map(|n| n.name.as_str()).unwrap_or("")
            }
            Function::Native { name, .. } => name,
        }
    }
}

/// A host element: `{ type, props, key }`. Children live in `props.children`.
pub struct Element {
    /// A tag name string, a component function, or the fragment symbol.
    pub element_type: RuntimeValue,
    pub props: Rc<RefCell<Object>>,
    pub key: Option<String>,
}

impl RuntimeValue {
    pub fn native(name: &'static str, call: NativeFn) -> Self {
        RuntimeValue::Function(Rc::new(Function::Native {
            name,
            call,
            receiver: None,
        }))
    }

    pub fn method(name: &'static str, call: NativeFn, receiver: RuntimeValue) -> Self {
        RuntimeValue::Function(Rc::new(Function::Native {
            name,
            call,
            receiver: Some(receiver),
        }))
    }

    pub fn array(items: Vec<RuntimeValue>) -> Self {
        RuntimeValue::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: Object) -> Self {
        RuntimeValue::Object(Rc::new(RefCell::new(object)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Undefined | RuntimeValue::Null => false,
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RuntimeValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, RuntimeValue::Undefined | RuntimeValue::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, RuntimeValue::Function(_))
    }

    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            RuntimeValue::Undefined => "undefined",
            RuntimeValue::Null => "object",
            RuntimeValue::Bool(_) => "boolean",
            RuntimeValue::Number(_) => "number",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Array(_) | RuntimeValue::Object(_) | RuntimeValue::Element(_) => "object",
            RuntimeValue::Function(_) => "function",
            RuntimeValue::Symbol(_) => "symbol",
        }
    }

    /// JavaScript `ToString`.
    pub fn to_js_string(&self) -> String {
        match self {
            RuntimeValue::Undefined => "undefined".to_string(),
            RuntimeValue::Null => "null".to_string(),
            RuntimeValue::Bool(b) => b.to_string(),
            RuntimeValue::Number(n) => number_to_string(*n),
            RuntimeValue::String(s) => s.to_string(),
            RuntimeValue::Array(items) => items
                .borrow()
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            RuntimeValue::Object(object) => {
                let object = object.borrow();
                match object.kind {
                    ObjectKind::Error => error_summary(&object),
                    ObjectKind::Plain => "[object Object]".to_string(),
                }
            }
            RuntimeValue::Function(f) => format!("function {}() {{ [code] }}", f.name()),
            RuntimeValue::Element(_) => "[object Object]".to_string(),
            RuntimeValue::Symbol(name) => format!("Symbol({})", name),
        }
    }

    /// JavaScript `ToNumber`.
    pub fn to_number(&self) -> f64 {
        match self {
            RuntimeValue::Undefined => f64::NAN,
            RuntimeValue::Null => 0.0,
            RuntimeValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            RuntimeValue::Number(n) => *n,
            RuntimeValue::String(s) => string_to_number(s),
            RuntimeValue::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// Borrow a string value without conversion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(Rc::from(s))
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::String(Rc::from(s))
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Bool(b)
    }
}

/// `"TypeError: message"` for error objects.
pub fn error_summary(object: &Object) -> String {
    let name = object
        .get("name")
        .map(|v| v.to_js_string())
        .unwrap_or_else(|| "Error".to_string());
    match object.get("message").map(|v| v.to_js_string()) {
        Some(message) if !message.is_empty() => format!("{}: {}", name, message),
        _ => name,
    }
}

/// JavaScript `Number.prototype.toString()` for radix 10.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        if n.fract() == 0.0 {
            format!("{:.0}", n)
        } else {
            format!("{}", n)
        }
    } else {
        // Rust prints `1e21` and `1.5e-7`; JavaScript wants an explicit `+`.
        let s = format!("{:e}", n);
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        }
    }
}

/// JavaScript `StringToNumber`: surrounding whitespace is ignored, the empty
/// string is zero, anything unparsable is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let radix = match unsigned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        // Signed radix literals are NaN
        if negative || s.starts_with('+') {
            return f64::NAN;
        }
        return u64::from_str_radix(&unsigned[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    let magnitude = if unsigned == "Infinity" {
        f64::INFINITY
    } else if unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        unsigned.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    };
    if negative { -magnitude } else { magnitude }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::String(s) => write!(f, "{:?}", s),
            RuntimeValue::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            RuntimeValue::Object(object) => {
                let object = object.borrow();
                f.debug_map()
                    .entries(object.entries().iter().map(|(k, v)| (k, v)))
                    .finish()
            }
            RuntimeValue::Function(func) => write!(f, "[Function {}]", func.name()),
            RuntimeValue::Element(element) => f
                .debug_struct("Element")
                .field("type", &element.element_type)
                .field("key", &element.key)
                .finish_non_exhaustive(),
            other => f.write_str(&other.to_js_string()),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_like_javascript() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(123456789012.0), "123456789012");
    }

    #[test]
    fn strings_convert_to_numbers() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::from("").is_truthy());
        assert!(!RuntimeValue::Number(f64::NAN).is_truthy());
        assert!(RuntimeValue::array(vec![]).is_truthy());
        assert!(RuntimeValue::from("0").is_truthy());
    }

    #[test]
    fn arrays_join_with_commas() {
        let value = RuntimeValue::array(vec![
            RuntimeValue::Number(1.0),
            RuntimeValue::Null,
            RuntimeValue::from("x"),
        ]);
        assert_eq!(value.to_js_string(), "1,,x");
    }

    #[test]
    fn object_keeps_insertion_order() {
        let mut object = Object::new();
        object.set("b", RuntimeValue::Number(1.0));
        object.set("a", RuntimeValue::Number(2.0));
        object.set("b", RuntimeValue::Number(3.0));
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(object.get("b").map(|v| v.to_number()), Some(3.0));
    }
}
