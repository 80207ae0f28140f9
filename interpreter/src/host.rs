//! The host rendering library handed to bound code as its only parameter.
//!
//! Elements are plain data. Hooks follow single-pass static rendering:
//! state is its initial value, setters and effects never run.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::evaluator::Interpreter;
use crate::runtime_value::{Element, FRAGMENT, NativeFn, Object, RuntimeValue};

/// Build a fresh `React` object.
pub fn react() -> RuntimeValue {
    let mut react = Object::new();
    react.set("Fragment", RuntimeValue::Symbol(FRAGMENT));
    let functions: [(&'static str, NativeFn); 10] = [
        ("createElement", create_element),
        ("isValidElement", |_, _, args| {
            Ok(RuntimeValue::Bool(matches!(args.first(), Some(RuntimeValue::Element(_)))))
        }),
        ("useState", use_state),
        ("useReducer", use_reducer),
        ("useMemo", use_memo),
        ("useCallback", |_, _, args| Ok(args.into_iter().next().unwrap_or(RuntimeValue::Undefined))),
        ("useRef", use_ref),
        ("useEffect", inert),
        ("useLayoutEffect", inert),
        ("useId", |_, _, _| Ok(RuntimeValue::from(":r0:"))),
    ];
    for (name, call) in functions {
        react.set(name, RuntimeValue::native(name, call));
    }
    RuntimeValue::object(react)
}

/// `createElement(type, props, ...children)`. `key` and `ref` are taken out
/// of the props; one child is stored as is, several as an array.
fn create_element(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut args = args.into_iter();
    let element_type = args.next().unwrap_or(RuntimeValue::Undefined);
    let config = args.next().unwrap_or(RuntimeValue::Null);
    let children: Vec<RuntimeValue> = args.collect();

    let mut props = Object::new();
    let mut key = None;
    match &config {
        RuntimeValue::Object(object) => {
            for (name, value) in object.borrow().entries() {
                match name.as_str() {
                    "key" => {
                        if !value.is_nullish() {
                            key = Some(value.to_js_string());
                        }
                    }
                    "ref" => {}
                    _ => props.set(name, value.clone()),
                }
            }
        }
        RuntimeValue::Undefined | RuntimeValue::Null => {}
        other => {
            return Err(RuntimeError::type_error(format!(
                "createElement props must be an object, got {}",
                other.type_of()
            )));
        }
    }
    match children.len() {
        0 => {}
        1 => {
            if let Some(child) = children.into_iter().next() {
                props.set("children", child);
            }
        }
        _ => props.set("children", RuntimeValue::array(children)),
    }
    Ok(RuntimeValue::Element(Rc::new(Element {
        element_type,
        props: Rc::new(RefCell::new(props)),
        key,
    })))
}

fn inert(_: &mut Interpreter, _: &RuntimeValue, _: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    Ok(RuntimeValue::Undefined)
}

fn use_state(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let initial = args.into_iter().next().unwrap_or(RuntimeValue::Undefined);
    let value = if initial.is_callable() {
        interp.call(&initial, Vec::new())?
    } else {
        initial
    };
    Ok(RuntimeValue::array(vec![
        value,
        RuntimeValue::native("setState", inert),
    ]))
}

fn use_reducer(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut args = args.into_iter();
    let _reducer = args.next();
    let initial = args.next().unwrap_or(RuntimeValue::Undefined);
    let state = match args.next() {
        Some(init) if init.is_callable() => interp.call(&init, vec![initial])?,
        _ => initial,
    };
    Ok(RuntimeValue::array(vec![
        state,
        RuntimeValue::native("dispatch", inert),
    ]))
}

fn use_memo(interp: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    match args.first() {
        Some(factory) if factory.is_callable() => interp.call(factory, Vec::new()),
        _ => Err(RuntimeError::type_error("useMemo requires a function")),
    }
}

fn use_ref(_: &mut Interpreter, _: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
    let mut current = Object::new();
    current.set(
        "current",
        args.into_iter().next().unwrap_or(RuntimeValue::Undefined),
    );
    Ok(RuntimeValue::object(current))
}
