use std::rc::Rc;

use jsx::ast::{BindingElement, Pattern, PropertyKey};

use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::evaluator::Interpreter;
use crate::evaluator_helpers::property_key;
use crate::runtime_value::{Object, RuntimeValue};

/// How a destructured name is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Assign to the hoisted `var` binding.
    Var,
    /// Initialize a `let` declared in the target scope.
    Let,
    /// Initialize a `const` declared in the target scope.
    Const,
    /// Define a function parameter.
    Param,
}

/// Collect the names a pattern binds, in source order.
pub fn bound_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Ident(ident) => names.push(ident.name.clone()),
        Pattern::Object { properties, rest } => {
            for property in properties {
                bound_names(&property.value.pattern, names);
            }
            if let Some(rest) = rest {
                names.push(rest.name.clone());
            }
        }
        Pattern::Array { elements, rest } => {
            for element in elements.iter().flatten() {
                bound_names(&element.pattern, names);
            }
            if let Some(rest) = rest {
                bound_names(rest, names);
            }
        }
    }
}

/// Destructure `value` into `pattern`, binding every name in `scope`.
pub fn bind_pattern(
    interp: &mut Interpreter,
    pattern: &Pattern,
    value: RuntimeValue,
    scope: &Rc<Scope>,
    mode: BindingMode,
) -> Result<(), RuntimeError> {
    match pattern {
        Pattern::Ident(ident) => {
            match mode {
                BindingMode::Var => scope.assign(&ident.name, value)?,
                BindingMode::Let => scope.initialize(&ident.name, value, true),
                BindingMode::Const => scope.initialize(&ident.name, value, false),
                BindingMode::Param => scope.define(&ident.name, value, true),
            }
            Ok(())
        }
        Pattern::Object { properties, rest } => {
            if value.is_nullish() {
                return Err(RuntimeError::type_error(format!(
                    "Cannot destructure '{}' as it is {}.",
                    value.to_js_string(),
                    value.to_js_string()
                )));
            }
            let mut used = Vec::with_capacity(properties.len());
            for property in properties {
                let key = match &property.key {
                    PropertyKey::Named(name) => name.clone(),
                    PropertyKey::Computed(expr) => property_key(&interp.eval_expr(expr, scope)?),
                };
                let item = interp.get_property(&value, &key)?;
                bind_element(interp, &property.value, item, scope, mode)?;
                used.push(key);
            }
            if let Some(rest) = rest {
                let remaining: Object = own_entries(&value)
                    .into_iter()
                    .filter(|(key, _)| !used.contains(key))
                    .collect();
                bind_pattern(
                    interp,
                    &Pattern::Ident(rest.clone()),
                    RuntimeValue::object(remaining),
                    scope,
                    mode,
                )?;
            }
            Ok(())
        }
        Pattern::Array { elements, rest } => {
            let items = iterate(&value)?;
            let mut items = items.into_iter();
            for element in elements {
                let item = items.next().unwrap_or(RuntimeValue::Undefined);
                if let Some(element) = element {
                    bind_element(interp, element, item, scope, mode)?;
                }
            }
            if let Some(rest) = rest {
                let remaining = RuntimeValue::array(items.collect());
                bind_pattern(interp, rest, remaining, scope, mode)?;
            }
            Ok(())
        }
    }
}

/// Bind one element, substituting its default when the value is `undefined`.
pub fn bind_element(
    interp: &mut Interpreter,
    element: &BindingElement,
    value: RuntimeValue,
    scope: &Rc<Scope>,
    mode: BindingMode,
) -> Result<(), RuntimeError> {
    let value = match (&value, &element.default) {
        (RuntimeValue::Undefined, Some(default)) => interp.eval_expr(default, scope)?,
        _ => value,
    };
    bind_pattern(interp, &element.pattern, value, scope, mode)
}

/// Items produced by iterating a value with `for...of`, spread or array
/// destructuring.
pub fn iterate(value: &RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match value {
        RuntimeValue::Array(items) => Ok(items.borrow().clone()),
        RuntimeValue::String(s) => Ok(s.chars().map(|c| RuntimeValue::from(c.to_string())).collect()),
        other => Err(RuntimeError::type_error(format!(
            "{} is not iterable",
            other.to_js_string()
        ))),
    }
}

/// Own enumerable string-keyed entries, as used by object spread and rest.
pub fn own_entries(value: &RuntimeValue) -> Vec<(String, RuntimeValue)> {
    match value {
        RuntimeValue::Object(object) => object.borrow().entries().to_vec(),
        RuntimeValue::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        RuntimeValue::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), RuntimeValue::from(c.to_string())))
            .collect(),
        RuntimeValue::Element(element) => vec![
            ("type".to_string(), element.element_type.clone()),
            (
                "key".to_string(),
                element
                    .key
                    .as_deref()
                    .map(RuntimeValue::from)
                    .unwrap_or(RuntimeValue::Null),
            ),
            ("props".to_string(), RuntimeValue::Object(Rc::clone(&element.props))),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsx::ast::Ident;

    fn ident(name: &str) -> Pattern {
        Pattern::Ident(Ident::new(name, 0..0))
    }

    #[test]
    fn names_in_nested_patterns() {
        let pattern = Pattern::Array {
            elements: vec![
                Some(BindingElement {
                    pattern: ident("a"),
                    default: None,
                }),
                None,
                Some(BindingElement {
                    pattern: Pattern::Object {
                        properties: vec![],
                        rest: Some(Ident::new("rest", 0..0)),
                    },
                    default: None,
                }),
            ],
            rest: Some(Box::new(ident("tail"))),
        };
        let mut names = Vec::new();
        bound_names(&pattern, &mut names);
        assert_eq!(names, vec!["a", "rest", "tail"]);
    }

    #[test]
    fn strings_iterate_by_character() {
        let items = iterate(&RuntimeValue::from("hé")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].to_js_string(), "é");
        assert!(iterate(&RuntimeValue::Number(1.0)).is_err());
    }
}
