use thiserror::Error;

use crate::runtime_value::{Object, ObjectKind, RuntimeValue, error_summary};

/// An abrupt completion raised while evaluating code. Internal errors carry
/// the JavaScript error name they surface as; `Thrown` carries whatever a
/// `throw` statement produced.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    #[error("RangeError: {0}")]
    RangeError(String),
    #[error("{}", describe_thrown(.0))]
    Thrown(RuntimeValue),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::TypeError(message.into())
    }

    /// The value a `catch` clause binds.
    pub fn into_value(self) -> RuntimeValue {
        match self {
            RuntimeError::TypeError(message) => error_value("TypeError", &message),
            RuntimeError::ReferenceError(message) => error_value("ReferenceError", &message),
            RuntimeError::RangeError(message) => error_value("RangeError", &message),
            RuntimeError::Thrown(value) => value,
        }
    }
}

fn error_value(name: &str, message: &str) -> RuntimeValue {
    RuntimeValue::object(Object::error(name, message))
}

fn describe_thrown(value: &RuntimeValue) -> String {
    match value {
        RuntimeValue::Object(object) if object.borrow().kind == ObjectKind::Error => {
            error_summary(&object.borrow())
        }
        RuntimeValue::String(s) => s.to_string(),
        other => format!("Uncaught {}", other.to_js_string()),
    }
}

/// Why a lowered expression could not be bound into a component value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The lowered text is not a valid plain expression.
    #[error("{0}")]
    Parse(String),
    /// The expression references a name that is neither its own binding, the
    /// host library, nor a language intrinsic.
    #[error("ReferenceError: {0} is not defined")]
    UndefinedVariable(String),
    /// Evaluating the expression threw.
    #[error("{0}")]
    Evaluation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thrown_error_objects_display_name_and_message() {
        let err = RuntimeError::Thrown(error_value("Error", "boom"));
        assert_eq!(err.to_string(), "Error: boom");
    }

    #[test]
    fn thrown_primitives() {
        assert_eq!(RuntimeError::Thrown(RuntimeValue::from("nope")).to_string(), "nope");
        assert_eq!(
            RuntimeError::Thrown(RuntimeValue::Number(3.0)).to_string(),
            "Uncaught 3"
        );
    }

    #[test]
    fn internal_errors_become_catchable_objects() {
        let value = RuntimeError::type_error("x is not a function").into_value();
        match value {
            RuntimeValue::Object(object) => {
                let object = object.borrow();
                assert_eq!(object.kind, ObjectKind::Error);
                assert_eq!(error_summary(&object), "TypeError: x is not a function");
            }
            other => panic!("expected error object, got {:?}", other),
        }
    }

    #[test]
    fn bind_error_messages() {
        assert_eq!(
            BindError::UndefinedVariable("fetch".into()).to_string(),
            "ReferenceError: fetch is not defined"
        );
    }
}
