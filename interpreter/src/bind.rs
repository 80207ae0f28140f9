use std::rc::Rc;

use jsx::LoweredCode;
use jsx::ast::{self, BindingElement, Expr, FunctionBody, Ident, Pattern};
use jsx::parser::{Parser, Syntax};
use tracing::debug;

use crate::builtins::INTRINSICS;
use crate::error::{BindError, RuntimeError};
use crate::evaluator::{DEFAULT_MAX_CALL_DEPTH, Interpreter};
use crate::host;
use crate::resolve::first_free_variable;
use crate::runtime_value::RuntimeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Nested calls allowed before a `RangeError` is raised.
    pub max_call_depth: usize,
}

impl Default for BindOptions {
    fn default() -> Self {
        BindOptions {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// The value a lowered expression evaluated to, together with the
/// interpreter that owns its closures.
pub struct ComponentValue {
    value: RuntimeValue,
    interpreter: Interpreter,
}

impl ComponentValue {
    pub fn value(&self) -> &RuntimeValue {
        &self.value
    }

    /// Whether the value can be invoked as a component factory.
    pub fn is_factory(&self) -> bool {
        self.value.is_callable()
    }

    /// Call the factory with no arguments.
    pub fn invoke(&mut self) -> Result<RuntimeValue, RuntimeError> {
        let value = self.value.clone();
        self.interpreter.call(&value, Vec::new())
    }

    /// Call any function value produced by this binding, e.g. a function
    /// component found in the rendered tree.
    pub fn call(&mut self, function: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
        self.interpreter.call(function, args)
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl std::fmt::Debug for ComponentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentValue")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

pub fn bind(lowered: &LoweredCode) -> Result<ComponentValue, BindError> {
    bind_with(lowered, &BindOptions::default())
}

/// Evaluate lowered code as the body of `(React) => <expression>` and call
/// it once with a fresh host library object.
pub fn bind_with(lowered: &LoweredCode, options: &BindOptions) -> Result<ComponentValue, BindError> {
    let expr = Parser::new(lowered.as_str().to_string(), 0, Syntax::PLAIN)
        .parse_expression()
        .map_err(|e| BindError::Parse(format!("invalid lowered code: {}", e.message)))?;

    let wrapper = Rc::new(ast::Function {
        name: None,
        params: vec![BindingElement {
            pattern: Pattern::Ident(Ident::new(jsx::HOST_SYMBOL, 0..0)),
            default: None,
        }],
        rest: None,
        body: FunctionBody::Expr(Box::new(expr)),
        arrow: true,
    });
    let wrapper_expr = Expr::Function(Rc::clone(&wrapper));
    if let Some(name) = first_free_variable(&wrapper_expr, INTRINSICS) {
        debug!(name = %name, "bind rejected free variable");
        return Err(BindError::UndefinedVariable(name));
    }

    let mut interpreter = Interpreter::new(options.max_call_depth);
    let globals = Rc::clone(interpreter.globals());
    let factory = interpreter.closure(wrapper, &globals);
    match interpreter.call(&factory, vec![host::react()]) {
        Ok(value) => {
            debug!(kind = value.type_of(), callable = value.is_callable(), "bound component value");
            Ok(ComponentValue { value, interpreter })
        }
        Err(e) => {
            debug!(error = %e, "bind evaluation failed");
            Err(BindError::Evaluation(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind_source(source: &str) -> Result<ComponentValue, BindError> {
        let lowered = jsx::transform(source).expect("transform failed");
        bind(&lowered)
    }

    #[test]
    fn arrow_binds_to_factory() {
        let mut component = bind_source("() => (<div>Hello</div>)").unwrap();
        assert!(component.is_factory());
        assert!(matches!(component.invoke().unwrap(), RuntimeValue::Element(_)));
    }

    #[test]
    fn number_binds_to_non_factory() {
        let component = bind_source("42").unwrap();
        assert!(!component.is_factory());
        assert_eq!(component.value().to_number(), 42.0);
    }

    #[test]
    fn free_identifiers_are_rejected() {
        let err = bind_source("() => <p>{document.title}</p>").unwrap_err();
        assert_eq!(err, BindError::UndefinedVariable("document".to_string()));
    }

    #[test]
    fn evaluation_errors_are_reported() {
        let err = bind_source("(() => { throw new Error('at bind') })()").unwrap_err();
        assert_eq!(err, BindError::Evaluation("Error: at bind".to_string()));
    }
}
