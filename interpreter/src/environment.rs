use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::error::RuntimeError;
use crate::runtime_value::RuntimeValue;

/// Result of looking up a variable in the scope chain.
pub enum VariableLookup {
    Found(RuntimeValue),
    /// Declared with `let`/`const` but not yet initialized (temporal dead zone).
    Uninitialized,
    NotFound,
}

#[derive(Debug, Clone)]
struct Binding {
    /// `None` until the declaration is evaluated.
    value: Option<RuntimeValue>,
    mutable: bool,
}

/// A single lexical scope: a function body, a block, a loop iteration or a
/// catch clause.
pub struct Scope {
    variables: RefCell<HashMap<String, Binding>>,
    parent: Option<Rc<Scope>>,
    /// Function scopes receive `var` declarations.
    function_scope: bool,
}

impl Scope {
    fn new(parent: Option<Rc<Scope>>, function_scope: bool) -> Self {
        Scope {
            variables: RefCell::new(HashMap::new()),
            parent,
            function_scope,
        }
    }

    /// Declare a binding without a value. Reads before [`Scope::initialize`]
    /// fail with a `ReferenceError`.
    pub fn declare(&self, name: &str, mutable: bool) {
        self.variables
            .borrow_mut()
            .insert(name.to_string(), Binding { value: None, mutable });
    }

    /// Declare and initialize in one step.
    pub fn define(&self, name: &str, value: RuntimeValue, mutable: bool) {
        self.variables.borrow_mut().insert(
            name.to_string(),
            Binding {
                value: Some(value),
                mutable,
            },
        );
    }

    /// Give a declared binding in this scope its first value. Declares the
    /// binding if it does not exist yet.
    pub fn initialize(&self, name: &str, value: RuntimeValue, mutable: bool) {
        let mut variables = self.variables.borrow_mut();
        match variables.get_mut(name) {
            Some(binding) => {
                binding.value = Some(value);
                binding.mutable = mutable;
            }
            None => {
                variables.insert(
                    name.to_string(),
                    Binding {
                        value: Some(value),
                        mutable,
                    },
                );
            }
        }
    }

    /// Declare a `var` binding in this scope unless it already exists.
    /// Hoisted vars start as `undefined`, not uninitialized.
    pub fn declare_var(&self, name: &str) {
        self.variables
            .borrow_mut()
            .entry(name.to_string())
            .or_insert(Binding {
                value: Some(RuntimeValue::Undefined),
                mutable: true,
            });
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.variables.borrow().contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> VariableLookup {
        if let Some(binding) = self.variables.borrow().get(name) {
            return match &binding.value {
                Some(value) => VariableLookup::Found(value.clone()),
                None => VariableLookup::Uninitialized,
            };
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => VariableLookup::NotFound,
        }
    }

    pub fn get(&self, name: &str) -> Result<RuntimeValue, RuntimeError> {
        match self.lookup(name) {
            VariableLookup::Found(value) => Ok(value),
            VariableLookup::Uninitialized => Err(RuntimeError::ReferenceError(format!(
                "Cannot access '{}' before initialization",
                name
            ))),
            VariableLookup::NotFound => Err(RuntimeError::ReferenceError(format!(
                "{} is not defined",
                name
            ))),
        }
    }

    /// Assign to an existing binding anywhere in the chain.
    pub fn assign(&self, name: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
        {
            let mut variables = self.variables.borrow_mut();
            if let Some(binding) = variables.get_mut(name) {
                if binding.value.is_none() {
                    return Err(RuntimeError::ReferenceError(format!(
                        "Cannot access '{}' before initialization",
                        name
                    )));
                }
                if !binding.mutable {
                    return Err(RuntimeError::TypeError(
                        "Assignment to constant variable.".to_string(),
                    ));
                }
                binding.value = Some(value);
                return Ok(());
            }
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(RuntimeError::ReferenceError(format!(
                "{} is not defined",
                name
            ))),
        }
    }

    /// Nearest enclosing function scope (the scope itself if it is one).
    pub fn function_scope(self: &Rc<Self>) -> Rc<Scope> {
        let mut scope = Rc::clone(self);
        while !scope.function_scope {
            match &scope.parent {
                Some(parent) => scope = Rc::clone(parent),
                None => break,
            }
        }
        scope
    }

    /// Drop every binding. The map is moved out first so no borrow is held
    /// while another scope's destructor runs.
    fn clear(&self) {
        let variables = std::mem::take(&mut *self.variables.borrow_mut());
        drop(variables);
    }
}

/// Owns every scope created during one binding, so closures that capture
/// their own scope (a cycle through `Rc`) can be released together.
pub struct Environment {
    scopes: Vec<Weak<Scope>>,
    prune_at: usize,
}

const INITIAL_PRUNE_AT: usize = 256;

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: Vec::new(),
            prune_at: INITIAL_PRUNE_AT,
        }
    }

    /// Create a scope and register it for cleanup.
    pub fn new_scope(&mut self, parent: Option<&Rc<Scope>>, function_scope: bool) -> Rc<Scope> {
        let scope = Rc::new(Scope::new(parent.cloned(), function_scope));
        self.register(&scope);
        scope
    }

    /// Copy of `scope` with the same parent and fresh bindings holding the
    /// current values, used for per-iteration `for (let ...)` bindings.
    pub fn copy_scope(&mut self, scope: &Rc<Scope>) -> Rc<Scope> {
        let copy = Rc::new(Scope {
            variables: RefCell::new(scope.variables.borrow().clone()),
            parent: scope.parent.clone(),
            function_scope: scope.function_scope,
        });
        self.register(&copy);
        copy
    }

    pub fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|s| s.strong_count() > 0).count()
    }

    fn register(&mut self, scope: &Rc<Scope>) {
        self.scopes.push(Rc::downgrade(scope));
        if self.scopes.len() >= self.prune_at {
            self.scopes.retain(|s| s.strong_count() > 0);
            self.prune_at = (self.scopes.len() * 2).max(INITIAL_PRUNE_AT);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        for scope in self.scopes.iter().filter_map(Weak::upgrade) {
            scope.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let mut env = Environment::new();
        let root = env.new_scope(None, true);
        root.define("a", RuntimeValue::Number(1.0), true);
        let child = env.new_scope(Some(&root), false);
        assert!(matches!(child.lookup("a"), VariableLookup::Found(RuntimeValue::Number(n)) if n == 1.0));
        assert!(matches!(child.lookup("b"), VariableLookup::NotFound));
    }

    #[test]
    fn temporal_dead_zone() {
        let mut env = Environment::new();
        let scope = env.new_scope(None, true);
        scope.declare("x", true);
        let err = scope.get("x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ReferenceError: Cannot access 'x' before initialization"
        );
        scope.initialize("x", RuntimeValue::Number(2.0), true);
        assert_eq!(scope.get("x").unwrap().to_number(), 2.0);
    }

    #[test]
    fn const_cannot_be_reassigned() {
        let mut env = Environment::new();
        let scope = env.new_scope(None, true);
        scope.define("c", RuntimeValue::Null, false);
        let err = scope.assign("c", RuntimeValue::Bool(true)).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Assignment to constant variable.");
    }

    #[test]
    fn function_scope_skips_blocks() {
        let mut env = Environment::new();
        let func = env.new_scope(None, true);
        let block = env.new_scope(Some(&func), false);
        let inner = env.new_scope(Some(&block), false);
        inner.function_scope().declare_var("v");
        assert!(func.has_own("v"));
        assert!(!block.has_own("v"));
    }

    #[test]
    fn dropping_environment_clears_scopes() {
        let mut env = Environment::new();
        let scope = env.new_scope(None, true);
        scope.define("x", RuntimeValue::Number(1.0), true);
        drop(env);
        assert!(matches!(scope.lookup("x"), VariableLookup::NotFound));
    }

    #[test]
    fn dropping_environment_releases_closure_cycles() {
        use crate::runtime_value::Function;
        use jsx::ast::Expr;
        use jsx::parser::{Parser, Syntax};

        let Ok(Expr::Function(func)) =
            Parser::new("() => 1".to_string(), 0, Syntax::PLAIN).parse_expression()
        else {
            panic!("expected a function expression");
        };
        let mut env = Environment::new();
        let scope = env.new_scope(None, true);
        let closure = Function::Closure {
            func,
            scope: Rc::clone(&scope),
        };
        scope.define("f", RuntimeValue::Function(Rc::new(closure)), false);
        let weak = Rc::downgrade(&scope);
        drop(scope);
        assert!(weak.upgrade().is_some(), "the closure keeps its scope alive");

        drop(env);
        assert!(weak.upgrade().is_none());
    }
}
