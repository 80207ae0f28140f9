use std::rc::Rc;

use jsx::ast::{
    self, AssignOp, Expr, ExprOrSpread, LogicalOp, MemberProperty, Property, PropertyKey, UnaryOp,
    UpdateOp,
};

use crate::builtins;
use crate::environment::{Environment, Scope, VariableLookup};
use crate::error::RuntimeError;
use crate::evaluator_helpers::{array_index, array_length, binary, property_key, to_int32};
use crate::pattern::{self, BindingMode, iterate, own_entries};
use crate::runtime_value::{Function, Object, RuntimeValue};

/// Default limit on nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Tree-walking evaluator. Owns every scope it creates and the global scope
/// holding the language intrinsics.
pub struct Interpreter {
    env: Environment,
    globals: Rc<Scope>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new(max_call_depth: usize) -> Self {
        let mut env = Environment::new();
        let globals = env.new_scope(None, true);
        builtins::install(&globals);
        Interpreter {
            env,
            globals,
            call_depth: 0,
            max_call_depth,
        }
    }

    pub fn globals(&self) -> &Rc<Scope> {
        &self.globals
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn new_scope(&mut self, parent: &Rc<Scope>, function_scope: bool) -> Rc<Scope> {
        self.env.new_scope(Some(parent), function_scope)
    }

    pub(crate) fn copy_scope(&mut self, scope: &Rc<Scope>) -> Rc<Scope> {
        self.env.copy_scope(scope)
    }

    /// Close `func` over `scope`.
    pub fn closure(&self, func: Rc<ast::Function>, scope: &Rc<Scope>) -> RuntimeValue {
        RuntimeValue::Function(Rc::new(Function::Closure {
            func,
            scope: Rc::clone(scope),
        }))
    }

    pub fn eval_expr(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(RuntimeValue::Number(*n)),
            Expr::String(s) => Ok(RuntimeValue::from(s.as_str())),
            Expr::Bool(b) => Ok(RuntimeValue::Bool(*b)),
            Expr::Null => Ok(RuntimeValue::Null),
            Expr::Template(template) => {
                let mut out = String::new();
                for (i, quasi) in template.quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = template.exprs.get(i) {
                        out.push_str(&self.eval_expr(expr, scope)?.to_js_string());
                    }
                }
                Ok(RuntimeValue::from(out))
            }
            Expr::Ident(ident) => scope.get(&ident.name),
            Expr::Array(elements) => self.eval_array(elements, scope),
            Expr::Object(properties) => self.eval_object(properties, scope),
            Expr::Function(func) => Ok(self.closure(Rc::clone(func), scope)),
            Expr::Unary { op, arg } => self.eval_unary(*op, arg, scope),
            Expr::Update { op, prefix, target } => self.eval_update(*op, *prefix, target, scope),
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left, scope)?;
                let right = self.eval_expr(right, scope)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval_expr(left, scope)?;
                if short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval_expr(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, scope)?.is_truthy() {
                    self.eval_expr(consequent, scope)
                } else {
                    self.eval_expr(alternate, scope)
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, scope),
            Expr::Member { .. } | Expr::Call { .. } => {
                Ok(self.eval_chain(expr, scope)?.unwrap_or(RuntimeValue::Undefined))
            }
            Expr::New { callee, args } => self.eval_new(callee, args, scope),
            Expr::Jsx(_) => Err(RuntimeError::type_error(
                "JSX must be lowered before evaluation",
            )),
        }
    }

    /// Evaluate a member/call chain. `None` means an optional link
    /// short-circuited and the whole chain is `undefined`.
    fn eval_chain(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Option<RuntimeValue>, RuntimeError> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(target) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, scope)?;
                self.get_property(&target, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let Some(function) = self.eval_chain(callee, scope)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_args(args, scope)?;
                if !function.is_callable() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not a function",
                        describe_callee(callee)
                    )));
                }
                self.call(&function, args).map(Some)
            }
            other => self.eval_expr(other, scope).map(Some),
        }
    }

    fn member_key(&mut self, property: &MemberProperty, scope: &Rc<Scope>) -> Result<String, RuntimeError> {
        match property {
            MemberProperty::Named(name) => Ok(name.clone()),
            MemberProperty::Computed(expr) => Ok(property_key(&self.eval_expr(expr, scope)?)),
        }
    }

    fn eval_args(&mut self, args: &[ExprOrSpread], scope: &Rc<Scope>) -> Result<Vec<RuntimeValue>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                ExprOrSpread::Expr(expr) => values.push(self.eval_expr(expr, scope)?),
                ExprOrSpread::Spread(expr) => {
                    let spread = self.eval_expr(expr, scope)?;
                    values.extend(iterate(&spread)?);
                }
                ExprOrSpread::Hole => values.push(RuntimeValue::Undefined),
            }
        }
        Ok(values)
    }

    fn eval_array(&mut self, elements: &[ExprOrSpread], scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        Ok(RuntimeValue::array(self.eval_args(elements, scope)?))
    }

    fn eval_object(&mut self, properties: &[Property], scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        let mut object = Object::new();
        for property in properties {
            match property {
                Property::KeyValue { key, value } => {
                    let key = match key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(expr) => property_key(&self.eval_expr(expr, scope)?),
                    };
                    let value = self.eval_expr(value, scope)?;
                    object.set(&key, value);
                }
                Property::Shorthand(ident) => object.set(&ident.name, scope.get(&ident.name)?),
                Property::Spread(expr) => {
                    let source = self.eval_expr(expr, scope)?;
                    for (key, value) in own_entries(&source) {
                        object.set(&key, value);
                    }
                }
            }
        }
        Ok(RuntimeValue::object(object))
    }

    fn eval_unary(&mut self, op: UnaryOp, arg: &Expr, scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        if let (UnaryOp::TypeOf, Expr::Ident(ident)) = (op, arg) {
            // `typeof` tolerates names that were never declared
            if let VariableLookup::NotFound = scope.lookup(&ident.name) {
                return Ok(RuntimeValue::from("undefined"));
            }
        }
        let value = self.eval_expr(arg, scope)?;
        Ok(match op {
            UnaryOp::Not => RuntimeValue::Bool(!value.is_truthy()),
            UnaryOp::Negate => RuntimeValue::Number(-value.to_number()),
            UnaryOp::Plus => RuntimeValue::Number(value.to_number()),
            UnaryOp::BitNot => RuntimeValue::Number(!to_int32(&value) as f64),
            UnaryOp::TypeOf => RuntimeValue::from(value.type_of()),
            UnaryOp::Void => RuntimeValue::Undefined,
        })
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr, scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        let reference = self.reference(target, scope)?;
        let old = self.read_reference(&reference, scope)?.to_number();
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.write_reference(&reference, RuntimeValue::Number(new), scope)?;
        Ok(RuntimeValue::Number(if prefix { new } else { old }))
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        let reference = self.reference(target, scope)?;
        let value = match op {
            AssignOp::Assign => self.eval_expr(value, scope)?,
            AssignOp::Binary(op) => {
                let current = self.read_reference(&reference, scope)?;
                let right = self.eval_expr(value, scope)?;
                binary(op, &current, &right)?
            }
            AssignOp::Logical(op) => {
                let current = self.read_reference(&reference, scope)?;
                if short_circuits(op, &current) {
                    return Ok(current);
                }
                self.eval_expr(value, scope)?
            }
        };
        self.write_reference(&reference, value.clone(), scope)?;
        Ok(value)
    }

    fn reference(&mut self, target: &Expr, scope: &Rc<Scope>) -> Result<Reference, RuntimeError> {
        match target {
            Expr::Ident(ident) => Ok(Reference::Variable(ident.name.clone())),
            Expr::Member {
                object,
                property,
                optional: false,
            } => {
                let object = self.eval_expr(object, scope)?;
                let key = self.member_key(property, scope)?;
                Ok(Reference::Property(object, key))
            }
            _ => Err(RuntimeError::type_error("Invalid left-hand side in assignment")),
        }
    }

    fn read_reference(&mut self, reference: &Reference, scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        match reference {
            Reference::Variable(name) => scope.get(name),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn write_reference(&mut self, reference: &Reference, value: RuntimeValue, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        match reference {
            Reference::Variable(name) => scope.assign(name, value),
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }

    fn eval_new(&mut self, callee: &Expr, args: &[ExprOrSpread], scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        let constructor = self.eval_expr(callee, scope)?;
        let args = self.eval_args(args, scope)?;
        match &constructor {
            RuntimeValue::Function(function)
                if matches!(&**function, Function::Native { name, .. } if builtins::is_constructor(name)) =>
            {
                self.call(&constructor, args)
            }
            _ => Err(RuntimeError::type_error(format!(
                "{} is not a constructor",
                describe_callee(callee)
            ))),
        }
    }

    /// Call a function value with already evaluated arguments.
    pub fn call(&mut self, function: &RuntimeValue, args: Vec<RuntimeValue>) -> Result<RuntimeValue, RuntimeError> {
        let RuntimeValue::Function(f) = function else {
            return Err(RuntimeError::type_error(format!(
                "{} is not a function",
                function.to_js_string()
            )));
        };
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::RangeError(
                "Maximum call stack size exceeded".to_string(),
            ));
        }
        self.call_depth += 1;
        let result = match &**f {
            Function::Closure { func, scope } => self.call_closure(function, func, scope, args),
            Function::Native { call, receiver, .. } => {
                let receiver = receiver.clone().unwrap_or(RuntimeValue::Undefined);
                call(self, &receiver, args)
            }
        };
        self.call_depth -= 1;
        result
    }

    fn call_closure(
        &mut self,
        this_function: &RuntimeValue,
        func: &Rc<ast::Function>,
        closure_scope: &Rc<Scope>,
        args: Vec<RuntimeValue>,
    ) -> Result<RuntimeValue, RuntimeError> {
        let parent = match (&func.name, func.arrow) {
            (Some(name), false) => {
                let named = self.new_scope(closure_scope, false);
                named.define(&name.name, this_function.clone(), false);
                named
            }
            _ => Rc::clone(closure_scope),
        };
        let scope = self.new_scope(&parent, true);
        let mut args = args.into_iter();
        for param in &func.params {
            let value = args.next().unwrap_or(RuntimeValue::Undefined);
            pattern::bind_element(self, param, value, &scope, BindingMode::Param)?;
        }
        if let Some(rest) = &func.rest {
            let rest_value = RuntimeValue::array(args.collect());
            pattern::bind_pattern(self, rest, rest_value, &scope, BindingMode::Param)?;
        }
        match &func.body {
            ast::FunctionBody::Expr(expr) => self.eval_expr(expr, &scope),
            ast::FunctionBody::Block(stmts) => self.exec_function_body(stmts, &scope),
        }
    }

    /// Read `target[key]`.
    pub fn get_property(&mut self, target: &RuntimeValue, key: &str) -> Result<RuntimeValue, RuntimeError> {
        let value = match target {
            RuntimeValue::Undefined | RuntimeValue::Null => {
                return Err(RuntimeError::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    target.to_js_string(),
                    key
                )));
            }
            RuntimeValue::String(s) => {
                if key == "length" {
                    RuntimeValue::Number(s.chars().count() as f64)
                } else if let Some(index) = array_index(key) {
                    s.chars()
                        .nth(index)
                        .map(|c| RuntimeValue::from(c.to_string()))
                        .unwrap_or(RuntimeValue::Undefined)
                } else {
                    builtins::string_method(key)
                        .map(|(name, f)| RuntimeValue::method(name, f, target.clone()))
                        .unwrap_or(RuntimeValue::Undefined)
                }
            }
            RuntimeValue::Array(items) => {
                if key == "length" {
                    RuntimeValue::Number(items.borrow().len() as f64)
                } else if let Some(index) = array_index(key) {
                    items
                        .borrow()
                        .get(index)
                        .cloned()
                        .unwrap_or(RuntimeValue::Undefined)
                } else {
                    builtins::array_method(key)
                        .map(|(name, f)| RuntimeValue::method(name, f, target.clone()))
                        .unwrap_or(RuntimeValue::Undefined)
                }
            }
            RuntimeValue::Object(object) => match object.borrow().get(key) {
                Some(value) => value.clone(),
                None => builtins::object_method(key)
                    .map(|(name, f)| RuntimeValue::method(name, f, target.clone()))
                    .unwrap_or(RuntimeValue::Undefined),
            },
            RuntimeValue::Number(_) => builtins::number_method(key)
                .map(|(name, f)| RuntimeValue::method(name, f, target.clone()))
                .unwrap_or(RuntimeValue::Undefined),
            RuntimeValue::Bool(_) | RuntimeValue::Symbol(_) => match key {
                "toString" => RuntimeValue::method("toString", builtins::value_to_string, target.clone()),
                _ => RuntimeValue::Undefined,
            },
            RuntimeValue::Function(function) => match key {
                "name" => RuntimeValue::from(function.name()),
                _ => builtins::static_member(function.name(), key).unwrap_or(RuntimeValue::Undefined),
            },
            RuntimeValue::Element(element) => match key {
                "type" => element.element_type.clone(),
                "props" => RuntimeValue::Object(Rc::clone(&element.props)),
                "key" => element
                    .key
                    .as_deref()
                    .map(RuntimeValue::from)
                    .unwrap_or(RuntimeValue::Null),
                _ => RuntimeValue::Undefined,
            },
        };
        Ok(value)
    }

    /// Write `target[key] = value`.
    pub fn set_property(&mut self, target: &RuntimeValue, key: &str, value: RuntimeValue) -> Result<(), RuntimeError> {
        match target {
            RuntimeValue::Undefined | RuntimeValue::Null => Err(RuntimeError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_js_string(),
                key
            ))),
            RuntimeValue::Object(object) => {
                let mut object = object.borrow_mut();
                if !object.frozen {
                    object.set(key, value);
                }
                Ok(())
            }
            RuntimeValue::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let len = array_length(value.to_number())?;
                    items.resize(len, RuntimeValue::Undefined);
                } else if let Some(index) = array_index(key) {
                    if index >= items.len() {
                        let len = array_length(index as f64 + 1.0)?;
                        items.resize(len, RuntimeValue::Undefined);
                    }
                    items[index] = value;
                } else {
                    return Err(RuntimeError::type_error(format!(
                        "Cannot add property {} to an array",
                        key
                    )));
                }
                Ok(())
            }
            RuntimeValue::Element(_) => Err(RuntimeError::type_error(format!(
                "Cannot assign to read only property '{}' of object",
                key
            ))),
            _ => Ok(()),
        }
    }
}

enum Reference {
    Variable(String),
    Property(RuntimeValue, String),
}

fn short_circuits(op: LogicalOp, left: &RuntimeValue) -> bool {
    match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Source-like description of a callee for error messages.
fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Ident(ident) => ident.name.clone(),
        Expr::Member {
            object,
            property: MemberProperty::Named(name),
            ..
        } => format!("{}.{}", describe_callee(object), name),
        Expr::Member { object, .. } => format!("{}[...]", describe_callee(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsx::parser::{Parser, Syntax};

    fn eval(source: &str) -> Result<RuntimeValue, RuntimeError> {
        let expr = Parser::new(source.to_string(), 0, Syntax::PLAIN)
            .parse_expression()
            .expect("parse failed");
        let mut interp = Interpreter::new(DEFAULT_MAX_CALL_DEPTH);
        let globals = Rc::clone(interp.globals());
        interp.eval_expr(&expr, &globals)
    }

    fn eval_str(source: &str) -> String {
        eval(source).expect("evaluation failed").to_js_string()
    }

    #[test]
    fn optional_chains_short_circuit() {
        assert_eq!(eval_str("(() => { const o = null; return o?.a.b.c })()"), "undefined");
        assert_eq!(eval_str("(() => { const o = { f: null }; return o.f?.() })()"), "undefined");
        assert_eq!(eval_str("(() => { const o = { a: { b: 2 } }; return o?.a?.b })()"), "2");
    }

    #[test]
    fn reading_from_nullish_is_a_type_error() {
        let err = eval("(() => { const o = undefined; return o.name })()").unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of undefined (reading 'name')"
        );
    }

    #[test]
    fn calling_non_functions_names_the_callee() {
        let err = eval("(() => { const user = {}; return user.greet() })()").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: user.greet is not a function");
    }

    #[test]
    fn compound_and_logical_assignment() {
        assert_eq!(eval_str("(() => { let a = 1; a += 2; a **= 2; return a })()"), "9");
        assert_eq!(eval_str("(() => { let a = null; a ??= 'x'; a ||= 'y'; return a })()"), "x");
        assert_eq!(eval_str("(() => { const o = { n: 1 }; o.n++; ++o.n; return o.n })()"), "3");
    }

    #[test]
    fn typeof_undeclared_is_undefined() {
        assert_eq!(eval_str("typeof notDeclaredAnywhere"), "undefined");
        assert_eq!(eval_str("typeof (() => 1)"), "function");
        assert_eq!(eval_str("typeof null"), "object");
    }

    #[test]
    fn array_length_can_be_written() {
        assert_eq!(eval_str("(() => { const a = [1, 2, 3]; a.length = 1; a[3] = 4; return a })()"), "1,,,4");
    }

    #[test]
    fn array_growth_is_capped() {
        for source in [
            "(() => { const a = []; a.length = 1e9; return a })()",
            "(() => { const a = []; a[4294967294] = 1; return a })()",
            "(() => { const a = []; a[1048576] = 1; return a })()",
            "new Array(4294967295)",
            "Array(1e9)",
            "Array.from({ length: 1e12 })",
        ] {
            let err = eval(source).unwrap_err();
            assert_eq!(err.to_string(), "RangeError: Invalid array length", "{source}");
        }
        assert_eq!(eval_str("(() => { const a = []; a[1048575] = 1; return a.length })()"), "1048576");
        assert_eq!(eval_str("Array.from({ length: 2 }, (_, i) => i * 2)"), "0,2");
    }

    #[test]
    fn named_properties_on_arrays_are_type_errors() {
        for (source, key) in [
            ("(() => { const a = []; a.label = 'x'; return a })()", "label"),
            ("(() => { const a = []; a[4294967296] = 1; return a })()", "4294967296"),
            ("(() => { const a = []; a['01'] = 1; return a })()", "01"),
        ] {
            let err = eval(source).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("TypeError: Cannot add property {} to an array", key)
            );
        }
        assert_eq!(eval_str("(() => { const a = [1]; a['1'] = 2; return a })()"), "1,2");
    }

    #[test]
    fn string_growth_is_capped() {
        let err = eval("'ab'.repeat(1e8)").unwrap_err();
        assert_eq!(err.to_string(), "RangeError: Invalid string length");
        let err = eval("'x'.padStart(1e10)").unwrap_err();
        assert_eq!(err.to_string(), "RangeError: Invalid string length");
        assert_eq!(eval_str("'ab'.repeat(3)"), "ababab");
    }

    #[test]
    fn call_depth_is_limited() {
        let err = eval("(() => { const f = (n) => f(n + 1); return f(0) })()").unwrap_err();
        assert_eq!(err.to_string(), "RangeError: Maximum call stack size exceeded");
    }

    #[test]
    fn named_function_expressions_see_their_own_name() {
        assert_eq!(
            eval_str("(function fact(n) { return n <= 1 ? 1 : n * fact(n - 1) })(5)"),
            "120"
        );
    }

    #[test]
    fn only_native_constructors_support_new() {
        assert_eq!(eval_str("new Error('x').message"), "x");
        let err = eval("new (() => 1)()").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: expression is not a constructor");
    }
}
