//! Static free-variable check run before evaluation. Every identifier
//! reference must resolve to a binding of the expression itself or to one
//! of the allowed global names.

use std::collections::HashSet;

use jsx::ast::{
    BindingElement, DeclKind, Declaration, Expr, ExprOrSpread, ForInit, Function, FunctionBody,
    JsxAttrValue, JsxAttribute, JsxChild, JsxElement, JsxName, MemberProperty, Pattern, Property,
    PropertyKey, Stmt, UnaryOp,
};

use crate::executor::var_names;
use crate::pattern::bound_names;

/// First identifier, in source order, that `expr` references without
/// binding it and that `globals` does not contain.
pub fn first_free_variable(expr: &Expr, globals: &[&str]) -> Option<String> {
    let mut resolver = Resolver {
        scopes: vec![globals.iter().map(|name| name.to_string()).collect()],
        free: None,
    };
    resolver.expr(expr);
    resolver.free
}

struct Resolver {
    scopes: Vec<HashSet<String>>,
    free: Option<String>,
}

impl Resolver {
    fn reference(&mut self, name: &str) {
        if self.free.is_some() {
            return;
        }
        if !self.scopes.iter().rev().any(|scope| scope.contains(name)) {
            self.free = Some(name.to_string());
        }
    }

    fn with_scope(&mut self, names: HashSet<String>, f: impl FnOnce(&mut Self)) {
        self.scopes.push(names);
        f(self);
        self.scopes.pop();
    }

    fn expr(&mut self, expr: &Expr) {
        if self.free.is_some() {
            return;
        }
        match expr {
            Expr::Number(_) | Expr::String(_) | Expr::Bool(_) | Expr::Null => {}
            Expr::Template(template) => template.exprs.iter().for_each(|e| self.expr(e)),
            Expr::Ident(ident) => self.reference(&ident.name),
            Expr::Array(elements) => self.args(elements),
            Expr::Object(properties) => {
                for property in properties {
                    match property {
                        Property::KeyValue { key, value } => {
                            self.key(key);
                            self.expr(value);
                        }
                        Property::Shorthand(ident) => self.reference(&ident.name),
                        Property::Spread(expr) => self.expr(expr),
                    }
                }
            }
            Expr::Function(func) => self.function(func),
            // `typeof x` may name something that does not exist
            Expr::Unary {
                op: UnaryOp::TypeOf,
                arg,
            } if matches!(**arg, Expr::Ident(_)) => {}
            Expr::Unary { arg, .. } => self.expr(arg),
            Expr::Update { target, .. } => self.expr(target),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
            }
            Expr::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            Expr::Member {
                object, property, ..
            } => {
                self.expr(object);
                if let MemberProperty::Computed(property) = property {
                    self.expr(property);
                }
            }
            Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
                self.expr(callee);
                self.args(args);
            }
            Expr::Jsx(element) => self.jsx(element),
        }
    }

    fn args(&mut self, args: &[ExprOrSpread]) {
        for arg in args {
            match arg {
                ExprOrSpread::Expr(expr) | ExprOrSpread::Spread(expr) => self.expr(expr),
                ExprOrSpread::Hole => {}
            }
        }
    }

    fn key(&mut self, key: &PropertyKey) {
        if let PropertyKey::Computed(expr) = key {
            self.expr(expr);
        }
    }

    fn jsx(&mut self, element: &JsxElement) {
        if let JsxName::Component(expr) = &element.name {
            self.expr(expr);
        }
        for attribute in &element.attributes {
            match attribute {
                JsxAttribute::Named { value, .. } => match value {
                    Some(JsxAttrValue::Expr(expr)) => self.expr(expr),
                    Some(JsxAttrValue::Element(element)) => self.jsx(element),
                    Some(JsxAttrValue::String(_)) | None => {}
                },
                JsxAttribute::Spread(expr) => self.expr(expr),
            }
        }
        for child in &element.children {
            match child {
                JsxChild::Expr(expr) => self.expr(expr),
                JsxChild::Element(element) => self.jsx(element),
                JsxChild::Text(_) => {}
            }
        }
    }

    fn function(&mut self, func: &Function) {
        let mut own_name = HashSet::new();
        if let (Some(name), false) = (&func.name, func.arrow) {
            own_name.insert(name.name.clone());
        }
        self.with_scope(own_name, |r| {
            let mut names = Vec::new();
            for param in &func.params {
                bound_names(&param.pattern, &mut names);
            }
            if let Some(rest) = &func.rest {
                bound_names(rest, &mut names);
            }
            if let FunctionBody::Block(stmts) = &func.body {
                var_names(stmts, &mut names);
                lexical_names(stmts, &mut names);
            }
            r.with_scope(names.into_iter().collect(), |r| {
                for param in &func.params {
                    r.element(param);
                }
                if let Some(rest) = &func.rest {
                    r.pattern(rest);
                }
                match &func.body {
                    FunctionBody::Expr(expr) => r.expr(expr),
                    FunctionBody::Block(stmts) => r.stmts(stmts),
                }
            });
        });
    }

    /// Defaults and computed keys inside a binding pattern.
    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(_) => {}
            Pattern::Object { properties, .. } => {
                for property in properties {
                    self.key(&property.key);
                    self.element(&property.value);
                }
            }
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    self.element(element);
                }
                if let Some(rest) = rest {
                    self.pattern(rest);
                }
            }
        }
    }

    fn element(&mut self, element: &BindingElement) {
        self.pattern(&element.pattern);
        if let Some(default) = &element.default {
            self.expr(default);
        }
    }

    fn declaration(&mut self, decl: &Declaration) {
        for declarator in &decl.declarators {
            self.pattern(&declarator.pattern);
            if let Some(init) = &declarator.init {
                self.expr(init);
            }
        }
    }

    fn block(&mut self, stmts: &[Stmt]) {
        let mut names = Vec::new();
        lexical_names(stmts, &mut names);
        self.with_scope(names.into_iter().collect(), |r| r.stmts(stmts));
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if self.free.is_some() {
            return;
        }
        match stmt {
            Stmt::Expr(expr) | Stmt::Throw(expr) => self.expr(expr),
            Stmt::Declaration(decl) => self.declaration(decl),
            Stmt::Function(func) => self.function(func),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.stmt(consequent);
                if let Some(alternate) = alternate {
                    self.stmt(alternate);
                }
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let mut names = Vec::new();
                if let Some(ForInit::Declaration(decl)) = init {
                    if decl.kind != DeclKind::Var {
                        for declarator in &decl.declarators {
                            bound_names(&declarator.pattern, &mut names);
                        }
                    }
                }
                self.with_scope(names.into_iter().collect(), |r| {
                    match init {
                        Some(ForInit::Declaration(decl)) => r.declaration(decl),
                        Some(ForInit::Expr(expr)) => r.expr(expr),
                        None => {}
                    }
                    if let Some(test) = test {
                        r.expr(test);
                    }
                    if let Some(update) = update {
                        r.expr(update);
                    }
                    r.stmt(body);
                });
            }
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                self.expr(iterable);
                let mut names = Vec::new();
                if *kind != DeclKind::Var {
                    bound_names(pattern, &mut names);
                }
                self.with_scope(names.into_iter().collect(), |r| {
                    r.pattern(pattern);
                    r.stmt(body);
                });
            }
            Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
                self.expr(test);
                self.stmt(body);
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block(block);
                if let Some(handler) = handler {
                    let mut names = Vec::new();
                    if let Some(param) = &handler.param {
                        bound_names(param, &mut names);
                    }
                    self.with_scope(names.into_iter().collect(), |r| {
                        if let Some(param) = &handler.param {
                            r.pattern(param);
                        }
                        r.block(&handler.body);
                    });
                }
                if let Some(finalizer) = finalizer {
                    self.block(finalizer);
                }
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }
    }
}

/// `let`/`const` and function declaration names directly in a statement list.
fn lexical_names(stmts: &[Stmt], names: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Declaration(decl) if decl.kind != DeclKind::Var => {
                for declarator in &decl.declarators {
                    bound_names(&declarator.pattern, names);
                }
            }
            Stmt::Function(func) => {
                if let Some(name) = &func.name {
                    names.push(name.name.clone());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsx::parser::{Parser, Syntax};

    fn free(source: &str) -> Option<String> {
        let expr = Parser::new(source.to_string(), 0, Syntax::PLAIN)
            .parse_expression()
            .expect("parse failed");
        first_free_variable(&expr, &["Math"])
    }

    #[test]
    fn own_bindings_resolve() {
        assert_eq!(free("(a, { b }, [c = a], ...d) => a + b + c + d.length"), None);
        assert_eq!(free("() => { const f = () => g(); function g() { return x } var x; return f }"), None);
        assert_eq!(free("() => { for (let i = 0; i < 3; i++) {} for (const k of []) { k } }"), None);
        assert_eq!(free("() => { try {} catch ({ message }) { message } }"), None);
    }

    #[test]
    fn free_names_are_reported_in_order() {
        assert_eq!(free("() => fetch(url)").as_deref(), Some("fetch"));
        assert_eq!(free("() => { { let inner = 1 } return inner }").as_deref(), Some("inner"));
        assert_eq!(free("() => ({ window })").as_deref(), Some("window"));
    }

    #[test]
    fn globals_member_names_and_typeof_are_allowed() {
        assert_eq!(free("() => Math.max(1, 2)"), None);
        assert_eq!(free("(o) => o.document.cookie"), None);
        assert_eq!(free("() => typeof window === 'undefined'"), None);
        assert_eq!(free("() => ({ localStorage: 1 }).localStorage"), None);
    }

    #[test]
    fn named_function_expressions_bind_their_name() {
        assert_eq!(free("(function loop(n) { return n && loop(n - 1) })"), None);
        assert_eq!(free("[function loop() {}, loop]").as_deref(), Some("loop"));
    }
}
