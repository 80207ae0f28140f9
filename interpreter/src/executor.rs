use std::rc::Rc;

use jsx::ast::{CatchClause, DeclKind, Declaration, Expr, ForInit, Pattern, Stmt};

use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::evaluator::Interpreter;
use crate::pattern::{self, BindingMode, bound_names, iterate};
use crate::runtime_value::RuntimeValue;

/// Completion of a statement.
pub enum Flow {
    Normal,
    Return(RuntimeValue),
    Break,
    Continue,
}

impl Interpreter {
    /// Run a function body in its (already parameter-bound) function scope.
    pub(crate) fn exec_function_body(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<RuntimeValue, RuntimeError> {
        let mut vars = Vec::new();
        var_names(stmts, &mut vars);
        for name in &vars {
            scope.declare_var(name);
        }
        match self.exec_statements(stmts, scope)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(RuntimeValue::Undefined),
        }
    }

    /// Run a statement list in `scope`, after hoisting its lexical
    /// declarations: `let`/`const` enter the temporal dead zone and function
    /// declarations are bound immediately.
    fn exec_statements(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match stmt {
                Stmt::Declaration(decl) if decl.kind != DeclKind::Var => {
                    declare_lexical(decl, scope);
                }
                Stmt::Function(func) => {
                    if let Some(name) = &func.name {
                        let value = self.closure(Rc::clone(func), scope);
                        scope.define(&name.name, value, true);
                    }
                }
                _ => {}
            }
        }
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
        let block = self.new_scope(scope, false);
        self.exec_statements(stmts, &block)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval_expr(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Declaration(decl) => {
                self.exec_declaration(decl, scope)?;
                Ok(Flow::Normal)
            }
            // Bound when the enclosing statement list was entered
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => RuntimeValue::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test, scope)?.is_truthy() {
                    self.exec_stmt(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_stmt(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_block(stmts, scope),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope),
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => self.exec_for_of(*kind, pattern, iterable, body, scope),
            Stmt::While { test, body } => {
                while self.eval_expr(test, scope)?.is_truthy() {
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Continue | Flow::Normal => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    match self.exec_stmt(body, scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Continue | Flow::Normal => {}
                    }
                    if !self.eval_expr(test, scope)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Throw(expr) => Err(RuntimeError::Thrown(self.eval_expr(expr, scope)?)),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
        }
    }

    fn exec_declaration(&mut self, decl: &Declaration, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
        let mode = match decl.kind {
            DeclKind::Var => BindingMode::Var,
            DeclKind::Let => BindingMode::Let,
            DeclKind::Const => BindingMode::Const,
        };
        for declarator in &decl.declarators {
            let value = match &declarator.init {
                Some(init) => self.eval_expr(init, scope)?,
                // `var x;` leaves an existing value alone
                None if mode == BindingMode::Var => continue,
                None => RuntimeValue::Undefined,
            };
            pattern::bind_pattern(self, &declarator.pattern, value, scope, mode)?;
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> Result<Flow, RuntimeError> {
        let loop_scope = self.new_scope(scope, false);
        let mut per_iteration = false;
        match init {
            Some(ForInit::Declaration(decl)) => {
                if decl.kind != DeclKind::Var {
                    declare_lexical(decl, &loop_scope);
                    per_iteration = true;
                }
                self.exec_declaration(decl, &loop_scope)?;
            }
            Some(ForInit::Expr(expr)) => {
                self.eval_expr(expr, &loop_scope)?;
            }
            None => {}
        }

        // Each iteration gets its own copy of the loop bindings so closures
        // created in the body capture that iteration's values.
        let mut iteration = if per_iteration {
            self.copy_scope(&loop_scope)
        } else {
            loop_scope
        };
        loop {
            if let Some(test) = test {
                if !self.eval_expr(test, &iteration)?.is_truthy() {
                    break;
                }
            }
            match self.exec_stmt(body, &iteration)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Continue | Flow::Normal => {}
            }
            if per_iteration {
                iteration = self.copy_scope(&iteration);
            }
            if let Some(update) = update {
                self.eval_expr(update, &iteration)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for_of(
        &mut self,
        kind: DeclKind,
        pattern: &Pattern,
        iterable: &Expr,
        body: &Stmt,
        scope: &Rc<Scope>,
    ) -> Result<Flow, RuntimeError> {
        let items = iterate(&self.eval_expr(iterable, scope)?)?;
        let mode = match kind {
            DeclKind::Var => BindingMode::Var,
            DeclKind::Let => BindingMode::Let,
            DeclKind::Const => BindingMode::Const,
        };
        for item in items {
            let iteration = self.new_scope(scope, false);
            pattern::bind_pattern(self, pattern, item, &iteration, mode)?;
            match self.exec_stmt(body, &iteration)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Continue | Flow::Normal => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
        scope: &Rc<Scope>,
    ) -> Result<Flow, RuntimeError> {
        let result = match (self.exec_block(block, scope), handler) {
            (Err(error), Some(handler)) => self.exec_catch(handler, error, scope),
            (result, _) => result,
        };
        if let Some(finalizer) = finalizer {
            match self.exec_block(finalizer, scope)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        result
    }

    fn exec_catch(&mut self, handler: &CatchClause, error: RuntimeError, scope: &Rc<Scope>) -> Result<Flow, RuntimeError> {
        let catch_scope = self.new_scope(scope, false);
        if let Some(param) = &handler.param {
            pattern::bind_pattern(self, param, error.into_value(), &catch_scope, BindingMode::Let)?;
        }
        self.exec_statements(&handler.body, &catch_scope)
    }
}

/// Put every name of a `let`/`const` declaration into the temporal dead zone.
fn declare_lexical(decl: &Declaration, scope: &Scope) {
    let mut names = Vec::new();
    for declarator in &decl.declarators {
        bound_names(&declarator.pattern, &mut names);
    }
    let mutable = decl.kind != DeclKind::Const;
    for name in names {
        scope.declare(&name, mutable);
    }
}

/// Names declared with `var` anywhere in a function body, excluding nested
/// functions.
pub fn var_names(stmts: &[Stmt], names: &mut Vec<String>) {
    for stmt in stmts {
        var_names_in(stmt, names);
    }
}

fn var_names_in(stmt: &Stmt, names: &mut Vec<String>) {
    match stmt {
        Stmt::Declaration(decl) if decl.kind == DeclKind::Var => {
            for declarator in &decl.declarators {
                bound_names(&declarator.pattern, names);
            }
        }
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            var_names_in(consequent, names);
            if let Some(alternate) = alternate {
                var_names_in(alternate, names);
            }
        }
        Stmt::Block(stmts) => var_names(stmts, names),
        Stmt::For { init, body, .. } => {
            if let Some(ForInit::Declaration(decl)) = init {
                if decl.kind == DeclKind::Var {
                    for declarator in &decl.declarators {
                        bound_names(&declarator.pattern, names);
                    }
                }
            }
            var_names_in(body, names);
        }
        Stmt::ForOf {
            kind,
            pattern,
            body,
            ..
        } => {
            if *kind == DeclKind::Var {
                bound_names(pattern, names);
            }
            var_names_in(body, names);
        }
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => var_names_in(body, names),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            var_names(block, names);
            if let Some(handler) = handler {
                var_names(&handler.body, names);
            }
            if let Some(finalizer) = finalizer {
                var_names(finalizer, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::DEFAULT_MAX_CALL_DEPTH;
    use jsx::parser::{Parser, Syntax};

    fn run(body: &str) -> Result<String, String> {
        let source = format!("(() => {{ {} }})()", body);
        let expr = Parser::new(source, 0, Syntax::PLAIN)
            .parse_expression()
            .map_err(|e| e.message)?;
        let mut interp = Interpreter::new(DEFAULT_MAX_CALL_DEPTH);
        let globals = Rc::clone(interp.globals());
        interp
            .eval_expr(&expr, &globals)
            .map(|v| v.to_js_string())
            .map_err(|e| e.to_string())
    }

    #[test]
    fn let_is_in_the_temporal_dead_zone() {
        assert_eq!(
            run("const f = () => x; const r = f; let x = 1; return f()").unwrap(),
            "1"
        );
        assert_eq!(
            run("x; let x = 1;").unwrap_err(),
            "ReferenceError: Cannot access 'x' before initialization"
        );
    }

    #[test]
    fn var_is_function_scoped() {
        assert_eq!(run("if (true) { var v = 3 } return v").unwrap(), "3");
        assert_eq!(run("return typeof w; var w = 1").unwrap(), "undefined");
    }

    #[test]
    fn function_declarations_are_hoisted() {
        assert_eq!(run("return twice(4); function twice(n) { return n * 2 }").unwrap(), "8");
    }

    #[test]
    fn for_let_captures_each_iteration() {
        assert_eq!(
            run("const fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i) } return fs.map(f => f()).join()")
                .unwrap(),
            "0,1,2"
        );
        assert_eq!(
            run("const fs = []; for (var i = 0; i < 3; i++) { fs.push(() => i) } return fs.map(f => f()).join()")
                .unwrap(),
            "3,3,3"
        );
    }

    #[test]
    fn loops_break_and_continue() {
        assert_eq!(
            run("let s = ''; for (const c of 'abcde') { if (c === 'b') continue; if (c === 'd') break; s += c } return s")
                .unwrap(),
            "ac"
        );
        assert_eq!(run("let n = 0; while (true) { n++; if (n > 4) break } return n").unwrap(), "5");
        assert_eq!(run("let n = 10; do { n++ } while (false); return n").unwrap(), "11");
    }

    #[test]
    fn try_catch_finally() {
        assert_eq!(
            run("let log = []; try { null.x } catch (e) { log.push(e.name) } finally { log.push('done') } return log.join()")
                .unwrap(),
            "TypeError,done"
        );
        assert_eq!(
            run("try { throw { code: 7 } } catch ({ code }) { return code }").unwrap(),
            "7"
        );
        assert_eq!(run("try { return 1 } finally { return 2 }").unwrap(), "2");
    }

    #[test]
    fn uncaught_throw_propagates() {
        assert_eq!(run("throw new Error('boom')").unwrap_err(), "Error: boom");
    }

    #[test]
    fn const_reassignment_fails() {
        assert_eq!(
            run("const a = 1; a = 2").unwrap_err(),
            "TypeError: Assignment to constant variable."
        );
    }
}
