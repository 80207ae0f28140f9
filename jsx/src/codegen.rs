//! Printer for lowered syntax trees.
//!
//! Output is canonical: printing, re-parsing and printing again yields the
//! same text. Parentheses are inserted from operator precedence alone, so
//! redundant parentheses in the input do not survive.

use crate::ast::{
    BinaryOp, BindingElement, DeclKind, Declaration, Expr, ExprOrSpread, ForInit, Function,
    FunctionBody, LogicalOp, MemberProperty, Pattern, Property, PropertyKey, Stmt,
};
use crate::parser::lexer::{is_ident_part, is_ident_start};

// Printing precedence, loosest first.
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_OR: u8 = 4;
const PREC_AND: u8 = 5;
const PREC_UNARY: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

fn binary_prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor => 7,
        BinaryOp::BitAnd => 8,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
        BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::LtEq
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::InstanceOf => 10,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 13,
        BinaryOp::Exp => 14,
    }
}

fn logical_prec(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::Or | LogicalOp::Nullish => PREC_OR,
        LogicalOp::And => PREC_AND,
    }
}

fn prec(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } => PREC_ASSIGN,
        Expr::Function(f) if f.arrow => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Logical { op, .. } => logical_prec(*op),
        Expr::Binary { op, .. } => binary_prec(*op),
        Expr::Unary { .. } => PREC_UNARY,
        Expr::Update { prefix: true, .. } => PREC_UNARY,
        Expr::Update { prefix: false, .. } => PREC_POSTFIX,
        Expr::Call { .. } | Expr::Member { .. } | Expr::New { .. } => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

/// The leftmost token of `expr` when printed without parentheses, for
/// deciding whether a statement or arrow body would be misread.
fn leftmost(expr: &Expr) -> &Expr {
    match expr {
        Expr::Binary { left, .. } | Expr::Logical { left, .. } => leftmost(left),
        Expr::Conditional { test, .. } => leftmost(test),
        Expr::Assign { target, .. } => leftmost(target),
        Expr::Member { object, .. } => leftmost(object),
        Expr::Call { callee, .. } => leftmost(callee),
        Expr::Update { prefix: false, target, .. } => leftmost(target),
        other => other,
    }
}

fn starts_with_brace(expr: &Expr) -> bool {
    matches!(leftmost(expr), Expr::Object(_))
}

fn starts_with_function(expr: &Expr) -> bool {
    matches!(leftmost(expr), Expr::Function(f) if !f.arrow)
}

/// Print a lowered expression as source text.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr, PREC_ASSIGN);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &Expr, min_prec: u8) {
        let wrap = prec(expr) < min_prec;
        if wrap {
            self.push("(");
        }
        self.expr_inner(expr);
        if wrap {
            self.push(")");
        }
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(n) => self.push(&format_number(*n)),
            Expr::String(s) => self.push(&quote_string(s)),
            Expr::Template(t) => {
                self.push("`");
                for (i, quasi) in t.quasis.iter().enumerate() {
                    self.push(&escape_template(quasi));
                    if let Some(e) = t.exprs.get(i) {
                        self.push("${");
                        self.expr(e, PREC_ASSIGN);
                        self.push("}");
                    }
                }
                self.push("`");
            }
            Expr::Bool(b) => self.push(if *b { "true" } else { "false" }),
            Expr::Null => self.push("null"),
            Expr::Ident(ident) => self.push(&ident.name),
            Expr::Array(items) => {
                self.push("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.spread(item);
                }
                if matches!(items.last(), Some(ExprOrSpread::Hole)) {
                    self.push(",");
                }
                self.push("]");
            }
            Expr::Object(props) => self.object(props),
            Expr::Function(f) => self.function(f),
            Expr::Unary { op, arg } => {
                let op = op.as_str();
                self.push(op);
                let mut inner = Printer {
                    out: String::new(),
                    indent: self.indent,
                };
                inner.expr(arg, PREC_UNARY);
                let word = op.chars().all(|c| c.is_ascii_alphabetic());
                // `- -x`, `+ ++x`, `typeof x`
                if word || ((op == "-" || op == "+") && inner.out.starts_with(op)) {
                    self.push(" ");
                }
                self.push(&inner.out);
            }
            Expr::Update { op, prefix, target } => {
                if *prefix {
                    self.push(op.as_str());
                    self.expr(target, PREC_CALL);
                } else {
                    self.expr(target, PREC_CALL);
                    self.push(op.as_str());
                }
            }
            Expr::Binary { op, left, right } => {
                let p = binary_prec(*op);
                if *op == BinaryOp::Exp {
                    self.expr(left, PREC_POSTFIX);
                    self.push(" ** ");
                    self.expr(right, p);
                } else {
                    self.expr(left, p);
                    self.push(" ");
                    self.push(op.as_str());
                    self.push(" ");
                    self.expr(right, p + 1);
                }
            }
            Expr::Logical { op, left, right } => {
                let p = logical_prec(*op);
                self.logical_operand(*op, left, p);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.logical_operand(*op, right, p + 1);
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test, PREC_OR);
                self.push(" ? ");
                self.expr(consequent, PREC_ASSIGN);
                self.push(" : ");
                self.expr(alternate, PREC_ASSIGN);
            }
            Expr::Assign { op, target, value } => {
                self.expr(target, PREC_CALL);
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.expr(value, PREC_ASSIGN);
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                self.member_object(object);
                match property {
                    MemberProperty::Named(name) => {
                        self.push(if *optional { "?." } else { "." });
                        self.push(name);
                    }
                    MemberProperty::Computed(e) => {
                        self.push(if *optional { "?.[" } else { "[" });
                        self.expr(e, PREC_ASSIGN);
                        self.push("]");
                    }
                }
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                self.member_object(callee);
                if *optional {
                    self.push("?.");
                }
                self.arguments(args);
            }
            Expr::New { callee, args } => {
                self.push("new ");
                if is_plain_reference(callee) {
                    self.expr(callee, PREC_CALL);
                } else {
                    self.push("(");
                    self.expr(callee, PREC_ASSIGN);
                    self.push(")");
                }
                self.arguments(args);
            }
            Expr::Jsx(element) => {
                let lowered = crate::lower::lower_element((**element).clone());
                self.expr_inner(&lowered);
            }
        }
    }

    /// `??` cannot be mixed with `||` or `&&` without parentheses.
    fn logical_operand(&mut self, parent: LogicalOp, operand: &Expr, min_prec: u8) {
        let mixes = match operand {
            Expr::Logical { op, .. } => {
                (parent == LogicalOp::Nullish) != (*op == LogicalOp::Nullish)
            }
            _ => false,
        };
        if mixes {
            self.push("(");
            self.expr(operand, PREC_ASSIGN);
            self.push(")");
        } else {
            self.expr(operand, min_prec);
        }
    }

    /// Object of a member access or callee of a call.
    fn member_object(&mut self, object: &Expr) {
        let needs_parens = match object {
            Expr::Number(_) => true,
            Expr::Function(f) => !f.arrow,
            Expr::New { .. } => false,
            other => prec(other) < PREC_CALL,
        };
        if needs_parens {
            self.push("(");
            self.expr(object, PREC_ASSIGN);
            self.push(")");
        } else {
            self.expr(object, PREC_CALL);
        }
    }

    fn arguments(&mut self, args: &[ExprOrSpread]) {
        self.push("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.spread(arg);
        }
        self.push(")");
    }

    fn spread(&mut self, item: &ExprOrSpread) {
        match item {
            ExprOrSpread::Expr(e) => self.expr(e, PREC_ASSIGN),
            ExprOrSpread::Spread(e) => {
                self.push("...");
                self.expr(e, PREC_ASSIGN);
            }
            ExprOrSpread::Hole => {}
        }
    }

    fn object(&mut self, props: &[Property]) {
        if props.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{ ");
        for (i, prop) in props.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            match prop {
                Property::KeyValue { key, value } => {
                    self.key(key);
                    self.push(": ");
                    self.expr(value, PREC_ASSIGN);
                }
                Property::Shorthand(ident) => self.push(&ident.name),
                Property::Spread(e) => {
                    self.push("...");
                    self.expr(e, PREC_ASSIGN);
                }
            }
        }
        self.push(" }");
    }

    fn key(&mut self, key: &PropertyKey) {
        match key {
            PropertyKey::Named(name) if is_identifier_name(name) => self.push(name),
            PropertyKey::Named(name) => self.push(&quote_string(name)),
            PropertyKey::Computed(e) => {
                self.push("[");
                self.expr(e, PREC_ASSIGN);
                self.push("]");
            }
        }
    }

    fn function(&mut self, f: &Function) {
        if !f.arrow {
            self.push("function");
            if let Some(name) = &f.name {
                self.push(" ");
                self.push(&name.name);
            }
        }
        self.params(&f.params, f.rest.as_ref());
        if f.arrow {
            self.push(" =>");
        }
        match &f.body {
            FunctionBody::Expr(e) => {
                self.push(" ");
                if starts_with_brace(e) {
                    self.push("(");
                    self.expr(e, PREC_ASSIGN);
                    self.push(")");
                } else {
                    self.expr(e, PREC_ASSIGN);
                }
            }
            FunctionBody::Block(stmts) => {
                self.push(" ");
                self.block(stmts);
            }
        }
    }

    fn params(&mut self, params: &[BindingElement], rest: Option<&Pattern>) {
        self.push("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.binding(param);
        }
        if let Some(rest) = rest {
            if !params.is_empty() {
                self.push(", ");
            }
            self.push("...");
            self.pattern(rest);
        }
        self.push(")");
    }

    fn binding(&mut self, element: &BindingElement) {
        self.pattern(&element.pattern);
        if let Some(default) = &element.default {
            self.push(" = ");
            self.expr(default, PREC_ASSIGN);
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Ident(ident) => self.push(&ident.name),
            Pattern::Object { properties, rest } => {
                if properties.is_empty() && rest.is_none() {
                    self.push("{}");
                    return;
                }
                self.push("{ ");
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    let shorthand = match (&prop.key, &prop.value.pattern) {
                        (PropertyKey::Named(key), Pattern::Ident(ident)) => *key == ident.name,
                        _ => false,
                    };
                    if shorthand {
                        self.binding(&prop.value);
                    } else {
                        self.key(&prop.key);
                        self.push(": ");
                        self.binding(&prop.value);
                    }
                }
                if let Some(rest) = rest {
                    if !properties.is_empty() {
                        self.push(", ");
                    }
                    self.push("...");
                    self.push(&rest.name);
                }
                self.push(" }");
            }
            Pattern::Array { elements, rest } => {
                self.push("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    if let Some(element) = element {
                        self.binding(element);
                    }
                }
                if matches!(elements.last(), Some(None)) && rest.is_none() {
                    self.push(",");
                }
                if let Some(rest) = rest {
                    if !elements.is_empty() {
                        self.push(", ");
                    }
                    self.push("...");
                    self.pattern(rest);
                }
                self.push("]");
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self, stmts: &[Stmt]) {
        let stmts: Vec<&Stmt> = stmts.iter().filter(|s| !matches!(s, Stmt::Empty)).collect();
        if stmts.is_empty() {
            self.push("{}");
            return;
        }
        self.push("{");
        self.indent += 1;
        for stmt in stmts {
            self.newline();
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
    }

    /// Loop and branch bodies are always printed as blocks.
    fn body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => self.block(stmts),
            other => self.block(std::slice::from_ref(other)),
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => {
                if starts_with_brace(e) || starts_with_function(e) {
                    self.push("(");
                    self.expr(e, PREC_ASSIGN);
                    self.push(")");
                } else {
                    self.expr(e, PREC_ASSIGN);
                }
                self.push(";");
            }
            Stmt::Declaration(d) => {
                self.declaration(d);
                self.push(";");
            }
            Stmt::Function(f) => self.function(f),
            Stmt::Return(arg) => {
                self.push("return");
                if let Some(arg) = arg {
                    self.push(" ");
                    self.expr(arg, PREC_ASSIGN);
                }
                self.push(";");
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.push("if (");
                self.expr(test, PREC_ASSIGN);
                self.push(") ");
                self.body(consequent);
                if let Some(alternate) = alternate {
                    self.push(" else ");
                    match alternate.as_ref() {
                        nested @ Stmt::If { .. } => self.stmt(nested),
                        other => self.body(other),
                    }
                }
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push("for (");
                match init {
                    Some(ForInit::Declaration(d)) => self.declaration(d),
                    Some(ForInit::Expr(e)) => self.expr(e, PREC_ASSIGN),
                    None => {}
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(test, PREC_ASSIGN);
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(update, PREC_ASSIGN);
                }
                self.push(") ");
                self.body(body);
            }
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                self.push("for (");
                self.push(kind.as_str());
                self.push(" ");
                self.pattern(pattern);
                self.push(" of ");
                self.expr(iterable, PREC_ASSIGN);
                self.push(") ");
                self.body(body);
            }
            Stmt::While { test, body } => {
                self.push("while (");
                self.expr(test, PREC_ASSIGN);
                self.push(") ");
                self.body(body);
            }
            Stmt::DoWhile { body, test } => {
                self.push("do ");
                self.body(body);
                self.push(" while (");
                self.expr(test, PREC_ASSIGN);
                self.push(");");
            }
            Stmt::Break => self.push("break;"),
            Stmt::Continue => self.push("continue;"),
            Stmt::Throw(e) => {
                self.push("throw ");
                self.expr(e, PREC_ASSIGN);
                self.push(";");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.push("try ");
                self.block(block);
                if let Some(handler) = handler {
                    self.push(" catch ");
                    if let Some(param) = &handler.param {
                        self.push("(");
                        self.pattern(param);
                        self.push(") ");
                    }
                    self.block(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.block(finalizer);
                }
            }
            Stmt::Empty => self.push(";"),
        }
    }

    fn declaration(&mut self, d: &Declaration) {
        self.push(match d.kind {
            DeclKind::Var => "var ",
            DeclKind::Let => "let ",
            DeclKind::Const => "const ",
        });
        for (i, declarator) in d.declarators.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.pattern(&declarator.pattern);
            if let Some(init) = &declarator.init {
                self.push(" = ");
                self.expr(init, PREC_ASSIGN);
            }
        }
    }
}

/// Identifiers and dotted identifier chains can follow `new` unparenthesized.
fn is_plain_reference(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::Member {
            object,
            optional: false,
            ..
        } => is_plain_reference(object),
        _ => false,
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_part)
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// Double-quoted string literal with JSON-style escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_template(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, Syntax};

    fn roundtrip(src: &str) -> String {
        let expr = Parser::new(src.to_string(), 0, Syntax::PLAIN)
            .parse_expression()
            .unwrap_or_else(|e| panic!("parse of {:?} failed: {}", src, e.message));
        print_expr(&expr)
    }

    #[test]
    fn redundant_parens_are_dropped() {
        assert_eq!(roundtrip("((a)) + ((b * c))"), "a + b * c");
    }

    #[test]
    fn needed_parens_are_kept() {
        assert_eq!(roundtrip("(a + b) * c"), "(a + b) * c");
        assert_eq!(roundtrip("a - (b - c)"), "a - (b - c)");
        assert_eq!(roundtrip("(-2) ** 2"), "(-2) ** 2");
        assert_eq!(roundtrip("(a ?? b) || c"), "(a ?? b) || c");
    }

    #[test]
    fn arrow_returning_object_literal() {
        assert_eq!(roundtrip("() => ({ a: 1 })"), "() => ({ a: 1 })");
    }

    #[test]
    fn unary_spacing() {
        assert_eq!(roundtrip("- -x"), "- -x");
        assert_eq!(roundtrip("typeof x === 'string'"), "typeof x === \"string\"");
    }

    #[test]
    fn member_on_number_literal() {
        assert_eq!(roundtrip("(1).toFixed(2)"), "(1).toFixed(2)");
    }

    #[test]
    fn strings_are_normalized_to_double_quotes() {
        assert_eq!(roundtrip(r#"'say "hi"\n'"#), r#""say \"hi\"\n""#);
    }

    #[test]
    fn block_bodies_are_indented() {
        assert_eq!(
            roundtrip("function f(a) { if (a) return 1; else { return 2 } }"),
            "function f(a) {\n  if (a) {\n    return 1;\n  } else {\n    return 2;\n  }\n}"
        );
    }

    #[test]
    fn iife_callee_is_parenthesized() {
        assert_eq!(roundtrip("(function () { return 1 })()"), "(function() {\n  return 1;\n})()");
    }

    #[test]
    fn quoted_keys() {
        assert_eq!(roundtrip("({ 'aria-label': x, b: 2 })"), "{ \"aria-label\": x, b: 2 }");
    }
}
