//! JSX lowering.
//!
//! Rewrites every JSX element into a host factory call:
//!
//! ```text
//! <div className="a">hi {name}</div>
//! React.createElement("div", { className: "a" }, "hi ", name)
//! ```
//!
//! Text children follow the usual JSX whitespace rules: lines are trimmed,
//! lines that are only whitespace disappear, and the remaining lines are
//! joined with single spaces. HTML entities are decoded.

use std::rc::Rc;

use crate::HOST_SYMBOL;
use crate::ast::{
    CatchClause, Declaration, Declarator, Expr, ExprOrSpread, ForInit, Function, FunctionBody,
    JsxAttrValue, JsxAttribute, JsxChild, JsxElement, JsxName, MemberProperty, Pattern,
    BindingElement, PatternProperty, Property, PropertyKey, Stmt, Template,
};

/// Lower all JSX in an expression.
pub fn lower_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Jsx(element) => lower_element(*element),
        Expr::Template(t) => Expr::Template(Template {
            quasis: t.quasis,
            exprs: t.exprs.into_iter().map(lower_expr).collect(),
        }),
        Expr::Array(items) => Expr::Array(items.into_iter().map(lower_spread).collect()),
        Expr::Object(props) => Expr::Object(
            props
                .into_iter()
                .map(|p| match p {
                    Property::KeyValue { key, value } => Property::KeyValue {
                        key: lower_key(key),
                        value: lower_expr(value),
                    },
                    Property::Shorthand(ident) => Property::Shorthand(ident),
                    Property::Spread(e) => Property::Spread(lower_expr(e)),
                })
                .collect(),
        ),
        Expr::Function(f) => Expr::Function(lower_function(f)),
        Expr::Unary { op, arg } => Expr::Unary {
            op,
            arg: lower_box(arg),
        },
        Expr::Update { op, prefix, target } => Expr::Update {
            op,
            prefix,
            target: lower_box(target),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op,
            left: lower_box(left),
            right: lower_box(right),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op,
            left: lower_box(left),
            right: lower_box(right),
        },
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: lower_box(test),
            consequent: lower_box(consequent),
            alternate: lower_box(alternate),
        },
        Expr::Assign { op, target, value } => Expr::Assign {
            op,
            target: lower_box(target),
            value: lower_box(value),
        },
        Expr::Member {
            object,
            property,
            optional,
        } => Expr::Member {
            object: lower_box(object),
            property: match property {
                MemberProperty::Computed(e) => MemberProperty::Computed(lower_box(e)),
                named => named,
            },
            optional,
        },
        Expr::Call {
            callee,
            args,
            optional,
        } => Expr::Call {
            callee: lower_box(callee),
            args: args.into_iter().map(lower_spread).collect(),
            optional,
        },
        Expr::New { callee, args } => Expr::New {
            callee: lower_box(callee),
            args: args.into_iter().map(lower_spread).collect(),
        },
        leaf @ (Expr::Number(_)
        | Expr::String(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Ident(_)) => leaf,
    }
}

fn lower_box(expr: Box<Expr>) -> Box<Expr> {
    Box::new(lower_expr(*expr))
}

fn lower_spread(item: ExprOrSpread) -> ExprOrSpread {
    match item {
        ExprOrSpread::Expr(e) => ExprOrSpread::Expr(lower_expr(e)),
        ExprOrSpread::Spread(e) => ExprOrSpread::Spread(lower_expr(e)),
        ExprOrSpread::Hole => ExprOrSpread::Hole,
    }
}

fn lower_key(key: PropertyKey) -> PropertyKey {
    match key {
        PropertyKey::Computed(e) => PropertyKey::Computed(lower_box(e)),
        named => named,
    }
}

fn lower_function(function: Rc<Function>) -> Rc<Function> {
    let function = Rc::unwrap_or_clone(function);
    Rc::new(Function {
        name: function.name,
        params: function.params.into_iter().map(lower_binding).collect(),
        rest: function.rest.map(lower_pattern),
        body: match function.body {
            FunctionBody::Expr(e) => FunctionBody::Expr(lower_box(e)),
            FunctionBody::Block(stmts) => FunctionBody::Block(lower_stmts(stmts)),
        },
        arrow: function.arrow,
    })
}

fn lower_binding(element: BindingElement) -> BindingElement {
    BindingElement {
        pattern: lower_pattern(element.pattern),
        default: element.default.map(lower_expr),
    }
}

fn lower_pattern(pattern: Pattern) -> Pattern {
    match pattern {
        Pattern::Ident(ident) => Pattern::Ident(ident),
        Pattern::Object { properties, rest } => Pattern::Object {
            properties: properties
                .into_iter()
                .map(|p| PatternProperty {
                    key: lower_key(p.key),
                    value: lower_binding(p.value),
                })
                .collect(),
            rest,
        },
        Pattern::Array { elements, rest } => Pattern::Array {
            elements: elements
                .into_iter()
                .map(|e| e.map(lower_binding))
                .collect(),
            rest: rest.map(|r| Box::new(lower_pattern(*r))),
        },
    }
}

/// Lower all JSX in a statement list.
pub fn lower_stmts(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(lower_stmt).collect()
}

fn lower_stmt(stmt: Stmt) -> Stmt {
    let boxed = |s: Box<Stmt>| Box::new(lower_stmt(*s));
    match stmt {
        Stmt::Expr(e) => Stmt::Expr(lower_expr(e)),
        Stmt::Declaration(d) => Stmt::Declaration(lower_declaration(d)),
        Stmt::Function(f) => Stmt::Function(lower_function(f)),
        Stmt::Return(e) => Stmt::Return(e.map(lower_expr)),
        Stmt::If {
            test,
            consequent,
            alternate,
        } => Stmt::If {
            test: lower_expr(test),
            consequent: boxed(consequent),
            alternate: alternate.map(boxed),
        },
        Stmt::Block(stmts) => Stmt::Block(lower_stmts(stmts)),
        Stmt::For {
            init,
            test,
            update,
            body,
        } => Stmt::For {
            init: init.map(|i| match i {
                ForInit::Declaration(d) => ForInit::Declaration(lower_declaration(d)),
                ForInit::Expr(e) => ForInit::Expr(lower_expr(e)),
            }),
            test: test.map(lower_expr),
            update: update.map(lower_expr),
            body: boxed(body),
        },
        Stmt::ForOf {
            kind,
            pattern,
            iterable,
            body,
        } => Stmt::ForOf {
            kind,
            pattern: lower_pattern(pattern),
            iterable: lower_expr(iterable),
            body: boxed(body),
        },
        Stmt::While { test, body } => Stmt::While {
            test: lower_expr(test),
            body: boxed(body),
        },
        Stmt::DoWhile { body, test } => Stmt::DoWhile {
            body: boxed(body),
            test: lower_expr(test),
        },
        Stmt::Throw(e) => Stmt::Throw(lower_expr(e)),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => Stmt::Try {
            block: lower_stmts(block),
            handler: handler.map(|h| CatchClause {
                param: h.param.map(lower_pattern),
                body: lower_stmts(h.body),
            }),
            finalizer: finalizer.map(lower_stmts),
        },
        s @ (Stmt::Break | Stmt::Continue | Stmt::Empty) => s,
    }
}

fn lower_declaration(declaration: Declaration) -> Declaration {
    Declaration {
        kind: declaration.kind,
        declarators: declaration
            .declarators
            .into_iter()
            .map(|d| Declarator {
                pattern: lower_pattern(d.pattern),
                init: d.init.map(lower_expr),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

fn host_member(name: &str) -> Expr {
    Expr::member(Expr::ident(HOST_SYMBOL, 0..0), name)
}

/// `React.createElement(type, props, ...children)`
pub fn lower_element(element: JsxElement) -> Expr {
    let element_type = match element.name {
        JsxName::Fragment => host_member("Fragment"),
        JsxName::Intrinsic(tag) => Expr::String(tag),
        JsxName::Component(expr) => expr,
    };

    let props = if element.attributes.is_empty() {
        Expr::Null
    } else {
        Expr::Object(element.attributes.into_iter().map(lower_attribute).collect())
    };

    let mut args = vec![ExprOrSpread::Expr(element_type), ExprOrSpread::Expr(props)];
    for child in element.children {
        let lowered = match child {
            JsxChild::Text(raw) => match clean_text(&decode_entities(&raw)) {
                Some(text) => Expr::String(text),
                None => continue,
            },
            JsxChild::Expr(e) => lower_expr(e),
            JsxChild::Element(el) => lower_element(*el),
        };
        args.push(ExprOrSpread::Expr(lowered));
    }

    Expr::Call {
        callee: Box::new(host_member("createElement")),
        args,
        optional: false,
    }
}

fn lower_attribute(attribute: JsxAttribute) -> Property {
    match attribute {
        JsxAttribute::Spread(e) => Property::Spread(lower_expr(e)),
        JsxAttribute::Named { name, value } => {
            let value = match value {
                None => Expr::Bool(true),
                Some(JsxAttrValue::String(raw)) => {
                    Expr::String(collapse_attribute_newlines(&decode_entities(&raw)))
                }
                Some(JsxAttrValue::Expr(e)) => lower_expr(e),
                Some(JsxAttrValue::Element(el)) => lower_element(*el),
            };
            Property::KeyValue {
                key: PropertyKey::Named(name),
                value,
            }
        }
    }
}

fn decode_entities(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}

/// A line break followed by indentation inside an attribute string becomes
/// a single space.
fn collapse_attribute_newlines(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

/// Apply JSX text whitespace rules. Returns `None` when nothing remains.
pub fn clean_text(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split("\r\n").flat_map(|l| l.split(['\n', '\r'])).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|line| line.chars().any(|c| c != ' ' && c != '\t'));

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let is_first = i == 0;
        let is_last = i == lines.len() - 1;

        let mut trimmed = line.replace('\t', " ");
        if !is_first {
            trimmed = trimmed.trim_start_matches(' ').to_string();
        }
        if !is_last {
            trimmed = trimmed.trim_end_matches(' ').to_string();
        }
        if !trimmed.is_empty() {
            if Some(i) != last_non_empty {
                trimmed.push(' ');
            }
            out.push_str(&trimmed);
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_text_is_untouched() {
        assert_eq!(clean_text("  hello  "), Some("  hello  ".to_string()));
    }

    #[test]
    fn multiline_text_is_trimmed_and_joined() {
        assert_eq!(
            clean_text("\n    Hello\n    world  \n  "),
            Some("Hello world".to_string())
        );
    }

    #[test]
    fn whitespace_only_lines_vanish() {
        assert_eq!(clean_text("\n   \n\t\n"), None);
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("a &amp; b &lt;3 &#x41;"), "a & b <3 A");
    }

    #[test]
    fn attribute_newlines_collapse() {
        assert_eq!(collapse_attribute_newlines("a\n    b"), "a b");
    }
}
