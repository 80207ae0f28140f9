//! Syntax tree shared by the parser, the JSX lowering pass and the printer.
//!
//! The same tree is produced for author source (JSX and type annotations
//! enabled) and for lowered code (plain expressions). Type annotations never
//! reach the tree: the parser skips them. JSX nodes exist only until
//! [`crate::lower`] rewrites them into `createElement` calls.

use std::ops::Range;
use std::rc::Rc;

pub type Span = Range<usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Template(Template),
    Bool(bool),
    Null,
    Ident(Ident),
    Array(Vec<ExprOrSpread>),
    Object(Vec<Property>),
    Function(Rc<Function>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ExprOrSpread>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<ExprOrSpread>,
    },
    Jsx(Box<JsxElement>),
}

impl Expr {
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Expr::Ident(Ident::new(name, span))
    }

    pub fn member(object: Expr, name: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: MemberProperty::Named(name.into()),
            optional: false,
        }
    }

    /// Whether this expression may appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::Member { optional: false, .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Cooked text segments; always one more than `exprs`.
    pub quasis: Vec<String>,
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprOrSpread {
    Expr(Expr),
    Spread(Expr),
    /// Elision in an array literal: `[a, , b]`.
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue { key: PropertyKey, value: Expr },
    Shorthand(Ident),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<BindingElement>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub arrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// A binding target with an optional default, used for parameters and
/// destructuring elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingElement {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Ident),
    Object {
        properties: Vec<PatternProperty>,
        rest: Option<Ident>,
    },
    Array {
        elements: Vec<Option<BindingElement>>,
        rest: Option<Box<Pattern>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternProperty {
    pub key: PropertyKey,
    pub value: BindingElement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Declaration(Declaration),
    Function(Rc<Function>),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        kind: DeclKind,
        pattern: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Break,
    Continue,
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration(Declaration),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

// ---------------------------------------------------------------------------
// JSX
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    pub name: JsxName,
    pub attributes: Vec<JsxAttribute>,
    pub children: Vec<JsxChild>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxName {
    /// `<>...</>`
    Fragment,
    /// Lowercase or namespaced tag, passed to the host as a string.
    Intrinsic(String),
    /// Capitalized or dotted tag, passed to the host as a value.
    Component(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    Named {
        name: String,
        value: Option<JsxAttrValue>,
    },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttrValue {
    /// Raw string contents; entities are decoded during lowering.
    String(String),
    Expr(Expr),
    Element(Box<JsxElement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxChild {
    /// Raw text; whitespace rules and entities are applied during lowering.
    Text(String),
    Expr(Expr),
    Element(Box<JsxElement>),
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
    TypeOf,
    Void,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Binary(BinaryOp),
    Logical(LogicalOp),
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Binary(BinaryOp::Add) => "+=",
            AssignOp::Binary(BinaryOp::Sub) => "-=",
            AssignOp::Binary(BinaryOp::Mul) => "*=",
            AssignOp::Binary(BinaryOp::Div) => "/=",
            AssignOp::Binary(BinaryOp::Rem) => "%=",
            AssignOp::Binary(BinaryOp::Exp) => "**=",
            AssignOp::Binary(BinaryOp::BitAnd) => "&=",
            AssignOp::Binary(BinaryOp::BitOr) => "|=",
            AssignOp::Binary(BinaryOp::BitXor) => "^=",
            AssignOp::Binary(BinaryOp::Shl) => "<<=",
            AssignOp::Binary(BinaryOp::Shr) => ">>=",
            AssignOp::Binary(BinaryOp::UShr) => ">>>=",
            AssignOp::Binary(_) => "=",
            AssignOp::Logical(LogicalOp::And) => "&&=",
            AssignOp::Logical(LogicalOp::Or) => "||=",
            AssignOp::Logical(LogicalOp::Nullish) => "??=",
        }
    }
}
