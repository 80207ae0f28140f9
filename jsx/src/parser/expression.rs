use std::rc::Rc;

use crate::ast::{
    AssignOp, BinaryOp, BindingElement, Expr, ExprOrSpread, Function, FunctionBody, Ident,
    LogicalOp, MemberProperty, Pattern, PatternProperty, Property, PropertyKey, Template, UnaryOp,
    UpdateOp,
};
use crate::parser::Syntax;
use crate::parser::error::ParseError;
use crate::parser::lexer::{Lexer, Spanned, Token};

pub(super) type PResult<T> = Result<T, ParseError>;

/// Maximum syntactic nesting before the parser gives up, so that
/// pathological input fails as an error instead of exhausting the stack.
pub(super) const MAX_NESTING: usize = 128;

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
pub(super) const BP_ASSIGN: u8 = 2; // = += ... and arrow bodies
const BP_CONDITIONAL: u8 = 4; // ? :
const BP_OR: u8 = 6; // || ??
const BP_AND: u8 = 8; // &&
const BP_BIT_OR: u8 = 10; // |
const BP_BIT_XOR: u8 = 12; // ^
const BP_BIT_AND: u8 = 14; // &
const BP_EQUALITY: u8 = 16; // == != === !==
const BP_RELATIONAL: u8 = 18; // < > <= >= in instanceof as satisfies
const BP_SHIFT: u8 = 20; // << >> >>>
const BP_ADDITIVE: u8 = 22; // + -
const BP_MULTIPLICATIVE: u8 = 24; // * / %
const BP_EXPONENT: u8 = 26; // **
const BP_UNARY: u8 = 28; // ! - + ~ typeof void

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub(super) fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

enum Infix {
    Binary(BinaryOp),
    Logical(LogicalOp),
    Assign(AssignOp),
    Conditional,
}

/// Infix binding powers: returns (operator, left_bp, right_bp) or None if not infix.
fn infix(token: &Token) -> Option<(Infix, u8, u8)> {
    use BinaryOp as B;

    let binary = |op, bp| Some((Infix::Binary(op), bp, bp + 1));
    let assign = |op| Some((Infix::Assign(op), BP_ASSIGN, BP_ASSIGN));

    match token {
        Token::Question => Some((Infix::Conditional, BP_CONDITIONAL, BP_CONDITIONAL)),
        Token::PipePipe => Some((Infix::Logical(LogicalOp::Or), BP_OR, BP_OR + 1)),
        Token::QuestionQuestion => Some((Infix::Logical(LogicalOp::Nullish), BP_OR, BP_OR + 1)),
        Token::AmpAmp => Some((Infix::Logical(LogicalOp::And), BP_AND, BP_AND + 1)),
        Token::Pipe => binary(B::BitOr, BP_BIT_OR),
        Token::Caret => binary(B::BitXor, BP_BIT_XOR),
        Token::Amp => binary(B::BitAnd, BP_BIT_AND),
        Token::EqEq => binary(B::Eq, BP_EQUALITY),
        Token::BangEq => binary(B::NotEq, BP_EQUALITY),
        Token::EqEqEq => binary(B::StrictEq, BP_EQUALITY),
        Token::BangEqEq => binary(B::StrictNotEq, BP_EQUALITY),
        Token::Lt => binary(B::Lt, BP_RELATIONAL),
        Token::Gt => binary(B::Gt, BP_RELATIONAL),
        Token::LtEq => binary(B::LtEq, BP_RELATIONAL),
        Token::GtEq => binary(B::GtEq, BP_RELATIONAL),
        Token::Ident(name) if name == "in" => binary(B::In, BP_RELATIONAL),
        Token::Ident(name) if name == "instanceof" => binary(B::InstanceOf, BP_RELATIONAL),
        Token::LtLt => binary(B::Shl, BP_SHIFT),
        Token::GtGt => binary(B::Shr, BP_SHIFT),
        Token::GtGtGt => binary(B::UShr, BP_SHIFT),
        Token::Plus => binary(B::Add, BP_ADDITIVE),
        Token::Minus => binary(B::Sub, BP_ADDITIVE),
        Token::Star => binary(B::Mul, BP_MULTIPLICATIVE),
        Token::Slash => binary(B::Div, BP_MULTIPLICATIVE),
        Token::Percent => binary(B::Rem, BP_MULTIPLICATIVE),
        Token::StarStar => Some((Infix::Binary(B::Exp), BP_EXPONENT, BP_EXPONENT)),
        Token::Eq => assign(AssignOp::Assign),
        Token::PlusEq => assign(AssignOp::Binary(B::Add)),
        Token::MinusEq => assign(AssignOp::Binary(B::Sub)),
        Token::StarEq => assign(AssignOp::Binary(B::Mul)),
        Token::SlashEq => assign(AssignOp::Binary(B::Div)),
        Token::PercentEq => assign(AssignOp::Binary(B::Rem)),
        Token::StarStarEq => assign(AssignOp::Binary(B::Exp)),
        Token::AmpEq => assign(AssignOp::Binary(B::BitAnd)),
        Token::PipeEq => assign(AssignOp::Binary(B::BitOr)),
        Token::CaretEq => assign(AssignOp::Binary(B::BitXor)),
        Token::LtLtEq => assign(AssignOp::Binary(B::Shl)),
        Token::GtGtEq => assign(AssignOp::Binary(B::Shr)),
        Token::GtGtGtEq => assign(AssignOp::Binary(B::UShr)),
        Token::AmpAmpEq => assign(AssignOp::Logical(LogicalOp::And)),
        Token::PipePipeEq => assign(AssignOp::Logical(LogicalOp::Or)),
        Token::QuestionQuestionEq => assign(AssignOp::Logical(LogicalOp::Nullish)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

pub(super) struct ExprParser<'src> {
    pub(super) lexer: Lexer<'src>,
    pub(super) tok: Spanned,
    pub(super) prev_end: usize,
    pub(super) file_id: usize,
    pub(super) syntax: Syntax,
    pub(super) depth: usize,
}

/// Saved parser position for speculative parsing (arrow heads, type arguments).
pub(super) struct Checkpoint<'src> {
    lexer: Lexer<'src>,
    tok: Spanned,
    prev_end: usize,
}

impl<'src> ExprParser<'src> {
    pub(super) fn new(
        src: &'src str,
        base: usize,
        file_id: usize,
        syntax: Syntax,
        depth: usize,
    ) -> PResult<Self> {
        let mut lexer = Lexer::new(src, base, file_id);
        let tok = lexer.next_token()?;
        Ok(ExprParser {
            lexer,
            tok,
            prev_end: base,
            file_id,
            syntax,
            depth,
        })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    pub(super) fn at_end(&self) -> bool {
        self.tok.token == Token::Eof
    }

    pub(super) fn at(&self, token: &Token) -> bool {
        &self.tok.token == token
    }

    pub(super) fn is_ident(&self, name: &str) -> bool {
        matches!(&self.tok.token, Token::Ident(n) if n == name)
    }

    pub(super) fn advance(&mut self) -> PResult<Spanned> {
        let next = self.lexer.next_token()?;
        let prev = std::mem::replace(&mut self.tok, next);
        self.prev_end = prev.span.end;
        Ok(prev)
    }

    pub(super) fn eat(&mut self, token: &Token) -> PResult<bool> {
        if self.at(token) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(super) fn expect(&mut self, token: &Token, what: &str) -> PResult<Spanned> {
        if self.at(token) {
            self.advance()
        } else {
            Err(self.error(format!("expected {}, found {}", what, self.describe())))
        }
    }

    /// Lex the token after the current one without consuming anything.
    pub(super) fn peek_next(&self) -> PResult<Spanned> {
        self.lexer.clone().next_token()
    }

    pub(super) fn checkpoint(&self) -> Checkpoint<'src> {
        Checkpoint {
            lexer: self.lexer.clone(),
            tok: self.tok.clone(),
            prev_end: self.prev_end,
        }
    }

    pub(super) fn restore(&mut self, checkpoint: Checkpoint<'src>) {
        self.lexer = checkpoint.lexer;
        self.tok = checkpoint.tok;
        self.prev_end = checkpoint.prev_end;
    }

    pub(super) fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::error(msg, self.tok.span.clone(), self.file_id)
    }

    pub(super) fn unexpected(&self) -> ParseError {
        self.error(format!("unexpected {}", self.describe()))
    }

    pub(super) fn describe(&self) -> String {
        match &self.tok.token {
            Token::Eof => "end of input".to_string(),
            _ => format!("`{}`", self.lexer.slice(self.tok.span.clone())),
        }
    }

    /// Run `f` one nesting level deeper, failing once `MAX_NESTING` is reached.
    pub(super) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("source is nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Count one more link of a left-nested chain (`a.b.c`, `a + b + c`).
    /// Chains deepen the tree without recursing here, so they draw on the
    /// same budget as nesting.
    fn extend_chain(&self, links: &mut usize) -> PResult<()> {
        *links += 1;
        if self.depth + *links >= MAX_NESTING {
            return Err(self.error("source is nested too deeply"));
        }
        Ok(())
    }

    pub(super) fn expect_binding_ident(&mut self) -> PResult<Ident> {
        match &self.tok.token {
            Token::Ident(name) if !is_reserved(name) => {
                let ident = Ident::new(name.clone(), self.tok.span.clone());
                self.advance()?;
                Ok(ident)
            }
            _ => Err(self.error(format!("expected identifier, found {}", self.describe()))),
        }
    }

    /// Property name after `.`: any identifier, reserved words included.
    fn expect_property_name(&mut self) -> PResult<String> {
        match &self.tok.token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected property name, found {}",
                self.describe()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    pub(super) fn parse_expr(&mut self, min_bp: u8) -> PResult<Expr> {
        self.nested(|p| p.parse_expr_inner(min_bp))
    }

    fn parse_expr_inner(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        let mut links = 0;

        loop {
            // Type assertions are erased: `x as T`, `x satisfies T`
            if self.syntax.typescript
                && (self.is_ident("as") || self.is_ident("satisfies"))
                && !self.tok.newline_before
                && BP_RELATIONAL >= min_bp
            {
                self.advance()?;
                if self.is_ident("const") {
                    self.advance()?;
                } else {
                    self.skip_type()?;
                }
                continue;
            }

            let Some((op, l_bp, r_bp)) = infix(&self.tok.token) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.extend_chain(&mut links)?;

            match op {
                Infix::Conditional => {
                    self.advance()?;
                    let consequent = self.parse_expr(BP_ASSIGN)?;
                    self.expect(&Token::Colon, "':' in conditional expression")?;
                    let alternate = self.parse_expr(BP_ASSIGN)?;
                    left = Expr::Conditional {
                        test: Box::new(left),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    };
                }
                Infix::Assign(op) => {
                    if !left.is_assignable() {
                        return Err(self.error("invalid assignment target"));
                    }
                    self.advance()?;
                    let value = self.parse_expr(r_bp)?;
                    left = Expr::Assign {
                        op,
                        target: Box::new(left),
                        value: Box::new(value),
                    };
                }
                Infix::Logical(op) => {
                    self.advance()?;
                    let right = self.parse_expr(r_bp)?;
                    left = Expr::Logical {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                Infix::Binary(op) => {
                    self.advance()?;
                    let right = self.parse_expr(r_bp)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match &self.tok.token {
            Token::Bang => Some(UnaryOp::Not),
            Token::Minus => Some(UnaryOp::Negate),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Tilde => Some(UnaryOp::BitNot),
            Token::Ident(name) if name == "typeof" => Some(UnaryOp::TypeOf),
            Token::Ident(name) if name == "void" => Some(UnaryOp::Void),
            Token::Ident(name) if name == "delete" || name == "await" => {
                return Err(self.error(format!("`{}` is not supported", name)));
            }
            _ => None,
        };

        if let Some(op) = op {
            self.advance()?;
            let arg = self.parse_expr(BP_UNARY)?;
            return Ok(Expr::Unary {
                op,
                arg: Box::new(arg),
            });
        }

        let update = match self.tok.token {
            Token::PlusPlus => Some(UpdateOp::Increment),
            Token::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance()?;
            let target = self.parse_expr(BP_UNARY)?;
            if !target.is_assignable() {
                return Err(self.error("invalid update target"));
            }
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;

        loop {
            if matches!(
                self.tok.token,
                Token::Dot | Token::QuestionDot | Token::LBracket | Token::LParen
            ) {
                self.extend_chain(&mut links)?;
            }
            match &self.tok.token {
                Token::Dot => {
                    self.advance()?;
                    let name = self.expect_property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProperty::Named(name),
                        optional: false,
                    };
                }
                Token::QuestionDot => {
                    self.advance()?;
                    expr = match &self.tok.token {
                        Token::LParen => {
                            let args = self.parse_arguments()?;
                            Expr::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                            }
                        }
                        Token::LBracket => {
                            self.advance()?;
                            let property = self.parse_expr(BP_ASSIGN)?;
                            self.expect(&Token::RBracket, "']'")?;
                            Expr::Member {
                                object: Box::new(expr),
                                property: MemberProperty::Computed(Box::new(property)),
                                optional: true,
                            }
                        }
                        _ => {
                            let name = self.expect_property_name()?;
                            Expr::Member {
                                object: Box::new(expr),
                                property: MemberProperty::Named(name),
                                optional: true,
                            }
                        }
                    };
                }
                Token::LBracket => {
                    self.advance()?;
                    let property = self.parse_expr(BP_ASSIGN)?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProperty::Computed(Box::new(property)),
                        optional: false,
                    };
                }
                Token::LParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    };
                }
                Token::PlusPlus | Token::MinusMinus if !self.tok.newline_before => {
                    let op = if self.at(&Token::PlusPlus) {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    if !expr.is_assignable() {
                        return Err(self.error("invalid update target"));
                    }
                    self.advance()?;
                    return Ok(Expr::Update {
                        op,
                        prefix: false,
                        target: Box::new(expr),
                    });
                }
                // Non-null assertion `x!` is erased
                Token::Bang if self.syntax.typescript && !self.tok.newline_before => {
                    self.advance()?;
                }
                // Explicit type arguments on a call: `useState<string>("")`
                Token::Lt if self.syntax.typescript => {
                    if !self.try_skip_call_type_args()? {
                        break;
                    }
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.tok.span.clone();
        match self.tok.token.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Template { quasis, exprs } => {
                self.advance()?;
                let mut parsed = Vec::with_capacity(exprs.len());
                for range in exprs {
                    let src = self.lexer.slice(range.clone());
                    let mut sub =
                        ExprParser::new(src, range.start, self.file_id, self.syntax, self.depth + 1)?;
                    let expr = sub.parse_expr(BP_ASSIGN)?;
                    if !sub.at_end() {
                        return Err(sub.error("unexpected token in template substitution"));
                    }
                    parsed.push(expr);
                }
                Ok(Expr::Template(Template {
                    quasis,
                    exprs: parsed,
                }))
            }
            Token::Ident(name) => match name.as_str() {
                "true" => {
                    self.advance()?;
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance()?;
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.advance()?;
                    Ok(Expr::Null)
                }
                "function" => self.parse_function_expression(),
                "new" => self.parse_new(),
                "this" | "super" | "class" | "async" | "yield" | "import" => {
                    Err(self.error(format!("`{}` is not supported", name)))
                }
                _ if is_reserved(&name) => Err(self.unexpected()),
                _ => {
                    let next = self.peek_next()?;
                    if next.token == Token::Arrow && !next.newline_before {
                        let ident = self.expect_binding_ident()?;
                        self.advance()?; // =>
                        let params = vec![BindingElement {
                            pattern: Pattern::Ident(ident),
                            default: None,
                        }];
                        return self.parse_arrow_body(params, None);
                    }
                    self.advance()?;
                    Ok(Expr::Ident(Ident::new(name, span)))
                }
            },
            Token::LParen => self.parse_paren_or_arrow(),
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::Lt => {
                if self.syntax.typescript && self.looks_like_generic_arrow()? {
                    return self.parse_generic_arrow();
                }
                if self.syntax.jsx {
                    return self.parse_jsx_element();
                }
                Err(self.unexpected())
            }
            _ => Err(self.unexpected()),
        }
    }

    // ------------------------------------------------------------------
    // Grouping and arrow functions
    // ------------------------------------------------------------------

    fn parse_paren_or_arrow(&mut self) -> PResult<Expr> {
        let checkpoint = self.checkpoint();
        if let Ok(Some((params, rest))) = self.try_arrow_head() {
            return self.parse_arrow_body(params, rest);
        }
        self.restore(checkpoint);

        self.advance()?; // (
        let expr = self.parse_expr(BP_ASSIGN)?;
        self.expect(&Token::RParen, "')'")?;
        Ok(expr)
    }

    /// Speculatively parse `(params) [: ReturnType] =>`.
    fn try_arrow_head(&mut self) -> PResult<Option<(Vec<BindingElement>, Option<Pattern>)>> {
        let (params, rest) = self.parse_params()?;
        self.skip_return_annotation()?;
        if self.at(&Token::Arrow) && !self.tok.newline_before {
            self.advance()?;
            Ok(Some((params, rest)))
        } else {
            Ok(None)
        }
    }

    /// `<T,>(x: T) => ...`: in TSX a type parameter list needs a trailing
    /// comma or a constraint to be told apart from a JSX tag.
    fn looks_like_generic_arrow(&self) -> PResult<bool> {
        let mut lexer = self.lexer.clone();
        let first = lexer.next_token()?;
        if !matches!(&first.token, Token::Ident(name) if !is_reserved(name)) {
            return Ok(false);
        }
        let second = lexer.next_token()?;
        Ok(matches!(&second.token, Token::Comma)
            || matches!(&second.token, Token::Ident(name) if name == "extends"))
    }

    fn parse_generic_arrow(&mut self) -> PResult<Expr> {
        self.skip_type_params()?;
        let (params, rest) = self.parse_params()?;
        self.skip_return_annotation()?;
        if self.tok.newline_before {
            return Err(self.error("line terminator not permitted before arrow"));
        }
        self.expect(&Token::Arrow, "'=>'")?;
        self.parse_arrow_body(params, rest)
    }

    pub(super) fn parse_arrow_body(
        &mut self,
        params: Vec<BindingElement>,
        rest: Option<Pattern>,
    ) -> PResult<Expr> {
        let body = if self.at(&Token::LBrace) {
            FunctionBody::Block(self.parse_function_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_expr(BP_ASSIGN)?))
        };
        Ok(Expr::Function(Rc::new(Function {
            name: None,
            params,
            rest,
            body,
            arrow: true,
        })))
    }

    pub(super) fn parse_function_expression(&mut self) -> PResult<Expr> {
        self.advance()?; // function
        if self.at(&Token::Star) {
            return Err(self.error("generator functions are not supported"));
        }
        let name = if self.at(&Token::LParen) || self.at(&Token::Lt) {
            None
        } else {
            Some(self.expect_binding_ident()?)
        };
        let function = self.parse_function_rest(name)?;
        Ok(Expr::Function(Rc::new(function)))
    }

    /// Parse `[<T>](params)[: R] { body }` for function expressions,
    /// declarations and methods.
    pub(super) fn parse_function_rest(&mut self, name: Option<Ident>) -> PResult<Function> {
        if self.syntax.typescript && self.at(&Token::Lt) {
            self.skip_type_params()?;
        }
        let (params, rest) = self.parse_params()?;
        self.skip_return_annotation()?;
        let body = self.parse_function_block()?;
        Ok(Function {
            name,
            params,
            rest,
            body: FunctionBody::Block(body),
            arrow: false,
        })
    }

    // ------------------------------------------------------------------
    // Parameters and binding patterns
    // ------------------------------------------------------------------

    pub(super) fn parse_params(&mut self) -> PResult<(Vec<BindingElement>, Option<Pattern>)> {
        self.expect(&Token::LParen, "'('")?;
        let mut params = Vec::new();
        let mut rest = None;

        while !self.at(&Token::RParen) {
            if self.eat(&Token::Ellipsis)? {
                let pattern = self.parse_binding_pattern()?;
                self.skip_annotation()?;
                rest = Some(pattern);
                break;
            }
            // `this: Type` parameters only exist for the type checker
            if self.syntax.typescript && self.is_ident("this") {
                self.advance()?;
                self.skip_annotation()?;
            } else {
                params.push(self.parse_binding_element(true)?);
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RParen, "')'")?;
        Ok((params, rest))
    }

    /// A binding target with an optional default. `annotated` allows the
    /// `?` and `: Type` suffixes that only appear on parameters.
    pub(super) fn parse_binding_element(&mut self, annotated: bool) -> PResult<BindingElement> {
        let pattern = self.parse_binding_pattern()?;
        if annotated && self.syntax.typescript {
            self.eat(&Token::Question)?;
            self.skip_annotation()?;
        }
        let default = if self.eat(&Token::Eq)? {
            Some(self.parse_expr(BP_ASSIGN)?)
        } else {
            None
        };
        Ok(BindingElement { pattern, default })
    }

    pub(super) fn parse_binding_pattern(&mut self) -> PResult<Pattern> {
        self.nested(|p| match p.tok.token {
            Token::LBrace => p.parse_object_pattern(),
            Token::LBracket => p.parse_array_pattern(),
            _ => Ok(Pattern::Ident(p.expect_binding_ident()?)),
        })
    }

    fn parse_object_pattern(&mut self) -> PResult<Pattern> {
        self.advance()?; // {
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.at(&Token::RBrace) {
            if self.eat(&Token::Ellipsis)? {
                rest = Some(self.expect_binding_ident()?);
                break;
            }
            let (key, shorthand) = self.parse_property_key()?;
            let value = if self.eat(&Token::Colon)? {
                self.parse_binding_element(false)?
            } else {
                let ident = match shorthand {
                    Some(ident) if !is_reserved(&ident.name) => ident,
                    _ => return Err(self.error("expected ':' in object pattern")),
                };
                let default = if self.eat(&Token::Eq)? {
                    Some(self.parse_expr(BP_ASSIGN)?)
                } else {
                    None
                };
                BindingElement {
                    pattern: Pattern::Ident(ident),
                    default,
                }
            };
            properties.push(PatternProperty { key, value });
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RBrace, "'}' to close object pattern")?;
        Ok(Pattern::Object { properties, rest })
    }

    fn parse_array_pattern(&mut self) -> PResult<Pattern> {
        self.advance()?; // [
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.at(&Token::RBracket) {
            if self.eat(&Token::Comma)? {
                elements.push(None);
                continue;
            }
            if self.eat(&Token::Ellipsis)? {
                rest = Some(Box::new(self.parse_binding_pattern()?));
                break;
            }
            elements.push(Some(self.parse_binding_element(false)?));
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RBracket, "']' to close array pattern")?;
        Ok(Pattern::Array { elements, rest })
    }

    /// Object key. Also returns the identifier when the key was written as
    /// a bare identifier, so callers can build shorthand forms.
    fn parse_property_key(&mut self) -> PResult<(PropertyKey, Option<Ident>)> {
        let span = self.tok.span.clone();
        match self.tok.token.clone() {
            Token::Ident(name) => {
                self.advance()?;
                Ok((PropertyKey::Named(name.clone()), Some(Ident::new(name, span))))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok((PropertyKey::Named(s), None))
            }
            Token::Number(n) => {
                self.advance()?;
                Ok((PropertyKey::Named(format!("{}", n)), None))
            }
            Token::LBracket => {
                self.advance()?;
                let key = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RBracket, "']'")?;
                Ok((PropertyKey::Computed(Box::new(key)), None))
            }
            _ => Err(self.error(format!(
                "expected property name, found {}",
                self.describe()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Literals and calls
    // ------------------------------------------------------------------

    fn parse_array_literal(&mut self) -> PResult<Expr> {
        self.advance()?; // [
        let mut items = Vec::new();

        while !self.at(&Token::RBracket) {
            if self.eat(&Token::Comma)? {
                items.push(ExprOrSpread::Hole);
                continue;
            }
            if self.eat(&Token::Ellipsis)? {
                items.push(ExprOrSpread::Spread(self.parse_expr(BP_ASSIGN)?));
            } else {
                items.push(ExprOrSpread::Expr(self.parse_expr(BP_ASSIGN)?));
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RBracket, "']' to close array literal")?;
        Ok(Expr::Array(items))
    }

    fn parse_object_literal(&mut self) -> PResult<Expr> {
        self.advance()?; // {
        let mut properties = Vec::new();

        while !self.at(&Token::RBrace) {
            if self.eat(&Token::Ellipsis)? {
                properties.push(Property::Spread(self.parse_expr(BP_ASSIGN)?));
            } else {
                if self.is_ident("get") || self.is_ident("set") {
                    let next = self.peek_next()?;
                    if matches!(
                        next.token,
                        Token::Ident(_) | Token::Str(_) | Token::Number(_) | Token::LBracket
                    ) {
                        return Err(self.error("getters and setters are not supported"));
                    }
                }

                let (key, shorthand) = self.parse_property_key()?;
                if self.eat(&Token::Colon)? {
                    let value = self.parse_expr(BP_ASSIGN)?;
                    properties.push(Property::KeyValue { key, value });
                } else if self.at(&Token::LParen) || (self.syntax.typescript && self.at(&Token::Lt))
                {
                    let method = self.parse_function_rest(shorthand)?;
                    properties.push(Property::KeyValue {
                        key,
                        value: Expr::Function(Rc::new(method)),
                    });
                } else {
                    match shorthand {
                        Some(ident) if !is_reserved(&ident.name) => {
                            properties.push(Property::Shorthand(ident));
                        }
                        _ => {
                            return Err(self.error(format!(
                                "expected ':' after property name, found {}",
                                self.describe()
                            )));
                        }
                    }
                }
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RBrace, "'}' to close object literal")?;
        Ok(Expr::Object(properties))
    }

    fn parse_arguments(&mut self) -> PResult<Vec<ExprOrSpread>> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();

        while !self.at(&Token::RParen) {
            if self.eat(&Token::Ellipsis)? {
                args.push(ExprOrSpread::Spread(self.parse_expr(BP_ASSIGN)?));
            } else {
                args.push(ExprOrSpread::Expr(self.parse_expr(BP_ASSIGN)?));
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }

        self.expect(&Token::RParen, "')' to close argument list")?;
        Ok(args)
    }

    fn parse_new(&mut self) -> PResult<Expr> {
        self.advance()?; // new
        if self.at(&Token::Dot) {
            return Err(self.error("`new.target` is not supported"));
        }

        let mut callee = self.nested(|p| p.parse_primary())?;
        let mut links = 0;
        loop {
            match self.tok.token {
                Token::Dot => {
                    self.extend_chain(&mut links)?;
                    self.advance()?;
                    let name = self.expect_property_name()?;
                    callee = Expr::member(callee, name);
                }
                Token::LBracket => {
                    self.extend_chain(&mut links)?;
                    self.advance()?;
                    let property = self.parse_expr(BP_ASSIGN)?;
                    self.expect(&Token::RBracket, "']'")?;
                    callee = Expr::Member {
                        object: Box::new(callee),
                        property: MemberProperty::Computed(Box::new(property)),
                        optional: false,
                    };
                }
                _ => break,
            }
        }

        if self.syntax.typescript && self.at(&Token::Lt) {
            self.try_skip_call_type_args()?;
        }
        let args = if self.at(&Token::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, Syntax};

    fn parse(src: &str) -> Expr {
        Parser::new(src.to_string(), 0, Syntax::TSX)
            .parse_expression()
            .unwrap_or_else(|e| panic!("parse of {:?} failed: {}", src, e.message))
    }

    fn parse_err(src: &str) -> ParseError {
        Parser::new(src.to_string(), 0, Syntax::TSX)
            .parse_expression()
            .expect_err("expected parse failure")
    }

    #[test]
    fn precedence() {
        let Expr::Binary { op, right, .. } = parse("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn exponent_is_right_associative() {
        let Expr::Binary { op, right, .. } = parse("2 ** 3 ** 2") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Exp);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn arrow_with_destructured_params() {
        let Expr::Function(f) = parse("({ a, b: [c] }, ...rest) => a") else {
            panic!("expected function");
        };
        assert!(f.arrow);
        assert_eq!(f.params.len(), 1);
        assert!(matches!(f.params[0].pattern, Pattern::Object { .. }));
        assert!(f.rest.is_some());
    }

    #[test]
    fn parenthesized_expression_is_not_an_arrow() {
        assert!(matches!(parse("(a)"), Expr::Ident(_)));
        assert!(matches!(parse("(a, b) => a"), Expr::Function(_)));
    }

    #[test]
    fn conditional_with_parenthesized_branch() {
        assert!(matches!(parse("a ? (b) : c"), Expr::Conditional { .. }));
    }

    #[test]
    fn typed_arrow_and_assertions() {
        let Expr::Function(f) = parse("(n?: number, s: Array<string>): string => (n as any)!") else {
            panic!("expected function");
        };
        assert_eq!(f.params.len(), 2);
        assert!(matches!(&f.body, FunctionBody::Expr(e) if matches!(**e, Expr::Ident(_))));
    }

    #[test]
    fn generic_arrow_in_tsx() {
        assert!(matches!(parse("<T,>(x: T) => x"), Expr::Function(_)));
    }

    #[test]
    fn generic_call_type_arguments_are_erased() {
        let Expr::Call { args, .. } = parse("useState<Map<string, number[]>>(0)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn less_than_is_still_comparison() {
        assert!(matches!(parse("a < b"), Expr::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn optional_chaining() {
        let Expr::Call { callee, optional, .. } = parse("a?.b?.(1)") else {
            panic!("expected call");
        };
        assert!(optional);
        assert!(matches!(*callee, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn object_literal_forms() {
        let Expr::Object(props) = parse("({ a, 'b-c': 1, [k]: 2, ...rest, m() { return 1 } })")
        else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 5);
        assert!(matches!(props[0], Property::Shorthand(_)));
        assert!(matches!(props[3], Property::Spread(_)));
    }

    #[test]
    fn template_literal_substitutions() {
        let Expr::Template(t) = parse("`a${1 + 2}b${`c${d}`}`") else {
            panic!("expected template");
        };
        assert_eq!(t.quasis, vec!["a", "b", ""]);
        assert_eq!(t.exprs.len(), 2);
    }

    #[test]
    fn trailing_semicolons_are_accepted() {
        assert!(matches!(parse("42;;"), Expr::Number(_)));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse_err("1 2");
        assert_eq!(err.message, "unexpected token after expression");
    }

    #[test]
    fn invalid_assignment_target() {
        assert_eq!(parse_err("a + b = c").message, "invalid assignment target");
    }

    fn parse_err_on_transform_stack(src: &str) -> ParseError {
        crate::transform::on_transform_stack(|| parse_err(src)).unwrap()
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let src = "(".repeat(1000);
        assert_eq!(
            parse_err_on_transform_stack(&src).message,
            "source is nested too deeply"
        );
    }

    #[test]
    fn long_chains_share_the_nesting_budget() {
        let sum = format!("1{}", " + 1".repeat(40));
        assert!(matches!(parse(&sum), Expr::Binary { .. }));

        let sum = format!("1{}", " + 1".repeat(5000));
        assert_eq!(
            parse_err_on_transform_stack(&sum).message,
            "source is nested too deeply"
        );
        let members = format!("a{}", ".b".repeat(5000));
        assert_eq!(
            parse_err_on_transform_stack(&members).message,
            "source is nested too deeply"
        );
        let calls = format!("f{}", "()".repeat(5000));
        assert_eq!(
            parse_err_on_transform_stack(&calls).message,
            "source is nested too deeply"
        );
    }

    #[test]
    fn empty_source() {
        assert_eq!(parse_err("").message, "unexpected end of input");
    }
}
