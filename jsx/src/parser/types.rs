//! Type annotation skipping.
//!
//! Types never reach the syntax tree. These routines only need to find
//! where a type ends, so they accept a generous superset of the type grammar.

use crate::parser::expression::{ExprParser, PResult};
use crate::parser::lexer::{Spanned, Token};

impl<'src> ExprParser<'src> {
    /// `: Type` if present.
    pub(super) fn skip_annotation(&mut self) -> PResult<()> {
        if self.syntax.typescript && self.eat(&Token::Colon)? {
            self.skip_type()?;
        }
        Ok(())
    }

    /// `: Type` after a parameter list, including `x is Type` predicates.
    pub(super) fn skip_return_annotation(&mut self) -> PResult<()> {
        if self.syntax.typescript && self.eat(&Token::Colon)? {
            if self.is_ident("asserts") {
                self.advance()?;
            }
            self.skip_type()?;
            if self.is_ident("is") && !self.tok.newline_before {
                self.advance()?;
                self.skip_type()?;
            }
        }
        Ok(())
    }

    pub(super) fn skip_type(&mut self) -> PResult<()> {
        self.nested(|p| {
            // Leading separator: `| "a" | "b"`
            if p.at(&Token::Pipe) || p.at(&Token::Amp) {
                p.advance()?;
            }
            p.skip_type_operand()?;
            while p.at(&Token::Pipe) || p.at(&Token::Amp) {
                p.advance()?;
                p.skip_type_operand()?;
            }
            // Conditional type: `T extends U ? X : Y`
            if p.is_ident("extends") && !p.tok.newline_before {
                p.advance()?;
                p.skip_type_operand()?;
                p.expect(&Token::Question, "'?' in conditional type")?;
                p.skip_type()?;
                p.expect(&Token::Colon, "':' in conditional type")?;
                p.skip_type()?;
            }
            Ok(())
        })
    }

    fn skip_type_operand(&mut self) -> PResult<()> {
        match self.tok.token.clone() {
            Token::Ident(name)
                if matches!(
                    name.as_str(),
                    "keyof" | "typeof" | "readonly" | "unique" | "infer"
                ) =>
            {
                let next = self.peek_next()?;
                if matches!(next.token, Token::Ident(_) | Token::LParen | Token::LBracket | Token::LBrace) {
                    self.advance()?;
                    return self.nested(|p| p.skip_type_operand());
                }
                self.advance()?;
            }
            Token::Ident(name) if name == "new" => {
                self.advance()?;
                return self.skip_function_type();
            }
            Token::Ident(_) => {
                self.advance()?;
                while self.eat(&Token::Dot)? {
                    match self.tok.token {
                        Token::Ident(_) => {
                            self.advance()?;
                        }
                        _ => return Err(self.error("expected type name after '.'")),
                    }
                }
                if self.at(&Token::Lt) && !self.tok.newline_before {
                    self.skip_type_args()?;
                }
            }
            Token::Str(_) | Token::Number(_) | Token::Template { .. } => {
                self.advance()?;
            }
            Token::Minus => {
                self.advance()?;
                match self.tok.token {
                    Token::Number(_) => {
                        self.advance()?;
                    }
                    _ => return Err(self.error("expected number in literal type")),
                }
            }
            Token::LParen => {
                self.skip_balanced(Token::LParen, Token::RParen)?;
                if self.at(&Token::Arrow) {
                    self.advance()?;
                    self.skip_type()?;
                }
            }
            Token::Lt => return self.skip_function_type(),
            Token::LBrace => self.skip_balanced(Token::LBrace, Token::RBrace)?,
            Token::LBracket => self.skip_balanced(Token::LBracket, Token::RBracket)?,
            _ => return Err(self.error(format!("expected type, found {}", self.describe()))),
        }

        // Array and indexed access types: `T[]`, `T["key"]`
        while self.at(&Token::LBracket) && !self.tok.newline_before {
            self.skip_balanced(Token::LBracket, Token::RBracket)?;
        }
        Ok(())
    }

    /// `<T>(a: T) => R` or `(a) => R`.
    fn skip_function_type(&mut self) -> PResult<()> {
        if self.at(&Token::Lt) {
            self.skip_type_params()?;
        }
        self.skip_balanced(Token::LParen, Token::RParen)?;
        self.expect(&Token::Arrow, "'=>' in function type")?;
        self.skip_type()
    }

    /// Skip from an opening token to its matching close.
    fn skip_balanced(&mut self, open: Token, close: Token) -> PResult<()> {
        let start = self.tok.span.clone();
        self.expect(&open, "type")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_end() {
                return Err(crate::parser::ParseError::error(
                    "unterminated type",
                    start,
                    self.file_id,
                ));
            }
            if self.at(&open) {
                depth += 1;
            } else if self.at(&close) {
                depth -= 1;
            }
            self.advance()?;
        }
        Ok(())
    }

    /// `<T, U extends X = Y>` on functions and arrows.
    pub(super) fn skip_type_params(&mut self) -> PResult<()> {
        self.expect(&Token::Lt, "'<'")?;
        while !self.at_type_close() {
            for modifier in ["const", "in", "out"] {
                if self.is_ident(modifier) && matches!(self.peek_next()?.token, Token::Ident(_)) {
                    self.advance()?;
                }
            }
            match self.tok.token {
                Token::Ident(_) => {
                    self.advance()?;
                }
                _ => return Err(self.error(format!(
                    "expected type parameter name, found {}",
                    self.describe()
                ))),
            }
            if self.is_ident("extends") {
                self.advance()?;
                self.skip_type()?;
            }
            if self.eat(&Token::Eq)? {
                self.skip_type()?;
            }
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect_type_close()
    }

    /// `<A, B>` type arguments.
    pub(super) fn skip_type_args(&mut self) -> PResult<()> {
        self.expect(&Token::Lt, "'<'")?;
        while !self.at_type_close() {
            self.skip_type()?;
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        self.expect_type_close()
    }

    /// Speculatively skip type arguments before a call: `f<T>(x)`. Restores
    /// the position and returns false if what follows `<` is not a type
    /// argument list followed by `(`, so `a < b` stays a comparison.
    pub(super) fn try_skip_call_type_args(&mut self) -> PResult<bool> {
        let checkpoint = self.checkpoint();
        match self.skip_type_args() {
            Ok(()) if self.at(&Token::LParen) => Ok(true),
            _ => {
                self.restore(checkpoint);
                Ok(false)
            }
        }
    }

    fn at_type_close(&self) -> bool {
        matches!(
            self.tok.token,
            Token::Gt | Token::GtGt | Token::GtGtGt | Token::GtEq | Token::GtGtEq | Token::GtGtGtEq
        )
    }

    /// Consume a single `>`, splitting compound tokens such as `>>` that
    /// close nested argument lists.
    fn expect_type_close(&mut self) -> PResult<()> {
        let span = self.tok.span.clone();
        let rest = match self.tok.token {
            Token::Gt => {
                self.advance()?;
                return Ok(());
            }
            Token::GtGt => Token::Gt,
            Token::GtGtGt => Token::GtGt,
            Token::GtEq => Token::Eq,
            Token::GtGtEq => Token::GtEq,
            Token::GtGtGtEq => Token::GtGtEq,
            _ => return Err(self.error(format!("expected '>', found {}", self.describe()))),
        };
        self.prev_end = span.start + 1;
        self.tok = Spanned {
            token: rest,
            span: span.start + 1..span.end,
            newline_before: false,
        };
        Ok(())
    }

    /// `type Name<T> = ...;`
    pub(super) fn skip_type_alias(&mut self) -> PResult<()> {
        self.advance()?; // type
        self.expect_binding_ident()?;
        if self.at(&Token::Lt) {
            self.skip_type_params()?;
        }
        self.expect(&Token::Eq, "'=' in type alias")?;
        self.skip_type()?;
        self.consume_semicolon()
    }

    /// `interface Name<T> extends A, B { ... }`
    pub(super) fn skip_interface(&mut self) -> PResult<()> {
        self.advance()?; // interface
        self.expect_binding_ident()?;
        if self.at(&Token::Lt) {
            self.skip_type_params()?;
        }
        if self.is_ident("extends") {
            self.advance()?;
            loop {
                self.skip_type_operand()?;
                if !self.eat(&Token::Comma)? {
                    break;
                }
            }
        }
        self.skip_balanced(Token::LBrace, Token::RBrace)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expr, FunctionBody};
    use crate::parser::{Parser, Syntax};

    fn parse(src: &str) -> Expr {
        Parser::new(src.to_string(), 0, Syntax::TSX)
            .parse_expression()
            .unwrap_or_else(|e| panic!("parse of {:?} failed: {}", src, e.message))
    }

    #[test]
    fn union_and_object_types() {
        let src = "(p: { a?: string; b: number[] } | null, k: 'x' | 'y'): void => p";
        assert!(matches!(parse(src), Expr::Function(_)));
    }

    #[test]
    fn nested_generics_close_with_shift_tokens() {
        let src = "(m: Map<string, Array<Set<number>>>) => m";
        assert!(matches!(parse(src), Expr::Function(_)));
    }

    #[test]
    fn function_types_in_annotations() {
        let src = "(f: (x: number) => string, g: new () => T) => f";
        assert!(matches!(parse(src), Expr::Function(_)));
    }

    #[test]
    fn type_aliases_and_interfaces_are_dropped() {
        let src = "() => { type P = { n: number }; interface Q extends P { s: string } return 1 }";
        let Expr::Function(f) = parse(src) else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &f.body else {
            panic!("expected block body");
        };
        assert_eq!(body.len(), 3);
    }

    #[test]
    fn as_const_and_satisfies() {
        assert!(matches!(parse("[1, 2] as const"), Expr::Array(_)));
        assert!(matches!(parse("({}) satisfies Record<string, number>"), Expr::Object(_)));
    }
}
