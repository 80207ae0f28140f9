pub mod error;
mod expression;
mod jsx;
pub(crate) mod lexer;
mod statement;
mod types;

pub use error::ParseError;

use crate::ast::Expr;
use expression::{BP_ASSIGN, ExprParser};
use lexer::Token;

/// Which syntax extensions the parser accepts on top of plain expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    pub jsx: bool,
    pub typescript: bool,
}

impl Syntax {
    /// Author source: JSX elements and type annotations.
    pub const TSX: Syntax = Syntax {
        jsx: true,
        typescript: true,
    };

    /// Lowered code: no JSX, no annotations.
    pub const PLAIN: Syntax = Syntax {
        jsx: false,
        typescript: false,
    };
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    syntax: Syntax,
}

impl Parser {
    pub fn new(source: String, file_id: usize, syntax: Syntax) -> Self {
        Parser {
            source,
            file_id,
            syntax,
        }
    }

    /// Parse the whole source as a single expression. Trailing `;` are
    /// accepted and discarded; anything else after the expression is an error.
    pub fn parse_expression(&self) -> Result<Expr, ParseError> {
        let mut parser = ExprParser::new(&self.source, 0, self.file_id, self.syntax, 0)?;
        let expr = parser.parse_expr(BP_ASSIGN)?;
        while parser.eat(&Token::Semi)? {}
        if !parser.at_end() {
            return Err(parser
                .error("unexpected token after expression")
                .with_note("the source must be a single expression, e.g. `() => <div />`"));
        }
        Ok(expr)
    }
}
