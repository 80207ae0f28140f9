use std::rc::Rc;

use crate::ast::{CatchClause, DeclKind, Declaration, Declarator, ForInit, Pattern, Stmt};
use crate::parser::expression::{BP_ASSIGN, ExprParser, PResult};
use crate::parser::lexer::Token;

impl<'src> ExprParser<'src> {
    /// `{ stmt* }` for function bodies.
    pub(super) fn parse_function_block(&mut self) -> PResult<Vec<Stmt>> {
        self.parse_block()
    }

    pub(super) fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.at_end() {
                return Err(self.error("expected '}' to close block, found end of input"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(body)
    }

    /// Automatic semicolon insertion: a `;` is optional before `}`, at the
    /// end of input, or when a line break separates the statements.
    pub(super) fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat(&Token::Semi)? {
            return Ok(());
        }
        if self.at(&Token::RBrace) || self.at_end() || self.tok.newline_before {
            return Ok(());
        }
        Err(self.error(format!("expected ';', found {}", self.describe())))
    }

    pub(super) fn parse_statement(&mut self) -> PResult<Stmt> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> PResult<Stmt> {
        let name = match &self.tok.token {
            Token::LBrace => return Ok(Stmt::Block(self.parse_block()?)),
            Token::Semi => {
                self.advance()?;
                return Ok(Stmt::Empty);
            }
            Token::Ident(name) => name.clone(),
            _ => return self.parse_expression_statement(),
        };

        match name.as_str() {
            "var" => self.parse_declaration_statement(DeclKind::Var),
            "let" => self.parse_declaration_statement(DeclKind::Let),
            "const" => self.parse_declaration_statement(DeclKind::Const),
            "function" => {
                self.advance()?;
                if self.at(&Token::Star) {
                    return Err(self.error("generator functions are not supported"));
                }
                let name = self.expect_binding_ident()?;
                let function = self.parse_function_rest(Some(name))?;
                Ok(Stmt::Function(Rc::new(function)))
            }
            "return" => {
                self.advance()?;
                let arg = if self.at(&Token::Semi)
                    || self.at(&Token::RBrace)
                    || self.at_end()
                    || self.tok.newline_before
                {
                    None
                } else {
                    Some(self.parse_expr(BP_ASSIGN)?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            "if" => {
                self.advance()?;
                self.expect(&Token::LParen, "'(' after if")?;
                let test = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RParen, "')'")?;
                let consequent = Box::new(self.parse_statement()?);
                let alternate = if self.is_ident("else") {
                    self.advance()?;
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                })
            }
            "for" => self.parse_for(),
            "while" => {
                self.advance()?;
                self.expect(&Token::LParen, "'(' after while")?;
                let test = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            "do" => {
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                if !self.is_ident("while") {
                    return Err(self.error(format!("expected 'while', found {}", self.describe())));
                }
                self.advance()?;
                self.expect(&Token::LParen, "'(' after while")?;
                let test = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RParen, "')'")?;
                self.eat(&Token::Semi)?;
                Ok(Stmt::DoWhile { body, test })
            }
            "break" | "continue" => {
                self.advance()?;
                if matches!(self.tok.token, Token::Ident(_)) && !self.tok.newline_before {
                    return Err(self.error("labeled statements are not supported"));
                }
                self.consume_semicolon()?;
                Ok(if name == "break" {
                    Stmt::Break
                } else {
                    Stmt::Continue
                })
            }
            "throw" => {
                self.advance()?;
                if self.tok.newline_before {
                    return Err(self.error("illegal newline after throw"));
                }
                let arg = self.parse_expr(BP_ASSIGN)?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            "try" => self.parse_try(),
            "type" if self.syntax.typescript && self.next_is_ident_on_same_line()? => {
                self.skip_type_alias()?;
                Ok(Stmt::Empty)
            }
            "interface" if self.syntax.typescript && self.next_is_ident_on_same_line()? => {
                self.skip_interface()?;
                Ok(Stmt::Empty)
            }
            "switch" | "class" | "async" | "import" | "export" | "with" | "debugger"
            | "yield" | "enum" => Err(self.error(format!("`{}` is not supported", name))),
            _ => self.parse_expression_statement(),
        }
    }

    fn next_is_ident_on_same_line(&self) -> PResult<bool> {
        let next = self.peek_next()?;
        Ok(matches!(next.token, Token::Ident(_)) && !next.newline_before)
    }

    fn parse_expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.parse_expr(BP_ASSIGN)?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_declaration_statement(&mut self, kind: DeclKind) -> PResult<Stmt> {
        self.advance()?;
        let first = self.parse_binding_pattern()?;
        let declaration = self.parse_declarators(kind, first)?;
        self.consume_semicolon()?;
        Ok(Stmt::Declaration(declaration))
    }

    /// Finish a declaration whose first binding pattern is already parsed.
    fn parse_declarators(&mut self, kind: DeclKind, first: Pattern) -> PResult<Declaration> {
        let mut declarators = Vec::new();
        let mut pattern = first;
        loop {
            if self.syntax.typescript {
                // Definite assignment: `let x!: T`
                self.eat(&Token::Bang)?;
                self.skip_annotation()?;
            }
            let init = if self.eat(&Token::Eq)? {
                Some(self.parse_expr(BP_ASSIGN)?)
            } else {
                None
            };
            if init.is_none() && (kind == DeclKind::Const || !matches!(pattern, Pattern::Ident(_))) {
                return Err(self.error("missing initializer in declaration"));
            }
            declarators.push(Declarator { pattern, init });

            if !self.eat(&Token::Comma)? {
                break;
            }
            pattern = self.parse_binding_pattern()?;
        }
        Ok(Declaration { kind, declarators })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.advance()?; // for
        if self.is_ident("await") {
            return Err(self.error("`for await` is not supported"));
        }
        self.expect(&Token::LParen, "'(' after for")?;

        let kind = if self.is_ident("var") {
            Some(DeclKind::Var)
        } else if self.is_ident("let") {
            Some(DeclKind::Let)
        } else if self.is_ident("const") {
            Some(DeclKind::Const)
        } else {
            None
        };

        let init = if self.at(&Token::Semi) {
            None
        } else if let Some(kind) = kind {
            self.advance()?;
            let pattern = self.parse_binding_pattern()?;
            if self.is_ident("of") {
                self.advance()?;
                let iterable = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RParen, "')'")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                });
            }
            if self.is_ident("in") {
                return Err(self.error("`for...in` loops are not supported"));
            }
            Some(ForInit::Declaration(self.parse_declarators(kind, pattern)?))
        } else {
            let expr = self.parse_expr(BP_ASSIGN)?;
            if self.is_ident("of") {
                return Err(self.error("`for...of` loops must declare their binding"));
            }
            Some(ForInit::Expr(expr))
        };
        self.expect(&Token::Semi, "';' in for statement")?;

        let test = if self.at(&Token::Semi) {
            None
        } else {
            Some(self.parse_expr(BP_ASSIGN)?)
        };
        self.expect(&Token::Semi, "';' in for statement")?;

        let update = if self.at(&Token::RParen) {
            None
        } else {
            Some(self.parse_expr(BP_ASSIGN)?)
        };
        self.expect(&Token::RParen, "')'")?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        self.advance()?; // try
        let block = self.parse_block()?;

        let handler = if self.is_ident("catch") {
            self.advance()?;
            let param = if self.eat(&Token::LParen)? {
                let pattern = self.parse_binding_pattern()?;
                self.skip_annotation()?;
                self.expect(&Token::RParen, "')'")?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.is_ident("finally") {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing catch or finally after try"));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expr, FunctionBody, Stmt};
    use crate::parser::{ParseError, Parser, Syntax};

    fn body(src: &str) -> Result<Vec<Stmt>, ParseError> {
        let expr = Parser::new(format!("() => {{ {} }}", src), 0, Syntax::TSX).parse_expression()?;
        let Expr::Function(f) = expr else {
            panic!("expected function");
        };
        match &f.body {
            FunctionBody::Block(stmts) => Ok(stmts.clone()),
            FunctionBody::Expr(_) => panic!("expected block body"),
        }
    }

    #[test]
    fn semicolons_are_inserted_at_line_breaks() {
        let stmts = body("let a = 1\nlet b = 2\nreturn a + b").unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn return_followed_by_newline_returns_nothing() {
        let stmts = body("return\n42").unwrap();
        assert_eq!(stmts[0], Stmt::Return(None));
    }

    #[test]
    fn missing_semicolon_on_one_line_is_an_error() {
        let err = body("let a = 1 let b = 2").unwrap_err();
        assert!(err.message.starts_with("expected ';'"), "{}", err.message);
    }

    #[test]
    fn loops_and_try() {
        let stmts = body(
            "for (let i = 0; i < 3; i++) {}\n\
             for (const [k, v] of pairs) continue\n\
             while (x) break\n\
             do { x-- } while (x > 0)\n\
             try { f() } catch { } finally { g() }",
        )
        .unwrap();
        assert_eq!(stmts.len(), 5);
        assert!(matches!(stmts[1], Stmt::ForOf { .. }));
        assert!(matches!(stmts[4], Stmt::Try { handler: Some(_), finalizer: Some(_), .. }));
    }

    #[test]
    fn const_requires_initializer() {
        let err = body("const a;").unwrap_err();
        assert_eq!(err.message, "missing initializer in declaration");
    }

    #[test]
    fn unsupported_statements_are_reported() {
        assert_eq!(body("switch (x) {}").unwrap_err().message, "`switch` is not supported");
        assert_eq!(
            body("for (k in o) {}").unwrap_err().message,
            "expected ';' in for statement, found `)`"
        );
    }

    #[test]
    fn type_as_identifier_is_still_an_expression() {
        let stmts = body("type = 1").unwrap();
        assert!(matches!(stmts[0], Stmt::Expr(Expr::Assign { .. })));
    }
}
