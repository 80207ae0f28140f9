//! JSX element parsing.
//!
//! JSX text does not tokenize like JavaScript, so element parsing drives the
//! lexer directly: the cursor is moved past each `>` and the raw text up to
//! the next `<` or `{` is scanned as-is. Normal token lexing resumes inside
//! `{...}` containers and once the outermost element closes.

use crate::ast::{Expr, JsxAttrValue, JsxAttribute, JsxChild, JsxElement, JsxName, Span};
use crate::parser::ParseError;
use crate::parser::expression::{BP_ASSIGN, ExprParser, PResult};
use crate::parser::lexer::Token;

impl<'src> ExprParser<'src> {
    /// Parse an element starting at the current `<` and resume normal
    /// lexing after it.
    pub(super) fn parse_jsx_element(&mut self) -> PResult<Expr> {
        let (element, end) = self.nested(|p| p.parse_jsx_element_at())?;
        self.lexer.seek(end);
        self.advance()?;
        Ok(Expr::Jsx(Box::new(element)))
    }

    /// Parse an element whose `<` is the current token. Returns the element
    /// and the absolute offset just past its final `>`; the token state is
    /// left stale and must be re-synchronised by the caller.
    fn parse_jsx_element_at(&mut self) -> PResult<(JsxElement, usize)> {
        let start = self.tok.span.start;
        self.advance()?; // <

        if self.at_jsx_gt() {
            let after = self.tok.span.start + 1;
            let (children, end) = self.parse_jsx_children(after, "", start)?;
            let element = JsxElement {
                name: JsxName::Fragment,
                attributes: Vec::new(),
                children,
                span: start..end,
            };
            return Ok((element, end));
        }

        let (name, tag) = self.parse_jsx_name()?;
        if self.syntax.typescript && self.at(&Token::Lt) {
            self.skip_type_args()?;
        }
        let attributes = self.parse_jsx_attributes()?;

        if self.eat(&Token::Slash)? {
            if !self.at_jsx_gt() {
                return Err(self.error(format!("expected '>', found {}", self.describe())));
            }
            let end = self.tok.span.start + 1;
            let element = JsxElement {
                name,
                attributes,
                children: Vec::new(),
                span: start..end,
            };
            return Ok((element, end));
        }

        if !self.at_jsx_gt() {
            return Err(self.error(format!(
                "expected '>' or '/>' to end the <{}> tag, found {}",
                tag,
                self.describe()
            )));
        }
        let after = self.tok.span.start + 1;
        let (children, end) = self.parse_jsx_children(after, &tag, start)?;
        let element = JsxElement {
            name,
            attributes,
            children,
            span: start..end,
        };
        Ok((element, end))
    }

    /// Children from `pos` up to and including the closing tag for `tag`.
    fn parse_jsx_children(
        &mut self,
        mut pos: usize,
        tag: &str,
        open_start: usize,
    ) -> PResult<(Vec<JsxChild>, usize)> {
        let mut children = Vec::new();

        loop {
            self.lexer.seek(pos);
            let (text, stop) = self.lexer.scan_jsx_text();
            if !text.is_empty() {
                children.push(JsxChild::Text(text));
            }

            match self.lexer.slice(stop..stop + 1) {
                "{" => {
                    self.lexer.seek(stop + 1);
                    self.tok = self.lexer.next_token()?;
                    // `{}` and `{/* comment */}` produce nothing
                    if self.at(&Token::RBrace) {
                        pos = self.tok.span.end;
                        continue;
                    }
                    if self.at(&Token::Ellipsis) {
                        return Err(self.error("spread children are not supported"));
                    }
                    let expr = self.parse_expr(BP_ASSIGN)?;
                    if !self.at(&Token::RBrace) {
                        return Err(self.error(format!(
                            "expected '}}' to close JSX expression, found {}",
                            self.describe()
                        )));
                    }
                    pos = self.tok.span.end;
                    children.push(JsxChild::Expr(expr));
                }
                "<" => {
                    self.lexer.seek(stop);
                    self.tok = self.lexer.next_token()?;
                    if self.peek_next()?.token == Token::Slash {
                        let close_start = self.tok.span.start;
                        self.advance()?; // <
                        self.advance()?; // /
                        let closing = if self.at_jsx_gt() {
                            String::new()
                        } else {
                            self.parse_jsx_name()?.1
                        };
                        if closing != tag || !self.at_jsx_gt() {
                            let span: Span = close_start..self.tok.span.end;
                            return Err(ParseError::error(
                                format!(
                                    "expected corresponding JSX closing tag for {}",
                                    display_tag(tag)
                                ),
                                span,
                                self.file_id,
                            ));
                        }
                        return Ok((children, self.tok.span.start + 1));
                    }
                    let (element, end) = self.nested(|p| p.parse_jsx_element_at())?;
                    children.push(JsxChild::Element(Box::new(element)));
                    pos = end;
                }
                _ => {
                    return Err(ParseError::error(
                        format!("unterminated JSX contents for {}", display_tag(tag)),
                        open_start..stop,
                        self.file_id,
                    ));
                }
            }
        }
    }

    fn parse_jsx_attributes(&mut self) -> PResult<Vec<JsxAttribute>> {
        let mut attributes = Vec::new();

        loop {
            match self.tok.token {
                Token::LBrace => {
                    self.advance()?;
                    self.expect(&Token::Ellipsis, "'...' in JSX spread attribute")?;
                    let expr = self.parse_expr(BP_ASSIGN)?;
                    self.expect(&Token::RBrace, "'}' to close JSX spread attribute")?;
                    attributes.push(JsxAttribute::Spread(expr));
                }
                Token::Ident(_) => {
                    let (mut name, _) = self.jsx_name_part()?;
                    if self.eat(&Token::Colon)? {
                        let (local, _) = self.jsx_name_part()?;
                        name = format!("{}:{}", name, local);
                    }
                    let value = if self.at(&Token::Eq) {
                        Some(self.parse_jsx_attr_value()?)
                    } else {
                        None
                    };
                    attributes.push(JsxAttribute::Named { name, value });
                }
                _ => return Ok(attributes),
            }
        }
    }

    /// Value after `=`. The current token is `=` and the lexer sits right
    /// after it, so a quoted string can be scanned raw.
    fn parse_jsx_attr_value(&mut self) -> PResult<JsxAttrValue> {
        self.lexer.seek(self.tok.span.end);
        if let Some((raw, _)) = self.lexer.scan_jsx_string()? {
            self.tok = self.lexer.next_token()?;
            return Ok(JsxAttrValue::String(raw));
        }
        self.tok = self.lexer.next_token()?;

        match self.tok.token {
            Token::LBrace => {
                self.advance()?;
                if self.at(&Token::RBrace) {
                    return Err(self.error("JSX attributes must only be assigned a non-empty expression"));
                }
                let expr = self.parse_expr(BP_ASSIGN)?;
                self.expect(&Token::RBrace, "'}' to close JSX attribute value")?;
                Ok(JsxAttrValue::Expr(expr))
            }
            Token::Lt => {
                let (element, end) = self.nested(|p| p.parse_jsx_element_at())?;
                self.lexer.seek(end);
                self.tok = self.lexer.next_token()?;
                Ok(JsxAttrValue::Element(Box::new(element)))
            }
            _ => Err(self.error(format!(
                "expected JSX attribute value, found {}",
                self.describe()
            ))),
        }
    }

    /// Tag name: `div`, `my-element`, `svg:path`, `Foo`, `ui.Button`.
    /// Also returns the name as written, for matching the closing tag.
    fn parse_jsx_name(&mut self) -> PResult<(JsxName, String)> {
        let (first, span) = self.jsx_name_part()?;

        if self.eat(&Token::Colon)? {
            let (local, _) = self.jsx_name_part()?;
            let full = format!("{}:{}", first, local);
            return Ok((JsxName::Intrinsic(full.clone()), full));
        }

        if self.at(&Token::Dot) {
            let mut full = first.clone();
            let mut expr = Expr::ident(first, span);
            while self.eat(&Token::Dot)? {
                let (part, _) = self.jsx_name_part()?;
                full.push('.');
                full.push_str(&part);
                expr = Expr::member(expr, part);
            }
            return Ok((JsxName::Component(expr), full));
        }

        let intrinsic = first.starts_with(|c: char| c.is_ascii_lowercase()) || first.contains('-');
        let name = if intrinsic {
            JsxName::Intrinsic(first.clone())
        } else {
            JsxName::Component(Expr::ident(first.clone(), span))
        };
        Ok((name, first))
    }

    /// Re-scan the current identifier token as a JSX name, which may
    /// contain `-`, then lex the token after it.
    fn jsx_name_part(&mut self) -> PResult<(String, Span)> {
        if !matches!(self.tok.token, Token::Ident(_)) {
            return Err(self.error(format!("expected JSX name, found {}", self.describe())));
        }
        let start = self.tok.span.start;
        self.lexer.seek(start);
        let name = self.lexer.scan_jsx_name();
        let span = start..start + name.len();
        self.prev_end = span.end;
        self.tok = self.lexer.next_token()?;
        Ok((name, span))
    }

    /// Whether the current token begins with `>`. Compound tokens such as
    /// `>=` occur when text directly follows the tag.
    fn at_jsx_gt(&self) -> bool {
        matches!(
            self.tok.token,
            Token::Gt | Token::GtGt | Token::GtGtGt | Token::GtEq | Token::GtGtEq | Token::GtGtGtEq
        )
    }
}

fn display_tag(tag: &str) -> String {
    if tag.is_empty() {
        "<>".to_string()
    } else {
        format!("<{}>", tag)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expr, JsxAttrValue, JsxAttribute, JsxChild, JsxElement, JsxName};
    use crate::parser::{ParseError, Parser, Syntax};

    fn parse(src: &str) -> Result<Expr, ParseError> {
        Parser::new(src.to_string(), 0, Syntax::TSX).parse_expression()
    }

    fn element(src: &str) -> JsxElement {
        match parse(src) {
            Ok(Expr::Jsx(element)) => *element,
            other => panic!("expected JSX element, got {:?}", other),
        }
    }

    #[test]
    fn self_closing_with_attributes() {
        let el = element(r#"<input type="text" disabled aria-label='Name' value={v} />"#);
        assert_eq!(el.name, JsxName::Intrinsic("input".into()));
        assert_eq!(el.attributes.len(), 4);
        assert!(matches!(
            &el.attributes[2],
            JsxAttribute::Named { name, value: Some(JsxAttrValue::String(s)) }
                if name == "aria-label" && s == "Name"
        ));
    }

    #[test]
    fn text_is_kept_raw() {
        let el = element("<p>it's {name}'s &amp; done</p>");
        assert_eq!(
            el.children
                .iter()
                .filter(|c| matches!(c, JsxChild::Text(_)))
                .count(),
            2
        );
        assert_eq!(el.children[0], JsxChild::Text("it's ".into()));
    }

    #[test]
    fn nested_elements_and_fragments() {
        let el = element("<><ul>{items.map(i => <li key={i}>{i}</li>)}</ul></>");
        assert_eq!(el.name, JsxName::Fragment);
        let JsxChild::Element(ul) = &el.children[0] else {
            panic!("expected <ul>");
        };
        assert_eq!(ul.children.len(), 1);
    }

    #[test]
    fn member_and_namespaced_names() {
        let el = element("<ui.Button><svg:path /></ui.Button>");
        assert!(matches!(el.name, JsxName::Component(Expr::Member { .. })));
        assert!(matches!(
            &el.children[0],
            JsxChild::Element(inner) if inner.name == JsxName::Intrinsic("svg:path".into())
        ));
    }

    #[test]
    fn empty_expression_containers_are_dropped() {
        let el = element("<div>{/* note */}{}</div>");
        assert!(el.children.is_empty());
    }

    #[test]
    fn text_starting_with_operator_characters() {
        let el = element("<b>=&gt;</b>");
        assert_eq!(el.children, vec![JsxChild::Text("=&gt;".into())]);
    }

    #[test]
    fn expression_after_element() {
        assert!(matches!(parse("<a /> && b"), Ok(Expr::Logical { .. })));
    }

    #[test]
    fn mismatched_closing_tag() {
        let err = parse("<div></span>").unwrap_err();
        assert_eq!(err.message, "expected corresponding JSX closing tag for <div>");
    }

    #[test]
    fn unterminated_contents() {
        let err = parse("() => <div>hello").unwrap_err();
        assert_eq!(err.message, "unterminated JSX contents for <div>");
    }
}
