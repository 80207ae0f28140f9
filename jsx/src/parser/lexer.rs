use std::ops::Range;

use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Str(String),
    /// Template literal: cooked text segments plus the absolute source
    /// ranges of each `${...}` substitution (parsed later by a sub-parser).
    Template {
        quasis: Vec<String>,
        exprs: Vec<Range<usize>>,
    },

    // Identifiers and keywords (keywords are recognised by the parser)
    Ident(String),

    // Grouping
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Punctuation
    Semi,
    Comma,
    Dot,
    Ellipsis,
    QuestionDot,
    Question,
    Colon,
    Arrow,

    // Operators
    Eq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    QuestionQuestion,
    LtLt,
    GtGt,
    GtGtGt,

    // Compound assignment
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    LtLtEq,
    GtGtEq,
    GtGtGtEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,

    Eof,
}

/// A token with its absolute source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// On-demand lexer. The parser pulls one token at a time and may `seek`
/// back into the source, which is how JSX text and names are re-scanned.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    /// Absolute offset of `src` within the original file.
    base: usize,
    file_id: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str, base: usize, file_id: usize) -> Self {
        Lexer {
            src,
            pos: 0,
            base,
            file_id,
        }
    }

    /// Move the cursor to an absolute source offset.
    pub fn seek(&mut self, absolute: usize) {
        self.pos = absolute.saturating_sub(self.base).min(self.src.len());
    }

    /// Slice of the source at an absolute range.
    pub fn slice(&self, absolute: Range<usize>) -> &'src str {
        let start = absolute.start.saturating_sub(self.base).min(self.src.len());
        let end = absolute.end.saturating_sub(self.base).min(self.src.len());
        &self.src[start..end.max(start)]
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn span(&self, start: usize, end: usize) -> Range<usize> {
        self.base + start..self.base + end
    }

    fn error(&self, message: impl Into<String>, start: usize, end: usize) -> ParseError {
        ParseError::error(message, self.span(start, end), self.file_id)
    }

    /// Skip whitespace and comments. Returns whether a line terminator was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        loop {
            match self.peek_char() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    newline = true;
                    self.bump_char();
                }
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump_char();
                }
                Some('/') if self.peek_char_at(1) == Some('/') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump_char();
                    }
                }
                Some('/') if self.peek_char_at(1) == Some('*') => {
                    let start = self.pos;
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(offset) => {
                            if self.src[self.pos..self.pos + offset].contains(['\n', '\r']) {
                                newline = true;
                            }
                            self.pos += offset + 2;
                        }
                        None => {
                            return Err(self.error("unterminated comment", start, self.src.len()));
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, ParseError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;

        let Some(c) = self.peek_char() else {
            return Ok(Spanned {
                token: Token::Eof,
                span: self.span(start, start),
                newline_before,
            });
        };

        let token = match c {
            '0'..='9' => self.lex_number(start)?,
            '.' if matches!(self.peek_char_at(1), Some('0'..='9')) => self.lex_number(start)?,
            '"' | '\'' => self.lex_string(c, start)?,
            '`' => self.lex_template(start)?,
            c if is_ident_start(c) => self.lex_ident(),
            _ => match punctuator(&self.src[self.pos..]) {
                Some((token, len)) => {
                    self.pos += len;
                    token
                }
                None => {
                    return Err(self.error(
                        format!("unexpected character '{}'", c),
                        start,
                        start + c.len_utf8(),
                    ));
                }
            },
        };

        Ok(Spanned {
            token,
            span: self.span(start, self.pos),
            newline_before,
        })
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_ident_part(c) {
                break;
            }
            self.bump_char();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ParseError> {
        let radix = match (self.peek_char(), self.peek_char_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while let Some(c) = self.peek_char() {
                if c.is_digit(radix) || c == '_' {
                    self.bump_char();
                } else {
                    break;
                }
            }
            let digits: String = self.src[digits_start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            if digits.is_empty() {
                return Err(self.error("expected digits after radix prefix", start, self.pos));
            }
            u64::from_str_radix(&digits, radix)
                .map(|n| n as f64)
                .map_err(|_| self.error("numeric literal out of range", start, self.pos))?
        } else {
            self.eat_digits();
            if self.peek_char() == Some('.') {
                self.bump_char();
                self.eat_digits();
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                let save = self.pos;
                self.bump_char();
                if matches!(self.peek_char(), Some('+' | '-')) {
                    self.bump_char();
                }
                if matches!(self.peek_char(), Some('0'..='9')) {
                    self.eat_digits();
                } else {
                    self.pos = save;
                }
            }
            let text: String = self.src[start..self.pos]
                .chars()
                .filter(|c| *c != '_')
                .collect();
            text.parse::<f64>()
                .map_err(|_| self.error("invalid numeric literal", start, self.pos))?
        };

        match self.peek_char() {
            Some('n') => Err(self.error("BigInt literals are not supported", start, self.pos + 1)),
            Some(c) if is_ident_start(c) || c.is_ascii_digit() => Err(self.error(
                "identifier starts immediately after numeric literal",
                start,
                self.pos + c.len_utf8(),
            )),
            _ => Ok(Token::Number(value)),
        }
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '_' {
                self.bump_char();
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self, quote: char, start: usize) -> Result<Token, ParseError> {
        self.bump_char();
        let mut value = String::new();
        loop {
            match self.bump_char() {
                None | Some('\n' | '\r') => {
                    return Err(self.error("unterminated string literal", start, self.pos));
                }
                Some(c) if c == quote => break,
                Some('\\') => self.lex_escape(&mut value, start)?,
                Some(c) => value.push(c),
            }
        }
        Ok(Token::Str(value))
    }

    /// Decode one escape sequence (the backslash is already consumed).
    fn lex_escape(&mut self, out: &mut String, start: usize) -> Result<(), ParseError> {
        let Some(c) = self.bump_char() else {
            return Err(self.error("unterminated escape sequence", start, self.pos));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !matches!(self.peek_char(), Some('0'..='9')) => out.push('\0'),
            'x' => {
                let code = self.lex_hex_digits(2, start)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = if self.peek_char() == Some('{') {
                    self.bump_char();
                    let digits_start = self.pos;
                    while matches!(self.peek_char(), Some(c) if c.is_ascii_hexdigit()) {
                        self.bump_char();
                    }
                    let digits = &self.src[digits_start..self.pos];
                    if self.bump_char() != Some('}') || digits.is_empty() {
                        return Err(self.error("invalid unicode escape", start, self.pos));
                    }
                    u32::from_str_radix(digits, 16)
                        .map_err(|_| self.error("invalid unicode escape", start, self.pos))?
                } else {
                    self.lex_hex_digits(4, start)?
                };
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // Line continuation
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.bump_char();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_hex_digits(&mut self, count: usize, start: usize) -> Result<u32, ParseError> {
        let digits_start = self.pos;
        for _ in 0..count {
            match self.peek_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump_char();
                }
                _ => return Err(self.error("invalid hexadecimal escape", start, self.pos)),
            }
        }
        u32::from_str_radix(&self.src[digits_start..self.pos], 16)
            .map_err(|_| self.error("invalid hexadecimal escape", start, self.pos))
    }

    fn lex_template(&mut self, start: usize) -> Result<Token, ParseError> {
        self.bump_char();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();

        loop {
            match self.bump_char() {
                None => return Err(self.error("unterminated template literal", start, self.pos)),
                Some('`') => break,
                Some('\\') => self.lex_escape(&mut current, start)?,
                Some('$') if self.peek_char() == Some('{') => {
                    self.bump_char();
                    quasis.push(std::mem::take(&mut current));
                    let expr_start = self.pos;
                    self.skip_substitution(start)?;
                    // skip_substitution leaves the cursor just past the closing brace
                    exprs.push(self.span(expr_start, self.pos - 1));
                }
                Some('\r') => {
                    if self.peek_char() == Some('\n') {
                        self.bump_char();
                    }
                    current.push('\n');
                }
                Some(c) => current.push(c),
            }
        }
        quasis.push(current);

        Ok(Token::Template { quasis, exprs })
    }

    /// Advance past a `${ ... }` body, tracking nested braces, strings,
    /// templates and comments so braces inside them do not count.
    fn skip_substitution(&mut self, template_start: usize) -> Result<(), ParseError> {
        let mut depth = 1u32;
        loop {
            let at = self.pos;
            match self.peek_char() {
                None => {
                    return Err(self.error(
                        "unterminated template substitution",
                        template_start,
                        self.pos,
                    ));
                }
                Some('{') => {
                    depth += 1;
                    self.bump_char();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump_char();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(q @ ('"' | '\'')) => {
                    self.lex_string(q, at)?;
                }
                Some('`') => {
                    self.lex_template(at)?;
                }
                Some('/') if matches!(self.peek_char_at(1), Some('/' | '*')) => {
                    self.skip_trivia()?;
                }
                Some(_) => {
                    self.bump_char();
                }
            }
        }
    }

    /// Scan raw JSX text from the cursor up to (not including) the next `<`
    /// or `{`. Returns the text and the absolute offset where scanning stopped.
    pub fn scan_jsx_text(&mut self) -> (String, usize) {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '<' || c == '{' {
                break;
            }
            self.bump_char();
        }
        (self.src[start..self.pos].to_string(), self.base + self.pos)
    }

    /// Scan a quoted JSX attribute value. Unlike JS strings these have no
    /// escapes and may span lines. Returns `None` if no quote follows.
    pub fn scan_jsx_string(&mut self) -> Result<Option<(String, Range<usize>)>, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        let quote = match self.peek_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Ok(None),
        };
        self.bump_char();
        let body_start = self.pos;
        loop {
            match self.bump_char() {
                None => return Err(self.error("unterminated string literal", start, self.pos)),
                Some(c) if c == quote => break,
                Some(_) => {}
            }
        }
        let raw = self.src[body_start..self.pos - quote.len_utf8()].to_string();
        Ok(Some((raw, self.span(start, self.pos))))
    }

    /// Scan a JSX identifier, which unlike a JS identifier may contain `-`.
    pub fn scan_jsx_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_ident_part(c) || c == '-' {
                self.bump_char();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

pub fn is_ident_part(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Longest-match punctuator lookup.
fn punctuator(rest: &str) -> Option<(Token, usize)> {
    for len in (1..=4).rev() {
        let Some(candidate) = rest.get(..len) else {
            continue;
        };
        let token = match candidate {
            ">>>=" => Token::GtGtGtEq,
            "..." => Token::Ellipsis,
            "===" => Token::EqEqEq,
            "!==" => Token::BangEqEq,
            "**=" => Token::StarStarEq,
            "<<=" => Token::LtLtEq,
            ">>=" => Token::GtGtEq,
            ">>>" => Token::GtGtGt,
            "&&=" => Token::AmpAmpEq,
            "||=" => Token::PipePipeEq,
            "??=" => Token::QuestionQuestionEq,
            "=>" => Token::Arrow,
            "==" => Token::EqEq,
            "!=" => Token::BangEq,
            "<=" => Token::LtEq,
            ">=" => Token::GtEq,
            "&&" => Token::AmpAmp,
            "||" => Token::PipePipe,
            "??" => Token::QuestionQuestion,
            // `a?.5:b` is a conditional, not optional chaining
            "?." if !matches!(rest[2..].chars().next(), Some('0'..='9')) => Token::QuestionDot,
            "++" => Token::PlusPlus,
            "--" => Token::MinusMinus,
            "+=" => Token::PlusEq,
            "-=" => Token::MinusEq,
            "*=" => Token::StarEq,
            "/=" => Token::SlashEq,
            "%=" => Token::PercentEq,
            "&=" => Token::AmpEq,
            "|=" => Token::PipeEq,
            "^=" => Token::CaretEq,
            "**" => Token::StarStar,
            "<<" => Token::LtLt,
            ">>" => Token::GtGt,
            "(" => Token::LParen,
            ")" => Token::RParen,
            "{" => Token::LBrace,
            "}" => Token::RBrace,
            "[" => Token::LBracket,
            "]" => Token::RBracket,
            ";" => Token::Semi,
            "," => Token::Comma,
            "." => Token::Dot,
            "?" => Token::Question,
            ":" => Token::Colon,
            "=" => Token::Eq,
            "<" => Token::Lt,
            ">" => Token::Gt,
            "+" => Token::Plus,
            "-" => Token::Minus,
            "*" => Token::Star,
            "/" => Token::Slash,
            "%" => Token::Percent,
            "!" => Token::Bang,
            "~" => Token::Tilde,
            "&" => Token::Amp,
            "|" => Token::Pipe,
            "^" => Token::Caret,
            _ => continue,
        };
        return Some((token, len));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src, 0, 0);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().expect("lex failed");
            if t.token == Token::Eof {
                break;
            }
            out.push(t.token);
        }
        out
    }

    #[test]
    fn longest_match_punctuators() {
        assert_eq!(
            tokens("a ?? b?.c === d >>>= 1"),
            vec![
                Token::Ident("a".into()),
                Token::QuestionQuestion,
                Token::Ident("b".into()),
                Token::QuestionDot,
                Token::Ident("c".into()),
                Token::EqEqEq,
                Token::Ident("d".into()),
                Token::GtGtGtEq,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn conditional_with_leading_dot_number() {
        assert_eq!(
            tokens("a?.5:b"),
            vec![
                Token::Ident("a".into()),
                Token::Question,
                Token::Number(0.5),
                Token::Colon,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("0xff 1_000 2.5e3 .25"),
            vec![
                Token::Number(255.0),
                Token::Number(1000.0),
                Token::Number(2500.0),
                Token::Number(0.25),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "aA\x42\n""#),
            vec![Token::Str("it's".into()), Token::Str("aAB\n".into())]
        );
    }

    #[test]
    fn template_substitutions_record_ranges() {
        let src = "`a${ {x: 1}.x }b`";
        let toks = tokens(src);
        let Token::Template { quasis, exprs } = &toks[0] else {
            panic!("expected template, got {:?}", toks);
        };
        assert_eq!(quasis, &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(&src[exprs[0].clone()], " {x: 1}.x ");
    }

    #[test]
    fn comments_mark_newlines() {
        let mut lexer = Lexer::new("a /* \n */ b", 0, 0);
        assert!(!lexer.next_token().unwrap().newline_before);
        assert!(lexer.next_token().unwrap().newline_before);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("'abc", 0, 0);
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn jsx_names_allow_hyphens() {
        let mut lexer = Lexer::new("aria-label=", 0, 0);
        assert_eq!(lexer.scan_jsx_name(), "aria-label");
    }
}
