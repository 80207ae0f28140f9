use std::fmt;
use std::io;
use std::ops::Range;
use std::panic;
use std::thread;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

use crate::codegen::print_expr;
use crate::lower::lower_expr;
use crate::parser::{ParseError, Parser, Syntax};

/// Stack reserved for the thread that parses and lowers one source. The
/// parser's nesting limit is sized against it, not against the caller's
/// stack.
pub const TRANSFORM_STACK_SIZE: usize = 16 * 1024 * 1024;

/// A bare JavaScript expression with all JSX lowered to host factory calls
/// and all type syntax removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoweredCode(String);

impl LoweredCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LoweredCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Malformed author source.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct TransformError {
    pub message: String,
    /// The source line containing the error.
    pub source_excerpt: String,
    /// 1-based line of the error.
    pub line: usize,
    /// 1-based column (in characters) of the error.
    pub column: usize,
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl TransformError {
    fn from_parse_error(source: &str, err: ParseError) -> Self {
        let offset = err.span.start.min(source.len());
        let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[offset..]
            .find('\n')
            .map_or(source.len(), |i| offset + i);
        let line = source[..line_start].matches('\n').count() + 1;
        let column = source[line_start..offset].chars().count() + 1;

        TransformError {
            message: err.message,
            source_excerpt: source[line_start..line_end].trim_end_matches('\r').to_string(),
            line,
            column,
            span: err.span,
            notes: err.notes,
        }
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(format!("parse error: {}", self.message))
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

/// Parse author source as a single JSX/TypeScript expression and lower it.
///
/// The result is deterministic: the same source always yields byte-identical
/// output. Lowered code is itself valid input, and transforming it again
/// returns it unchanged.
///
/// Runs on its own thread with [`TRANSFORM_STACK_SIZE`] of stack, so deeply
/// nested source is rejected with an error whatever the caller's stack size.
pub fn transform(source: &str) -> Result<LoweredCode, TransformError> {
    on_transform_stack(|| transform_here(source)).unwrap_or_else(|e| {
        Err(TransformError {
            message: format!("cannot start transform thread: {}", e),
            source_excerpt: String::new(),
            line: 1,
            column: 1,
            span: 0..0,
            notes: Vec::new(),
        })
    })
}

fn transform_here(source: &str) -> Result<LoweredCode, TransformError> {
    let expr = Parser::new(source.to_string(), 0, Syntax::TSX)
        .parse_expression()
        .map_err(|err| TransformError::from_parse_error(source, err))?;
    Ok(LoweredCode(print_expr(&lower_expr(expr))))
}

/// Run `f` on a scoped thread with [`TRANSFORM_STACK_SIZE`] of stack. A panic
/// in `f` is resumed on the calling thread.
pub(crate) fn on_transform_stack<T, F>(f: F) -> io::Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    thread::scope(|scope| -> io::Result<T> {
        let handle = thread::Builder::new()
            .name("jsx-transform".to_string())
            .stack_size(TRANSFORM_STACK_SIZE)
            .spawn_scoped(scope, f)?;
        Ok(handle
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload)))
    })
}
