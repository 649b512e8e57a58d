//! The single error type produced by every stage of the assembler.

use std::error::Error as StdError;
use std::fmt;

/// An assembly failure, carrying enough context for a caller to underline
/// the offending source text (an editor, a CLI, a log line).
///
/// Every stage — lexer, parser, IR generator, codegen — converges on this
/// one type; the first error aborts the whole `assemble` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssemblerError {
    pub message: String,
    pub source_line: String,
    pub line: usize,
    pub col: usize,
    pub span_len: usize,
    path: Option<String>,
}

impl AssemblerError {
    pub fn new(message: String, source_line: String, line: usize, col: usize, span_len: usize) -> Self {
        AssemblerError {
            message,
            source_line,
            line,
            col,
            span_len,
            path: None,
        }
    }

    /// Attach a file path so `Display` prints `path:line:col: ...` instead
    /// of just `line:col: ...`.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }
}

impl fmt::Display for AssemblerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => writeln!(
                f,
                "{}:{}:{}: error: {}",
                path,
                self.line + 1,
                self.col + 1,
                self.message
            )?,
            None => writeln!(f, "{}:{}: error: {}", self.line + 1, self.col + 1, self.message)?,
        }
        writeln!(f, "{}", self.source_line)?;
        let pointer_len = self.span_len.max(1);
        write!(f, "{}{}", " ".repeat(self.col), "^".repeat(pointer_len))
    }
}

impl StdError for AssemblerError {}

pub type Result<T> = std::result::Result<T, AssemblerError>;
