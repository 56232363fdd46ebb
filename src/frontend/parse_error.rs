use thiserror::Error;

/// A lexing or parsing error with source location.
///
/// `line` and `col` are 1-based. Errors at end of input point at the last
/// consumed token so locations are never `0:0`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {line}:{col}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            col,
        }
    }
}
