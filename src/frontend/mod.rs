//! Source text to syntax tree.

pub mod lexer;
pub mod parse_error;
pub mod parser;
pub mod token;

pub use parse_error::ParseError;

use crate::lang::Program;

/// Lex and parse a whole source file.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parser::Parser::new(tokens).parse()
}
