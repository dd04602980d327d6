//! Parser error definitions

use netuno_lexer::LexError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("line {line}: {message}")]
    UnexpectedToken { line: u32, message: String },

    #[error("line {line}: can't have more than 255 {what}")]
    TooMany { line: u32, what: &'static str },
}
