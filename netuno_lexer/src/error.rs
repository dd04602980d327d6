//! Lexer error definitions

use thiserror::Error;

/// Errors surfaced when a token stream is collected eagerly
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("line {line}: {message}")]
    InvalidToken { line: u32, message: String },
}
