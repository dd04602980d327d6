use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a position in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: u32,
}

impl Position {
    /// Create a new position
    pub fn new(line: u32) -> Self {
        Self { line }
    }

    /// Position for synthetic nodes that have no source location
    pub fn synthetic() -> Self {
        Self { line: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)
    }
}
