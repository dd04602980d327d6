//! Diagnostic accumulation for the resolver and the lowering engine.
//!
//! A [`Report`] collects every diagnostic produced while walking a module so
//! that a single compile can surface multiple errors; callers check
//! [`Report::had_error`] at phase boundaries.

use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a severity level for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Error severity (compilation cannot produce output)
    Error,
    /// Warning severity (compilation can continue but there may be issues)
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic message with its source position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub position: Position,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.position, self.severity, self.message)
    }
}

/// Accumulates diagnostics across a compilation phase
#[derive(Debug, Clone, Default)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error diagnostic; compilation continues but no output is
    /// produced at the end of the phase.
    pub fn error_at(&mut self, position: Position, message: impl Into<String>) {
        self.had_error = true;
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            position,
            message: message.into(),
        });
    }

    /// Append a warning diagnostic.
    pub fn warning_at(&mut self, position: Position, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            position,
            message: message.into(),
        });
    }

    /// True once any error diagnostic has been reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Move every diagnostic from `other` into this report.
    pub fn merge(&mut self, other: Report) {
        self.had_error |= other.had_error;
        self.diagnostics.extend(other.diagnostics);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_accumulates() {
        let mut report = Report::new();
        assert!(!report.had_error());

        report.warning_at(Position::new(1), "unused value");
        assert!(!report.had_error());

        report.error_at(Position::new(2), "type mismatch");
        assert!(report.had_error());
        assert_eq!(report.diagnostics().len(), 2);
    }

    #[test]
    fn test_merge_carries_error_flag() {
        let mut a = Report::new();
        let mut b = Report::new();
        b.error_at(Position::new(3), "undeclared symbol");

        a.merge(b);
        assert!(a.had_error());
        assert_eq!(a.diagnostics().len(), 1);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            severity: Severity::Error,
            position: Position::new(4),
            message: "boom".to_string(),
        };
        assert_eq!(d.to_string(), "line 4: error: boom");
    }
}
