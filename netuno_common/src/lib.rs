//! Shared infrastructure for the Netuno compiler: source positions and the
//! diagnostic report that the resolver and the lowering engine accumulate
//! errors into.

pub mod diagnostics;
pub mod position;

pub use diagnostics::{Diagnostic, Report, Severity};
pub use position::Position;
