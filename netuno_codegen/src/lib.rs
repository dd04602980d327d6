//! Lowering from the resolved Netuno AST to NIR.
//!
//! The engine keeps a cursor into the IR under construction — current
//! context, module, function, insertion block and scope chain — and walks
//! the module's declarations, emitting instructions through the builder API.
//! Diagnostics accumulate in the report so one compile can surface several
//! errors; a module that produced any error is discarded.

mod lowering;

pub use lowering::lower_module;
