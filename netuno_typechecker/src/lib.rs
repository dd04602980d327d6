//! Semantic analysis for Netuno: the language-level type model, lexical
//! scopes, the built-in standard types, and the resolver pass that annotates
//! the AST with expression types and forward-declares functions so that
//! recursion type-checks.

pub mod builtins;
pub mod resolver;
pub mod scope;
pub mod types;

pub use resolver::{eval_block_return_type, eval_expr_type, find_type, resolve, TypeMap};
pub use scope::{Scope, ScopeKind, ScopeStack, Symbol, SymbolKind, SymbolValue};
pub use types::{
    same_type, to_nir_type, DelegateData, NtType, NtTypeKind, NtTypeRef, Param, TypeRegistry,
};
