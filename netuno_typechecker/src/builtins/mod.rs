//! Standard-type stubs.
//!
//! Declares the built-in types' helper functions — numeric/string casts,
//! `string.equals`/`string.concat`, `console.write`/`console.readline` — as
//! block-less IR function declarations, one IR module per built-in, and
//! records them as symbols on the owning type's field scope. The runtime
//! provides the bodies.

mod console;
mod numbers;
mod string;

use crate::scope::{Scope, ScopeKind, Symbol, SymbolKind, SymbolValue};
use crate::types::{to_nir_type, NtType, NtTypeRef, TypeRegistry};
use netuno_nir::{Context, Module};

pub(crate) fn register(context: &mut Context, registry: &TypeRegistry) {
    numbers::register(context, registry);
    string::register(context, registry);
    console::register(context, registry);
}

/// Declare `name` with the given delegate signature in `module` and record
/// it as a field symbol on `owner`.
pub(crate) fn add_function(
    context: &mut Context,
    owner: &NtType,
    name: &str,
    kind: SymbolKind,
    delegate_type: NtTypeRef,
    module: &mut Module,
) {
    let function_type = to_nir_type(context, &delegate_type);
    let function = module.get_or_insert_function(context, name, function_type);

    let symbol = Symbol::new(name, kind | SymbolKind::PUBLIC, delegate_type)
        .with_value(SymbolValue::Function(function));
    let inserted = owner.fields.borrow_mut().insert(symbol);
    debug_assert!(inserted);
}

/// The global table a compilation starts from: the `console` module plus
/// one entry per compiled file module, added by the driver.
pub fn build_global_scope(registry: &TypeRegistry) -> Scope {
    let mut scope = Scope::new(ScopeKind::None);
    scope.insert(
        Symbol::new(
            "console",
            SymbolKind::MODULE | SymbolKind::PUBLIC,
            registry.console.clone(),
        ),
    );
    scope
}
