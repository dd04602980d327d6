//! The `console` module: `write(object)` and `readline(): string`.

use super::add_function;
use crate::scope::SymbolKind;
use crate::types::{Param, TypeRegistry};
use netuno_nir::{Context, Module};
use std::rc::Rc;

pub(crate) fn register(context: &mut Context, registry: &TypeRegistry) {
    let mut module = Module::new(Some("console"));

    let write_type = registry.take_delegate_type(
        registry.void.clone(),
        vec![Param {
            name: Rc::from("object"),
            ty: registry.object.clone(),
        }],
    );
    add_function(
        context,
        &registry.console,
        "write",
        SymbolKind::SUBROUTINE,
        write_type,
        &mut module,
    );

    let readline_type = registry.take_delegate_type(registry.string.clone(), Vec::new());
    add_function(
        context,
        &registry.console,
        "readline",
        SymbolKind::FUNCTION,
        readline_type,
        &mut module,
    );

    registry.builtin_modules.borrow_mut().push(module);
}
