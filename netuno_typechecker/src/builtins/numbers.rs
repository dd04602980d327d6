//! Numeric and bool built-ins: each primitive owns a `to_string` helper
//! taking the primitive and returning a string.

use super::add_function;
use crate::scope::SymbolKind;
use crate::types::{Param, TypeRegistry};
use netuno_nir::{Context, Module};
use std::rc::Rc;

pub(crate) fn register(context: &mut Context, registry: &TypeRegistry) {
    for primitive in [
        &registry.bool_,
        &registry.i32_,
        &registry.i64_,
        &registry.u32_,
        &registry.u64_,
        &registry.f32_,
        &registry.f64_,
    ] {
        let mut module = Module::new(Some(&primitive.name));

        let delegate_type = registry.take_delegate_type(
            registry.string.clone(),
            vec![Param {
                name: Rc::from("object"),
                ty: primitive.clone(),
            }],
        );
        add_function(
            context,
            primitive,
            "to_string",
            SymbolKind::FUNCTION,
            delegate_type,
            &mut module,
        );

        registry.builtin_modules.borrow_mut().push(module);
    }
}
