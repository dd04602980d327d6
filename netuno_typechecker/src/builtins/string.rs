//! String built-ins: parsing casts `to_<primitive>` plus `equals` and
//! `concat`, all externally provided.

use super::add_function;
use crate::scope::SymbolKind;
use crate::types::{Param, TypeRegistry};
use netuno_nir::{Context, Module};
use std::rc::Rc;

pub(crate) fn register(context: &mut Context, registry: &TypeRegistry) {
    let mut module = Module::new(Some("string"));

    // string -> primitive parsing casts live on the string type
    for primitive in [
        &registry.bool_,
        &registry.i32_,
        &registry.i64_,
        &registry.u32_,
        &registry.u64_,
        &registry.f32_,
        &registry.f64_,
    ] {
        let name = format!("to_{}", primitive.name);
        let delegate_type = registry.take_delegate_type(
            (*primitive).clone(),
            vec![Param {
                name: Rc::from("object"),
                ty: registry.string.clone(),
            }],
        );
        add_function(
            context,
            &registry.string,
            &name,
            SymbolKind::FUNCTION,
            delegate_type,
            &mut module,
        );
    }

    let binary_params = |registry: &TypeRegistry| {
        vec![
            Param {
                name: Rc::from("left"),
                ty: registry.string.clone(),
            },
            Param {
                name: Rc::from("right"),
                ty: registry.string.clone(),
            },
        ]
    };

    let equals_type =
        registry.take_delegate_type(registry.bool_.clone(), binary_params(registry));
    add_function(
        context,
        &registry.string,
        "equals",
        SymbolKind::FUNCTION,
        equals_type,
        &mut module,
    );

    let concat_type =
        registry.take_delegate_type(registry.string.clone(), binary_params(registry));
    add_function(
        context,
        &registry.string,
        "concat",
        SymbolKind::FUNCTION,
        concat_type,
        &mut module,
    );

    registry.builtin_modules.borrow_mut().push(module);
}
