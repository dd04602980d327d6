//! Modules: named, ordered lists of functions.
//!
//! Modules do not intern functions; lookup is a linear scan by name.

use crate::context::Context;
use crate::{FunctionId, TypeId};
use std::sync::Arc;

#[derive(Debug)]
pub struct Module {
    pub name: Option<Arc<str>>,
    pub source_file_name: Option<Arc<str>>,
    pub functions: Vec<FunctionId>,
}

impl Module {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(Arc::from),
            source_file_name: None,
            functions: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(Arc::from(name));
    }

    pub fn set_source_file_name(&mut self, name: &str) {
        self.source_file_name = Some(Arc::from(name));
    }

    pub fn get_function(&self, context: &Context, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .copied()
            .find(|&f| &**context.function_name(f) == name)
    }

    /// Return the function of that name, or create and append a new one.
    /// The type of an existing function is not checked.
    pub fn get_or_insert_function(
        &mut self,
        context: &mut Context,
        name: &str,
        ty: TypeId,
    ) -> FunctionId {
        if let Some(existing) = self.get_function(context, name) {
            return existing;
        }

        let function = context.create_function(name, ty);
        self.functions.push(function);
        function
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_is_idempotent_by_name() {
        let mut context = Context::new();
        let mut module = Module::new(Some("m"));

        let void = context.void_type();
        let int32 = context.int32_type();
        let ty_a = context.function_type(void, &[], false);
        let ty_b = context.function_type(int32, &[int32], false);

        let f = module.get_or_insert_function(&mut context, "f", ty_a);
        let f_again = module.get_or_insert_function(&mut context, "f", ty_b);
        assert_eq!(f, f_again);
        assert_eq!(module.functions.len(), 1);

        let g = module.get_or_insert_function(&mut context, "g", ty_b);
        assert_ne!(f, g);
        assert_eq!(module.functions.len(), 2);
        assert_eq!(module.get_function(&context, "g"), Some(g));
        assert_eq!(module.get_function(&context, "h"), None);
    }
}
