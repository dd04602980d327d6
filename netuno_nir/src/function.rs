//! Functions.
//!
//! A function carries its name, its function type, one argument value per
//! parameter and the ordered block list; the first inserted block is the
//! entry block by convention. A function without blocks is a declaration.

use crate::context::Context;
use crate::value::{Value, ValueData};
use crate::{BlockId, FunctionId, TypeId, ValueId};
use std::sync::Arc;

#[derive(Debug)]
pub struct Function {
    pub name: Arc<str>,
    pub ty: TypeId,
    pub args: Vec<ValueId>,
    pub blocks: Vec<BlockId>,
}

impl Context {
    /// Allocate a function with one argument value per parameter of `ty`,
    /// each freshly named with the `arg` prefix.
    pub fn create_function(&mut self, name: &str, ty: TypeId) -> FunctionId {
        debug_assert!(self.is_function_type(ty));

        let id = FunctionId(self.functions.len() as u32);

        let param_count = self.function_num_params(ty);
        let mut args = Vec::with_capacity(param_count);
        for index in 0..param_count {
            let param_type = self.function_param_type(ty, index);
            let arg_name = self.prefixed_id("arg");
            args.push(self.push_value(Value {
                name: Some(arg_name),
                ty: param_type,
                dbg: None,
                data: ValueData::Argument {
                    function: id,
                    index: index as u32,
                },
            }));
        }

        self.push_function(Function {
            name: Arc::from(name),
            ty,
            args,
            blocks: Vec::new(),
        })
    }

    pub fn function_name(&self, id: FunctionId) -> &Arc<str> {
        &self.function(id).name
    }

    pub fn function_ty(&self, id: FunctionId) -> TypeId {
        self.function(id).ty
    }

    pub fn function_param_count(&self, id: FunctionId) -> usize {
        self.function(id).args.len()
    }

    pub fn function_param_value(&self, id: FunctionId, index: usize) -> ValueId {
        self.function(id).args[index]
    }

    pub fn function_blocks(&self, id: FunctionId) -> &[BlockId] {
        &self.function(id).blocks
    }

    /// A function with no basic blocks is a declaration.
    pub fn is_declaration(&self, id: FunctionId) -> bool {
        self.function(id).blocks.is_empty()
    }

    pub fn function_entry_block(&self, id: FunctionId) -> Option<BlockId> {
        self.function(id).blocks.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_arguments_match_parameters() {
        let mut context = Context::new();
        let int32 = context.int32_type();
        let double = context.double_type();
        let ty = context.function_type(int32, &[int32, double], false);

        let f = context.create_function("f", ty);
        assert_eq!(context.function_param_count(f), 2);
        assert!(context.is_declaration(f));

        let a0 = context.function_param_value(f, 0);
        let a1 = context.function_param_value(f, 1);
        assert_eq!(context.value_type(a0), int32);
        assert_eq!(context.value_type(a1), double);
        assert!(context.is_argument(a0));
        assert_eq!(&**context.value_name(a0).unwrap(), "arg0");
        assert_eq!(&**context.value_name(a1).unwrap(), "arg1");
    }

    #[test]
    fn test_first_inserted_block_is_entry() {
        let mut context = Context::new();
        let void = context.void_type();
        let ty = context.function_type(void, &[], false);
        let f = context.create_function("f", ty);

        let entry = context.create_block("entry");
        let other = context.create_block("exit");
        context.insert_block_into(entry, f);
        context.insert_block_into(other, f);

        assert_eq!(context.function_entry_block(f), Some(entry));
        assert_eq!(context.function_blocks(f), &[entry, other]);
        assert!(!context.is_declaration(f));
        assert_eq!(context.block_parent(entry), Some(f));
    }
}
