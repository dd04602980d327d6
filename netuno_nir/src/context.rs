//! The owning arena of the IR.

use crate::block::BasicBlock;
use crate::function::Function;
use crate::types::{Type, TypeKind};
use crate::value::{Constant, Value, ValueData};
use crate::{BlockId, FunctionId, TypeId, ValueId};
use indexmap::IndexMap;
use std::sync::Arc;

/// Owns all interned types, values, blocks and functions, plus the
/// per-prefix counters used to mint unique value names. One Context is not
/// safe for concurrent mutation; independent Contexts may live on different
/// threads, and ids from different Contexts must never be mixed.
pub struct Context {
    pub(crate) types: Vec<Type>,
    pub(crate) values: Vec<Value>,
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) functions: Vec<Function>,

    pub(crate) error_type: TypeId,
    pub(crate) void_type: TypeId,
    pub(crate) label_type: TypeId,
    pub(crate) float_type: TypeId,
    pub(crate) double_type: TypeId,
    pub(crate) opaque_ptr_type: TypeId,

    pub(crate) integer_types: Vec<TypeId>,
    pub(crate) pointer_types: Vec<TypeId>,
    pub(crate) array_types: Vec<TypeId>,
    pub(crate) struct_types: Vec<TypeId>,
    pub(crate) function_types: Vec<TypeId>,

    undef: ValueId,
    prefixes: IndexMap<String, u64>,
}

impl Context {
    pub fn new() -> Self {
        let mut context = Self {
            types: Vec::new(),
            values: Vec::new(),
            blocks: Vec::new(),
            functions: Vec::new(),
            error_type: TypeId(0),
            void_type: TypeId(0),
            label_type: TypeId(0),
            float_type: TypeId(0),
            double_type: TypeId(0),
            opaque_ptr_type: TypeId(0),
            integer_types: Vec::new(),
            pointer_types: Vec::new(),
            array_types: Vec::new(),
            struct_types: Vec::new(),
            function_types: Vec::new(),
            undef: ValueId(0),
            prefixes: IndexMap::new(),
        };

        context.error_type = context.push_type(TypeKind::Error);
        context.void_type = context.push_type(TypeKind::Void);
        context.label_type = context.push_type(TypeKind::Label);
        context.float_type = context.push_type(TypeKind::Float);
        context.double_type = context.push_type(TypeKind::Double);

        let opaque = context.push_type(TypeKind::Pointer { pointee: None });
        context.pointer_types.push(opaque);
        context.opaque_ptr_type = opaque;

        context.undef = context.push_value(Value {
            name: None,
            ty: context.error_type,
            dbg: None,
            data: ValueData::Constant(Constant::Undef),
        });

        context
    }

    /// Mint a fresh name `prefix<n>`; the counter for each prefix starts at
    /// zero and increments on every call.
    pub fn prefixed_id(&mut self, prefix: &str) -> Arc<str> {
        let counter = self.prefixes.entry(prefix.to_string()).or_insert(0);
        let name = format!("{}{}", prefix, *counter);
        *counter += 1;
        Arc::from(name)
    }

    /// The shared undefined-value sentinel (e.g. the result of a phi whose
    /// incomings are all self-references).
    pub fn undef_value(&self) -> ValueId {
        self.undef
    }

    // ------------------------------------------------------------------
    // arena plumbing

    pub(crate) fn push_type(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type { kind });
        id
    }

    pub(crate) fn push_value(&mut self, value: Value) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(value);
        id
    }

    pub(crate) fn push_block(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub(crate) fn push_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.index()]
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ids_count_per_prefix() {
        let mut context = Context::new();
        assert_eq!(&*context.prefixed_id("add"), "add0");
        assert_eq!(&*context.prefixed_id("add"), "add1");
        assert_eq!(&*context.prefixed_id("mul"), "mul0");
        assert_eq!(&*context.prefixed_id("add"), "add2");
    }

    #[test]
    fn test_singletons_exist_at_construction() {
        let context = Context::new();
        assert!(matches!(context.ty(context.error_type).kind, TypeKind::Error));
        assert!(matches!(context.ty(context.void_type).kind, TypeKind::Void));
        assert!(matches!(
            context.ty(context.opaque_ptr_type).kind,
            TypeKind::Pointer { pointee: None }
        ));
    }
}
