//! Basic blocks.
//!
//! A block owns the ordered list of its instruction values and tracks its
//! terminator; once the terminator is set no further instruction may be
//! appended. Predecessor bookkeeping is left to the caller (the lowering
//! engine or a later pass) — the block only stores and exposes the list.

use crate::context::Context;
use crate::{BlockId, FunctionId, ValueId};
use std::sync::Arc;

#[derive(Debug)]
pub struct BasicBlock {
    pub name: Arc<str>,
    pub parent: Option<FunctionId>,
    pub terminator: Option<ValueId>,
    pub instructions: Vec<ValueId>,
    pub predecessors: Vec<BlockId>,
}

/// Append `inst` to `block`, recording it as the terminator when its opcode
/// is one. Appending past a terminator is a programming error.
pub(crate) fn insert_inst(context: &mut Context, block: BlockId, inst: ValueId) {
    debug_assert!(context.block(block).terminator.is_none());
    debug_assert!(context.is_instruction(inst));

    let opcode = context.opcode(inst);
    context.set_instruction_parent(inst, block);

    let data = context.block_mut(block);
    data.instructions.push(inst);
    if opcode.is_terminator() {
        data.terminator = Some(inst);
    }
}

impl Context {
    /// Create a detached basic block. The literal name `entry` is kept
    /// as-is; any other name is made unique through the prefix counter.
    pub fn create_block(&mut self, name: &str) -> BlockId {
        let name = if name == "entry" {
            Arc::from(name)
        } else {
            self.prefixed_id(name)
        };

        self.push_block(BasicBlock {
            name,
            parent: None,
            terminator: None,
            instructions: Vec::new(),
            predecessors: Vec::new(),
        })
    }

    pub fn block_name(&self, id: BlockId) -> &Arc<str> {
        &self.block(id).name
    }

    pub fn block_parent(&self, id: BlockId) -> Option<FunctionId> {
        self.block(id).parent
    }

    pub fn block_instructions(&self, id: BlockId) -> &[ValueId] {
        &self.block(id).instructions
    }

    pub fn block_instruction_count(&self, id: BlockId) -> usize {
        self.block(id).instructions.len()
    }

    pub fn block_last_value(&self, id: BlockId) -> Option<ValueId> {
        self.block(id).instructions.last().copied()
    }

    pub fn block_terminator(&self, id: BlockId) -> Option<ValueId> {
        self.block(id).terminator
    }

    /// Attach the block to a function; allowed at most once per block.
    pub fn insert_block_into(&mut self, block: BlockId, function: FunctionId) {
        debug_assert!(self.block(block).parent.is_none());

        self.block_mut(block).parent = Some(function);
        self.function_mut(function).blocks.push(block);
    }

    pub fn add_predecessor(&mut self, block: BlockId, predecessor: BlockId) {
        self.block_mut(block).predecessors.push(predecessor);
    }

    pub fn predecessor_count(&self, id: BlockId) -> usize {
        self.block(id).predecessors.len()
    }

    pub fn predecessor(&self, id: BlockId, index: usize) -> BlockId {
        self.block(id).predecessors[index]
    }

    /// The predecessor when there is exactly one entry, else `None`.
    pub fn single_predecessor(&self, id: BlockId) -> Option<BlockId> {
        match self.block(id).predecessors.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// The predecessor when all entries name the same block, else `None`.
    pub fn unique_predecessor(&self, id: BlockId) -> Option<BlockId> {
        let predecessors = &self.block(id).predecessors;
        let first = *predecessors.first()?;
        if predecessors.iter().all(|&p| p == first) {
            Some(first)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opcode;

    #[test]
    fn test_entry_name_is_preserved() {
        let mut context = Context::new();
        let entry = context.create_block("entry");
        assert_eq!(&**context.block_name(entry), "entry");

        let then0 = context.create_block("then");
        let then1 = context.create_block("then");
        assert_eq!(&**context.block_name(then0), "then0");
        assert_eq!(&**context.block_name(then1), "then1");
    }

    #[test]
    fn test_terminator_tracking() {
        let mut context = Context::new();
        let block = context.create_block("entry");
        let exit = context.create_block("exit");

        let int32 = context.int32_type();
        let lhs = context.const_int(int32, 1, false);
        let rhs = context.const_int(int32, 2, false);
        let sum = context.create_binary(Opcode::Add, lhs, rhs, "add", block);
        assert_eq!(context.block_terminator(block), None);
        assert_eq!(context.block_last_value(block), Some(sum));

        let br = context.create_branch(exit, block);
        assert_eq!(context.block_terminator(block), Some(br));
        assert_eq!(context.instruction_parent(br), Some(block));
    }

    #[test]
    fn test_predecessor_queries() {
        let mut context = Context::new();
        let a = context.create_block("a");
        let b = context.create_block("b");
        let merge = context.create_block("merge");

        assert_eq!(context.single_predecessor(merge), None);
        assert_eq!(context.unique_predecessor(merge), None);

        context.add_predecessor(merge, a);
        assert_eq!(context.single_predecessor(merge), Some(a));
        assert_eq!(context.unique_predecessor(merge), Some(a));

        context.add_predecessor(merge, a);
        assert_eq!(context.single_predecessor(merge), None);
        assert_eq!(context.unique_predecessor(merge), Some(a));

        context.add_predecessor(merge, b);
        assert_eq!(context.single_predecessor(merge), None);
        assert_eq!(context.unique_predecessor(merge), None);
    }
}
