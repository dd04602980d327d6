//! NIR — the Netuno SSA intermediate representation.
//!
//! A [`Context`] is the owning arena for everything the IR references: the
//! interned type descriptors, every value (constants, function arguments and
//! instruction results), basic blocks and functions. Cross-references are
//! stable 32-bit ids, so the cyclic relationships of the graph (instructions
//! know their block, blocks their function, phis and branches their target
//! blocks) never require shared ownership.
//!
//! A [`Module`] is an ordered list of functions built against one Context.
//! Instruction construction goes through the builder methods on `Context`
//! (`create_binary`, `create_cond_branch`, `create_phi`, ...), which append
//! to a basic block and enforce the terminator discipline.
//!
//! Precondition violations (wrong opcode family, appending past a
//! terminator, ill-typed select operands) are programming errors of the
//! caller and are checked with debug assertions, not `Result`s.

pub mod block;
pub mod context;
pub mod function;
pub mod instruction;
pub mod module;
pub mod predicate;
pub mod printer;
pub mod types;
pub mod value;

pub use block::BasicBlock;
pub use context::Context;
pub use function::Function;
pub use instruction::{InstData, Instruction, Opcode, PhiConstant};
pub use module::Module;
pub use predicate::Predicate;
pub use types::{Type, TypeKind};
pub use value::{Constant, DebugLoc, Value, ValueData};

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Identity of an interned type descriptor within its Context.
    TypeId
);
arena_id!(
    /// Identity of a value (constant, argument or instruction result).
    ValueId
);
arena_id!(
    /// Identity of a basic block.
    BlockId
);
arena_id!(
    /// Identity of a function.
    FunctionId
);
