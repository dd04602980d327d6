//! Instructions: opcodes, per-form payloads, builder constructors and
//! accessors.
//!
//! Opcode families occupy contiguous discriminant ranges, so the family
//! predicates are range checks. Every `create_*` builder allocates the
//! instruction value, derives its result type from the opcode rules, appends
//! it to the given basic block (recording it as the terminator when it is
//! one) and returns the new value id. Non-void results get a fresh
//! `Context::prefixed_id` name from the caller's hint; branches, stores and
//! returns stay unnamed.

use crate::block::insert_inst;
use crate::context::Context;
use crate::predicate::Predicate;
use crate::value::{Value, ValueData};
use crate::{BlockId, FunctionId, TypeId, ValueId};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // terminator instructions
    Ret = 0,
    Br,

    // unary operators
    FNeg,
    Alloca,
    Load,
    Trunc,
    ZExt,
    SExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    FpTrunc,
    PtrToInt,
    IntToPtr,
    BitCast,

    // binary operators
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,
    Shl,
    /// Shift right (logical)
    Shr,
    /// Shift right (arithmetic)
    Asr,
    And,
    Or,
    Xor,

    // others
    GetElementPtr,
    ExtractValue,
    Cmp,
    Phi,
    Call,
    Select,
    Store,
    InsertValue,
}

const TERM_OPS_BEGIN: u8 = Opcode::Ret as u8;
const TERM_OPS_END: u8 = Opcode::FNeg as u8;
const UNARY_OPS_BEGIN: u8 = Opcode::FNeg as u8;
const UNARY_OPS_END: u8 = Opcode::Add as u8;
const BINARY_OPS_BEGIN: u8 = Opcode::Add as u8;
const BINARY_OPS_END: u8 = Opcode::GetElementPtr as u8;
const OTHER_OPS_BEGIN: u8 = Opcode::GetElementPtr as u8;
const OTHER_OPS_END: u8 = Opcode::InsertValue as u8 + 1;

impl Opcode {
    pub const ALL: [Opcode; 42] = [
        Opcode::Ret,
        Opcode::Br,
        Opcode::FNeg,
        Opcode::Alloca,
        Opcode::Load,
        Opcode::Trunc,
        Opcode::ZExt,
        Opcode::SExt,
        Opcode::FpToUi,
        Opcode::FpToSi,
        Opcode::UiToFp,
        Opcode::SiToFp,
        Opcode::FpTrunc,
        Opcode::PtrToInt,
        Opcode::IntToPtr,
        Opcode::BitCast,
        Opcode::Add,
        Opcode::FAdd,
        Opcode::Sub,
        Opcode::FSub,
        Opcode::Mul,
        Opcode::FMul,
        Opcode::UDiv,
        Opcode::SDiv,
        Opcode::FDiv,
        Opcode::URem,
        Opcode::SRem,
        Opcode::FRem,
        Opcode::Shl,
        Opcode::Shr,
        Opcode::Asr,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::GetElementPtr,
        Opcode::ExtractValue,
        Opcode::Cmp,
        Opcode::Phi,
        Opcode::Call,
        Opcode::Select,
        Opcode::Store,
        Opcode::InsertValue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::FNeg => "fneg",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::FpToUi => "fp_to_ui",
            Opcode::FpToSi => "fp_to_si",
            Opcode::UiToFp => "ui_to_fp",
            Opcode::SiToFp => "si_to_fp",
            Opcode::FpTrunc => "fp_trunc",
            Opcode::PtrToInt => "ptr_to_int",
            Opcode::IntToPtr => "int_to_ptr",
            Opcode::BitCast => "bit_cast",
            Opcode::Add => "add",
            Opcode::FAdd => "fadd",
            Opcode::Sub => "sub",
            Opcode::FSub => "fsub",
            Opcode::Mul => "mul",
            Opcode::FMul => "fmul",
            Opcode::UDiv => "udiv",
            Opcode::SDiv => "sdiv",
            Opcode::FDiv => "fdiv",
            Opcode::URem => "urem",
            Opcode::SRem => "srem",
            Opcode::FRem => "frem",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Asr => "asr",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::GetElementPtr => "get_element_ptr",
            Opcode::ExtractValue => "extract_value",
            Opcode::Cmp => "cmp",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Select => "select",
            Opcode::Store => "store",
            Opcode::InsertValue => "insert_value",
        }
    }

    pub fn is_terminator(self) -> bool {
        (self as u8) >= TERM_OPS_BEGIN && (self as u8) < TERM_OPS_END
    }

    pub fn is_unary_op(self) -> bool {
        (self as u8) >= UNARY_OPS_BEGIN && (self as u8) < UNARY_OPS_END
    }

    pub fn is_binary_op(self) -> bool {
        (self as u8) >= BINARY_OPS_BEGIN && (self as u8) < BINARY_OPS_END
    }

    pub fn is_other_op(self) -> bool {
        (self as u8) >= OTHER_OPS_BEGIN && (self as u8) < OTHER_OPS_END
    }

    pub fn is_div_rem(self) -> bool {
        matches!(
            self,
            Opcode::UDiv | Opcode::SDiv | Opcode::FDiv | Opcode::URem | Opcode::SRem | Opcode::FRem
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Shr | Opcode::Asr)
    }

    pub fn is_logical_shift(self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Shr)
    }

    pub fn is_arithmetic_shift(self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Asr)
    }

    pub fn is_bitwise_logic_op(self) -> bool {
        matches!(self, Opcode::And | Opcode::Or | Opcode::Xor)
    }

    pub fn is_cast(self) -> bool {
        matches!(
            self,
            Opcode::Trunc
                | Opcode::ZExt
                | Opcode::SExt
                | Opcode::FpToUi
                | Opcode::FpToSi
                | Opcode::UiToFp
                | Opcode::SiToFp
                | Opcode::FpTrunc
                | Opcode::PtrToInt
                | Opcode::IntToPtr
                | Opcode::BitCast
        )
    }

    /// A op (B op C) === (A op B) op C
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor
        )
    }

    /// (A op B) === (B op A)
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::FAdd
                | Opcode::Mul
                | Opcode::FMul
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
        )
    }

    /// (A op A) === A
    pub fn is_idempotent(self) -> bool {
        matches!(self, Opcode::And | Opcode::Or)
    }

    /// (A op A) === identity
    pub fn is_nilpotent(self) -> bool {
        matches!(self, Opcode::Xor)
    }
}

#[derive(Debug)]
pub struct Instruction {
    pub opcode: Opcode,
    pub parent: Option<BlockId>,
    pub data: InstData,
}

#[derive(Debug)]
pub enum InstData {
    Binary {
        lhs: ValueId,
        rhs: ValueId,
    },
    Unary {
        operand: ValueId,
    },
    Branch {
        if_true: BlockId,
        if_false: Option<BlockId>,
        condition: Option<ValueId>,
    },
    Call {
        function_type: TypeId,
        callee: FunctionId,
        args: SmallVec<[ValueId; 4]>,
    },
    Cmp {
        predicate: Predicate,
        lhs: ValueId,
        rhs: ValueId,
    },
    Phi {
        incomings: Vec<(ValueId, BlockId)>,
    },
    Return {
        value: Option<ValueId>,
    },
    Select {
        condition: ValueId,
        if_true: ValueId,
        if_false: ValueId,
    },
    Store {
        value: ValueId,
        pointer: ValueId,
    },
}

/// Result of [`Context::phi_constant_value`]: the single merged value, or
/// the undefined sentinel when every incoming refers back to the phi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhiConstant {
    Value(ValueId),
    Undef,
}

impl Context {
    fn new_instruction(
        &mut self,
        opcode: Opcode,
        ty: TypeId,
        name: Option<&str>,
        data: InstData,
        block: BlockId,
    ) -> ValueId {
        let name = name.map(|hint| self.prefixed_id(hint));
        let id = self.push_value(Value {
            name,
            ty,
            dbg: None,
            data: ValueData::Instruction(Instruction {
                opcode,
                parent: None,
                data,
            }),
        });
        insert_inst(self, block, id);
        id
    }

    pub fn instruction(&self, id: ValueId) -> &Instruction {
        match &self.value(id).data {
            ValueData::Instruction(inst) => inst,
            _ => panic!("value is not an instruction"),
        }
    }

    fn instruction_mut(&mut self, id: ValueId) -> &mut Instruction {
        match &mut self.value_mut(id).data {
            ValueData::Instruction(inst) => inst,
            _ => panic!("value is not an instruction"),
        }
    }

    pub fn opcode(&self, id: ValueId) -> Opcode {
        self.instruction(id).opcode
    }

    pub fn instruction_parent(&self, id: ValueId) -> Option<BlockId> {
        self.instruction(id).parent
    }

    pub(crate) fn set_instruction_parent(&mut self, id: ValueId, parent: BlockId) {
        self.instruction_mut(id).parent = Some(parent);
    }

    // ------------------------------------------------------------------
    // binary

    /// Binary instruction; its result type is the first operand's type.
    pub fn create_binary(
        &mut self,
        op: Opcode,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
        block: BlockId,
    ) -> ValueId {
        debug_assert!(op.is_binary_op());

        let ty = self.value_type(lhs);
        self.new_instruction(op, ty, Some(name), InstData::Binary { lhs, rhs }, block)
    }

    /// `neg v` as `sub 0, v`.
    pub fn create_neg(&mut self, source: ValueId, name: &str, block: BlockId) -> ValueId {
        let ty = self.value_type(source);
        let zero = self.const_int(ty, 0, false);
        self.create_binary(Opcode::Sub, zero, source, name, block)
    }

    /// `not v` as `xor all-ones, v`.
    pub fn create_not(&mut self, source: ValueId, name: &str, block: BlockId) -> ValueId {
        let ty = self.value_type(source);
        let ones = self.const_int_all_ones(ty);
        self.create_binary(Opcode::Xor, ones, source, name, block)
    }

    pub fn binary_lhs(&self, id: ValueId) -> ValueId {
        match self.instruction(id).data {
            InstData::Binary { lhs, .. } => lhs,
            _ => panic!("not a binary instruction"),
        }
    }

    pub fn binary_rhs(&self, id: ValueId) -> ValueId {
        match self.instruction(id).data {
            InstData::Binary { rhs, .. } => rhs,
            _ => panic!("not a binary instruction"),
        }
    }

    // ------------------------------------------------------------------
    // branch

    /// Unconditional branch.
    pub fn create_branch(&mut self, dest: BlockId, block: BlockId) -> ValueId {
        let ty = self.void_type();
        self.new_instruction(
            Opcode::Br,
            ty,
            None,
            InstData::Branch {
                if_true: dest,
                if_false: None,
                condition: None,
            },
            block,
        )
    }

    /// Conditional branch; the condition must be i1.
    pub fn create_cond_branch(
        &mut self,
        if_true: BlockId,
        if_false: BlockId,
        condition: ValueId,
        block: BlockId,
    ) -> ValueId {
        debug_assert!(self.is_integer_n_type(self.value_type(condition), 1));

        let ty = self.void_type();
        self.new_instruction(
            Opcode::Br,
            ty,
            None,
            InstData::Branch {
                if_true,
                if_false: Some(if_false),
                condition: Some(condition),
            },
            block,
        )
    }

    pub fn is_unconditional(&self, id: ValueId) -> bool {
        match &self.instruction(id).data {
            InstData::Branch { condition, .. } => condition.is_none(),
            _ => panic!("not a branch instruction"),
        }
    }

    pub fn is_conditional(&self, id: ValueId) -> bool {
        !self.is_unconditional(id)
    }

    /// Condition of a branch or select.
    pub fn condition(&self, id: ValueId) -> Option<ValueId> {
        match &self.instruction(id).data {
            InstData::Branch { condition, .. } => *condition,
            InstData::Select { condition, .. } => Some(*condition),
            _ => panic!("not a branch or select instruction"),
        }
    }

    /// Replace the condition of a branch or select; must be i1.
    pub fn set_condition(&mut self, id: ValueId, condition: ValueId) {
        debug_assert!(self.is_integer_n_type(self.value_type(condition), 1));

        match &mut self.instruction_mut(id).data {
            InstData::Branch { condition: c, .. } => *c = Some(condition),
            InstData::Select { condition: c, .. } => *c = condition,
            _ => panic!("not a branch or select instruction"),
        }
    }

    /// Successor count of a terminator: 1 or 2 for branches, 0 for returns.
    pub fn successor_count(&self, id: ValueId) -> usize {
        match &self.instruction(id).data {
            InstData::Branch { if_false, .. } => {
                if if_false.is_some() {
                    2
                } else {
                    1
                }
            }
            InstData::Return { .. } => 0,
            _ => panic!("not a terminator instruction"),
        }
    }

    pub fn successor(&self, id: ValueId, index: usize) -> BlockId {
        match &self.instruction(id).data {
            InstData::Branch {
                if_true, if_false, ..
            } => match index {
                0 => *if_true,
                1 => if_false.expect("unconditional branch has one successor"),
                _ => panic!("successor index out of range"),
            },
            _ => panic!("not a branch instruction"),
        }
    }

    pub fn set_successor(&mut self, id: ValueId, index: usize, successor: BlockId) {
        match &mut self.instruction_mut(id).data {
            InstData::Branch {
                if_true, if_false, ..
            } => match index {
                0 => *if_true = successor,
                1 => {
                    debug_assert!(if_false.is_some());
                    *if_false = Some(successor);
                }
                _ => panic!("successor index out of range"),
            },
            _ => panic!("not a branch instruction"),
        }
    }

    // ------------------------------------------------------------------
    // call

    /// Call; the function type is retained explicitly so indirect calls
    /// stay possible without consulting the callee. Void calls get no name.
    pub fn create_call(
        &mut self,
        function_type: TypeId,
        callee: FunctionId,
        args: &[ValueId],
        name: &str,
        block: BlockId,
    ) -> ValueId {
        debug_assert!(self.is_function_type(function_type));

        let result = self.function_result_type(function_type);
        let name = if self.is_void_type(result) {
            None
        } else {
            Some(name)
        };
        self.new_instruction(
            Opcode::Call,
            result,
            name,
            InstData::Call {
                function_type,
                callee,
                args: SmallVec::from_slice(args),
            },
            block,
        )
    }

    pub fn call_function_type(&self, id: ValueId) -> TypeId {
        match &self.instruction(id).data {
            InstData::Call { function_type, .. } => *function_type,
            _ => panic!("not a call instruction"),
        }
    }

    pub fn callee(&self, id: ValueId) -> FunctionId {
        match &self.instruction(id).data {
            InstData::Call { callee, .. } => *callee,
            _ => panic!("not a call instruction"),
        }
    }

    pub fn set_callee(&mut self, id: ValueId, function_type: TypeId, callee: FunctionId) {
        debug_assert!(self.is_function_type(function_type));
        let result = self.function_result_type(function_type);

        self.value_mut(id).ty = result;
        match &mut self.instruction_mut(id).data {
            InstData::Call {
                function_type: ft,
                callee: c,
                ..
            } => {
                *ft = function_type;
                *c = callee;
            }
            _ => panic!("not a call instruction"),
        }
    }

    pub fn call_arg_count(&self, id: ValueId) -> usize {
        match &self.instruction(id).data {
            InstData::Call { args, .. } => args.len(),
            _ => panic!("not a call instruction"),
        }
    }

    pub fn call_arg(&self, id: ValueId, index: usize) -> ValueId {
        match &self.instruction(id).data {
            InstData::Call { args, .. } => args[index],
            _ => panic!("not a call instruction"),
        }
    }

    /// Replace an argument; types are not checked.
    pub fn set_call_arg(&mut self, id: ValueId, index: usize, value: ValueId) {
        match &mut self.instruction_mut(id).data {
            InstData::Call { args, .. } => args[index] = value,
            _ => panic!("not a call instruction"),
        }
    }

    // ------------------------------------------------------------------
    // cmp

    /// Comparison; the result is always i1.
    pub fn create_cmp(
        &mut self,
        predicate: Predicate,
        lhs: ValueId,
        rhs: ValueId,
        name: &str,
        block: BlockId,
    ) -> ValueId {
        let ty = self.int1_type();
        self.new_instruction(
            Opcode::Cmp,
            ty,
            Some(name),
            InstData::Cmp {
                predicate,
                lhs,
                rhs,
            },
            block,
        )
    }

    pub fn cmp_predicate(&self, id: ValueId) -> Predicate {
        match &self.instruction(id).data {
            InstData::Cmp { predicate, .. } => *predicate,
            _ => panic!("not a cmp instruction"),
        }
    }

    pub fn cmp_inverse_predicate(&self, id: ValueId) -> Predicate {
        self.cmp_predicate(id).inverse()
    }

    pub fn cmp_lhs(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Cmp { lhs, .. } => *lhs,
            _ => panic!("not a cmp instruction"),
        }
    }

    pub fn cmp_rhs(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Cmp { rhs, .. } => *rhs,
            _ => panic!("not a cmp instruction"),
        }
    }

    // ------------------------------------------------------------------
    // phi

    pub fn create_phi(&mut self, ty: TypeId, name: &str, block: BlockId) -> ValueId {
        self.new_instruction(
            Opcode::Phi,
            ty,
            Some(name),
            InstData::Phi {
                incomings: Vec::new(),
            },
            block,
        )
    }

    fn phi_incomings(&self, id: ValueId) -> &Vec<(ValueId, BlockId)> {
        match &self.instruction(id).data {
            InstData::Phi { incomings } => incomings,
            _ => panic!("not a phi instruction"),
        }
    }

    fn phi_incomings_mut(&mut self, id: ValueId) -> &mut Vec<(ValueId, BlockId)> {
        match &mut self.instruction_mut(id).data {
            InstData::Phi { incomings } => incomings,
            _ => panic!("not a phi instruction"),
        }
    }

    pub fn phi_incoming_count(&self, id: ValueId) -> usize {
        self.phi_incomings(id).len()
    }

    pub fn phi_incoming_value(&self, id: ValueId, index: usize) -> ValueId {
        self.phi_incomings(id)[index].0
    }

    pub fn set_phi_incoming_value(&mut self, id: ValueId, index: usize, value: ValueId) {
        self.phi_incomings_mut(id)[index].0 = value;
    }

    pub fn phi_incoming_block(&self, id: ValueId, index: usize) -> BlockId {
        self.phi_incomings(id)[index].1
    }

    pub fn set_phi_incoming_block(&mut self, id: ValueId, index: usize, block: BlockId) {
        self.phi_incomings_mut(id)[index].1 = block;
    }

    pub fn add_phi_incoming(&mut self, id: ValueId, value: ValueId, block: BlockId) {
        self.phi_incomings_mut(id).push((value, block));
    }

    pub fn remove_phi_incoming_value(&mut self, id: ValueId, index: usize) -> ValueId {
        self.phi_incomings_mut(id).remove(index).0
    }

    pub fn remove_phi_incoming_block(&mut self, id: ValueId, block: BlockId) -> ValueId {
        let index = self.phi_block_index(id, block);
        self.remove_phi_incoming_value(id, index)
    }

    /// Index of the incoming entry for `block`; the block must be present.
    pub fn phi_block_index(&self, id: ValueId, block: BlockId) -> usize {
        self.phi_incomings(id)
            .iter()
            .position(|&(_, b)| b == block)
            .expect("block is not an incoming block of the phi")
    }

    pub fn phi_incoming_value_for_block(&self, id: ValueId, block: BlockId) -> Option<ValueId> {
        self.phi_incomings(id)
            .iter()
            .find(|&&(_, b)| b == block)
            .map(|&(v, _)| v)
    }

    /// When the phi always merges the same value, that value; when every
    /// incoming refers back to the phi itself, the undef sentinel; otherwise
    /// `None`.
    pub fn phi_constant_value(&self, id: ValueId) -> Option<PhiConstant> {
        let incomings = self.phi_incomings(id);
        debug_assert!(!incomings.is_empty());

        let mut constant = incomings[0].0;
        for &(value, _) in &incomings[1..] {
            if value == constant || value == id {
                continue;
            }
            if constant != id {
                return None;
            }
            constant = value;
        }

        if constant == id {
            Some(PhiConstant::Undef)
        } else {
            Some(PhiConstant::Value(constant))
        }
    }

    /// Like [`Context::phi_constant_value`], but undefined incomings merge
    /// with anything.
    pub fn phi_has_constant_or_undef_value(&self, id: ValueId) -> bool {
        let incomings = self.phi_incomings(id);
        debug_assert!(!incomings.is_empty());

        let undef = self.undef_value();
        let mut constant = None;
        for &(value, _) in incomings {
            if value == id || value == undef {
                continue;
            }
            if let Some(c) = constant {
                if c != value {
                    return false;
                }
            }
            constant = Some(value);
        }
        true
    }

    /// A phi is complete when every predecessor of its parent block appears
    /// among its incoming blocks (and it has at least that many incomings).
    pub fn phi_is_complete(&self, id: ValueId) -> bool {
        let parent = self
            .instruction_parent(id)
            .expect("phi must be inserted into a block");

        let predecessors = self.block(parent).predecessors.clone();
        let incomings = self.phi_incomings(id);

        if incomings.len() < predecessors.len() {
            return false;
        }

        predecessors
            .iter()
            .all(|p| incomings.iter().any(|&(_, b)| b == *p))
    }

    // ------------------------------------------------------------------
    // return

    pub fn create_return(&mut self, value: Option<ValueId>, block: BlockId) -> ValueId {
        let ty = self.void_type();
        self.new_instruction(Opcode::Ret, ty, None, InstData::Return { value }, block)
    }

    pub fn return_value(&self, id: ValueId) -> Option<ValueId> {
        match &self.instruction(id).data {
            InstData::Return { value } => *value,
            _ => panic!("not a return instruction"),
        }
    }

    // ------------------------------------------------------------------
    // select

    /// `select cond, t, f`; `cond` must be i1 and the arms must share one
    /// non-void type.
    pub fn create_select(
        &mut self,
        condition: ValueId,
        if_true: ValueId,
        if_false: ValueId,
        name: &str,
        block: BlockId,
    ) -> ValueId {
        debug_assert!(self
            .select_operands_error(condition, if_true, if_false)
            .is_none());

        let ty = self.value_type(if_true);
        self.new_instruction(
            Opcode::Select,
            ty,
            Some(name),
            InstData::Select {
                condition,
                if_true,
                if_false,
            },
            block,
        )
    }

    pub fn select_true_value(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Select { if_true, .. } => *if_true,
            _ => panic!("not a select instruction"),
        }
    }

    pub fn select_false_value(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Select { if_false, .. } => *if_false,
            _ => panic!("not a select instruction"),
        }
    }

    pub fn set_select_true_value(&mut self, id: ValueId, value: ValueId) {
        match &mut self.instruction_mut(id).data {
            InstData::Select { if_true, .. } => *if_true = value,
            _ => panic!("not a select instruction"),
        }
    }

    pub fn set_select_false_value(&mut self, id: ValueId, value: ValueId) {
        match &mut self.instruction_mut(id).data {
            InstData::Select { if_false, .. } => *if_false = value,
            _ => panic!("not a select instruction"),
        }
    }

    /// Exchange the true and false arms. The caller must also invert the
    /// condition to preserve semantics.
    pub fn swap_select_values(&mut self, id: ValueId) {
        match &mut self.instruction_mut(id).data {
            InstData::Select {
                if_true, if_false, ..
            } => std::mem::swap(if_true, if_false),
            _ => panic!("not a select instruction"),
        }
    }

    /// Why the operands would not form a valid select, if they wouldn't.
    pub fn select_operands_error(
        &self,
        condition: ValueId,
        if_true: ValueId,
        if_false: ValueId,
    ) -> Option<&'static str> {
        if self.value_type(if_true) != self.value_type(if_false) {
            return Some("both values must have same type");
        }
        if self.is_void_type(self.value_type(if_true)) {
            return Some("values must not be void");
        }
        if !self.is_integer_n_type(self.value_type(condition), 1) {
            return Some("condition must be i1");
        }
        None
    }

    // ------------------------------------------------------------------
    // store

    /// `store value, [pointer]`; the pointer operand must have pointer type.
    pub fn create_store(&mut self, value: ValueId, pointer: ValueId, block: BlockId) -> ValueId {
        debug_assert!(self.is_pointer_type(self.value_type(pointer)));

        let ty = self.void_type();
        self.new_instruction(
            Opcode::Store,
            ty,
            None,
            InstData::Store { value, pointer },
            block,
        )
    }

    pub fn store_pointer_operand(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Store { pointer, .. } => *pointer,
            _ => panic!("not a store instruction"),
        }
    }

    pub fn store_pointer_operand_type(&self, id: ValueId) -> TypeId {
        self.value_type(self.store_pointer_operand(id))
    }

    pub fn store_value_operand(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Store { value, .. } => *value,
            _ => panic!("not a store instruction"),
        }
    }

    // ------------------------------------------------------------------
    // unary

    /// Unary instruction (fneg, alloca, load or a cast); the result type is
    /// the explicit `value_type` parameter.
    pub fn create_unary(
        &mut self,
        op: Opcode,
        value_type: TypeId,
        value: ValueId,
        name: &str,
        block: BlockId,
    ) -> ValueId {
        debug_assert!(op.is_unary_op(), "operation is not unary!");

        self.new_instruction(op, value_type, Some(name), InstData::Unary { operand: value }, block)
    }

    pub fn unary_operand(&self, id: ValueId) -> ValueId {
        match &self.instruction(id).data {
            InstData::Unary { operand } => *operand,
            _ => panic!("not a unary instruction"),
        }
    }

    pub fn unary_operand_type(&self, id: ValueId) -> TypeId {
        self.value_type(self.unary_operand(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(Opcode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_exactly_one_family_per_opcode(op in any_opcode()) {
            let families = [
                op.is_terminator(),
                op.is_unary_op(),
                op.is_binary_op(),
                op.is_other_op(),
            ];
            prop_assert_eq!(families.iter().filter(|&&f| f).count(), 1);
        }

        #[test]
        fn prop_casts_are_unary(op in any_opcode()) {
            if op.is_cast() {
                prop_assert!(op.is_unary_op());
            }
        }

        #[test]
        fn prop_associative_implies_commutative(op in any_opcode()) {
            if op.is_associative() {
                prop_assert!(op.is_commutative());
            }
        }

        #[test]
        fn prop_shift_classification(op in any_opcode()) {
            if op.is_logical_shift() || op.is_arithmetic_shift() {
                prop_assert!(op.is_shift());
            }
        }
    }

    #[test]
    fn test_family_boundaries() {
        assert!(Opcode::Ret.is_terminator());
        assert!(Opcode::Br.is_terminator());
        assert!(!Opcode::FNeg.is_terminator());

        assert!(Opcode::FNeg.is_unary_op());
        assert!(Opcode::BitCast.is_unary_op());
        assert!(!Opcode::Add.is_unary_op());

        assert!(Opcode::Add.is_binary_op());
        assert!(Opcode::Xor.is_binary_op());
        assert!(!Opcode::GetElementPtr.is_binary_op());

        assert!(Opcode::GetElementPtr.is_other_op());
        assert!(Opcode::InsertValue.is_other_op());
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::Ret.name(), "ret");
        assert_eq!(Opcode::FpToSi.name(), "fp_to_si");
        assert_eq!(Opcode::GetElementPtr.name(), "get_element_ptr");
    }
}
