//! The lowering engine.

use netuno_common::Report;
use netuno_lexer::{scanner, KeywordId, TokenType};
use netuno_parser::{LiteralType, Node, NodeClass, NodeKind};
use netuno_nir::{
    BlockId, Context, FunctionId, Module, Opcode, Predicate, TypeId, ValueId,
};
use netuno_typechecker::types::is_assignable_from;
use netuno_typechecker::{
    eval_block_return_type, eval_expr_type, find_type, same_type, to_nir_type, NtTypeKind,
    NtTypeRef, Param, Scope, ScopeKind, ScopeStack, Symbol, SymbolKind, SymbolValue, TypeMap,
    TypeRegistry,
};
use std::rc::Rc;

/// Lower one resolved module to IR. Returns `None` when any diagnostic of
/// error severity was produced; the report then explains why.
pub fn lower_module(
    context: &mut Context,
    registry: &Rc<TypeRegistry>,
    types: &mut TypeMap,
    report: &mut Report,
    global: Scope,
    node: &Node,
) -> Option<Module> {
    debug_assert!(node.is(NodeClass::Stmt, NodeKind::Module));

    let mut lowering = Lowering {
        context,
        registry: registry.clone(),
        types,
        report,
        module: Module::new(Some(&node.token.lexeme)),
        function: None,
        block: None,
        init_function: None,
        module_type: global
            .lookup(&node.token.lexeme)
            .and_then(|s| s.expr_type.clone()),
        scopes: ScopeStack::new(global),
        public: false,
    };
    lowering.module(node)
}

struct Lowering<'a> {
    context: &'a mut Context,
    registry: Rc<TypeRegistry>,
    types: &'a mut TypeMap,
    report: &'a mut Report,
    module: Module,
    function: Option<FunctionId>,
    block: Option<BlockId>,
    /// Synthetic `<module>.init` function holding module-level variable
    /// declarations.
    init_function: Option<(FunctionId, BlockId)>,
    /// The module's semantic type from the global table, when the driver
    /// registered one; public functions are mirrored onto its fields.
    module_type: Option<NtTypeRef>,
    scopes: ScopeStack,
    public: bool,
}

impl Lowering<'_> {
    // ------------------------------------------------------------------
    // cursor helpers

    fn cur_block(&self) -> BlockId {
        self.block.expect("lowering requires an insertion block")
    }

    fn cur_function(&self) -> FunctionId {
        self.function.expect("lowering requires a current function")
    }

    fn terminated(&self) -> bool {
        self.context.block_terminator(self.cur_block()).is_some()
    }

    /// Unconditional branch from `from`, maintaining predecessor lists.
    fn branch_from(&mut self, from: BlockId, dest: BlockId) -> ValueId {
        let value = self.context.create_branch(dest, from);
        self.context.add_predecessor(dest, from);
        value
    }

    fn branch(&mut self, dest: BlockId) -> ValueId {
        self.branch_from(self.cur_block(), dest)
    }

    /// Conditional branch from `from`, maintaining predecessor lists.
    fn cond_branch_from(
        &mut self,
        from: BlockId,
        if_true: BlockId,
        if_false: BlockId,
        condition: ValueId,
    ) -> ValueId {
        let value = self
            .context
            .create_cond_branch(if_true, if_false, condition, from);
        self.context.add_predecessor(if_true, from);
        self.context.add_predecessor(if_false, from);
        value
    }

    fn eval(&mut self, node: &Node) -> NtTypeRef {
        eval_expr_type(&self.registry, self.types, self.report, &self.scopes, node)
    }

    fn find_type(&mut self, node: &Node) -> NtTypeRef {
        find_type(&self.registry, self.report, &self.scopes, node)
    }

    fn error_at(&mut self, node: &Node, message: impl Into<String>) {
        self.report.error_at(node.position(), message);
    }

    fn visibility(&self) -> SymbolKind {
        if self.public {
            SymbolKind::PUBLIC
        } else {
            SymbolKind::PRIVATE
        }
    }

    // ------------------------------------------------------------------
    // expressions

    fn expression(&mut self, node: &Node, need_value: bool) -> Option<ValueId> {
        debug_assert_eq!(node.class, NodeClass::Expr);

        match node.kind {
            NodeKind::Literal => self.literal(node),
            NodeKind::Unary => self.unary(node),
            NodeKind::Binary => self.binary(node),
            NodeKind::Variable => self.variable(node),
            NodeKind::Assign => self.assign(node),
            NodeKind::Logical => self.logical(node),
            NodeKind::Get => self.get(node),
            NodeKind::Call => self.call(node, need_value),
            _ => {
                self.error_at(
                    node,
                    format!("Unrecognized expression. (Lexeme: {})", node.token.lexeme),
                );
                None
            }
        }
    }

    fn literal(&mut self, node: &Node) -> Option<ValueId> {
        match node.literal_type {
            LiteralType::Bool => {
                let int1 = self.context.int1_type();
                match node.token.keyword_id() {
                    Some(KeywordId::True) => Some(self.context.const_int_true(int1)),
                    Some(KeywordId::False) => Some(self.context.const_int_false(int1)),
                    _ => {
                        self.error_at(node, "A bool literal must be 'true' or 'false'.");
                        None
                    }
                }
            }
            LiteralType::None => {
                let int1 = self.context.int1_type();
                let zero = self.context.const_int_false(int1);
                let opaque = self.context.opaque_pointer_type();
                let block = self.cur_block();
                Some(
                    self.context
                        .create_unary(Opcode::IntToPtr, opaque, zero, "none", block),
                )
            }
            LiteralType::String => {
                let lexeme = &node.token.lexeme;
                // the lexeme keeps its surrounding quotes
                let body = &lexeme[1..lexeme.len() - 1];
                let decoded = scanner::unescape(body);
                let char_type = self.context.int32_type();
                Some(self.context.const_string(char_type, &decoded))
            }
            _ => self.number(node),
        }
    }

    fn number(&mut self, node: &Node) -> Option<ValueId> {
        let digits: &str = node
            .token
            .lexeme
            .trim_end_matches(|c: char| c.is_ascii_alphabetic());

        match node.token.token_type {
            TokenType::I32 => {
                let value: u32 = self.parse_number(node, digits)?;
                let ty = self.context.int32_type();
                Some(self.context.const_int(ty, value as u64, true))
            }
            TokenType::U32 => {
                let value: u32 = self.parse_number(node, digits)?;
                let ty = self.context.int32_type();
                Some(self.context.const_int(ty, value as u64, false))
            }
            TokenType::I64 => {
                let value: u64 = self.parse_number(node, digits)?;
                let ty = self.context.int64_type();
                Some(self.context.const_int(ty, value, true))
            }
            TokenType::U64 => {
                let value: u64 = self.parse_number(node, digits)?;
                let ty = self.context.int64_type();
                Some(self.context.const_int(ty, value, false))
            }
            TokenType::F32 => {
                let value: f32 = self.parse_number(node, digits)?;
                let ty = self.context.float_type();
                Some(self.context.const_float(ty, value as f64))
            }
            TokenType::F64 => {
                let value: f64 = self.parse_number(node, digits)?;
                let ty = self.context.double_type();
                Some(self.context.const_float(ty, value))
            }
            _ => {
                self.error_at(node, "Invalid number token type!");
                None
            }
        }
    }

    fn parse_number<T: std::str::FromStr>(&mut self, node: &Node, digits: &str) -> Option<T> {
        match digits.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.error_at(
                    node,
                    format!("Invalid number literal '{}'.", node.token.lexeme),
                );
                None
            }
        }
    }

    /// The IR type a numeric Netuno type lowers to, for constant synthesis.
    fn numeric_nir_type(&mut self, ty: &NtTypeRef) -> Option<TypeId> {
        match ty.kind {
            NtTypeKind::I32 | NtTypeKind::U32 => Some(self.context.int32_type()),
            NtTypeKind::I64 | NtTypeKind::U64 => Some(self.context.int64_type()),
            NtTypeKind::F32 => Some(self.context.float_type()),
            NtTypeKind::F64 => Some(self.context.double_type()),
            _ => None,
        }
    }

    fn one_for(&mut self, nir_type: TypeId) -> ValueId {
        if self.context.is_integer_type(nir_type) {
            self.context.const_int(nir_type, 1, false)
        } else {
            self.context.const_float(nir_type, 1.0)
        }
    }

    fn unary(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Unary));

        // postfix: `left` holds the operand, the old value is the result
        if let Some(identifier) = node.left() {
            let ty = self.eval(identifier);
            if identifier.kind != NodeKind::Variable {
                self.error_at(node, "Increment target must be a variable.");
                return None;
            }

            let loaded = self.expression(identifier, true)?;
            let Some(nir_type) = self.numeric_nir_type(&ty) else {
                self.error_at(
                    node,
                    format!(
                        "Invalid '{}' operation with type '{}'.",
                        node.token.lexeme, ty.name
                    ),
                );
                return None;
            };

            let one = self.one_for(nir_type);
            let is_float = !self.context.is_integer_type(nir_type);
            let block = self.cur_block();
            let result = match node.token.keyword_id() {
                Some(KeywordId::Inc) => {
                    let op = if is_float { Opcode::FAdd } else { Opcode::Add };
                    self.context.create_binary(op, loaded, one, "inc", block)
                }
                Some(KeywordId::Dec) => {
                    let op = if is_float { Opcode::FSub } else { Opcode::Sub };
                    self.context.create_binary(op, loaded, one, "dec", block)
                }
                _ => {
                    self.error_at(node, "Invalid unary operation.");
                    return None;
                }
            };

            self.do_assign(node, &identifier.token.lexeme, &ty, result);
            return Some(loaded);
        }

        // prefix
        let operand_node = node.right().expect("prefix unary has an operand");
        let ty = self.eval(operand_node);
        let value = self.expression(operand_node, true)?;
        let block = self.cur_block();

        match node.token.keyword_id() {
            Some(KeywordId::Minus) => {
                if !ty.is_numeric() {
                    self.error_at(
                        node,
                        format!("Invalid negate('-') operation with type '{}'.", ty.name),
                    );
                    return None;
                }
                if ty.is_float() {
                    let value_type = self.context.value_type(value);
                    return Some(self.context.create_unary(
                        Opcode::FNeg,
                        value_type,
                        value,
                        "neg",
                        block,
                    ));
                }
                Some(self.context.create_neg(value, "neg", block))
            }
            Some(KeywordId::Bang) => {
                let value_type = self.context.value_type(value);
                if self.context.is_integer_type(value_type) {
                    let zero = self.context.const_int(value_type, 0, false);
                    Some(
                        self.context
                            .create_cmp(Predicate::Eq, value, zero, "lnot", block),
                    )
                } else if self.context.is_float_type(value_type)
                    || self.context.is_double_type(value_type)
                {
                    let zero = self.context.const_float(value_type, 0.0);
                    Some(
                        self.context
                            .create_cmp(Predicate::FEq, value, zero, "lnot", block),
                    )
                } else {
                    self.error_at(
                        node,
                        format!("Invalid logical not('!') operation with type '{}'.", ty.name),
                    );
                    None
                }
            }
            Some(KeywordId::Tilde) => {
                if !ty.is_integer() {
                    self.error_at(
                        node,
                        format!("Invalid bitwise not('~') operation with type '{}'.", ty.name),
                    );
                    return None;
                }
                let value_type = self.context.value_type(value);
                let ones = self.context.const_int_all_ones(value_type);
                Some(
                    self.context
                        .create_binary(Opcode::Xor, value, ones, "bnot", block),
                )
            }
            Some(op @ (KeywordId::Inc | KeywordId::Dec)) => {
                let Some(nir_type) = self.numeric_nir_type(&ty) else {
                    self.error_at(
                        node,
                        format!(
                            "Invalid '{}' operation with type '{}'.",
                            node.token.lexeme, ty.name
                        ),
                    );
                    return None;
                };

                let one = self.one_for(nir_type);
                let is_float = !self.context.is_integer_type(nir_type);
                let (int_op, float_op, hint) = if op == KeywordId::Inc {
                    (Opcode::Add, Opcode::FAdd, "inc")
                } else {
                    (Opcode::Sub, Opcode::FSub, "dec")
                };
                let opcode = if is_float { float_op } else { int_op };
                let result = self.context.create_binary(opcode, value, one, hint, block);

                // prefix forms write the new value back when they can
                if operand_node.kind == NodeKind::Variable {
                    self.do_assign(node, &operand_node.token.lexeme, &ty, result);
                }
                Some(result)
            }
            _ => {
                self.error_at(node, "Invalid unary operation.");
                None
            }
        }
    }

    fn do_assign(&mut self, node: &Node, name: &str, right_type: &NtTypeRef, value: ValueId) {
        let Some(entry) = self.scopes.lookup(name).cloned() else {
            self.error_at(node, "The symbol must be declared.");
            return;
        };

        let matches_type = entry
            .expr_type
            .as_ref()
            .is_some_and(|ty| same_type(ty, right_type));
        if !matches_type {
            let variable_type = entry
                .expr_type
                .as_ref()
                .map(|t| t.name.to_string())
                .unwrap_or_default();
            self.error_at(
                node,
                format!(
                    "The variable type '{}' is incompatible with expression type '{}'.",
                    variable_type, right_type.name
                ),
            );
            return;
        }

        if !entry.kind.contains(SymbolKind::VARIABLE) {
            self.error_at(node, format!("The symbol '{}' is not assignable.", name));
            return;
        }

        let Some(SymbolValue::Value(pointer)) = entry.value else {
            self.error_at(node, format!("The variable '{}' has no storage.", name));
            return;
        };
        let block = self.cur_block();
        self.context.create_store(value, pointer, block);
    }

    fn call_string_helper(
        &mut self,
        node: &Node,
        helper: &Symbol,
        args: &[ValueId],
        hint: &str,
    ) -> Option<ValueId> {
        let Some(SymbolValue::Function(function)) = helper.value else {
            self.error_at(node, "Builtin helper has no declaration.");
            return None;
        };
        let delegate = helper.expr_type.clone()?;
        let function_type = to_nir_type(self.context, &delegate);
        let block = self.cur_block();
        Some(
            self.context
                .create_call(function_type, function, args, hint, block),
        )
    }

    fn call_equals(&mut self, node: &Node, left: ValueId, right: ValueId) -> Option<ValueId> {
        let helper = self.registry.string.lookup_field("equals")?;
        self.call_string_helper(node, &helper, &[left, right], "tmpequals")
    }

    fn call_concat(&mut self, node: &Node, left: ValueId, right: ValueId) -> Option<ValueId> {
        let helper = self.registry.string.lookup_field("concat")?;
        self.call_string_helper(node, &helper, &[left, right], "tmpconcat")
    }

    fn binary(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Binary));
        let left_node = node.left().expect("binary has a left operand");
        let right_node = node.right().expect("binary has a right operand");

        let left_type = self.eval(left_node);
        let right_type = self.eval(right_node);
        // promote toward the smaller kind enumerator
        let ty = if left_type.kind < right_type.kind {
            left_type.clone()
        } else {
            right_type.clone()
        };
        let is_concat = same_type(&ty, &self.registry.string);

        let left = self.expression(left_node, true)?;
        let left = self.cast(left_node, left, &left_type, &ty)?;
        let right = self.expression(right_node, true)?;
        let right = self.cast(right_node, right, &right_type, &ty)?;

        let left_ir = self.context.value_type(left);
        let is_int = self.context.is_integer_type(left_ir);
        let is_float =
            self.context.is_float_type(left_ir) || self.context.is_double_type(left_ir);
        let is_signed = left_type.is_signed() || right_type.is_signed();
        debug_assert!(is_int || is_float || is_concat);
        let block = self.cur_block();

        let is_string_pair =
            same_type(&left_type, &right_type) && same_type(&left_type, &self.registry.string);

        match node.token.keyword_id() {
            Some(KeywordId::Ne) => {
                if is_string_pair {
                    let equals = self.call_equals(node, left, right)?;
                    return Some(self.context.create_not(equals, "tmpequals", block));
                }
                let predicate = if is_int { Predicate::Ne } else { Predicate::FNe };
                Some(self.context.create_cmp(predicate, left, right, "ne", block))
            }
            Some(KeywordId::Eq) => {
                if is_string_pair {
                    return self.call_equals(node, left, right);
                }
                let predicate = if is_int { Predicate::Eq } else { Predicate::FEq };
                Some(self.context.create_cmp(predicate, left, right, "eq", block))
            }
            Some(KeywordId::Greater) => {
                let predicate = if is_int {
                    if is_signed {
                        Predicate::Sgt
                    } else {
                        Predicate::Ugt
                    }
                } else {
                    Predicate::FGt
                };
                Some(self.context.create_cmp(predicate, left, right, "gt", block))
            }
            Some(KeywordId::Ge) => {
                let predicate = if is_int {
                    if is_signed {
                        Predicate::Sge
                    } else {
                        Predicate::Uge
                    }
                } else {
                    Predicate::FGe
                };
                Some(self.context.create_cmp(predicate, left, right, "ge", block))
            }
            Some(KeywordId::Less) => {
                let predicate = if is_int {
                    if is_signed {
                        Predicate::Slt
                    } else {
                        Predicate::Ult
                    }
                } else {
                    Predicate::FLt
                };
                Some(self.context.create_cmp(predicate, left, right, "lt", block))
            }
            Some(KeywordId::Le) => {
                let predicate = if is_int {
                    if is_signed {
                        Predicate::Sle
                    } else {
                        Predicate::Ule
                    }
                } else {
                    Predicate::FLe
                };
                Some(self.context.create_cmp(predicate, left, right, "le", block))
            }
            Some(KeywordId::Plus) => {
                if is_concat {
                    return self.call_concat(node, left, right);
                }
                let op = if is_int { Opcode::Add } else { Opcode::FAdd };
                Some(self.context.create_binary(op, left, right, "add", block))
            }
            Some(KeywordId::Minus) => {
                let op = if is_int { Opcode::Sub } else { Opcode::FSub };
                Some(self.context.create_binary(op, left, right, "sub", block))
            }
            Some(KeywordId::Star) => {
                let op = if is_int { Opcode::Mul } else { Opcode::FMul };
                Some(self.context.create_binary(op, left, right, "mul", block))
            }
            Some(KeywordId::Slash) => {
                let op = if is_int {
                    if is_signed {
                        Opcode::SDiv
                    } else {
                        Opcode::UDiv
                    }
                } else {
                    Opcode::FDiv
                };
                Some(self.context.create_binary(op, left, right, "div", block))
            }
            Some(KeywordId::Percent) => {
                let op = if is_int {
                    if is_signed {
                        Opcode::SRem
                    } else {
                        Opcode::URem
                    }
                } else {
                    Opcode::FRem
                };
                Some(self.context.create_binary(op, left, right, "rem", block))
            }
            Some(KeywordId::Pipe) if is_int => {
                Some(self.context.create_binary(Opcode::Or, left, right, "or", block))
            }
            Some(KeywordId::Amp) if is_int => {
                Some(self.context.create_binary(Opcode::And, left, right, "and", block))
            }
            Some(KeywordId::Caret) if is_int => {
                Some(self.context.create_binary(Opcode::Xor, left, right, "xor", block))
            }
            _ => {
                self.error_at(
                    node,
                    format!("Invalid binary operation '{}'.", node.token.lexeme),
                );
                None
            }
        }
    }

    /// Implicit conversion between Netuno types; primitive-to-string and
    /// string-to-primitive go through the `to_*` helper functions.
    fn cast(
        &mut self,
        node: &Node,
        value: ValueId,
        from: &NtTypeRef,
        to: &NtTypeRef,
    ) -> Option<ValueId> {
        if same_type(from, to) {
            return Some(value);
        }

        let opcode = match from.kind {
            NtTypeKind::I32 | NtTypeKind::I64 => match to.kind {
                NtTypeKind::I32 | NtTypeKind::U32 => Opcode::Trunc,
                NtTypeKind::I64 | NtTypeKind::U64 => Opcode::SExt,
                NtTypeKind::F32 | NtTypeKind::F64 => Opcode::SiToFp,
                NtTypeKind::String => return self.cast_to_string(node, value, from),
                _ => return self.cast_error(node, from, to),
            },
            NtTypeKind::U32 | NtTypeKind::U64 => match to.kind {
                NtTypeKind::I32 | NtTypeKind::U32 => Opcode::Trunc,
                NtTypeKind::I64 | NtTypeKind::U64 => Opcode::ZExt,
                NtTypeKind::F32 | NtTypeKind::F64 => Opcode::UiToFp,
                NtTypeKind::String => return self.cast_to_string(node, value, from),
                _ => return self.cast_error(node, from, to),
            },
            NtTypeKind::F32 | NtTypeKind::F64 => match to.kind {
                NtTypeKind::I32 | NtTypeKind::I64 => Opcode::FpToSi,
                NtTypeKind::U32 | NtTypeKind::U64 => Opcode::FpToUi,
                NtTypeKind::F32 | NtTypeKind::F64 => Opcode::FpTrunc,
                NtTypeKind::String => return self.cast_to_string(node, value, from),
                _ => return self.cast_error(node, from, to),
            },
            NtTypeKind::Bool => match to.kind {
                NtTypeKind::String => return self.cast_to_string(node, value, from),
                _ => return self.cast_error(node, from, to),
            },
            NtTypeKind::String => {
                // parsing casts live on the string type's fields
                let helper_name = format!("to_{}", to.name);
                let Some(helper) = self.registry.string.lookup_field(&helper_name) else {
                    return self.cast_error(node, from, to);
                };
                return self.call_string_helper(node, &helper, &[value], "str");
            }
            _ => return self.cast_error(node, from, to),
        };

        let target = to_nir_type(self.context, to);
        if target != self.context.value_type(value) {
            let block = self.cur_block();
            Some(self.context.create_unary(opcode, target, value, "cast", block))
        } else {
            Some(value)
        }
    }

    fn cast_to_string(
        &mut self,
        node: &Node,
        value: ValueId,
        from: &NtTypeRef,
    ) -> Option<ValueId> {
        let string = self.registry.string.clone();
        let Some(helper) = from.lookup_field("to_string") else {
            return self.cast_error(node, from, &string);
        };
        self.call_string_helper(node, &helper, &[value], "str")
    }

    fn cast_error(&mut self, node: &Node, from: &NtTypeRef, to: &NtTypeRef) -> Option<ValueId> {
        self.error_at(
            node,
            format!("Invalid cast from '{}' to '{}'.", from.name, to.name),
        );
        None
    }

    /// Coerce a value to i1: identity on bool, `!= 0` on numerics.
    fn type_to_bool(&mut self, node: &Node, ty: &NtTypeRef, value: ValueId) -> Option<ValueId> {
        let block = self.cur_block();
        match ty.kind {
            NtTypeKind::Bool => Some(value),
            NtTypeKind::I32 | NtTypeKind::U32 | NtTypeKind::I64 | NtTypeKind::U64 => {
                let value_type = self.context.value_type(value);
                let zero = self.context.const_int(value_type, 0, false);
                Some(self.context.create_cmp(Predicate::Ne, value, zero, "b", block))
            }
            NtTypeKind::F32 | NtTypeKind::F64 => {
                let value_type = self.context.value_type(value);
                let zero = self.context.const_float(value_type, 0.0);
                Some(self.context.create_cmp(Predicate::FNe, value, zero, "b", block))
            }
            _ => {
                self.error_at(
                    node,
                    format!("Invalid implicit cast from type '{}' to 'bool'.", ty.name),
                );
                None
            }
        }
    }

    fn variable(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Variable));

        let Some(entry) = self.scopes.lookup(&node.token.lexeme).cloned() else {
            self.error_at(node, "The symbol must be declared.");
            return None;
        };

        self.symbol_value(node, &entry)
    }

    /// Materialize a symbol in an expression position: variables load
    /// through their alloca, parameters are their argument value.
    fn symbol_value(&mut self, node: &Node, entry: &Symbol) -> Option<ValueId> {
        if entry.kind.contains(SymbolKind::VARIABLE) {
            let Some(SymbolValue::Value(pointer)) = entry.value else {
                self.error_at(node, "The variable has no storage.");
                return None;
            };
            let pointer_type = self.context.value_type(pointer);
            let value_type = self.context.pointee_type(pointer_type)?;
            let block = self.cur_block();
            return Some(
                self.context
                    .create_unary(Opcode::Load, value_type, pointer, "ltmp", block),
            );
        }

        match entry.value {
            Some(SymbolValue::Value(value)) => Some(value),
            _ => {
                self.error_at(
                    node,
                    format!(
                        "The symbol '{}' cannot be used as a value.",
                        node.token.lexeme
                    ),
                );
                None
            }
        }
    }

    fn assign(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Assign));
        let identifier = node.left().expect("assignment has a target");
        let right = node.right().expect("assignment has a value");

        let right_type = self.eval(right);
        let value = self.expression(right, true)?;

        self.do_assign(node, &identifier.token.lexeme, &right_type, value);
        Some(value)
    }

    /// Member symbol of a `get` expression, found on the left side's type.
    fn resolve_member(&mut self, node: &Node) -> Option<Symbol> {
        let object = node.left().expect("get has an object expression");
        let object_type = self.eval(object);
        if object_type.kind == NtTypeKind::Error {
            return None;
        }

        match object_type.lookup_field(&node.token.lexeme) {
            Some(symbol) => Some(symbol),
            None => {
                self.error_at(node, "Undeclared symbol");
                None
            }
        }
    }

    fn get(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Get));
        let entry = self.resolve_member(node)?;
        self.symbol_value(node, &entry)
    }

    /// The IR function a call expression targets.
    fn resolve_callee(&mut self, node: &Node) -> Option<FunctionId> {
        let entry = match node.kind {
            NodeKind::Variable => match self.scopes.lookup(&node.token.lexeme) {
                Some(entry) => entry.clone(),
                None => {
                    self.error_at(node, "The symbol must be declared.");
                    return None;
                }
            },
            NodeKind::Get => self.resolve_member(node)?,
            _ => {
                self.error_at(node, "Invalid call target.");
                return None;
            }
        };

        if !entry
            .kind
            .intersects(SymbolKind::FUNCTION | SymbolKind::SUBROUTINE)
        {
            self.error_at(
                node,
                format!("The symbol '{}' is not callable.", node.token.lexeme),
            );
            return None;
        }

        match entry.value {
            Some(SymbolValue::Function(function)) => Some(function),
            _ => {
                self.error_at(node, "The function has no declaration.");
                None
            }
        }
    }

    fn call(&mut self, node: &Node, need_value: bool) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Call));
        let callee = node.left().expect("call has a callee");
        let ty = self.eval(callee);

        match ty.kind {
            // calling a primitive type is the cast operator
            NtTypeKind::I32
            | NtTypeKind::I64
            | NtTypeKind::U32
            | NtTypeKind::U64
            | NtTypeKind::F32
            | NtTypeKind::F64
            | NtTypeKind::String => {
                if node.children.len() > 1 {
                    self.error_at(node, "Cast operator accepts only one argument");
                    return None;
                }
                let Some(argument) = node.children.first() else {
                    self.error_at(node, "Cast operator needs one argument");
                    return None;
                };

                let from = self.eval(argument);
                let value = self.expression(argument, true)?;
                self.cast(node, value, &from, &ty)
            }
            NtTypeKind::Delegate => {
                let delegate = ty.delegate.as_ref().expect("delegate has a signature").clone();
                let has_return = delegate.return_type.kind != NtTypeKind::Void
                    && delegate.return_type.kind != NtTypeKind::Undefined;

                if need_value && !has_return {
                    self.error_at(
                        node,
                        format!(
                            "A subroutine('{}') cannot return a value.",
                            callee.token.lexeme
                        ),
                    );
                    return None;
                }

                if node.children.len() != delegate.params.len() {
                    self.error_at(
                        node,
                        format!(
                            "The '{}' call has wrong number of parameters, expect number is {}, not {}.",
                            callee.token.lexeme,
                            delegate.params.len(),
                            node.children.len()
                        ),
                    );
                    return None;
                }

                let mut args = Vec::with_capacity(node.children.len());
                let mut argument_error = false;
                for (index, argument) in node.children.iter().enumerate() {
                    let argument_type = self.eval(argument);
                    let expected = &delegate.params[index].ty;

                    match self.expression(argument, true) {
                        Some(value) => args.push(value),
                        None => {
                            argument_error = true;
                            continue;
                        }
                    }

                    if !is_assignable_from(expected, &argument_type) {
                        self.error_at(
                            argument,
                            format!(
                                "The argument('{}', {}) expect a value of type '{}', not '{}'.",
                                delegate.params[index].name,
                                index,
                                expected.name,
                                argument_type.name
                            ),
                        );
                        argument_error = true;
                    }
                }

                if argument_error {
                    return None;
                }

                let function = self.resolve_callee(callee)?;
                let function_type = to_nir_type(self.context, &ty);
                let block = self.cur_block();
                Some(
                    self.context
                        .create_call(function_type, function, &args, "calltmp", block),
                )
            }
            _ => {
                self.error_at(
                    node,
                    "Call only can be perform with a delegate or a type with cast support",
                );
                None
            }
        }
    }

    fn logical(&mut self, node: &Node) -> Option<ValueId> {
        debug_assert!(node.is(NodeClass::Expr, NodeKind::Logical));
        let left_node = node.left().expect("logical has a left operand");
        let right_node = node.right().expect("logical has a right operand");

        let left_type = self.eval(left_node);
        let left = self.expression(left_node, true)?;
        let left = self.type_to_bool(node, &left_type, left)?;

        let right_type = self.eval(right_node);

        match node.token.keyword_id() {
            Some(KeywordId::LogAnd) => self.logical_and(node, left, &right_type, right_node),
            Some(KeywordId::LogOr) => self.logical_or(node, left, &right_type, right_node),
            _ => {
                self.error_at(
                    node,
                    format!("Invalid logical operation '{}'.", node.token.lexeme),
                );
                None
            }
        }
    }

    /// `a && b`: evaluate the right side only when the left is true; the
    /// merge phi takes the left value from the entry block, the right value
    /// from the fall-through block.
    fn logical_and(
        &mut self,
        node: &Node,
        left: ValueId,
        right_type: &NtTypeRef,
        right_node: &Node,
    ) -> Option<ValueId> {
        let entry = self.cur_block();
        let next = self.context.create_block("label_next");
        let end = self.context.create_block("label_end");
        let function = self.cur_function();
        self.context.insert_block_into(next, function);
        self.context.insert_block_into(end, function);

        self.cond_branch_from(entry, next, end, left);

        // next:
        self.block = Some(next);
        let right = self.expression(right_node, true)?;
        let right = self.type_to_bool(node, right_type, right)?;
        // falls through into the merge block
        self.context.add_predecessor(end, next);

        // end:
        self.block = Some(end);
        let int1 = self.context.int1_type();
        let phi = self.context.create_phi(int1, "logand", end);
        self.context.add_phi_incoming(phi, left, entry);
        self.context.add_phi_incoming(phi, right, next);

        Some(phi)
    }

    /// `a || b`: evaluate the right side only when the left is false.
    fn logical_or(
        &mut self,
        node: &Node,
        left: ValueId,
        right_type: &NtTypeRef,
        right_node: &Node,
    ) -> Option<ValueId> {
        let entry = self.cur_block();
        let next = self.context.create_block("label_next");
        let end = self.context.create_block("label_end");
        let function = self.cur_function();
        self.context.insert_block_into(next, function);
        self.context.insert_block_into(end, function);

        self.cond_branch_from(entry, end, next, left);

        // next:
        self.block = Some(next);
        let right = self.expression(right_node, true)?;
        let right = self.type_to_bool(node, right_type, right)?;
        self.branch_from(next, end);

        // end:
        self.block = Some(end);
        let int1 = self.context.int1_type();
        let phi = self.context.create_phi(int1, "logor", end);
        self.context.add_phi_incoming(phi, left, entry);
        self.context.add_phi_incoming(phi, right, next);

        Some(phi)
    }

    // ------------------------------------------------------------------
    // statements

    fn statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        if node.class != NodeClass::Stmt {
            self.error_at(node, "Invalid node, the node must be a statement!");
            return;
        }

        // a statement after a return, break or continue can never run
        let dead_end = self.block.is_some() && self.terminated();
        if return_type.is_some() || dead_end {
            self.report
                .warning_at(node.position(), "Unreachable code!");
            if dead_end {
                return;
            }
        }

        match node.kind {
            NodeKind::Expr => self.expression_statement(node),
            NodeKind::If => self.if_statement(node, return_type),
            NodeKind::Block => self.block_statement(node, return_type),
            NodeKind::While => self.conditional_loop(node, true),
            NodeKind::Until => self.conditional_loop(node, false),
            NodeKind::Var => self.declare_variable(node),
            NodeKind::Return => self.return_statement(node, return_type),
            NodeKind::Break => self.break_statement(node),
            NodeKind::Continue => self.continue_statement(node),
            _ => {
                self.error_at(
                    node,
                    format!("Invalid statement. The statement with kind '{:?}' is invalid.", node.kind),
                );
            }
        }
    }

    fn expression_statement(&mut self, node: &Node) {
        let Some(expr) = node.left() else { return };

        if matches!(
            expr.kind,
            NodeKind::Literal
                | NodeKind::Binary
                | NodeKind::Variable
                | NodeKind::Logical
                | NodeKind::Get
        ) {
            self.report
                .warning_at(node.position(), "Expression result unused.");
        }

        self.expression(expr, false);
    }

    fn if_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        let entry = self.cur_block();

        let condition_node = node.condition().expect("if has a condition");
        let condition_type = self.eval(condition_node);
        let condition = self
            .expression(condition_node, true)
            .and_then(|c| self.type_to_bool(node, &condition_type, c));

        let ifcont = self.context.create_block("ifcont");
        let function = self.cur_function();

        // then:
        let then_block = self.context.create_block("then");
        self.context.insert_block_into(then_block, function);
        self.block = Some(then_block);

        let mut then_return = None;
        self.statement(node.left().expect("if has a then branch"), &mut then_return);
        if !self.terminated() {
            self.branch(ifcont);
        }

        let mut else_return = None;
        let else_block = if let Some(else_branch) = node.right() {
            // else:
            let else_block = self.context.create_block("else");
            self.context.insert_block_into(else_block, function);
            self.block = Some(else_block);

            self.statement(else_branch, &mut else_return);
            if !self.terminated() {
                self.branch(ifcont);
            }

            if let (Some(then_ty), Some(else_ty)) = (&then_return, &else_return) {
                if !same_type(then_ty, else_ty) {
                    self.error_at(
                        node,
                        format!(
                            "The else branch expect '{}' type as return, but is '{}'.",
                            then_ty.name, else_ty.name
                        ),
                    );
                }
            }
            else_block
        } else {
            ifcont
        };

        if let Some(condition) = condition {
            self.cond_branch_from(entry, then_block, else_block, condition);
        }

        self.context.insert_block_into(ifcont, function);
        self.block = Some(ifcont);

        if return_type.is_none() {
            if let (Some(then_ty), Some(_)) = (&then_return, &else_return) {
                *return_type = Some(then_ty.clone());
            }
        }
    }

    fn block_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        debug_assert!(node.is(NodeClass::Stmt, NodeKind::Block));

        let mut block_return = None;
        self.scopes.push(ScopeKind::None);
        for stmt in &node.children {
            self.statement(stmt, &mut block_return);
        }
        self.scopes.pop();

        if return_type.is_none() {
            *return_type = block_return;
        }
    }

    fn conditional_loop(&mut self, node: &Node, is_while: bool) {
        let function = self.cur_function();
        self.scopes.push(ScopeKind::Breakable);

        let loop_block = self.context.create_block("loop");
        self.branch(loop_block);
        let continue_block = self.context.create_block("loopcont");
        let end_block = self.context.create_block("loopend");

        {
            let scope = self.scopes.current();
            scope.loop_block = Some(loop_block);
            scope.end_loop_block = Some(end_block);
        }

        // loop:
        self.context.insert_block_into(loop_block, function);
        self.block = Some(loop_block);
        let condition_node = node.condition().expect("loop has a condition");
        let condition_type = self.eval(condition_node);
        let condition = self
            .expression(condition_node, true)
            .and_then(|c| self.type_to_bool(condition_node, &condition_type, c));

        if let Some(condition) = condition {
            if is_while {
                self.cond_branch_from(loop_block, continue_block, end_block, condition);
            } else {
                self.cond_branch_from(loop_block, end_block, continue_block, condition);
            }
        }

        // loopcont: the body's return type stays local, a loop may run
        // zero times
        let mut body_return = None;
        self.context.insert_block_into(continue_block, function);
        self.block = Some(continue_block);
        self.statement(node.left().expect("loop has a body"), &mut body_return);

        if !self.terminated() {
            self.branch(loop_block);
        }

        // loopend:
        self.context.insert_block_into(end_block, function);
        self.block = Some(end_block);

        self.scopes.pop();
    }

    fn declare_variable(&mut self, node: &Node) {
        debug_assert!(node.is(NodeClass::Stmt, NodeKind::Var));

        let ty = if let Some(annotation) = node.left() {
            let ty = self.find_type(annotation);
            if let Some(initializer) = node.right() {
                let init_type = self.eval(initializer);
                if !same_type(&ty, &init_type) {
                    self.error_at(node, "Invalid initializer type. Incompatible type!");
                    return;
                }
            }
            ty
        } else {
            match node.right() {
                Some(initializer) => self.eval(initializer),
                None => {
                    self.error_at(
                        node,
                        "Variable declarations must has a type or initializer.",
                    );
                    return;
                }
            }
        };

        let int32 = self.context.int32_type();
        let count = self.context.const_int(int32, 1, false);
        let nir_type = to_nir_type(self.context, &ty);
        let pointer_type = self.context.pointer_to(nir_type);

        let block = self.cur_block();
        let variable = self.context.create_unary(
            Opcode::Alloca,
            pointer_type,
            count,
            &node.token.lexeme,
            block,
        );

        if let Some(initializer) = node.right() {
            if let Some(initial_value) = self.expression(initializer, true) {
                let block = self.cur_block();
                self.context.create_store(initial_value, variable, block);
            }
        }

        let global = self.scopes.depth() == 2;
        let mut kind = SymbolKind::VARIABLE;
        if global {
            // module-level variables carry the module bit
            kind |= SymbolKind::MODULE | self.visibility();
        }
        let symbol = Symbol::new(node.token.lexeme.as_str(), kind, ty)
            .with_value(SymbolValue::Value(variable));
        let inserted = self.scopes.insert(symbol);
        debug_assert!(inserted);
    }

    fn return_statement(&mut self, node: &Node, return_type: &mut Option<NtTypeRef>) {
        let in_function = self
            .scopes
            .function_scope()
            .map(|s| s.kind == ScopeKind::Function)
            .unwrap_or(false);

        let mut value = None;
        if in_function {
            let Some(expr) = node.left() else {
                self.error_at(node, "The return statement needs a value expression.");
                return;
            };

            let mut ty = self.eval(expr);
            value = self.expression(expr, true);

            // implicit widening toward the declared return type
            let expected = self
                .scopes
                .function_scope()
                .and_then(|s| s.return_type.clone());
            if let Some(expected) = expected {
                if expected.kind != NtTypeKind::Undefined && !same_type(&ty, &expected) {
                    value = value.and_then(|v| self.cast(expr, v, &ty, &expected));
                    ty = expected;
                }
            }

            if return_type.is_none() {
                *return_type = Some(ty);
            }
        }

        if !self.terminated() {
            let block = self.cur_block();
            self.context.create_return(value, block);
        }
    }

    fn break_statement(&mut self, node: &Node) {
        let Some(target) = self
            .scopes
            .breakable_scope()
            .and_then(|s| s.end_loop_block)
        else {
            self.error_at(
                node,
                "Invalid break statement, break is not in a breakable scope!",
            );
            return;
        };
        self.branch(target);
    }

    fn continue_statement(&mut self, node: &Node) {
        let Some(target) = self.scopes.breakable_scope().and_then(|s| s.loop_block) else {
            self.error_at(
                node,
                "Invalid continue statement, continue is not in a breakable scope!",
            );
            return;
        };
        self.branch(target);
    }

    // ------------------------------------------------------------------
    // declarations

    fn declare_function(&mut self, node: &Node, return_value: bool) {
        let name = node.token.lexeme.clone();

        self.scopes.push(if return_value {
            ScopeKind::Function
        } else {
            ScopeKind::Method
        });

        let mut params = Vec::new();
        for param_node in &node.children {
            let type_node = param_node.left().expect("parameter has a type annotation");
            let ty = self.find_type(type_node);
            params.push(Param {
                name: Rc::from(param_node.token.lexeme.as_str()),
                ty,
            });
        }

        let return_type = if return_value {
            match node.left() {
                Some(annotation) => self.find_type(annotation),
                None => {
                    let body = node.right().expect("function has a body");
                    eval_block_return_type(
                        &self.registry,
                        self.types,
                        self.report,
                        &self.scopes,
                        body,
                    )
                }
            }
        } else {
            self.registry.void.clone()
        };

        let delegate_type = self
            .registry
            .take_delegate_type(return_type.clone(), params.clone());

        // the declared return type drives implicit casts at return sites
        self.scopes.current().return_type = Some(return_type.clone());

        // declare the IR function and open its entry block
        let function_type = to_nir_type(self.context, &delegate_type);
        let function = self
            .module
            .get_or_insert_function(self.context, &name, function_type);
        self.function = Some(function);

        let entry = self.context.create_block("entry");
        self.block = Some(entry);
        self.context.insert_block_into(entry, function);

        let symbol_kind = if return_value {
            SymbolKind::FUNCTION
        } else {
            SymbolKind::SUBROUTINE
        } | self.visibility();
        let symbol = Symbol::new(name.as_str(), symbol_kind, delegate_type)
            .with_value(SymbolValue::Function(function));
        self.scopes.insert_at_parent(symbol.clone());

        // top-level public functions are also visible through the module
        // type, for qualified references from other files
        if self.scopes.depth() == 3 && self.public {
            if let Some(module_type) = &self.module_type {
                let mut fields = module_type.fields.borrow_mut();
                if !fields.update(symbol.clone()) {
                    fields.insert(symbol);
                }
            }
        }

        for (index, param) in params.iter().enumerate() {
            let value = self.context.function_param_value(function, index);
            let symbol = Symbol::new(param.name.clone(), SymbolKind::PARAM, param.ty.clone())
                .with_value(SymbolValue::Value(value));
            self.scopes.insert(symbol);
        }

        let body = node.right().expect("function has a body");
        let mut statement_return = None;
        let mut has_return = false;
        for stmt in &body.children {
            self.statement(stmt, &mut statement_return);
            if statement_return.is_some() {
                has_return = true;
            }
        }

        if let Some(statement_type) = &statement_return {
            if !same_type(statement_type, &return_type) {
                self.error_at(
                    node,
                    format!(
                        "Incompatible return type! Expect {}, but return {}.",
                        return_type.name, statement_type.name
                    ),
                );
            }
        }

        if return_value && !has_return {
            self.error_at(
                node,
                format!("Function '{}' doesn't return a value on all code paths.", name),
            );
        }

        self.scopes.pop();

        let needs_ret = match self.context.block_terminator(self.cur_block()) {
            None => true,
            Some(terminator) => self.context.opcode(terminator) != Opcode::Ret,
        };
        if needs_ret {
            let block = self.cur_block();
            self.context.create_return(None, block);
        }
    }

    /// Module-level `var` declarations land in a synthetic `<module>.init`
    /// subroutine, created on first use.
    fn module_init_block(&mut self) -> (FunctionId, BlockId) {
        if let Some(init) = self.init_function {
            return init;
        }

        let module_name = self
            .module
            .name
            .clone()
            .expect("lowering module has a name");
        let void = self.context.void_type();
        let init_type = self.context.function_type(void, &[], false);
        let function = self.module.get_or_insert_function(
            self.context,
            &format!("{}.init", module_name),
            init_type,
        );
        let entry = self.context.create_block("entry");
        self.context.insert_block_into(entry, function);

        self.init_function = Some((function, entry));
        (function, entry)
    }

    fn declaration(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Def => self.declare_function(node, true),
            NodeKind::Sub => self.declare_function(node, false),
            NodeKind::Var => {
                let (function, block) = self.module_init_block();
                self.function = Some(function);
                self.block = Some(block);
                self.declare_variable(node);
                // remember where the init code stops
                self.init_function = Some((function, self.cur_block()));
            }
            NodeKind::Import => {}
            _ => self.error_at(node, "Expect a declaration"),
        }
    }

    fn module(mut self, node: &Node) -> Option<Module> {
        self.scopes.push(ScopeKind::None);
        for primitive in self.registry.primitives().map(Clone::clone) {
            let symbol = Symbol::new(primitive.name.clone(), SymbolKind::TYPE, primitive.clone());
            self.scopes.insert(symbol);
        }

        for stmt in &node.children {
            match stmt.kind {
                NodeKind::Public => self.public = true,
                NodeKind::Private => self.public = false,
                _ => self.declaration(stmt),
            }
        }

        // close the init function if one was opened
        if let Some((_, block)) = self.init_function {
            if self.context.block_terminator(block).is_none() {
                self.context.create_return(None, block);
            }
        }

        self.scopes.pop();

        if self.report.had_error() {
            log::debug!("discarding module after lowering errors");
            return None;
        }
        Some(self.module)
    }
}
