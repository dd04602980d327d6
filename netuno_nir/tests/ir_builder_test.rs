//! End-to-end builder tests: assemble a small function by hand and check
//! the structural invariants the lowering engine relies on.

use netuno_nir::{Context, Module, Opcode, PhiConstant, Predicate};

#[test]
fn test_build_branching_function_with_phi() {
    let mut context = Context::new();
    let mut module = Module::new(Some("m"));

    let int1 = context.int1_type();
    let int32 = context.int32_type();
    let ty = context.function_type(int32, &[int1], false);
    let f = module.get_or_insert_function(&mut context, "pick", ty);

    let entry = context.create_block("entry");
    let then_block = context.create_block("then");
    let else_block = context.create_block("else");
    let merge = context.create_block("ifcont");
    context.insert_block_into(entry, f);
    context.insert_block_into(then_block, f);
    context.insert_block_into(else_block, f);
    context.insert_block_into(merge, f);

    let cond = context.function_param_value(f, 0);
    let br = context.create_cond_branch(then_block, else_block, cond, entry);
    assert!(context.is_conditional(br));
    assert_eq!(context.successor_count(br), 2);
    assert_eq!(context.successor(br, 0), then_block);
    assert_eq!(context.successor(br, 1), else_block);

    let one = context.const_int(int32, 1, false);
    let two = context.const_int(int32, 2, false);
    let b1 = context.create_branch(merge, then_block);
    let b2 = context.create_branch(merge, else_block);
    assert!(context.is_unconditional(b1));
    assert_eq!(context.successor_count(b1), 1);

    context.add_predecessor(merge, then_block);
    context.add_predecessor(merge, else_block);

    let phi = context.create_phi(int32, "merge", merge);
    context.add_phi_incoming(phi, one, then_block);
    assert!(!context.phi_is_complete(phi));
    context.add_phi_incoming(phi, two, else_block);
    assert!(context.phi_is_complete(phi));

    let ret = context.create_return(Some(phi), merge);
    assert_eq!(context.successor_count(ret), 0);
    assert_eq!(context.block_terminator(merge), Some(ret));

    assert_eq!(context.value_type(phi), int32);
    assert_eq!(context.phi_constant_value(phi), None);
    assert_eq!(b2, context.block_terminator(else_block).unwrap());
}

#[test]
fn test_phi_constant_classification() {
    let mut context = Context::new();
    let int32 = context.int32_type();
    let block = context.create_block("entry");
    let pred = context.create_block("pred");

    let v = context.const_int(int32, 7, false);
    let phi = context.create_phi(int32, "p", block);
    context.add_phi_incoming(phi, v, pred);
    context.add_phi_incoming(phi, phi, block);
    context.add_phi_incoming(phi, v, block);

    assert_eq!(context.phi_constant_value(phi), Some(PhiConstant::Value(v)));
    assert!(context.phi_has_constant_or_undef_value(phi));

    // self-references only
    let phi2 = context.create_phi(int32, "q", block);
    context.add_phi_incoming(phi2, phi2, pred);
    context.add_phi_incoming(phi2, phi2, block);
    assert_eq!(context.phi_constant_value(phi2), Some(PhiConstant::Undef));

    // two distinct values
    let w = context.const_int(int32, 8, false);
    let phi3 = context.create_phi(int32, "r", block);
    context.add_phi_incoming(phi3, v, pred);
    context.add_phi_incoming(phi3, w, block);
    assert_eq!(context.phi_constant_value(phi3), None);
    assert!(!context.phi_has_constant_or_undef_value(phi3));

    // undef merges with anything
    let phi4 = context.create_phi(int32, "s", block);
    let undef = context.undef_value();
    context.add_phi_incoming(phi4, undef, pred);
    context.add_phi_incoming(phi4, w, block);
    assert!(context.phi_has_constant_or_undef_value(phi4));
}

#[test]
fn test_phi_add_then_remove_restores_length() {
    let mut context = Context::new();
    let int32 = context.int32_type();
    let block = context.create_block("entry");
    let a = context.create_block("a");
    let b = context.create_block("b");

    let v1 = context.const_int(int32, 1, false);
    let v2 = context.const_int(int32, 2, false);
    let phi = context.create_phi(int32, "p", block);
    context.add_phi_incoming(phi, v1, a);
    let before = context.phi_incoming_count(phi);

    context.add_phi_incoming(phi, v2, b);
    let removed = context.remove_phi_incoming_block(phi, b);
    assert_eq!(removed, v2);
    assert_eq!(context.phi_incoming_count(phi), before);
    assert_eq!(context.phi_incoming_value_for_block(phi, a), Some(v1));
    assert_eq!(context.phi_incoming_value_for_block(phi, b), None);
}

#[test]
fn test_select_and_store_discipline() {
    let mut context = Context::new();
    let int1 = context.int1_type();
    let int32 = context.int32_type();
    let block = context.create_block("entry");

    let cond = context.const_int_true(int1);
    let t = context.const_int(int32, 1, false);
    let f = context.const_int(int32, 2, false);

    assert_eq!(context.select_operands_error(cond, t, f), None);
    let double = context.double_type();
    let d = context.const_float(double, 1.0);
    assert_eq!(
        context.select_operands_error(cond, t, d),
        Some("both values must have same type")
    );
    assert_eq!(
        context.select_operands_error(t, t, f),
        Some("condition must be i1")
    );

    let select = context.create_select(cond, t, f, "sel", block);
    assert_eq!(context.value_type(select), int32);
    context.swap_select_values(select);
    assert_eq!(context.select_true_value(select), f);
    assert_eq!(context.select_false_value(select), t);

    // store through an alloca
    let one = context.const_int(int32, 1, false);
    let ptr_ty = context.pointer_to(int32);
    let slot = context.create_unary(Opcode::Alloca, ptr_ty, one, "x", block);
    let store = context.create_store(t, slot, block);
    assert_eq!(context.store_pointer_operand(store), slot);
    assert_eq!(context.store_value_operand(store), t);
    assert_eq!(context.store_pointer_operand_type(store), ptr_ty);
}

#[test]
fn test_neg_and_not_helpers() {
    let mut context = Context::new();
    let int32 = context.int32_type();
    let block = context.create_block("entry");

    let v = context.const_int(int32, 5, false);
    let neg = context.create_neg(v, "neg", block);
    assert_eq!(context.opcode(neg), Opcode::Sub);
    let zero = context.binary_lhs(neg);
    assert_eq!(context.const_int_value(zero), Some(0));
    assert_eq!(context.binary_rhs(neg), v);

    let not = context.create_not(v, "bnot", block);
    assert_eq!(context.opcode(not), Opcode::Xor);
    let ones = context.binary_lhs(not);
    assert_eq!(context.const_int_value(ones), Some(0xFFFF_FFFF));
}

#[test]
fn test_call_argument_replacement_is_unchecked() {
    let mut context = Context::new();
    let mut module = Module::new(Some("m"));
    let int32 = context.int32_type();
    let double = context.double_type();
    let ty = context.function_type(int32, &[int32], false);
    let callee = module.get_or_insert_function(&mut context, "callee", ty);

    let block = context.create_block("entry");
    let arg = context.const_int(int32, 3, false);
    let call = context.create_call(ty, callee, &[arg], "calltmp", block);

    assert_eq!(context.call_arg_count(call), 1);
    assert_eq!(context.call_arg(call, 0), arg);
    assert_eq!(context.call_function_type(call), ty);
    assert_eq!(context.callee(call), callee);

    // argument replacement does not check types
    let other = context.const_float(double, 2.5);
    context.set_call_arg(call, 0, other);
    assert_eq!(context.call_arg(call, 0), other);
}

#[test]
fn test_void_call_has_no_name() {
    let mut context = Context::new();
    let mut module = Module::new(Some("m"));
    let void = context.void_type();
    let ty = context.function_type(void, &[], false);
    let callee = module.get_or_insert_function(&mut context, "side_effect", ty);

    let block = context.create_block("entry");
    let call = context.create_call(ty, callee, &[], "calltmp", block);
    assert!(context.value_name(call).is_none());

    let cmp_ty = context.int32_type();
    let a = context.const_int(cmp_ty, 1, false);
    let b = context.const_int(cmp_ty, 2, false);
    let cmp = context.create_cmp(Predicate::Slt, a, b, "lt", block);
    assert!(context.value_name(cmp).is_some());
    let int1 = context.int1_type();
    assert_eq!(context.value_type(cmp), int1);
}
