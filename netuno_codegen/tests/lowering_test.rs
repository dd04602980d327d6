//! End-to-end lowering tests: source text through the scanner, parser,
//! resolver and lowering engine, asserting on the produced IR shapes.

use netuno_codegen::lower_module;
use netuno_common::Report;
use netuno_nir::{Constant, Context, Module, Opcode, Predicate};
use netuno_parser::parse_module;
use netuno_typechecker::builtins::build_global_scope;
use netuno_typechecker::{resolve, TypeMap, TypeRegistry};

fn compile(source: &str) -> (Context, Module) {
    let mut context = Context::new();
    let registry = TypeRegistry::new(&mut context);
    let ast = parse_module(source, "test").expect("parse");

    let mut types = TypeMap::new();
    let mut report = Report::new();
    let ok = resolve(
        &registry,
        &mut types,
        &mut report,
        build_global_scope(&registry),
        std::slice::from_ref(&ast),
    );
    assert!(ok, "resolver diagnostics:\n{}", report);

    let module = lower_module(
        &mut context,
        &registry,
        &mut types,
        &mut report,
        build_global_scope(&registry),
        &ast,
    );
    let module = module.unwrap_or_else(|| panic!("lowering diagnostics:\n{}", report));
    (context, module)
}

fn compile_err(source: &str) -> Report {
    let mut context = Context::new();
    let registry = TypeRegistry::new(&mut context);
    let ast = parse_module(source, "test").expect("parse");

    let mut types = TypeMap::new();
    let mut report = Report::new();
    let resolved = resolve(
        &registry,
        &mut types,
        &mut report,
        build_global_scope(&registry),
        std::slice::from_ref(&ast),
    );
    if resolved {
        let module = lower_module(
            &mut context,
            &registry,
            &mut types,
            &mut report,
            build_global_scope(&registry),
            &ast,
        );
        assert!(module.is_none(), "expected the module to be discarded");
    }
    assert!(report.had_error());
    report
}

#[test]
fn test_minimal_constant_function() {
    // S1
    let (context, module) = compile("def f(): i32 => 42");

    let f = module.get_function(&context, "f").expect("f exists");
    let int32 = {
        let ty = context.function_ty(f);
        assert_eq!(context.function_num_params(ty), 0);
        context.function_result_type(ty)
    };
    assert!(context.is_integer_n_type(int32, 32));

    let blocks = context.function_blocks(f);
    assert_eq!(blocks.len(), 1);
    let entry = blocks[0];
    assert_eq!(&**context.block_name(entry), "entry");

    // the only instruction is the ret; its operand is the constant 42
    let instructions = context.block_instructions(entry);
    assert_eq!(instructions.len(), 1);
    let ret = instructions[0];
    assert_eq!(context.opcode(ret), Opcode::Ret);
    let value = context.return_value(ret).expect("ret has a value");
    assert_eq!(context.const_int_value(value), Some(42));
    assert_eq!(context.value_type(value), int32);
}

#[test]
fn test_if_else_with_unreachable_merge() {
    // S2
    let (context, module) =
        compile("def f(x: i32): i32 if x == 0 return 1 else return 2 next end");

    let f = module.get_function(&context, "f").expect("f exists");
    let blocks = context.function_blocks(f).to_vec();
    assert_eq!(blocks.len(), 4);

    let entry = blocks[0];
    let then_block = blocks[1];
    let else_block = blocks[2];
    let merge = blocks[3];
    assert_eq!(&**context.block_name(entry), "entry");
    assert!(context.block_name(then_block).starts_with("then"));
    assert!(context.block_name(else_block).starts_with("else"));
    assert!(context.block_name(merge).starts_with("ifcont"));

    // entry compares the argument against zero and branches on the result
    let branch = context.block_terminator(entry).expect("entry terminates");
    assert!(context.is_conditional(branch));
    assert_eq!(context.successor(branch, 0), then_block);
    assert_eq!(context.successor(branch, 1), else_block);

    let condition = context.condition(branch).expect("conditional branch");
    assert_eq!(context.opcode(condition), Opcode::Cmp);
    assert_eq!(context.cmp_predicate(condition), Predicate::Eq);
    let x = context.function_param_value(f, 0);
    assert_eq!(context.cmp_lhs(condition), x);
    assert_eq!(
        context.const_int_value(context.cmp_rhs(condition)),
        Some(0)
    );

    // each arm returns its constant
    let then_ret = context.block_terminator(then_block).unwrap();
    assert_eq!(context.opcode(then_ret), Opcode::Ret);
    let value = context.return_value(then_ret).unwrap();
    assert_eq!(context.const_int_value(value), Some(1));

    let else_ret = context.block_terminator(else_block).unwrap();
    let value = context.return_value(else_ret).unwrap();
    assert_eq!(context.const_int_value(value), Some(2));

    // the merge block exists but nothing branches into it
    assert_eq!(context.predecessor_count(merge), 0);
}

#[test]
fn test_while_loop_shape() {
    // S3
    let (context, module) =
        compile("sub g(n: i32) var i = 0 while i < n i = i + 1 next end");

    let g = module.get_function(&context, "g").expect("g exists");
    let blocks = context.function_blocks(g).to_vec();
    assert_eq!(blocks.len(), 4);
    let (entry, loop_block, cont, end) = (blocks[0], blocks[1], blocks[2], blocks[3]);
    assert!(context.block_name(loop_block).starts_with("loop"));
    assert!(context.block_name(cont).starts_with("loopcont"));
    assert!(context.block_name(end).starts_with("loopend"));

    // entry: alloca for i, store of the initializer, branch into the header
    let entry_insts = context.block_instructions(entry).to_vec();
    assert_eq!(context.opcode(entry_insts[0]), Opcode::Alloca);
    assert_eq!(context.opcode(entry_insts[1]), Opcode::Store);
    let slot = entry_insts[0];
    assert_eq!(context.store_pointer_operand(entry_insts[1]), slot);
    let branch = context.block_terminator(entry).unwrap();
    assert!(context.is_unconditional(branch));
    assert_eq!(context.successor(branch, 0), loop_block);

    // header: load i, compare signed-less-than against the parameter
    let header_insts = context.block_instructions(loop_block).to_vec();
    assert_eq!(context.opcode(header_insts[0]), Opcode::Load);
    assert_eq!(context.unary_operand(header_insts[0]), slot);
    let compare = header_insts[1];
    assert_eq!(context.cmp_predicate(compare), Predicate::Slt);
    assert_eq!(context.cmp_rhs(compare), context.function_param_value(g, 0));
    let header_branch = context.block_terminator(loop_block).unwrap();
    assert_eq!(context.successor(header_branch, 0), cont);
    assert_eq!(context.successor(header_branch, 1), end);

    // body: load, add one, store back, branch to the header
    let body_insts = context.block_instructions(cont).to_vec();
    assert_eq!(context.opcode(body_insts[0]), Opcode::Load);
    assert_eq!(context.opcode(body_insts[1]), Opcode::Add);
    assert_eq!(context.opcode(body_insts[2]), Opcode::Store);
    let back = context.block_terminator(cont).unwrap();
    assert_eq!(context.successor(back, 0), loop_block);

    // exit returns void
    let ret = context.block_terminator(end).unwrap();
    assert_eq!(context.opcode(ret), Opcode::Ret);
    assert_eq!(context.return_value(ret), None);
}

#[test]
fn test_string_concat_lowering() {
    // S4
    let (context, module) = compile("def h(): string => \"a\" + \"b\"");

    let h = module.get_function(&context, "h").expect("h exists");
    let entry = context.function_entry_block(h).unwrap();
    let instructions = context.block_instructions(entry).to_vec();
    assert_eq!(instructions.len(), 2);

    let call = instructions[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    assert_eq!(&**context.function_name(context.callee(call)), "concat");
    assert_eq!(context.call_arg_count(call), 2);
    for (index, expected) in ["a", "b"].iter().enumerate() {
        let arg = context.call_arg(call, index);
        let chars: Vec<u32> = expected.chars().map(|c| c as u32).collect();
        assert_eq!(context.constant(arg), Some(&Constant::Str { chars }));
    }

    let ret = instructions[1];
    assert_eq!(context.opcode(ret), Opcode::Ret);
    assert_eq!(context.return_value(ret), Some(call));
}

#[test]
fn test_short_circuit_and() {
    // S5
    let (context, module) = compile("def k(a: bool, b: bool): bool => a && b");

    let k = module.get_function(&context, "k").expect("k exists");
    let blocks = context.function_blocks(k).to_vec();
    assert_eq!(blocks.len(), 3);
    let (entry, next, end) = (blocks[0], blocks[1], blocks[2]);
    assert!(context.block_name(next).starts_with("label_next"));
    assert!(context.block_name(end).starts_with("label_end"));

    let a = context.function_param_value(k, 0);
    let b = context.function_param_value(k, 1);

    let branch = context.block_terminator(entry).unwrap();
    assert!(context.is_conditional(branch));
    assert_eq!(context.condition(branch), Some(a));
    assert_eq!(context.successor(branch, 0), next);
    assert_eq!(context.successor(branch, 1), end);

    // the right side needs no instructions of its own; control falls
    // through into the merge
    assert_eq!(context.block_terminator(next), None);

    let end_insts = context.block_instructions(end).to_vec();
    let phi = end_insts[0];
    assert_eq!(context.opcode(phi), Opcode::Phi);
    assert_eq!(context.phi_incoming_count(phi), 2);
    assert_eq!(context.phi_incoming_value_for_block(phi, entry), Some(a));
    assert_eq!(context.phi_incoming_value_for_block(phi, next), Some(b));
    assert!(context.phi_is_complete(phi));

    let ret = context.block_terminator(end).unwrap();
    assert_eq!(context.return_value(ret), Some(phi));
}

#[test]
fn test_implicit_widening_on_return() {
    // S6
    let (context, module) = compile("def w(x: i32): i64 => x");

    let w = module.get_function(&context, "w").expect("w exists");
    let entry = context.function_entry_block(w).unwrap();
    let instructions = context.block_instructions(entry).to_vec();
    assert_eq!(instructions.len(), 2);

    let cast = instructions[0];
    assert_eq!(context.opcode(cast), Opcode::SExt);
    assert_eq!(context.unary_operand(cast), context.function_param_value(w, 0));
    assert!(context.is_integer_n_type(context.value_type(cast), 64));

    let ret = instructions[1];
    assert_eq!(context.return_value(ret), Some(cast));
}

#[test]
fn test_constant_function_has_single_ret() {
    // testable property 10, across a few constant types
    for (source, check) in [
        ("def f(): i32 => 7", 32u32),
        ("def f(): i64 => 7l", 64u32),
    ] {
        let (context, module) = compile(source);
        let f = module.get_function(&context, "f").unwrap();
        let blocks = context.function_blocks(f);
        assert_eq!(blocks.len(), 1);

        let terminators: Vec<_> = blocks
            .iter()
            .filter_map(|&b| context.block_terminator(b))
            .collect();
        assert_eq!(terminators.len(), 1);
        assert_eq!(context.opcode(terminators[0]), Opcode::Ret);

        let value = context.return_value(terminators[0]).unwrap();
        assert!(context.is_constant(value));
        assert!(context.is_integer_n_type(context.value_type(value), check));
    }
}

#[test]
fn test_until_swaps_branch_targets() {
    let (context, module) = compile("sub g(n: i32) var i = 0 until i == n i = i + 1 next end");

    let g = module.get_function(&context, "g").unwrap();
    let blocks = context.function_blocks(g).to_vec();
    let (loop_block, cont, end) = (blocks[1], blocks[2], blocks[3]);

    // until: the true edge leaves the loop
    let branch = context.block_terminator(loop_block).unwrap();
    assert_eq!(context.successor(branch, 0), end);
    assert_eq!(context.successor(branch, 1), cont);
}

#[test]
fn test_for_loop_lowers_like_a_desugar() {
    let (context, module) = compile("sub g() for i = 0 to 3 => continue end");

    let g = module.get_function(&context, "g").unwrap();
    let blocks = context.function_blocks(g).to_vec();
    // entry + loop/loopcont/loopend
    assert_eq!(blocks.len(), 4);

    // the counter alloca and its initialization sit in the entry block
    let entry_insts = context.block_instructions(blocks[0]).to_vec();
    assert_eq!(context.opcode(entry_insts[0]), Opcode::Alloca);
    assert_eq!(context.opcode(entry_insts[1]), Opcode::Store);

    // the loop condition is an equality test (until i == limit)
    let header_insts = context.block_instructions(blocks[1]).to_vec();
    let compare = header_insts[1];
    assert_eq!(context.cmp_predicate(compare), Predicate::Eq);
}

#[test]
fn test_break_and_continue_target_loop_blocks() {
    let (context, module) = compile(
        "sub g() while true if false break next continue next end",
    );

    let g = module.get_function(&context, "g").unwrap();
    let blocks = context.function_blocks(g).to_vec();
    let loop_block = blocks[1];
    let end_block = *blocks.last().unwrap();
    assert!(context.block_name(end_block).starts_with("loopend"));

    // the then-arm of the if branches to loopend
    let then_block = blocks
        .iter()
        .copied()
        .find(|&b| context.block_name(b).starts_with("then"))
        .expect("then block exists");
    let break_branch = context.block_terminator(then_block).unwrap();
    assert_eq!(context.successor(break_branch, 0), end_block);

    // the ifcont block carries the trailing continue back to the header
    let ifcont = blocks
        .iter()
        .copied()
        .find(|&b| context.block_name(b).starts_with("ifcont"))
        .expect("ifcont block exists");
    let continue_branch = context.block_terminator(ifcont).unwrap();
    assert_eq!(context.successor(continue_branch, 0), loop_block);
}

#[test]
fn test_string_equality_lowers_to_equals_call() {
    let (context, module) = compile("def f(a: string, b: string): bool => a == b");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let call = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    assert_eq!(&**context.function_name(context.callee(call)), "equals");
}

#[test]
fn test_string_inequality_adds_a_not() {
    let (context, module) = compile("def f(a: string, b: string): bool => a != b");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let instructions = context.block_instructions(entry).to_vec();

    let call = instructions[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    // not(x) is xor(all-ones, x)
    let not = instructions[1];
    assert_eq!(context.opcode(not), Opcode::Xor);
    assert_eq!(context.binary_rhs(not), call);
}

#[test]
fn test_cast_call_syntax() {
    let (context, module) = compile("def w(x: i32): i64 => i64(x)");

    let w = module.get_function(&context, "w").unwrap();
    let entry = context.function_entry_block(w).unwrap();
    let cast = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(cast), Opcode::SExt);
}

#[test]
fn test_unsigned_division_picks_udiv() {
    let (context, module) = compile("def f(a: u32, b: u32): u32 => a / b");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let div = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(div), Opcode::UDiv);
}

#[test]
fn test_mixed_int_float_promotes_to_float() {
    let (context, module) = compile("def f(a: i32, b: f32): f32 => a * b");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let instructions = context.block_instructions(entry).to_vec();

    // the i32 side converts first, then the float multiply
    let cast = instructions[0];
    assert_eq!(context.opcode(cast), Opcode::SiToFp);
    let mul = instructions[1];
    assert_eq!(context.opcode(mul), Opcode::FMul);
}

#[test]
fn test_console_write_call() {
    let (context, module) = compile("sub main() console.write(\"hi\") end");

    let main = module.get_function(&context, "main").unwrap();
    let entry = context.function_entry_block(main).unwrap();
    let call = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    assert_eq!(&**context.function_name(context.callee(call)), "write");
    // void call carries no name
    assert!(context.value_name(call).is_none());
}

#[test]
fn test_primitive_to_string_cast_calls_helper() {
    let (context, module) = compile("def f(x: i32): string => string(x)");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let call = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    assert_eq!(&**context.function_name(context.callee(call)), "to_string");
}

#[test]
fn test_string_to_primitive_cast_calls_helper() {
    let (context, module) = compile("def f(s: string): i32 => i32(s)");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let call = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(call), Opcode::Call);
    assert_eq!(&**context.function_name(context.callee(call)), "to_i32");
}

#[test]
fn test_logical_not() {
    let (context, module) = compile("def f(a: bool): bool => !a");

    let f = module.get_function(&context, "f").unwrap();
    let entry = context.function_entry_block(f).unwrap();
    let cmp = context.block_instructions(entry)[0];
    assert_eq!(context.opcode(cmp), Opcode::Cmp);
    assert_eq!(context.cmp_predicate(cmp), Predicate::Eq);
    assert_eq!(context.cmp_lhs(cmp), context.function_param_value(f, 0));
}

#[test]
fn test_module_level_var_lands_in_init() {
    let (context, module) = compile("var counter = 0 sub touch() counter = counter + 1 end");

    let init = module.get_function(&context, "test.init").expect("init exists");
    let entry = context.function_entry_block(init).unwrap();
    let instructions = context.block_instructions(entry).to_vec();
    assert_eq!(context.opcode(instructions[0]), Opcode::Alloca);
    assert_eq!(context.opcode(instructions[1]), Opcode::Store);
    assert_eq!(context.opcode(*instructions.last().unwrap()), Opcode::Ret);
}

#[test]
fn test_break_outside_loop_is_an_error() {
    let report = compile_err("sub g() break end");
    assert!(report.to_string().contains("breakable"));
}

#[test]
fn test_wrong_argument_count_is_an_error() {
    compile_err("def f(x: i32): i32 => x def g(): i32 => f(1, 2)");
}

#[test]
fn test_module_with_errors_is_discarded() {
    // the subroutine cannot produce a value
    compile_err("sub s() end def f(): i32 => s()");
}
