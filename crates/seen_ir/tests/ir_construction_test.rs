//! Builder/printer/use-graph behavior over hand-built functions (§4.1,
//! §4.2, §3.4's IR1-IR6, P2/P3).

use seen_ir::{
    builder::IrBuilder, function::Linkage, instruction::{BinaryOp, Predicate},
    module::Module, printer::print_module, value::ValueRef, verify::verify_function, Context,
};

fn int_add_function(ctx: &mut Context) -> (Module, seen_ir::module::FunctionId) {
    let mut module = Module::new("m");
    let i64_ty = ctx.i64_type();
    let f = module.declare_function("add_one", Linkage::External, i64_ty, vec![i64_ty]);
    let entry = module.function_mut(f).create_block("entry");
    let arg_id = module.function(f).args().next().unwrap();
    {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let one = ValueRef::Const(ctx.const_int(1, seen_ir::types::IntWidth::Word));
        let arg = ValueRef::Arg(arg_id);
        let sum = b.binary(BinaryOp::Add, arg, one, i64_ty);
        b.ret(Some(ValueRef::Inst(sum)), ctx);
    }
    (module, f)
}

#[test]
fn builder_produces_a_single_terminator_per_block() {
    let mut ctx = Context::new();
    let (module, f) = int_add_function(&mut ctx);
    let func = module.function(f);
    let entry = func.entry.unwrap();
    let block = func.block(entry);
    let last = *block.insts.last().unwrap();
    assert_eq!(func.inst(last).opcode, seen_ir::instruction::Opcode::Ret);
    let terminators = block.insts.iter().filter(|i| func.inst(**i).opcode.is_terminator()).count();
    assert_eq!(terminators, 1);
}

#[test]
fn verify_function_accepts_a_well_formed_function() {
    let mut ctx = Context::new();
    let (module, f) = int_add_function(&mut ctx);
    assert!(verify_function(&ctx, &module, f).is_ok());
}

#[test]
fn printer_emits_the_function_header_and_add_instruction() {
    let mut ctx = Context::new();
    let (module, _f) = int_add_function(&mut ctx);
    let text = print_module(&ctx, &module);
    assert!(text.contains("define external @add_one"));
    assert!(text.contains("add i64"));
    assert!(text.contains("ret i64"));
}

#[test]
fn replace_all_uses_with_empties_the_old_use_list_and_grows_the_new_one() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("two_uses", Linkage::Internal, i64_ty, vec![]);
    let entry = module.function_mut(f).create_block("entry");
    module.function_mut(f).entry = Some(entry);
    let (a, b_id, sum) = {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let a = b.binary(BinaryOp::Add, ValueRef::Const(ctx.const_int(1, seen_ir::types::IntWidth::Word)), ValueRef::Const(ctx.const_int(2, seen_ir::types::IntWidth::Word)), i64_ty);
        let c = b.binary(BinaryOp::Add, ValueRef::Inst(a), ValueRef::Inst(a), i64_ty);
        b.ret(Some(ValueRef::Inst(c)), &mut ctx);
        (a, ValueRef::Inst(a), c)
    };
    let before = module.function(f).uses.use_count(b_id);
    assert_eq!(before, 2);

    let replacement = ValueRef::Const(ctx.const_int(9, seen_ir::types::IntWidth::Word));
    module.function_mut(f).replace_all_uses_with(b_id, replacement);

    assert_eq!(module.function(f).uses.use_count(b_id), 0);
    assert_eq!(module.function(f).uses.use_count(replacement), before);
    let sum_inst = module.function(f).inst(sum);
    assert!(sum_inst.operands.iter().all(|o| *o != b_id));
    let _ = a;
}

#[test]
fn icmp_result_type_is_bool() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("cmp", Linkage::Internal, ctx.bool_type(), vec![]);
    let entry = module.function_mut(f).create_block("entry");
    module.function_mut(f).entry = Some(entry);
    let func = module.function_mut(f);
    let mut b = IrBuilder::at_end(func, entry);
    let lhs = ValueRef::Const(ctx.const_int(1, seen_ir::types::IntWidth::Word));
    let rhs = ValueRef::Const(ctx.const_int(2, seen_ir::types::IntWidth::Word));
    let cmp = b.icmp(Predicate::Lt, lhs, rhs, &mut ctx);
    let bool_ty = ctx.bool_type();
    assert_eq!(func.inst(cmp).ty, bool_ty);
}
