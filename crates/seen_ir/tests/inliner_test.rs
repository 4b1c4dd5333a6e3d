//! `FunctionInlinerPass` behavior (§4.5, P5): a call to a small,
//! non-recursive, defined callee is replaced by its cloned body, and the
//! result it produces is textually reachable at the call site through
//! either a direct use-replacement or a merge phi.

use seen_ir::{
    builder::IrBuilder, function::Linkage, instruction::{BinaryOp, Opcode},
    module::Module, pass::{FunctionPass, PassManager}, printer::print_module,
    transform::inliner::FunctionInlinerPass, types::IntWidth, value::ValueRef,
    verify::verify_function, Context,
};

fn build_callee_and_caller(ctx: &mut Context) -> (Module, seen_ir::module::FunctionId, seen_ir::module::FunctionId) {
    let mut module = Module::new("m");
    let i64_ty = ctx.i64_type();

    let callee = module.declare_function("inc", Linkage::Internal, i64_ty, vec![i64_ty]);
    let callee_entry = module.function_mut(callee).create_block("entry");
    let callee_arg = module.function(callee).args().next().unwrap();
    {
        let func = module.function_mut(callee);
        let mut b = IrBuilder::at_end(func, callee_entry);
        let one = ValueRef::Const(ctx.const_int(1, IntWidth::Word));
        let sum = b.binary(BinaryOp::Add, ValueRef::Arg(callee_arg), one, i64_ty);
        b.ret(Some(ValueRef::Inst(sum)), ctx);
    }

    let caller = module.declare_function("main", Linkage::External, i64_ty, vec![]);
    let caller_entry = module.function_mut(caller).create_block("entry");
    {
        let func = module.function_mut(caller);
        let mut b = IrBuilder::at_end(func, caller_entry);
        let five = ValueRef::Const(ctx.const_int(5, IntWidth::Word));
        let call = b.call(callee, "inc", 1, i64_ty, vec![five]).unwrap();
        b.ret(Some(ValueRef::Inst(call)), ctx);
    }

    (module, callee, caller)
}

#[test]
fn inlines_a_small_non_recursive_call_and_removes_the_call_instruction() {
    let mut ctx = Context::new();
    let (mut module, _callee, caller) = build_callee_and_caller(&mut ctx);

    let mut pass = FunctionInlinerPass;
    let mut fam = seen_ir::pass::FunctionAnalysisManager::new();
    let changed = pass.run(&mut ctx, &mut module, caller, &mut fam).unwrap();
    assert!(changed);

    let func = module.function(caller);
    let has_call = func.live_block_ids().flat_map(|b| func.block(b).insts.clone()).any(|i| matches!(func.inst(i).opcode, Opcode::Call));
    assert!(!has_call, "the call instruction must be gone once its callee is inlined");

    assert!(verify_function(&ctx, &module, caller).is_ok());
}

#[test]
fn refuses_to_inline_a_self_recursive_call() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("loopy", Linkage::Internal, i64_ty, vec![i64_ty]);
    let entry = module.function_mut(f).create_block("entry");
    let arg = module.function(f).args().next().unwrap();
    {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let call = b.call(f, "loopy", 1, i64_ty, vec![ValueRef::Arg(arg)]).unwrap();
        b.ret(Some(ValueRef::Inst(call)), ctx);
    }

    let mut pass = FunctionInlinerPass;
    let mut fam = seen_ir::pass::FunctionAnalysisManager::new();
    let changed = pass.run(&mut ctx, &mut module, f, &mut fam).unwrap();
    assert!(!changed, "a self-recursive call must be left alone");

    let func = module.function(f);
    let has_call = func.live_block_ids().flat_map(|b| func.block(b).insts.clone()).any(|i| matches!(func.inst(i).opcode, Opcode::Call));
    assert!(has_call);
}

#[test]
fn refuses_to_inline_a_bare_declaration() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let decl = module.declare_function("extern_fn", Linkage::External, i64_ty, vec![]);

    let caller = module.declare_function("main", Linkage::External, i64_ty, vec![]);
    let entry = module.function_mut(caller).create_block("entry");
    {
        let func = module.function_mut(caller);
        let mut b = IrBuilder::at_end(func, entry);
        let call = b.call(decl, "extern_fn", 0, i64_ty, vec![]).unwrap();
        b.ret(Some(ValueRef::Inst(call)), ctx);
    }

    let mut pass = FunctionInlinerPass;
    let mut fam = seen_ir::pass::FunctionAnalysisManager::new();
    let changed = pass.run(&mut ctx, &mut module, caller, &mut fam).unwrap();
    assert!(!changed, "a declaration has no body to inline");
}

#[test]
fn running_through_the_pass_manager_leaves_a_verifiable_function() {
    let mut ctx = Context::new();
    let (mut module, _callee, caller) = build_callee_and_caller(&mut ctx);

    let mut pm = PassManager::new();
    pm.add_function_pass(FunctionInlinerPass);
    pm.run(&mut ctx, &mut module).unwrap();

    assert!(verify_function(&ctx, &module, caller).is_ok());
    let text = print_module(&ctx, &module);
    assert!(!text.contains("call "), "printed IR must show no remaining call after inlining:\n{text}");
}
