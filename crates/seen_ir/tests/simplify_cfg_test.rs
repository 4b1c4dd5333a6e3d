//! `SimplifyCfgPass` behavior (§4.6, P4): the four local rewrites
//! (unreachable-block removal, empty-block bypass, constant-condition
//! branch fold, single-predecessor merge) each collapse a small hand-built
//! CFG to its expected shape.

use seen_ir::{
    builder::IrBuilder, function::Linkage, instruction::{BinaryOp, Opcode, Predicate},
    module::Module, pass::{FunctionAnalysisManager, FunctionPass},
    transform::simplify_cfg::SimplifyCfgPass, types::IntWidth, value::ValueRef,
    verify::verify_function, Context,
};

fn run_pass(ctx: &mut Context, module: &mut Module, f: seen_ir::module::FunctionId) -> bool {
    let mut pass = SimplifyCfgPass;
    let mut fam = FunctionAnalysisManager::new();
    pass.run(ctx, module, f, &mut fam).unwrap()
}

#[test]
fn folds_a_constant_true_condition_into_an_unconditional_branch() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);

    let entry = module.function_mut(f).create_block("entry");
    let if_true = module.function_mut(f).create_block("if_true");
    let if_false = module.function_mut(f).create_block("if_false");
    {
        let func = module.function_mut(f);
        let cond = ValueRef::Const(ctx.const_bool(true));
        IrBuilder::at_end(func, entry).cond_br(cond, if_true, if_false, &mut ctx);
        let ten = ValueRef::Const(ctx.const_int(10, IntWidth::Word));
        IrBuilder::at_end(func, if_true).ret(Some(ten), &mut ctx);
        let twenty = ValueRef::Const(ctx.const_int(20, IntWidth::Word));
        IrBuilder::at_end(func, if_false).ret(Some(twenty), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(changed);

    let func = module.function(f);
    let entry_term = func.terminator(entry).unwrap();
    assert_eq!(func.inst(entry_term).opcode, Opcode::Br, "the cond_br must fold to an unconditional br");
    assert!(func.block(if_false).removed, "the dead branch's block must be dropped as unreachable");
    assert!(verify_function(&ctx, &module, f).is_ok());
}

#[test]
fn bypasses_an_empty_forwarding_block() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);

    let entry = module.function_mut(f).create_block("entry");
    let forward = module.function_mut(f).create_block("forward");
    let target = module.function_mut(f).create_block("target");
    {
        let func = module.function_mut(f);
        IrBuilder::at_end(func, entry).br(forward, &mut ctx);
        IrBuilder::at_end(func, forward).br(target, &mut ctx);
        let seven = ValueRef::Const(ctx.const_int(7, IntWidth::Word));
        IrBuilder::at_end(func, target).ret(Some(seven), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(changed);

    let func = module.function(f);
    assert!(func.block(forward).removed, "the empty forwarding block must be bypassed away");
    let entry_term = func.terminator(entry).unwrap();
    assert_eq!(func.inst(entry_term).operands[0], ValueRef::Block(target), "entry must branch straight to target");
    assert!(verify_function(&ctx, &module, f).is_ok());
}

#[test]
fn merges_a_block_with_a_single_predecessor() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);

    let entry = module.function_mut(f).create_block("entry");
    let tail = module.function_mut(f).create_block("tail");
    {
        let func = module.function_mut(f);
        let one = ValueRef::Const(ctx.const_int(1, IntWidth::Word));
        IrBuilder::at_end(func, entry).binary(BinaryOp::Add, one, one, i64_ty);
        IrBuilder::at_end(func, entry).br(tail, &mut ctx);
        let two = ValueRef::Const(ctx.const_int(2, IntWidth::Word));
        IrBuilder::at_end(func, tail).binary(BinaryOp::Add, two, two, i64_ty);
        IrBuilder::at_end(func, tail).ret(Some(two), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(changed);

    let func = module.function(f);
    assert!(func.block(tail).removed, "tail's single predecessor must absorb it");
    let entry_insts = &func.block(entry).insts;
    assert_eq!(entry_insts.iter().filter(|i| func.inst(**i).opcode.is_terminator()).count(), 1, "the merged block keeps exactly one terminator");
    assert!(verify_function(&ctx, &module, f).is_ok());
}

#[test]
fn merging_a_block_retargets_phis_in_its_successor() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);

    let entry = module.function_mut(f).create_block("entry");
    let p = module.function_mut(f).create_block("p");
    let mid = module.function_mut(f).create_block("mid");
    let q = module.function_mut(f).create_block("q");
    let join = module.function_mut(f).create_block("join");

    {
        let func = module.function_mut(f);
        let bool_ty = ctx.bool_type();
        // A runtime-unknown condition (loaded from a local) so the
        // constant-branch-fold rewrite leaves `q` reachable; the merge
        // rewrite under test must run on a CFG the other rewrites don't
        // already collapse.
        let cond_slot = IrBuilder::at_end(func, entry).alloca(bool_ty, 1, &mut ctx);
        let true_const = ValueRef::Const(ctx.const_bool(true));
        IrBuilder::at_end(func, entry).store(true_const, ValueRef::Inst(cond_slot), &mut ctx);
        let cond = IrBuilder::at_end(func, entry).load(ValueRef::Inst(cond_slot), bool_ty);
        IrBuilder::at_end(func, entry).cond_br(ValueRef::Inst(cond), p, q, &mut ctx);
        let one = ValueRef::Const(ctx.const_int(1, IntWidth::Word));
        IrBuilder::at_end(func, p).binary(BinaryOp::Add, one, one, i64_ty);
        IrBuilder::at_end(func, p).br(mid, &mut ctx);
        let two = ValueRef::Const(ctx.const_int(2, IntWidth::Word));
        let added = IrBuilder::at_end(func, mid).binary(BinaryOp::Add, two, two, i64_ty);
        IrBuilder::at_end(func, mid).br(join, &mut ctx);
        let nine = ValueRef::Const(ctx.const_int(9, IntWidth::Word));
        IrBuilder::at_end(func, q).binary(BinaryOp::Add, nine, nine, i64_ty);
        IrBuilder::at_end(func, q).br(join, &mut ctx);
        IrBuilder::at_end(func, join).phi(i64_ty, vec![(ValueRef::Inst(added), mid), (nine, q)]);
        let result = func.phis(join).next().unwrap();
        IrBuilder::at_end(func, join).ret(Some(ValueRef::Inst(result)), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(changed);

    let func = module.function(f);
    assert!(func.block(mid).removed, "mid's single predecessor p must absorb it");
    let phi = func.phis(join).next().expect("join keeps its phi");
    let pairs: Vec<_> = func.inst(phi).incoming_pairs().collect();
    assert!(
        pairs.iter().any(|(_, pred)| *pred == p),
        "the incoming pair that named the removed block mid must now name its surviving predecessor p"
    );
    assert!(
        pairs.iter().all(|(_, pred)| *pred != mid),
        "no incoming pair may still reference the removed block mid"
    );
    assert!(verify_function(&ctx, &module, f).is_ok());
}

#[test]
fn removes_a_block_with_no_predecessors() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);

    let entry = module.function_mut(f).create_block("entry");
    let dead = module.function_mut(f).create_block("dead");
    {
        let func = module.function_mut(f);
        let zero = ValueRef::Const(ctx.const_int(0, IntWidth::Word));
        IrBuilder::at_end(func, entry).ret(Some(zero), &mut ctx);
        let nine = ValueRef::Const(ctx.const_int(9, IntWidth::Word));
        IrBuilder::at_end(func, dead).ret(Some(nine), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(changed);
    assert!(module.function(f).block(dead).removed);
}

#[test]
fn a_function_already_in_simplest_form_reports_no_change() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("f", Linkage::Internal, i64_ty, vec![]);
    let entry = module.function_mut(f).create_block("entry");
    {
        let func = module.function_mut(f);
        let zero = ValueRef::Const(ctx.const_int(0, IntWidth::Word));
        IrBuilder::at_end(func, entry).ret(Some(zero), &mut ctx);
    }

    let changed = run_pass(&mut ctx, &mut module, f);
    assert!(!changed, "nothing to simplify in a single-block function must be a no-op");
}
