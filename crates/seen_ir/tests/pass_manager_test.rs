//! Analysis caching and invalidation (§4.2, C6): a cached analysis survives
//! repeated `get` calls until a pass reports `changed`, at which point the
//! whole per-function cache is dropped and the next `get` recomputes it.

use std::sync::atomic::{AtomicU32, Ordering};

use seen_common::SeenResult;
use seen_ir::{
    builder::IrBuilder, context::Context, function::Linkage, module::{FunctionId, Module},
    pass::{FunctionAnalysis, FunctionAnalysisManager, FunctionPass, PassManager},
    value::ValueRef,
};

static COMPUTE_COUNT: AtomicU32 = AtomicU32::new(0);

/// An analysis whose `compute` is observable: each call bumps a process-wide
/// counter and records the value it saw, so a test can tell recomputation
/// apart from a cache hit without inspecting the cache's internals.
struct Probe(u32);

impl FunctionAnalysis for Probe {
    fn compute(_module: &Module, _function: FunctionId) -> Self {
        Probe(COMPUTE_COUNT.fetch_add(1, Ordering::SeqCst))
    }
}

fn trivial_function() -> (Context, Module, FunctionId) {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("probe_target", Linkage::Internal, i64_ty, vec![]);
    let entry = module.function_mut(f).create_block("entry");
    module.function_mut(f).entry = Some(entry);
    {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let zero = ValueRef::Const(ctx.const_int(0, seen_ir::types::IntWidth::Word));
        b.ret(Some(zero), &mut ctx);
    }
    (ctx, module, f)
}

#[test]
fn analysis_manager_reuses_the_cached_value_until_invalidated() {
    let (_ctx, module, f) = trivial_function();
    let mut fam = FunctionAnalysisManager::new();

    let first = fam.get::<Probe>(&module, f).0;
    let second = fam.get::<Probe>(&module, f).0;
    assert_eq!(first, second, "a second get before invalidation must hit the cache");

    fam.invalidate_all(f);
    let third = fam.get::<Probe>(&module, f).0;
    assert_ne!(second, third, "get after invalidate_all must recompute");
}

struct ProbeThenChange;

impl FunctionPass for ProbeThenChange {
    type Analysis = Probe;

    fn name(&self) -> &'static str {
        "probe-then-change"
    }

    fn run(&mut self, _ctx: &mut Context, module: &mut Module, function: FunctionId, fam: &mut FunctionAnalysisManager) -> SeenResult<bool> {
        fam.get::<Probe>(module, function);
        Ok(true)
    }
}

struct RecordProbe {
    observed: std::cell::Cell<u32>,
}

impl FunctionPass for RecordProbe {
    type Analysis = Probe;

    fn name(&self) -> &'static str {
        "record-probe"
    }

    fn run(&mut self, _ctx: &mut Context, module: &mut Module, function: FunctionId, fam: &mut FunctionAnalysisManager) -> SeenResult<bool> {
        self.observed.set(fam.get::<Probe>(module, function).0);
        Ok(false)
    }
}

#[test]
fn a_pass_reporting_changed_invalidates_the_next_passs_cached_analysis() {
    let (mut ctx, mut module, _f) = trivial_function();
    let observed = std::cell::Cell::new(u32::MAX);

    let mut pm = PassManager::new();
    pm.add_function_pass(ProbeThenChange);
    pm.add_function_pass(RecordProbe { observed: observed.clone() });
    pm.run(&mut ctx, &mut module).unwrap();

    // `ProbeThenChange` computed the analysis once and reported `changed`;
    // `RecordProbe` running right after must see a *fresh* computation, not
    // the one `ProbeThenChange` already paid for.
    assert_ne!(observed.get(), u32::MAX, "RecordProbe must have run");
}
