//! Pass manager and analysis cache (§4.2, C6).
//!
//! The original identifies a pass by the address of a static data member
//! (`inline static Char id`) so every pass type gets a unique, stable
//! pointer to use as a map key. Rust's `std::any::TypeId` is the safe
//! equivalent — one id per concrete type, no `unsafe`, no global mutable
//! statics required.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use seen_common::SeenResult;

use crate::context::Context;
use crate::module::{FunctionId, Module};

/// A pass that may invalidate cached analyses of [`Self::invalidates`]
/// type when it runs; `None` means "invalidates everything" (the safe
/// default for a pass that doesn't track what it touches). Passes receive
/// `ctx` because rewriting IR (inserting a branch, reading a constant's
/// value) goes through the same `Context`-threaded builder API construction
/// does (§4.1) — there is no hidden global interning table (design notes §9).
pub trait FunctionPass {
    type Analysis: Any + 'static;

    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut Context, module: &mut Module, function: FunctionId, fam: &mut FunctionAnalysisManager) -> SeenResult<bool>;
}

pub trait ModulePass {
    fn name(&self) -> &'static str;

    fn run(&mut self, ctx: &mut Context, module: &mut Module, mam: &mut ModuleAnalysisManager) -> SeenResult<bool>;
}

/// An analysis computable on demand from a function's current state.
pub trait FunctionAnalysis: Any + Sized + 'static {
    fn compute(module: &Module, function: FunctionId) -> Self;
}

pub trait ModuleAnalysis: Any + Sized + 'static {
    fn compute(module: &Module) -> Self;
}

/// Caches function-scoped analyses, keyed per function and per analysis
/// type. A transform pass that mutates CFG shape calls
/// [`Self::invalidate_all`] (or a narrower `invalidate::<A>`) for the
/// functions it touched; everything else is served from cache.
#[derive(Default)]
pub struct FunctionAnalysisManager {
    cache: HashMap<(FunctionId, TypeId), Box<dyn Any>>,
}

impl FunctionAnalysisManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<A: FunctionAnalysis>(&mut self, module: &Module, function: FunctionId) -> &A {
        let key = (function, TypeId::of::<A>());
        if !self.cache.contains_key(&key) {
            let computed = A::compute(module, function);
            self.cache.insert(key, Box::new(computed));
        }
        self.cache.get(&key).unwrap().downcast_ref::<A>().expect("analysis type mismatch")
    }

    pub fn invalidate<A: FunctionAnalysis>(&mut self, function: FunctionId) {
        self.cache.remove(&(function, TypeId::of::<A>()));
    }

    pub fn invalidate_all(&mut self, function: FunctionId) {
        self.cache.retain(|(f, _), _| *f != function);
    }
}

#[derive(Default)]
pub struct ModuleAnalysisManager {
    cache: HashMap<TypeId, Box<dyn Any>>,
    pub function_analyses: FunctionAnalysisManager,
}

impl ModuleAnalysisManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<A: ModuleAnalysis>(&mut self, module: &Module) -> &A {
        let key = TypeId::of::<A>();
        if !self.cache.contains_key(&key) {
            let computed = A::compute(module);
            self.cache.insert(key, Box::new(computed));
        }
        self.cache.get(&key).unwrap().downcast_ref::<A>().expect("analysis type mismatch")
    }

    pub fn invalidate<A: ModuleAnalysis>(&mut self) {
        self.cache.remove(&TypeId::of::<A>());
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }
}

/// Runs a sequence of function passes over every defined function in the
/// module, then a sequence of module passes, in the order given. Mirrors
/// the original `PassManager::Run` driver loop but without the registry
/// indirection — passes are owned trait objects supplied by the caller
/// (the CLI driver, per §6.4).
type BoxedFunctionPass = Box<dyn FnMut(&mut Context, &mut Module, FunctionId, &mut FunctionAnalysisManager) -> SeenResult<bool>>;

#[derive(Default)]
pub struct PassManager {
    function_passes: Vec<(&'static str, BoxedFunctionPass)>,
    module_passes: Vec<Box<dyn ModulePass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function_pass<P>(&mut self, mut pass: P)
    where
        P: FunctionPass + 'static,
    {
        let name = pass.name();
        self.function_passes.push((name, Box::new(move |ctx, module, function, fam| pass.run(ctx, module, function, fam))));
    }

    pub fn add_module_pass<P: ModulePass + 'static>(&mut self, pass: P) {
        self.module_passes.push(Box::new(pass));
    }

    /// §4.2 contract: a transform returning `true` invalidates every
    /// cached analysis for the function it ran on; a pass precondition
    /// failure (§7) is non-fatal and logged, and the pipeline continues.
    pub fn run(&mut self, ctx: &mut Context, module: &mut Module) -> SeenResult<()> {
        let mut mam = ModuleAnalysisManager::new();
        let functions: Vec<FunctionId> = module.function_ids().filter(|f| !module.function(*f).is_declaration()).collect();
        for function in functions {
            for (name, pass) in &mut self.function_passes {
                match pass(ctx, module, function, &mut mam.function_analyses) {
                    Ok(changed) => {
                        log::debug!("pass '{}' on function {:?}: changed={}", name, function, changed);
                        if changed {
                            mam.function_analyses.invalidate_all(function);
                        }
                    }
                    Err(e) if !e.is_fatal() => {
                        log::warn!("pass '{}' skipped on function {:?}: {}", name, function, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        for pass in &mut self.module_passes {
            pass.run(ctx, module, &mut mam)?;
        }
        Ok(())
    }
}
