//! Linear-scan register allocation over machine IR (§4.9, C10): live
//! interval construction from a reverse-postorder linearisation of a
//! function's blocks, the scan itself (register assignment, spill/evict
//! policy, pre-colored physical-register ranges), caller-saved spilling
//! around call sites, and the final virtual-to-physical/stack rewrite.
//!
//! Grounded on `original_source/.../Codegen/RegisterAllocator.h`'s
//! `LinearScanRegisterAllocator`, re-expressed: the header gives only the
//! `TargetMachineDesc`/`AllocateRegisters` shape, so the scan's concrete
//! policy follows spec.md §4.9 step by step.

pub mod allocator;
pub mod cfg;
pub mod interval;
pub mod liveness;

pub use allocator::allocate;
pub use cfg::MirCfg;
pub use interval::{build_intervals, LinearProgram, LiveInterval};
pub use liveness::Liveness;

use seen_common::SeenResult;
use seen_codegen::{MirGlobal, MirModule, Target};

/// Allocates registers for every defined function in `module` (§4.9's
/// whole-module driver the CLI pipeline calls after lowering).
pub fn allocate_module(module: &mut MirModule, target: &dyn Target) -> SeenResult<()> {
    let ids: Vec<_> = module.global_ids().collect();
    for id in ids {
        if let MirGlobal::Function(func) = module.global_mut(id) {
            if !func.is_declaration() {
                allocator::allocate(func, target.register_info())?;
            }
        }
    }
    Ok(())
}
