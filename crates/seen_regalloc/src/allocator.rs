//! Linear-scan register allocation (§4.9, C10): the core algorithm over the
//! live intervals [`crate::interval::build_intervals`] produces, plus the
//! three rewrite passes that turn its decisions into MIR: caller-saved
//! spilling around call sites (step 6), the final virtual-to-physical/stack
//! operand rewrite, and a spill-induced memory-to-memory cleanup that
//! generalises §4.7's `InstStore`-only rule (see DESIGN.md) to any
//! instruction that ends up with two memory operands after spilling.

use hashbrown::HashMap;

use seen_common::{SeenError, SeenResult};
use seen_codegen::{MachineInstruction, MachineOpcode, MachineOperand, MirFunction, OperandWidth, RegisterInfo, StackSlotId, VRegId};

use crate::cfg::{is_call, MirCfg};
use crate::interval::{build_intervals, LinearProgram, LiveInterval, ProgramPoint};
use crate::liveness::Liveness;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Assignment {
    Register(u32),
    Stack(StackSlotId),
}

/// Runs the full allocator over one function (§4.9's Input/Output
/// contract): every virtual operand is rewritten to a physical register or
/// a stack slot, with spill code and caller-saved-around-calls code
/// inserted as needed.
pub fn allocate(func: &mut MirFunction, reg_info: &dyn RegisterInfo) -> SeenResult<()> {
    let cfg = MirCfg::compute(func);
    let liveness = Liveness::compute(func, &cfg);
    let program = LinearProgram::build(func, &cfg);
    let mut intervals = build_intervals(func, &cfg, &liveness, &program);
    // §4.9 step 3: "sort intervals by start index"; ties broken by the
    // lowest virtual-register id (spec.md's determinism requirement).
    intervals.sort_by_key(|iv| (iv.start, iv.vreg.0));

    let blocked = blocked_ranges(func, &program);

    let gp_pool = reserved_pool(reg_info.gp_registers());
    let fp_pool = reserved_pool(reg_info.fp_registers());

    let mut assigned: HashMap<VRegId, Assignment> = HashMap::new();
    let mut active_gp: Vec<(LiveInterval, u32)> = Vec::new();
    let mut active_fp: Vec<(LiveInterval, u32)> = Vec::new();
    let mut free_gp: Vec<u32> = gp_pool.clone();
    let mut free_fp: Vec<u32> = fp_pool.clone();

    for interval in &intervals {
        let is_fp = interval.width.is_fp_class();
        let (active, free, pool) = if is_fp { (&mut active_fp, &mut free_fp, &fp_pool) } else { (&mut active_gp, &mut free_gp, &gp_pool) };

        expire_old(active, free, interval.start);

        if let Some(reg) = take_free_register(free, &blocked, interval) {
            assigned.insert(interval.vreg, Assignment::Register(reg));
            active.push((*interval, reg));
            active.sort_by_key(|(iv, _)| (iv.end, iv.vreg.0));
            continue;
        }

        // §4.9 step 4c: spill. Pick the active interval (of this class)
        // with the latest end.
        if let Some(worst_idx) = active.iter().enumerate().max_by_key(|(_, (iv, _))| (iv.end, iv.vreg.0)).map(|(i, _)| i) {
            let (worst_iv, worst_reg) = active[worst_idx];
            if worst_iv.end > interval.end && !blocked_conflicts(&blocked, worst_reg, interval) {
                active.remove(worst_idx);
                let slot = func.new_stack_slot(worst_iv.width, 1);
                assigned.insert(worst_iv.vreg, Assignment::Stack(slot));
                assigned.insert(interval.vreg, Assignment::Register(worst_reg));
                active.push((*interval, worst_reg));
                active.sort_by_key(|(iv, _)| (iv.end, iv.vreg.0));
                continue;
            }
        }

        if pool.is_empty() {
            return Err(SeenError::legalization_impossible("register-class", "no physical register class fits this operand"));
        }
        let slot = func.new_stack_slot(interval.width, 1);
        assigned.insert(interval.vreg, Assignment::Stack(slot));
    }

    spill_around_calls(func, &program, reg_info, &intervals, &mut assigned);
    rewrite_operands(func, &assigned);
    resolve_memory_conflicts(func, reg_info);

    Ok(())
}

/// Reserves each class's highest-numbered register as scratch, unavailable
/// to the general allocation loop — see DESIGN.md's resolution of how
/// spill-induced memory-to-memory operand pairs get repaired without a
/// second, circular round of register allocation.
fn reserved_pool(all: &[u32]) -> Vec<u32> {
    let mut pool: Vec<u32> = all.to_vec();
    pool.sort_unstable();
    pool.pop();
    pool
}

fn scratch_register(all: &[u32]) -> Option<u32> {
    let mut sorted: Vec<u32> = all.to_vec();
    sorted.sort_unstable();
    sorted.pop()
}

fn expire_old(active: &mut Vec<(LiveInterval, u32)>, free: &mut Vec<u32>, start: ProgramPoint) {
    let mut i = 0;
    while i < active.len() {
        if active[i].0.end < start {
            let (_, reg) = active.remove(i);
            free.push(reg);
            free.sort_unstable();
        } else {
            i += 1;
        }
    }
}

fn blocked_conflicts(blocked: &HashMap<u32, Vec<(ProgramPoint, ProgramPoint)>>, reg: u32, interval: &LiveInterval) -> bool {
    blocked.get(&reg).map(|ranges| ranges.iter().any(|(s, e)| *s <= interval.end && interval.start <= *e)).unwrap_or(false)
}

fn take_free_register(free: &mut Vec<u32>, blocked: &HashMap<u32, Vec<(ProgramPoint, ProgramPoint)>>, interval: &LiveInterval) -> Option<u32> {
    free.sort_unstable();
    let pos = free.iter().position(|r| !blocked_conflicts(blocked, *r, interval))?;
    Some(free.remove(pos))
}

/// Pre-colored ranges (§4.9 step 5): every point an `IsaReg` operand
/// already occupies a physical register directly (the x64 legalizer's
/// shift-count and unary-negation fixups, argument-receiving copies) blocks
/// that register for overlapping intervals.
fn blocked_ranges(func: &MirFunction, program: &LinearProgram) -> HashMap<u32, Vec<(ProgramPoint, ProgramPoint)>> {
    let mut blocked: HashMap<u32, Vec<(ProgramPoint, ProgramPoint)>> = HashMap::new();
    for &b in &program.order {
        for (i, inst) in func.block(b).insts.iter().enumerate() {
            let point = program.point_of[&(b, i)];
            for op in &inst.operands {
                if let MachineOperand::IsaReg(reg, _) = op {
                    blocked.entry(*reg).or_default().push((point, point));
                }
            }
        }
    }
    blocked
}

/// §4.9 step 6: spill every caller-saved register assigned to an interval
/// that is live both before and after a call, reloading it right after.
fn spill_around_calls(
    func: &mut MirFunction,
    program: &LinearProgram,
    reg_info: &dyn RegisterInfo,
    intervals: &[LiveInterval],
    assigned: &mut HashMap<VRegId, Assignment>,
) {
    for &b in &program.order {
        let mut call_points: Vec<(usize, ProgramPoint)> = Vec::new();
        for (i, inst) in func.block(b).insts.iter().enumerate() {
            if is_call(&inst.opcode) {
                call_points.push((i, program.point_of[&(b, i)]));
            }
        }
        if call_points.is_empty() {
            continue;
        }

        let mut rebuilt: Vec<MachineInstruction> = Vec::new();
        let mut call_iter = call_points.into_iter().peekable();
        for (i, inst) in func.block(b).insts.iter().enumerate() {
            let is_this_call = call_iter.peek().is_some_and(|(ci, _)| *ci == i);
            if is_this_call {
                let (_, point) = call_iter.next().unwrap();
                let live_across: Vec<(VRegId, u32, OperandWidth)> = intervals
                    .iter()
                    .filter(|iv| iv.start < point && iv.end > point)
                    .filter_map(|iv| match assigned.get(&iv.vreg) {
                        Some(Assignment::Register(r)) if reg_info.is_caller_saved(*r) => Some((iv.vreg, *r, iv.width)),
                        _ => None,
                    })
                    .collect();

                let mut slots = Vec::with_capacity(live_across.len());
                for (_, reg, width) in &live_across {
                    let slot = func.new_stack_slot(*width, 1);
                    rebuilt.push(MachineInstruction::with_operands(MachineOpcode::Store, [MachineOperand::StackObject(slot, *width), MachineOperand::IsaReg(*reg, *width)]));
                    slots.push(slot);
                }
                rebuilt.push(inst.clone());
                for ((_, reg, width), slot) in live_across.iter().zip(slots) {
                    rebuilt.push(MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(*reg, *width), MachineOperand::StackObject(slot, *width)]));
                }
            } else {
                rebuilt.push(inst.clone());
            }
        }
        func.block_mut(b).insts = rebuilt;
    }
}

/// Final rewrite (§4.9 Output contract): every `VirtualReg` operand becomes
/// an `IsaReg` or `StackObject` per its assignment.
fn rewrite_operands(func: &mut MirFunction, assigned: &HashMap<VRegId, Assignment>) {
    for b in func.block_ids() {
        for inst in &mut func.block_mut(b).insts {
            for i in 0..inst.operands.len() {
                if let MachineOperand::VirtualReg(v, width) = inst.operand(i) {
                    let replacement = match assigned.get(&v) {
                        Some(Assignment::Register(r)) => MachineOperand::IsaReg(*r, width),
                        Some(Assignment::Stack(slot)) => MachineOperand::StackObject(*slot, width),
                        None => MachineOperand::Unused,
                    };
                    inst.set_operand(i, replacement);
                }
            }
        }
    }
}

/// Spilling can leave an instruction with two memory-class operands (both
/// a spilled destination and a spilled source in a two-operand-form
/// arithmetic instruction, or the `InstStore`-to-`InstStore` shape §4.7
/// already names) — neither is encodable on x64. Materialises every memory
/// operand past the first into the class's reserved scratch register.
fn resolve_memory_conflicts(func: &mut MirFunction, reg_info: &dyn RegisterInfo) {
    let gp_scratch = scratch_register(reg_info.gp_registers());
    let fp_scratch = scratch_register(reg_info.fp_registers());

    for b in func.block_ids() {
        let mut rebuilt: Vec<MachineInstruction> = Vec::with_capacity(func.block(b).insts.len());
        for mut inst in func.block(b).insts.iter().cloned() {
            let mem_positions: Vec<usize> = (0..inst.operands.len()).filter(|&i| inst.operand(i).is_memory()).collect();
            if mem_positions.len() > 1 {
                for &i in &mem_positions[1..] {
                    let op = inst.operand(i);
                    let width = op.width();
                    let Some(scratch) = (if width.is_fp_class() { fp_scratch } else { gp_scratch }) else { continue };
                    rebuilt.push(MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(scratch, width), op]));
                    inst.set_operand(i, MachineOperand::IsaReg(scratch, width));
                }
            }
            rebuilt.push(inst);
        }
        func.block_mut(b).insts = rebuilt;
    }
}
