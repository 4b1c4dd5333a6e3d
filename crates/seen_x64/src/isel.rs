//! Instruction selection and legalization (§4.7/§4.8, grounded in
//! `original_source/.../x64/x64Target.cpp`'s `x64TargetISelInfo`):
//! - `try_lower` claims `icmp`/`fcmp`, emitting a flags-setting `cmp` plus a
//!   `setcc` into a fresh virtual register (the only instruction-selection
//!   hook the original exercises).
//! - `legalize` rewrites every machine instruction emitted by the default
//!   lowering to respect x64's register-class and operand-form
//!   constraints: two-operand arithmetic, the `cl`-register shift count,
//!   in-place unary negation, memory-to-memory stores, and the System V
//!   calling convention's fixed argument/return registers (an extension of
//!   spec.md §4.7's four named rules — see DESIGN.md).

use seen_common::SeenResult;
use seen_ir::{InstId, InstructionData, Opcode, ValueRef};
use seen_codegen::{ISelInfo, LoweringCx, MachineInstruction, MachineOpcode, MachineOperand, MirFunction, OperandWidth, RegisterInfo};

use crate::registers::{FLOAT_ARG_REGISTERS, INT_ARG_REGISTERS, RAX, RCX, XMM_BASE};

#[derive(Debug, Default)]
pub struct X64ISelInfo;

impl ISelInfo for X64ISelInfo {
    fn try_lower(&self, id: InstId, inst: &InstructionData, cx: &mut LoweringCx) -> bool {
        let pred = match &inst.opcode {
            Opcode::Icmp(p) | Opcode::Fcmp(p) => *p,
            _ => return false,
        };
        let lhs = cx.lower_value(inst.operands[0]);
        let rhs = cx.lower_value(inst.operands[1]);
        cx.emit(MachineInstruction::with_operands(MachineOpcode::Cmp(pred), [lhs, rhs]));
        let dst = MachineOperand::VirtualReg(cx.mir_func.new_vreg(), OperandWidth::Int1);
        cx.emit(MachineInstruction::with_operands(MachineOpcode::SetCc(pred), [dst]));
        cx.value_map.insert(ValueRef::Inst(id), dst);
        true
    }

    fn legalize(&self, func: &mut MirFunction, _reg_info: &dyn RegisterInfo) -> SeenResult<()> {
        prepend_argument_copies(func);

        for b in func.block_ids() {
            let original = func.block(b).insts.clone();
            let mut rebuilt = Vec::with_capacity(original.len());
            for mut inst in original {
                let mut before = Vec::new();
                let mut after = Vec::new();
                legalize_one(func, &mut inst, &mut before, &mut after);
                rebuilt.extend(before);
                rebuilt.push(inst);
                rebuilt.extend(after);
            }
            func.block_mut(b).insts = rebuilt;
        }
        Ok(())
    }
}

fn arg_register(class_counts: &mut (usize, usize), is_float: bool) -> Option<u32> {
    let (int_count, float_count) = class_counts;
    if is_float {
        let reg = FLOAT_ARG_REGISTERS.get(*float_count).copied();
        *float_count += 1;
        reg
    } else {
        let reg = INT_ARG_REGISTERS.get(*int_count).copied();
        *int_count += 1;
        reg
    }
}

fn return_register(width: OperandWidth) -> u32 {
    if width.is_fp_class() {
        XMM_BASE
    } else {
        RAX
    }
}

/// Prologue argument-receiving copies: one `Load arg_vreg, IsaReg(abi_reg)`
/// per source-level parameter, prepended to the entry block. Expressed as
/// ordinary virtual-register-defining instructions so the register
/// allocator can color (and potentially coalesce) them exactly like any
/// other value, rather than a hidden prologue side channel.
fn prepend_argument_copies(func: &mut MirFunction) {
    let Some(entry) = func.entry else { return };
    if func.args.is_empty() {
        return;
    }
    let mut counts = (0usize, 0usize);
    let mut copies = Vec::with_capacity(func.args.len());
    for (vreg, width) in func.args.clone().into_iter().zip(func.arg_widths.clone()) {
        if let Some(reg) = arg_register(&mut counts, width.is_fp_class()) {
            copies.push(MachineInstruction::with_operands(
                MachineOpcode::Load,
                [MachineOperand::VirtualReg(vreg, width), MachineOperand::IsaReg(reg, width)],
            ));
        }
    }
    copies.extend(func.block(entry).insts.iter().cloned());
    func.block_mut(entry).insts = copies;
}

fn legalize_one(func: &mut MirFunction, inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>, after: &mut Vec<MachineInstruction>) {
    match &inst.opcode {
        MachineOpcode::Store => legalize_store(func, inst, before),
        MachineOpcode::Add | MachineOpcode::Sub | MachineOpcode::Shl | MachineOpcode::AShr => legalize_two_operand(inst, before),
        MachineOpcode::Neg | MachineOpcode::Not | MachineOpcode::FNeg => legalize_unary(inst, before),
        MachineOpcode::Call => legalize_call(inst, before, after),
        MachineOpcode::Ret => legalize_ret(inst, before),
        _ => {}
    }
}

/// §4.7: "materialise `src` into a temporary virtual register" when an
/// `InstStore`'s location and value both already live in memory (a global
/// initialized from another global's address, or — post-allocation — two
/// spilled operands; the latter is also covered defensively by
/// `seen_regalloc`'s own memory-conflict pass).
fn legalize_store(func: &mut MirFunction, inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>) {
    let dst = inst.operand(0);
    let src = inst.operand(1);
    if dst.is_memory() && src.is_memory() {
        let tmp = MachineOperand::VirtualReg(func.new_vreg(), src.width());
        before.push(MachineInstruction::with_operands(MachineOpcode::Load, [tmp, src]));
        inst.set_operand(1, tmp);
    }
}

/// §4.7: `add/sub/shl/ashr dst, src1, src2` legalizes to the two-operand
/// x64 shape `dst, src2` preceded by `Load dst, src1` (the default lowering
/// always allocates `dst` as a fresh vreg distinct from `src1`, so this
/// fires unconditionally rather than only when `dst != src1` happens to be
/// false — see DESIGN.md).
fn legalize_two_operand(inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>) {
    let dst = inst.operand(0);
    let src1 = inst.operand(1);
    let mut src2 = inst.operand(2);

    if matches!(inst.opcode, MachineOpcode::Shl | MachineOpcode::AShr) && !src2.is_immediate() {
        let width = src2.width();
        before.push(MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(RCX, OperandWidth::Int8), src2]));
        src2 = MachineOperand::IsaReg(RCX, width);
    }

    before.push(MachineInstruction::with_operands(MachineOpcode::Load, [dst, src1]));
    inst.operands = smallvec::smallvec![dst, src2];
    inst.ignore_def_flag = true;
}

/// §4.7: `neg/not/fneg dst, src` expands to `Load dst, src` followed by the
/// in-place one-operand pseudo (`dst` is simultaneously the read and the
/// write). spec.md names only `InstNeg`; `not`/`fneg` share the identical
/// one-operand x64 encoding constraint so the same expansion applies here.
fn legalize_unary(inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>) {
    let dst = inst.operand(0);
    let src = inst.operand(1);
    before.push(MachineInstruction::with_operands(MachineOpcode::Load, [dst, src]));
    inst.operands = smallvec::smallvec![dst];
    inst.ignore_def_flag = true;
}

/// System V calling convention (§4.8): arguments move into their ABI
/// register immediately before the call; the call itself then only needs
/// its callee. The result, if any, arrives in `rax`/`xmm0` and is copied
/// out into the call's original destination vreg right after.
fn legalize_call(inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>, after: &mut Vec<MachineInstruction>) {
    let dst = inst.operand(0);
    let callee = inst.operand(1);
    let args: Vec<MachineOperand> = inst.operands[2..].to_vec();

    let mut counts = (0usize, 0usize);
    for arg in &args {
        let width = arg.width();
        if let Some(reg) = arg_register(&mut counts, width.is_fp_class()) {
            before.push(MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(reg, width), *arg]));
        }
    }

    if !dst.is_unused() {
        let width = dst.width();
        let reg = return_register(width);
        after.push(MachineInstruction::with_operands(MachineOpcode::Load, [dst, MachineOperand::IsaReg(reg, width)]));
    }

    inst.operands = smallvec::smallvec![MachineOperand::Unused, callee];
}

/// §4.8: the return value, if any, must be in `rax`/`xmm0` before `ret`.
fn legalize_ret(inst: &mut MachineInstruction, before: &mut Vec<MachineInstruction>) {
    if inst.operands.is_empty() {
        return;
    }
    let value = inst.operand(0);
    let width = value.width();
    let reg = return_register(width);
    before.push(MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(reg, width), value]));
    inst.operands = smallvec::smallvec![MachineOperand::IsaReg(reg, width)];
}
