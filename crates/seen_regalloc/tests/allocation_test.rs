//! Linear-scan register allocation (§4.9, C10, P6): every virtual register
//! is rewritten away, physical registers respect their operand's register
//! class, and no caller-saved register survives live across a call site.

use seen_codegen::{
    MachineInstruction, MachineOpcode, MachineOperand, MirFunction, MirGlobalId, OperandWidth,
    RegisterInfo, VRegId,
};
use seen_ir::Linkage;
use seen_regalloc::allocate;

/// Two caller-saved and two callee-saved GP registers, one FP register —
/// small enough to force spilling without a large hand-built program.
struct SmallRegisterInfo;
impl RegisterInfo for SmallRegisterInfo {
    fn gp_registers(&self) -> &[u32] {
        &[0, 1, 2, 3]
    }
    fn fp_registers(&self) -> &[u32] {
        &[16, 17]
    }
    fn stack_pointer(&self) -> u32 {
        30
    }
    fn frame_pointer(&self) -> u32 {
        31
    }
    fn return_register(&self, is_float: bool) -> u32 {
        if is_float {
            16
        } else {
            0
        }
    }
    fn argument_registers(&self, is_float: bool) -> &[u32] {
        if is_float {
            &[16]
        } else {
            &[1]
        }
    }
    fn count_register(&self) -> Option<u32> {
        None
    }
    fn is_caller_saved(&self, reg: u32) -> bool {
        reg == 0 || reg == 1
    }
    fn is_callee_saved(&self, reg: u32) -> bool {
        reg == 2 || reg == 3
    }
    fn is_float_register(&self, reg: u32) -> bool {
        reg >= 16
    }
    fn register_name(&self, reg: u32, _width: OperandWidth) -> String {
        format!("%r{reg}")
    }
}

fn operands_are_never_virtual(func: &MirFunction) -> bool {
    func.blocks.iter().flat_map(|b| b.insts.iter()).flat_map(|i| i.operands.iter()).all(|op| !op.is_virtual())
}

#[test]
fn every_virtual_register_is_rewritten_to_a_physical_or_stack_operand() {
    let reg_info = SmallRegisterInfo;
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");

    let v0 = func.new_vreg();
    let v1 = func.new_vreg();
    let v2 = func.new_vreg();
    let w = OperandWidth::Int64;

    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(v0, w),
            MachineOperand::Immediate(1, w),
            MachineOperand::Immediate(2, w),
        ]),
    );
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(v1, w),
            MachineOperand::VirtualReg(v0, w),
            MachineOperand::Immediate(3, w),
        ]),
    );
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(v2, w),
            MachineOperand::VirtualReg(v1, w),
            MachineOperand::VirtualReg(v0, w),
        ]),
    );
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(v2, w)]));

    allocate(&mut func, &reg_info).unwrap();
    assert!(operands_are_never_virtual(&func), "no VirtualReg operand may survive allocation");
}

#[test]
fn a_floating_point_value_is_assigned_a_register_from_the_fp_pool() {
    let reg_info = SmallRegisterInfo;
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");

    let v0 = func.new_vreg();
    let fw = OperandWidth::Float64;
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::FAdd, [
            MachineOperand::VirtualReg(v0, fw),
            MachineOperand::Immediate(0, fw),
            MachineOperand::Immediate(0, fw),
        ]),
    );
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(v0, fw)]));

    allocate(&mut func, &reg_info).unwrap();
    let ret = func.blocks[0].insts.last().unwrap();
    match ret.operand(0) {
        MachineOperand::IsaReg(r, _) => assert!(reg_info.is_float_register(r), "a float value must land in the FP register bank"),
        MachineOperand::StackObject(_, _) => {} // spilled is also acceptable
        other => panic!("unexpected operand after allocation: {other:?}"),
    }
}

#[test]
fn a_value_live_across_a_call_is_never_left_in_a_caller_saved_register() {
    let reg_info = SmallRegisterInfo;
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;

    let across = func.new_vreg();
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(across, w),
            MachineOperand::Immediate(11, w),
            MachineOperand::Immediate(22, w),
        ]),
    );
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Call, [MachineOperand::Unused, MachineOperand::Relocable(MirGlobalId(0), w)]),
    );
    let after = func.new_vreg();
    func.push(
        entry,
        MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(after, w),
            MachineOperand::VirtualReg(across, w),
            MachineOperand::Immediate(1, w),
        ]),
    );
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(after, w)]));

    allocate(&mut func, &reg_info).unwrap();
    assert!(operands_are_never_virtual(&func));

    let call_index = func.blocks[0].insts.iter().position(|i| matches!(i.opcode, MachineOpcode::Call)).unwrap();
    // The value crossing the call must either have been spilled (a Store
    // before the call and a Load reloading it after) or never assigned a
    // caller-saved register to begin with.
    let spilled_around = func.blocks[0].insts[..call_index].iter().any(|i| matches!(i.opcode, MachineOpcode::Store))
        && func.blocks[0].insts[call_index + 1..].iter().any(|i| matches!(i.opcode, MachineOpcode::Load));
    let never_caller_saved = func.blocks[0].insts.iter().flat_map(|i| i.operands.iter()).all(|op| match op {
        MachineOperand::IsaReg(r, _) => !reg_info.is_caller_saved(*r) || reg_info.is_float_register(*r),
        _ => true,
    });
    assert!(spilled_around || never_caller_saved, "a value live across a call must not ride through it in a caller-saved register unprotected");
}
