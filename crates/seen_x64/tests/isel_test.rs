//! x64 legalization (§4.7/§4.8): two-operand rewrite, unary expansion, the
//! System V argument/return convention, and the shift-count-to-`cl` rule.

use seen_codegen::{ISelInfo, MachineOpcode, MachineOperand, MirFunction, OperandWidth, Target};
use seen_ir::Linkage;
use seen_x64::registers::{RAX, RCX, RDI, XMM_BASE};
use seen_x64::X64Target;

fn legalize(func: &mut MirFunction) {
    let target = X64Target::default();
    target.isel_info().legalize(func, target.register_info()).unwrap();
}

#[test]
fn two_operand_add_gets_a_setup_copy_and_drops_to_two_operands() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let dst = func.new_vreg();
    let src1 = func.new_vreg();
    let w = OperandWidth::Int64;
    func.push(
        entry,
        seen_codegen::MachineInstruction::with_operands(MachineOpcode::Add, [
            MachineOperand::VirtualReg(dst, w),
            MachineOperand::VirtualReg(src1, w),
            MachineOperand::Immediate(5, w),
        ]),
    );
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(dst, w)]));

    legalize(&mut func);

    let insts = &func.block(entry).insts;
    // setup copy, two-operand add, ret legalization's setup copy, rewritten ret.
    assert!(insts.iter().any(|i| matches!(i.opcode, MachineOpcode::Load) && i.operand(0) == MachineOperand::VirtualReg(dst, w)));
    let add = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Add)).unwrap();
    assert_eq!(add.operands.len(), 2, "x64 add only has room for dst and one source operand");
    assert!(add.ignore_def_flag, "the two-operand form reads and writes operand 0");
}

#[test]
fn shift_by_a_non_immediate_count_is_routed_through_cl() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let dst = func.new_vreg();
    let src1 = func.new_vreg();
    let count = func.new_vreg();
    let w = OperandWidth::Int64;
    func.push(
        entry,
        seen_codegen::MachineInstruction::with_operands(MachineOpcode::Shl, [
            MachineOperand::VirtualReg(dst, w),
            MachineOperand::VirtualReg(src1, w),
            MachineOperand::VirtualReg(count, w),
        ]),
    );
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(dst, w)]));

    legalize(&mut func);

    let insts = &func.block(entry).insts;
    let cl_copy = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Load) && i.operand(0) == MachineOperand::IsaReg(RCX, OperandWidth::Int8));
    assert!(cl_copy.is_some(), "a variable shift count must be copied into cl before the shift");
    let shl = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Shl)).unwrap();
    assert_eq!(shl.operand(1), MachineOperand::IsaReg(RCX, w), "the shift itself must read the count from rcx");
}

#[test]
fn unary_neg_expands_to_a_setup_copy_plus_an_in_place_negation() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let dst = func.new_vreg();
    let src = func.new_vreg();
    let w = OperandWidth::Int64;
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Neg, [MachineOperand::VirtualReg(dst, w), MachineOperand::VirtualReg(src, w)]));
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(dst, w)]));

    legalize(&mut func);

    let neg = func.block(entry).insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Neg)).unwrap();
    assert_eq!(neg.operands.len(), 1, "x64 neg operates on a single in-place operand");
    assert!(neg.ignore_def_flag);
}

#[test]
fn a_call_moves_arguments_into_abi_registers_and_copies_the_result_out() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let dst = func.new_vreg();
    let arg = func.new_vreg();
    let w = OperandWidth::Int64;
    func.push(
        entry,
        seen_codegen::MachineInstruction::with_operands(MachineOpcode::Call, [
            MachineOperand::VirtualReg(dst, w),
            MachineOperand::Relocable(seen_codegen::MirGlobalId(0), w),
            MachineOperand::VirtualReg(arg, w),
        ]),
    );
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(dst, w)]));

    legalize(&mut func);

    let insts = &func.block(entry).insts;
    let arg_copy = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Load) && i.operand(0) == MachineOperand::IsaReg(RDI, w));
    assert!(arg_copy.is_some(), "the first integer argument must move into rdi before the call");

    let call = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Call)).unwrap();
    assert_eq!(call.operands.len(), 2, "a legalized call keeps only its (unused) destination slot and callee");
    assert!(call.operand(0).is_unused());

    let result_copy = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Load) && i.operand(1) == MachineOperand::IsaReg(RAX, w));
    assert!(result_copy.is_some(), "the integer return value must be copied out of rax after the call");
}

#[test]
fn a_float_return_value_comes_back_through_xmm0() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let dst = func.new_vreg();
    let fw = OperandWidth::Float64;
    func.push(
        entry,
        seen_codegen::MachineInstruction::with_operands(MachineOpcode::Call, [MachineOperand::VirtualReg(dst, fw), MachineOperand::Relocable(seen_codegen::MirGlobalId(0), fw)]),
    );
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(dst, fw)]));

    legalize(&mut func);

    let insts = &func.block(entry).insts;
    let result_copy = insts.iter().find(|i| matches!(i.opcode, MachineOpcode::Load) && i.operand(1) == MachineOperand::IsaReg(XMM_BASE, fw));
    assert!(result_copy.is_some());
}

#[test]
fn argument_receiving_copies_are_prepended_to_the_entry_block() {
    let mut func = MirFunction::new("f", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;
    let arg_vreg = func.new_vreg();
    func.args.push(arg_vreg);
    func.arg_widths.push(w);
    func.push(entry, seen_codegen::MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::VirtualReg(arg_vreg, w)]));

    legalize(&mut func);

    let first = &func.block(entry).insts[0];
    assert!(matches!(first.opcode, MachineOpcode::Load));
    assert_eq!(first.operand(0), MachineOperand::VirtualReg(arg_vreg, w));
    assert_eq!(first.operand(1), MachineOperand::IsaReg(RDI, w), "the first integer parameter arrives in rdi");
}
