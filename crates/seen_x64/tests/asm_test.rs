//! AT&T assembly emission (§4.10, C11): a genuine memory load dereferences
//! its pointer operand, a register-copy pseudo sharing the same opcode does
//! not, and the `fneg` one-operand expansion goes through the reserved
//! `%xmm15` scratch rather than a zeroing `xorpd`.

use seen_codegen::{AsmPrinter, MachineInstruction, MachineOpcode, MachineOperand, MirFunction, MirGlobal, MirModule, OperandWidth, Target};
use seen_ir::Linkage;
use seen_x64::X64Target;

fn print_one(func: MirFunction) -> String {
    let target = X64Target::default();
    let mut module = MirModule::new("m");
    module.push_global(MirGlobal::Function(func));
    target.asm_printer().print_module(&module, target.register_info())
}

#[test]
fn a_genuine_load_through_a_register_held_pointer_dereferences_it() {
    let mut func = MirFunction::new("reads_through_pointer", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;
    let ptr_reg = 5u32; // an arbitrary physical register standing in for an alloca/gep result
    let dst_reg = 0u32;
    let mut load = MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(dst_reg, w), MachineOperand::IsaReg(ptr_reg, w)]);
    load.is_memory_access = true;
    func.push(entry, load);
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::IsaReg(dst_reg, w)]));

    let text = print_one(func);
    assert!(text.contains("(%rdi)"), "a flagged memory load must dereference its pointer register:\n{text}");
}

#[test]
fn a_register_copy_pseudo_under_the_same_load_opcode_is_not_dereferenced() {
    let mut func = MirFunction::new("copies_a_register", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;
    // is_memory_access left false: this is what the legalizer/phi resolution emit.
    let copy = MachineInstruction::with_operands(MachineOpcode::Load, [MachineOperand::IsaReg(0, w), MachineOperand::IsaReg(5, w)]);
    func.push(entry, copy);
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::IsaReg(0, w)]));

    let text = print_one(func);
    assert!(text.contains("movq %rdi, %rax"), "an unflagged copy must move the register value, not dereference it:\n{text}");
    assert!(!text.contains("(%rdi)"), "a plain register copy must never be printed with indirection:\n{text}");
}

#[test]
fn a_store_always_dereferences_its_destination() {
    let mut func = MirFunction::new("writes_through_pointer", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;
    let ptr_reg = 5u32;
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Store, [MachineOperand::IsaReg(ptr_reg, w), MachineOperand::Immediate(7, w)]));
    func.push(entry, MachineInstruction::new(MachineOpcode::Ret));

    let text = print_one(func);
    assert!(text.contains("(%rdi)"), "store destination must always dereference:\n{text}");
}

#[test]
fn fneg_negates_through_the_reserved_xmm15_scratch() {
    let mut func = MirFunction::new("negates", Linkage::External);
    let entry = func.create_block("entry");
    let fw = OperandWidth::Float64;
    let mut inst = MachineInstruction::with_operands(MachineOpcode::FNeg, [MachineOperand::IsaReg(16, fw)]);
    inst.ignore_def_flag = true;
    func.push(entry, inst);
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::IsaReg(16, fw)]));

    let text = print_one(func);
    assert!(text.contains("pxor %xmm15, %xmm15"));
    assert!(text.contains("subsd %xmm0, %xmm15"));
    assert!(text.contains("movsd %xmm15, %xmm0"));
    assert!(!text.contains("xorpd"), "fneg must not fall back to the zeroing xorpd sequence:\n{text}");
}

#[test]
fn two_operand_add_prints_as_a_two_operand_instruction() {
    let mut func = MirFunction::new("adds", Linkage::External);
    let entry = func.create_block("entry");
    let w = OperandWidth::Int64;
    let mut inst = MachineInstruction::with_operands(MachineOpcode::Add, [MachineOperand::IsaReg(0, w), MachineOperand::Immediate(3, w)]);
    inst.ignore_def_flag = true;
    func.push(entry, inst);
    func.push(entry, MachineInstruction::with_operands(MachineOpcode::Ret, [MachineOperand::IsaReg(0, w)]));

    let text = print_one(func);
    assert!(text.contains("addq $3, %rax"), "unexpected asm:\n{text}");
}
