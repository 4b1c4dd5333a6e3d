//! Prologue/epilogue emission (§4.8). The hardware `push %rbp`/`pop %rbp`
//! pair is fixed text the assembly printer always wraps a function in (see
//! `asm.rs`); what actually depends on a function's frame size is the
//! `rbp`-relative stack reservation this emits as ordinary MIR, so it reads
//! and renders through the same opcode vocabulary as everything else
//! (`Load` for the `mov %rsp, %rbp` frame-pointer copy, `Sub`/`Add` for the
//! stack-pointer adjustment) instead of inventing push/pop pseudo-opcodes.

use seen_codegen::{FrameInfo, MachineInstruction, MachineOpcode, MachineOperand, MirFunction, OperandWidth};

use crate::registers::{RBP, RSP};

#[derive(Debug, Default)]
pub struct X64FrameInfo;

impl FrameInfo for X64FrameInfo {
    fn emit_prologue(&self, _func: &MirFunction, frame_size: u64) -> Vec<MachineInstruction> {
        let rsp = MachineOperand::IsaReg(RSP, OperandWidth::Int64);
        let rbp = MachineOperand::IsaReg(RBP, OperandWidth::Int64);
        let mut insts = vec![MachineInstruction::with_operands(MachineOpcode::Load, [rbp, rsp])];
        if frame_size > 0 {
            insts.push(MachineInstruction::with_operands(
                MachineOpcode::Sub,
                [rsp, rsp, MachineOperand::Immediate(frame_size as i64, OperandWidth::Int64)],
            ));
        }
        insts
    }

    fn emit_epilogue(&self, _func: &MirFunction, frame_size: u64) -> Vec<MachineInstruction> {
        let rsp = MachineOperand::IsaReg(RSP, OperandWidth::Int64);
        if frame_size == 0 {
            return Vec::new();
        }
        vec![MachineInstruction::with_operands(
            MachineOpcode::Add,
            [rsp, rsp, MachineOperand::Immediate(frame_size as i64, OperandWidth::Int64)],
        )]
    }
}
