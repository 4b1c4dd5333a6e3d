//! §4.8/§4.9: the `RegisterInfo` descriptor the register allocator and
//! legalizer both consult, grounded in `x64TargetRegisterInfo` from
//! `original_source/.../x64/x64Target.cpp`.

use seen_codegen::{OperandWidth, RegisterInfo};

use crate::registers;

#[derive(Debug, Default)]
pub struct X64RegisterInfo;

impl RegisterInfo for X64RegisterInfo {
    fn gp_registers(&self) -> &[u32] {
        &registers::GP_REGISTERS
    }

    fn fp_registers(&self) -> &[u32] {
        &registers::FP_REGISTERS
    }

    fn stack_pointer(&self) -> u32 {
        registers::RSP
    }

    fn frame_pointer(&self) -> u32 {
        registers::RBP
    }

    fn return_register(&self, is_float: bool) -> u32 {
        if is_float {
            registers::XMM_BASE
        } else {
            registers::RAX
        }
    }

    fn argument_registers(&self, is_float: bool) -> &[u32] {
        if is_float {
            &registers::FLOAT_ARG_REGISTERS
        } else {
            &registers::INT_ARG_REGISTERS
        }
    }

    fn count_register(&self) -> Option<u32> {
        Some(registers::RCX)
    }

    fn is_caller_saved(&self, reg: u32) -> bool {
        registers::is_caller_saved(reg)
    }

    fn is_callee_saved(&self, reg: u32) -> bool {
        registers::is_callee_saved(reg)
    }

    fn is_float_register(&self, reg: u32) -> bool {
        registers::is_float_register(reg)
    }

    fn register_name(&self, reg: u32, width: OperandWidth) -> String {
        registers::register_name(reg, width)
    }
}
