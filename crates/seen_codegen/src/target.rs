//! Target description interface (§4.8, C9). Every concrete backend (only
//! x64 in this workspace, `seen_x64`) implements these traits and is passed
//! around as a `&dyn Target` — design notes §9 forbid a "global singleton"
//! target descriptor; the descriptor is threaded explicitly through the
//! lowering context instead.

use seen_common::SeenResult;
use seen_ir::Context as IrContext;
use seen_ir::TypeId;

use crate::instruction::MachineOpcode;
use crate::lowering::LoweringCx;
use crate::module::{MirFunction, MirModule};
use crate::operand::OperandWidth;

/// §4.8: endianness, pointer size, storage/code alignment, per-type
/// alignment.
pub trait DataLayout {
    fn is_little_endian(&self) -> bool;
    fn pointer_size(&self) -> u64;
    fn storage_align(&self) -> u64;
    fn code_align(&self) -> u64;
    /// Alignment for a resolved IR type, used when placing a stack slot or
    /// an initialized global (falls back to the type's own natural
    /// alignment via [`seen_ir::Context::align_of`] when the target has no
    /// special rule for it).
    fn type_align(&self, ctx: &IrContext, ty: TypeId) -> u64 {
        ctx.align_of(ty).unwrap_or(self.storage_align())
    }
}

/// §4.8: physical register pools, the ABI-fixed roles (stack/frame/return/
/// count registers), and the caller/callee-saved split.
pub trait RegisterInfo {
    fn gp_registers(&self) -> &[u32];
    fn fp_registers(&self) -> &[u32];
    fn stack_pointer(&self) -> u32;
    fn frame_pointer(&self) -> u32;
    fn return_register(&self, is_float: bool) -> u32;
    /// Registers used for the first N integer/pointer, or float, arguments
    /// in ABI order; §4.8's "first six integer parameters" for x64.
    fn argument_registers(&self, is_float: bool) -> &[u32];
    /// The one register a variable shift count must occupy (§4.7's
    /// "architectural count register, e.g. `RCX.i8`"); `None` for targets
    /// with no such constraint.
    fn count_register(&self) -> Option<u32>;
    fn is_caller_saved(&self, reg: u32) -> bool;
    fn is_callee_saved(&self, reg: u32) -> bool;
    fn is_float_register(&self, reg: u32) -> bool;
    fn register_name(&self, reg: u32, width: OperandWidth) -> String;
}

/// §4.8: opcode metadata the register allocator and legalizer both consult.
pub trait InstInfo {
    fn is_commutative(&self, opcode: &MachineOpcode) -> bool {
        opcode.is_commutative()
    }
    fn may_load(&self, opcode: &MachineOpcode) -> bool {
        opcode.may_load()
    }
    fn may_store(&self, opcode: &MachineOpcode) -> bool {
        opcode.may_store()
    }
    fn is_terminator(&self, opcode: &MachineOpcode) -> bool {
        opcode.is_terminator()
    }
    fn is_two_operand_form(&self, opcode: &MachineOpcode) -> bool {
        opcode.is_two_operand_candidate()
    }
}

/// §4.8: prologue/epilogue emission and argument/return-value placement.
pub trait FrameInfo {
    /// Instructions establishing the frame, given the function's total
    /// local/spill size in bytes (already rounded to [`DataLayout::storage_align`]).
    fn emit_prologue(&self, func: &MirFunction, frame_size: u64) -> Vec<crate::instruction::MachineInstruction>;
    fn emit_epilogue(&self, func: &MirFunction, frame_size: u64) -> Vec<crate::instruction::MachineInstruction>;
}

/// §4.8/§4.7: the target instruction-selection hook and the legalizer.
pub trait ISelInfo {
    /// Attempts to claim `inst` (`id` is its own result value, for
    /// recording the custom sequence's result in `cx.value_map`), emitting
    /// a custom MIR sequence into `cx`'s current block. Returns `true` if
    /// it did; the generic lowering in [`crate::lowering`] only fires when
    /// this declines.
    fn try_lower(&self, id: seen_ir::InstId, inst: &seen_ir::InstructionData, cx: &mut LoweringCx) -> bool;

    /// Rewrites `func`'s MIR in place so every instruction respects this
    /// target's register-class and operand-form constraints (§4.7:
    /// two-operand forms, memory-to-memory stores, variable shift counts,
    /// unary negation expansion). Iteration must be safe under the
    /// insertions this performs.
    fn legalize(&self, func: &mut MirFunction, reg_info: &dyn RegisterInfo) -> SeenResult<()>;
}

/// §4.10: emits textual assembly for a finalized, register-allocated
/// [`MirModule`].
pub trait AsmPrinter {
    fn print_module(&self, module: &MirModule, reg_info: &dyn RegisterInfo) -> String;
}

/// Bundles the five descriptor traits a concrete backend supplies (§4.8).
/// Passed as `&dyn Target` everywhere lowering, legalization, register
/// allocation, and assembly emission need target facts — never as a
/// process-wide default.
pub trait Target {
    fn data_layout(&self) -> &dyn DataLayout;
    fn register_info(&self) -> &dyn RegisterInfo;
    fn inst_info(&self) -> &dyn InstInfo;
    fn frame_info(&self) -> &dyn FrameInfo;
    fn isel_info(&self) -> &dyn ISelInfo;
    fn asm_printer(&self) -> &dyn AsmPrinter;
}

/// Width for any IR type lowering or legalization needs to pick a register
/// class for (§3.5's width set, restricted to what the core IR ever
/// produces — see [`crate::operand::OperandWidth`]'s doc comment).
pub fn width_of_type(ctx: &IrContext, ty: TypeId) -> OperandWidth {
    use seen_ir::{IntWidth, IrType};
    match ctx.get_type(ty) {
        IrType::Int(IntWidth::Bool) => OperandWidth::Int1,
        IrType::Int(IntWidth::Byte) => OperandWidth::Int8,
        IrType::Int(IntWidth::Word) => OperandWidth::Int64,
        IrType::Float => OperandWidth::Float64,
        IrType::Pointer | IrType::Label => OperandWidth::Int64,
        IrType::Void => OperandWidth::Int64,
        IrType::Array(..) | IrType::Function(..) | IrType::Struct(..) => OperandWidth::Int64,
    }
}
