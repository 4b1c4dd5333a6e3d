//! Machine instructions (§3.5, C8). `MachineOpcode` holds both the
//! target-independent pseudos the default lowering emits (§4.7) and the two
//! flags-oriented pseudos (`Cmp`/`SetCc`) the x64 instruction-selection hook
//! claims compares into (§4.8, grounded on `x64TargetISelInfo::LowerInstruction`
//! in `original_source/.../x64/x64Target.cpp`) — keeping them in one flat
//! enum (rather than a target-extensible opaque mnemonic) is what lets the
//! legalizer pattern-match on opcodes directly the way spec.md §4.7 does
//! ("`InstAdd/InstSub/InstShl/InstAShr`").

use smallvec::SmallVec;

use seen_ir::Predicate;

use crate::operand::MachineOperand;

#[derive(Debug, Clone, PartialEq)]
pub enum MachineOpcode {
    Add,
    Sub,
    Mul,
    UDiv,
    URem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    Neg,
    Not,
    FNeg,
    /// A move: register-register, memory-register, or register-memory
    /// depending on each operand's kind. Doubles as the copy the phi
    /// resolution pass emits (§4.7) and as the legalizer's two-operand-form
    /// setup instruction.
    Load,
    Store,
    SExt,
    ZExt,
    Trunc,
    FpToSi,
    SiToFp,
    FpExt,
    FpTrunc,
    FpToUi,
    UiToFp,
    /// Flags-setting compare; no destination operand.
    Cmp(Predicate),
    /// Materializes the flags `Cmp` set into a destination register.
    SetCc(Predicate),
    /// Materializes the effective address of operand 1 (a `StackObject` or
    /// `Relocable`) into the destination register — the `lea`-shaped
    /// pseudo an `alloca`'s pointer value and a `gep` base both need
    /// (neither the default arithmetic class nor `Load` fits: this does not
    /// read memory, it computes an address).
    FrameAddr,
    Select,
    Br,
    CondBr,
    Switch { case_values: Vec<i64> },
    Ret,
    Call,
}

impl MachineOpcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            MachineOpcode::Add => "add",
            MachineOpcode::Sub => "sub",
            MachineOpcode::Mul => "mul",
            MachineOpcode::UDiv => "udiv",
            MachineOpcode::URem => "urem",
            MachineOpcode::And => "and",
            MachineOpcode::Or => "or",
            MachineOpcode::Xor => "xor",
            MachineOpcode::Shl => "shl",
            MachineOpcode::LShr => "lshr",
            MachineOpcode::AShr => "ashr",
            MachineOpcode::FAdd => "fadd",
            MachineOpcode::FSub => "fsub",
            MachineOpcode::FMul => "fmul",
            MachineOpcode::FDiv => "fdiv",
            MachineOpcode::Neg => "neg",
            MachineOpcode::Not => "not",
            MachineOpcode::FNeg => "fneg",
            MachineOpcode::Load => "load",
            MachineOpcode::Store => "store",
            MachineOpcode::SExt => "sext",
            MachineOpcode::ZExt => "zext",
            MachineOpcode::Trunc => "trunc",
            MachineOpcode::FpToSi => "fptosi",
            MachineOpcode::SiToFp => "sitofp",
            MachineOpcode::FpExt => "fpext",
            MachineOpcode::FpTrunc => "fptrunc",
            MachineOpcode::FpToUi => "fptoui",
            MachineOpcode::UiToFp => "uitofp",
            MachineOpcode::Cmp(_) => "cmp",
            MachineOpcode::SetCc(_) => "setcc",
            MachineOpcode::FrameAddr => "frameaddr",
            MachineOpcode::Select => "select",
            MachineOpcode::Br => "br",
            MachineOpcode::CondBr => "br",
            MachineOpcode::Switch { .. } => "switch",
            MachineOpcode::Ret => "ret",
            MachineOpcode::Call => "call",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, MachineOpcode::Br | MachineOpcode::CondBr | MachineOpcode::Switch { .. } | MachineOpcode::Ret)
    }

    pub fn is_two_operand_candidate(&self) -> bool {
        matches!(self, MachineOpcode::Add | MachineOpcode::Sub | MachineOpcode::Shl | MachineOpcode::AShr)
    }

    pub fn is_commutative(&self) -> bool {
        matches!(self, MachineOpcode::Add | MachineOpcode::FAdd | MachineOpcode::Mul | MachineOpcode::FMul | MachineOpcode::And | MachineOpcode::Or | MachineOpcode::Xor)
    }

    pub fn may_load(&self) -> bool {
        matches!(self, MachineOpcode::Load)
    }

    pub fn may_store(&self) -> bool {
        matches!(self, MachineOpcode::Store)
    }
}

pub type MachineOperandList = SmallVec<[MachineOperand; 4]>;

/// One machine instruction. Operand 0 is the destination for every opcode
/// that defines a value, except `Store`/`Cmp`/control instructions, which
/// define nothing (`Cmp` writes architectural flags, not an operand).
#[derive(Debug, Clone)]
pub struct MachineInstruction {
    pub opcode: MachineOpcode,
    pub operands: MachineOperandList,
    /// Set by the legalizer (§4.7) once an instruction has been rewritten
    /// to its two-operand form: operand 0 is simultaneously a def and a use,
    /// and callers computing def/use sets must not double-count it.
    pub ignore_def_flag: bool,
    /// Distinguishes a genuine `Load` (operand 1 names an address that must
    /// be dereferenced) from the register-copy pseudo the legalizer and phi
    /// resolution also emit under `MachineOpcode::Load` (§4.7/§4.8): a copy's
    /// source already holds the value itself, never an address to read
    /// through. `Store`'s destination is always an address, so it needs no
    /// equivalent flag. See `seen_x64::asm`'s printer.
    pub is_memory_access: bool,
}

impl MachineInstruction {
    pub fn new(opcode: MachineOpcode) -> Self {
        Self { opcode, operands: MachineOperandList::new(), ignore_def_flag: false, is_memory_access: false }
    }

    pub fn with_operands(opcode: MachineOpcode, operands: impl IntoIterator<Item = MachineOperand>) -> Self {
        Self { opcode, operands: operands.into_iter().collect(), ignore_def_flag: false, is_memory_access: false }
    }

    pub fn operand(&self, index: usize) -> MachineOperand {
        self.operands[index]
    }

    pub fn set_operand(&mut self, index: usize, operand: MachineOperand) {
        self.operands[index] = operand;
    }

    /// Whether this opcode defines operand 0 as a fresh result (rather than
    /// purely reading its operands).
    pub fn defines_result(&self) -> bool {
        !self.ignore_def_flag
            && !matches!(
                self.opcode,
                MachineOpcode::Store | MachineOpcode::Cmp(_) | MachineOpcode::Br | MachineOpcode::CondBr | MachineOpcode::Switch { .. } | MachineOpcode::Ret | MachineOpcode::Call
            )
    }
}
