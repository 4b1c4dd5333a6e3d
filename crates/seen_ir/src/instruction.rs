//! Instructions (§3.3). Each variant is expressed as a data-carrying
//! [`Opcode`] rather than a class hierarchy, per design notes §9: a sealed
//! sum type plus small free functions replaces virtual dispatch on the hot
//! lowering/printing paths.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::block::BlockId;
use crate::types::TypeId;
use crate::value::ValueRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstId(pub(crate) u32);

impl InstId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
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
}

impl BinaryOp {
    pub fn is_float(self) -> bool {
        matches!(self, BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::URem => "urem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    FNeg,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
            UnaryOp::FNeg => "fneg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Predicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Lt => "lt",
            Predicate::Le => "le",
            Predicate::Gt => "gt",
            Predicate::Ge => "ge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastOp {
    ZExt,
    SExt,
    Trunc,
    FpToSi,
    SiToFp,
    UiToFp,
    FpToUi,
    FpExt,
    FpTrunc,
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::Trunc => "trunc",
            CastOp::FpToSi => "fptosi",
            CastOp::SiToFp => "sitofp",
            CastOp::UiToFp => "uitofp",
            CastOp::FpToUi => "fptoui",
            CastOp::FpExt => "fpext",
            CastOp::FpTrunc => "fptrunc",
        }
    }
}

/// The operation an instruction performs. Operand *meaning* is
/// opcode-dependent and documented per variant; see §3.3 for the exhaustive
/// list the core supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// operands: `[]`; `elem_ty` is the allocated type, `count` the
    /// (constant) number of contiguous elements.
    Alloca { elem_ty: TypeId, count: u32 },
    /// operands: `[ptr]`.
    Load,
    /// operands: `[value, ptr]`.
    Store,
    /// operands: `[base, index*]`; `elem_ty` is the type each index after
    /// the first steps over, needed by lowering to compute a byte offset
    /// (the result type alone, always `ptr`, does not carry this).
    Gep { elem_ty: TypeId },
    Icmp(Predicate),
    Fcmp(Predicate),
    Cast(CastOp),
    /// operands: `[target]`.
    Br,
    /// operands: `[cond, if_true, if_false]`.
    CondBr,
    /// operands: `[value, default, case_0_block, case_1_block, ...]`;
    /// `case_values` holds the matching constant for each case block.
    Switch { case_values: Vec<i64> },
    /// operands: `[value]` or `[]` for `ret void`.
    Ret,
    /// operands: `[value_0, pred_block_0, value_1, pred_block_1, ...]`.
    Phi,
    /// operands: `[callee, arg_0, arg_1, ...]`.
    Call,
    /// operands: `[cond, if_true, if_false]`.
    Select,
}

impl Opcode {
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Binary(op) => op.mnemonic(),
            Opcode::Unary(op) => op.mnemonic(),
            Opcode::Alloca { .. } => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Gep { .. } => "gep",
            Opcode::Icmp(_) => "icmp",
            Opcode::Fcmp(_) => "fcmp",
            Opcode::Cast(op) => op.mnemonic(),
            Opcode::Br => "br",
            Opcode::CondBr => "br",
            Opcode::Switch { .. } => "switch",
            Opcode::Ret => "ret",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Select => "select",
        }
    }

    /// IR3: whether this opcode is a basic-block terminator.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Br | Opcode::CondBr | Opcode::Switch { .. } | Opcode::Ret)
    }

    /// IR2: phis must precede every non-phi instruction in their block.
    pub fn is_phi(&self) -> bool {
        matches!(self, Opcode::Phi)
    }

    pub fn is_alloca(&self) -> bool {
        matches!(self, Opcode::Alloca { .. })
    }
}

/// An instruction's operand list, usually small; `SmallVec` avoids a heap
/// allocation for the common 0-3 operand cases.
pub type OperandList = SmallVec<[ValueRef; 4]>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionData {
    pub opcode: Opcode,
    pub ty: TypeId,
    #[serde(skip, default)]
    pub operands: OperandList,
    pub block: BlockId,
    pub name: Option<String>,
}

impl InstructionData {
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match &self.opcode {
            Opcode::Br => self.operands[0].as_block().into_iter().collect(),
            Opcode::CondBr => self.operands[1..3]
                .iter()
                .filter_map(|o| o.as_block())
                .collect(),
            Opcode::Switch { .. } => self.operands[1..]
                .iter()
                .filter_map(|o| o.as_block())
                .collect(),
            _ => SmallVec::new(),
        }
    }

    pub fn incoming_pairs(&self) -> impl Iterator<Item = (ValueRef, BlockId)> + '_ {
        debug_assert!(self.opcode.is_phi());
        self.operands.chunks_exact(2).map(|pair| (pair[0], pair[1].as_block().expect("phi predecessor")))
    }
}
