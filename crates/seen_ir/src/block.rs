//! Basic blocks. A block is a value of type `Label` (§3.2) that owns an
//! ordered list of instructions (§3.3, IR3, IR6).

use serde::{Deserialize, Serialize};

use crate::instruction::InstId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlockData {
    pub name: String,
    pub insts: Vec<InstId>,
    /// Set by CFG simplification (§4.6) when a block is folded away or
    /// found unreachable. `BlockId`s are stable indices into
    /// `FunctionData::blocks`, so a removed block is never truly
    /// deallocated — it is left empty and skipped by the printer, the
    /// verifier, and lowering.
    pub removed: bool,
}

impl BasicBlockData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insts: Vec::new(),
            removed: false,
        }
    }
}
