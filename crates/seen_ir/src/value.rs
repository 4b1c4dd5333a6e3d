//! Values and the def-use graph (§3.2, design notes §9).
//!
//! Every definable thing — an instruction, an argument, a basic block
//! (labels are branch targets), or a global — is named by a [`ValueRef`].
//! Instead of the teacher's back-pointer-from-operand-slot idiom (which
//! requires an intrusive doubly linked list and non-owning raw pointers),
//! uses are modeled as a flat `Vec<Use>` per definition, stored in the
//! owning [`crate::function::Function`] (for instructions/arguments/blocks)
//! or [`crate::module::Module`] (for globals). Values own their
//! definitions; use slots never own anything back.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::function::ArgId;
use crate::instruction::InstId;
use crate::module::{FunctionId, GlobalId};
use crate::types::{IntWidth, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstId(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Int(i64, IntWidth),
    /// Stored as bit pattern so the constant table can hash/compare floats.
    Float(u64),
    String(Vec<u8>),
    /// `TypeId` is the array's own type (not its element type).
    Array(TypeId, Vec<ConstId>),
    /// `TypeId` is the type of the null value itself.
    Null(TypeId),
}

impl Constant {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

/// Any value an operand slot can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueRef {
    Const(ConstId),
    Global(GlobalId),
    /// A callable function referenced by a `call` instruction's callee
    /// slot. Distinct from `Global` because functions and globals are
    /// separate namespaces in a [`crate::module::Module`].
    Function(FunctionId),
    Arg(ArgId),
    Block(BlockId),
    Inst(InstId),
}

impl ValueRef {
    pub fn as_inst(self) -> Option<InstId> {
        match self {
            ValueRef::Inst(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_block(self) -> Option<BlockId> {
        match self {
            ValueRef::Block(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_function(self) -> Option<FunctionId> {
        match self {
            ValueRef::Function(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_constant_like(self) -> bool {
        matches!(self, ValueRef::Const(_))
    }
}

/// One operand slot that refers to a definition: `user` is the instruction
/// holding the operand, `slot` its index within that instruction's operand
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: InstId,
    pub slot: usize,
}

/// The use list for every definable [`ValueRef`] within one scope (a
/// function, or a module for globals).
#[derive(Debug, Default, Clone)]
pub struct UseGraph {
    uses: HashMap<ValueRef, Vec<Use>>,
}

impl UseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uses_of(&self, value: ValueRef) -> &[Use] {
        self.uses.get(&value).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn use_count(&self, value: ValueRef) -> usize {
        self.uses_of(value).len()
    }

    pub fn add_use(&mut self, defined: ValueRef, user: InstId, slot: usize) {
        self.uses.entry(defined).or_default().push(Use { user, slot });
    }

    pub fn remove_use(&mut self, defined: ValueRef, user: InstId, slot: usize) {
        if let Some(list) = self.uses.get_mut(&defined) {
            list.retain(|u| !(u.user == user && u.slot == slot));
        }
    }

    /// Redirects every recorded use of `old` to `new`, moving `old`'s use
    /// list onto `new` and leaving `old`'s list empty. Does not rewrite the
    /// operand itself — callers are expected to do that through the
    /// instruction storage so both stay consistent (see
    /// [`crate::function::Function::replace_all_uses_with`]).
    pub fn move_uses(&mut self, old: ValueRef, new: ValueRef) -> Vec<Use> {
        let moved = self.uses.remove(&old).unwrap_or_default();
        if !moved.is_empty() {
            self.uses.entry(new).or_default().extend(moved.iter().copied());
        }
        moved
    }
}
