//! Functions (§3.2, §4.1). A function owns its blocks, which own their
//! instructions (IR6). `Function` also holds the def-use graph for every
//! value definable within it (instructions, arguments, blocks).

use serde::{Deserialize, Serialize};

use crate::block::{BasicBlockData, BlockId};
use crate::instruction::{InstId, InstructionData, Opcode};
use crate::types::TypeId;
use crate::value::{UseGraph, ValueRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgId(pub(crate) u32);

impl ArgId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    External,
    Internal,
}

impl Linkage {
    pub fn as_str(self) -> &'static str {
        match self {
            Linkage::External => "external",
            Linkage::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionData {
    pub name: String,
    pub linkage: Linkage,
    pub return_type: TypeId,
    pub param_types: Vec<TypeId>,
    pub blocks: Vec<BasicBlockData>,
    pub insts: Vec<InstructionData>,
    #[serde(skip)]
    pub uses: UseGraph,
    /// `None` for a declaration (no body).
    pub entry: Option<BlockId>,
}

impl FunctionData {
    pub fn new(name: impl Into<String>, linkage: Linkage, return_type: TypeId, param_types: Vec<TypeId>) -> Self {
        Self {
            name: name.into(),
            linkage,
            return_type,
            param_types,
            blocks: Vec::new(),
            insts: Vec::new(),
            uses: UseGraph::new(),
            entry: None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.entry.is_none()
    }

    pub fn arg_count(&self) -> usize {
        self.param_types.len()
    }

    pub fn arg_type(&self, arg: ArgId) -> TypeId {
        self.param_types[arg.0 as usize]
    }

    pub fn args(&self) -> impl Iterator<Item = ArgId> {
        (0..self.param_types.len() as u32).map(ArgId)
    }

    pub fn block(&self, id: BlockId) -> &BasicBlockData {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlockData {
        &mut self.blocks[id.0 as usize]
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// Blocks not yet folded away by CFG simplification (§4.6); this is
    /// what the printer, verifier, and lowering framework iterate over.
    pub fn live_block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_ids().filter(|b| !self.block(*b).removed)
    }

    /// Detaches and destroys every instruction in `block`, then marks it
    /// removed (§4.6). `BlockId`s referring to it remain valid but it is
    /// skipped by every later stage.
    pub fn remove_block(&mut self, block: BlockId) {
        let insts: Vec<InstId> = self.blocks[block.0 as usize].insts.clone();
        for inst in insts {
            self.destroy_instruction(inst);
        }
        self.blocks[block.0 as usize].removed = true;
    }

    pub fn inst(&self, id: InstId) -> &InstructionData {
        &self.insts[id.0 as usize]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstructionData {
        &mut self.insts[id.0 as usize]
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlockData::new(name));
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        id
    }

    /// Allocates an instruction and appends it to `block`'s instruction
    /// list, registering a use for each of its operands. Returns the new
    /// instruction's id (which doubles as its result `ValueRef`).
    pub fn push_instruction(&mut self, block: BlockId, data: InstructionData) -> InstId {
        let id = InstId(self.insts.len() as u32);
        for (slot, operand) in data.operands.iter().enumerate() {
            self.uses.add_use(*operand, id, slot);
        }
        self.insts.push(data);
        self.blocks[block.0 as usize].insts.push(id);
        id
    }

    /// Inserts `data` at `index` within `block`'s instruction list (used by
    /// the builder's positional insertion and by legalization, which must
    /// be able to insert before/after the current position).
    pub fn insert_instruction_at(&mut self, block: BlockId, index: usize, data: InstructionData) -> InstId {
        let id = InstId(self.insts.len() as u32);
        for (slot, operand) in data.operands.iter().enumerate() {
            self.uses.add_use(*operand, id, slot);
        }
        self.insts.push(data);
        self.blocks[block.0 as usize].insts.insert(index, id);
        id
    }

    /// Detaches (IR6) `inst` from its block's instruction list without
    /// destroying it; returns the detached instruction's operands still
    /// intact. The caller must either re-insert it or call
    /// [`Self::destroy_instruction`].
    pub fn detach_instruction(&mut self, inst: InstId) {
        let block = self.inst(inst).block;
        self.blocks[block.0 as usize].insts.retain(|i| *i != inst);
    }

    /// Unlinks every operand's use entry for `inst`. Use before dropping an
    /// instruction for good so dangling `Use`s are never observed.
    pub fn destroy_instruction(&mut self, inst: InstId) {
        self.detach_instruction(inst);
        let operands = self.inst(inst).operands.clone();
        for (slot, operand) in operands.iter().enumerate() {
            self.uses.remove_use(*operand, inst, slot);
        }
    }

    /// `clone(instruction)` (§4.1, C4): allocates a fresh instruction with
    /// identical opcode/type/operands (registering uses for each operand)
    /// and appends it directly to `target_block`. The clone's identity is
    /// its own `InstId`; operands still point at the original's operands
    /// until the caller remaps them (e.g. through the inliner's value map).
    pub fn clone_instruction(&mut self, id: InstId, target_block: BlockId) -> InstId {
        let mut data = self.inst(id).clone();
        data.block = target_block;
        self.push_instruction(target_block, data)
    }

    /// `split(block, at_instruction)` (§4.1): creates a successor block
    /// starting at `at_instruction`, inheriting every instruction from
    /// `at_instruction` onward (including `block`'s terminator, if any).
    /// `block` is left without a terminator — the caller must supply one.
    pub fn split_block(&mut self, block: BlockId, at: InstId, new_name: impl Into<String>) -> BlockId {
        let index = self.blocks[block.0 as usize]
            .insts
            .iter()
            .position(|i| *i == at)
            .expect("split anchor in block");
        let tail: Vec<InstId> = self.blocks[block.0 as usize].insts.split_off(index);
        let new_id = BlockId(self.blocks.len() as u32);
        for &inst in &tail {
            self.insts[inst.0 as usize].block = new_id;
        }
        self.blocks.push(BasicBlockData { name: new_name.into(), insts: tail, removed: false });
        new_id
    }

    pub fn set_operand(&mut self, inst: InstId, slot: usize, new_value: ValueRef) {
        let old_value = self.insts[inst.0 as usize].operands[slot];
        if old_value == new_value {
            return;
        }
        self.uses.remove_use(old_value, inst, slot);
        self.insts[inst.0 as usize].operands[slot] = new_value;
        self.uses.add_use(new_value, inst, slot);
    }

    /// Replaces an instruction's entire operand list at once (used by phi
    /// incoming-pair pruning, where the slot count itself changes).
    /// Unregisters every old operand's use entry and registers the new
    /// list's, slot by slot.
    pub fn set_operands(&mut self, inst: InstId, new_operands: crate::instruction::OperandList) {
        let old_operands = self.insts[inst.0 as usize].operands.clone();
        for (slot, operand) in old_operands.iter().enumerate() {
            self.uses.remove_use(*operand, inst, slot);
        }
        for (slot, operand) in new_operands.iter().enumerate() {
            self.uses.add_use(*operand, inst, slot);
        }
        self.insts[inst.0 as usize].operands = new_operands;
    }

    /// §4.1: rewrites every operand slot referring to `old` to refer to
    /// `new` instead. `old`'s use list becomes empty; `new`'s use count
    /// grows by exactly `old`'s former use count (P3).
    pub fn replace_all_uses_with(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let moved = self.uses.move_uses(old, new);
        for u in moved {
            self.insts[u.user.0 as usize].operands[u.slot] = new;
        }
    }

    pub fn uses_of(&self, value: ValueRef) -> &[crate::value::Use] {
        self.uses.uses_of(value)
    }

    /// Terminator of `block`, if the block is well-formed (IR3).
    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        self.blocks[block.0 as usize]
            .insts
            .last()
            .copied()
            .filter(|id| self.inst(*id).opcode.is_terminator())
    }

    pub fn successors(&self, block: BlockId) -> smallvec::SmallVec<[BlockId; 2]> {
        self.terminator(block)
            .map(|t| self.inst(t).successors())
            .unwrap_or_default()
    }

    /// All predecessors of `target`, derived from every other block's
    /// terminator (§4.4). `O(blocks * successors)`; callers that need this
    /// repeatedly should use the cached [`crate::analysis::cfg::Cfg`].
    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.block_ids()
            .filter(|&b| self.successors(b).contains(&target))
            .collect()
    }

    pub fn phis(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        self.blocks[block.0 as usize]
            .insts
            .iter()
            .copied()
            .take_while(move |id| self.inst(*id).opcode.is_phi())
    }

    /// IR2 check: no phi may follow a non-phi instruction in `block`.
    pub fn phis_well_placed(&self, block: BlockId) -> bool {
        let insts = &self.blocks[block.0 as usize].insts;
        let mut seen_non_phi = false;
        for id in insts {
            if self.inst(*id).opcode.is_phi() {
                if seen_non_phi {
                    return false;
                }
            } else {
                seen_non_phi = true;
            }
        }
        true
    }

    /// Index within the entry block's instruction list right after the
    /// last existing `alloca` (0 if there are none). Code that introduces
    /// a new local (e.g. the inliner hoisting a callee's allocas) inserts
    /// here to keep the hard invariant (§9) that every `alloca` precedes
    /// every other instruction in the entry block.
    pub fn entry_alloca_insertion_point(&self) -> usize {
        let Some(entry) = self.entry else { return 0 };
        self.blocks[entry.0 as usize]
            .insts
            .iter()
            .take_while(|id| self.inst(**id).opcode.is_alloca())
            .count()
    }

    /// Hard invariant (§9): every `alloca` appears in the entry block
    /// before the first non-alloca instruction.
    pub fn allocas_well_placed(&self) -> bool {
        let Some(entry) = self.entry else { return true };
        let insts = &self.blocks[entry.0 as usize].insts;
        let mut seen_other = false;
        for id in insts {
            let is_alloca = self.inst(*id).opcode.is_alloca();
            if is_alloca {
                if seen_other {
                    return false;
                }
            } else if !self.inst(*id).opcode.is_phi() {
                seen_other = true;
            }
        }
        true
    }

    pub fn opcode_of(&self, value: ValueRef) -> Option<&Opcode> {
        match value {
            ValueRef::Inst(id) => Some(&self.inst(id).opcode),
            _ => None,
        }
    }
}
