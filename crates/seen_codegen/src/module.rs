//! Machine IR module (§3.5, C8), grounded on `MIRModule.cpp` in
//! `original_source/OlaCompiler/Backend/Custom/Codegen/MIRModule.cpp`: a flat
//! list of relocable globals (functions, initialized data, BSS), each
//! carrying linkage and alignment, walked in definition order by the
//! assembly printer (§4.10).

use hashbrown::HashMap;

use seen_ir::Linkage;

use crate::instruction::MachineInstruction;
use crate::operand::{MirBlockId, OperandWidth, StackSlotId, VRegId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MirGlobalId(pub u32);

#[derive(Debug, Clone)]
pub struct MirBasicBlock {
    pub name: String,
    pub insts: Vec<MachineInstruction>,
}

impl MirBasicBlock {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), insts: Vec::new() }
    }
}

/// A function's stack frame slot: a spill slot, an `alloca`'s storage, or a
/// temporary the legalizer introduces. Slots are indexed by
/// [`StackSlotId`]; the frame's total size and per-slot offsets are computed
/// by [`crate::target::FrameInfo`] once every slot has been assigned.
#[derive(Debug, Clone, Copy)]
pub struct StackSlot {
    pub width: OperandWidth,
    /// Number of contiguous elements (`> 1` for an `alloca`'d array).
    pub count: u32,
}

/// One function's machine code: blocks of [`MachineInstruction`]s plus the
/// virtual-register and stack-slot namespaces lowering draws from (§3.6 —
/// "virtual registers allocated during lowering outlive the function they
/// belong to").
#[derive(Debug, Clone)]
pub struct MirFunction {
    pub name: String,
    pub linkage: Linkage,
    pub blocks: Vec<MirBasicBlock>,
    /// Virtual-register operand per source-level argument, in order, fixed
    /// by [`crate::target::FrameInfo::argument_location`] at prologue time.
    pub args: Vec<VRegId>,
    /// Register-class width of each entry in `args`, parallel by index;
    /// the legalizer needs this to place each argument's receiving copy in
    /// the right ABI register (integer vs. floating-point argument bank).
    pub arg_widths: Vec<OperandWidth>,
    pub entry: Option<MirBlockId>,
    next_vreg: u32,
    stack_slots: Vec<StackSlot>,
}

impl MirFunction {
    pub fn new(name: impl Into<String>, linkage: Linkage) -> Self {
        Self {
            name: name.into(),
            linkage,
            blocks: Vec::new(),
            args: Vec::new(),
            arg_widths: Vec::new(),
            entry: None,
            next_vreg: 0,
            stack_slots: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.entry.is_none()
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> MirBlockId {
        let id = MirBlockId(self.blocks.len() as u32);
        self.blocks.push(MirBasicBlock::new(name));
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        id
    }

    pub fn block(&self, id: MirBlockId) -> &MirBasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: MirBlockId) -> &mut MirBasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    pub fn block_ids(&self) -> impl Iterator<Item = MirBlockId> {
        (0..self.blocks.len() as u32).map(MirBlockId)
    }

    pub fn push(&mut self, block: MirBlockId, inst: MachineInstruction) {
        self.blocks[block.0 as usize].insts.push(inst);
    }

    /// A fresh virtual register (§5 — "drawn from a per-function
    /// monotonically increasing counter; no locking is required").
    pub fn new_vreg(&mut self) -> VRegId {
        let id = VRegId(self.next_vreg);
        self.next_vreg += 1;
        id
    }

    pub fn vreg_count(&self) -> u32 {
        self.next_vreg
    }

    pub fn new_stack_slot(&mut self, width: OperandWidth, count: u32) -> StackSlotId {
        let id = StackSlotId(self.stack_slots.len() as u32);
        self.stack_slots.push(StackSlot { width, count });
        id
    }

    pub fn stack_slot(&self, id: StackSlotId) -> StackSlot {
        self.stack_slots[id.0 as usize]
    }

    pub fn stack_slots(&self) -> &[StackSlot] {
        &self.stack_slots
    }
}

/// An initialized-data global (`.data`/`.rodata`, §6.3): a constant's byte
/// representation, little-endian per the x64 data layout (§4.8).
#[derive(Debug, Clone)]
pub struct MirDataStorage {
    pub name: String,
    pub linkage: Linkage,
    pub bytes: Vec<u8>,
    pub align: u64,
}

/// A zero-initialized global (`.bss`).
#[derive(Debug, Clone)]
pub struct MirZeroStorage {
    pub name: String,
    pub linkage: Linkage,
    pub size: u64,
    pub align: u64,
}

#[derive(Debug, Clone)]
pub enum MirGlobal {
    Function(MirFunction),
    Data(MirDataStorage),
    Zero(MirZeroStorage),
}

impl MirGlobal {
    pub fn name(&self) -> &str {
        match self {
            MirGlobal::Function(f) => &f.name,
            MirGlobal::Data(d) => &d.name,
            MirGlobal::Zero(z) => &z.name,
        }
    }
}

/// Owns every relocable global lowering produces, in definition order
/// (§3.5, §4.10).
#[derive(Debug, Default)]
pub struct MirModule {
    pub name: String,
    globals: Vec<MirGlobal>,
    table: HashMap<String, MirGlobalId>,
}

impl MirModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn push_global(&mut self, global: MirGlobal) -> MirGlobalId {
        let name = global.name().to_string();
        if let Some(id) = self.table.get(&name) {
            return *id;
        }
        let id = MirGlobalId(self.globals.len() as u32);
        self.globals.push(global);
        self.table.insert(name, id);
        id
    }

    pub fn global(&self, id: MirGlobalId) -> &MirGlobal {
        &self.globals[id.0 as usize]
    }

    pub fn global_mut(&mut self, id: MirGlobalId) -> &mut MirGlobal {
        &mut self.globals[id.0 as usize]
    }

    pub fn find_global(&self, name: &str) -> Option<MirGlobalId> {
        self.table.get(name).copied()
    }

    pub fn global_ids(&self) -> impl Iterator<Item = MirGlobalId> {
        (0..self.globals.len() as u32).map(MirGlobalId)
    }

    pub fn globals(&self) -> impl Iterator<Item = &MirGlobal> {
        self.globals.iter()
    }

    pub fn globals_mut(&mut self) -> impl Iterator<Item = &mut MirGlobal> {
        self.globals.iter_mut()
    }
}
