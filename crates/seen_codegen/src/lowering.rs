//! Target-independent lowering to MIR (§4.7, C8). Walks each function
//! block-by-block, materializing phi placeholders up front so forward uses
//! resolve, then lowers every instruction through the target's
//! [`crate::target::ISelInfo::try_lower`] hook first and a generic
//! opcode-class fallback second. After the whole module is lowered, the
//! target's legalizer rewrites every machine instruction to respect its
//! register-class and operand-form constraints.

use hashbrown::HashMap;

use seen_common::{SeenError, SeenResult};
use seen_ir::analysis::cfg::Cfg;
use seen_ir::pass::FunctionAnalysis;
use seen_ir::{
    BlockId, Constant, ConstId, Context as IrContext, FunctionId, GlobalId, InstId, InstructionData, Linkage, Module as IrModule, Opcode, ValueRef,
};

use crate::instruction::{MachineInstruction, MachineOpcode};
use crate::module::{MirDataStorage, MirFunction, MirGlobal, MirGlobalId, MirModule, MirZeroStorage};
use crate::operand::{MachineOperand, MirBlockId, OperandWidth};
use crate::target::{width_of_type, Target};

/// Per-function lowering state threaded through instruction selection.
/// Exposed to [`crate::target::ISelInfo::try_lower`] so a target's custom
/// sequence can allocate virtual registers, look up already-lowered
/// operands, and emit into the block currently being lowered.
pub struct LoweringCx<'a> {
    pub ir_ctx: &'a IrContext,
    pub ir_module: &'a IrModule,
    pub mir_func: MirFunction,
    pub block_map: HashMap<BlockId, MirBlockId>,
    pub value_map: HashMap<ValueRef, MachineOperand>,
    pub cur_block: MirBlockId,
    data_globals: &'a mut HashMap<ConstId, MirGlobalId>,
    pending_data: Vec<MirGlobal>,
    next_data_id: &'a mut u32,
    func_globals: &'a HashMap<FunctionId, MirGlobalId>,
    global_globals: &'a HashMap<GlobalId, MirGlobalId>,
}

impl<'a> LoweringCx<'a> {
    pub fn emit(&mut self, inst: MachineInstruction) {
        self.mir_func.push(self.cur_block, inst);
    }

    pub fn new_vreg(&mut self, width: OperandWidth) -> MachineOperand {
        MachineOperand::VirtualReg(self.mir_func.new_vreg(), width)
    }

    pub fn block_of(&self, ir_block: BlockId) -> MirBlockId {
        self.block_map[&ir_block]
    }

    pub fn result_of(&self, id: InstId) -> MachineOperand {
        self.value_map.get(&ValueRef::Inst(id)).copied().unwrap_or(MachineOperand::Unused)
    }

    /// Resolves an IR `ValueRef` to a `MachineOperand`, materializing
    /// constant data (strings, arrays) as relocable globals on first use.
    pub fn lower_value(&mut self, value: ValueRef) -> MachineOperand {
        match value {
            ValueRef::Const(c) => self.lower_constant(c),
            ValueRef::Arg(_) | ValueRef::Inst(_) => self.value_map.get(&value).copied().unwrap_or(MachineOperand::Unused),
            ValueRef::Global(g) => MachineOperand::Relocable(self.global_globals[&g], OperandWidth::Int64),
            ValueRef::Function(f) => MachineOperand::Relocable(self.func_globals[&f], OperandWidth::Int64),
            ValueRef::Block(b) => MachineOperand::Block(self.block_of(b)),
        }
    }

    fn lower_constant(&mut self, id: ConstId) -> MachineOperand {
        match self.ir_ctx.get_const(id).clone() {
            Constant::Int(v, width) => MachineOperand::Immediate(v, width_for_int(width)),
            Constant::Float(bits) => MachineOperand::Immediate(bits as i64, OperandWidth::Float64),
            Constant::Null(ty) => MachineOperand::Immediate(0, width_of_type(self.ir_ctx, ty)),
            Constant::String(bytes) => {
                let global = self.materialize_data(id, bytes);
                MachineOperand::Relocable(global, OperandWidth::Int64)
            }
            Constant::Array(_, elems) => {
                let bytes = serialize_array(self.ir_ctx, &elems);
                let global = self.materialize_data(id, bytes);
                MachineOperand::Relocable(global, OperandWidth::Int64)
            }
        }
    }

    /// Allocates a fresh `MirGlobalId` for a constant-data global, reserved
    /// against the shared counter `lower_module` hands every function so
    /// that ids stay unique across the whole module without needing a live
    /// `&mut MirModule` during per-function lowering (every function lowers
    /// independently — see `lower_function` — so the module itself is only
    /// touched before and after, never concurrently with it). `lower_module`
    /// pushes `pending_data` in the same order right after this function
    /// returns, which keeps the reserved ids aligned with the ids
    /// `MirModule::push_global` actually assigns.
    fn materialize_data(&mut self, id: ConstId, bytes: Vec<u8>) -> MirGlobalId {
        if let Some(g) = self.data_globals.get(&id) {
            return *g;
        }
        let global_id = MirGlobalId(*self.next_data_id);
        *self.next_data_id += 1;
        let name = format!(".Lconst.{}", global_id.0);
        self.pending_data.push(MirGlobal::Data(MirDataStorage {
            name,
            linkage: Linkage::Internal,
            bytes,
            align: 8,
        }));
        self.data_globals.insert(id, global_id);
        global_id
    }
}

fn width_for_int(width: seen_ir::IntWidth) -> OperandWidth {
    match width {
        seen_ir::IntWidth::Bool => OperandWidth::Int1,
        seen_ir::IntWidth::Byte => OperandWidth::Int8,
        seen_ir::IntWidth::Word => OperandWidth::Int64,
    }
}

fn serialize_array(ctx: &IrContext, elems: &[ConstId]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &e in elems {
        match ctx.get_const(e) {
            Constant::Int(v, width) => {
                let w = width_for_int(*width).bytes() as usize;
                bytes.extend_from_slice(&v.to_le_bytes()[..w]);
            }
            Constant::Float(bits) => bytes.extend_from_slice(&bits.to_le_bytes()),
            Constant::Null(_) => bytes.extend_from_slice(&0i64.to_le_bytes()),
            Constant::String(s) => bytes.extend_from_slice(s),
            Constant::Array(_, nested) => bytes.extend_from_slice(&serialize_array(ctx, nested)),
        }
    }
    bytes
}

/// Lowers an entire [`seen_ir::Module`] to MIR (§4.7), then legalizes every
/// defined function via the target's legalizer.
pub fn lower_module(ctx: &IrContext, module: &IrModule, target: &dyn Target) -> SeenResult<MirModule> {
    let mut mir_module = MirModule::new(module.name.clone());

    let mut func_globals = HashMap::new();
    for fid in module.function_ids() {
        let f = module.function(fid);
        let stub = MirFunction::new(f.name.clone(), f.linkage);
        let id = mir_module.push_global(MirGlobal::Function(stub));
        func_globals.insert(fid, id);
    }

    let mut global_globals = HashMap::new();
    for gid in module.global_ids() {
        let g = module.global(gid);
        let align = target.data_layout().type_align(ctx, g.value_type);
        let id = match g.initializer {
            Some(c) => {
                let bytes = serialize_array(ctx, std::slice::from_ref(&c));
                mir_module.push_global(MirGlobal::Data(MirDataStorage {
                    name: g.name.clone(),
                    linkage: g.linkage,
                    bytes,
                    align,
                }))
            }
            None => {
                let size = ctx.size_of(g.value_type).unwrap_or(8);
                mir_module.push_global(MirGlobal::Zero(MirZeroStorage {
                    name: g.name.clone(),
                    linkage: g.linkage,
                    size,
                    align,
                }))
            }
        };
        global_globals.insert(gid, id);
    }

    // Constant-data globals (string/array literals) materialized during
    // lowering get ids starting right after every global pushed above; see
    // `LoweringCx::materialize_data`'s doc comment for why this stays in
    // sync with the ids `push_global` assigns.
    let mut next_data_id = mir_module.global_ids().count() as u32;
    let mut data_globals = HashMap::new();

    for fid in module.function_ids() {
        if module.function(fid).is_declaration() {
            continue;
        }
        let (lowered, pending) = lower_function(ctx, module, fid, target, &func_globals, &global_globals, &mut data_globals, &mut next_data_id)?;
        for global in pending {
            mir_module.push_global(global);
        }
        *mir_module.global_mut(func_globals[&fid]) = MirGlobal::Function(lowered);
    }

    for fid in module.function_ids() {
        if module.function(fid).is_declaration() {
            continue;
        }
        if let MirGlobal::Function(mir_func) = mir_module.global_mut(func_globals[&fid]) {
            target.isel_info().legalize(mir_func, target.register_info())?;
        }
    }

    Ok(mir_module)
}

fn lower_function(
    ctx: &IrContext,
    module: &IrModule,
    fid: FunctionId,
    target: &dyn Target,
    func_globals: &HashMap<FunctionId, MirGlobalId>,
    global_globals: &HashMap<GlobalId, MirGlobalId>,
    data_globals: &mut HashMap<ConstId, MirGlobalId>,
    next_data_id: &mut u32,
) -> SeenResult<(MirFunction, Vec<MirGlobal>)> {
    let f = module.function(fid);
    let mut mir_func = MirFunction::new(f.name.clone(), f.linkage);

    let mut block_map = HashMap::new();
    for b in f.live_block_ids() {
        block_map.insert(b, mir_func.create_block(f.block(b).name.clone()));
    }
    let entry_mir = block_map[&f.entry.expect("lowering a defined function")];

    let mut cx = LoweringCx {
        ir_ctx: ctx,
        ir_module: module,
        mir_func,
        block_map,
        value_map: HashMap::new(),
        cur_block: entry_mir,
        data_globals,
        pending_data: Vec::new(),
        next_data_id,
        func_globals,
        global_globals,
    };

    // Arguments: fixed virtual registers in source order; `FrameInfo` places
    // each at its ABI-defined location during prologue emission.
    for a in f.args() {
        let width = width_of_type(ctx, f.arg_type(a));
        let vreg = cx.mir_func.new_vreg();
        cx.mir_func.args.push(vreg);
        cx.mir_func.arg_widths.push(width);
        cx.value_map.insert(ValueRef::Arg(a), MachineOperand::VirtualReg(vreg, width));
    }

    // Phi placeholders up front (§4.7): a virtual register per phi so a
    // forward use (a loop-carried value, a value defined by a phi in a
    // later-lowered block) resolves even before that phi's own block is
    // lowered.
    for b in f.live_block_ids() {
        for phi in f.phis(b) {
            let width = width_of_type(ctx, f.inst(phi).ty);
            let vreg = cx.new_vreg(width);
            cx.value_map.insert(ValueRef::Inst(phi), vreg);
        }
    }

    let cfg = Cfg::compute(module, fid);
    let order: Vec<BlockId> = if cfg.reverse_postorder.is_empty() {
        f.live_block_ids().collect()
    } else {
        cfg.reverse_postorder.clone()
    };

    for b in order {
        cx.cur_block = cx.block_of(b);
        let insts: Vec<InstId> = f.block(b).insts.clone();
        for inst_id in insts {
            let data = f.inst(inst_id);
            if data.opcode.is_terminator() {
                emit_phi_resolution(f, b, &mut cx);
            }
            lower_instruction(inst_id, data, &mut cx, target)?;
        }
    }

    Ok((cx.mir_func, cx.pending_data))
}

/// Phi resolution (§4.7): right before lowering `block`'s terminator, for
/// each successor with phis, emit a copy from the incoming value (as seen
/// from `block`) into that phi's already-allocated virtual register. This
/// linearises phis into per-predecessor copies, which register allocation
/// later elides when source and destination coincide.
fn emit_phi_resolution(f: &seen_ir::FunctionData, block: BlockId, cx: &mut LoweringCx) {
    for succ in f.successors(block) {
        for phi in f.phis(succ) {
            let Some((value, _)) = f.inst(phi).incoming_pairs().find(|(_, p)| *p == block) else {
                continue;
            };
            let src = cx.lower_value(value);
            let dst = cx.result_of(phi);
            cx.emit(MachineInstruction::with_operands(MachineOpcode::Load, [dst, src]));
        }
    }
}

fn lower_instruction(id: InstId, data: &InstructionData, cx: &mut LoweringCx, target: &dyn Target) -> SeenResult<()> {
    if target.isel_info().try_lower(id, data, cx) {
        return Ok(());
    }
    match &data.opcode {
        Opcode::Phi => {
            // Placeholder already allocated and fed by `emit_phi_resolution`
            // at every predecessor's terminator; the phi itself emits no
            // MIR instruction.
        }
        Opcode::Binary(op) => lower_binary(id, *op, data, cx),
        Opcode::Unary(op) => lower_unary(id, *op, data, cx),
        Opcode::Alloca { elem_ty, count } => lower_alloca(id, *elem_ty, *count, cx),
        Opcode::Load => lower_load(id, data, cx),
        Opcode::Store => lower_store(data, cx),
        Opcode::Gep { elem_ty } => lower_gep(id, *elem_ty, data, cx),
        Opcode::Cast(op) => lower_cast(id, *op, data, cx),
        Opcode::Br => lower_br(data, cx),
        Opcode::CondBr => lower_cond_br(data, cx),
        Opcode::Switch { case_values } => lower_switch(case_values, data, cx),
        Opcode::Ret => lower_ret(data, cx),
        Opcode::Select => lower_select(id, data, cx),
        Opcode::Icmp(_) | Opcode::Fcmp(_) => {
            return Err(SeenError::legalization_impossible(data.opcode.name(), "no target claimed this flags-producing compare"));
        }
        Opcode::Call => lower_call(id, data, cx),
    }
    Ok(())
}

fn binary_opcode(op: seen_ir::BinaryOp) -> MachineOpcode {
    use seen_ir::BinaryOp::*;
    match op {
        Add => MachineOpcode::Add,
        Sub => MachineOpcode::Sub,
        Mul => MachineOpcode::Mul,
        UDiv => MachineOpcode::UDiv,
        URem => MachineOpcode::URem,
        And => MachineOpcode::And,
        Or => MachineOpcode::Or,
        Xor => MachineOpcode::Xor,
        Shl => MachineOpcode::Shl,
        LShr => MachineOpcode::LShr,
        AShr => MachineOpcode::AShr,
        FAdd => MachineOpcode::FAdd,
        FSub => MachineOpcode::FSub,
        FMul => MachineOpcode::FMul,
        FDiv => MachineOpcode::FDiv,
    }
}

fn lower_binary(id: InstId, op: seen_ir::BinaryOp, data: &InstructionData, cx: &mut LoweringCx) {
    let lhs = cx.lower_value(data.operands[0]);
    let rhs = cx.lower_value(data.operands[1]);
    let width = width_of_type(cx.ir_ctx, data.ty);
    let dst = cx.new_vreg(width);
    cx.emit(MachineInstruction::with_operands(binary_opcode(op), [dst, lhs, rhs]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_unary(id: InstId, op: seen_ir::UnaryOp, data: &InstructionData, cx: &mut LoweringCx) {
    use seen_ir::UnaryOp::*;
    let src = cx.lower_value(data.operands[0]);
    let width = width_of_type(cx.ir_ctx, data.ty);
    let dst = cx.new_vreg(width);
    let opcode = match op {
        Neg => MachineOpcode::Neg,
        Not => MachineOpcode::Not,
        FNeg => MachineOpcode::FNeg,
    };
    cx.emit(MachineInstruction::with_operands(opcode, [dst, src]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

/// Allocates the stack slot an `alloca` reserves and materializes its
/// address into a fresh virtual register via the `FrameAddr` pseudo
/// (§3.6/§9: alloca's result is always a pointer value that load/store/gep
/// dereference, never the slot operand directly).
fn lower_alloca(id: InstId, elem_ty: seen_ir::TypeId, count: u32, cx: &mut LoweringCx) {
    let width = width_of_type(cx.ir_ctx, elem_ty);
    let slot = cx.mir_func.new_stack_slot(width, count);
    let dst = cx.new_vreg(OperandWidth::Int64);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::FrameAddr, [dst, MachineOperand::StackObject(slot, width)]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_load(id: InstId, data: &InstructionData, cx: &mut LoweringCx) {
    let ptr = cx.lower_value(data.operands[0]);
    let width = width_of_type(cx.ir_ctx, data.ty);
    let dst = cx.new_vreg(width);
    let mut inst = MachineInstruction::with_operands(MachineOpcode::Load, [dst, ptr]);
    inst.is_memory_access = true;
    cx.emit(inst);
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_store(data: &InstructionData, cx: &mut LoweringCx) {
    let value = cx.lower_value(data.operands[0]);
    let ptr = cx.lower_value(data.operands[1]);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Store, [ptr, value]));
}

/// `gep base, elem_ty, [zero, index]` (the only shape the generator ever
/// builds, per `IrGenerator::visit_array_access`) lowers to
/// `base + index * size_of(elem_ty)`.
fn lower_gep(id: InstId, elem_ty: seen_ir::TypeId, data: &InstructionData, cx: &mut LoweringCx) {
    let base = cx.lower_value(data.operands[0]);
    let index = cx.lower_value(data.operands[2]);
    let elem_size = cx.ir_ctx.size_of(elem_ty).unwrap_or(8) as i64;
    let offset = cx.new_vreg(OperandWidth::Int64);
    cx.emit(MachineInstruction::with_operands(
        MachineOpcode::Mul,
        [offset, index, MachineOperand::Immediate(elem_size, OperandWidth::Int64)],
    ));
    let dst = cx.new_vreg(OperandWidth::Int64);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Add, [dst, base, offset]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_cast(id: InstId, op: seen_ir::CastOp, data: &InstructionData, cx: &mut LoweringCx) {
    use seen_ir::CastOp::*;
    let src = cx.lower_value(data.operands[0]);
    let width = width_of_type(cx.ir_ctx, data.ty);
    let dst = cx.new_vreg(width);
    let opcode = match op {
        ZExt => MachineOpcode::ZExt,
        SExt => MachineOpcode::SExt,
        Trunc => MachineOpcode::Trunc,
        FpToSi => MachineOpcode::FpToSi,
        SiToFp => MachineOpcode::SiToFp,
        UiToFp => MachineOpcode::UiToFp,
        FpToUi => MachineOpcode::FpToUi,
        FpExt => MachineOpcode::FpExt,
        FpTrunc => MachineOpcode::FpTrunc,
    };
    cx.emit(MachineInstruction::with_operands(opcode, [dst, src]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_br(data: &InstructionData, cx: &mut LoweringCx) {
    let target = cx.lower_value(data.operands[0]);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Br, [target]));
}

fn lower_cond_br(data: &InstructionData, cx: &mut LoweringCx) {
    let cond = cx.lower_value(data.operands[0]);
    let if_true = cx.lower_value(data.operands[1]);
    let if_false = cx.lower_value(data.operands[2]);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::CondBr, [cond, if_true, if_false]));
}

fn lower_switch(case_values: &[i64], data: &InstructionData, cx: &mut LoweringCx) {
    let value = cx.lower_value(data.operands[0]);
    let default = cx.lower_value(data.operands[1]);
    let mut operands = vec![value, default];
    for op in &data.operands[2..] {
        operands.push(cx.lower_value(*op));
    }
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Switch { case_values: case_values.to_vec() }, operands));
}

fn lower_ret(data: &InstructionData, cx: &mut LoweringCx) {
    let operands: Vec<MachineOperand> = data.operands.iter().map(|v| cx.lower_value(*v)).collect();
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Ret, operands));
}

fn lower_select(id: InstId, data: &InstructionData, cx: &mut LoweringCx) {
    let cond = cx.lower_value(data.operands[0]);
    let if_true = cx.lower_value(data.operands[1]);
    let if_false = cx.lower_value(data.operands[2]);
    let width = width_of_type(cx.ir_ctx, data.ty);
    let dst = cx.new_vreg(width);
    cx.emit(MachineInstruction::with_operands(MachineOpcode::Select, [dst, cond, if_true, if_false]));
    cx.value_map.insert(ValueRef::Inst(id), dst);
}

fn lower_call(id: InstId, data: &InstructionData, cx: &mut LoweringCx) {
    let callee = cx.lower_value(data.operands[0]);
    let is_void = cx.ir_ctx.get_type(data.ty).is_void();
    let dst = if is_void { None } else { Some(cx.new_vreg(width_of_type(cx.ir_ctx, data.ty))) };

    let mut operands = Vec::with_capacity(data.operands.len() + 1);
    operands.push(dst.unwrap_or(MachineOperand::Unused));
    operands.push(callee);
    for arg in &data.operands[1..] {
        operands.push(cx.lower_value(*arg));
    }
    let mut inst = MachineInstruction::with_operands(MachineOpcode::Call, operands);
    inst.ignore_def_flag = is_void;
    cx.emit(inst);

    if let Some(dst) = dst {
        cx.value_map.insert(ValueRef::Inst(id), dst);
    }
}
