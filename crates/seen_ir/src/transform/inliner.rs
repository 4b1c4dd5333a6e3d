//! Function inlining (§4.5), grounded on `FunctionInlinerPass` in
//! `original_source/OlaCompiler/Backend/Custom/IR/Passes/FunctionInlinerPass.cpp`.
//! Unlike the original (which naively calls `ReplaceAllUsesWith` once per
//! `ret` it encounters, so only the first return value "wins" on a
//! multi-return callee), a caller whose callee returns from more than one
//! block gets a real merge phi in the continuation block — see the
//! multi-return case in [`inline_call`].

use hashbrown::HashMap;

use seen_common::SeenResult;

use crate::block::BlockId;
use crate::builder::IrBuilder;
use crate::context::Context;
use crate::function::{ArgId, FunctionData};
use crate::instruction::{InstId, InstructionData, Opcode, OperandList};
use crate::module::{FunctionId, Module};
use crate::pass::{FunctionAnalysisManager, FunctionPass};
use crate::value::ValueRef;

/// Callees with more live blocks than this are left uninlined (§4.5: "a
/// heuristic threshold, e.g. <= 5 blocks for a first cut").
const MAX_INLINE_BLOCKS: usize = 5;

#[derive(Default)]
pub struct FunctionInlinerPass;

impl FunctionPass for FunctionInlinerPass {
    type Analysis = ();

    fn name(&self) -> &'static str {
        "inline"
    }

    fn run(&mut self, ctx: &mut Context, module: &mut Module, function: FunctionId, _fam: &mut FunctionAnalysisManager) -> SeenResult<bool> {
        let mut changed = false;
        let call_ids: Vec<InstId> = module
            .function(function)
            .live_block_ids()
            .flat_map(|b| module.function(function).block(b).insts.clone())
            .filter(|&id| matches!(module.function(function).inst(id).opcode, Opcode::Call))
            .collect();
        for call_id in call_ids {
            if inline_call(ctx, module, function, call_id) {
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Maps a value through the callee-to-caller value map (arguments and
/// cloned instructions) or a block through the block map (cloned blocks).
/// Anything absent from both maps (a constant, a global, an unrelated
/// function reference) passes through unchanged.
fn remap(value_map: &HashMap<ValueRef, ValueRef>, block_map: &HashMap<BlockId, BlockId>, value: ValueRef) -> ValueRef {
    match value {
        ValueRef::Block(b) => block_map.get(&b).map(|nb| ValueRef::Block(*nb)).unwrap_or(value),
        other => value_map.get(&other).copied().unwrap_or(other),
    }
}

/// Attempts to inline the callee of `call_id` into `function` at that call
/// site. Refuses (returns `false`, unchanged) on a declaration, a recursive
/// call, or a callee with more than [`MAX_INLINE_BLOCKS`] live blocks.
fn inline_call(ctx: &mut Context, module: &mut Module, function: FunctionId, call_id: InstId) -> bool {
    let (call_block, callee_id, args, ret_ty) = {
        let func = module.function(function);
        let inst = func.inst(call_id);
        if !matches!(inst.opcode, Opcode::Call) {
            return false;
        }
        let Some(callee_id) = inst.operands[0].as_function() else { return false };
        (inst.block, callee_id, inst.operands[1..].to_vec(), inst.ty)
    };
    if callee_id == function {
        return false;
    }
    let callee_snapshot = module.function(callee_id).clone();
    if callee_snapshot.is_declaration() {
        return false;
    }
    if callee_snapshot.live_block_ids().count() > MAX_INLINE_BLOCKS {
        return false;
    }

    let void_ty = ctx.void_type();
    let is_void_return = ret_ty == void_ty;

    let func = module.function_mut(function);
    let caller_entry = func.entry.expect("caller has a body");

    // 1. One fresh caller block per live callee block.
    let mut block_map: HashMap<BlockId, BlockId> = HashMap::new();
    for cb in callee_snapshot.live_block_ids() {
        let name = format!("{}.inlined", callee_snapshot.block(cb).name);
        block_map.insert(cb, func.create_block(name));
    }

    // 2. Value map seeded from arguments.
    let mut value_map: HashMap<ValueRef, ValueRef> = HashMap::new();
    for (i, arg) in args.iter().enumerate() {
        value_map.insert(ValueRef::Arg(ArgId(i as u32)), *arg);
    }

    // 3. Clone every non-`ret` instruction with placeholder operands first,
    // so a phi can reference a value defined later in iteration order (a
    // loop-carried value, say) before operands are fixed up in pass two.
    // `alloca`s are hoisted to the caller's entry block (§9: every alloca
    // precedes every other instruction there).
    let mut ret_blocks: Vec<BlockId> = Vec::new();
    for cb in callee_snapshot.live_block_ids() {
        let new_block = block_map[&cb];
        for &old_inst in &callee_snapshot.block(cb).insts {
            let data = callee_snapshot.inst(old_inst);
            if matches!(data.opcode, Opcode::Ret) {
                ret_blocks.push(new_block);
                continue;
            }
            let new_id = if data.opcode.is_alloca() {
                let idx = func.entry_alloca_insertion_point();
                let new_data = InstructionData {
                    opcode: data.opcode.clone(),
                    ty: data.ty,
                    operands: OperandList::new(),
                    block: caller_entry,
                    name: data.name.clone(),
                };
                func.insert_instruction_at(caller_entry, idx, new_data)
            } else {
                let new_data = InstructionData {
                    opcode: data.opcode.clone(),
                    ty: data.ty,
                    operands: OperandList::new(),
                    block: new_block,
                    name: data.name.clone(),
                };
                func.push_instruction(new_block, new_data)
            };
            value_map.insert(ValueRef::Inst(old_inst), ValueRef::Inst(new_id));
        }
    }

    // 4. Second pass: now that every cloned instruction has an id, fix up
    // operands (remapped through value_map/block_map) and collect the
    // value each `ret` would have returned.
    let mut return_values: Vec<(ValueRef, BlockId)> = Vec::new();
    for cb in callee_snapshot.live_block_ids() {
        let new_block = block_map[&cb];
        for &old_inst in &callee_snapshot.block(cb).insts {
            let data = callee_snapshot.inst(old_inst);
            if matches!(data.opcode, Opcode::Ret) {
                if let Some(&v) = data.operands.first() {
                    return_values.push((remap(&value_map, &block_map, v), new_block));
                }
                continue;
            }
            if data.opcode.is_alloca() {
                continue;
            }
            let new_id = value_map[&ValueRef::Inst(old_inst)].as_inst().expect("mapped instruction");
            let remapped: OperandList = data.operands.iter().map(|op| remap(&value_map, &block_map, *op)).collect();
            func.set_operands(new_id, remapped);
        }
    }

    let inlined_entry = block_map[&callee_snapshot.entry.expect("callee has a body")];

    // 5. Split the call's block at the call: the first half (still
    // `call_block`) branches to the cloned entry, the second half
    // (`remainder`) becomes the join target every inlined `ret` returns to.
    let remainder = func.split_block(call_block, call_id, format!("{}.cont", callee_snapshot.name));

    let merged_value: Option<ValueRef> = if is_void_return {
        None
    } else {
        match return_values.len() {
            0 => None,
            1 => Some(return_values[0].0),
            _ => {
                let mut operands = OperandList::new();
                for (v, b) in &return_values {
                    operands.push(*v);
                    operands.push(ValueRef::Block(*b));
                }
                let phi_data = InstructionData { opcode: Opcode::Phi, ty: ret_ty, operands, block: remainder, name: None };
                Some(ValueRef::Inst(func.insert_instruction_at(remainder, 0, phi_data)))
            }
        }
    };

    if let Some(v) = merged_value {
        func.replace_all_uses_with(ValueRef::Inst(call_id), v);
    }
    func.destroy_instruction(call_id);

    IrBuilder::at_end(func, call_block).br(inlined_entry, ctx);
    for rb in ret_blocks {
        IrBuilder::at_end(func, rb).br(remainder, ctx);
    }

    // 6. Any phi in a successor of `remainder` that still names the
    // original, now-shrunk `call_block` as its predecessor must instead
    // name `remainder`, since that's the block whose terminator actually
    // reaches it now.
    retarget_successor_phis(func, remainder, call_block);

    true
}

fn retarget_successor_phis(func: &mut FunctionData, remainder: BlockId, old_pred: BlockId) {
    let succs: Vec<BlockId> = func.successors(remainder).into_iter().collect();
    for succ in succs {
        for phi in func.phis(succ).collect::<Vec<_>>() {
            let n = func.inst(phi).operands.len();
            for slot in (1..n).step_by(2) {
                if func.inst(phi).operands[slot] == ValueRef::Block(old_pred) {
                    func.set_operand(phi, slot, ValueRef::Block(remainder));
                }
            }
        }
    }
}
