//! CFG simplification (§4.6), grounded on `SimplifyCFGPass` in
//! `original_source/OlaCompiler/Backend/Custom/IR/Passes/SimplifyCFGPass.h`.
//! Applies four local rewrites to a fixed point: drop unreachable blocks,
//! bypass empty unconditional-branch blocks, fold a constant-condition
//! branch to an unconditional one, and merge a block into its sole
//! predecessor. Processes blocks in reverse postorder with a FIFO worklist
//! (design notes §9 — explicit worklist, not recursion), re-enqueueing any
//! block whose predecessor set changed; termination follows the monotone
//! reduction of `(blocks, instructions, edges)` (P4).

use std::collections::VecDeque;

use seen_common::SeenResult;

use crate::analysis::cfg::Cfg;
use crate::block::BlockId;
use crate::context::Context;
use crate::instruction::Opcode;
use crate::module::{FunctionId, Module};
use crate::pass::{FunctionAnalysis, FunctionAnalysisManager, FunctionPass};
use crate::value::{Constant, ValueRef};

#[derive(Default)]
pub struct SimplifyCfgPass;

impl FunctionPass for SimplifyCfgPass {
    type Analysis = Cfg;

    fn name(&self) -> &'static str {
        "simplify-cfg"
    }

    fn run(&mut self, ctx: &mut Context, module: &mut Module, function: FunctionId, _fam: &mut FunctionAnalysisManager) -> SeenResult<bool> {
        let mut changed_overall = false;
        loop {
            let cfg = Cfg::compute(module, function);
            let mut worklist: VecDeque<BlockId> = cfg.reverse_postorder.iter().copied().collect();
            let mut changed_this_round = false;

            while let Some(block) = worklist.pop_front() {
                if module.function(function).block(block).removed {
                    continue;
                }
                if try_fold_constant_branch(ctx, module, function, block) {
                    changed_this_round = true;
                    continue;
                }
                if try_bypass_empty_block(module, function, block) {
                    changed_this_round = true;
                    continue;
                }
                if try_merge_single_pred(module, function, block) {
                    changed_this_round = true;
                    continue;
                }
            }

            // Unreachable blocks: anything with zero predecessors other
            // than the entry block itself.
            let func = module.function(function);
            let entry = func.entry;
            let dead: Vec<BlockId> = func
                .live_block_ids()
                .filter(|&b| Some(b) != entry && func.predecessors(b).is_empty())
                .collect();
            if !dead.is_empty() {
                let func = module.function_mut(function);
                for b in dead {
                    func.remove_block(b);
                }
                changed_this_round = true;
            }

            if changed_this_round {
                changed_overall = true;
            } else {
                break;
            }
        }
        Ok(changed_overall)
    }
}

/// Rewrites a `br(cond, t, f)` whose condition is a boolean constant into
/// an unconditional `br`, dropping the dead edge (and its phi incoming
/// entries in the dead successor).
fn try_fold_constant_branch(ctx: &mut Context, module: &mut Module, function: FunctionId, block: BlockId) -> bool {
    let func = module.function(function);
    let Some(term) = func.terminator(block) else { return false };
    let inst = func.inst(term);
    if !matches!(inst.opcode, Opcode::CondBr) {
        return false;
    }
    let ValueRef::Const(cid) = inst.operands[0] else { return false };
    let Constant::Int(v, _) = ctx.get_const(cid) else { return false };
    let taken_is_true = *v != 0;
    let if_true = inst.operands[1].as_block().expect("br true target");
    let if_false = inst.operands[2].as_block().expect("br false target");
    let (kept, dropped) = if taken_is_true { (if_true, if_false) } else { (if_false, if_true) };

    let func = module.function_mut(function);
    func.destroy_instruction(term);
    let mut b = crate::builder::IrBuilder::at_end(func, block);
    b.br(kept, ctx);
    remove_phi_incoming(module.function_mut(function), dropped, block);
    true
}

/// A block whose only instruction is an unconditional `br t` is bypassed:
/// every predecessor's terminator operand pointing at it is redirected to
/// `t`, and `t`'s phis gain the predecessor in place of this block.
fn try_bypass_empty_block(module: &mut Module, function: FunctionId, block: BlockId) -> bool {
    let func = module.function(function);
    if Some(block) == func.entry {
        return false;
    }
    let insts = &func.block(block).insts;
    if insts.len() != 1 {
        return false;
    }
    let only = insts[0];
    if !matches!(func.inst(only).opcode, Opcode::Br) {
        return false;
    }
    let target = func.inst(only).operands[0].as_block().expect("br target");
    if target == block {
        return false;
    }
    let preds = func.predecessors(block);
    if preds.is_empty() {
        return false;
    }

    let func = module.function_mut(function);
    for pred in &preds {
        redirect_terminator(func, *pred, block, target);
        retarget_phi_incoming(func, target, block, *pred);
    }
    func.remove_block(block);
    true
}

/// If `block` has a single predecessor `p` ending in an unconditional
/// `br block`, and no other block branches to it, folds `block`'s
/// instructions into `p` (any phi in `block` can only have one incoming
/// pair, from `p`, so it is resolved directly by use-replacement).
fn try_merge_single_pred(module: &mut Module, function: FunctionId, block: BlockId) -> bool {
    let func = module.function(function);
    if Some(block) == func.entry {
        return false;
    }
    let preds = func.predecessors(block);
    if preds.len() != 1 {
        return false;
    }
    let pred = preds[0];
    let Some(pred_term) = func.terminator(pred) else { return false };
    if !matches!(func.inst(pred_term).opcode, Opcode::Br) {
        return false;
    }

    let func = module.function_mut(function);
    func.destroy_instruction(pred_term);

    let insts: Vec<_> = func.block(block).insts.clone();
    for inst_id in insts {
        if func.inst(inst_id).opcode.is_phi() {
            let (value, _) = func.inst(inst_id).incoming_pairs().next().expect("single-pred phi has one incoming");
            func.replace_all_uses_with(ValueRef::Inst(inst_id), value);
            func.destroy_instruction(inst_id);
            continue;
        }
        func.detach_instruction(inst_id);
        func.inst_mut(inst_id).block = pred;
        func.block_mut(pred).insts.push(inst_id);
    }

    if let Some(new_term) = func.terminator(pred) {
        let succs: Vec<BlockId> = func
            .inst(new_term)
            .operands
            .iter()
            .filter_map(|op| op.as_block())
            .collect();
        for succ in succs {
            retarget_phi_incoming(func, succ, block, pred);
        }
    }

    func.remove_block(block);
    true
}

fn redirect_terminator(func: &mut crate::function::FunctionData, block: BlockId, from: BlockId, to: BlockId) {
    let Some(term) = func.terminator(block) else { return };
    let n = func.inst(term).operands.len();
    for slot in 0..n {
        if func.inst(term).operands[slot] == ValueRef::Block(from) {
            func.set_operand(term, slot, ValueRef::Block(to));
        }
    }
}

/// Replaces `old_pred` with `new_pred` in every phi of `block`'s incoming
/// list (used when a predecessor's edge is retargeted through a bypassed
/// empty block rather than removed outright).
fn retarget_phi_incoming(func: &mut crate::function::FunctionData, block: BlockId, old_pred: BlockId, new_pred: BlockId) {
    for phi in func.phis(block).collect::<Vec<_>>() {
        let n = func.inst(phi).operands.len();
        for slot in (1..n).step_by(2) {
            if func.inst(phi).operands[slot] == ValueRef::Block(old_pred) {
                func.set_operand(phi, slot, ValueRef::Block(new_pred));
            }
        }
    }
}

/// Drops every incoming pair in `block`'s phis whose predecessor is
/// `removed_pred` (used when a dead edge into `block` is dropped).
fn remove_phi_incoming(func: &mut crate::function::FunctionData, block: BlockId, removed_pred: BlockId) {
    for phi in func.phis(block).collect::<Vec<_>>() {
        let pairs: Vec<(ValueRef, BlockId)> = func.inst(phi).incoming_pairs().collect();
        let mut new_operands = crate::instruction::OperandList::new();
        for (v, b) in pairs.into_iter().filter(|(_, p)| *p != removed_pred) {
            new_operands.push(v);
            new_operands.push(ValueRef::Block(b));
        }
        func.set_operands(phi, new_operands);
    }
}
