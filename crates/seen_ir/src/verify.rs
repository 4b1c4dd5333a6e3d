//! Invariant checker for IR1–IR6 (§3.4, P1). Runs as a cheap validation pass
//! over a function: debug builds call it after every transform; release
//! builds may sample it (§7 — "invariant checks are always on in debug
//! configurations and may be sampled in release"). Violations are surfaced
//! as `SeenError::MalformedIr`, naming the offending function and block as
//! the error-handling design requires.

use hashbrown::HashSet;

use seen_common::{SeenError, SeenResult};

use crate::analysis::dominance::DominatorTree;
use crate::analysis::cfg::Cfg;
use crate::context::Context;
use crate::function::FunctionData;
use crate::instruction::{InstId, Opcode};
use crate::module::{FunctionId, Module};
use crate::pass::FunctionAnalysis;
use crate::types::IrType;
use crate::value::{Constant, ValueRef};

/// Resolves the IR type of any value reachable from within `func`,
/// mirroring the printer's `operand_type` but usable outside printing.
fn value_type(ctx: &Context, module: &Module, func: &FunctionData, value: ValueRef) -> Option<crate::types::TypeId> {
    match value {
        ValueRef::Const(c) => match ctx.get_const(c) {
            Constant::Int(_, width) => ctx.find_type(&IrType::Int(*width)),
            Constant::Float(_) => ctx.find_type(&IrType::Float),
            Constant::String(_) => ctx.find_type(&IrType::Pointer),
            Constant::Array(ty, _) => Some(*ty),
            Constant::Null(ty) => Some(*ty),
        },
        ValueRef::Arg(a) => Some(func.arg_type(a)),
        ValueRef::Inst(i) => Some(func.inst(i).ty),
        ValueRef::Global(g) => Some(module.global(g).value_type),
        ValueRef::Function(_) | ValueRef::Block(_) => None,
    }
}

fn fail(func: &FunctionData, block: &str, message: impl Into<String>) -> SeenError {
    SeenError::malformed_ir(func.name.clone(), block.to_string(), message.into())
}

/// Checks IR1–IR6 over one function and every instruction in it. Returns
/// the first violation found; the checker does not try to accumulate a
/// complete diagnostic list (§7: a malformed-IR error is fatal to the pass
/// that would operate on it, so the first one found already short-circuits
/// the pipeline).
pub fn verify_function(ctx: &Context, module: &Module, function: FunctionId) -> SeenResult<()> {
    let func = module.function(function);
    if func.is_declaration() {
        return Ok(());
    }

    check_block_names_unique(func)?;
    check_allocas(func)?;

    for block in func.live_block_ids() {
        check_terminator(func, block)?;
        check_phi_placement(func, block)?;
    }

    let dom = DominatorTree::compute(module, function);
    let cfg = Cfg::compute(module, function);
    for block in func.live_block_ids() {
        for &inst in &func.block(block).insts {
            check_operand_types(ctx, module, func, inst)?;
            check_dominance(func, &dom, &cfg, block, inst)?;
        }
    }
    Ok(())
}

pub fn verify_module(ctx: &Context, module: &Module) -> SeenResult<()> {
    for function in module.function_ids() {
        verify_function(ctx, module, function)?;
    }
    Ok(())
}

/// IR5 (block half): block names are unique within a function. (Global
/// name uniqueness is enforced on construction by `Module::declare_function`
/// / `declare_global`'s name tables and needs no runtime check here.)
fn check_block_names_unique(func: &FunctionData) -> SeenResult<()> {
    let mut seen = HashSet::new();
    for block in func.live_block_ids() {
        let name = &func.block(block).name;
        if !seen.insert(name.clone()) {
            return Err(fail(func, name, format!("duplicate block name '{}'", name)));
        }
    }
    Ok(())
}

/// Hard invariant (design notes §9): every `alloca` in the entry block
/// precedes the first non-alloca, non-phi instruction.
fn check_allocas(func: &FunctionData) -> SeenResult<()> {
    if !func.allocas_well_placed() {
        let entry_name = func.entry.map(|e| func.block(e).name.clone()).unwrap_or_default();
        return Err(fail(func, &entry_name, "alloca instructions must precede all other instructions in the entry block"));
    }
    Ok(())
}

/// IR3: exactly one terminator, as the block's last instruction.
fn check_terminator(func: &FunctionData, block: crate::block::BlockId) -> SeenResult<()> {
    let name = func.block(block).name.clone();
    let insts = &func.block(block).insts;
    let terminator_positions: Vec<usize> = insts
        .iter()
        .enumerate()
        .filter(|(_, id)| func.inst(**id).opcode.is_terminator())
        .map(|(i, _)| i)
        .collect();
    match terminator_positions.as_slice() {
        [] => Err(fail(func, &name, "block has no terminator")),
        [pos] if *pos == insts.len() - 1 => Ok(()),
        [_] => Err(fail(func, &name, "terminator is not the block's last instruction")),
        _ => Err(fail(func, &name, "block has more than one terminator")),
    }
}

/// IR2: every phi precedes every non-phi instruction in its block.
fn check_phi_placement(func: &FunctionData, block: crate::block::BlockId) -> SeenResult<()> {
    if !func.phis_well_placed(block) {
        let name = func.block(block).name.clone();
        return Err(fail(func, &name, "phi instructions must precede all non-phi instructions in their block"));
    }
    Ok(())
}

/// IR4: operand types match opcode signature.
fn check_operand_types(ctx: &Context, module: &Module, func: &FunctionData, id: InstId) -> SeenResult<()> {
    let inst = func.inst(id);
    let block_name = func.block(inst.block).name.clone();
    let ty_of = |v: ValueRef| value_type(ctx, module, func, v);

    match &inst.opcode {
        Opcode::Binary(op) => {
            let (lhs, rhs) = (ty_of(inst.operands[0]), ty_of(inst.operands[1]));
            if lhs != rhs {
                return Err(fail(func, &block_name, format!("{} operands have mismatched types", op.mnemonic())));
            }
        }
        Opcode::Icmp(_) | Opcode::Fcmp(_) => {
            let (lhs, rhs) = (ty_of(inst.operands[0]), ty_of(inst.operands[1]));
            if lhs != rhs {
                return Err(fail(func, &block_name, "compare operands have mismatched types"));
            }
            if !ctx.get_type(inst.ty).is_bool() {
                return Err(fail(func, &block_name, "compare result must be i1"));
            }
        }
        Opcode::CondBr => {
            if let Some(cond_ty) = ty_of(inst.operands[0]) {
                if !ctx.get_type(cond_ty).is_bool() {
                    return Err(fail(func, &block_name, "br condition must be i1"));
                }
            }
        }
        Opcode::Phi => {
            for (value, _) in inst.incoming_pairs() {
                if let Some(vty) = ty_of(value) {
                    if vty != inst.ty {
                        return Err(fail(func, &block_name, "phi incoming value type does not match result type"));
                    }
                }
            }
        }
        Opcode::Store => {
            // operands: [value, ptr]; ptr must actually be pointer-typed.
            if let Some(ptr_ty) = ty_of(inst.operands[1]) {
                if !matches!(ctx.get_type(ptr_ty), IrType::Pointer) {
                    return Err(fail(func, &block_name, "store target is not a pointer"));
                }
            }
        }
        Opcode::Load => {
            if let Some(ptr_ty) = ty_of(inst.operands[0]) {
                if !matches!(ctx.get_type(ptr_ty), IrType::Pointer) {
                    return Err(fail(func, &block_name, "load source is not a pointer"));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// IR1: every use of an instruction value is dominated by its definition.
fn check_dominance(
    func: &FunctionData,
    dom: &DominatorTree,
    cfg: &Cfg,
    def_block: crate::block::BlockId,
    def: InstId,
) -> SeenResult<()> {
    if !cfg.is_reachable(def_block) {
        return Ok(());
    }
    let value = ValueRef::Inst(def);
    for u in func.uses_of(value) {
        let user = func.inst(u.user);
        let user_block = user.block;
        if user.opcode.is_phi() {
            // The relevant point is the end of the predecessor block the
            // incoming value is associated with, not the phi's own block.
            let pred = user.incoming_pairs().nth(u.slot / 2).map(|(_, b)| b);
            if let Some(pred) = pred {
                if !(dom.dominates(def_block, pred) || def_block == pred) {
                    let name = func.block(def_block).name.clone();
                    return Err(fail(func, &name, "phi incoming value is not defined on every path from its predecessor"));
                }
            }
            continue;
        }
        if user_block == def_block {
            let insts = &func.block(def_block).insts;
            let def_pos = insts.iter().position(|i| *i == def);
            let use_pos = insts.iter().position(|i| *i == u.user);
            if let (Some(dp), Some(up)) = (def_pos, use_pos) {
                if dp > up {
                    let name = func.block(def_block).name.clone();
                    return Err(fail(func, &name, "use precedes its definition in the same block"));
                }
            }
        } else if !dom.dominates(def_block, user_block) {
            let name = func.block(def_block).name.clone();
            return Err(fail(func, &name, "use is not dominated by its definition"));
        }
    }
    Ok(())
}
