//! AT&T-syntax assembly emission (§4.10, C11), grounded in spec.md's
//! description of `AsmPrinter` as "a per-opcode formatter" walking the
//! already-allocated `MirModule` in definition order. Two sections:
//! `.data`/`.bss` for globals, `.text` for functions, one label per
//! function and per basic block.

use seen_codegen::{AsmPrinter, MachineInstruction, MachineOpcode, MachineOperand, MirFunction, MirGlobal, MirModule, OperandWidth, RegisterInfo};
use seen_ir::Linkage;

use crate::frame::X64FrameInfo;
use crate::registers::register_name;

#[derive(Debug, Default)]
pub struct X64AsmPrinter;

impl AsmPrinter for X64AsmPrinter {
    fn print_module(&self, module: &MirModule, reg_info: &dyn RegisterInfo) -> String {
        let mut out = String::new();

        for global in module.globals() {
            if let MirGlobal::Function(f) = global {
                if f.linkage == Linkage::External && !f.is_declaration() {
                    out.push_str(&format!(".globl {}\n", f.name));
                }
            }
        }

        print_data_section(module, &mut out);
        print_bss_section(module, &mut out);
        print_text_section(module, reg_info, &mut out);

        out
    }
}

fn print_data_section(module: &MirModule, out: &mut String) {
    let globals: Vec<_> = module.globals().filter_map(|g| match g {
        MirGlobal::Data(d) => Some(d),
        _ => None,
    }).collect();
    if globals.is_empty() {
        return;
    }
    out.push_str(".data\n");
    for data in globals {
        out.push_str(&format!(".align {}\n{}:\n", data.align, data.name));
        for byte in &data.bytes {
            out.push_str(&format!("\t.byte {}\n", byte));
        }
    }
}

fn print_bss_section(module: &MirModule, out: &mut String) {
    let globals: Vec<_> = module.globals().filter_map(|g| match g {
        MirGlobal::Zero(z) => Some(z),
        _ => None,
    }).collect();
    if globals.is_empty() {
        return;
    }
    out.push_str(".bss\n");
    for zero in globals {
        out.push_str(&format!(".align {}\n{}:\n\t.zero {}\n", zero.align, zero.name, zero.size));
    }
}

fn print_text_section(module: &MirModule, reg_info: &dyn RegisterInfo, out: &mut String) {
    let functions: Vec<_> = module.globals().filter_map(|g| match g {
        MirGlobal::Function(f) if !f.is_declaration() => Some(f),
        _ => None,
    }).collect();
    if functions.is_empty() {
        return;
    }
    out.push_str(".text\n");
    for func in functions {
        print_function(func, module, reg_info, out);
    }
}

fn frame_layout(func: &MirFunction) -> (Vec<i64>, u64) {
    let mut offsets = Vec::with_capacity(func.stack_slots().len());
    let mut size: i64 = 0;
    for slot in func.stack_slots() {
        size += slot.width.bytes() as i64 * slot.count as i64;
        offsets.push(-size);
    }
    let align = 8i64;
    let rounded = ((size + align - 1) / align) * align;
    (offsets, rounded as u64)
}

fn print_function(func: &MirFunction, module: &MirModule, reg_info: &dyn RegisterInfo, out: &mut String) {
    let (offsets, frame_size) = frame_layout(func);
    let frame = X64FrameInfo;
    let frame_info: &dyn seen_codegen::FrameInfo = &frame;

    out.push_str(&format!("{}:\n", func.name));
    out.push_str("\tpushq %rbp\n");
    for inst in frame_info.emit_prologue(func, frame_size) {
        print_instruction(&inst, &offsets, module, reg_info, out);
    }

    for (idx, block) in func.blocks.iter().enumerate() {
        out.push_str(&format!(".L{}_{}:\n", func.name, idx));
        for inst in &block.insts {
            if matches!(inst.opcode, MachineOpcode::Ret) {
                for epi in frame_info.emit_epilogue(func, frame_size) {
                    print_instruction(&epi, &offsets, module, reg_info, out);
                }
                out.push_str("\tpopq %rbp\n");
            }
            print_instruction(inst, &offsets, module, reg_info, out);
        }
    }
}

fn suffix(width: OperandWidth) -> &'static str {
    match width.bytes() {
        1 => "b",
        2 => "w",
        4 => "l",
        _ => "q",
    }
}

/// `as_address` selects between a `symbol(%rip)` memory reference (when the
/// operand is the location a `load`/`store`/`call` addresses) and a bare
/// `$symbol` absolute reference (when it is used as a plain value) — the
/// same relocable global reads differently depending on where it sits in
/// the instruction, not on its own shape.
/// A register holding a runtime-computed pointer (the result of an
/// `alloca`/`gep` chain) reads as a memory operand only through explicit
/// indirection; a stack slot or `%rip`-relative global is already a memory
/// reference in its own printed form.
fn fmt_address(op: MachineOperand, module: &MirModule, offsets: &[i64]) -> String {
    match op {
        MachineOperand::IsaReg(r, w) => format!("({})", register_name(r, w)),
        other => fmt_operand(other, module, offsets, true),
    }
}

fn fmt_operand(op: MachineOperand, module: &MirModule, offsets: &[i64], as_address: bool) -> String {
    match op {
        MachineOperand::IsaReg(r, w) => register_name(r, w),
        MachineOperand::VirtualReg(r, _) => format!("%v{}", r.0),
        MachineOperand::StackObject(slot, _) => format!("{}(%rbp)", offsets.get(slot.0 as usize).copied().unwrap_or(0)),
        MachineOperand::Immediate(v, _) => format!("${}", v),
        MachineOperand::Relocable(id, _) => {
            let name = module.global(id).name();
            if as_address {
                format!("{}(%rip)", name)
            } else {
                format!("${}", name)
            }
        }
        MachineOperand::Block(b) => format!(".L{}", b.0),
        MachineOperand::Unused => String::new(),
    }
}

fn print_instruction(inst: &MachineInstruction, offsets: &[i64], module: &MirModule, reg_info: &dyn RegisterInfo, out: &mut String) {
    let _ = reg_info;
    let w = inst.operands.first().map(|o| o.width()).unwrap_or(OperandWidth::Int64);
    match &inst.opcode {
        MachineOpcode::Load => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            let src = if inst.is_memory_access {
                fmt_address(inst.operand(1), module, offsets)
            } else {
                fmt_operand(inst.operand(1), module, offsets, false)
            };
            out.push_str(&format!("\tmov{} {}, {}\n", suffix(w), src, dst));
        }
        MachineOpcode::Store => {
            let dst = fmt_address(inst.operand(0), module, offsets);
            let src = fmt_operand(inst.operand(1), module, offsets, false);
            out.push_str(&format!("\tmov{} {}, {}\n", suffix(w), src, dst));
        }
        MachineOpcode::FrameAddr => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            let src = fmt_operand(inst.operand(1), module, offsets, true);
            out.push_str(&format!("\tleaq {}, {}\n", src, dst));
        }
        MachineOpcode::Add | MachineOpcode::Sub | MachineOpcode::Shl | MachineOpcode::AShr if inst.ignore_def_flag => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            let src = fmt_operand(inst.operand(1), module, offsets, false);
            out.push_str(&format!("\t{}{} {}, {}\n", inst.opcode.mnemonic(), suffix(w), src, dst));
        }
        MachineOpcode::Neg | MachineOpcode::Not if inst.ignore_def_flag => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            out.push_str(&format!("\t{}{} {}\n", inst.opcode.mnemonic(), suffix(w), dst));
        }
        MachineOpcode::FNeg if inst.ignore_def_flag => {
            // No packed sign-mask constant is materialized for a single
            // scalar xorpd, so negate via 0.0 - dst in the reserved FP
            // scratch (%xmm15, see registers.rs) and copy the result back.
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            out.push_str(&format!("\tpxor %xmm15, %xmm15\n\tsubsd {0}, %xmm15\n\tmovsd %xmm15, {0}\n", dst));
        }
        MachineOpcode::Cmp(_) => {
            let lhs = fmt_operand(inst.operand(0), module, offsets, false);
            let rhs = fmt_operand(inst.operand(1), module, offsets, false);
            out.push_str(&format!("\tcmp{} {}, {}\n", suffix(w), rhs, lhs));
        }
        MachineOpcode::SetCc(pred) => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            out.push_str(&format!("\tset{} {}\n", cc_suffix(*pred), dst));
        }
        MachineOpcode::Br => {
            let target = fmt_operand(inst.operand(0), module, offsets, false);
            out.push_str(&format!("\tjmp {}\n", target));
        }
        MachineOpcode::CondBr => {
            let cond = fmt_operand(inst.operand(0), module, offsets, false);
            let if_true = fmt_operand(inst.operand(1), module, offsets, false);
            let if_false = fmt_operand(inst.operand(2), module, offsets, false);
            out.push_str(&format!("\ttest{} {}, {}\n\tjnz {}\n\tjmp {}\n", suffix(w), cond, cond, if_true, if_false));
        }
        MachineOpcode::Switch { case_values } => {
            let value = fmt_operand(inst.operand(0), module, offsets, false);
            let default = fmt_operand(inst.operand(1), module, offsets, false);
            for (i, case) in case_values.iter().enumerate() {
                let target = fmt_operand(inst.operand(2 + i), module, offsets, false);
                out.push_str(&format!("\tcmp{} ${}, {}\n\tje {}\n", suffix(w), case, value, target));
            }
            out.push_str(&format!("\tjmp {}\n", default));
        }
        MachineOpcode::Call => {
            let callee = fmt_operand(inst.operand(1), module, offsets, false);
            out.push_str(&format!("\tcall {}\n", callee.trim_start_matches('$')));
        }
        MachineOpcode::Ret => {
            out.push_str("\tret\n");
        }
        MachineOpcode::Select => {
            let dst = fmt_operand(inst.operand(0), module, offsets, false);
            let cond = fmt_operand(inst.operand(1), module, offsets, false);
            let if_true = fmt_operand(inst.operand(2), module, offsets, false);
            let if_false = fmt_operand(inst.operand(3), module, offsets, false);
            out.push_str(&format!("\ttest{0} {1}, {1}\n\tcmovz {3}, {4}\n\tcmovnz {2}, {4}\n", suffix(w), cond, if_true, if_false, dst));
        }
        // Three-operand forms (`mul`/`and`/`or`/`xor`/`udiv`/`urem`/float
        // arithmetic/`lshr`) have no two-operand legalization rule in
        // scope (mirroring the original `x64TargetISelInfo::LegalizeInstruction`,
        // which likewise only rewrites add/sub/shl/ashr) — printed as a
        // readable three-operand pseudo-mnemonic rather than a validated
        // single hardware instruction.
        other => {
            let rendered: Vec<String> = inst.operands.iter().map(|o| fmt_operand(*o, module, offsets, false)).collect();
            out.push_str(&format!("\t{}{} {}\n", other.mnemonic(), suffix(w), rendered.join(", ")));
        }
    }
}

fn cc_suffix(pred: seen_ir::Predicate) -> &'static str {
    use seen_ir::Predicate::*;
    match pred {
        Eq => "e",
        Ne => "ne",
        Lt => "l",
        Le => "le",
        Gt => "g",
        Ge => "ge",
    }
}
