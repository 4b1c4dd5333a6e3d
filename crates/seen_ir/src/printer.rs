//! Textual printer (§4.5, C5, P2). Produces the textual IR grammar defined
//! in §6.2; the format and `NameManager` collision-resolution scheme follow
//! `PrinterBase`/`NameManager` closely enough that reparsing the output
//! reconstructs an IR module in the same shape it started in.

use std::fmt::Write as _;

use hashbrown::HashMap;

use crate::block::BlockId;
use crate::context::Context;
use crate::function::{FunctionData, Linkage};
use crate::instruction::{InstId, InstructionData, Opcode};
use crate::module::{GlobalId, Module};
use crate::types::{IntWidth, IrType, TypeId};
use crate::value::{Constant, ValueRef};

/// Any value that gets a name in printed output: a block (label), an
/// instruction result, an argument, or a global/function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Named {
    Block(BlockId),
    Inst(InstId),
    Arg(u32),
    Global(GlobalId),
    Function(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Global,
    Local,
    None,
}

impl Prefix {
    fn as_str(self) -> &'static str {
        match self {
            Prefix::Global => "@",
            Prefix::Local => "%",
            Prefix::None => "",
        }
    }
}

/// Resolves a stable, collision-free printed name for every value, mirroring
/// the original's two independent namespaces (global vs. local) and its
/// "first collision appends a slot number" scheme.
#[derive(Default)]
struct NameManager {
    global_names: HashMap<Named, String>,
    global_slots: HashMap<String, u32>,
    local_names: HashMap<Named, String>,
    local_slots: HashMap<String, u32>,
}

impl NameManager {
    fn clear_locals(&mut self) {
        self.local_names.clear();
        self.local_slots.clear();
    }

    fn register(&mut self, key: Named, base_name: &str, prefix: Prefix, is_global: bool) -> String {
        let (names, slots) = if is_global {
            (&mut self.global_names, &mut self.global_slots)
        } else {
            (&mut self.local_names, &mut self.local_slots)
        };
        if let Some(existing) = names.get(&key) {
            return existing.clone();
        }
        let prefixed = format!("{}{}", prefix.as_str(), base_name);
        let resolved = if let Some(slot) = slots.get_mut(&prefixed) {
            let n = *slot;
            *slot += 1;
            format!("{}{}", prefixed, n)
        } else {
            slots.insert(prefixed.clone(), 1);
            if prefixed.chars().count() <= 1 {
                format!("{}0", prefixed)
            } else {
                prefixed
            }
        };
        names.insert(key, resolved.clone());
        resolved
    }

    fn block_name(&mut self, func: &FunctionData, id: BlockId) -> String {
        let base = func.block(id).name.clone();
        self.register(Named::Block(id), &base, Prefix::Local, false)
    }

    fn inst_name(&mut self, func: &FunctionData, id: InstId) -> String {
        let base = func.inst(id).name.clone().unwrap_or_default();
        self.register(Named::Inst(id), &base, Prefix::Local, false)
    }

    fn arg_name(&mut self, index: u32, explicit: Option<&str>) -> String {
        let base = explicit.map(str::to_owned).unwrap_or_else(|| index.to_string());
        self.register(Named::Arg(index), &base, Prefix::Local, false)
    }

    fn global_name(&mut self, module: &Module, id: GlobalId) -> String {
        let base = module.global(id).name.clone();
        self.register(Named::Global(id), &base, Prefix::Global, true)
    }

    fn function_name(&mut self, name: &str) -> String {
        self.register(Named::Function(name.to_owned()), name, Prefix::Global, true)
    }
}

pub struct Printer<'a> {
    ctx: &'a Context,
    names: NameManager,
    out: String,
}

impl<'a> Printer<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx, names: NameManager::default(), out: String::new() }
    }

    pub fn print_module(mut self, module: &Module) -> String {
        for id in module.global_ids() {
            self.print_global(module, id);
        }
        for func in &module.functions {
            self.print_function(module, func);
        }
        self.out
    }

    fn print_global(&mut self, module: &Module, id: GlobalId) {
        let g = module.global(id);
        let name = self.names.global_name(module, id);
        if g.initializer.is_none() {
            let _ = write!(self.out, "declare {} ", name);
            self.print_type(g.value_type);
            self.out.push('\n');
            return;
        }
        let linkage = if g.linkage == Linkage::External { "external" } else { "internal" };
        let _ = write!(self.out, "define {} {} ", linkage, name);
        self.print_type(g.value_type);
        self.out.push(' ');
        self.print_constant(g.initializer.unwrap());
        self.out.push('\n');
    }

    fn print_function(&mut self, module: &Module, func: &FunctionData) {
        self.names.clear_locals();
        let name = self.names.function_name(&func.name);
        let ret_ty = func.return_type;
        if func.is_declaration() {
            let _ = write!(self.out, "declare {} ", name);
            self.print_fn_type(ret_ty, &func.param_types);
            self.out.push('\n');
            return;
        }
        let linkage = if func.linkage == Linkage::External { "external" } else { "internal" };
        let _ = write!(self.out, "define {} {} ", linkage, name);
        self.print_type(ret_ty);
        self.out.push('(');
        for (i, ty) in func.param_types.iter().enumerate() {
            self.print_type(*ty);
            let arg_name = self.names.arg_name(i as u32, None);
            let _ = write!(self.out, " {},", arg_name);
        }
        if !func.param_types.is_empty() {
            self.out.pop();
        }
        self.out.push_str(") {\n");
        for block in func.live_block_ids() {
            self.print_block(module, func, block);
        }
        self.out.push_str("}\n");
    }

    fn print_fn_type(&mut self, ret: TypeId, params: &[TypeId]) {
        self.print_type(ret);
        self.out.push('(');
        for ty in params {
            self.print_type(*ty);
            self.out.push(',');
        }
        if !params.is_empty() {
            self.out.pop();
        }
        self.out.push(')');
    }

    fn print_block(&mut self, module: &Module, func: &FunctionData, block: BlockId) {
        let name = self.names.block_name(func, block);
        let _ = writeln!(self.out, "{}:", name);
        for inst in &func.block(block).insts {
            self.print_instruction(module, func, *inst);
        }
    }

    fn print_instruction(&mut self, module: &Module, func: &FunctionData, id: InstId) {
        let inst = func.inst(id);
        if !self.ctx.get_type(inst.ty).is_void() {
            let name = self.names.inst_name(func, id);
            let _ = write!(self.out, "{} = ", name);
        }
        let _ = write!(self.out, "{} ", inst.opcode.name());

        match &inst.opcode {
            Opcode::Alloca { elem_ty, .. } => {
                self.print_type(*elem_ty);
            }
            Opcode::Br => {
                self.print_operand(module, func, inst.operands[0], false);
            }
            Opcode::CondBr => {
                self.print_operand(module, func, inst.operands[0], false);
                self.out.push_str(", ");
                self.print_operand(module, func, inst.operands[1], false);
                self.out.push_str(", ");
                self.print_operand(module, func, inst.operands[2], false);
            }
            Opcode::Phi => {
                self.print_type(inst.ty);
                self.out.push(' ');
                for (value, block) in inst.incoming_pairs() {
                    self.out.push_str("[ ");
                    self.print_operand(module, func, value, false);
                    self.out.push_str(", ");
                    self.print_operand(module, func, ValueRef::Block(block), false);
                    self.out.push_str(" ], ");
                }
                if !inst.operands.is_empty() {
                    self.out.truncate(self.out.len() - 2);
                }
            }
            Opcode::Icmp(pred) | Opcode::Fcmp(pred) => {
                self.out.push_str(pred.mnemonic());
                self.out.push(' ');
                self.print_general_operands(module, func, inst);
            }
            _ if !inst.operands.is_empty() => {
                self.print_general_operands(module, func, inst);
            }
            _ => {}
        }
        self.out.push('\n');
    }

    fn print_general_operands(&mut self, module: &Module, func: &FunctionData, inst: &InstructionData) {
        let print_all_types = matches!(inst.opcode, Opcode::Select | Opcode::Store);
        if matches!(inst.opcode, Opcode::Load) {
            self.print_type(inst.ty);
            self.out.push_str(", ");
        }
        if !print_all_types {
            let first_ty = self.operand_type(module, func, inst.operands[0]);
            if let Some(ty) = first_ty {
                self.print_type(ty);
                self.out.push(' ');
            }
        }
        for op in inst.operands.iter() {
            self.print_operand(module, func, *op, print_all_types);
            self.out.push_str(", ");
        }
        self.out.truncate(self.out.len() - 2);
    }

    fn operand_type(&self, module: &Module, func: &FunctionData, value: ValueRef) -> Option<TypeId> {
        match value {
            ValueRef::Const(c) => self.const_type(c),
            ValueRef::Arg(a) => Some(func.arg_type(a)),
            ValueRef::Inst(i) => Some(func.inst(i).ty),
            ValueRef::Global(g) => Some(module.global(g).value_type),
            ValueRef::Function(_) | ValueRef::Block(_) => None,
        }
    }

    fn const_type(&self, c: crate::value::ConstId) -> Option<TypeId> {
        match self.ctx.get_const(c).clone() {
            Constant::Int(_, width) => self.ctx.find_type(&IrType::Int(width)),
            Constant::Float(_) => self.ctx.find_type(&IrType::Float),
            Constant::String(_) => self.ctx.find_type(&IrType::Pointer),
            Constant::Array(ty, _) => Some(ty),
            Constant::Null(ty) => Some(ty),
        }
    }

    fn print_operand(&mut self, module: &Module, func: &FunctionData, value: ValueRef, print_type: bool) {
        if let ValueRef::Const(c) = value {
            self.print_constant_ref(c);
            return;
        }
        if print_type {
            if let Some(ty) = self.operand_type(module, func, value) {
                self.print_type(ty);
                self.out.push(' ');
            }
        }
        let name = match value {
            ValueRef::Arg(a) => self.names.arg_name(a.index(), None),
            ValueRef::Inst(i) => self.names.inst_name(func, i),
            ValueRef::Block(b) => self.names.block_name(func, b),
            ValueRef::Global(g) => self.names.global_name(module, g),
            ValueRef::Function(f) => self.names.function_name(&module.function(f).name),
            ValueRef::Const(_) => unreachable!(),
        };
        self.out.push_str(&name);
    }

    fn print_constant(&mut self, id: crate::value::ConstId) {
        self.print_constant_ref(id);
    }

    fn print_constant_ref(&mut self, id: crate::value::ConstId) {
        match self.ctx.get_const(id).clone() {
            Constant::Int(v, _) => {
                let _ = write!(self.out, "{}", v);
            }
            Constant::Float(bits) => {
                let _ = write!(self.out, "{}", f64::from_bits(bits));
            }
            Constant::String(bytes) => {
                let _ = write!(self.out, "{}", String::from_utf8_lossy(&bytes));
            }
            Constant::Array(_, elems) => {
                self.out.push('[');
                for e in elems {
                    self.print_constant_ref(e);
                    self.out.push(',');
                }
                self.out.push(']');
            }
            Constant::Null(_) => {
                self.out.push_str("null");
            }
        }
    }

    fn print_type(&mut self, id: TypeId) {
        match self.ctx.get_type(id).clone() {
            IrType::Void => self.out.push_str("void"),
            IrType::Float => self.out.push_str("f64"),
            IrType::Pointer => self.out.push_str("ptr"),
            IrType::Label => self.out.push_str("label"),
            IrType::Int(width) => {
                let token = match width {
                    IntWidth::Bool => "i1",
                    IntWidth::Byte => "i8",
                    IntWidth::Word => "i64",
                };
                self.out.push_str(token);
            }
            IrType::Array(elem, count) => {
                self.print_type(elem);
                let _ = write!(self.out, "[{}]", count);
            }
            IrType::Function(ret, params) => {
                self.print_type(ret);
                self.out.push('(');
                for p in &params {
                    self.print_type(*p);
                    self.out.push(',');
                }
                if !params.is_empty() {
                    self.out.pop();
                }
                self.out.push(')');
            }
            IrType::Struct(fields, name) => {
                let _ = write!(self.out, "struct{}{{", name.map(|n| format!(".{}", n)).unwrap_or_default());
                for f in &fields {
                    self.print_type(*f);
                    self.out.push(',');
                }
                if !fields.is_empty() {
                    self.out.pop();
                }
                self.out.push('}');
            }
        }
    }
}

pub fn print_module(ctx: &Context, module: &Module) -> String {
    Printer::new(ctx).print_module(module)
}
