//! Target-independent lowering to MIR (§4.7, C8): phi placeholders resolve
//! forward uses, every instruction goes through `try_lower` before the
//! generic fallback, and a genuine memory access is distinguished from the
//! legalizer/phi-resolution copy pseudo sharing its opcode.

use seen_codegen::{
    lower_module, width_of_type, AsmPrinter, DataLayout, FrameInfo, ISelInfo, InstInfo,
    MachineInstruction, MachineOpcode, MirFunction, MirGlobal, MirModule, OperandWidth,
    RegisterInfo, Target,
};
use seen_ir::{
    builder::IrBuilder, function::Linkage, instruction::{BinaryOp, Predicate},
    module::Module, types::IntWidth, value::ValueRef, Context,
};

#[derive(Default)]
struct NullTarget {
    data_layout: NullDataLayout,
    register_info: NullRegisterInfo,
    inst_info: NullInstInfo,
    frame_info: NullFrameInfo,
    isel_info: NullIselInfo,
    asm_printer: NullAsmPrinter,
}

#[derive(Default)]
struct NullDataLayout;
impl DataLayout for NullDataLayout {
    fn is_little_endian(&self) -> bool {
        true
    }
    fn pointer_size(&self) -> u64 {
        8
    }
    fn storage_align(&self) -> u64 {
        8
    }
    fn code_align(&self) -> u64 {
        16
    }
}

#[derive(Default)]
struct NullRegisterInfo;
impl RegisterInfo for NullRegisterInfo {
    fn gp_registers(&self) -> &[u32] {
        &[0, 1, 2, 3]
    }
    fn fp_registers(&self) -> &[u32] {
        &[16, 17]
    }
    fn stack_pointer(&self) -> u32 {
        14
    }
    fn frame_pointer(&self) -> u32 {
        15
    }
    fn return_register(&self, is_float: bool) -> u32 {
        if is_float {
            16
        } else {
            0
        }
    }
    fn argument_registers(&self, is_float: bool) -> &[u32] {
        if is_float {
            &[16, 17]
        } else {
            &[1, 2]
        }
    }
    fn count_register(&self) -> Option<u32> {
        None
    }
    fn is_caller_saved(&self, _reg: u32) -> bool {
        true
    }
    fn is_callee_saved(&self, _reg: u32) -> bool {
        false
    }
    fn is_float_register(&self, reg: u32) -> bool {
        reg >= 16
    }
    fn register_name(&self, reg: u32, _width: OperandWidth) -> String {
        format!("%r{reg}")
    }
}

#[derive(Default)]
struct NullInstInfo;
impl InstInfo for NullInstInfo {}

#[derive(Default)]
struct NullFrameInfo;
impl FrameInfo for NullFrameInfo {
    fn emit_prologue(&self, _func: &MirFunction, _frame_size: u64) -> Vec<MachineInstruction> {
        Vec::new()
    }
    fn emit_epilogue(&self, _func: &MirFunction, _frame_size: u64) -> Vec<MachineInstruction> {
        Vec::new()
    }
}

/// Declines every instruction, forcing every opcode through the generic
/// fallback in `lowering.rs`, and does no legalization at all — these tests
/// look at pre-legalization MIR shape only.
#[derive(Default)]
struct NullIselInfo;
impl ISelInfo for NullIselInfo {
    fn try_lower(&self, _id: seen_ir::InstId, _inst: &seen_ir::InstructionData, _cx: &mut seen_codegen::LoweringCx) -> bool {
        false
    }
    fn legalize(&self, _func: &mut MirFunction, _reg_info: &dyn RegisterInfo) -> seen_common::SeenResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct NullAsmPrinter;
impl AsmPrinter for NullAsmPrinter {
    fn print_module(&self, _module: &MirModule, _reg_info: &dyn RegisterInfo) -> String {
        String::new()
    }
}

impl Target for NullTarget {
    fn data_layout(&self) -> &dyn DataLayout {
        &self.data_layout
    }
    fn register_info(&self) -> &dyn RegisterInfo {
        &self.register_info
    }
    fn inst_info(&self) -> &dyn InstInfo {
        &self.inst_info
    }
    fn frame_info(&self) -> &dyn FrameInfo {
        &self.frame_info
    }
    fn isel_info(&self) -> &dyn ISelInfo {
        &self.isel_info
    }
    fn asm_printer(&self) -> &dyn AsmPrinter {
        &self.asm_printer
    }
}

fn only_function(mir: &MirModule) -> &MirFunction {
    mir.globals()
        .find_map(|g| match g {
            MirGlobal::Function(f) if !f.is_declaration() => Some(f),
            _ => None,
        })
        .expect("one defined function")
}

#[test]
fn phi_placeholder_is_fed_by_a_copy_from_each_predecessor() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("select_like", Linkage::External, i64_ty, vec![i64_ty]);

    let entry = module.function_mut(f).create_block("entry");
    let left = module.function_mut(f).create_block("left");
    let right = module.function_mut(f).create_block("right");
    let join = module.function_mut(f).create_block("join");
    let arg = module.function(f).args().next().unwrap();

    {
        let func = module.function_mut(f);
        let zero = ValueRef::Const(ctx.const_int(0, IntWidth::Word));
        let cmp = IrBuilder::at_end(func, entry).icmp(Predicate::Lt, ValueRef::Arg(arg), zero, &mut ctx);
        IrBuilder::at_end(func, entry).cond_br(ValueRef::Inst(cmp), left, right, &mut ctx);

        let neg_one = ValueRef::Const(ctx.const_int(-1, IntWidth::Word));
        IrBuilder::at_end(func, left).br(join, &mut ctx);
        let one = ValueRef::Const(ctx.const_int(1, IntWidth::Word));
        IrBuilder::at_end(func, right).br(join, &mut ctx);

        let phi = IrBuilder::at_end(func, join).phi(i64_ty, vec![(neg_one, left), (one, right)]);
        IrBuilder::at_end(func, join).ret(Some(ValueRef::Inst(phi)), &mut ctx);
    }

    let target = NullTarget::default();
    let mir = lower_module(&ctx, &module, &target).unwrap();
    let func = only_function(&mir);

    // No block ever emits a literal Phi opcode — it was fully replaced by
    // per-predecessor copies into the phi's pre-allocated register.
    let copy_count = func
        .blocks
        .iter()
        .flat_map(|b| b.insts.iter())
        .filter(|inst| matches!(inst.opcode, MachineOpcode::Load) && !inst.is_memory_access)
        .count();
    assert_eq!(copy_count, 2, "left and right must each contribute one phi-resolution copy");

    // Both copies must target the very same destination register.
    let dests: Vec<_> = func
        .blocks
        .iter()
        .flat_map(|b| b.insts.iter())
        .filter(|inst| matches!(inst.opcode, MachineOpcode::Load) && !inst.is_memory_access)
        .map(|inst| inst.operand(0))
        .collect();
    assert_eq!(dests[0], dests[1], "both predecessors must feed the same phi register");
}

#[test]
fn a_real_load_through_an_alloca_is_flagged_as_a_memory_access() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("round_trip", Linkage::External, i64_ty, vec![]);
    let entry = module.function_mut(f).create_block("entry");
    {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let ptr = b.alloca(i64_ty, 1, &mut ctx);
        let seven = ValueRef::Const(ctx.const_int(7, IntWidth::Word));
        b.store(seven, ValueRef::Inst(ptr), &mut ctx);
        let loaded = b.load(ValueRef::Inst(ptr), i64_ty);
        b.ret(Some(ValueRef::Inst(loaded)), &mut ctx);
    }

    let target = NullTarget::default();
    let mir = lower_module(&ctx, &module, &target).unwrap();
    let func = only_function(&mir);
    let entry_block = &func.blocks[0];

    let real_loads: Vec<_> = entry_block.insts.iter().filter(|inst| matches!(inst.opcode, MachineOpcode::Load) && inst.is_memory_access).collect();
    assert_eq!(real_loads.len(), 1, "the IR-level load must be flagged as a genuine memory access");

    let stores: Vec<_> = entry_block.insts.iter().filter(|inst| matches!(inst.opcode, MachineOpcode::Store)).collect();
    assert_eq!(stores.len(), 1);

    let frame_addrs = entry_block.insts.iter().filter(|inst| matches!(inst.opcode, MachineOpcode::FrameAddr)).count();
    assert_eq!(frame_addrs, 1, "alloca must lower to exactly one FrameAddr");
}

#[test]
fn arithmetic_with_no_try_lower_claim_falls_back_to_the_generic_binary_opcode() {
    let mut ctx = Context::new();
    let i64_ty = ctx.i64_type();
    let mut module = Module::new("m");
    let f = module.declare_function("add_const", Linkage::External, i64_ty, vec![i64_ty]);
    let entry = module.function_mut(f).create_block("entry");
    let arg = module.function(f).args().next().unwrap();
    {
        let func = module.function_mut(f);
        let mut b = IrBuilder::at_end(func, entry);
        let four = ValueRef::Const(ctx.const_int(4, IntWidth::Word));
        let sum = b.binary(BinaryOp::Add, ValueRef::Arg(arg), four, i64_ty);
        b.ret(Some(ValueRef::Inst(sum)), &mut ctx);
    }

    let target = NullTarget::default();
    let mir = lower_module(&ctx, &module, &target).unwrap();
    let func = only_function(&mir);
    let adds = func.blocks[0].insts.iter().filter(|inst| matches!(inst.opcode, MachineOpcode::Add)).count();
    assert_eq!(adds, 1);
}

#[test]
fn width_of_type_maps_bool_byte_and_word_to_distinct_widths() {
    let mut ctx = Context::new();
    assert_eq!(width_of_type(&ctx, ctx.bool_type()), OperandWidth::Int1);
    assert_eq!(width_of_type(&ctx, ctx.i8_type()), OperandWidth::Int8);
    assert_eq!(width_of_type(&ctx, ctx.i64_type()), OperandWidth::Int64);
    assert_eq!(width_of_type(&ctx, ctx.f64_type()), OperandWidth::Float64);
}
