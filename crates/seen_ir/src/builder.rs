//! IR builder (§4.3, C4): an insertion-cursor API over [`FunctionData`],
//! one constructor per opcode, mirroring the "current block" idiom of
//! LLVM-style builders without a global singleton (design notes §9 — the
//! builder is owned by whoever is generating code, not a process-wide
//! default instance).

use seen_common::{SeenError, SeenResult};

use crate::block::BlockId;
use crate::context::Context;
use crate::function::FunctionData;
use crate::instruction::{BinaryOp, CastOp, InstId, InstructionData, Opcode, Predicate, UnaryOp};
use crate::module::FunctionId;
use crate::types::TypeId;
use crate::value::ValueRef;

/// Where new instructions land: at the end of `block`, or (during
/// legalization/rewriting) before a specific existing instruction.
#[derive(Debug, Clone, Copy)]
enum InsertPoint {
    End(BlockId),
    Before(BlockId, InstId),
}

pub struct IrBuilder<'f> {
    func: &'f mut FunctionData,
    point: InsertPoint,
}

impl<'f> IrBuilder<'f> {
    pub fn at_end(func: &'f mut FunctionData, block: BlockId) -> Self {
        Self { func, point: InsertPoint::End(block) }
    }

    pub fn before(func: &'f mut FunctionData, block: BlockId, inst: InstId) -> Self {
        Self { func, point: InsertPoint::Before(block, inst) }
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        self.func.create_block(name)
    }

    pub fn move_to_end(&mut self, block: BlockId) {
        self.point = InsertPoint::End(block);
    }

    fn emit(&mut self, opcode: Opcode, ty: TypeId, operands: Vec<ValueRef>) -> InstId {
        let block = match self.point {
            InsertPoint::End(b) => b,
            InsertPoint::Before(b, _) => b,
        };
        let data = InstructionData {
            opcode,
            ty,
            operands: operands.into(),
            block,
            name: None,
        };
        match self.point {
            InsertPoint::End(b) => self.func.push_instruction(b, data),
            InsertPoint::Before(b, before) => {
                let index = self.func.block(b).insts.iter().position(|i| *i == before).expect("insertion anchor in block");
                self.func.insert_instruction_at(b, index, data)
            }
        }
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ValueRef, rhs: ValueRef, ty: TypeId) -> InstId {
        self.emit(Opcode::Binary(op), ty, vec![lhs, rhs])
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ValueRef, ty: TypeId) -> InstId {
        self.emit(Opcode::Unary(op), ty, vec![operand])
    }

    pub fn alloca(&mut self, elem_ty: TypeId, count: u32, ctx: &mut Context) -> InstId {
        let ptr_ty = ctx.ptr_type();
        self.emit(Opcode::Alloca { elem_ty, count }, ptr_ty, vec![])
    }

    pub fn load(&mut self, ptr: ValueRef, ty: TypeId) -> InstId {
        self.emit(Opcode::Load, ty, vec![ptr])
    }

    pub fn store(&mut self, value: ValueRef, ptr: ValueRef, ctx: &mut Context) -> InstId {
        let void = ctx.void_type();
        self.emit(Opcode::Store, void, vec![value, ptr])
    }

    pub fn gep(&mut self, base: ValueRef, elem_ty: TypeId, indices: Vec<ValueRef>, ty: TypeId) -> InstId {
        let mut operands = vec![base];
        operands.extend(indices);
        self.emit(Opcode::Gep { elem_ty }, ty, operands)
    }

    pub fn icmp(&mut self, pred: Predicate, lhs: ValueRef, rhs: ValueRef, ctx: &mut Context) -> InstId {
        let bool_ty = ctx.bool_type();
        self.emit(Opcode::Icmp(pred), bool_ty, vec![lhs, rhs])
    }

    pub fn fcmp(&mut self, pred: Predicate, lhs: ValueRef, rhs: ValueRef, ctx: &mut Context) -> InstId {
        let bool_ty = ctx.bool_type();
        self.emit(Opcode::Fcmp(pred), bool_ty, vec![lhs, rhs])
    }

    pub fn cast(&mut self, op: CastOp, value: ValueRef, to: TypeId) -> InstId {
        self.emit(Opcode::Cast(op), to, vec![value])
    }

    pub fn br(&mut self, target: BlockId, ctx: &mut Context) -> InstId {
        let void = ctx.void_type();
        self.emit(Opcode::Br, void, vec![ValueRef::Block(target)])
    }

    pub fn cond_br(&mut self, cond: ValueRef, if_true: BlockId, if_false: BlockId, ctx: &mut Context) -> InstId {
        let void = ctx.void_type();
        self.emit(Opcode::CondBr, void, vec![cond, ValueRef::Block(if_true), ValueRef::Block(if_false)])
    }

    pub fn switch(&mut self, value: ValueRef, default: BlockId, cases: Vec<(i64, BlockId)>, ctx: &mut Context) -> InstId {
        let void = ctx.void_type();
        let case_values = cases.iter().map(|(v, _)| *v).collect();
        let mut operands = vec![value, ValueRef::Block(default)];
        operands.extend(cases.into_iter().map(|(_, b)| ValueRef::Block(b)));
        self.emit(Opcode::Switch { case_values }, void, operands)
    }

    pub fn ret(&mut self, value: Option<ValueRef>, ctx: &mut Context) -> InstId {
        let void = ctx.void_type();
        self.emit(Opcode::Ret, void, value.into_iter().collect())
    }

    pub fn phi(&mut self, ty: TypeId, incoming: Vec<(ValueRef, BlockId)>) -> InstId {
        let mut operands = Vec::with_capacity(incoming.len() * 2);
        for (v, b) in incoming {
            operands.push(v);
            operands.push(ValueRef::Block(b));
        }
        self.emit(Opcode::Phi, ty, operands)
    }

    /// `callee_name`/`param_count`/`ret_ty` are read from the target
    /// function's signature by the caller before this is invoked, rather
    /// than this method taking a `&Module` itself — the builder only ever
    /// holds a `&mut FunctionData` (the function being built), which may be
    /// the very `Module` the caller would otherwise need to also borrow
    /// immutably for the callee's signature.
    pub fn call(&mut self, callee: FunctionId, callee_name: &str, param_count: usize, ret_ty: TypeId, args: Vec<ValueRef>) -> SeenResult<InstId> {
        if args.len() != param_count {
            return Err(SeenError::malformed_ir(
                callee_name,
                "<call>",
                format!("call to {} expects {} arguments, got {}", callee_name, param_count, args.len()),
            ));
        }
        let mut operands = vec![ValueRef::Function(callee)];
        operands.extend(args);
        Ok(self.emit(Opcode::Call, ret_ty, operands))
    }

    pub fn select(&mut self, cond: ValueRef, if_true: ValueRef, if_false: ValueRef, ty: TypeId) -> InstId {
        self.emit(Opcode::Select, ty, vec![cond, if_true, if_false])
    }

    /// §4.1: clones `inst` into `target_block`, registering a fresh
    /// identity. Operands are copied verbatim; the caller remaps them
    /// through `Function::set_operand` when cloning across a value map.
    pub fn clone_instruction(&mut self, inst: InstId, target_block: BlockId) -> InstId {
        self.func.clone_instruction(inst, target_block)
    }

    /// §4.1: splits `block` at `at`, moving `at` and everything after it
    /// (including `block`'s terminator) into a freshly created successor.
    /// `block` is left without a terminator.
    pub fn split_block(&mut self, block: BlockId, at: InstId, new_name: impl Into<String>) -> BlockId {
        self.func.split_block(block, at, new_name)
    }
}
