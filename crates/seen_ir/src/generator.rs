//! AST → IR lowering (§6.1, C1–C4). Implements [`seen_ast::Visitor`] so the
//! core never depends on any particular source syntax — only on the
//! `accept`/`Visitor` shape `seen_ast` exposes.
//!
//! Locals (`var` declarations and parameters) lower to an `alloca` in the
//! entry block plus `load`/`store` pairs, the way `LLVMVisitor.cpp` in
//! `original_source` does before its own `mem2reg`-equivalent pass runs.
//! This keeps every instruction its own unique SSA definition (IR1) without
//! needing a phi-placement algorithm for plain local mutation; `phi` is
//! still used directly for the control-flow merges short-circuit booleans,
//! ternaries, and `switch`/inlining need on their own.
//!
//! Builder calls are constructed inline as `IrBuilder::at_end(self.module
//! .function_mut(f), block)` at every call site rather than behind a
//! `self`-borrowing helper method: a helper returning `&mut FunctionData`
//! from `&mut self` would tie up the *whole* generator for as long as the
//! builder lives, making it impossible to also pass `self.ctx` into the
//! same call. Borrowing the `module` and `ctx` fields directly keeps them
//! disjoint to the borrow checker.

use hashbrown::HashMap;

use seen_ast::{self as ast, Accept, BinaryOp as AstBinaryOp, Expr, Function, GlobalVariable, Stmt, Type as AstType, UnaryOp as AstUnaryOp, Visitor};
use seen_common::{SeenError, SeenResult};

use crate::block::BlockId;
use crate::builder::IrBuilder;
use crate::context::Context;
use crate::function::{ArgId, Linkage};
use crate::instruction::{BinaryOp, CastOp, Predicate, UnaryOp};
use crate::module::{FunctionId, Module};
use crate::types::{IntWidth, IrType, TypeId};
use crate::value::ValueRef;

/// One loop's break/continue targets (§6.1 `break`/`continue` visitors).
struct LoopTargets {
    break_block: BlockId,
    continue_block: BlockId,
}

/// Lowers a [`seen_ast::Program`] into a [`Module`] against `ctx`. One
/// generator instance is used for the whole program; `current_function`
/// and `current_block` track where new instructions land, mirroring the
/// single mutable insertion cursor `IRVisitor`/`LLVMVisitor` keep in the
/// original sources.
pub struct IrGenerator<'ctx> {
    ctx: &'ctx mut Context,
    module: Module,
    current_function: Option<FunctionId>,
    current_block: Option<BlockId>,
    /// variable name → (pointer value, pointee type)
    locals: HashMap<String, (ValueRef, TypeId)>,
    loop_stack: Vec<LoopTargets>,
    labels: HashMap<String, BlockId>,
    /// Whether the current block already has a terminator; once set, no
    /// further instructions may be appended until a fresh block is entered
    /// (builder constraint, §4.1: "refuses to insert after a terminator").
    block_terminated: bool,
}

impl<'ctx> IrGenerator<'ctx> {
    pub fn new(ctx: &'ctx mut Context, module_name: impl Into<String>) -> Self {
        Self {
            ctx,
            module: Module::new(module_name),
            current_function: None,
            current_block: None,
            locals: HashMap::new(),
            loop_stack: Vec::new(),
            labels: HashMap::new(),
            block_terminated: false,
        }
    }

    /// Lowers every item in `program`, returning the finished module.
    pub fn generate(mut self, program: &ast::Program) -> SeenResult<Module> {
        // Two passes: declare every function/global's signature first so
        // forward references (mutual recursion, calls to not-yet-visited
        // functions) resolve, then lower bodies.
        for item in &program.items {
            match item {
                ast::Item::Function(f) => {
                    let ret_ty = self.lower_type(&f.return_type);
                    let param_tys: Vec<TypeId> = f.params.iter().map(|p| self.lower_type(&p.ty)).collect();
                    let linkage = lower_linkage(f.visibility);
                    self.module.declare_function(f.name.value.clone(), linkage, ret_ty, param_tys);
                }
                ast::Item::GlobalVariable(g) => {
                    let ty = self.lower_type(&g.ty);
                    let linkage = lower_linkage(g.visibility);
                    let init = g.initializer.as_ref().map(|e| self.const_initializer(e)).transpose()?;
                    self.module.declare_global(g.name.clone(), linkage, ty, init, true);
                }
            }
        }
        for item in &program.items {
            if let ast::Item::Function(f) = item {
                if f.body.is_some() {
                    f.accept(&mut self)?;
                }
            }
        }
        Ok(self.module)
    }

    fn lower_type(&mut self, ty: &AstType) -> TypeId {
        match ty {
            AstType::Void => self.ctx.void_type(),
            AstType::Bool => self.ctx.bool_type(),
            AstType::I64 => self.ctx.i64_type(),
            AstType::F64 => self.ctx.f64_type(),
            AstType::Pointer(_) => self.ctx.ptr_type(),
            AstType::Array(elem, count) => {
                let elem_ty = self.lower_type(elem);
                self.ctx.array_type(elem_ty, *count)
            }
            AstType::Function(ret, params) => {
                let ret_ty = self.lower_type(ret);
                let param_tys = params.iter().map(|p| self.lower_type(p)).collect();
                self.ctx.function_type(ret_ty, param_tys)
            }
        }
    }

    /// A best-effort constant folder for global initializers (spec.md §9's
    /// Open Question: struct-typed nested initializers are not implemented
    /// and surface as `SeenError::Unsupported`, per the error design §7).
    fn const_initializer(&mut self, expr: &Expr) -> SeenResult<crate::value::ConstId> {
        match expr {
            Expr::IntLiteral(v) => Ok(self.ctx.const_int(*v, IntWidth::Word)),
            Expr::BoolLiteral(b) => Ok(self.ctx.const_bool(*b)),
            Expr::CharLiteral(c) => Ok(self.ctx.const_int(*c as i64, IntWidth::Byte)),
            Expr::FloatLiteral(f) => Ok(self.ctx.const_float(*f)),
            Expr::InitializerList { elements, ty } => {
                let array_ty = self.lower_type(ty);
                let elems = elements.iter().map(|e| self.const_initializer(e)).collect::<SeenResult<Vec<_>>>()?;
                Ok(self.ctx.intern_const(crate::value::Constant::Array(array_ty, elems)))
            }
            _ => Err(SeenError::unsupported("non-constant global initializer")),
        }
    }

    fn function_id(&self) -> FunctionId {
        self.current_function.expect("inside a function body")
    }

    fn block_id(&self) -> BlockId {
        self.current_block.expect("insertion cursor set")
    }

    fn move_to(&mut self, block: BlockId) {
        self.current_block = Some(block);
        self.block_terminated = false;
    }

    fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let function = self.function_id();
        self.module.function_mut(function).create_block(name)
    }

    /// Emits a `br target` in the current block unless it is already
    /// terminated (e.g. by a `return`/`break`/`continue` already lowered
    /// inside it) — mirrors the original's `if (!block->getTerminator())
    /// builder.CreateBr(...)` idiom before falling through to the next
    /// structured block.
    fn seal_with_br(&mut self, target: BlockId) {
        if self.block_terminated {
            return;
        }
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        b.br(target, self.ctx);
        self.block_terminated = true;
    }

    fn declare_local(&mut self, name: &str, ty: &AstType, init: Option<&Expr>) -> SeenResult<()> {
        let ty_id = self.lower_type(ty);
        let (function, block) = (self.function_id(), self.block_id());
        let ptr = {
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            ValueRef::Inst(b.alloca(ty_id, 1, self.ctx))
        };
        self.locals.insert(name.to_string(), (ptr, ty_id));
        match init {
            Some(Expr::InitializerList { elements, .. }) => {
                let elem_ty = match ty {
                    AstType::Array(elem, _) => self.lower_type(elem),
                    _ => return Err(SeenError::unsupported("initializer list for a non-array local")),
                };
                for (i, element) in elements.iter().enumerate() {
                    let value = self.lower_expr(element)?;
                    let zero = ValueRef::Const(self.ctx.const_int(0, IntWidth::Word));
                    let index = ValueRef::Const(self.ctx.const_int(i as i64, IntWidth::Word));
                    let ptr_ty = self.ctx.ptr_type();
                    let (function, block) = (self.function_id(), self.block_id());
                    let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                    let elem_ptr = b.gep(ptr, elem_ty, vec![zero, index], ptr_ty);
                    b.store(value, ValueRef::Inst(elem_ptr), self.ctx);
                }
            }
            Some(init) => {
                let value = self.lower_expr(init)?;
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                b.store(value, ptr, self.ctx);
            }
            None => {}
        }
        Ok(())
    }

    fn lookup_lvalue(&mut self, expr: &Expr) -> SeenResult<(ValueRef, TypeId)> {
        match expr {
            Expr::Identifier { name, .. } => self
                .locals
                .get(name)
                .copied()
                .or_else(|| self.module.find_global(name).map(|g| (ValueRef::Global(g), self.module.global(g).value_type)))
                .ok_or_else(|| SeenError::unsupported(format!("unknown identifier '{}'", name))),
            Expr::ArrayAccess { base, index, ty } => {
                let (base_ptr, _) = self.lookup_lvalue(base)?;
                let index_val = self.lower_expr(index)?;
                let elem_ty = self.lower_type(ty);
                let zero = ValueRef::Const(self.ctx.const_int(0, IntWidth::Word));
                let ptr_ty = self.ctx.ptr_type();
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                let gep = b.gep(base_ptr, elem_ty, vec![zero, index_val], ptr_ty);
                Ok((ValueRef::Inst(gep), elem_ty))
            }
            _ => Err(SeenError::unsupported("expression is not assignable")),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> SeenResult<ValueRef> {
        match expr {
            Expr::IntLiteral(v) => Ok(ValueRef::Const(self.ctx.const_int(*v, IntWidth::Word))),
            Expr::FloatLiteral(f) => Ok(ValueRef::Const(self.ctx.const_float(*f))),
            Expr::BoolLiteral(b) => Ok(ValueRef::Const(self.ctx.const_bool(*b))),
            Expr::CharLiteral(c) => Ok(ValueRef::Const(self.ctx.const_int(*c as i64, IntWidth::Byte))),
            Expr::StringLiteral(s) => Ok(ValueRef::Const(self.ctx.intern_const(crate::value::Constant::String(s.clone().into_bytes())))),
            Expr::Identifier { ty, .. } => {
                let (ptr, _) = self.lookup_lvalue(expr)?;
                let result_ty = self.lower_type(ty);
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                Ok(ValueRef::Inst(b.load(ptr, result_ty)))
            }
            Expr::Unary { op, operand, ty } => self.lower_unary(*op, operand, ty),
            Expr::Binary { op, lhs, rhs, ty } => self.lower_binary(*op, lhs, rhs, ty),
            Expr::Ternary { cond, then_expr, else_expr, ty } => self.lower_ternary(cond, then_expr, else_expr, ty),
            Expr::Assign { target, value } => self.lower_assign(target, value),
            Expr::Cast { expr, to } => self.lower_cast(expr, to),
            Expr::Call { callee, args, .. } => self.lower_call(callee, args),
            Expr::InitializerList { .. } => Err(SeenError::unsupported("initializer list outside of a declaration")),
            Expr::ArrayAccess { ty, .. } => {
                let (ptr, _) = self.lookup_lvalue(expr)?;
                let result_ty = self.lower_type(ty);
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                Ok(ValueRef::Inst(b.load(ptr, result_ty)))
            }
            Expr::MemberAccess { .. } | Expr::This { .. } | Expr::MemberCall { .. } => {
                Err(SeenError::unsupported("struct/member access is not implemented by this core"))
            }
        }
    }

    fn lower_unary(&mut self, op: AstUnaryOp, operand: &Expr, ty: &AstType) -> SeenResult<ValueRef> {
        let v = self.lower_expr(operand)?;
        let result_ty = self.lower_type(ty);
        let is_float = matches!(ty, AstType::F64);
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let inst = match op {
            AstUnaryOp::Neg if is_float => b.unary(UnaryOp::FNeg, v, result_ty),
            AstUnaryOp::Neg => b.unary(UnaryOp::Neg, v, result_ty),
            AstUnaryOp::Not => b.unary(UnaryOp::Not, v, result_ty),
            AstUnaryOp::BitNot => b.unary(UnaryOp::Not, v, result_ty),
        };
        Ok(ValueRef::Inst(inst))
    }

    fn lower_binary(&mut self, op: AstBinaryOp, lhs: &Expr, rhs: &Expr, ty: &AstType) -> SeenResult<ValueRef> {
        if matches!(op, AstBinaryOp::And | AstBinaryOp::Or) {
            return self.lower_short_circuit(op, lhs, rhs);
        }
        let lv = self.lower_expr(lhs)?;
        let rv = self.lower_expr(rhs)?;
        let is_float = matches!(ty, AstType::F64);
        let result_ty = self.lower_type(ty);
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let inst = match op {
            AstBinaryOp::Add if is_float => b.binary(BinaryOp::FAdd, lv, rv, result_ty),
            AstBinaryOp::Add => b.binary(BinaryOp::Add, lv, rv, result_ty),
            AstBinaryOp::Sub if is_float => b.binary(BinaryOp::FSub, lv, rv, result_ty),
            AstBinaryOp::Sub => b.binary(BinaryOp::Sub, lv, rv, result_ty),
            AstBinaryOp::Mul if is_float => b.binary(BinaryOp::FMul, lv, rv, result_ty),
            AstBinaryOp::Mul => b.binary(BinaryOp::Mul, lv, rv, result_ty),
            AstBinaryOp::Div if is_float => b.binary(BinaryOp::FDiv, lv, rv, result_ty),
            AstBinaryOp::Div => b.binary(BinaryOp::UDiv, lv, rv, result_ty),
            AstBinaryOp::Mod => b.binary(BinaryOp::URem, lv, rv, result_ty),
            AstBinaryOp::BitAnd => b.binary(BinaryOp::And, lv, rv, result_ty),
            AstBinaryOp::BitOr => b.binary(BinaryOp::Or, lv, rv, result_ty),
            AstBinaryOp::BitXor => b.binary(BinaryOp::Xor, lv, rv, result_ty),
            AstBinaryOp::Shl => b.binary(BinaryOp::Shl, lv, rv, result_ty),
            AstBinaryOp::Shr => b.binary(BinaryOp::AShr, lv, rv, result_ty),
            AstBinaryOp::Eq if is_float => b.fcmp(Predicate::Eq, lv, rv, self.ctx),
            AstBinaryOp::Eq => b.icmp(Predicate::Eq, lv, rv, self.ctx),
            AstBinaryOp::Ne if is_float => b.fcmp(Predicate::Ne, lv, rv, self.ctx),
            AstBinaryOp::Ne => b.icmp(Predicate::Ne, lv, rv, self.ctx),
            AstBinaryOp::Lt if is_float => b.fcmp(Predicate::Lt, lv, rv, self.ctx),
            AstBinaryOp::Lt => b.icmp(Predicate::Lt, lv, rv, self.ctx),
            AstBinaryOp::Le if is_float => b.fcmp(Predicate::Le, lv, rv, self.ctx),
            AstBinaryOp::Le => b.icmp(Predicate::Le, lv, rv, self.ctx),
            AstBinaryOp::Gt if is_float => b.fcmp(Predicate::Gt, lv, rv, self.ctx),
            AstBinaryOp::Gt => b.icmp(Predicate::Gt, lv, rv, self.ctx),
            AstBinaryOp::Ge if is_float => b.fcmp(Predicate::Ge, lv, rv, self.ctx),
            AstBinaryOp::Ge => b.icmp(Predicate::Ge, lv, rv, self.ctx),
            AstBinaryOp::And | AstBinaryOp::Or => unreachable!("handled above"),
        };
        Ok(ValueRef::Inst(inst))
    }

    /// `&&`/`||` short-circuit: lowered to an explicit branch rather than a
    /// plain `and`/`or`, the way a control-flow-aware front end must (the
    /// right-hand side may have side effects it is not safe to always
    /// evaluate).
    fn lower_short_circuit(&mut self, op: AstBinaryOp, lhs: &Expr, rhs: &Expr) -> SeenResult<ValueRef> {
        let lv = self.lower_expr(lhs)?;
        let start_block = self.block_id();
        let rhs_block = self.create_block(if op == AstBinaryOp::And { "and.rhs" } else { "or.rhs" });
        let merge_block = self.create_block(if op == AstBinaryOp::And { "and.end" } else { "or.end" });
        {
            let (function, block) = (self.function_id(), start_block);
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            if op == AstBinaryOp::And {
                b.cond_br(lv, rhs_block, merge_block, self.ctx);
            } else {
                b.cond_br(lv, merge_block, rhs_block, self.ctx);
            }
        }
        self.block_terminated = true;

        self.move_to(rhs_block);
        let rv = self.lower_expr(rhs)?;
        let rhs_end_block = self.block_id();
        self.seal_with_br(merge_block);

        self.move_to(merge_block);
        let bool_ty = self.ctx.bool_type();
        let short_circuit_value = ValueRef::Const(self.ctx.const_bool(op == AstBinaryOp::Or));
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let phi = b.phi(bool_ty, vec![(short_circuit_value, start_block), (rv, rhs_end_block)]);
        Ok(ValueRef::Inst(phi))
    }

    fn lower_ternary(&mut self, cond: &Expr, then_expr: &Expr, else_expr: &Expr, ty: &AstType) -> SeenResult<ValueRef> {
        let cv = self.lower_expr(cond)?;
        let then_block = self.create_block("ternary.then");
        let else_block = self.create_block("ternary.else");
        let merge_block = self.create_block("ternary.end");
        {
            let (function, block) = (self.function_id(), self.block_id());
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            b.cond_br(cv, then_block, else_block, self.ctx);
        }
        self.block_terminated = true;

        self.move_to(then_block);
        let then_val = self.lower_expr(then_expr)?;
        let then_end = self.block_id();
        self.seal_with_br(merge_block);

        self.move_to(else_block);
        let else_val = self.lower_expr(else_expr)?;
        let else_end = self.block_id();
        self.seal_with_br(merge_block);

        self.move_to(merge_block);
        let result_ty = self.lower_type(ty);
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let phi = b.phi(result_ty, vec![(then_val, then_end), (else_val, else_end)]);
        Ok(ValueRef::Inst(phi))
    }

    fn lower_assign(&mut self, target: &Expr, value: &Expr) -> SeenResult<ValueRef> {
        let (ptr, _) = self.lookup_lvalue(target)?;
        let v = self.lower_expr(value)?;
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        b.store(v, ptr, self.ctx);
        Ok(v)
    }

    fn lower_cast(&mut self, expr: &Expr, to: &AstType) -> SeenResult<ValueRef> {
        let from_ty = self.value_ty_hint(expr);
        let v = self.lower_expr(expr)?;
        let to_ty = self.lower_type(to);
        let from_is_float = *self.ctx.get_type(from_ty) == IrType::Float;
        let to_is_float = matches!(to, AstType::F64);
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let op = match (from_is_float, to_is_float) {
            (false, true) => CastOp::SiToFp,
            (true, false) => CastOp::FpToSi,
            (true, true) => CastOp::FpExt,
            (false, false) => CastOp::SExt,
        };
        Ok(ValueRef::Inst(b.cast(op, v, to_ty)))
    }

    /// Best-effort type hint for a source expression used only to pick a
    /// cast direction; semantic analysis (assumed to have already run, per
    /// `seen_ast`'s module doc) resolves every expression's `Type` up
    /// front, so every variant but the two literal cases already carries
    /// one explicitly.
    fn value_ty_hint(&mut self, expr: &Expr) -> TypeId {
        let ty = match expr {
            Expr::FloatLiteral(_) => AstType::F64,
            Expr::IntLiteral(_) | Expr::CharLiteral(_) => AstType::I64,
            Expr::BoolLiteral(_) => AstType::Bool,
            Expr::Identifier { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Ternary { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::ArrayAccess { ty, .. }
            | Expr::MemberAccess { ty, .. }
            | Expr::This { ty }
            | Expr::MemberCall { ty, .. } => ty.clone(),
            Expr::StringLiteral(_) => AstType::Pointer(Box::new(AstType::I64)),
            Expr::Assign { .. } | Expr::Cast { .. } | Expr::InitializerList { .. } => AstType::I64,
        };
        self.lower_type(&ty)
    }

    fn lower_call(&mut self, callee: &str, args: &[Expr]) -> SeenResult<ValueRef> {
        let callee_id = self
            .module
            .find_function(callee)
            .ok_or_else(|| SeenError::unsupported(format!("call to undeclared function '{}'", callee)))?;
        let arg_values = args.iter().map(|a| self.lower_expr(a)).collect::<SeenResult<Vec<_>>>()?;
        let callee_fn = self.module.function(callee_id);
        let (callee_name, param_count, ret_ty) = (callee_fn.name.clone(), callee_fn.param_types.len(), callee_fn.return_type);
        let (function, block) = (self.function_id(), self.block_id());
        let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
        let inst = b.call(callee_id, &callee_name, param_count, ret_ty, arg_values)?;
        Ok(ValueRef::Inst(inst))
    }

    fn lower_block(&mut self, block: &ast::Block) -> SeenResult<()> {
        for stmt in &block.statements {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> SeenResult<()> {
        match stmt {
            Stmt::Compound(b) => self.lower_block(b),
            Stmt::Decl { name, ty, init } => self.declare_local(name, ty, init.as_ref()),
            Stmt::Expr(e) => {
                self.lower_expr(e)?;
                Ok(())
            }
            Stmt::Return(value) => {
                let v = value.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                b.ret(v, self.ctx);
                self.block_terminated = true;
                Ok(())
            }
            Stmt::If { cond, then_branch, else_branch } => self.lower_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::DoWhile { body, cond } => self.lower_do_while(body, cond),
            Stmt::For { init, cond, step, body } => self.lower_for(init.as_deref(), cond.as_ref(), step.as_ref(), body),
            Stmt::Switch { value, cases, default } => self.lower_switch(value, cases, default.as_deref()),
            Stmt::Break => {
                let target = self.loop_stack.last().map(|l| l.break_block).ok_or_else(|| SeenError::unsupported("break outside of a loop"))?;
                self.seal_with_br(target);
                Ok(())
            }
            Stmt::Continue => {
                let target = self.loop_stack.last().map(|l| l.continue_block).ok_or_else(|| SeenError::unsupported("continue outside of a loop"))?;
                self.seal_with_br(target);
                Ok(())
            }
            Stmt::Goto(label) => {
                let target = *self.labels.get(label).ok_or_else(|| SeenError::unsupported(format!("undefined label '{}'", label)))?;
                self.seal_with_br(target);
                Ok(())
            }
            Stmt::Label(name) => {
                let target = self.create_block(name.clone());
                self.seal_with_br(target);
                self.labels.insert(name.clone(), target);
                self.move_to(target);
                Ok(())
            }
            Stmt::Null => Ok(()),
        }
    }

    fn lower_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> SeenResult<()> {
        let cv = self.lower_expr(cond)?;
        let then_block = self.create_block("if.then");
        let else_block = self.create_block("if.else");
        let end_block = self.create_block("if.end");
        {
            let (function, block) = (self.function_id(), self.block_id());
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            b.cond_br(cv, then_block, else_block, self.ctx);
        }
        self.block_terminated = true;

        self.move_to(then_block);
        self.lower_stmt(then_branch)?;
        self.seal_with_br(end_block);

        self.move_to(else_block);
        if let Some(else_branch) = else_branch {
            self.lower_stmt(else_branch)?;
        }
        self.seal_with_br(end_block);

        self.move_to(end_block);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Stmt) -> SeenResult<()> {
        let cond_block = self.create_block("while.cond");
        let body_block = self.create_block("while.body");
        let end_block = self.create_block("while.end");
        self.seal_with_br(cond_block);

        self.move_to(cond_block);
        let cv = self.lower_expr(cond)?;
        {
            let (function, block) = (self.function_id(), self.block_id());
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            b.cond_br(cv, body_block, end_block, self.ctx);
        }
        self.block_terminated = true;

        self.move_to(body_block);
        self.loop_stack.push(LoopTargets { break_block: end_block, continue_block: cond_block });
        self.lower_stmt(body)?;
        self.loop_stack.pop();
        self.seal_with_br(cond_block);

        self.move_to(end_block);
        Ok(())
    }

    fn lower_do_while(&mut self, body: &Stmt, cond: &Expr) -> SeenResult<()> {
        let body_block = self.create_block("dowhile.body");
        let cond_block = self.create_block("dowhile.cond");
        let end_block = self.create_block("dowhile.end");
        self.seal_with_br(body_block);

        self.move_to(body_block);
        self.loop_stack.push(LoopTargets { break_block: end_block, continue_block: cond_block });
        self.lower_stmt(body)?;
        self.loop_stack.pop();
        self.seal_with_br(cond_block);

        self.move_to(cond_block);
        let cv = self.lower_expr(cond)?;
        {
            let (function, block) = (self.function_id(), self.block_id());
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            b.cond_br(cv, body_block, end_block, self.ctx);
        }
        self.block_terminated = true;

        self.move_to(end_block);
        Ok(())
    }

    fn lower_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, step: Option<&Expr>, body: &Stmt) -> SeenResult<()> {
        if let Some(init) = init {
            self.lower_stmt(init)?;
        }
        let cond_block = self.create_block("for.cond");
        let body_block = self.create_block("for.body");
        let iter_block = self.create_block("for.iter");
        let end_block = self.create_block("for.end");
        self.seal_with_br(cond_block);

        self.move_to(cond_block);
        match cond {
            Some(cond) => {
                let cv = self.lower_expr(cond)?;
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                b.cond_br(cv, body_block, end_block, self.ctx);
            }
            None => {
                let (function, block) = (self.function_id(), self.block_id());
                let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
                b.br(body_block, self.ctx);
            }
        }
        self.block_terminated = true;

        self.move_to(body_block);
        self.loop_stack.push(LoopTargets { break_block: end_block, continue_block: iter_block });
        self.lower_stmt(body)?;
        self.loop_stack.pop();
        self.seal_with_br(iter_block);

        self.move_to(iter_block);
        if let Some(step) = step {
            self.lower_expr(step)?;
        }
        self.seal_with_br(cond_block);

        self.move_to(end_block);
        Ok(())
    }

    /// `switch` lowers directly to the core's `switch` instruction (§3.3)
    /// rather than a chain of compares, the way `LLVMVisitor::Visit(SwitchStmt
    /// const&, ...)` emits an `llvm::SwitchInst`. Fallthrough (a case with no
    /// `break`) is modeled by branching straight into the next case's block
    /// instead of giving it its own switch-edge target.
    fn lower_switch(&mut self, value: &Expr, cases: &[ast::SwitchCase], default: Option<&[Stmt]>) -> SeenResult<()> {
        let value = self.lower_expr(value)?;
        let default_block = self.create_block("switch.default");
        let end_block = self.create_block("switch.end");
        let case_blocks: Vec<BlockId> = cases.iter().map(|c| self.create_block(format!("switch.case.{}", c.value))).collect();

        {
            let pairs: Vec<(i64, BlockId)> = cases.iter().zip(&case_blocks).map(|(c, b)| (c.value, *b)).collect();
            let (function, block) = (self.function_id(), self.block_id());
            let mut b = IrBuilder::at_end(self.module.function_mut(function), block);
            b.switch(value, default_block, pairs, self.ctx);
        }
        self.block_terminated = true;

        self.loop_stack.push(LoopTargets { break_block: end_block, continue_block: end_block });
        for (i, case) in cases.iter().enumerate() {
            self.move_to(case_blocks[i]);
            for stmt in &case.body {
                self.lower_stmt(stmt)?;
            }
            let fallthrough_target = if case.falls_through {
                end_block
            } else {
                case_blocks.get(i + 1).copied().unwrap_or(end_block)
            };
            self.seal_with_br(fallthrough_target);
        }
        self.loop_stack.pop();

        self.move_to(default_block);
        if let Some(default) = default {
            for stmt in default {
                self.lower_stmt(stmt)?;
            }
        }
        self.seal_with_br(end_block);

        self.move_to(end_block);
        Ok(())
    }
}

fn lower_linkage(vis: ast::Visibility) -> Linkage {
    match vis {
        ast::Visibility::Public => Linkage::External,
        ast::Visibility::Private => Linkage::Internal,
    }
}

impl<'ctx> Visitor for IrGenerator<'ctx> {
    type Output = SeenResult<Option<ValueRef>>;

    fn visit_function(&mut self, function: &Function) -> Self::Output {
        let id = self.module.find_function(&function.name.value).expect("function pre-declared");
        self.current_function = Some(id);
        self.locals.clear();
        self.labels.clear();

        let entry = self.module.function_mut(id).create_block("entry");
        self.move_to(entry);

        for (i, param) in function.params.iter().enumerate() {
            let arg_id = ArgId(i as u32);
            let ty = self.module.function(id).arg_type(arg_id);
            let (fid, block) = (self.function_id(), self.block_id());
            let ptr = {
                let mut b = IrBuilder::at_end(self.module.function_mut(fid), block);
                ValueRef::Inst(b.alloca(ty, 1, self.ctx))
            };
            let mut b = IrBuilder::at_end(self.module.function_mut(fid), block);
            b.store(ValueRef::Arg(arg_id), ptr, self.ctx);
            drop(b);
            self.locals.insert(param.name.clone(), (ptr, ty));
        }

        if let Some(body) = &function.body {
            self.lower_block(body)?;
        }
        if !self.block_terminated {
            let void = self.ctx.void_type();
            let (fid, block) = (self.function_id(), self.block_id());
            let is_void = self.module.function(fid).return_type == void;
            let mut b = IrBuilder::at_end(self.module.function_mut(fid), block);
            if is_void {
                b.ret(None, self.ctx);
            } else {
                // Missing terminal `return` on a non-void function: the
                // generator still must leave every block terminated (IR3).
                let zero = ValueRef::Const(self.ctx.const_int(0, IntWidth::Word));
                b.ret(Some(zero), self.ctx);
            }
        }
        self.current_function = None;
        self.current_block = None;
        Ok(None)
    }

    fn visit_global_variable(&mut self, _global: &GlobalVariable) -> Self::Output {
        Ok(None)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Self::Output {
        self.lower_stmt(stmt)?;
        Ok(None)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Self::Output {
        self.lower_expr(expr).map(Some)
    }
}

/// Convenience entry point mirroring `IRGen::Generate` (§6.1).
pub fn generate_module(ctx: &mut Context, module_name: impl Into<String>, program: &ast::Program) -> SeenResult<Module> {
    IrGenerator::new(ctx, module_name).generate(program)
}
