//! The visitor shape the IR generator implements. The AST depends on
//! nothing beyond this trait being implemented by its consumer; the core
//! never depends on any particular source syntax.

use crate::ast::{Expr, Function, GlobalVariable, Stmt};

pub trait Visitor {
    type Output;

    fn visit_function(&mut self, function: &Function) -> Self::Output;
    fn visit_global_variable(&mut self, global: &GlobalVariable) -> Self::Output;
    fn visit_stmt(&mut self, stmt: &Stmt) -> Self::Output;
    fn visit_expr(&mut self, expr: &Expr) -> Self::Output;
}
