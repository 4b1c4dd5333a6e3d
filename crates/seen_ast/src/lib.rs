//! Minimal source-level AST.
//!
//! This crate is a deliberate stand-in for the lexer/parser/semantic-analyzer
//! that would normally hand a finished AST to the IR generator. The IR
//! generator (in `seen_ir`) depends only on the node shapes and the
//! `accept`/`Visitor` contract defined here, never on any particular source
//! syntax. Semantic analysis is assumed to have already run: expressions
//! carry their resolved `Type`, and implicit conversions are represented
//! explicitly as `Expr::Cast` nodes rather than inferred during lowering.

pub mod ty;
pub mod ast;
pub mod visitor;

pub use ast::*;
pub use ty::Type;
pub use visitor::Visitor;
