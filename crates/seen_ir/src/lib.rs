//! Static single-assignment intermediate representation: types, values,
//! instructions, the builder and textual printer, the pass manager and its
//! analyses, and the transform passes that run over it.

pub mod analysis;
pub mod block;
pub mod builder;
pub mod context;
pub mod function;
pub mod generator;
pub mod instruction;
pub mod module;
pub mod pass;
pub mod printer;
pub mod transform;
pub mod types;
pub mod value;
pub mod verify;

pub use block::{BasicBlockData, BlockId};
pub use context::Context;
pub use function::{ArgId, FunctionData, Linkage};
pub use generator::{generate_module, IrGenerator};
pub use instruction::{BinaryOp, CastOp, InstId, InstructionData, Opcode, Predicate, UnaryOp};
pub use module::{FunctionId, GlobalId, GlobalValueData, Module};
pub use printer::print_module;
pub use types::{IntWidth, IrType, TypeId};
pub use value::{Constant, ConstId, Use, UseGraph, ValueRef};
pub use verify::{verify_function, verify_module};