//! Source-level types, resolved by (an external) semantic analysis pass
//! before the tree reaches the IR generator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    I64,
    F64,
    Array(Box<Type>, u32),
    Pointer(Box<Type>),
    /// A function type, used only for call-target resolution.
    Function(Box<Type>, Vec<Type>),
}

impl Type {
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }
}
