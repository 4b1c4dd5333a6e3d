//! IR types (§3.1). Types are interned per [`Context`](crate::context::Context);
//! `TypeId` equality is semantic equality.

use serde::{Deserialize, Serialize};

/// An interned IR type. Pointer/index equality is semantic equality because
/// every `TypeId` is produced by [`Context::intern_type`](crate::context::Context::intern_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Bit width of an `Int` type. The core only produces `Bool` (the result of
/// `icmp`/`fcmp`/`br` conditions), `Byte`, and `Word`; see DESIGN.md for why
/// a `Bool` width prints as `i1` rather than reproducing the original
/// two-width printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    Bool,
    Byte,
    Word,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::Bool => 1,
            IntWidth::Byte => 8,
            IntWidth::Word => 64,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(IntWidth::Bool),
            8 => Some(IntWidth::Byte),
            64 => Some(IntWidth::Word),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    Void,
    Int(IntWidth),
    Float,
    Pointer,
    Label,
    Array(TypeId, u32),
    Function(TypeId, Vec<TypeId>),
    Struct(Vec<TypeId>, Option<String>),
}

impl IrType {
    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, IrType::Function(..))
    }

    /// Whether this is the `i1` type `icmp`/`fcmp`/`br` conditions require.
    pub fn is_bool(&self) -> bool {
        matches!(self, IrType::Int(IntWidth::Bool))
    }

    /// `Size` (§3.1): void and function types have no size.
    pub fn size(&self, resolve: impl Fn(TypeId) -> IrType + Copy) -> Option<u64> {
        match self {
            IrType::Void | IrType::Function(..) => None,
            IrType::Int(w) => Some((w.bits() as u64 + 7) / 8),
            IrType::Float => Some(8),
            IrType::Pointer | IrType::Label => Some(8),
            IrType::Array(elem, count) => {
                let elem_size = resolve(*elem).size(resolve)?;
                Some(elem_size * (*count as u64))
            }
            IrType::Struct(fields, _) => {
                let mut total = 0u64;
                for f in fields {
                    total += resolve(*f).size(resolve)?;
                }
                Some(total)
            }
        }
    }

    /// `Align` (§3.1): natural alignment equals size for scalars, and the
    /// maximum field alignment for aggregates (x64 data layout, §4.8).
    pub fn align(&self, resolve: impl Fn(TypeId) -> IrType + Copy) -> Option<u64> {
        match self {
            IrType::Void | IrType::Function(..) => None,
            IrType::Array(elem, _) => resolve(*elem).align(resolve),
            IrType::Struct(fields, _) => fields
                .iter()
                .filter_map(|f| resolve(*f).align(resolve))
                .max()
                .or(Some(1)),
            other => other.size(resolve),
        }
    }
}
