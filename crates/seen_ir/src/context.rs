//! The IR context owns type and constant interning tables (§3.1, §3.2).
//! A context outlives every module built from it (§3.6). Mutation only
//! happens during IR construction; nothing here tolerates concurrent
//! writers (§5).

use hashbrown::HashMap;

use crate::types::{IntWidth, IrType, TypeId};
use crate::value::{Constant, ConstId};

#[derive(Debug, Default)]
pub struct Context {
    type_storage: Vec<IrType>,
    type_table: HashMap<IrType, TypeId>,
    const_storage: Vec<Constant>,
    const_table: HashMap<Constant, ConstId>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_type(&mut self, ty: IrType) -> TypeId {
        if let Some(id) = self.type_table.get(&ty) {
            return *id;
        }
        let id = TypeId(self.type_storage.len() as u32);
        self.type_storage.push(ty.clone());
        self.type_table.insert(ty, id);
        id
    }

    pub fn get_type(&self, id: TypeId) -> &IrType {
        &self.type_storage[id.0 as usize]
    }

    /// Looks up an already-interned type without inserting it. Used by the
    /// printer to recover a constant's type from its value without needing
    /// mutable access to the context.
    pub fn find_type(&self, ty: &IrType) -> Option<TypeId> {
        self.type_table.get(ty).copied()
    }

    pub fn void_type(&mut self) -> TypeId {
        self.intern_type(IrType::Void)
    }

    pub fn bool_type(&mut self) -> TypeId {
        self.intern_type(IrType::Int(IntWidth::Bool))
    }

    pub fn i8_type(&mut self) -> TypeId {
        self.intern_type(IrType::Int(IntWidth::Byte))
    }

    pub fn i64_type(&mut self) -> TypeId {
        self.intern_type(IrType::Int(IntWidth::Word))
    }

    pub fn f64_type(&mut self) -> TypeId {
        self.intern_type(IrType::Float)
    }

    pub fn ptr_type(&mut self) -> TypeId {
        self.intern_type(IrType::Pointer)
    }

    pub fn label_type(&mut self) -> TypeId {
        self.intern_type(IrType::Label)
    }

    pub fn array_type(&mut self, elem: TypeId, count: u32) -> TypeId {
        self.intern_type(IrType::Array(elem, count))
    }

    pub fn function_type(&mut self, ret: TypeId, params: Vec<TypeId>) -> TypeId {
        self.intern_type(IrType::Function(ret, params))
    }

    pub fn size_of(&self, id: TypeId) -> Option<u64> {
        self.get_type(id).size(|t| self.get_type(t).clone())
    }

    pub fn align_of(&self, id: TypeId) -> Option<u64> {
        self.get_type(id).align(|t| self.get_type(t).clone())
    }

    pub fn intern_const(&mut self, value: Constant) -> ConstId {
        if let Some(id) = self.const_table.get(&value) {
            return *id;
        }
        let id = ConstId(self.const_storage.len() as u32);
        self.const_storage.push(value.clone());
        self.const_table.insert(value, id);
        id
    }

    pub fn get_const(&self, id: ConstId) -> &Constant {
        &self.const_storage[id.0 as usize]
    }

    pub fn const_int(&mut self, value: i64, width: IntWidth) -> ConstId {
        self.intern_const(Constant::Int(value, width))
    }

    pub fn const_bool(&mut self, value: bool) -> ConstId {
        self.const_int(value as i64, IntWidth::Bool)
    }

    pub fn const_float(&mut self, value: f64) -> ConstId {
        self.intern_const(Constant::Float(value.to_bits()))
    }

    pub fn const_null(&mut self, ty: TypeId) -> ConstId {
        self.intern_const(Constant::Null(ty))
    }
}
