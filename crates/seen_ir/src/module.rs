//! Modules (§3.2, §3.6). A module owns every function and global value
//! built against one [`Context`](crate::context::Context); it is the unit
//! the printer, pass manager, and lowering framework operate on.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::function::{FunctionData, Linkage};
use crate::types::TypeId;
use crate::value::{ConstId, UseGraph, ValueRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalId(pub(crate) u32);

impl GlobalId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub(crate) u32);

impl FunctionId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalValueData {
    pub name: String,
    pub linkage: Linkage,
    /// The type of the pointee, not of the pointer itself (every global is
    /// addressed through a `Pointer`-typed `ValueRef::Global`).
    pub value_type: TypeId,
    pub initializer: Option<ConstId>,
    pub mutable: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub functions: Vec<FunctionData>,
    pub globals: Vec<GlobalValueData>,
    function_table: HashMap<String, FunctionId>,
    global_table: HashMap<String, GlobalId>,
    #[serde(skip)]
    pub global_uses: UseGraph,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        linkage: Linkage,
        return_type: TypeId,
        param_types: Vec<TypeId>,
    ) -> FunctionId {
        let name = name.into();
        if let Some(id) = self.function_table.get(&name) {
            return *id;
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(FunctionData::new(name.clone(), linkage, return_type, param_types));
        self.function_table.insert(name, id);
        id
    }

    pub fn function(&self, id: FunctionId) -> &FunctionData {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionData {
        &mut self.functions[id.0 as usize]
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.function_table.get(name).copied()
    }

    pub fn declare_global(
        &mut self,
        name: impl Into<String>,
        linkage: Linkage,
        value_type: TypeId,
        initializer: Option<ConstId>,
        mutable: bool,
    ) -> GlobalId {
        let name = name.into();
        if let Some(id) = self.global_table.get(&name) {
            return *id;
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalValueData {
            name: name.clone(),
            linkage,
            value_type,
            initializer,
            mutable,
        });
        self.global_table.insert(name, id);
        id
    }

    pub fn global(&self, id: GlobalId) -> &GlobalValueData {
        &self.globals[id.0 as usize]
    }

    pub fn global_ids(&self) -> impl Iterator<Item = GlobalId> {
        (0..self.globals.len() as u32).map(GlobalId)
    }

    pub fn find_global(&self, name: &str) -> Option<GlobalId> {
        self.global_table.get(name).copied()
    }

    pub fn global_ref(&self, id: GlobalId) -> ValueRef {
        ValueRef::Global(id)
    }
}
