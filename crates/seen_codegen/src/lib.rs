//! Target-independent lowering to machine IR (§4.7–§4.8, C8–C9): the MIR
//! entity model, the lowering framework that walks a finished
//! [`seen_ir::Module`] block-by-block, and the target description traits a
//! concrete backend (`seen_x64`) implements.

pub mod instruction;
pub mod lowering;
pub mod module;
pub mod operand;
pub mod target;

pub use instruction::{MachineInstruction, MachineOpcode, MachineOperandList};
pub use lowering::{lower_module, LoweringCx};
pub use module::{MirBasicBlock, MirDataStorage, MirFunction, MirGlobal, MirGlobalId, MirModule, MirZeroStorage, StackSlot};
pub use operand::{MachineOperand, MirBlockId, OperandWidth, StackSlotId, VRegId};
pub use target::{width_of_type, AsmPrinter, DataLayout, FrameInfo, ISelInfo, InstInfo, RegisterInfo, Target};
