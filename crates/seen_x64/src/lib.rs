//! x64 target backing (§4.8, C11): the concrete `Target` implementation
//! `seen_codegen`'s lowering, legalization, register allocation, and
//! assembly printing are all written against, grounded throughout in
//! `original_source/OlaCompiler/Backend/Custom/Codegen/x64/x64Target.cpp`.

mod asm;
mod data_layout;
mod frame;
mod inst_info;
mod isel;
mod register_info;
pub mod registers;
mod target;

pub use asm::X64AsmPrinter;
pub use data_layout::X64DataLayout;
pub use frame::X64FrameInfo;
pub use inst_info::X64InstInfo;
pub use isel::X64ISelInfo;
pub use register_info::X64RegisterInfo;
pub use target::X64Target;
