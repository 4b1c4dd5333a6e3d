//! Wires the five descriptor traits into one `Target` (§4.8, C11), grounded
//! in `x64Target::GetDataLayout`/`GetInstInfo`/`GetRegisterInfo`/
//! `GetISelInfo`/`GetFrameInfo`/`EmitAssembly` from
//! `original_source/.../x64/x64Target.cpp` — the original hands these out
//! as function-local static singletons; design notes §9 forbid that
//! pattern here, so `X64Target` owns each sub-descriptor as a plain field
//! and is itself passed around as `&dyn Target`.

use seen_codegen::{AsmPrinter, DataLayout, FrameInfo, ISelInfo, InstInfo, RegisterInfo, Target};

use crate::asm::X64AsmPrinter;
use crate::data_layout::X64DataLayout;
use crate::frame::X64FrameInfo;
use crate::inst_info::X64InstInfo;
use crate::isel::X64ISelInfo;
use crate::register_info::X64RegisterInfo;

#[derive(Debug, Default)]
pub struct X64Target {
    data_layout: X64DataLayout,
    register_info: X64RegisterInfo,
    inst_info: X64InstInfo,
    frame_info: X64FrameInfo,
    isel_info: X64ISelInfo,
    asm_printer: X64AsmPrinter,
}

impl Target for X64Target {
    fn data_layout(&self) -> &dyn DataLayout {
        &self.data_layout
    }

    fn register_info(&self) -> &dyn RegisterInfo {
        &self.register_info
    }

    fn inst_info(&self) -> &dyn InstInfo {
        &self.inst_info
    }

    fn frame_info(&self) -> &dyn FrameInfo {
        &self.frame_info
    }

    fn isel_info(&self) -> &dyn ISelInfo {
        &self.isel_info
    }

    fn asm_printer(&self) -> &dyn AsmPrinter {
        &self.asm_printer
    }
}
