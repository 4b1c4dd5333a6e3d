//! §4.8: little-endian, 8-byte pointers, 8-byte code/storage alignment —
//! grounded in `original_source/.../x64Target.cpp`'s `x64TargetDataLayout`.

use seen_codegen::DataLayout;

#[derive(Debug, Default)]
pub struct X64DataLayout;

impl DataLayout for X64DataLayout {
    fn is_little_endian(&self) -> bool {
        true
    }

    fn pointer_size(&self) -> u64 {
        8
    }

    fn storage_align(&self) -> u64 {
        8
    }

    fn code_align(&self) -> u64 {
        8
    }
}
