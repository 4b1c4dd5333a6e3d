//! §4.8: opcode metadata. Every query the trait exposes already has a
//! sensible default forwarding to [`seen_codegen::MachineOpcode`]'s own
//! classification methods; x64 has no opcode whose metadata differs from
//! that default, so this is an empty marker implementation (mirrors
//! `x64TargetInstInfo` in the original, which likewise adds nothing beyond
//! the base `TargetInstInfo`).

use seen_codegen::InstInfo;

#[derive(Debug, Default)]
pub struct X64InstInfo;

impl InstInfo for X64InstInfo {}
