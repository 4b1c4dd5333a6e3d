//! x64 physical register ids and naming (§4.8/§4.9, grounded in
//! `original_source/.../x64/x64Target.cpp`'s `x64TargetRegisterInfo`). A
//! flat `u32` id space, general-purpose registers first, then the SSE
//! floating-point bank — [`seen_codegen::RegisterInfo::gp_registers`]/
//! `fp_registers` hand out slices of this space, in an order chosen so the
//! *last* entry of each class is the one `seen_regalloc` reserves as its
//! spill scratch register (§4.9 step 6's sibling concern — see DESIGN.md).

pub const RAX: u32 = 0;
pub const RBX: u32 = 1;
pub const RCX: u32 = 2;
pub const RDX: u32 = 3;
pub const RSI: u32 = 4;
pub const RDI: u32 = 5;
pub const R8: u32 = 6;
pub const R9: u32 = 7;
pub const R10: u32 = 8;
pub const R12: u32 = 9;
pub const R13: u32 = 10;
pub const R14: u32 = 11;
pub const R15: u32 = 12;
/// Last in `GP_REGISTERS`, so it is the allocator's reserved scratch.
pub const R11: u32 = 13;
pub const RSP: u32 = 14;
pub const RBP: u32 = 15;

pub const XMM_BASE: u32 = 16;
pub const XMM_COUNT: u32 = 16;
/// Last in `FP_REGISTERS`, reserved as the float scratch.
pub const XMM15: u32 = XMM_BASE + 15;

/// General-purpose pool `seen_regalloc` draws from (`RSP`/`RBP` are
/// reserved for the frame and never handed to the allocator). `R11` has the
/// highest numeric id of the fourteen, so `seen_regalloc::allocator`'s
/// pool-minus-highest-id reservation picks it out as the spill-fixup
/// scratch register without either side hardcoding which one that is.
pub const GP_REGISTERS: [u32; 14] = [RAX, RBX, RCX, RDX, RSI, RDI, R8, R9, R10, R12, R13, R14, R15, R11];

pub const FP_REGISTERS: [u32; 16] = [
    XMM_BASE,
    XMM_BASE + 1,
    XMM_BASE + 2,
    XMM_BASE + 3,
    XMM_BASE + 4,
    XMM_BASE + 5,
    XMM_BASE + 6,
    XMM_BASE + 7,
    XMM_BASE + 8,
    XMM_BASE + 9,
    XMM_BASE + 10,
    XMM_BASE + 11,
    XMM_BASE + 12,
    XMM_BASE + 13,
    XMM_BASE + 14,
    XMM15,
];

/// System V AMD64 integer-argument registers, in ABI order (§4.8: "the
/// first six integer parameters").
pub const INT_ARG_REGISTERS: [u32; 6] = [RDI, RSI, RDX, RCX, R8, R9];
pub const FLOAT_ARG_REGISTERS: [u32; 8] = [
    XMM_BASE,
    XMM_BASE + 1,
    XMM_BASE + 2,
    XMM_BASE + 3,
    XMM_BASE + 4,
    XMM_BASE + 5,
    XMM_BASE + 6,
    XMM_BASE + 7,
];

pub fn is_float_register(reg: u32) -> bool {
    reg >= XMM_BASE
}

/// System V callee-saved set: `RBX`, `R12`-`R15`, and the frame/stack
/// pointers. Every XMM register is caller-saved; the ABI defines no
/// callee-saved floating-point registers.
pub fn is_callee_saved(reg: u32) -> bool {
    matches!(reg, RBX | R12 | R13 | R14 | R15 | RBP | RSP)
}

pub fn is_caller_saved(reg: u32) -> bool {
    !is_callee_saved(reg)
}

/// AT&T-syntax register name at the given operand width (§6.3).
pub fn register_name(reg: u32, width: seen_codegen::OperandWidth) -> String {
    use seen_codegen::OperandWidth::*;
    if is_float_register(reg) {
        return format!("%xmm{}", reg - XMM_BASE);
    }
    let names64 = ["rax", "rbx", "rcx", "rdx", "rsi", "rdi", "r8", "r9", "r10", "r12", "r13", "r14", "r15", "r11", "rsp", "rbp"];
    let names32 = ["eax", "ebx", "ecx", "edx", "esi", "edi", "r8d", "r9d", "r10d", "r12d", "r13d", "r14d", "r15d", "r11d", "esp", "ebp"];
    let names8 = ["al", "bl", "cl", "dl", "sil", "dil", "r8b", "r9b", "r10b", "r12b", "r13b", "r14b", "r15b", "r11b", "spl", "bpl"];
    let idx = reg as usize;
    let table = match width {
        Int64 | Float64 => &names64,
        Int32 | Float32 => &names32,
        Int16 => &names32,
        Int8 | Int1 => &names8,
    };
    format!("%{}", table[idx])
}
