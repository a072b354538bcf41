/// Process breakpoint
pub const TRAP_BRKPT: i32 = 0x1;
/// Process trace trap
pub const TRAP_TRACE: i32 = 0x2;
/// Sent by the kernel from somewhere
pub const SI_KERNEL: i32 = 0x80;
/// Address not mapped to object
pub const SEGV_MAPERR: i32 = 0x1;
/// Invalid permissions for mapped object
pub const SEGV_ACCERR: i32 = 0x2;

/// x86 `int3` opcode.
pub const INT3: u8 = 0xCC;

/// Human readable reason of a `SIGSEGV`.
pub fn segv_reason(code: i32) -> &'static str {
    match code {
        SEGV_MAPERR => "address not mapped to object",
        SEGV_ACCERR => "invalid permissions for mapped object",
        SI_KERNEL => "general protection",
        _ => "unknown reason",
    }
}
