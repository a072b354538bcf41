use crate::debugger::address::RelocatedAddress;
use crate::debugger::breakpoint::BreakpointRegistry;
use crate::debugger::error::Error;
use crate::debugger::error::Error::Ptrace;
use crate::debugger::tracer::Tracer;
use nix::unistd::Pid;
use std::mem;

/// Size of a single transfer unit, memory is read and written in 2-byte slices.
const SLICE_SIZE: usize = 2;
const SLICES_PER_WORD: usize = mem::size_of::<u64>() / SLICE_SIZE;
const SLICE_MASK: u64 = 0xffff;

/// Read 8 bytes at `addr` as four sequential 2-byte reads, assembled in little-endian order.
pub fn read_word(tracer: &impl Tracer, pid: Pid, addr: RelocatedAddress) -> Result<u64, Error> {
    (0..SLICES_PER_WORD).try_fold(0_u64, |word, i| {
        let slice = tracer
            .peek(pid, addr.as_usize() + i * SLICE_SIZE)
            .map_err(Ptrace)?
            & SLICE_MASK;
        Ok(word | slice << (i * SLICE_SIZE * 8))
    })
}

/// Write 8 bytes at `addr` as four sequential 2-byte writes.
/// Bytes after `addr + 8` stay untouched.
pub fn write_word(
    tracer: &impl Tracer,
    pid: Pid,
    addr: RelocatedAddress,
    value: u64,
) -> Result<(), Error> {
    (0..SLICES_PER_WORD).try_for_each(|i| {
        let slice_addr = addr.as_usize() + i * SLICE_SIZE;
        let slice = (value >> (i * SLICE_SIZE * 8)) & SLICE_MASK;
        let current = tracer.peek(pid, slice_addr).map_err(Ptrace)?;
        tracer
            .poke(pid, slice_addr, (current & !SLICE_MASK) | slice)
            .map_err(Ptrace)
    })
}

/// Read N bytes from debugee process.
pub fn read_bytes(
    tracer: &impl Tracer,
    pid: Pid,
    addr: RelocatedAddress,
    read_n: usize,
) -> Result<Vec<u8>, Error> {
    let word_size = mem::size_of::<u64>();
    let mut result = Vec::with_capacity(read_n + word_size);

    let mut offset = 0;
    while result.len() < read_n {
        let word = read_word(tracer, pid, addr.offset(offset as isize))?;
        result.extend(word.to_le_bytes());
        offset += word_size;
    }
    result.truncate(read_n);

    Ok(result)
}

/// Read N bytes from debugee process, bytes patched by enabled breakpoints
/// are replaced with original ones.
pub fn read_ignoring_breakpoints(
    tracer: &impl Tracer,
    pid: Pid,
    addr: RelocatedAddress,
    read_n: usize,
    breakpoints: &BreakpointRegistry,
) -> Result<Vec<u8>, Error> {
    let mut bytes = read_bytes(tracer, pid, addr, read_n)?;

    breakpoints
        .iter()
        .filter(|brkpt| brkpt.is_enabled())
        .filter(|brkpt| brkpt.addr >= addr && brkpt.addr.as_usize() < addr.as_usize() + read_n)
        .for_each(|brkpt| {
            let byte_idx = brkpt.addr.as_usize() - addr.as_usize();
            bytes[byte_idx] = brkpt.saved_byte();
        });

    Ok(bytes)
}
