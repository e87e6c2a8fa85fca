//! Checked memory accessors.
//!
//! Every multi-byte access is little-endian and validated against the slice
//! length, so an out-of-range address surfaces as [`FaultCode::AddressError`]
//! instead of touching memory outside the address space.

use crate::FaultCode;

/// Width in bytes of a quad-word (`u64`) access.
pub const QUAD_BYTES: usize = 8;

/// Reads one byte, yielding `0` for addresses outside `memory`.
#[must_use]
pub fn byte_at(memory: &[u8], addr: u64) -> u8 {
    usize::try_from(addr)
        .ok()
        .and_then(|index| memory.get(index))
        .copied()
        .unwrap_or(0)
}

fn quad_window(len: usize, addr: u64) -> Result<std::ops::Range<usize>, FaultCode> {
    let start = usize::try_from(addr).map_err(|_| FaultCode::AddressError)?;
    let end = start
        .checked_add(QUAD_BYTES)
        .ok_or(FaultCode::AddressError)?;
    if end > len {
        return Err(FaultCode::AddressError);
    }
    Ok(start..end)
}

/// Reads a little-endian quad word at `addr`.
///
/// # Errors
///
/// Returns [`FaultCode::AddressError`] when any of the eight bytes lies
/// outside `memory`.
pub fn read_u64_le(memory: &[u8], addr: u64) -> Result<u64, FaultCode> {
    let window = quad_window(memory.len(), addr)?;
    let mut bytes = [0u8; QUAD_BYTES];
    bytes.copy_from_slice(&memory[window]);
    Ok(u64::from_le_bytes(bytes))
}

/// Writes a little-endian quad word at `addr`.
///
/// # Errors
///
/// Returns [`FaultCode::AddressError`] when any of the eight bytes lies
/// outside `memory`; memory is left untouched in that case.
pub fn write_u64_le(memory: &mut [u8], addr: u64, value: u64) -> Result<(), FaultCode> {
    let window = quad_window(memory.len(), addr)?;
    memory[window].copy_from_slice(&value.to_le_bytes());
    Ok(())
}
