//! Memory model primitives for the flat simulated address space.

/// Bounds-checked byte and little-endian quad accessors.
pub mod access;

pub use access::{byte_at, read_u64_le, write_u64_le, QUAD_BYTES};

/// Size in bytes of the flat architectural address space (4 KiB).
pub const MEMSIZE: usize = 4096;

/// Allocates a canonical zeroed 4 KiB address-space backing store.
#[must_use]
pub fn new_address_space() -> Box<[u8]> {
    vec![0; MEMSIZE].into_boxed_slice()
}

/// Returns `true` when `addr` lies inside `memory`.
#[must_use]
pub fn in_bounds(memory: &[u8], addr: u64) -> bool {
    usize::try_from(addr).is_ok_and(|addr| addr < memory.len())
}
