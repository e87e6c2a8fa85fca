//! Architectural CPU state model primitives.

/// Complete CPU state and its textual dump.
pub mod cpu;
/// Register identifiers and register file storage.
pub mod registers;
/// Execution status machine.
pub mod run_state;

pub use cpu::CpuState;
pub use registers::{Register, RegisterFile, REGISTER_COUNT};
pub use run_state::Status;
