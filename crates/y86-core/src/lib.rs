//! Core emulator crate for the Y86-64 instruction set.
//!
//! The crate models a flat 4 KiB address space, the fifteen-register Y86-64
//! CPU, the variable-length instruction decoder, a disassembler, and the
//! two-stage sequential executor driven by [`run`] and [`run_traced`].

/// Fault taxonomy types.
pub mod fault;
pub use fault::FaultCode;

/// Memory model primitives.
pub mod memory;
pub use memory::{
    byte_at, in_bounds, new_address_space, read_u64_le, write_u64_le, MEMSIZE, QUAD_BYTES,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{CpuState, Register, RegisterFile, Status, REGISTER_COUNT};

/// Deterministic opcode and function-code classification tables.
pub mod encoding;
pub use encoding::{AluOp, Condition, Opcode, TrapKind, OPCODE_TABLE};

/// Instruction decode with field extraction and validation.
pub mod decoder;
pub use decoder::{fetch, Decoder, FetchResult, Instruction};

/// Program segment descriptors.
pub mod segment;
pub use segment::{ProgramHeader, SegmentFlags, SegmentType};

/// Instruction and segment disassembly.
pub mod disasm;
pub use disasm::{
    alt_hex, disassemble_code, disassemble_data, disassemble_rodata, CodeListing,
    DisassemblyRow, InvalidOpcode,
};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{alu, condition_holds, decode_execute, memory_wb_pc, ExecuteState, FlagsUpdate};

/// Driver loop and trace hooks.
pub mod runner;
pub use runner::{run, run_traced, step, RunSummary, StepRecord, TextTrace, TraceEvent, TraceSink};

#[cfg(test)]
use proptest as _;
