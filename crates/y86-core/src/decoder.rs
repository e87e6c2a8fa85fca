//! Instruction decoder for the Y86-64 ISA.
//!
//! Decoding is pure: [`Decoder::decode`] reads the encoding at a program
//! counter and reports any fault alongside the decoded fields. [`fetch`] is
//! the stateful wrapper used by the driver, which latches the fault into the
//! CPU status.

use crate::encoding::{AluOp, Condition, Opcode, TrapKind};
use crate::fault::FaultCode;
use crate::memory::{byte_at, QUAD_BYTES};
use crate::state::{CpuState, Register};

/// Decoded instruction with all extracted fields.
///
/// `val_c` is a single 64-bit payload whose meaning depends on the opcode:
/// the immediate for `irmovq`, the displacement for `rmmovq`/`mrmovq`, the
/// absolute destination for jumps and `call`, and zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Instruction class, or [`Opcode::Invalid`] after a failed decode.
    pub opcode: Opcode,
    /// Function nibble. Forced to `0xF` when the opcode nibble is
    /// unassigned and to 0 for `call`, `ret`, `pushq` and `popq`, which
    /// carry no function code.
    pub ifun: u8,
    /// First register operand.
    pub ra: Register,
    /// Second register operand.
    pub rb: Register,
    /// Constant payload (immediate, displacement, or destination).
    pub val_c: u64,
    /// Address of the following instruction.
    pub val_p: u64,
}

impl Instruction {
    /// Condition code view of `ifun` for `cmovXX` and `jXX`.
    #[must_use]
    pub const fn condition(&self) -> Option<Condition> {
        Condition::from_ifun(self.ifun)
    }

    /// ALU operation view of `ifun` for `OPq`.
    #[must_use]
    pub const fn alu_op(&self) -> Option<AluOp> {
        AluOp::from_ifun(self.ifun)
    }

    /// Trap selector view of `ifun` for `iotrap`.
    #[must_use]
    pub const fn trap(&self) -> Option<TrapKind> {
        TrapKind::from_ifun(self.ifun)
    }

    /// Returns `true` unless decoding failed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.opcode, Opcode::Invalid)
    }
}

/// Result of decoding the instruction at one program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchResult {
    /// Decoded fields; `opcode` is [`Opcode::Invalid`] whenever `fault` is set.
    pub instruction: Instruction,
    /// Fault raised by the decode, if any.
    pub fault: Option<FaultCode>,
}

impl FetchResult {
    /// Converts the result into a `Result`, discarding partial fields on fault.
    ///
    /// # Errors
    ///
    /// Returns the fault when decoding failed.
    pub const fn into_result(self) -> Result<Instruction, FaultCode> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self.instruction),
        }
    }
}

/// Instruction decoder for the Y86-64 ISA.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

fn read_constant(memory: &[u8], addr: u64) -> u64 {
    let mut bytes = [0u8; QUAD_BYTES];
    for (offset, byte) in (0u64..).zip(bytes.iter_mut()) {
        *byte = byte_at(memory, addr.wrapping_add(offset));
    }
    u64::from_le_bytes(bytes)
}

impl Decoder {
    /// Decodes the instruction at `pc`.
    ///
    /// Validation failures yield [`FaultCode::InvalidInstruction`]. An
    /// encoding that would run past the address space yields
    /// [`FaultCode::AddressError`], which takes precedence. Bytes outside
    /// `memory` read as zero, so decoding never panics.
    #[must_use]
    pub fn decode(pc: u64, memory: &[u8]) -> FetchResult {
        let capacity = memory.len() as u64;
        let first = byte_at(memory, pc);
        let opcode = Opcode::from_nibble(first >> 4);
        let ifun = first & 0x0F;

        let mut instruction = Instruction {
            opcode,
            ifun,
            ra: Register::NoReg,
            rb: Register::NoReg,
            val_c: 0,
            val_p: pc.wrapping_add(opcode.length()),
        };

        let reg_byte = byte_at(memory, pc.wrapping_add(1));
        let ra_id = reg_byte >> 4;
        let rb_id = reg_byte & 0x0F;
        let noreg = Register::NoReg.id();

        let valid = match opcode {
            Opcode::Halt | Opcode::Nop | Opcode::Ret | Opcode::Call => ifun == 0,
            Opcode::Cmov => ra_id < noreg && rb_id < noreg && instruction.condition().is_some(),
            Opcode::Irmovq => ra_id == noreg && rb_id < noreg && ifun == 0,
            Opcode::Rmmovq => ra_id <= noreg && rb_id <= noreg && ifun == 0,
            Opcode::Mrmovq => ra_id < noreg && ifun == 0,
            Opcode::Opq => ra_id <= noreg && rb_id <= noreg && instruction.alu_op().is_some(),
            Opcode::Jump => instruction.condition().is_some(),
            Opcode::Pushq => rb_id == noreg && ra_id < noreg && ifun == 0,
            Opcode::Popq => rb_id == noreg && ra_id <= noreg && ifun == 0,
            Opcode::Iotrap => instruction.trap().is_some(),
            Opcode::Invalid => {
                instruction.ifun = 0xF;
                instruction.val_p = 0;
                false
            }
        };

        if matches!(
            opcode,
            Opcode::Call | Opcode::Ret | Opcode::Pushq | Opcode::Popq
        ) {
            instruction.ifun = 0;
        }
        if opcode.has_register_byte() {
            instruction.ra = Register::from_nibble(ra_id);
            instruction.rb = Register::from_nibble(rb_id);
        }
        // irmovq with a bad register byte never reads its immediate.
        if valid || opcode != Opcode::Irmovq {
            if let Some(offset) = opcode.constant_offset() {
                instruction.val_c = read_constant(memory, pc.wrapping_add(offset));
            }
        }

        let mut fault = (!valid).then_some(FaultCode::InvalidInstruction);
        if pc.saturating_add(instruction.val_p) >= capacity {
            fault = Some(FaultCode::AddressError);
        }
        if fault.is_some() {
            instruction.opcode = Opcode::Invalid;
        }

        FetchResult { instruction, fault }
    }
}

/// Fetches and decodes the instruction at `cpu.pc`.
///
/// A decode fault is latched into `cpu.status`; the program counter is not
/// modified.
pub fn fetch(cpu: &mut CpuState, memory: &[u8]) -> Instruction {
    let FetchResult { instruction, fault } = Decoder::decode(cpu.pc, memory);
    if let Some(fault) = fault {
        cpu.raise(fault.into());
    }
    instruction
}
