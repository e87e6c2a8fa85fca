//! Instruction and segment disassembly for the Y86-64 ISA.
//!
//! [`Instruction`] renders its assembly text through [`fmt::Display`]. The
//! segment-level helpers write the fixed-column listing format, with raw
//! bytes on the left and assembly on the right of a `|` separator.

use std::fmt;
use std::io::{self, Write};

use crate::decoder::{Decoder, Instruction};
use crate::encoding::Opcode;
use crate::memory::{byte_at, QUAD_BYTES};
use crate::segment::ProgramHeader;
use crate::state::Register;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw-byte columns reserved on every listing line.
const BYTE_COLUMNS: i64 = 8;
/// Raw bytes shown on one rodata line.
const RODATA_BYTES_PER_LINE: u64 = 10;

/// Hex rendering where zero prints as `0` and anything else as `0x..`.
struct AltHex(u64);

impl fmt::Display for AltHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("0")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

/// Formats `value` the way listings and dumps print addresses (`0` or `0x..`).
#[must_use]
pub fn alt_hex(value: u64) -> String {
    AltHex(value).to_string()
}

/// Padding that fills the unused byte columns: three spaces per missing byte
/// plus two spare columns, never negative.
fn byte_padding(remaining: i64) -> String {
    let columns = usize::try_from(remaining + 2).unwrap_or(0);
    " ".repeat(columns * 3)
}

impl fmt::Display for Instruction {
    /// Renders assembly text; invalid instructions and unassigned function
    /// codes render as nothing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ra, rb) = (self.ra, self.rb);
        match self.opcode {
            Opcode::Halt => f.write_str("halt"),
            Opcode::Nop => f.write_str("nop"),
            Opcode::Cmov => match self.condition() {
                Some(cond) => write!(f, "{} {ra}, {rb}", cond.cmov_mnemonic()),
                None => Ok(()),
            },
            Opcode::Irmovq => write!(f, "irmovq {:#x}, {rb}", self.val_c),
            Opcode::Rmmovq if rb == Register::NoReg => {
                write!(f, "rmmovq {ra}, {}", AltHex(self.val_c))
            }
            Opcode::Rmmovq => write!(f, "rmmovq {ra}, 0x{:x}({rb})", self.val_c),
            Opcode::Mrmovq if rb == Register::NoReg => {
                write!(f, "mrmovq {}, {ra}", AltHex(self.val_c))
            }
            Opcode::Mrmovq => write!(f, "mrmovq 0x{:x}({rb}), {ra}", self.val_c),
            Opcode::Opq => match self.alu_op() {
                Some(op) => write!(f, "{} {ra}, {rb}", op.mnemonic()),
                None => Ok(()),
            },
            Opcode::Jump => match self.condition() {
                Some(cond) => write!(f, "{} {}", cond.jump_mnemonic(), AltHex(self.val_c)),
                None => Ok(()),
            },
            Opcode::Call => write!(f, "call {}", AltHex(self.val_c)),
            Opcode::Ret => f.write_str("ret"),
            Opcode::Pushq => write!(f, "pushq {ra}"),
            Opcode::Popq => write!(f, "popq {ra}"),
            Opcode::Iotrap => write!(f, "iotrap {}", self.ifun),
            Opcode::Invalid => Ok(()),
        }
    }
}

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the first instruction byte.
    pub address: u64,
    /// Raw encoded bytes.
    pub bytes: Vec<u8>,
    /// Assembly text.
    pub text: String,
    /// Whether this row starts at the program entry point.
    pub is_entry: bool,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_entry {
            writeln!(f, "{}", EntryMarker(self.address))?;
        }
        write!(f, "  0x{:03x}: ", self.address)?;
        for byte in &self.bytes {
            write!(f, "{byte:02x} ")?;
        }
        let width = i64::try_from(self.bytes.len()).unwrap_or(BYTE_COLUMNS);
        write!(f, "{}|   {}", byte_padding(BYTE_COLUMNS - width), self.text)
    }
}

struct EntryMarker(u64);

impl fmt::Display for EntryMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  0x{:03x}:{:31}| _start:", self.0, "")
    }
}

/// The instruction byte that stopped a code listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InvalidOpcode {
    /// Address of the rejected instruction.
    pub address: u64,
    /// Decoded function nibble of the rejected instruction.
    pub ifun: u8,
    /// Whether the rejected instruction sits at the entry point.
    pub is_entry: bool,
}

/// Structured disassembly of one code segment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeListing {
    /// Segment load address.
    pub vaddr: u64,
    /// Successfully decoded rows, in address order.
    pub rows: Vec<DisassemblyRow>,
    /// First invalid instruction, which ends the listing.
    pub invalid: Option<InvalidOpcode>,
}

impl CodeListing {
    /// Decodes the code segment described by `phdr`, stopping at the first
    /// instruction that fails to decode.
    #[must_use]
    pub fn decode(memory: &[u8], phdr: &ProgramHeader, entry: u64) -> Self {
        let vaddr = u64::from(phdr.vaddr);
        let end = phdr.end();
        let mut rows = Vec::new();
        let mut invalid = None;
        let mut pc = vaddr;

        while pc < end {
            let result = Decoder::decode(pc, memory);
            if result.fault.is_some() {
                invalid = Some(InvalidOpcode {
                    address: pc,
                    ifun: result.instruction.ifun,
                    is_entry: pc == entry,
                });
                break;
            }
            let instruction = result.instruction;
            rows.push(DisassemblyRow {
                address: pc,
                bytes: (pc..instruction.val_p)
                    .map(|addr| byte_at(memory, addr))
                    .collect(),
                text: instruction.to_string(),
                is_entry: pc == entry,
            });
            pc = instruction.val_p;
        }

        Self {
            vaddr,
            rows,
            invalid,
        }
    }
}

impl fmt::Display for CodeListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  0x{:03x}:{:30} | .pos 0x{:03x} code", self.vaddr, "", self.vaddr)?;
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        if let Some(invalid) = self.invalid {
            if invalid.is_entry {
                writeln!(f, "{}", EntryMarker(invalid.address))?;
            }
            return write!(f, "Invalid opcode: 0x{:x}f\n\n", invalid.ifun);
        }
        writeln!(f)
    }
}

/// Writes the listing of a code segment.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn disassemble_code<W: Write + ?Sized>(
    out: &mut W,
    memory: &[u8],
    phdr: &ProgramHeader,
    entry: u64,
) -> io::Result<()> {
    write!(out, "{}", CodeListing::decode(memory, phdr, entry))
}

fn read_quad(memory: &[u8], addr: u64) -> [u8; QUAD_BYTES] {
    let mut bytes = [0u8; QUAD_BYTES];
    for (offset, byte) in (0u64..).zip(bytes.iter_mut()) {
        *byte = byte_at(memory, addr + offset);
    }
    bytes
}

/// Writes a read-write data segment as a sequence of `.quad` lines.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn disassemble_data<W: Write + ?Sized>(
    out: &mut W,
    memory: &[u8],
    phdr: &ProgramHeader,
) -> io::Result<()> {
    let mut pc = u64::from(phdr.vaddr);
    writeln!(out, "  0x{pc:03x}:{:30} | .pos 0x{pc:03x} data", "")?;
    while pc < phdr.end() {
        let quad = read_quad(memory, pc);
        write!(out, "  0x{pc:03x}: ")?;
        for byte in quad {
            write!(out, "{byte:02x} ")?;
        }
        writeln!(out, "{:6}|   .quad 0x{:x}", "", u64::from_le_bytes(quad))?;
        pc += QUAD_BYTES as u64;
    }
    writeln!(out)
}

/// Writes a read-only data segment as a sequence of `.string` lines.
///
/// Each string shows at most ten raw bytes on its first line; longer strings
/// spill onto continuation lines of ten bytes. The column padding counter is
/// shared across strings within a segment.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn disassemble_rodata<W: Write + ?Sized>(
    out: &mut W,
    memory: &[u8],
    phdr: &ProgramHeader,
) -> io::Result<()> {
    let mut pc = u64::from(phdr.vaddr);
    let mut padding = BYTE_COLUMNS;
    writeln!(out, "  0x{pc:03x}:{:30} | .pos 0x{pc:03x} rodata", "")?;

    while pc < phdr.end() {
        let mut finished = false;
        write!(out, "  0x{pc:03x}: ")?;
        for addr in pc..pc + RODATA_BYTES_PER_LINE {
            let byte = byte_at(memory, addr);
            write!(out, "{byte:02x} ")?;
            padding -= 1;
            if byte == 0 {
                finished = true;
                out.write_all(byte_padding(padding).as_bytes())?;
                padding = BYTE_COLUMNS;
                break;
            }
        }

        let text: Vec<u8> = (pc..)
            .map(|addr| byte_at(memory, addr))
            .take_while(|byte| *byte != 0)
            .collect();
        out.write_all(b"|   .string \"")?;
        out.write_all(&text)?;
        out.write_all(b"\"")?;

        if !finished {
            padding = BYTE_COLUMNS - 1;
            let mut counter = pc + RODATA_BYTES_PER_LINE;
            let mut printed = 0u64;
            write!(out, "\n  0x{counter:03x}: ")?;
            loop {
                let byte = byte_at(memory, counter);
                if byte == 0 {
                    break;
                }
                write!(out, "{byte:02x} ")?;
                counter += 1;
                padding -= 1;
                printed += 1;
                if printed % RODATA_BYTES_PER_LINE == 0 {
                    write!(out, "| \n  0x{counter:03x}: ")?;
                    padding = BYTE_COLUMNS - 1;
                }
            }
            write!(out, "{:02x}{} | ", byte_at(memory, counter), byte_padding(padding))?;
        }
        writeln!(out)?;
        pc += text.len() as u64 + 1;
    }
    writeln!(out)
}
