//! Text dumps of the Mini-ELF header, program headers and memory.

use std::io::{self, Write};

use y86_core::{alt_hex, byte_at, ProgramHeader, SegmentType};

use crate::elf::{ElfHeader, HEADER_SIZE};

/// Writes the raw header bytes followed by a description of each field.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn dump_header<W: Write + ?Sized>(out: &mut W, header: &ElfHeader) -> io::Result<()> {
    for (i, byte) in header.to_bytes().iter().enumerate() {
        if i == 8 {
            write!(out, " ")?;
        }
        write!(out, "{byte:02x}")?;
        if i != HEADER_SIZE - 1 {
            write!(out, " ")?;
        }
    }
    writeln!(out)?;
    writeln!(out, "Mini-ELF version {}", header.version)?;
    writeln!(out, "Entry point {}", alt_hex(header.entry.into()))?;
    writeln!(
        out,
        "There are {} program headers, starting at offset {} ({})",
        header.num_phdr,
        header.phdr_start,
        alt_hex(header.phdr_start.into())
    )?;
    table_line(out, "symbol", header.symtab)?;
    table_line(out, "string", header.strtab)
}

fn table_line<W: Write + ?Sized>(out: &mut W, kind: &str, offset: u16) -> io::Result<()> {
    if offset == 0 {
        writeln!(out, "There is no {kind} table present")
    } else {
        writeln!(
            out,
            "There is a {kind} table starting at offset {offset} ({})",
            alt_hex(offset.into())
        )
    }
}

const fn type_label(segment_type: SegmentType) -> &'static str {
    match segment_type {
        SegmentType::Data => "DATA      ",
        SegmentType::Code => "CODE      ",
        SegmentType::Stack => "STACK     ",
        SegmentType::Heap => "HEAP      ",
        SegmentType::Unknown(_) => "UNKNOWN",
    }
}

/// Writes the program header table.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn dump_phdrs<W: Write + ?Sized>(out: &mut W, phdrs: &[ProgramHeader]) -> io::Result<()> {
    writeln!(out, " Segment   Offset    Size      VirtAddr  Type      Flags")?;
    for (i, phdr) in phdrs.iter().enumerate() {
        writeln!(
            out,
            "  {i:02}       0x{:04x}    0x{:04x}    0x{:04x}    {}{}",
            phdr.offset,
            phdr.size,
            phdr.vaddr,
            type_label(phdr.segment_type),
            phdr.flags
        )?;
    }
    Ok(())
}

/// Writes `memory[start..end]` as rows of sixteen hex bytes.
///
/// Rows are aligned down to a multiple of sixteen; zero bytes that precede
/// `start` on the first row are blanked.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn dump_memory<W: Write + ?Sized>(
    out: &mut W,
    memory: &[u8],
    start: u64,
    end: u64,
) -> io::Result<()> {
    writeln!(out, "Contents of memory from {start:04x} to {end:04x}:")?;
    if start == end {
        return Ok(());
    }
    let row_start = start & !0xF;
    write!(out, "  {row_start:04x} ")?;

    let mut total = 0u64;
    let mut on_row = 0u64;
    for addr in row_start..end {
        if total % 8 == 0 && on_row <= 15 {
            write!(out, " ")?;
        }
        if total % 16 == 0 && total != 0 {
            write!(out, "\n  {addr:04x}  ")?;
            on_row = 0;
        }
        let byte = byte_at(memory, addr);
        if byte == 0 && addr < start {
            write!(out, "  ")?;
        } else {
            write!(out, "{byte:02x}")?;
        }
        if on_row != 15 && addr + 1 != end {
            write!(out, " ")?;
        }
        on_row += 1;
        total += 1;
    }
    writeln!(out)
}
