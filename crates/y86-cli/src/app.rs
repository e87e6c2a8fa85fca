//! Report orchestration: dumps, disassembly and execution in fixed order.

use std::io::Write;

use tracing::info;
use y86_core::{
    disassemble_code, disassemble_data, disassemble_rodata, run, run_traced, CpuState,
    SegmentType, TextTrace, MEMSIZE,
};

use crate::cli::{Execution, MemoryDump, Options};
use crate::dump::{dump_header, dump_memory, dump_phdrs};
use crate::elf::MiniElf;
use crate::errors::CliError;

/// Loads `options.file` and writes every requested report to `out`.
///
/// # Errors
///
/// Returns [`CliError::Elf`] when the file is rejected (nothing is written in
/// that case) and [`CliError::Output`] when writing fails.
pub fn run_options<W: Write>(options: &Options, out: &mut W) -> Result<(), CliError> {
    let mut image = MiniElf::open(&options.file)?;
    report(options, &mut image, out)
}

/// Writes every requested report for an already loaded image.
///
/// # Errors
///
/// Returns [`CliError::Output`] when writing fails.
pub fn report<W: Write>(
    options: &Options,
    image: &mut MiniElf,
    out: &mut W,
) -> Result<(), CliError> {
    if options.header {
        dump_header(out, &image.header)?;
    }
    if options.phdrs {
        dump_phdrs(out, &image.phdrs)?;
    }
    match options.memory {
        MemoryDump::Full => dump_memory(out, &image.memory, 0, MEMSIZE as u64)?,
        MemoryDump::Brief => {
            for phdr in &image.phdrs {
                dump_memory(out, &image.memory, phdr.vaddr.into(), phdr.end())?;
            }
        }
        MemoryDump::None => {}
    }

    let entry = u64::from(image.header.entry);
    if options.disassemble_code {
        writeln!(out, "Disassembly of executable contents:")?;
        for phdr in image
            .phdrs
            .iter()
            .filter(|phdr| phdr.segment_type == SegmentType::Code)
        {
            disassemble_code(out, &image.memory, phdr, entry)?;
        }
    }
    if options.disassemble_data {
        writeln!(out, "Disassembly of data contents:")?;
        for phdr in &image.phdrs {
            if phdr.is_rw_data() {
                disassemble_data(out, &image.memory, phdr)?;
            } else if phdr.is_ro_data() {
                disassemble_rodata(out, &image.memory, phdr)?;
            }
        }
    }

    match options.execution {
        Execution::Silent => {
            writeln!(out, "Beginning execution at 0x{entry:04x}")?;
            let mut cpu = CpuState::new(entry);
            let summary = run(&mut cpu, &mut image.memory);
            info!(status = ?cpu.status, instructions = summary.instructions, "run finished");
            write!(out, "{cpu}")?;
            writeln!(out, "Total execution count: {}", summary.instructions)?;
        }
        Execution::Traced => {
            writeln!(out, "Beginning execution at 0x{entry:04x}")?;
            let mut cpu = CpuState::new(entry);
            let mut trace = TextTrace::new(&mut *out);
            let summary = run_traced(&mut cpu, &mut image.memory, &mut trace);
            trace.finish()?;
            info!(status = ?cpu.status, instructions = summary.instructions, "traced run finished");
            write!(out, "{cpu}")?;
            writeln!(out, "Total execution count: {}\n", summary.instructions)?;
            dump_memory(out, &image.memory, 0, MEMSIZE as u64)?;
        }
        Execution::None => {}
    }
    Ok(())
}
