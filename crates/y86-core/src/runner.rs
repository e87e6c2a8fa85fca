//! Fetch/execute driver loop and trace hooks.

use std::io;

use tracing::{debug, trace};

use crate::decoder::{fetch, Instruction};
use crate::encoding::Opcode;
use crate::execute::{decode_execute, memory_wb_pc};
use crate::memory::in_bounds;
use crate::state::{CpuState, Status};

/// Deterministic trace events emitted by [`run_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent<'a> {
    /// CPU state before the next fetch.
    StepStart(&'a CpuState),
    /// The fetched instruction is about to execute.
    Executing(&'a Instruction),
    /// The fetch at `pc` produced an invalid instruction.
    InvalidInstruction {
        /// Address of the rejected fetch.
        pc: u64,
    },
}

/// Sink trait for trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent<'_>);
}

/// Trace sink that renders events as text.
///
/// The first write error is latched and every later event is dropped;
/// [`TextTrace::finish`] reports it.
#[derive(Debug)]
pub struct TextTrace<W: io::Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: io::Write> TextTrace<W> {
    /// Wraps a writer.
    pub const fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// Returns the writer, or the first write error encountered.
    ///
    /// # Errors
    ///
    /// Returns the latched write error, if any.
    pub fn finish(self) -> io::Result<W> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.out),
        }
    }

    fn render(&mut self, event: TraceEvent<'_>) -> io::Result<()> {
        match event {
            TraceEvent::StepStart(cpu) => write!(self.out, "{cpu}"),
            TraceEvent::Executing(inst) => write!(self.out, "\nExecuting: {inst}\n"),
            TraceEvent::InvalidInstruction { pc } => {
                write!(self.out, "\nInvalid instruction at 0x{pc:04x}\n")
            }
        }
    }
}

impl<W: io::Write> TraceSink for TextTrace<W> {
    fn on_event(&mut self, event: TraceEvent<'_>) {
        if self.error.is_none() {
            if let Err(error) = self.render(event) {
                self.error = Some(error);
            }
        }
    }
}

/// Outcome of a single fetch/execute iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    /// The instruction as fetched.
    pub instruction: Instruction,
    /// Whether the iteration counts toward the executed-instruction total.
    pub counted: bool,
}

/// Totals reported when a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Executed instructions, excluding fetches rejected as invalid.
    pub instructions: u64,
    /// The last instruction fetched, if any.
    pub last: Option<Instruction>,
}

struct SilentSink;

impl TraceSink for SilentSink {
    fn on_event(&mut self, _event: TraceEvent<'_>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Silent,
    Traced,
}

fn step_with(cpu: &mut CpuState, memory: &mut [u8], sink: &mut dyn TraceSink) -> StepRecord {
    let pc = cpu.pc;
    let instruction = fetch(cpu, memory);
    let counted = cpu.status != Status::InvalidInstruction;
    if counted {
        sink.on_event(TraceEvent::Executing(&instruction));
    } else {
        sink.on_event(TraceEvent::InvalidInstruction { pc });
    }
    trace!(pc, opcode = ?instruction.opcode, "step");

    let exec = decode_execute(cpu, &instruction);
    memory_wb_pc(cpu, &instruction, memory, &exec);
    if !in_bounds(memory, cpu.pc) {
        cpu.raise(Status::AddressError);
    }

    StepRecord {
        instruction,
        counted,
    }
}

/// Executes one fetch, decode/execute and write-back iteration.
///
/// A program counter left outside memory afterwards latches
/// [`Status::AddressError`].
pub fn step(cpu: &mut CpuState, memory: &mut [u8]) -> StepRecord {
    step_with(cpu, memory, &mut SilentSink)
}

fn drive(
    cpu: &mut CpuState,
    memory: &mut [u8],
    sink: &mut dyn TraceSink,
    mode: Mode,
) -> RunSummary {
    let mut summary = RunSummary::default();
    while cpu.status.is_running() {
        sink.on_event(TraceEvent::StepStart(&*cpu));
        let record = step_with(cpu, memory, sink);
        summary.instructions += u64::from(record.counted);
        summary.last = Some(record.instruction);
    }

    if cpu.status == Status::AddressError {
        if let Some(last) = summary.last {
            cpu.pc = last.val_p;
            // A faulting call reports one past its fall-through address.
            if mode == Mode::Silent && last.opcode == Opcode::Call {
                cpu.pc = cpu.pc.wrapping_add(1);
            }
        }
    }
    debug!(
        status = ?cpu.status,
        pc = cpu.pc,
        instructions = summary.instructions,
        "execution stopped"
    );
    summary
}

/// Runs until the CPU leaves [`Status::Running`].
///
/// On [`Status::AddressError`] the reported program counter is rewritten to
/// the fall-through address of the last fetched instruction, plus one when
/// that instruction was `call`.
pub fn run(cpu: &mut CpuState, memory: &mut [u8]) -> RunSummary {
    drive(cpu, memory, &mut SilentSink, Mode::Silent)
}

/// Runs like [`run`], reporting each step to `sink`.
///
/// The address-error correction applies without the extra `call` byte.
pub fn run_traced(cpu: &mut CpuState, memory: &mut [u8], sink: &mut dyn TraceSink) -> RunSummary {
    drive(cpu, memory, sink, Mode::Traced)
}
