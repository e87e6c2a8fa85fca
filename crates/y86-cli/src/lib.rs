//! Mini-ELF loader, report dumps and command-line front end for the Y86-64
//! emulator core.

#[cfg(test)]
use tempfile as _;

/// Report orchestration.
pub mod app;
/// Command-line flags and option resolution.
pub mod cli;
/// Header, program header and memory dumps.
pub mod dump;
/// Mini-ELF parsing and segment loading.
pub mod elf;
/// Loader and command error types.
pub mod errors;
/// Diagnostic logging setup.
pub mod logging;

pub use app::{report, run_options};
pub use cli::{usage, Cli, Execution, MemoryDump, Options};
pub use elf::{ElfHeader, MiniElf};
pub use errors::{CliError, ElfError};
