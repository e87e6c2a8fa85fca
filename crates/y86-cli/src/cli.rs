//! Command-line flags and their resolution into run options.

use std::path::PathBuf;

use clap::Parser;

/// Usage text printed for `-h` or a missing input file.
#[must_use]
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <option(s)> mini-elf-file\n \
         Options are:\n  \
         -h      Display usage\n  \
         -H      Show the Mini-ELF header\n  \
         -a      Show all with brief memory\n  \
         -f      Show all with full memory\n  \
         -s      Show the program headers\n  \
         -m      Show the memory contents (brief)\n  \
         -M      Show the memory contents (full)\n  \
         -d      Disassemble code contents\n  \
         -D      Disassemble data contents\n  \
         -e      Execute program\n  \
         -E      Execute program (trace mode)\n"
    )
}

/// Raw command-line flags.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "y86", about = "Y86-64 Mini-ELF loader, disassembler and emulator")]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Display usage.
    #[arg(short = 'h')]
    pub help: bool,
    /// Show the Mini-ELF header.
    #[arg(short = 'H')]
    pub header: bool,
    /// Show all with brief memory (`-H -s -m`).
    #[arg(short = 'a')]
    pub all_brief: bool,
    /// Show all with full memory (`-H -s -M`).
    #[arg(short = 'f')]
    pub all_full: bool,
    /// Show the program headers.
    #[arg(short = 's')]
    pub phdrs: bool,
    /// Show the memory contents of each segment.
    #[arg(short = 'm')]
    pub memory_brief: bool,
    /// Show the full memory contents.
    #[arg(short = 'M')]
    pub memory_full: bool,
    /// Disassemble code contents.
    #[arg(short = 'd')]
    pub disassemble_code: bool,
    /// Disassemble data contents.
    #[arg(short = 'D')]
    pub disassemble_data: bool,
    /// Execute the program.
    #[arg(short = 'e')]
    pub execute: bool,
    /// Execute the program, tracing every step.
    #[arg(short = 'E')]
    pub trace: bool,
    /// Mini-ELF file to load.
    pub file: Option<PathBuf>,
}

/// Memory dump selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryDump {
    /// No memory dump.
    #[default]
    None,
    /// Each segment's range.
    Brief,
    /// The whole address space.
    Full,
}

/// Execution selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// Do not run the program.
    #[default]
    None,
    /// Run and report the final state.
    Silent,
    /// Run, reporting every step.
    Traced,
}

/// Fully resolved run options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Options {
    /// Input file.
    pub file: PathBuf,
    /// Dump the file header.
    pub header: bool,
    /// Dump the program headers.
    pub phdrs: bool,
    /// Memory dump mode.
    pub memory: MemoryDump,
    /// Disassemble code segments.
    pub disassemble_code: bool,
    /// Disassemble data segments.
    pub disassemble_data: bool,
    /// Execution mode.
    pub execution: Execution,
}

impl Cli {
    /// Expands the combined flags and checks the remaining constraints.
    ///
    /// Returns `None` when usage should be shown instead: `-h` was given,
    /// both memory dump modes or both execution modes were selected, or no
    /// input file was named.
    #[must_use]
    pub fn into_options(self) -> Option<Options> {
        if self.help {
            return None;
        }
        let brief = self.memory_brief || self.all_brief;
        let full = self.memory_full || self.all_full;
        if (brief && full) || (self.execute && self.trace) {
            return None;
        }
        let memory = match (brief, full) {
            (true, _) => MemoryDump::Brief,
            (_, true) => MemoryDump::Full,
            _ => MemoryDump::None,
        };
        let execution = match (self.execute, self.trace) {
            (true, _) => Execution::Silent,
            (_, true) => Execution::Traced,
            _ => Execution::None,
        };
        let combined = self.all_brief || self.all_full;
        Some(Options {
            file: self.file?,
            header: self.header || combined,
            phdrs: self.phdrs || combined,
            memory,
            disassemble_code: self.disassemble_code,
            disassemble_data: self.disassemble_data,
            execution,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{usage, Cli, Execution, MemoryDump};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("y86").chain(args.iter().copied()))
    }

    #[test]
    fn combined_flags_expand() {
        let options = parse(&["-a", "prog.o"])
            .expect("valid flags")
            .into_options()
            .expect("runnable");
        assert!(options.header && options.phdrs);
        assert_eq!(options.memory, MemoryDump::Brief);
        assert_eq!(options.file, PathBuf::from("prog.o"));

        let options = parse(&["-fE", "prog.o"])
            .expect("valid flags")
            .into_options()
            .expect("runnable");
        assert_eq!(options.memory, MemoryDump::Full);
        assert_eq!(options.execution, Execution::Traced);
    }

    #[test]
    fn exclusive_flags_are_usage_errors() {
        for args in [
            ["-m", "-M", "prog.o"],
            ["-e", "-E", "prog.o"],
            ["-a", "-M", "prog.o"],
            ["-f", "-m", "prog.o"],
        ] {
            let cli = parse(&args).expect("clap accepts");
            assert_eq!(cli.into_options(), None, "{args:?}");
        }
    }

    #[test]
    fn help_or_missing_file_shows_usage() {
        assert_eq!(parse(&["-h", "prog.o"]).expect("valid").into_options(), None);
        assert_eq!(parse(&["-H"]).expect("valid").into_options(), None);
        assert!(parse(&["a.o", "b.o"]).is_err());
        assert!(usage("y86")
            .starts_with("Usage: y86 <option(s)> mini-elf-file\n Options are:\n  -h"));
    }
}
