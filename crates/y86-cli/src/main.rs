//! CLI entry point for the `y86` binary.

use std::env;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;
use y86_cli::{logging, run_options, usage, Cli, CliError};
use y86_core as _;
#[cfg(test)]
use tempfile as _;

fn main() -> ExitCode {
    logging::init();
    let program = env::args().next().unwrap_or_else(|| "y86".to_string());
    let Some(options) = Cli::try_parse().ok().and_then(Cli::into_options) else {
        print!("{}", usage(&program));
        return ExitCode::FAILURE;
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = run_options(&options, &mut out);
    let flushed = out.flush();

    match (result, flushed) {
        (Ok(()), Ok(())) => ExitCode::SUCCESS,
        (Err(CliError::Elf(_)), _) => {
            println!("Failed to read file");
            ExitCode::FAILURE
        }
        (Err(CliError::Output(error)), _) | (Ok(()), Err(error)) => {
            eprintln!("error: failed to write output: {error}");
            ExitCode::FAILURE
        }
    }
}
