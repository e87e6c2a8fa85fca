//! Error types for Mini-ELF loading and command execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons a Mini-ELF image is rejected.
#[derive(Debug, Error)]
pub enum ElfError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to open or read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is shorter than the 16-byte header.
    #[error("file holds {len} bytes, too short for a Mini-ELF header")]
    TruncatedHeader {
        /// File length in bytes.
        len: usize,
    },
    /// The header magic number is not `ELF\0`.
    #[error("bad header magic {found:#010x}")]
    BadMagic {
        /// Magic number found in the file.
        found: u32,
    },
    /// A program header would be read from file offset zero.
    #[error("program header {index} sits at file offset 0")]
    ZeroProgramHeaderOffset {
        /// Program header index.
        index: usize,
    },
    /// A program header runs past the end of the file.
    #[error("program header {index} at offset {offset:#x} runs past end of file")]
    TruncatedProgramHeader {
        /// Program header index.
        index: usize,
        /// File offset of the program header.
        offset: usize,
    },
    /// A program header magic number is not `0xDEADBEEF`.
    #[error("program header {index} has bad magic {found:#010x}")]
    BadProgramHeaderMagic {
        /// Program header index.
        index: usize,
        /// Magic number found in the file.
        found: u32,
    },
    /// Segment bytes run past the end of the file.
    #[error("segment {index} ({size} bytes at offset {offset:#x}) runs past end of file")]
    SegmentOutOfFile {
        /// Program header index.
        index: usize,
        /// File offset of the segment.
        offset: u32,
        /// Segment size in bytes.
        size: u32,
    },
    /// Segment does not fit in the simulated address space.
    #[error("segment {index} ({size} bytes at {vaddr:#x}) does not fit in memory")]
    SegmentOutOfBounds {
        /// Program header index.
        index: usize,
        /// Load address.
        vaddr: u32,
        /// Segment size in bytes.
        size: u32,
    },
}

/// Failures of a whole command invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// The input file was rejected.
    #[error(transparent)]
    Elf(#[from] ElfError),
    /// Writing the report to stdout failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
