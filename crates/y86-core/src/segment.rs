//! Program segment descriptors shared by the loader and the disassembler.

use std::fmt;

/// Kind of content a segment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SegmentType {
    /// Initialized data (`.quad` or `.string` content).
    Data,
    /// Executable instructions.
    Code,
    /// Stack reservation.
    Stack,
    /// Heap reservation.
    Heap,
    /// Any unassigned type tag, preserved verbatim.
    Unknown(u16),
}

impl SegmentType {
    /// Converts a raw type tag.
    #[must_use]
    pub const fn from_u16(raw: u16) -> Self {
        match raw {
            0 => Self::Data,
            1 => Self::Code,
            2 => Self::Stack,
            3 => Self::Heap,
            other => Self::Unknown(other),
        }
    }
}

/// Permission bits of a segment (`R = 4`, `W = 2`, `X = 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SegmentFlags(pub u16);

impl SegmentFlags {
    /// Readable.
    pub const READ: u16 = 4;
    /// Writable.
    pub const WRITE: u16 = 2;
    /// Executable.
    pub const EXECUTE: u16 = 1;

    /// Readable bit set.
    #[must_use]
    pub const fn readable(self) -> bool {
        self.0 & Self::READ != 0
    }

    /// Writable bit set.
    #[must_use]
    pub const fn writable(self) -> bool {
        self.0 & Self::WRITE != 0
    }

    /// Executable bit set.
    #[must_use]
    pub const fn executable(self) -> bool {
        self.0 & Self::EXECUTE != 0
    }
}

impl fmt::Display for SegmentFlags {
    /// Renders the three-column `RWX` permission string, blanks for clear bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = |set: bool, letter: char| if set { letter } else { ' ' };
        write!(
            f,
            "{}{}{}",
            column(self.readable(), 'R'),
            column(self.writable(), 'W'),
            column(self.executable(), 'X')
        )
    }
}

/// One program header: where a segment lives in the file and in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramHeader {
    /// File offset of the segment bytes.
    pub offset: u32,
    /// Segment size in bytes.
    pub size: u32,
    /// Load address in the simulated address space.
    pub vaddr: u32,
    /// Segment content kind.
    pub segment_type: SegmentType,
    /// Permission bits.
    pub flags: SegmentFlags,
}

impl ProgramHeader {
    /// First address past the end of the segment.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.vaddr as u64 + self.size as u64
    }

    /// Returns `true` for read-write data, disassembled as quads.
    #[must_use]
    pub const fn is_rw_data(&self) -> bool {
        matches!(self.segment_type, SegmentType::Data)
            && self.flags.0 == SegmentFlags::READ | SegmentFlags::WRITE
    }

    /// Returns `true` for read-only data, disassembled as strings.
    #[must_use]
    pub const fn is_ro_data(&self) -> bool {
        matches!(self.segment_type, SegmentType::Data) && self.flags.0 == SegmentFlags::READ
    }
}
