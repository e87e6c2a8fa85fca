//! Execution status of the simulated CPU.

use crate::FaultCode;

/// Execution status of the simulated CPU.
///
/// Every status other than [`Status::Running`] is terminal for the driver
/// loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Status {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// A `halt` instruction retired.
    Halted,
    /// A malformed or unknown instruction was fetched or executed.
    InvalidInstruction,
    /// An access or program counter left the address space.
    AddressError,
}

impl Status {
    /// Returns `true` while the CPU may keep executing.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Short keyword used in state dumps (`AOK`, `HLT`, `ADR`, `INS`).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Running => "AOK",
            Self::Halted => "HLT",
            Self::InvalidInstruction => FaultCode::InvalidInstruction.keyword(),
            Self::AddressError => FaultCode::AddressError.keyword(),
        }
    }
}

impl From<FaultCode> for Status {
    fn from(fault: FaultCode) -> Self {
        match fault {
            FaultCode::InvalidInstruction => Self::InvalidInstruction,
            FaultCode::AddressError => Self::AddressError,
        }
    }
}
