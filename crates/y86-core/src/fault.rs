//! Fault taxonomy shared by fetch, execute, and write-back.

use thiserror::Error;

/// Fault taxonomy for the two terminal error statuses of the simulated CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCode {
    /// Malformed encoding, out-of-range register id, or unknown function code.
    #[error("invalid instruction")]
    InvalidInstruction,
    /// Effective address or program counter outside the address space.
    #[error("address out of range")]
    AddressError,
}

impl FaultCode {
    /// Short status keyword used by CPU state dumps (`INS`, `ADR`).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::InvalidInstruction => "INS",
            Self::AddressError => "ADR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FaultCode;

    #[test]
    fn display_and_keywords_name_the_fault() {
        assert_eq!(
            FaultCode::InvalidInstruction.to_string(),
            "invalid instruction"
        );
        assert_eq!(FaultCode::AddressError.to_string(), "address out of range");
        assert_eq!(FaultCode::InvalidInstruction.keyword(), "INS");
        assert_eq!(FaultCode::AddressError.keyword(), "ADR");
    }
}
