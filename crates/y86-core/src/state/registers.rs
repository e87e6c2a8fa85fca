//! Register identifiers and the fifteen-entry general-purpose register file.

/// Number of addressable general-purpose registers (`%rax..%r14`).
pub const REGISTER_COUNT: usize = 15;

/// Register identifier as encoded in an instruction nibble.
///
/// `NoReg` (id 15) marks an unused operand slot. It is never backed by
/// storage: reads yield zero and writes are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    #[default]
    NoReg = 15,
}

impl Register {
    /// Ordered list of all storage-backed registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::Rax,
        Self::Rcx,
        Self::Rdx,
        Self::Rbx,
        Self::Rsp,
        Self::Rbp,
        Self::Rsi,
        Self::Rdi,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
    ];

    /// Decodes the low four bits of `nibble` into a register identifier.
    #[must_use]
    pub const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => Self::Rax,
            1 => Self::Rcx,
            2 => Self::Rdx,
            3 => Self::Rbx,
            4 => Self::Rsp,
            5 => Self::Rbp,
            6 => Self::Rsi,
            7 => Self::Rdi,
            8 => Self::R8,
            9 => Self::R9,
            10 => Self::R10,
            11 => Self::R11,
            12 => Self::R12,
            13 => Self::R13,
            14 => Self::R14,
            _ => Self::NoReg,
        }
    }

    /// Returns the encoded four-bit identifier.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Returns the storage index, or `None` for [`Register::NoReg`].
    #[must_use]
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::NoReg => None,
            other => Some(other as usize),
        }
    }

    /// Returns `true` when this identifier names real storage.
    #[must_use]
    pub const fn is_real(self) -> bool {
        !matches!(self, Self::NoReg)
    }

    /// Assembly spelling (`%rax`, `%r14`); empty for [`Register::NoReg`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rax => "%rax",
            Self::Rcx => "%rcx",
            Self::Rdx => "%rdx",
            Self::Rbx => "%rbx",
            Self::Rsp => "%rsp",
            Self::Rbp => "%rbp",
            Self::Rsi => "%rsi",
            Self::Rdi => "%rdi",
            Self::R8 => "%r8",
            Self::R9 => "%r9",
            Self::R10 => "%r10",
            Self::R11 => "%r11",
            Self::R12 => "%r12",
            Self::R13 => "%r13",
            Self::R14 => "%r14",
            Self::NoReg => "",
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// General-purpose register file holding raw 64-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    values: [u64; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates a register file with every register zeroed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: [0; REGISTER_COUNT],
        }
    }

    /// Reads `register`; [`Register::NoReg`] reads as zero.
    #[must_use]
    pub const fn get(&self, register: Register) -> u64 {
        match register.index() {
            Some(index) => self.values[index],
            None => 0,
        }
    }

    /// Writes `register`; writes to [`Register::NoReg`] are discarded.
    pub fn set(&mut self, register: Register, value: u64) {
        if let Some(index) = register.index() {
            self.values[index] = value;
        }
    }

    /// Returns all fifteen register values in id order.
    #[must_use]
    pub const fn as_array(&self) -> &[u64; REGISTER_COUNT] {
        &self.values
    }
}
