//! Deterministic opcode and function-code classification tables.

/// Instruction class selected by the high nibble of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Halt = 0x0,
    Nop = 0x1,
    Cmov = 0x2,
    Irmovq = 0x3,
    Rmmovq = 0x4,
    Mrmovq = 0x5,
    Opq = 0x6,
    Jump = 0x7,
    Call = 0x8,
    Ret = 0x9,
    Pushq = 0xA,
    Popq = 0xB,
    Iotrap = 0xC,
    /// Unknown opcode nibble or failed validation.
    #[default]
    Invalid = 0xF,
}

impl Opcode {
    /// Converts a 4-bit opcode nibble into an assigned class.
    ///
    /// Unassigned nibbles (`0xD..=0xF`) map to [`Opcode::Invalid`].
    #[must_use]
    pub const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x0 => Self::Halt,
            0x1 => Self::Nop,
            0x2 => Self::Cmov,
            0x3 => Self::Irmovq,
            0x4 => Self::Rmmovq,
            0x5 => Self::Mrmovq,
            0x6 => Self::Opq,
            0x7 => Self::Jump,
            0x8 => Self::Call,
            0x9 => Self::Ret,
            0xA => Self::Pushq,
            0xB => Self::Popq,
            0xC => Self::Iotrap,
            _ => Self::Invalid,
        }
    }

    /// Encoded instruction length in bytes; `0` for [`Opcode::Invalid`].
    #[must_use]
    pub const fn length(self) -> u64 {
        match self {
            Self::Halt | Self::Nop | Self::Ret | Self::Iotrap => 1,
            Self::Cmov | Self::Opq | Self::Pushq | Self::Popq => 2,
            Self::Jump | Self::Call => 9,
            Self::Irmovq | Self::Rmmovq | Self::Mrmovq => 10,
            Self::Invalid => 0,
        }
    }

    /// Returns `true` when the encoding carries a register-specifier byte.
    #[must_use]
    pub const fn has_register_byte(self) -> bool {
        matches!(
            self,
            Self::Cmov
                | Self::Irmovq
                | Self::Rmmovq
                | Self::Mrmovq
                | Self::Opq
                | Self::Pushq
                | Self::Popq
        )
    }

    /// Byte offset of the 8-byte constant within the encoding, if any.
    #[must_use]
    pub const fn constant_offset(self) -> Option<u64> {
        match self {
            Self::Irmovq | Self::Rmmovq | Self::Mrmovq => Some(2),
            Self::Jump | Self::Call => Some(1),
            _ => None,
        }
    }
}

/// Condition code shared by conditional moves and jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Condition {
    Always = 0,
    Le = 1,
    L = 2,
    E = 3,
    Ne = 4,
    Ge = 5,
    G = 6,
}

impl Condition {
    /// Decodes a function nibble; values `>= 7` are unassigned.
    #[must_use]
    pub const fn from_ifun(ifun: u8) -> Option<Self> {
        match ifun {
            0 => Some(Self::Always),
            1 => Some(Self::Le),
            2 => Some(Self::L),
            3 => Some(Self::E),
            4 => Some(Self::Ne),
            5 => Some(Self::Ge),
            6 => Some(Self::G),
            _ => None,
        }
    }

    /// Mnemonic for the conditional-move form (`rrmovq` when unconditional).
    #[must_use]
    pub const fn cmov_mnemonic(self) -> &'static str {
        match self {
            Self::Always => "rrmovq",
            Self::Le => "cmovle",
            Self::L => "cmovl",
            Self::E => "cmove",
            Self::Ne => "cmovne",
            Self::Ge => "cmovge",
            Self::G => "cmovg",
        }
    }

    /// Mnemonic for the jump form.
    #[must_use]
    pub const fn jump_mnemonic(self) -> &'static str {
        match self {
            Self::Always => "jmp",
            Self::Le => "jle",
            Self::L => "jl",
            Self::E => "je",
            Self::Ne => "jne",
            Self::Ge => "jge",
            Self::G => "jg",
        }
    }
}

/// Arithmetic/logic operation selected by an `OPq` function nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluOp {
    Add = 0,
    Sub = 1,
    And = 2,
    Xor = 3,
}

impl AluOp {
    /// Decodes a function nibble; values `>= 4` are unassigned.
    #[must_use]
    pub const fn from_ifun(ifun: u8) -> Option<Self> {
        match ifun {
            0 => Some(Self::Add),
            1 => Some(Self::Sub),
            2 => Some(Self::And),
            3 => Some(Self::Xor),
            _ => None,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "addq",
            Self::Sub => "subq",
            Self::And => "andq",
            Self::Xor => "xorq",
        }
    }
}

/// I/O trap selector carried by `iotrap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TrapKind {
    CharOut = 0,
    CharIn = 1,
    DecOut = 2,
    DecIn = 3,
    StrOut = 4,
    Flush = 5,
}

impl TrapKind {
    /// Decodes a function nibble; values `>= 6` are unassigned.
    #[must_use]
    pub const fn from_ifun(ifun: u8) -> Option<Self> {
        match ifun {
            0 => Some(Self::CharOut),
            1 => Some(Self::CharIn),
            2 => Some(Self::DecOut),
            3 => Some(Self::DecIn),
            4 => Some(Self::StrOut),
            5 => Some(Self::Flush),
            _ => None,
        }
    }
}

/// Single source-of-truth table of assigned opcode nibbles and lengths.
pub const OPCODE_TABLE: &[(u8, Opcode, u64)] = &[
    (0x0, Opcode::Halt, 1),
    (0x1, Opcode::Nop, 1),
    (0x2, Opcode::Cmov, 2),
    (0x3, Opcode::Irmovq, 10),
    (0x4, Opcode::Rmmovq, 10),
    (0x5, Opcode::Mrmovq, 10),
    (0x6, Opcode::Opq, 2),
    (0x7, Opcode::Jump, 9),
    (0x8, Opcode::Call, 9),
    (0x9, Opcode::Ret, 1),
    (0xA, Opcode::Pushq, 2),
    (0xB, Opcode::Popq, 2),
    (0xC, Opcode::Iotrap, 1),
];
