//! Condition-code evaluation and ALU flag updates.

use crate::encoding::{AluOp, Condition};
use crate::state::CpuState;

/// Describes how the condition codes change after an `OPq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagsUpdate {
    /// Result is zero.
    pub zero: bool,
    /// Result has its top bit set.
    pub sign: bool,
    /// Signed overflow; `None` leaves the overflow flag as it was.
    pub overflow: Option<bool>,
}

impl FlagsUpdate {
    /// Writes the update into `cpu`.
    pub fn apply(self, cpu: &mut CpuState) {
        cpu.zero_flag = self.zero;
        cpu.sign_flag = self.sign;
        if let Some(overflow) = self.overflow {
            cpu.overflow_flag = overflow;
        }
    }
}

/// Computes `val_b OP val_a` with two's-complement wrapping.
///
/// Only `addq` and `subq` report overflow; `andq` and `xorq` leave the
/// overflow flag untouched.
#[must_use]
pub const fn alu(op: AluOp, val_a: u64, val_b: u64) -> (u64, FlagsUpdate) {
    let (a, b) = (val_a as i64, val_b as i64);
    let (value, overflow) = match op {
        AluOp::Add => {
            let (sum, overflow) = b.overflowing_add(a);
            (sum as u64, Some(overflow))
        }
        AluOp::Sub => {
            let (diff, overflow) = b.overflowing_sub(a);
            (diff as u64, Some(overflow))
        }
        AluOp::And => (val_b & val_a, None),
        AluOp::Xor => (val_b ^ val_a, None),
    };
    (
        value,
        FlagsUpdate {
            zero: value == 0,
            sign: value >> 63 == 1,
            overflow,
        },
    )
}

/// Evaluates `cond` against the current zero, sign and overflow flags.
#[must_use]
pub const fn condition_holds(cond: Condition, cpu: &CpuState) -> bool {
    let (zf, sf, of) = (cpu.zero_flag, cpu.sign_flag, cpu.overflow_flag);
    match cond {
        Condition::Always => true,
        Condition::Le => zf || (sf != of),
        Condition::L => sf != of,
        Condition::E => zf,
        Condition::Ne => !zf,
        Condition::Ge => sf == of,
        Condition::G => !zf && sf == of,
    }
}
