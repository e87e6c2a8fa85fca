//! Complete architectural CPU state and its textual dump.

use std::fmt;

use crate::state::{Register, RegisterFile, Status};

/// Architectural state of the simulated Y86-64 CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuState {
    /// Address of the next instruction to fetch.
    pub pc: u64,
    /// General-purpose registers.
    pub registers: RegisterFile,
    /// Zero flag.
    pub zero_flag: bool,
    /// Sign flag.
    pub sign_flag: bool,
    /// Signed-overflow flag.
    pub overflow_flag: bool,
    /// Current execution status.
    pub status: Status,
}

impl CpuState {
    /// Creates a running CPU with zeroed registers and flags, starting at `entry`.
    #[must_use]
    pub fn new(entry: u64) -> Self {
        Self {
            pc: entry,
            ..Self::default()
        }
    }

    /// Reads a register; [`Register::NoReg`] reads as zero.
    #[must_use]
    pub const fn reg(&self, register: Register) -> u64 {
        self.registers.get(register)
    }

    /// Writes a register; writes to [`Register::NoReg`] are discarded.
    pub fn set_reg(&mut self, register: Register, value: u64) {
        self.registers.set(register, value);
    }

    /// Moves to `status` unless a terminal status is already latched.
    ///
    /// The first terminal status reached wins; later attempts are ignored.
    pub fn raise(&mut self, status: Status) {
        if self.status.is_running() {
            self.status = status;
        }
    }
}

const DUMP_ROWS: [(Register, Option<Register>); 8] = [
    (Register::Rax, Some(Register::Rcx)),
    (Register::Rdx, Some(Register::Rbx)),
    (Register::Rsp, Some(Register::Rbp)),
    (Register::Rsi, Some(Register::Rdi)),
    (Register::R8, Some(Register::R9)),
    (Register::R10, Some(Register::R11)),
    (Register::R12, Some(Register::R13)),
    (Register::R14, None),
];

impl fmt::Display for CpuState {
    /// Renders the multi-line `Y86 CPU state:` dump.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Y86 CPU state:")?;
        writeln!(
            f,
            "    PC: {:016x}   flags: Z{} S{} O{}     {}",
            self.pc,
            u8::from(self.zero_flag),
            u8::from(self.sign_flag),
            u8::from(self.overflow_flag),
            self.status.keyword()
        )?;
        for (left, right) in DUMP_ROWS {
            write!(f, "{:>6}: {:016x}", left.name(), self.reg(left))?;
            if let Some(right) = right {
                write!(f, "   {:>5}: {:016x}", right.name(), self.reg(right))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CpuState;
    use crate::state::{Register, Status};

    #[test]
    fn new_cpu_starts_running_at_entry() {
        let cpu = CpuState::new(0x100);
        assert_eq!(cpu.pc, 0x100);
        assert_eq!(cpu.status, Status::Running);
        assert!(!cpu.zero_flag && !cpu.sign_flag && !cpu.overflow_flag);
        assert!(Register::ALL.iter().all(|reg| cpu.reg(*reg) == 0));
    }

    #[test]
    fn raise_latches_the_first_terminal_status() {
        let mut cpu = CpuState::new(0);
        cpu.raise(Status::AddressError);
        cpu.raise(Status::InvalidInstruction);
        cpu.raise(Status::Halted);
        assert_eq!(cpu.status, Status::AddressError);
    }

    #[test]
    fn dump_matches_fixed_layout() {
        let mut cpu = CpuState::new(0x16);
        cpu.zero_flag = true;
        cpu.status = Status::Halted;
        cpu.set_reg(Register::Rbx, 3);
        cpu.set_reg(Register::R9, u64::MAX);

        let expected = "\
Y86 CPU state:
    PC: 0000000000000016   flags: Z1 S0 O0     HLT
  %rax: 0000000000000000    %rcx: 0000000000000000
  %rdx: 0000000000000000    %rbx: 0000000000000003
  %rsp: 0000000000000000    %rbp: 0000000000000000
  %rsi: 0000000000000000    %rdi: 0000000000000000
   %r8: 0000000000000000     %r9: ffffffffffffffff
  %r10: 0000000000000000    %r11: 0000000000000000
  %r12: 0000000000000000    %r13: 0000000000000000
  %r14: 0000000000000000
";
        assert_eq!(cpu.to_string(), expected);
    }
}
