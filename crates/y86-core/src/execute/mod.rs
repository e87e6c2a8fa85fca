//! Instruction execution pipeline for the Y86-64 ISA.
//!
//! Execution is split into two stages that mirror the sequential Y86 design:
//! [`decode_execute`] reads registers, evaluates conditions and computes
//! `val_e` (updating the condition codes for `OPq`), and [`memory_wb_pc`]
//! performs the memory access, register write-back and program-counter
//! update. Register reads in the first stage observe the register file as it
//! was before the instruction.

mod flags;

pub use flags::{alu, condition_holds, FlagsUpdate};

use crate::decoder::Instruction;
use crate::encoding::Opcode;
use crate::memory::{in_bounds, read_u64_le, write_u64_le, QUAD_BYTES};
use crate::state::{CpuState, Register, Status};

/// Stack slot size in bytes.
const STACK_SLOT: u64 = QUAD_BYTES as u64;

/// Values handed from [`decode_execute`] to [`memory_wb_pc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecuteState {
    /// Source operand (register value or stack pointer).
    pub val_a: u64,
    /// ALU result or effective address.
    pub val_e: u64,
    /// Outcome of the condition code for `cmovXX` and `jXX`.
    pub condition: bool,
}

/// Runs the decode and execute stages for `inst`.
///
/// `halt` and invalid instructions latch their terminal status here. An
/// unassigned function code on `OPq`, `cmovXX` or `jXX` latches
/// [`Status::InvalidInstruction`]; for `OPq` the zero and sign flags are
/// still written from a zero result.
pub fn decode_execute(cpu: &mut CpuState, inst: &Instruction) -> ExecuteState {
    let mut exec = ExecuteState::default();
    let rsp = cpu.reg(Register::Rsp);

    match inst.opcode {
        Opcode::Halt => cpu.raise(Status::Halted),
        Opcode::Nop | Opcode::Iotrap => {}
        Opcode::Cmov => {
            exec.val_a = cpu.reg(inst.ra);
            exec.val_e = exec.val_a;
            match inst.condition() {
                Some(cond) => exec.condition = condition_holds(cond, cpu),
                None => cpu.raise(Status::InvalidInstruction),
            }
        }
        Opcode::Irmovq => exec.val_e = inst.val_c,
        Opcode::Rmmovq => {
            exec.val_a = cpu.reg(inst.ra);
            exec.val_e = inst.val_c.wrapping_add(cpu.reg(inst.rb));
        }
        Opcode::Mrmovq => exec.val_e = inst.val_c.wrapping_add(cpu.reg(inst.rb)),
        Opcode::Opq => {
            exec.val_a = cpu.reg(inst.ra);
            match inst.alu_op() {
                Some(op) => {
                    let (value, update) = alu(op, exec.val_a, cpu.reg(inst.rb));
                    exec.val_e = value;
                    update.apply(cpu);
                }
                None => {
                    cpu.raise(Status::InvalidInstruction);
                    FlagsUpdate {
                        zero: true,
                        sign: false,
                        overflow: None,
                    }
                    .apply(cpu);
                }
            }
        }
        Opcode::Jump => match inst.condition() {
            Some(cond) => exec.condition = condition_holds(cond, cpu),
            None => cpu.raise(Status::InvalidInstruction),
        },
        Opcode::Call => exec.val_e = rsp.wrapping_sub(STACK_SLOT),
        Opcode::Ret | Opcode::Popq => {
            exec.val_a = rsp;
            exec.val_e = rsp.wrapping_add(STACK_SLOT);
        }
        Opcode::Pushq => {
            exec.val_a = cpu.reg(inst.ra);
            exec.val_e = rsp.wrapping_sub(STACK_SLOT);
        }
        Opcode::Invalid => cpu.raise(Status::InvalidInstruction),
    }

    exec
}

const fn has_bad_function_code(inst: &Instruction) -> bool {
    match inst.opcode {
        Opcode::Cmov | Opcode::Jump => inst.condition().is_none(),
        Opcode::Opq => inst.alu_op().is_none(),
        _ => false,
    }
}

/// Runs the memory, write-back and PC-update stages for `inst`.
///
/// Memory faults latch [`Status::AddressError`] and leave the program
/// counter where it was, except for `call`, which still transfers control
/// to its destination.
pub fn memory_wb_pc(
    cpu: &mut CpuState,
    inst: &Instruction,
    memory: &mut [u8],
    exec: &ExecuteState,
) {
    if !in_bounds(memory, cpu.pc) {
        cpu.raise(Status::AddressError);
        return;
    }
    if has_bad_function_code(inst) {
        cpu.raise(Status::InvalidInstruction);
        return;
    }

    match inst.opcode {
        Opcode::Halt | Opcode::Nop | Opcode::Iotrap => cpu.pc = inst.val_p,
        Opcode::Cmov => {
            if exec.condition {
                cpu.set_reg(inst.rb, exec.val_e);
            }
            cpu.pc = inst.val_p;
        }
        Opcode::Irmovq | Opcode::Opq => {
            cpu.set_reg(inst.rb, exec.val_e);
            cpu.pc = inst.val_p;
        }
        Opcode::Rmmovq => match write_u64_le(memory, exec.val_e, exec.val_a) {
            Ok(()) => cpu.pc = inst.val_p,
            Err(fault) => cpu.raise(fault.into()),
        },
        Opcode::Mrmovq => match read_u64_le(memory, exec.val_e) {
            Ok(value) => {
                cpu.set_reg(inst.ra, value);
                cpu.pc = inst.val_p;
            }
            Err(fault) => cpu.raise(fault.into()),
        },
        Opcode::Jump => {
            cpu.pc = if exec.condition { inst.val_c } else { inst.val_p };
        }
        Opcode::Call => {
            match write_u64_le(memory, exec.val_e, inst.val_p) {
                Ok(()) => cpu.set_reg(Register::Rsp, exec.val_e),
                Err(fault) => cpu.raise(fault.into()),
            }
            cpu.pc = inst.val_c;
        }
        Opcode::Ret => match read_u64_le(memory, exec.val_a) {
            Ok(target) => {
                cpu.set_reg(Register::Rsp, exec.val_e);
                cpu.pc = target;
            }
            Err(fault) => cpu.raise(fault.into()),
        },
        Opcode::Pushq => match write_u64_le(memory, exec.val_e, exec.val_a) {
            Ok(()) => {
                cpu.set_reg(Register::Rsp, exec.val_e);
                cpu.pc = inst.val_p;
            }
            Err(fault) => cpu.raise(fault.into()),
        },
        Opcode::Popq => match read_u64_le(memory, exec.val_a) {
            Ok(value) => {
                cpu.set_reg(Register::Rsp, exec.val_e);
                cpu.set_reg(inst.ra, value);
                cpu.pc = inst.val_p;
            }
            Err(fault) => cpu.raise(fault.into()),
        },
        Opcode::Invalid => cpu.raise(Status::InvalidInstruction),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{decode_execute, memory_wb_pc, ExecuteState};
    use crate::decoder::{Decoder, Instruction};
    use crate::encoding::Opcode;
    use crate::memory::{new_address_space, read_u64_le, MEMSIZE};
    use crate::state::{CpuState, Register, Status};

    fn run_one(cpu: &mut CpuState, memory: &mut [u8], bytes: &[u8]) -> Instruction {
        let pc = usize::try_from(cpu.pc).expect("test pc fits");
        memory[pc..pc + bytes.len()].copy_from_slice(bytes);
        let inst = Decoder::decode(cpu.pc, memory)
            .into_result()
            .expect("test encodings decode");
        let exec = decode_execute(cpu, &inst);
        memory_wb_pc(cpu, &inst, memory, &exec);
        inst
    }

    #[test]
    fn add_overflow_sets_sign_and_overflow() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rax, 1);
        cpu.set_reg(Register::Rbx, 0x7FFF_FFFF_FFFF_FFFF);
        run_one(&mut cpu, &mut memory, &[0x60, 0x03]);

        assert_eq!(cpu.reg(Register::Rbx), 0x8000_0000_0000_0000);
        assert!(cpu.sign_flag && cpu.overflow_flag && !cpu.zero_flag);
        assert_eq!(cpu.pc, 2);
        assert_eq!(cpu.status, Status::Running);
    }

    #[test]
    fn cmov_moves_only_when_condition_holds() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rax, 9);
        run_one(&mut cpu, &mut memory, &[0x23, 0x01]); // cmove, ZF clear
        assert_eq!(cpu.reg(Register::Rcx), 0);
        assert_eq!(cpu.pc, 2);

        cpu.zero_flag = true;
        run_one(&mut cpu, &mut memory, &[0x23, 0x01]);
        assert_eq!(cpu.reg(Register::Rcx), 9);
    }

    #[test]
    fn rmmovq_and_mrmovq_use_displacement_plus_base() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rax, 0xABCD);
        cpu.set_reg(Register::Rbx, 0x200);
        run_one(&mut cpu, &mut memory, &[0x40, 0x03, 0x10, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(read_u64_le(&memory, 0x210), Ok(0xABCD));

        run_one(&mut cpu, &mut memory, &[0x50, 0x13, 0x10, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu.reg(Register::Rcx), 0xABCD);
        assert_eq!(cpu.pc, 20);
    }

    #[test]
    fn store_past_memory_faults_and_keeps_pc() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rbx, MEMSIZE as u64 - 4);
        run_one(&mut cpu, &mut memory, &[0x40, 0x03, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu.status, Status::AddressError);
        assert_eq!(cpu.pc, 0);
    }

    #[rstest]
    #[case::mrmovq_window_overruns(&[0x50, 0x03, 0, 0, 0, 0, 0, 0, 0, 0], MEMSIZE as u64 - 7, 0x100)]
    #[case::mrmovq_past_memory(&[0x50, 0x03, 0, 0, 0, 0, 0, 0, 0, 0], MEMSIZE as u64, 0x100)]
    #[case::popq_stack_past_memory(&[0xB0, 0x0F], 0, MEMSIZE as u64)]
    #[case::popq_window_overruns(&[0xB0, 0x0F], 0, MEMSIZE as u64 - 4)]
    #[case::ret_stack_past_memory(&[0x90], 0, MEMSIZE as u64)]
    #[case::pushq_empty_stack(&[0xA0, 0x0F], 0, 0)]
    fn stack_and_load_faults_keep_pc_and_rsp(
        #[case] bytes: &[u8],
        #[case] base: u64,
        #[case] rsp: u64,
    ) {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0x40);
        cpu.set_reg(Register::Rbx, base);
        cpu.set_reg(Register::Rsp, rsp);
        run_one(&mut cpu, &mut memory, bytes);

        assert_eq!(cpu.status, Status::AddressError);
        assert_eq!(cpu.pc, 0x40);
        assert_eq!(cpu.reg(Register::Rsp), rsp);
        assert_eq!(cpu.reg(Register::Rax), 0);
    }

    #[test]
    fn load_of_last_full_quad_succeeds() {
        let mut memory = new_address_space();
        memory[MEMSIZE - 1] = 0x80;
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rbx, MEMSIZE as u64 - 8);
        run_one(&mut cpu, &mut memory, &[0x50, 0x03, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu.status, Status::Running);
        assert_eq!(cpu.reg(Register::Rax), 0x8000_0000_0000_0000);
        assert_eq!(cpu.pc, 10);
    }

    #[test]
    fn call_faults_but_still_jumps() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        run_one(&mut cpu, &mut memory, &[0x80, 0x40, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu.status, Status::AddressError);
        assert_eq!(cpu.pc, 0x40);
        assert_eq!(cpu.reg(Register::Rsp), 0);
    }

    #[test]
    fn call_and_ret_use_the_stack() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rsp, 0x800);
        run_one(&mut cpu, &mut memory, &[0x80, 0x40, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cpu.pc, 0x40);
        assert_eq!(cpu.reg(Register::Rsp), 0x7F8);
        assert_eq!(read_u64_le(&memory, 0x7F8), Ok(9));

        run_one(&mut cpu, &mut memory, &[0x90]);
        assert_eq!(cpu.pc, 9);
        assert_eq!(cpu.reg(Register::Rsp), 0x800);
        assert_eq!(cpu.status, Status::Running);
    }

    #[test]
    fn push_then_pop_restores_value_and_stack_pointer() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rsp, 0x400);
        cpu.set_reg(Register::Rdx, 0x1122_3344);
        run_one(&mut cpu, &mut memory, &[0xA0, 0x2F]);
        assert_eq!(cpu.reg(Register::Rsp), 0x3F8);
        run_one(&mut cpu, &mut memory, &[0xB0, 0x6F]);
        assert_eq!(cpu.reg(Register::Rsi), 0x1122_3344);
        assert_eq!(cpu.reg(Register::Rsp), 0x400);
        assert_eq!(cpu.pc, 4);
    }

    #[test]
    fn popq_into_noreg_only_moves_the_stack_pointer() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rsp, 0x100);
        run_one(&mut cpu, &mut memory, &[0xB0, 0xFF]);
        assert_eq!(cpu.reg(Register::Rsp), 0x108);
        assert_eq!(cpu.status, Status::Running);
    }

    #[test]
    fn jump_takes_destination_only_on_condition() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        run_one(&mut cpu, &mut memory, &[0x73, 0x80, 0, 0, 0, 0, 0, 0, 0]); // je
        assert_eq!(cpu.pc, 9);
        run_one(&mut cpu, &mut memory, &[0x70, 0x80, 0, 0, 0, 0, 0, 0, 0]); // jmp
        assert_eq!(cpu.pc, 0x80);
    }

    #[test]
    fn halt_latches_status_and_advances_pc() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0x10);
        run_one(&mut cpu, &mut memory, &[0x00]);
        assert_eq!(cpu.status, Status::Halted);
        assert_eq!(cpu.pc, 0x11);
    }

    #[test]
    fn iotrap_only_advances_pc() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        let before = cpu;
        run_one(&mut cpu, &mut memory, &[0xC2]);
        assert_eq!(cpu.pc, 1);
        assert_eq!(cpu.registers, before.registers);
        assert_eq!(cpu.status, Status::Running);
    }

    #[test]
    fn bad_function_code_on_built_instruction_only_touches_flags() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        cpu.set_reg(Register::Rax, 5);
        cpu.sign_flag = true;
        cpu.overflow_flag = true;
        let inst = Instruction {
            opcode: Opcode::Opq,
            ifun: 9,
            ra: Register::Rax,
            rb: Register::Rax,
            val_c: 0,
            val_p: 2,
        };
        let exec = decode_execute(&mut cpu, &inst);
        memory_wb_pc(&mut cpu, &inst, &mut memory, &exec);
        assert_eq!(cpu.status, Status::InvalidInstruction);
        assert_eq!(cpu.reg(Register::Rax), 5);
        assert_eq!(cpu.pc, 0);
        assert!(cpu.zero_flag && !cpu.sign_flag && cpu.overflow_flag);
    }

    #[test]
    fn invalid_instruction_latches_status() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(0);
        let inst = Instruction::default();
        let exec = decode_execute(&mut cpu, &inst);
        assert_eq!(exec, ExecuteState::default());
        memory_wb_pc(&mut cpu, &inst, &mut memory, &exec);
        assert_eq!(cpu.status, Status::InvalidInstruction);
    }

    #[test]
    fn writeback_rejects_pc_outside_memory() {
        let mut memory = new_address_space();
        let mut cpu = CpuState::new(MEMSIZE as u64);
        let inst = Instruction {
            opcode: Opcode::Nop,
            val_p: MEMSIZE as u64 + 1,
            ..Instruction::default()
        };
        let exec = decode_execute(&mut cpu, &inst);
        memory_wb_pc(&mut cpu, &inst, &mut memory, &exec);
        assert_eq!(cpu.status, Status::AddressError);
        assert_eq!(cpu.pc, MEMSIZE as u64);
    }
}
