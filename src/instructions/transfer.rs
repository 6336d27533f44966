//! # Register Transfer Instructions
//!
//! TFR copies and EXG swaps two registers named by the nibbles of a postbyte
//! (source high, destination low):
//!
//! | Code | Register | Code | Register |
//! |------|----------|------|----------|
//! | 0    | D        | 8    | A        |
//! | 1    | X        | 9    | B        |
//! | 2    | Y        | A    | CC       |
//! | 3    | U        | B    | DP       |
//! | 4    | S        |      |          |
//! | 5    | PC       |      |          |
//!
//! Both registers must have the same width. Mixed-width pairs and the
//! undefined codes are rejected with [`ExecutionError::InvalidExgr`].

use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferRegister {
    D,
    X,
    Y,
    U,
    S,
    Pc,
    A,
    B,
    Cc,
    Dp,
}

impl TransferRegister {
    fn decode(code: u8) -> Option<Self> {
        Some(match code {
            0x0 => TransferRegister::D,
            0x1 => TransferRegister::X,
            0x2 => TransferRegister::Y,
            0x3 => TransferRegister::U,
            0x4 => TransferRegister::S,
            0x5 => TransferRegister::Pc,
            0x8 => TransferRegister::A,
            0x9 => TransferRegister::B,
            0xA => TransferRegister::Cc,
            0xB => TransferRegister::Dp,
            _ => return None,
        })
    }

    fn is_wide(self) -> bool {
        (self as u8) < (TransferRegister::A as u8)
    }
}

fn get<M: MemoryBus>(cpu: &CPU<M>, reg: TransferRegister) -> u16 {
    match reg {
        TransferRegister::D => cpu.d(),
        TransferRegister::X => cpu.x,
        TransferRegister::Y => cpu.y,
        TransferRegister::U => cpu.u,
        TransferRegister::S => cpu.s,
        TransferRegister::Pc => cpu.pc,
        TransferRegister::A => cpu.a as u16,
        TransferRegister::B => cpu.b as u16,
        TransferRegister::Cc => cpu.cc.bits() as u16,
        TransferRegister::Dp => cpu.dp as u16,
    }
}

fn set<M: MemoryBus>(cpu: &mut CPU<M>, reg: TransferRegister, value: u16) {
    match reg {
        TransferRegister::D => cpu.set_d(value),
        TransferRegister::X => cpu.x = value,
        TransferRegister::Y => cpu.y = value,
        TransferRegister::U => cpu.u = value,
        TransferRegister::S => cpu.s = value,
        TransferRegister::Pc => cpu.pc = value,
        TransferRegister::A => cpu.a = value as u8,
        TransferRegister::B => cpu.b = value as u8,
        TransferRegister::Cc => cpu.cc = ConditionCodes::from_bits(value as u8),
        TransferRegister::Dp => cpu.dp = value as u8,
    }
}

/// Fetches and validates the register pair postbyte.
fn register_pair<M: MemoryBus>(
    cpu: &mut CPU<M>,
) -> Result<(TransferRegister, TransferRegister), ExecutionError> {
    let postbyte = cpu.fetch_byte()?;
    let invalid = ExecutionError::InvalidExgr {
        postbyte,
        pc: cpu.instruction_pc,
    };
    let source = TransferRegister::decode(postbyte >> 4).ok_or(invalid)?;
    let dest = TransferRegister::decode(postbyte & 0x0F).ok_or(invalid)?;
    if source.is_wide() != dest.is_wide() {
        return Err(invalid);
    }
    Ok((source, dest))
}

pub(crate) fn execute_tfr<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let (source, dest) = register_pair(cpu)?;
    let value = get(cpu, source);
    set(cpu, dest, value);
    Ok(0)
}

pub(crate) fn execute_exg<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let (first, second) = register_pair(cpu)?;
    let a = get(cpu, first);
    let b = get(cpu, second);
    set(cpu, first, b);
    set(cpu, second, a);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use crate::{ExecutionError, FlatMemory, Step, CPU};

    fn cpu_with(program: &[u8]) -> CPU<FlatMemory> {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, program);
        CPU::new(memory)
    }

    #[test]
    fn test_tfr_x_to_y() {
        let mut cpu = cpu_with(&[0x1F, 0x12]);
        cpu.set_x(0xABCD);
        assert_eq!(cpu.step().unwrap(), Step::Cycles(6));
        assert_eq!(cpu.y(), 0xABCD);
        assert_eq!(cpu.x(), 0xABCD);
    }

    #[test]
    fn test_exg_a_dp() {
        let mut cpu = cpu_with(&[0x1E, 0x8B]);
        cpu.set_a(0x12);
        cpu.set_dp(0x34);
        assert_eq!(cpu.step().unwrap(), Step::Cycles(8));
        assert_eq!(cpu.a(), 0x34);
        assert_eq!(cpu.dp(), 0x12);
    }

    #[test]
    fn test_tfr_into_cc() {
        let mut cpu = cpu_with(&[0x1F, 0x9A]);
        cpu.set_b(0x0F);
        cpu.step().unwrap();
        assert_eq!(cpu.cc().bits(), 0x0F);
    }

    #[test]
    fn test_tfr_to_pc_jumps() {
        let mut cpu = cpu_with(&[0x1F, 0x15]);
        cpu.set_x(0x4000);
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0x4000);
    }

    #[test]
    fn test_mixed_width_rejected() {
        let mut cpu = cpu_with(&[0x1F, 0x18]);
        assert_eq!(
            cpu.step(),
            Err(ExecutionError::InvalidExgr {
                postbyte: 0x18,
                pc: 0x0000
            })
        );
    }

    #[test]
    fn test_undefined_code_rejected() {
        let mut cpu = cpu_with(&[0x1E, 0x6C]);
        assert!(matches!(
            cpu.step(),
            Err(ExecutionError::InvalidExgr { postbyte: 0x6C, .. })
        ));
    }
}
