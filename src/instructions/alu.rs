//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADD/ADC, SUB/SBC, CMP on A or B
//! - AND, OR, EOR, BIT on A or B
//! - ADDD, SUBD and the 16-bit compares (CMPD, CMPX, CMPY, CMPU, CMPS)
//! - MUL, DAA, SEX, ABX
//!
//! The flag arithmetic lives on [`ConditionCodes`]; the functions here fetch
//! operands and store results.

use crate::addressing::AddressingMode;
use crate::cpu::{Acc, Reg16};
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes ADDA/ADDB, or ADCA/ADCB when `with_carry` is set.
///
/// Updates H, N, Z, V and C.
pub(crate) fn execute_add<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
    with_carry: bool,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    let carry = with_carry && cpu.cc.c();
    let result = cpu.cc.add8(cpu.acc(acc), value, carry);
    cpu.set_acc(acc, result);
    Ok(extra)
}

/// Executes SUBA/SUBB, or SBCA/SBCB when `with_borrow` is set.
pub(crate) fn execute_sub<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
    with_borrow: bool,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    let borrow = with_borrow && cpu.cc.c();
    let result = cpu.cc.sub8(cpu.acc(acc), value, borrow);
    cpu.set_acc(acc, result);
    Ok(extra)
}

/// Executes CMPA/CMPB: a subtraction that only sets flags.
pub(crate) fn execute_cmp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    cpu.cc.sub8(cpu.acc(acc), value, false);
    Ok(extra)
}

/// Executes AND, OR or EOR (given as `op`) on an accumulator.
///
/// N and Z follow the result, V is cleared, C is untouched.
pub(crate) fn execute_logic<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
    op: fn(u8, u8) -> u8,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    let result = op(cpu.acc(acc), value);
    cpu.cc.set_logic8(result);
    cpu.set_acc(acc, result);
    Ok(extra)
}

/// Executes BITA/BITB: AND without storing the result.
pub(crate) fn execute_bit<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    cpu.cc.set_logic8(cpu.acc(acc) & value);
    Ok(extra)
}

pub(crate) fn execute_addd<M: MemoryBus>(
    cpu: &mut CPU<M>,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand16(mode)?;
    let result = cpu.cc.add16(cpu.d(), value);
    cpu.set_d(result);
    Ok(extra)
}

pub(crate) fn execute_subd<M: MemoryBus>(
    cpu: &mut CPU<M>,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand16(mode)?;
    let result = cpu.cc.sub16(cpu.d(), value);
    cpu.set_d(result);
    Ok(extra)
}

/// Executes a 16-bit compare against D, X, Y, U or S.
pub(crate) fn execute_cmp16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    reg: Reg16,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand16(mode)?;
    cpu.cc.sub16(cpu.reg16(reg), value);
    Ok(extra)
}

/// Executes MUL: D = A * B (unsigned).
///
/// Z reflects the 16-bit product; C is bit 7 of the low byte, so that a
/// following ADCA rounds the high byte.
pub(crate) fn execute_mul<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let product = cpu.a as u16 * cpu.b as u16;
    cpu.set_d(product);
    cpu.cc.set(ConditionCodes::ZERO, product == 0);
    cpu.cc.set(ConditionCodes::CARRY, product & 0x80 != 0);
    Ok(0)
}

/// Executes DAA: decimal adjust A after a BCD addition.
///
/// C is set by a high-nibble correction and never cleared.
pub(crate) fn execute_daa<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let a = cpu.a;
    let low = a & 0x0F;
    let high = a & 0xF0;
    let mut correction = 0u8;
    let mut carry = cpu.cc.c();

    if cpu.cc.h() || low > 0x09 {
        correction |= 0x06;
    }
    if carry || high > 0x90 || (high > 0x80 && low > 0x09) {
        correction |= 0x60;
        carry = true;
    }

    let result = a.wrapping_add(correction);
    cpu.a = result;
    cpu.cc.set_logic8(result);
    cpu.cc.set(ConditionCodes::CARRY, carry);
    Ok(0)
}

/// Executes SEX: sign-extend B into A. Sets N and Z from D.
pub(crate) fn execute_sex<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    cpu.a = if cpu.b & 0x80 != 0 { 0xFF } else { 0x00 };
    cpu.cc.set_nz16(cpu.d());
    Ok(0)
}

/// Executes ABX: X = X + B (unsigned). No flags.
pub(crate) fn execute_abx<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    cpu.x = cpu.x.wrapping_add(cpu.b as u16);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use crate::{FlatMemory, Step, CPU};

    fn run(program: &[u8], setup: impl FnOnce(&mut CPU<FlatMemory>)) -> CPU<FlatMemory> {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, program);
        let mut cpu = CPU::new(memory);
        cpu.set_cc(0u8);
        setup(&mut cpu);
        cpu.step().unwrap();
        cpu
    }

    #[test]
    fn test_adda_half_carry() {
        let cpu = run(&[0x8B, 0x01], |cpu| cpu.set_a(0x0F));
        assert_eq!(cpu.a(), 0x10);
        assert!(cpu.flag_h());
        assert!(!cpu.flag_c());
    }

    #[test]
    fn test_adca_uses_carry() {
        let cpu = run(&[0x89, 0x01], |cpu| {
            cpu.set_a(0x10);
            cpu.set_cc(0x01u8);
        });
        assert_eq!(cpu.a(), 0x12);
    }

    #[test]
    fn test_sbcb_borrow() {
        let cpu = run(&[0xC2, 0x00], |cpu| {
            cpu.set_b(0x00);
            cpu.set_cc(0x01u8);
        });
        assert_eq!(cpu.b(), 0xFF);
        assert!(cpu.flag_c());
        assert!(cpu.flag_n());
    }

    #[test]
    fn test_cmpa_leaves_accumulator() {
        let cpu = run(&[0x81, 0x42], |cpu| cpu.set_a(0x42));
        assert_eq!(cpu.a(), 0x42);
        assert!(cpu.flag_z());
    }

    #[test]
    fn test_logic_clears_overflow_keeps_carry() {
        let cpu = run(&[0x84, 0x0F], |cpu| {
            cpu.set_a(0xF0);
            cpu.set_cc(0x03u8);
        });
        assert_eq!(cpu.a(), 0x00);
        assert!(cpu.flag_z());
        assert!(!cpu.flag_v());
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_addd_extended_timing() {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, &[0xF3, 0x20, 0x00]);
        memory.load(0x2000, &[0x00, 0x01]);
        let mut cpu = CPU::new(memory);
        cpu.set_d(0xFFFF);
        assert_eq!(cpu.step().unwrap(), Step::Cycles(7));
        assert_eq!(cpu.d(), 0x0000);
        assert!(cpu.flag_z());
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_cmpd_is_prefixed() {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, &[0x10, 0x83, 0x12, 0x34]);
        let mut cpu = CPU::new(memory);
        cpu.set_d(0x1234);
        assert_eq!(cpu.step().unwrap(), Step::Cycles(5));
        assert!(cpu.flag_z());
        assert_eq!(cpu.pc(), 4);
    }

    #[test]
    fn test_mul() {
        let cpu = run(&[0x3D], |cpu| {
            cpu.set_a(0x0C);
            cpu.set_b(0x64);
        });
        assert_eq!(cpu.d(), 0x04B0);
        assert!(cpu.flag_c());
        assert!(!cpu.flag_z());
    }

    #[test]
    fn test_daa_after_bcd_add() {
        // 0x19 + 0x28 = 0x41, adjusted to 0x47
        let mut memory = FlatMemory::new();
        memory.load(0x0000, &[0x8B, 0x28, 0x19]);
        let mut cpu = CPU::new(memory);
        cpu.set_a(0x19);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.a(), 0x47);
        assert!(!cpu.flag_c());
    }

    #[test]
    fn test_daa_keeps_carry() {
        let cpu = run(&[0x19], |cpu| {
            cpu.set_a(0x00);
            cpu.set_cc(0x01u8);
        });
        assert_eq!(cpu.a(), 0x60);
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_sex_and_abx() {
        let cpu = run(&[0x1D], |cpu| cpu.set_b(0x80));
        assert_eq!(cpu.d(), 0xFF80);
        assert!(cpu.flag_n());

        let cpu = run(&[0x3A], |cpu| {
            cpu.set_x(0x10F0);
            cpu.set_b(0xFF);
        });
        assert_eq!(cpu.x(), 0x11EF);
    }
}
