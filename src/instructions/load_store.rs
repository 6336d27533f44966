//! # Load and Store Instructions
//!
//! This module implements:
//! - LDA/LDB, STA/STB
//! - LDD/LDX/LDY/LDU/LDS, STD/STX/STY/STU/STS
//! - LEAX/LEAY/LEAS/LEAU
//!
//! Loads and stores set N and Z from the value and clear V. The immediate
//! forms of the stores never reach this module: the opcode tables mark them
//! as invalid address modes.

use crate::addressing::AddressingMode;
use crate::cpu::{Acc, Reg16};
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

pub(crate) fn execute_load8<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand8(mode)?;
    cpu.cc.set_logic8(value);
    cpu.set_acc(acc, value);
    Ok(extra)
}

pub(crate) fn execute_store8<M: MemoryBus>(
    cpu: &mut CPU<M>,
    acc: Acc,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (addr, extra) = cpu.effective_address(mode)?;
    let value = cpu.acc(acc);
    cpu.memory.write(addr, value)?;
    cpu.cc.set_logic8(value);
    Ok(extra)
}

pub(crate) fn execute_load16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    reg: Reg16,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = cpu.read_operand16(mode)?;
    cpu.cc.set_logic16(value);
    cpu.set_reg16(reg, value);
    Ok(extra)
}

pub(crate) fn execute_store16<M: MemoryBus>(
    cpu: &mut CPU<M>,
    reg: Reg16,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (addr, extra) = cpu.effective_address(mode)?;
    let value = cpu.reg16(reg);
    cpu.memory.write_word(addr, value)?;
    cpu.cc.set_logic16(value);
    Ok(extra)
}

/// Executes LEAX (0x30), LEAY (0x31), LEAS (0x32) or LEAU (0x33).
///
/// LEAX and LEAY set Z from the result; LEAS and LEAU leave the flags alone.
pub(crate) fn execute_lea<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<u8, ExecutionError> {
    let (addr, extra) = cpu.indexed_address()?;
    match opcode {
        0x30 => {
            cpu.x = addr;
            cpu.cc.set(ConditionCodes::ZERO, addr == 0);
        }
        0x31 => {
            cpu.y = addr;
            cpu.cc.set(ConditionCodes::ZERO, addr == 0);
        }
        0x32 => cpu.s = addr,
        _ => cpu.u = addr,
    }
    Ok(extra)
}
