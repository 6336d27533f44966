//! # Branch Instructions
//!
//! Short branches (0x20-0x2F) take an 8-bit signed offset, long branches
//! (0x10 0x21-0x2F, plus the unprefixed LBRA and LBSR) a 16-bit one. The
//! offset is relative to the address of the next instruction.
//!
//! The low nibble of the opcode selects the condition, the same on both pages.
//! A taken conditional long branch costs one extra cycle.

use crate::cpu::Stack;
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// Evaluates the branch condition selected by the low nibble of `opcode`.
pub(crate) fn condition(cc: ConditionCodes, opcode: u8) -> bool {
    match opcode & 0x0F {
        0x0 => true,                         // BRA
        0x1 => false,                        // BRN
        0x2 => !(cc.c() || cc.z()),          // BHI
        0x3 => cc.c() || cc.z(),             // BLS
        0x4 => !cc.c(),                      // BCC
        0x5 => cc.c(),                       // BCS
        0x6 => !cc.z(),                      // BNE
        0x7 => cc.z(),                       // BEQ
        0x8 => !cc.v(),                      // BVC
        0x9 => cc.v(),                       // BVS
        0xA => !cc.n(),                      // BPL
        0xB => cc.n(),                       // BMI
        0xC => cc.n() == cc.v(),             // BGE
        0xD => cc.n() != cc.v(),             // BLT
        0xE => !cc.z() && cc.n() == cc.v(),  // BGT
        _ => cc.z() || cc.n() != cc.v(),     // BLE
    }
}

/// Executes a short conditional branch (BRA, BEQ, BGT, ...).
pub(crate) fn execute_branch<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<u8, ExecutionError> {
    let offset = cpu.fetch_byte()? as i8;
    if condition(cpu.cc, opcode) {
        cpu.pc = cpu.pc.wrapping_add(offset as i16 as u16);
    }
    Ok(0)
}

/// Executes a long conditional branch from the 0x10 page.
pub(crate) fn execute_long_branch<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<u8, ExecutionError> {
    let offset = cpu.fetch_word()?;
    if condition(cpu.cc, opcode) {
        cpu.pc = cpu.pc.wrapping_add(offset);
        return Ok(1);
    }
    Ok(0)
}

pub(crate) fn execute_lbra<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let offset = cpu.fetch_word()?;
    cpu.pc = cpu.pc.wrapping_add(offset);
    Ok(0)
}

/// Executes BSR: pushes the return address on S and branches.
pub(crate) fn execute_bsr<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let offset = cpu.fetch_byte()? as i8;
    cpu.push16(Stack::S, cpu.pc)?;
    cpu.pc = cpu.pc.wrapping_add(offset as i16 as u16);
    Ok(0)
}

pub(crate) fn execute_lbsr<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let offset = cpu.fetch_word()?;
    cpu.push16(Stack::S, cpu.pc)?;
    cpu.pc = cpu.pc.wrapping_add(offset);
    Ok(0)
}
