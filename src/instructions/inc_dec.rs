//! # Increment, Decrement and Unary Instructions
//!
//! INC, DEC, NEG, COM, CLR and TST on A, B or a memory byte.

use crate::addressing::AddressingMode;
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// INC: V set when 0x7F wraps to 0x80. C unchanged.
pub(crate) fn inc(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    cc.set_nz8(result);
    cc.set(ConditionCodes::OVERFLOW, value == 0x7F);
    result
}

/// DEC: V set when 0x80 wraps to 0x7F. C unchanged.
pub(crate) fn dec(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    cc.set_nz8(result);
    cc.set(ConditionCodes::OVERFLOW, value == 0x80);
    result
}

/// NEG: two's complement. C is set for any non-zero operand, V for 0x80.
pub(crate) fn neg(cc: &mut ConditionCodes, value: u8) -> u8 {
    cc.sub8(0, value, false)
}

/// COM: one's complement. V cleared, C set.
pub(crate) fn com(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = !value;
    cc.set_logic8(result);
    cc.set(ConditionCodes::CARRY, true);
    result
}

/// Executes TSTA, TSTB or TST (memory): N and Z from the value, V cleared.
pub(crate) fn execute_tst<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (value, extra) = match opcode & 0xF0 {
        0x40 => (cpu.a, 0),
        0x50 => (cpu.b, 0),
        _ => {
            let (addr, extra) = cpu.effective_address(mode)?;
            (cpu.memory.read(addr)?, extra)
        }
    };
    cpu.cc.set_logic8(value);
    Ok(extra)
}

/// Executes CLRA, CLRB or CLR (memory): N=0 Z=1 V=0 C=0.
pub(crate) fn execute_clr<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let extra = match opcode & 0xF0 {
        0x40 => {
            cpu.a = 0;
            0
        }
        0x50 => {
            cpu.b = 0;
            0
        }
        _ => {
            let (addr, extra) = cpu.effective_address(mode)?;
            cpu.memory.write(addr, 0)?;
            extra
        }
    };
    cpu.cc.set_logic8(0);
    cpu.cc.set(ConditionCodes::CARRY, false);
    Ok(extra)
}
