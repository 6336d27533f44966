//! # Shift and Rotate Instructions
//!
//! ASL, ASR, LSR, ROL and ROR. Each takes the operand byte and returns the
//! result, updating the condition codes; [`super::execute_unary`] applies them
//! to A, B or memory.
//!
//! For the left shifts V is bit 7 XOR bit 6 of the operand, i.e. whether the
//! sign changed.

use crate::registers::ConditionCodes;

/// Arithmetic shift left (also written LSL).
pub(crate) fn asl(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = value << 1;
    cc.set(ConditionCodes::CARRY, value & 0x80 != 0);
    cc.set(ConditionCodes::OVERFLOW, ((value ^ (value << 1)) & 0x80) != 0);
    cc.set_nz8(result);
    result
}

/// Arithmetic shift right: bit 7 is preserved.
pub(crate) fn asr(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = (value >> 1) | (value & 0x80);
    cc.set(ConditionCodes::CARRY, value & 0x01 != 0);
    cc.set_nz8(result);
    result
}

/// Logical shift right: N is always cleared.
pub(crate) fn lsr(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = value >> 1;
    cc.set(ConditionCodes::CARRY, value & 0x01 != 0);
    cc.set_nz8(result);
    result
}

/// Rotate left through carry.
pub(crate) fn rol(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = (value << 1) | u8::from(cc.c());
    cc.set(ConditionCodes::CARRY, value & 0x80 != 0);
    cc.set(ConditionCodes::OVERFLOW, ((value ^ (value << 1)) & 0x80) != 0);
    cc.set_nz8(result);
    result
}

/// Rotate right through carry.
pub(crate) fn ror(cc: &mut ConditionCodes, value: u8) -> u8 {
    let result = (value >> 1) | (u8::from(cc.c()) << 7);
    cc.set(ConditionCodes::CARRY, value & 0x01 != 0);
    cc.set_nz8(result);
    result
}
