//! # Condition Code Instructions
//!
//! ORCC sets and ANDCC clears condition code bits with an immediate mask.
//! They are the 6809 replacements for the single-flag set/clear instructions
//! of earlier parts (`ORCC #$50` masks both interrupts, `ANDCC #$FE` clears
//! carry).

use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

pub(crate) fn execute_orcc<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let mask = cpu.fetch_byte()?;
    cpu.cc = ConditionCodes::from_bits(cpu.cc.bits() | mask);
    Ok(0)
}

pub(crate) fn execute_andcc<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let mask = cpu.fetch_byte()?;
    cpu.cc = ConditionCodes::from_bits(cpu.cc.bits() & mask);
    Ok(0)
}
