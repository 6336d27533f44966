//! # Control Flow Instructions
//!
//! This module implements:
//! - JMP, JSR, RTS
//! - RTI
//! - SWI, SWI2, SWI3
//! - CWAI, SYNC
//!
//! The software interrupts push the entire register set (E set) onto S and
//! vector through their own vectors. Only SWI masks IRQ and FIRQ.

use crate::addressing::AddressingMode;
use crate::cpu::{Stack, WaitState};
use crate::interrupts::{SWI2_VECTOR, SWI3_VECTOR, SWI_VECTOR};
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// The three software interrupt instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SoftwareInterrupt {
    Swi,
    Swi2,
    Swi3,
}

impl SoftwareInterrupt {
    fn vector(self) -> u16 {
        match self {
            SoftwareInterrupt::Swi => SWI_VECTOR,
            SoftwareInterrupt::Swi2 => SWI2_VECTOR,
            SoftwareInterrupt::Swi3 => SWI3_VECTOR,
        }
    }
}

pub(crate) fn execute_jmp<M: MemoryBus>(
    cpu: &mut CPU<M>,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (target, extra) = cpu.effective_address(mode)?;
    cpu.pc = target;
    Ok(extra)
}

/// Executes JSR: pushes the return address on S, then jumps.
pub(crate) fn execute_jsr<M: MemoryBus>(
    cpu: &mut CPU<M>,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let (target, extra) = cpu.effective_address(mode)?;
    cpu.push16(Stack::S, cpu.pc)?;
    cpu.pc = target;
    Ok(extra)
}

pub(crate) fn execute_rts<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    cpu.pc = cpu.pull16(Stack::S)?;
    Ok(0)
}

/// Executes RTI. An entire-state frame costs 9 cycles more than a FIRQ frame.
pub(crate) fn execute_rti<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let entire = cpu.pull_interrupt_frame()?;
    Ok(if entire { 9 } else { 0 })
}

pub(crate) fn execute_swi<M: MemoryBus>(
    cpu: &mut CPU<M>,
    kind: SoftwareInterrupt,
) -> Result<u8, ExecutionError> {
    cpu.push_entire_state()?;
    if kind == SoftwareInterrupt::Swi {
        cpu.cc
            .set(ConditionCodes::IRQ_MASK | ConditionCodes::FIRQ_MASK, true);
    }
    cpu.pc = cpu.memory.read_word(kind.vector())?;
    Ok(0)
}

/// Executes CWAI: ANDs CC with the immediate byte, stacks the entire state
/// and waits for an interrupt.
pub(crate) fn execute_cwai<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    let mask = cpu.fetch_byte()?;
    cpu.cc = ConditionCodes::from_bits(cpu.cc.bits() & mask);
    cpu.push_entire_state()?;
    cpu.wait = WaitState::Cwai;
    Ok(0)
}

/// Executes SYNC: waits until any interrupt line is requested.
pub(crate) fn execute_sync<M: MemoryBus>(cpu: &mut CPU<M>) -> Result<u8, ExecutionError> {
    cpu.wait = WaitState::Sync;
    Ok(0)
}
