//! # Stack Instructions
//!
//! PSHS, PULS, PSHU and PULU move any subset of the registers, chosen by a
//! postbyte, to or from the S or U stack:
//!
//! ```text
//!  bit:  7    6     5   4   3    2   1   0
//!        PC   U/S   Y   X   DP   B   A   CC
//! ```
//!
//! Bit 6 names the other stack pointer (U when pushing on S, S when pushing on
//! U). Pushes go from bit 7 down to bit 0, pulls in the reverse order. Each
//! byte moved costs one cycle.

use crate::cpu::Stack;
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// Executes PSHS (0x34), PULS (0x35), PSHU (0x36) or PULU (0x37).
pub(crate) fn execute_push_pull<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
) -> Result<u8, ExecutionError> {
    let postbyte = cpu.fetch_byte()?;
    let stack = if opcode & 0x02 == 0 { Stack::S } else { Stack::U };
    if opcode & 0x01 == 0 {
        push_registers(cpu, stack, postbyte)
    } else {
        pull_registers(cpu, stack, postbyte)
    }
}

fn other_stack<M: MemoryBus>(cpu: &CPU<M>, stack: Stack) -> u16 {
    match stack {
        Stack::S => cpu.u,
        Stack::U => cpu.s,
    }
}

fn push_registers<M: MemoryBus>(
    cpu: &mut CPU<M>,
    stack: Stack,
    postbyte: u8,
) -> Result<u8, ExecutionError> {
    let mut bytes = 0;
    if postbyte & 0x80 != 0 {
        cpu.push16(stack, cpu.pc)?;
        bytes += 2;
    }
    if postbyte & 0x40 != 0 {
        let value = other_stack(cpu, stack);
        cpu.push16(stack, value)?;
        bytes += 2;
    }
    if postbyte & 0x20 != 0 {
        cpu.push16(stack, cpu.y)?;
        bytes += 2;
    }
    if postbyte & 0x10 != 0 {
        cpu.push16(stack, cpu.x)?;
        bytes += 2;
    }
    if postbyte & 0x08 != 0 {
        cpu.push8(stack, cpu.dp)?;
        bytes += 1;
    }
    if postbyte & 0x04 != 0 {
        cpu.push8(stack, cpu.b)?;
        bytes += 1;
    }
    if postbyte & 0x02 != 0 {
        cpu.push8(stack, cpu.a)?;
        bytes += 1;
    }
    if postbyte & 0x01 != 0 {
        cpu.push8(stack, cpu.cc.bits())?;
        bytes += 1;
    }
    Ok(bytes)
}

fn pull_registers<M: MemoryBus>(
    cpu: &mut CPU<M>,
    stack: Stack,
    postbyte: u8,
) -> Result<u8, ExecutionError> {
    let mut bytes = 0;
    if postbyte & 0x01 != 0 {
        cpu.cc = ConditionCodes::from_bits(cpu.pull8(stack)?);
        bytes += 1;
    }
    if postbyte & 0x02 != 0 {
        cpu.a = cpu.pull8(stack)?;
        bytes += 1;
    }
    if postbyte & 0x04 != 0 {
        cpu.b = cpu.pull8(stack)?;
        bytes += 1;
    }
    if postbyte & 0x08 != 0 {
        cpu.dp = cpu.pull8(stack)?;
        bytes += 1;
    }
    if postbyte & 0x10 != 0 {
        cpu.x = cpu.pull16(stack)?;
        bytes += 2;
    }
    if postbyte & 0x20 != 0 {
        cpu.y = cpu.pull16(stack)?;
        bytes += 2;
    }
    if postbyte & 0x40 != 0 {
        let value = cpu.pull16(stack)?;
        match stack {
            Stack::S => cpu.u = value,
            Stack::U => cpu.s = value,
        }
        bytes += 2;
    }
    if postbyte & 0x80 != 0 {
        cpu.pc = cpu.pull16(stack)?;
        bytes += 2;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use crate::{FlatMemory, Step, CPU};

    fn cpu_with(program: &[u8]) -> CPU<FlatMemory> {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, program);
        let mut cpu = CPU::new(memory);
        cpu.set_s(0x8000);
        cpu.set_u(0x9000);
        cpu
    }

    #[test]
    fn test_pshs_order_and_cycles() {
        // PSHS A,B,X
        let mut cpu = cpu_with(&[0x34, 0x16]);
        cpu.set_a(0x11);
        cpu.set_b(0x22);
        cpu.set_x(0x3344);
        assert_eq!(cpu.step().unwrap(), Step::Cycles(9));
        assert_eq!(cpu.s(), 0x7FFC);
        // Lowest address holds the last pushed register
        assert_eq!(cpu.memory().peek(0x7FFC), 0x11);
        assert_eq!(cpu.memory().peek(0x7FFD), 0x22);
        assert_eq!(cpu.memory().peek(0x7FFE), 0x33);
        assert_eq!(cpu.memory().peek(0x7FFF), 0x44);
    }

    #[test]
    fn test_pshu_pulu_round_trip() {
        // PSHU S,Y,CC then PULU S,Y,CC
        let mut cpu = cpu_with(&[0x36, 0x61, 0x37, 0x61]);
        cpu.set_y(0xCAFE);
        cpu.set_cc(0x0Au8);
        cpu.step().unwrap();
        assert_eq!(cpu.u(), 0x9000 - 5);

        cpu.set_y(0);
        cpu.set_s(0);
        cpu.set_cc(0u8);
        cpu.step().unwrap();
        assert_eq!(cpu.u(), 0x9000);
        assert_eq!(cpu.y(), 0xCAFE);
        assert_eq!(cpu.s(), 0x8000);
        assert_eq!(cpu.cc().bits(), 0x0A);
    }

    #[test]
    fn test_puls_pc_returns() {
        // PSHS PC pushes the address after the instruction; PULS PC jumps there
        let mut cpu = cpu_with(&[0x34, 0x80, 0x35, 0x80]);
        cpu.step().unwrap();
        assert_eq!(cpu.step().unwrap(), Step::Cycles(7));
        assert_eq!(cpu.pc(), 0x0002);
        assert_eq!(cpu.s(), 0x8000);
    }
}
