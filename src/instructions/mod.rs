//! # 6809 Instruction Implementations
//!
//! This module contains the implementations of the 6809 instruction set,
//! organized by category. [`execute`] decodes an opcode (already looked up in
//! the metadata tables) into a call to one of the category functions.
//!
//! Every instruction function returns the cycles it adds on top of the table's
//! base count: the indexed postbyte surcharge, a taken long branch, or the
//! bytes moved by a push or pull.
//!
//! ## Categories
//!
//! - **alu**: ADD, ADC, SUB, SBC, CMP, AND, OR, EOR, BIT, ADDD, SUBD, MUL, DAA, SEX, ABX
//! - **branches**: Bcc, LBcc, BSR, LBSR, LBRA
//! - **shifts**: ASL, ASR, LSR, ROL, ROR
//! - **load_store**: LD, ST (8 and 16 bit), LEA
//! - **inc_dec**: INC, DEC, NEG, COM, CLR, TST
//! - **control**: JMP, JSR, RTS, RTI, SWI/SWI2/SWI3, CWAI, SYNC
//! - **stack**: PSHS, PULS, PSHU, PULU
//! - **flags**: ANDCC, ORCC
//! - **transfer**: TFR, EXG

pub mod alu;
pub mod branches;
pub mod control;
pub mod flags;
pub mod inc_dec;
pub mod load_store;
pub mod shifts;
pub mod stack;
pub mod transfer;

use crate::addressing::AddressingMode;
use crate::cpu::{Acc, Reg16};
use crate::opcodes::{OpcodeMetadata, PAGE2_PREFIX, PAGE3_PREFIX};
use crate::registers::ConditionCodes;
use crate::{ExecutionError, MemoryBus, CPU};

/// Flag-updating operation on one byte, shared by the read-modify-write group.
pub(crate) type UnaryOp = fn(&mut ConditionCodes, u8) -> u8;

/// Executes an implemented opcode and returns its extra cycles.
pub(crate) fn execute<M: MemoryBus>(
    cpu: &mut CPU<M>,
    page: u8,
    opcode: u8,
    metadata: &OpcodeMetadata,
) -> Result<u8, ExecutionError> {
    let mode = metadata.addressing_mode;
    match page {
        PAGE2_PREFIX => execute_page2(cpu, opcode, mode),
        PAGE3_PREFIX => execute_page3(cpu, opcode, mode),
        _ => execute_page0(cpu, opcode, mode),
    }
}

fn execute_page0<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    match opcode {
        0x0E | 0x6E | 0x7E => control::execute_jmp(cpu, mode),
        0x00..=0x0F | 0x40..=0x7F => execute_unary(cpu, opcode, mode),

        0x12 => Ok(0), // NOP
        0x13 => control::execute_sync(cpu),
        0x16 => branches::execute_lbra(cpu),
        0x17 => branches::execute_lbsr(cpu),
        0x19 => alu::execute_daa(cpu),
        0x1A => flags::execute_orcc(cpu),
        0x1C => flags::execute_andcc(cpu),
        0x1D => alu::execute_sex(cpu),
        0x1E => transfer::execute_exg(cpu),
        0x1F => transfer::execute_tfr(cpu),

        0x20..=0x2F => branches::execute_branch(cpu, opcode),

        0x30..=0x33 => load_store::execute_lea(cpu, opcode),
        0x34..=0x37 => stack::execute_push_pull(cpu, opcode),
        0x39 => control::execute_rts(cpu),
        0x3A => alu::execute_abx(cpu),
        0x3B => control::execute_rti(cpu),
        0x3C => control::execute_cwai(cpu),
        0x3D => alu::execute_mul(cpu),
        0x3F => control::execute_swi(cpu, control::SoftwareInterrupt::Swi),

        0x8D => branches::execute_bsr(cpu),
        0x9D | 0xAD | 0xBD => control::execute_jsr(cpu, mode),
        0x80..=0xFF => execute_column(cpu, opcode, mode),

        _ => Err(cpu.invalid_opcode()),
    }
}

/// Read-modify-write group: 0x0x (direct), 0x4x (A), 0x5x (B), 0x6x
/// (indexed), 0x7x (extended).
fn execute_unary<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let op: UnaryOp = match opcode & 0x0F {
        0x0 => inc_dec::neg,
        0x3 => inc_dec::com,
        0x4 => shifts::lsr,
        0x6 => shifts::ror,
        0x7 => shifts::asr,
        0x8 => shifts::asl,
        0x9 => shifts::rol,
        0xA => inc_dec::dec,
        0xC => inc_dec::inc,
        0xD => return inc_dec::execute_tst(cpu, opcode, mode),
        0xF => return inc_dec::execute_clr(cpu, opcode, mode),
        _ => return Err(cpu.invalid_opcode()),
    };

    match opcode & 0xF0 {
        0x40 => {
            let result = op(&mut cpu.cc, cpu.a);
            cpu.a = result;
            Ok(0)
        }
        0x50 => {
            let result = op(&mut cpu.cc, cpu.b);
            cpu.b = result;
            Ok(0)
        }
        _ => {
            let (addr, extra) = cpu.effective_address(mode)?;
            let value = cpu.memory.read(addr)?;
            let result = op(&mut cpu.cc, value);
            cpu.memory.write(addr, result)?;
            Ok(extra)
        }
    }
}

/// Four-mode columns 0x80-0xFF. Bit 6 selects the B side.
fn execute_column<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    let b_side = opcode & 0x40 != 0;
    let acc = if b_side { Acc::B } else { Acc::A };

    match (b_side, opcode & 0x0F) {
        (_, 0x0) => alu::execute_sub(cpu, acc, mode, false),
        (_, 0x1) => alu::execute_cmp(cpu, acc, mode),
        (_, 0x2) => alu::execute_sub(cpu, acc, mode, true),
        (false, 0x3) => alu::execute_subd(cpu, mode),
        (true, 0x3) => alu::execute_addd(cpu, mode),
        (_, 0x4) => alu::execute_logic(cpu, acc, mode, |a, m| a & m),
        (_, 0x5) => alu::execute_bit(cpu, acc, mode),
        (_, 0x6) => load_store::execute_load8(cpu, acc, mode),
        (_, 0x7) => load_store::execute_store8(cpu, acc, mode),
        (_, 0x8) => alu::execute_logic(cpu, acc, mode, |a, m| a ^ m),
        (_, 0x9) => alu::execute_add(cpu, acc, mode, true),
        (_, 0xA) => alu::execute_logic(cpu, acc, mode, |a, m| a | m),
        (_, 0xB) => alu::execute_add(cpu, acc, mode, false),
        (false, 0xC) => alu::execute_cmp16(cpu, Reg16::X, mode),
        (true, 0xC) => load_store::execute_load16(cpu, Reg16::D, mode),
        (true, 0xD) => load_store::execute_store16(cpu, Reg16::D, mode),
        (false, 0xE) => load_store::execute_load16(cpu, Reg16::X, mode),
        (false, 0xF) => load_store::execute_store16(cpu, Reg16::X, mode),
        (true, 0xE) => load_store::execute_load16(cpu, Reg16::U, mode),
        (true, 0xF) => load_store::execute_store16(cpu, Reg16::U, mode),
        _ => Err(cpu.invalid_opcode()),
    }
}

fn execute_page2<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    match opcode {
        0x21..=0x2F => branches::execute_long_branch(cpu, opcode),
        0x3F => control::execute_swi(cpu, control::SoftwareInterrupt::Swi2),
        0x83 | 0x93 | 0xA3 | 0xB3 => alu::execute_cmp16(cpu, Reg16::D, mode),
        0x8C | 0x9C | 0xAC | 0xBC => alu::execute_cmp16(cpu, Reg16::Y, mode),
        0x8E | 0x9E | 0xAE | 0xBE => load_store::execute_load16(cpu, Reg16::Y, mode),
        0x9F | 0xAF | 0xBF => load_store::execute_store16(cpu, Reg16::Y, mode),
        0xCE | 0xDE | 0xEE | 0xFE => load_store::execute_load16(cpu, Reg16::S, mode),
        0xDF | 0xEF | 0xFF => load_store::execute_store16(cpu, Reg16::S, mode),
        _ => Err(cpu.invalid_opcode()),
    }
}

fn execute_page3<M: MemoryBus>(
    cpu: &mut CPU<M>,
    opcode: u8,
    mode: AddressingMode,
) -> Result<u8, ExecutionError> {
    match opcode {
        0x3F => control::execute_swi(cpu, control::SoftwareInterrupt::Swi3),
        0x83 | 0x93 | 0xA3 | 0xB3 => alu::execute_cmp16(cpu, Reg16::U, mode),
        0x8C | 0x9C | 0xAC | 0xBC => alu::execute_cmp16(cpu, Reg16::S, mode),
        _ => Err(cpu.invalid_opcode()),
    }
}
