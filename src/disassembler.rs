//! # Disassembler
//!
//! Decodes a single instruction from any [`MemoryBus`] into assembler text.
//! Used by the execution trace and the `sim6809` front end.
//!
//! Bytes that do not start a valid instruction (undefined opcodes, undefined
//! indexed postbytes) are rendered as a one-byte `FCB` directive so that a
//! listing can always make progress.
//!
//! # Examples
//!
//! ```
//! use lib6809::{disassemble, FlatMemory};
//!
//! let mut memory = FlatMemory::new();
//! memory.load(0x1000, &[0x10, 0x8E, 0x12, 0x34, 0xA6, 0xB1, 0x34, 0x16]);
//!
//! let ldy = disassemble(&mut memory, 0x1000).unwrap();
//! assert_eq!(ldy.to_string(), "LDY #$1234");
//! assert_eq!(ldy.size, 4);
//!
//! let lda = disassemble(&mut memory, 0x1004).unwrap();
//! assert_eq!(lda.to_string(), "LDA [,Y++]");
//!
//! let pshs = disassemble(&mut memory, 0x1006).unwrap();
//! assert_eq!(pshs.to_string(), "PSHS A,B,X");
//! ```

use std::fmt;

use crate::addressing::{AddressingMode, IndexedKind, IndexedMode};
use crate::memory::{BusError, MemoryBus};
use crate::opcodes::{lookup, PAGE2_PREFIX, PAGE3_PREFIX};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Address of the first byte (the prefix, for prefixed opcodes).
    pub address: u16,
    /// Every byte of the instruction, prefix and operands included.
    pub bytes: Vec<u8>,
    pub mnemonic: &'static str,
    pub operand: String,
    pub size: u8,
}

impl Instruction {
    fn fcb(address: u16, byte: u8) -> Self {
        Instruction {
            address,
            bytes: vec![byte],
            mnemonic: "FCB",
            operand: format!("${:02X}", byte),
            size: 1,
        }
    }

    /// True for the `FCB` rendering of an undecodable byte.
    pub fn is_data(&self) -> bool {
        self.mnemonic == "FCB"
    }

    /// Address of the following instruction.
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.size as u16)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operand.is_empty() {
            f.pad(self.mnemonic)
        } else {
            f.pad(&format!("{} {}", self.mnemonic, self.operand))
        }
    }
}

/// Sequential reader that records the bytes it consumes.
struct Cursor<'a, M: MemoryBus + ?Sized> {
    bus: &'a mut M,
    addr: u16,
    bytes: Vec<u8>,
}

impl<M: MemoryBus + ?Sized> Cursor<'_, M> {
    fn byte(&mut self) -> Result<u8, BusError> {
        let value = self.bus.read(self.addr)?;
        self.addr = self.addr.wrapping_add(1);
        self.bytes.push(value);
        Ok(value)
    }

    fn word(&mut self) -> Result<u16, BusError> {
        let high = self.byte()?;
        let low = self.byte()?;
        Ok(u16::from_be_bytes([high, low]))
    }
}

/// Disassembles the instruction at `addr`.
pub fn disassemble<M: MemoryBus + ?Sized>(bus: &mut M, addr: u16) -> Result<Instruction, BusError> {
    let mut cursor = Cursor {
        bus,
        addr,
        bytes: Vec::with_capacity(5),
    };

    let first = cursor.byte()?;
    let (page, opcode) = if first == PAGE2_PREFIX || first == PAGE3_PREFIX {
        (first, cursor.byte()?)
    } else {
        (0, first)
    };

    let meta = lookup(page, opcode);
    if !meta.is_defined() {
        return Ok(Instruction::fcb(addr, first));
    }

    let opcode_len: u8 = if page == 0 { 1 } else { 2 };
    let operand = match meta.addressing_mode {
        AddressingMode::Inherent => String::new(),
        AddressingMode::Immediate => {
            if meta.size_bytes - opcode_len == 2 {
                format!("#${:04X}", cursor.word()?)
            } else {
                format!("#${:02X}", cursor.byte()?)
            }
        }
        AddressingMode::Direct => format!("<${:02X}", cursor.byte()?),
        AddressingMode::Extended => format!("${:04X}", cursor.word()?),
        AddressingMode::Relative => {
            let offset = cursor.byte()? as i8;
            format!("${:04X}", cursor.addr.wrapping_add(offset as u16))
        }
        AddressingMode::LongRelative => {
            let offset = cursor.word()?;
            format!("${:04X}", cursor.addr.wrapping_add(offset))
        }
        AddressingMode::Register => {
            let postbyte = cursor.byte()?;
            format!(
                "{},{}",
                register_name(postbyte >> 4),
                register_name(postbyte & 0x0F)
            )
        }
        AddressingMode::StackList => {
            let postbyte = cursor.byte()?;
            register_list(postbyte, opcode & 0x02 != 0)
        }
        AddressingMode::Indexed => {
            let postbyte = cursor.byte()?;
            match IndexedMode::decode(postbyte) {
                Some(mode) => indexed_operand(&mut cursor, mode)?,
                None => return Ok(Instruction::fcb(addr, first)),
            }
        }
    };

    let size = cursor.bytes.len() as u8;
    Ok(Instruction {
        address: addr,
        bytes: cursor.bytes,
        mnemonic: meta.mnemonic,
        operand,
        size,
    })
}

fn register_name(code: u8) -> &'static str {
    match code {
        0x0 => "D",
        0x1 => "X",
        0x2 => "Y",
        0x3 => "U",
        0x4 => "S",
        0x5 => "PC",
        0x8 => "A",
        0x9 => "B",
        0xA => "CC",
        0xB => "DP",
        _ => "?",
    }
}

/// Register list in postbyte bit order; bit 6 names the other stack pointer.
fn register_list(postbyte: u8, user_stack: bool) -> String {
    let other = if user_stack { "S" } else { "U" };
    let names = ["CC", "A", "B", "DP", "X", "Y", other, "PC"];
    names
        .iter()
        .enumerate()
        .filter(|(bit, _)| postbyte & (1u8 << *bit) != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

fn signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-${:02X}", -value)
    } else {
        format!("${:02X}", value)
    }
}

fn indexed_operand<M: MemoryBus + ?Sized>(
    cursor: &mut Cursor<'_, M>,
    mode: IndexedMode,
) -> Result<String, BusError> {
    let r = mode.register.name();
    let text = match mode.kind {
        IndexedKind::Offset5(offset) => format!("{},{}", offset, r),
        IndexedKind::PostIncrement1 => format!(",{}+", r),
        IndexedKind::PostIncrement2 => format!(",{}++", r),
        IndexedKind::PreDecrement1 => format!(",-{}", r),
        IndexedKind::PreDecrement2 => format!(",--{}", r),
        IndexedKind::NoOffset => format!(",{}", r),
        IndexedKind::AccumulatorA => format!("A,{}", r),
        IndexedKind::AccumulatorB => format!("B,{}", r),
        IndexedKind::AccumulatorD => format!("D,{}", r),
        IndexedKind::Offset8 => format!("{},{}", signed_hex(cursor.byte()? as i8 as i32), r),
        IndexedKind::Offset16 => format!("${:04X},{}", cursor.word()?, r),
        IndexedKind::PcOffset8 => {
            let offset = cursor.byte()? as i8;
            format!("${:04X},PCR", cursor.addr.wrapping_add(offset as u16))
        }
        IndexedKind::PcOffset16 => {
            let offset = cursor.word()?;
            format!("${:04X},PCR", cursor.addr.wrapping_add(offset))
        }
        IndexedKind::ExtendedIndirect => format!("${:04X}", cursor.word()?),
    };

    Ok(if mode.indirect {
        format!("[{}]", text)
    } else {
        text
    })
}
