//! # Addressing Modes
//!
//! This module defines the addressing modes of the 6809 processor and the
//! grammar of the indexed-mode postbyte.
//!
//! Every memory-referencing instruction comes in up to four flavours
//! (immediate, direct, indexed, extended). Indexed mode is itself a small
//! language: a postbyte following the opcode selects the base register, the
//! offset kind and whether the computed address is used directly or as a
//! pointer to the real operand address.
//!
//! ## Indexed Postbyte Grammar
//!
//! ```text
//! 0RRnnnnn           5-bit signed offset, never indirect
//! 1RRI0000  ,R+      post-increment by 1 (I must be 0)
//! 1RRI0001  ,R++     post-increment by 2
//! 1RRI0010  ,-R      pre-decrement by 1 (I must be 0)
//! 1RRI0011  ,--R     pre-decrement by 2
//! 1RRI0100  ,R       no offset
//! 1RRI0101  B,R      B accumulator offset
//! 1RRI0110  A,R      A accumulator offset
//! 1RRI1000  n,R      8-bit offset
//! 1RRI1001  n,R      16-bit offset
//! 1RRI1011  D,R      D accumulator offset
//! 1xxI1100  n,PCR    8-bit offset from PC
//! 1xxI1101  n,PCR    16-bit offset from PC
//! 1xx11111  [n]      extended indirect
//! ```
//!
//! RR selects X (00), Y (01), U (10) or S (11). Low nibbles 0111, 1010 and
//! 1110, and 1xx01111, are undefined.

use std::fmt;

/// 6809 addressing mode enumeration.
///
/// # Operand Sizes
///
/// - **0 bytes**: Inherent
/// - **1 byte**: Direct, Relative, Register (TFR/EXG), StackList (PSH/PUL)
/// - **1 or 2 bytes**: Immediate (depends on register width)
/// - **2 bytes**: Extended, LongRelative
/// - **1 to 3 bytes**: Indexed (postbyte plus optional offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// No operand, operation implied by instruction.
    ///
    /// Examples: NOP, RTS, MUL, NEGA
    Inherent,

    /// Constant operand in instruction.
    ///
    /// Example: LDA #$10, LDX #$1234
    Immediate,

    /// 8-bit address combined with the DP register as the high byte.
    ///
    /// Example: LDA <$80 (load from DP:80)
    Direct,

    /// Full 16-bit address.
    ///
    /// Example: JMP $1234
    Extended,

    /// Postbyte-selected indexed address, see [`IndexedMode`].
    ///
    /// Example: LDA 5,X / LDA [,Y++]
    Indexed,

    /// Signed 8-bit offset for short branches.
    Relative,

    /// Signed 16-bit offset for long branches, LBRA and LBSR.
    LongRelative,

    /// Register-pair postbyte (TFR, EXG).
    Register,

    /// Register-list postbyte (PSHS, PULS, PSHU, PULU).
    StackList,
}

/// Base register selected by bits 6-5 of an indexed postbyte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRegister {
    X,
    Y,
    U,
    S,
}

impl IndexRegister {
    pub fn from_postbyte(postbyte: u8) -> Self {
        match (postbyte >> 5) & 0x03 {
            0 => IndexRegister::X,
            1 => IndexRegister::Y,
            2 => IndexRegister::U,
            _ => IndexRegister::S,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexRegister::X => "X",
            IndexRegister::Y => "Y",
            IndexRegister::U => "U",
            IndexRegister::S => "S",
        }
    }
}

/// Offset kind encoded in an indexed postbyte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedKind {
    /// Signed 5-bit constant offset held in the postbyte itself.
    Offset5(i8),
    PostIncrement1,
    PostIncrement2,
    PreDecrement1,
    PreDecrement2,
    NoOffset,
    AccumulatorB,
    AccumulatorA,
    /// Signed 8-bit offset in the following byte.
    Offset8,
    /// 16-bit offset in the following two bytes.
    Offset16,
    AccumulatorD,
    /// Signed 8-bit offset from the address of the next instruction.
    PcOffset8,
    /// 16-bit offset from the address of the next instruction.
    PcOffset16,
    /// 16-bit pointer in the following two bytes (always indirect).
    ExtendedIndirect,
}

/// Decoded indexed postbyte.
///
/// # Examples
///
/// ```
/// use lib6809::{IndexedMode, IndexedKind, IndexRegister};
///
/// let mode = IndexedMode::decode(0xB1).unwrap(); // [,Y++]
/// assert_eq!(mode.register, IndexRegister::Y);
/// assert_eq!(mode.kind, IndexedKind::PostIncrement2);
/// assert!(mode.indirect);
/// assert_eq!(mode.extra_cycles(), 6);
///
/// assert!(IndexedMode::decode(0x87).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedMode {
    pub register: IndexRegister,
    pub kind: IndexedKind,
    pub indirect: bool,
}

impl IndexedMode {
    /// Decodes a postbyte, returning `None` for undefined encodings.
    pub fn decode(postbyte: u8) -> Option<Self> {
        let register = IndexRegister::from_postbyte(postbyte);

        if postbyte & 0x80 == 0 {
            // Sign-extend the low five bits
            let offset = ((postbyte << 3) as i8) >> 3;
            return Some(IndexedMode {
                register,
                kind: IndexedKind::Offset5(offset),
                indirect: false,
            });
        }

        let indirect = postbyte & 0x10 != 0;
        let kind = match postbyte & 0x0F {
            0x0 if !indirect => IndexedKind::PostIncrement1,
            0x1 => IndexedKind::PostIncrement2,
            0x2 if !indirect => IndexedKind::PreDecrement1,
            0x3 => IndexedKind::PreDecrement2,
            0x4 => IndexedKind::NoOffset,
            0x5 => IndexedKind::AccumulatorB,
            0x6 => IndexedKind::AccumulatorA,
            0x8 => IndexedKind::Offset8,
            0x9 => IndexedKind::Offset16,
            0xB => IndexedKind::AccumulatorD,
            0xC => IndexedKind::PcOffset8,
            0xD => IndexedKind::PcOffset16,
            0xF if indirect => IndexedKind::ExtendedIndirect,
            _ => return None,
        };

        Some(IndexedMode {
            register,
            kind,
            indirect,
        })
    }

    /// Number of offset bytes following the postbyte.
    pub fn offset_bytes(&self) -> u8 {
        match self.kind {
            IndexedKind::Offset8 | IndexedKind::PcOffset8 => 1,
            IndexedKind::Offset16 | IndexedKind::PcOffset16 | IndexedKind::ExtendedIndirect => 2,
            _ => 0,
        }
    }

    /// Cycles added on top of the instruction's base cycle count.
    pub fn extra_cycles(&self) -> u8 {
        let direct = match self.kind {
            IndexedKind::Offset5(_) => 1,
            IndexedKind::PostIncrement1 | IndexedKind::PreDecrement1 => 2,
            IndexedKind::PostIncrement2 | IndexedKind::PreDecrement2 => 3,
            IndexedKind::NoOffset => 0,
            IndexedKind::AccumulatorA | IndexedKind::AccumulatorB => 1,
            IndexedKind::Offset8 | IndexedKind::PcOffset8 => 1,
            IndexedKind::Offset16 | IndexedKind::AccumulatorD => 4,
            IndexedKind::PcOffset16 => 5,
            IndexedKind::ExtendedIndirect => return 5,
        };
        if self.indirect {
            direct + 3
        } else {
            direct
        }
    }
}

impl fmt::Display for IndexedMode {
    /// Formats the operand without the offset value, e.g. `,X+` or `[D,U]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.register.name();
        let body = match self.kind {
            IndexedKind::Offset5(n) => format!("{},{}", n, r),
            IndexedKind::PostIncrement1 => format!(",{}+", r),
            IndexedKind::PostIncrement2 => format!(",{}++", r),
            IndexedKind::PreDecrement1 => format!(",-{}", r),
            IndexedKind::PreDecrement2 => format!(",--{}", r),
            IndexedKind::NoOffset => format!(",{}", r),
            IndexedKind::AccumulatorB => format!("B,{}", r),
            IndexedKind::AccumulatorA => format!("A,{}", r),
            IndexedKind::AccumulatorD => format!("D,{}", r),
            IndexedKind::Offset8 | IndexedKind::Offset16 => format!("n,{}", r),
            IndexedKind::PcOffset8 | IndexedKind::PcOffset16 => "n,PCR".to_string(),
            IndexedKind::ExtendedIndirect => "n".to_string(),
        };
        if self.indirect {
            write!(f, "[{}]", body)
        } else {
            f.write_str(&body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_bit_offsets_sign_extend() {
        assert_eq!(IndexedMode::decode(0x0F).unwrap().kind, IndexedKind::Offset5(15));
        assert_eq!(IndexedMode::decode(0x10).unwrap().kind, IndexedKind::Offset5(-16));
        assert_eq!(IndexedMode::decode(0x1F).unwrap().kind, IndexedKind::Offset5(-1));

        let mode = IndexedMode::decode(0x7F).unwrap();
        assert_eq!(mode.register, IndexRegister::S);
        assert!(!mode.indirect);
    }

    #[test]
    fn test_undefined_postbytes() {
        for low in [0x07u8, 0x0A, 0x0E] {
            assert!(IndexedMode::decode(0x80 | low).is_none());
            assert!(IndexedMode::decode(0x90 | low).is_none());
        }
        // Single-step auto increment/decrement cannot be indirect
        assert!(IndexedMode::decode(0x90).is_none());
        assert!(IndexedMode::decode(0x92).is_none());
        // Extended indirect requires the indirect bit
        assert!(IndexedMode::decode(0x8F).is_none());
        assert!(IndexedMode::decode(0x9F).is_some());
    }

    #[test]
    fn test_cycle_surcharges() {
        assert_eq!(IndexedMode::decode(0x84).unwrap().extra_cycles(), 0); // ,X
        assert_eq!(IndexedMode::decode(0x94).unwrap().extra_cycles(), 3); // [,X]
        assert_eq!(IndexedMode::decode(0x80).unwrap().extra_cycles(), 2); // ,X+
        assert_eq!(IndexedMode::decode(0x81).unwrap().extra_cycles(), 3); // ,X++
        assert_eq!(IndexedMode::decode(0x89).unwrap().extra_cycles(), 4); // n16,X
        assert_eq!(IndexedMode::decode(0x8D).unwrap().extra_cycles(), 5); // n16,PCR
        assert_eq!(IndexedMode::decode(0x9D).unwrap().extra_cycles(), 8); // [n16,PCR]
        assert_eq!(IndexedMode::decode(0x9F).unwrap().extra_cycles(), 5); // [n]
    }

    #[test]
    fn test_display() {
        assert_eq!(IndexedMode::decode(0xA0).unwrap().to_string(), ",Y+");
        assert_eq!(IndexedMode::decode(0xDB).unwrap().to_string(), "[D,U]");
        assert_eq!(IndexedMode::decode(0x62).unwrap().to_string(), "2,S");
    }
}
