//! # Registers and Condition Codes
//!
//! The 6809 register file: two 8-bit accumulators A and B (concatenated as the
//! 16-bit D register), the X and Y index registers, the U (user) and S (system)
//! stack pointers, the program counter, the direct page register and the
//! condition code register.
//!
//! ## Condition Code Layout
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! +---+---+---+---+---+---+---+---+
//! | E | F | H | I | N | Z | V | C |
//! +---+---+---+---+---+---+---+---+
//! ```
//!
//! The arithmetic helpers on [`ConditionCodes`] compute a result and update
//! the flags the way the corresponding 6809 instructions do, so instruction
//! implementations can stay a few lines long.

use std::fmt;

/// Condition code register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ConditionCodes(u8);

impl ConditionCodes {
    pub const CARRY: u8 = 0x01;
    pub const OVERFLOW: u8 = 0x02;
    pub const ZERO: u8 = 0x04;
    pub const NEGATIVE: u8 = 0x08;
    pub const IRQ_MASK: u8 = 0x10;
    pub const HALF_CARRY: u8 = 0x20;
    pub const FIRQ_MASK: u8 = 0x40;
    pub const ENTIRE: u8 = 0x80;

    pub const fn from_bits(bits: u8) -> Self {
        ConditionCodes(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn set(&mut self, mask: u8, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    pub fn c(self) -> bool {
        self.contains(Self::CARRY)
    }

    pub fn v(self) -> bool {
        self.contains(Self::OVERFLOW)
    }

    pub fn z(self) -> bool {
        self.contains(Self::ZERO)
    }

    pub fn n(self) -> bool {
        self.contains(Self::NEGATIVE)
    }

    pub fn i(self) -> bool {
        self.contains(Self::IRQ_MASK)
    }

    pub fn h(self) -> bool {
        self.contains(Self::HALF_CARRY)
    }

    pub fn f(self) -> bool {
        self.contains(Self::FIRQ_MASK)
    }

    pub fn e(self) -> bool {
        self.contains(Self::ENTIRE)
    }

    /// Sets N and Z from an 8-bit result.
    pub fn set_nz8(&mut self, value: u8) {
        self.set(Self::NEGATIVE, value & 0x80 != 0);
        self.set(Self::ZERO, value == 0);
    }

    /// Sets N and Z from a 16-bit result.
    pub fn set_nz16(&mut self, value: u16) {
        self.set(Self::NEGATIVE, value & 0x8000 != 0);
        self.set(Self::ZERO, value == 0);
    }

    /// N, Z from the value, V cleared. Loads, stores and logical operations.
    pub fn set_logic8(&mut self, value: u8) {
        self.set_nz8(value);
        self.set(Self::OVERFLOW, false);
    }

    pub fn set_logic16(&mut self, value: u16) {
        self.set_nz16(value);
        self.set(Self::OVERFLOW, false);
    }

    /// 8-bit addition with optional carry in. Updates H, N, Z, V, C.
    pub fn add8(&mut self, a: u8, b: u8, carry: bool) -> u8 {
        let sum = a as u16 + b as u16 + carry as u16;
        let result = sum as u8;
        self.set(Self::HALF_CARRY, ((a ^ b ^ result) & 0x10) != 0);
        self.set(Self::OVERFLOW, ((a ^ result) & (b ^ result) & 0x80) != 0);
        self.set(Self::CARRY, sum > 0xFF);
        self.set_nz8(result);
        result
    }

    /// 8-bit subtraction with optional borrow in. Updates N, Z, V, C.
    ///
    /// H is undefined on the 6809 for subtraction and is left unchanged.
    pub fn sub8(&mut self, a: u8, b: u8, borrow: bool) -> u8 {
        let diff = (a as u16)
            .wrapping_sub(b as u16)
            .wrapping_sub(borrow as u16);
        let result = diff as u8;
        self.set(Self::OVERFLOW, ((a ^ b) & (a ^ result) & 0x80) != 0);
        self.set(Self::CARRY, diff > 0xFF);
        self.set_nz8(result);
        result
    }

    /// 16-bit addition (ADDD). Updates N, Z, V, C.
    pub fn add16(&mut self, a: u16, b: u16) -> u16 {
        let sum = a as u32 + b as u32;
        let result = sum as u16;
        self.set(Self::OVERFLOW, ((a ^ result) & (b ^ result) & 0x8000) != 0);
        self.set(Self::CARRY, sum > 0xFFFF);
        self.set_nz16(result);
        result
    }

    /// 16-bit subtraction (SUBD and the 16-bit compares). Updates N, Z, V, C.
    pub fn sub16(&mut self, a: u16, b: u16) -> u16 {
        let diff = (a as u32).wrapping_sub(b as u32);
        let result = diff as u16;
        self.set(Self::OVERFLOW, ((a ^ b) & (a ^ result) & 0x8000) != 0);
        self.set(Self::CARRY, diff > 0xFFFF);
        self.set_nz16(result);
        result
    }

    /// Renders the register as `EFHINZVC`, with `-` for clear bits.
    pub fn to_flag_string(self) -> String {
        const NAMES: [char; 8] = ['E', 'F', 'H', 'I', 'N', 'Z', 'V', 'C'];
        NAMES
            .iter()
            .enumerate()
            .map(|(i, &name)| {
                if self.0 & (0x80 >> i) != 0 {
                    name
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl From<u8> for ConditionCodes {
    fn from(bits: u8) -> Self {
        ConditionCodes(bits)
    }
}

impl From<ConditionCodes> for u8 {
    fn from(cc: ConditionCodes) -> Self {
        cc.0
    }
}

impl fmt::Display for ConditionCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_flag_string())
    }
}

/// Snapshot of the full register file.
///
/// Used for register dumps, tracing, and bulk state restore in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub dp: u8,
    pub cc: ConditionCodes,
    pub x: u16,
    pub y: u16,
    pub u: u16,
    pub s: u16,
    pub pc: u16,
}

impl Registers {
    /// The D register, A in the high byte.
    pub fn d(&self) -> u16 {
        ((self.a as u16) << 8) | self.b as u16
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC:{:04X} A:{:02X} B:{:02X} X:{:04X} Y:{:04X} U:{:04X} S:{:04X} DP:{:02X} CC:{:02X} [{}]",
            self.pc,
            self.a,
            self.b,
            self.x,
            self.y,
            self.u,
            self.s,
            self.dp,
            self.cc.bits(),
            self.cc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_string() {
        let cc = ConditionCodes::from_bits(ConditionCodes::ENTIRE | ConditionCodes::ZERO);
        assert_eq!(cc.to_flag_string(), "E----Z--");
        assert_eq!(ConditionCodes::default().to_string(), "--------");
    }

    #[test]
    fn test_add8_half_carry_and_overflow() {
        let mut cc = ConditionCodes::default();
        assert_eq!(cc.add8(0x0F, 0x01, false), 0x10);
        assert!(cc.h());
        assert!(!cc.c());

        assert_eq!(cc.add8(0x7F, 0x01, false), 0x80);
        assert!(cc.v());
        assert!(cc.n());

        assert_eq!(cc.add8(0xFF, 0x00, true), 0x00);
        assert!(cc.c());
        assert!(cc.z());
    }

    #[test]
    fn test_sub8_borrow() {
        let mut cc = ConditionCodes::default();
        assert_eq!(cc.sub8(0x00, 0x01, false), 0xFF);
        assert!(cc.c());
        assert!(cc.n());
        assert!(!cc.v());

        assert_eq!(cc.sub8(0x80, 0x01, false), 0x7F);
        assert!(cc.v());
        assert!(!cc.c());
    }

    #[test]
    fn test_sub16_compare() {
        let mut cc = ConditionCodes::default();
        cc.sub16(0x1234, 0x1234);
        assert!(cc.z());
        assert!(!cc.c());

        cc.sub16(0x0000, 0x0001);
        assert!(cc.c());
        assert!(cc.n());
    }

    #[test]
    fn test_registers_display() {
        let regs = Registers {
            a: 0x12,
            b: 0x34,
            pc: 0x1000,
            ..Default::default()
        };
        assert_eq!(regs.d(), 0x1234);
        assert!(regs.to_string().starts_with("PC:1000 A:12 B:34"));
    }
}
