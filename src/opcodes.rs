//! # Opcode Metadata Tables
//!
//! This module contains the three 256-entry opcode metadata tables that serve as
//! the single source of truth for 6809 instruction information:
//!
//! - [`OPCODE_TABLE`] - unprefixed opcodes
//! - [`PAGE2_TABLE`] - opcodes following the 0x10 prefix
//! - [`PAGE3_TABLE`] - opcodes following the 0x11 prefix
//!
//! Each entry records the mnemonic, addressing mode, base cycle cost and size.
//! Undefined opcodes carry the `"???"` mnemonic. Defined instructions used in an
//! addressing mode they cannot take (a store with an immediate operand) carry
//! their real mnemonic with `implemented: false`, which the CPU reports as an
//! invalid address mode rather than an invalid opcode.
//!
//! ## Prefixed Pages
//!
//! Entries in the prefixed tables store the datasheet cycle count minus one;
//! the CPU adds the one cycle spent fetching the prefix byte. Their sizes
//! include the prefix byte.
//!
//! ## Indexed Mode
//!
//! For indexed entries, `base_cycles` and `size_bytes` exclude the postbyte
//! surcharge and offset bytes, which depend on the postbyte (see
//! [`IndexedMode`](crate::addressing::IndexedMode)).

use crate::addressing::AddressingMode;

/// Metadata for a single 6809 opcode.
///
/// # Examples
///
/// ```
/// use lib6809::{AddressingMode, OPCODE_TABLE, PAGE2_TABLE};
///
/// let lda_imm = &OPCODE_TABLE[0x86];
/// assert_eq!(lda_imm.mnemonic, "LDA");
/// assert_eq!(lda_imm.addressing_mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.base_cycles, 2);
/// assert_eq!(lda_imm.size_bytes, 2);
///
/// let ldy_imm = &PAGE2_TABLE[0x8E];
/// assert_eq!(ldy_imm.mnemonic, "LDY");
/// assert_eq!(ldy_imm.size_bytes, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMetadata {
    /// Instruction mnemonic (e.g., "LDA", "PSHS", "???" for undefined opcodes).
    pub mnemonic: &'static str,

    /// Addressing mode for this instruction.
    pub addressing_mode: AddressingMode,

    /// Base cycle cost, before indexed surcharges, taken long branches,
    /// stacked bytes and the prefix cycle.
    pub base_cycles: u8,

    /// Instruction size in bytes, including any prefix, excluding indexed
    /// offset bytes.
    pub size_bytes: u8,

    /// Whether the CPU executes this opcode.
    pub implemented: bool,
}

impl OpcodeMetadata {
    /// True for entries that name a real instruction (even in an invalid mode).
    pub fn is_defined(&self) -> bool {
        self.mnemonic != ILLEGAL.mnemonic
    }
}

type Table = [OpcodeMetadata; 256];

const ILLEGAL: OpcodeMetadata = OpcodeMetadata {
    mnemonic: "???",
    addressing_mode: AddressingMode::Inherent,
    base_cycles: 0,
    size_bytes: 1,
    implemented: false,
};

const fn op(
    mnemonic: &'static str,
    addressing_mode: AddressingMode,
    base_cycles: u8,
    size_bytes: u8,
) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode,
        base_cycles,
        size_bytes,
        implemented: true,
    }
}

const fn bad_mode(mnemonic: &'static str, size_bytes: u8) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode: AddressingMode::Immediate,
        base_cycles: 0,
        size_bytes,
        implemented: false,
    }
}

/// Cycle profile of a four-mode (immediate/direct/indexed/extended) column.
#[derive(Clone, Copy)]
enum Group {
    Byte,
    StoreByte,
    Word,
    LoadWord,
    StoreWord,
}

/// Fills the four entries of a column starting at the immediate opcode.
///
/// `prefix` is 1 for the prefixed pages: sizes grow by the prefix byte. The
/// prefix cycle is added by the CPU, so cycles are the unprefixed counts.
const fn column(mut t: Table, imm: usize, name: &'static str, group: Group, prefix: u8) -> Table {
    let (imm_cycles, dir, idx, ext, imm_size) = match group {
        Group::Byte => (2, 4, 4, 5, 2),
        Group::StoreByte => (0, 4, 4, 5, 2),
        Group::Word => (4, 6, 6, 7, 3),
        Group::LoadWord => (3, 5, 5, 6, 3),
        Group::StoreWord => (0, 5, 5, 6, 3),
    };
    t[imm] = match group {
        Group::StoreByte | Group::StoreWord => bad_mode(name, imm_size + prefix),
        _ => op(name, AddressingMode::Immediate, imm_cycles, imm_size + prefix),
    };
    t[imm + 0x10] = op(name, AddressingMode::Direct, dir, 2 + prefix);
    t[imm + 0x20] = op(name, AddressingMode::Indexed, idx, 2 + prefix);
    t[imm + 0x30] = op(name, AddressingMode::Extended, ext, 3 + prefix);
    t
}

/// Read-modify-write group: low nibble and the memory/A/B mnemonics.
const UNARY: [(usize, &str, &str, &str); 11] = [
    (0x0, "NEG", "NEGA", "NEGB"),
    (0x3, "COM", "COMA", "COMB"),
    (0x4, "LSR", "LSRA", "LSRB"),
    (0x6, "ROR", "RORA", "RORB"),
    (0x7, "ASR", "ASRA", "ASRB"),
    (0x8, "ASL", "ASLA", "ASLB"),
    (0x9, "ROL", "ROLA", "ROLB"),
    (0xA, "DEC", "DECA", "DECB"),
    (0xC, "INC", "INCA", "INCB"),
    (0xD, "TST", "TSTA", "TSTB"),
    (0xF, "CLR", "CLRA", "CLRB"),
];

const SHORT_BRANCHES: [&str; 16] = [
    "BRA", "BRN", "BHI", "BLS", "BCC", "BCS", "BNE", "BEQ", "BVC", "BVS", "BPL", "BMI", "BGE",
    "BLT", "BGT", "BLE",
];

const LONG_BRANCHES: [&str; 16] = [
    "LBRA", "LBRN", "LBHI", "LBLS", "LBCC", "LBCS", "LBNE", "LBEQ", "LBVC", "LBVS", "LBPL",
    "LBMI", "LBGE", "LBLT", "LBGT", "LBLE",
];

const fn build_page0() -> Table {
    use AddressingMode::*;

    let mut t = [ILLEGAL; 256];

    let mut i = 0;
    while i < UNARY.len() {
        let (low, mem, reg_a, reg_b) = UNARY[i];
        t[low] = op(mem, Direct, 6, 2);
        t[0x40 + low] = op(reg_a, Inherent, 2, 1);
        t[0x50 + low] = op(reg_b, Inherent, 2, 1);
        t[0x60 + low] = op(mem, Indexed, 6, 2);
        t[0x70 + low] = op(mem, Extended, 7, 3);
        i += 1;
    }
    t[0x0E] = op("JMP", Direct, 3, 2);
    t[0x6E] = op("JMP", Indexed, 3, 2);
    t[0x7E] = op("JMP", Extended, 4, 3);

    t[0x12] = op("NOP", Inherent, 2, 1);
    t[0x13] = op("SYNC", Inherent, 4, 1);
    t[0x16] = op("LBRA", LongRelative, 5, 3);
    t[0x17] = op("LBSR", LongRelative, 9, 3);
    t[0x19] = op("DAA", Inherent, 2, 1);
    t[0x1A] = op("ORCC", Immediate, 3, 2);
    t[0x1C] = op("ANDCC", Immediate, 3, 2);
    t[0x1D] = op("SEX", Inherent, 2, 1);
    t[0x1E] = op("EXG", Register, 8, 2);
    t[0x1F] = op("TFR", Register, 6, 2);

    let mut b = 0;
    while b < 16 {
        t[0x20 + b] = op(SHORT_BRANCHES[b], Relative, 3, 2);
        b += 1;
    }

    t[0x30] = op("LEAX", Indexed, 4, 2);
    t[0x31] = op("LEAY", Indexed, 4, 2);
    t[0x32] = op("LEAS", Indexed, 4, 2);
    t[0x33] = op("LEAU", Indexed, 4, 2);
    t[0x34] = op("PSHS", StackList, 5, 2);
    t[0x35] = op("PULS", StackList, 5, 2);
    t[0x36] = op("PSHU", StackList, 5, 2);
    t[0x37] = op("PULU", StackList, 5, 2);
    t[0x39] = op("RTS", Inherent, 5, 1);
    t[0x3A] = op("ABX", Inherent, 3, 1);
    t[0x3B] = op("RTI", Inherent, 6, 1);
    t[0x3C] = op("CWAI", Immediate, 20, 2);
    t[0x3D] = op("MUL", Inherent, 11, 1);
    // Host-call trap: reported to the driver instead of being timed
    t[0x3E] = op("SYS", Inherent, 0, 1);
    t[0x3F] = op("SWI", Inherent, 19, 1);

    // Accumulator A side
    t = column(t, 0x80, "SUBA", Group::Byte, 0);
    t = column(t, 0x81, "CMPA", Group::Byte, 0);
    t = column(t, 0x82, "SBCA", Group::Byte, 0);
    t = column(t, 0x83, "SUBD", Group::Word, 0);
    t = column(t, 0x84, "ANDA", Group::Byte, 0);
    t = column(t, 0x85, "BITA", Group::Byte, 0);
    t = column(t, 0x86, "LDA", Group::Byte, 0);
    t = column(t, 0x87, "STA", Group::StoreByte, 0);
    t = column(t, 0x88, "EORA", Group::Byte, 0);
    t = column(t, 0x89, "ADCA", Group::Byte, 0);
    t = column(t, 0x8A, "ORA", Group::Byte, 0);
    t = column(t, 0x8B, "ADDA", Group::Byte, 0);
    t = column(t, 0x8C, "CMPX", Group::Word, 0);
    t = column(t, 0x8E, "LDX", Group::LoadWord, 0);
    t = column(t, 0x8F, "STX", Group::StoreWord, 0);
    t[0x8D] = op("BSR", Relative, 7, 2);
    t[0x9D] = op("JSR", Direct, 7, 2);
    t[0xAD] = op("JSR", Indexed, 7, 2);
    t[0xBD] = op("JSR", Extended, 8, 3);

    // Accumulator B side
    t = column(t, 0xC0, "SUBB", Group::Byte, 0);
    t = column(t, 0xC1, "CMPB", Group::Byte, 0);
    t = column(t, 0xC2, "SBCB", Group::Byte, 0);
    t = column(t, 0xC3, "ADDD", Group::Word, 0);
    t = column(t, 0xC4, "ANDB", Group::Byte, 0);
    t = column(t, 0xC5, "BITB", Group::Byte, 0);
    t = column(t, 0xC6, "LDB", Group::Byte, 0);
    t = column(t, 0xC7, "STB", Group::StoreByte, 0);
    t = column(t, 0xC8, "EORB", Group::Byte, 0);
    t = column(t, 0xC9, "ADCB", Group::Byte, 0);
    t = column(t, 0xCA, "ORB", Group::Byte, 0);
    t = column(t, 0xCB, "ADDB", Group::Byte, 0);
    t = column(t, 0xCC, "LDD", Group::LoadWord, 0);
    t = column(t, 0xCD, "STD", Group::StoreWord, 0);
    t = column(t, 0xCE, "LDU", Group::LoadWord, 0);
    t = column(t, 0xCF, "STU", Group::StoreWord, 0);

    t
}

const fn build_page2() -> Table {
    let mut t = [ILLEGAL; 256];

    // LBRA and LBSR have their own unprefixed opcodes
    let mut b = 1;
    while b < 16 {
        t[0x20 + b] = op(LONG_BRANCHES[b], AddressingMode::LongRelative, 4, 4);
        b += 1;
    }
    t[0x3F] = op("SWI2", AddressingMode::Inherent, 19, 2);

    t = column(t, 0x83, "CMPD", Group::Word, 1);
    t = column(t, 0x8C, "CMPY", Group::Word, 1);
    t = column(t, 0x8E, "LDY", Group::LoadWord, 1);
    t = column(t, 0x8F, "STY", Group::StoreWord, 1);
    t = column(t, 0xCE, "LDS", Group::LoadWord, 1);
    t = column(t, 0xCF, "STS", Group::StoreWord, 1);
    t
}

const fn build_page3() -> Table {
    let mut t = [ILLEGAL; 256];
    t[0x3F] = op("SWI3", AddressingMode::Inherent, 19, 2);
    t = column(t, 0x83, "CMPU", Group::Word, 1);
    t = column(t, 0x8C, "CMPS", Group::Word, 1);
    t
}

/// Unprefixed opcode table.
///
/// The prefix bytes 0x10 and 0x11 themselves appear as undefined here; the CPU
/// recognises them before consulting the table.
pub const OPCODE_TABLE: [OpcodeMetadata; 256] = build_page0();

/// Opcodes following the 0x10 prefix.
pub const PAGE2_TABLE: [OpcodeMetadata; 256] = build_page2();

/// Opcodes following the 0x11 prefix.
pub const PAGE3_TABLE: [OpcodeMetadata; 256] = build_page3();

pub const PAGE2_PREFIX: u8 = 0x10;
pub const PAGE3_PREFIX: u8 = 0x11;

/// Looks up an opcode on the given page (0x00, 0x10 or 0x11).
pub fn lookup(page: u8, opcode: u8) -> &'static OpcodeMetadata {
    match page {
        PAGE2_PREFIX => &PAGE2_TABLE[opcode as usize],
        PAGE3_PREFIX => &PAGE3_TABLE[opcode as usize],
        _ => &OPCODE_TABLE[opcode as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_bytes_are_not_instructions() {
        assert!(!OPCODE_TABLE[0x10].is_defined());
        assert!(!OPCODE_TABLE[0x11].is_defined());
    }

    #[test]
    fn test_immediate_stores_are_invalid_modes() {
        for opcode in [0x87usize, 0x8F, 0xC7, 0xCD, 0xCF] {
            let meta = &OPCODE_TABLE[opcode];
            assert!(meta.is_defined(), "0x{:02X}", opcode);
            assert!(!meta.implemented, "0x{:02X}", opcode);
        }
        assert!(!PAGE2_TABLE[0x8F].implemented);
        assert!(!PAGE2_TABLE[0xCF].implemented);
        assert!(PAGE2_TABLE[0x8F].is_defined());
    }

    #[test]
    fn test_column_layout() {
        assert_eq!(OPCODE_TABLE[0x96].mnemonic, "LDA");
        assert_eq!(OPCODE_TABLE[0x96].addressing_mode, AddressingMode::Direct);
        assert_eq!(OPCODE_TABLE[0xA6].addressing_mode, AddressingMode::Indexed);
        assert_eq!(OPCODE_TABLE[0xB6].base_cycles, 5);
        assert_eq!(OPCODE_TABLE[0xB6].size_bytes, 3);
        assert_eq!(OPCODE_TABLE[0xFE].mnemonic, "LDU");
    }

    #[test]
    fn test_prefixed_entries_store_cycles_without_prefix() {
        // CMPD extended is 8 cycles on the datasheet
        assert_eq!(PAGE2_TABLE[0xB3].base_cycles + 1, 8);
        assert_eq!(PAGE2_TABLE[0xB3].size_bytes, 4);
        // SWI2 and SWI3 are 20
        assert_eq!(PAGE2_TABLE[0x3F].base_cycles + 1, 20);
        assert_eq!(PAGE3_TABLE[0x3F].base_cycles + 1, 20);
    }

    #[test]
    fn test_defined_opcode_count() {
        let implemented = OPCODE_TABLE.iter().filter(|m| m.implemented).count();
        // read-modify-write + JMP, misc, branches, 0x3x row, A side, B side
        assert_eq!(implemented, 58 + 10 + 16 + 15 + 62 + 61);
    }

    #[test]
    fn test_lookup_dispatches_on_page() {
        assert_eq!(lookup(0x00, 0x8E).mnemonic, "LDX");
        assert_eq!(lookup(0x10, 0x8E).mnemonic, "LDY");
        assert_eq!(lookup(0x11, 0x8C).mnemonic, "CMPS");
    }
}
