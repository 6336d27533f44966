//! Fuzz target for the disassembler.
//!
//! This target feeds arbitrary byte sequences to the disassembler and walks
//! them instruction by instruction to find edge cases in decoding.

#![no_main]

use arbitrary::Arbitrary;
use lib6809::{disassemble, FlatMemory};
use libfuzzer_sys::fuzz_target;

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    start_address: u16,
}

fuzz_target!(|input: FuzzInput| {
    // Limit input size to prevent OOM
    if input.bytes.len() > 4096 {
        return;
    }

    let mut memory = FlatMemory::new();
    memory.load(input.start_address, &input.bytes);

    let mut address = input.start_address;
    let mut consumed = 0usize;
    while consumed < input.bytes.len() {
        let instr = match disassemble(&mut memory, address) {
            Ok(instr) => instr,
            Err(_) => return,
        };

        // Each instruction starts where the previous one ended
        assert_eq!(instr.address, address);

        // Prefix, opcode, postbyte and up to two operand bytes
        assert!(instr.size >= 1 && instr.size <= 5);
        assert_eq!(instr.bytes.len(), instr.size as usize);

        // Undecodable bytes always advance by one
        if instr.is_data() {
            assert_eq!(instr.size, 1);
        }

        consumed += instr.size as usize;
        address = instr.next_address();
    }
});
