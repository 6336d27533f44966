//! Tests for indexed addressing: effective addresses, register side effects
//! and cycle surcharges for every postbyte form.

use lib6809::{ExecutionError, FlatMemory, MemoryBus, Step, CPU};

/// CPU with X = 0x2000, Y = 0x3000, U = 0x4000, S = 0x5000 and the program at 0x1000.
fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
    let mut memory = FlatMemory::new();
    memory.write_word(0xFFFE, 0x1000).unwrap();
    memory.load(0x1000, program);
    let mut cpu = CPU::new(memory);
    cpu.set_x(0x2000);
    cpu.set_y(0x3000);
    cpu.set_u(0x4000);
    cpu.set_s(0x5000);
    cpu
}

/// Runs `LDA <postbyte...>` and returns (A, cycles).
fn lda_indexed(cpu: &mut CPU<FlatMemory>) -> (u8, u32) {
    match cpu.step().unwrap() {
        Step::Cycles(cycles) => (cpu.a(), cycles),
        Step::SystemCall => panic!("unexpected host call"),
    }
}

// ========== Constant offsets ==========

#[test]
fn test_no_offset() {
    let mut cpu = setup_cpu(&[0xA6, 0x84]); // LDA ,X
    cpu.memory_mut().write(0x2000, 0x11).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x11, 4));
    assert_eq!(cpu.pc(), 0x1002);
}

#[test]
fn test_five_bit_offsets() {
    // LDA 15,Y ; LDA -16,U
    let mut cpu = setup_cpu(&[0xA6, 0x2F, 0xA6, 0x50]);
    cpu.memory_mut().write(0x300F, 0x22).unwrap();
    cpu.memory_mut().write(0x3FF0, 0x33).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x22, 5));
    assert_eq!(lda_indexed(&mut cpu), (0x33, 5));
}

#[test]
fn test_eight_bit_offset_is_signed() {
    let mut cpu = setup_cpu(&[0xA6, 0x88, 0x80]); // LDA -128,X
    cpu.memory_mut().write(0x1F80, 0x44).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x44, 5));
    assert_eq!(cpu.pc(), 0x1003);
}

#[test]
fn test_sixteen_bit_offset_wraps() {
    let mut cpu = setup_cpu(&[0xA6, 0xE9, 0xF0, 0x00]); // LDA $F000,S
    cpu.memory_mut().write(0x4000, 0x55).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x55, 8));
    assert_eq!(cpu.pc(), 0x1004);
}

// ========== Accumulator offsets ==========

#[test]
fn test_accumulator_offsets() {
    // LDA B,X ; LDA A,X ; LDA D,X
    let mut cpu = setup_cpu(&[0xA6, 0x85, 0xA6, 0x86, 0xA6, 0x8B]);
    cpu.set_b(0xFE); // -2
    cpu.memory_mut().write(0x1FFE, 0x07).unwrap();
    cpu.memory_mut().write(0x2007, 0x66).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x07, 5));
    assert_eq!(lda_indexed(&mut cpu), (0x66, 5));

    // D = 0x66FE
    cpu.memory_mut().write(0x86FE, 0x77).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x77, 8));
}

// ========== Auto increment and decrement ==========

#[test]
fn test_post_increment() {
    // LDA ,X+ ; LDA ,X++
    let mut cpu = setup_cpu(&[0xA6, 0x80, 0xA6, 0x81]);
    cpu.memory_mut().load(0x2000, &[0x01, 0x02, 0x03]);
    assert_eq!(lda_indexed(&mut cpu), (0x01, 6));
    assert_eq!(cpu.x(), 0x2001);
    assert_eq!(lda_indexed(&mut cpu), (0x02, 7));
    assert_eq!(cpu.x(), 0x2003);
}

#[test]
fn test_pre_decrement() {
    // LDA ,-Y ; LDA ,--Y
    let mut cpu = setup_cpu(&[0xA6, 0xA2, 0xA6, 0xA3]);
    cpu.memory_mut().load(0x2FFD, &[0x0A, 0x0B, 0x0C]);
    assert_eq!(lda_indexed(&mut cpu), (0x0C, 6));
    assert_eq!(cpu.y(), 0x2FFF);
    assert_eq!(lda_indexed(&mut cpu), (0x0A, 7));
    assert_eq!(cpu.y(), 0x2FFD);
}

#[test]
fn test_ldd_post_increment_walks_words() {
    let mut cpu = setup_cpu(&[0xEC, 0xC1, 0xEC, 0xC1]); // LDD ,U++ twice
    cpu.memory_mut().load(0x4000, &[0x12, 0x34, 0x56, 0x78]);
    assert_eq!(cpu.step().unwrap(), Step::Cycles(8));
    assert_eq!(cpu.d(), 0x1234);
    cpu.step().unwrap();
    assert_eq!(cpu.d(), 0x5678);
    assert_eq!(cpu.u(), 0x4004);
}

// ========== PC relative ==========

#[test]
fn test_pc_relative_counts_from_instruction_end() {
    // LDA 2,PCR (8-bit) at 0x1000: end is 0x1003, target 0x1005
    let mut cpu = setup_cpu(&[0xA6, 0x8C, 0x02, 0x12, 0x12, 0x99]);
    assert_eq!(lda_indexed(&mut cpu), (0x99, 5));
}

#[test]
fn test_pc_relative_sixteen_bit() {
    // LDA $0100,PCR: end is 0x1004, target 0x1104
    let mut cpu = setup_cpu(&[0xA6, 0x8D, 0x01, 0x00]);
    cpu.memory_mut().write(0x1104, 0x5A).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x5A, 9));
}

#[test]
fn test_leax_pc_relative() {
    let mut cpu = setup_cpu(&[0x30, 0x8C, 0x10]); // LEAX $10,PCR
    assert_eq!(cpu.step().unwrap(), Step::Cycles(5));
    assert_eq!(cpu.x(), 0x1013);
}

// ========== Indirect ==========

#[test]
fn test_indirect_no_offset() {
    let mut cpu = setup_cpu(&[0xA6, 0x94]); // LDA [,X]
    cpu.memory_mut().write_word(0x2000, 0x6000).unwrap();
    cpu.memory_mut().write(0x6000, 0xC3).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0xC3, 7));
}

#[test]
fn test_indirect_post_increment_two() {
    let mut cpu = setup_cpu(&[0xA6, 0x91]); // LDA [,X++]
    cpu.memory_mut().write_word(0x2000, 0x6100).unwrap();
    cpu.memory_mut().write(0x6100, 0x3C).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x3C, 10));
    assert_eq!(cpu.x(), 0x2002);
}

#[test]
fn test_indirect_sixteen_bit_offset() {
    let mut cpu = setup_cpu(&[0xA6, 0xB9, 0x01, 0x00]); // LDA [$0100,Y]
    cpu.memory_mut().write_word(0x3100, 0x6200).unwrap();
    cpu.memory_mut().write(0x6200, 0x81).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0x81, 11));
}

#[test]
fn test_extended_indirect() {
    let mut cpu = setup_cpu(&[0xA6, 0x9F, 0x70, 0x00]); // LDA [$7000]
    cpu.memory_mut().write_word(0x7000, 0x7100).unwrap();
    cpu.memory_mut().write(0x7100, 0xE7).unwrap();
    assert_eq!(lda_indexed(&mut cpu), (0xE7, 9));
    assert_eq!(cpu.pc(), 0x1004);
}

#[test]
fn test_jmp_indirect() {
    let mut cpu = setup_cpu(&[0x6E, 0x9F, 0x70, 0x00]); // JMP [$7000]
    cpu.memory_mut().write_word(0x7000, 0x1234).unwrap();
    cpu.step().unwrap();
    assert_eq!(cpu.pc(), 0x1234);
}

// ========== Undefined postbytes ==========

#[test]
fn test_undefined_postbytes_are_rejected() {
    // 0x87 is undefined; 0x90 would be [,X+], which does not exist
    for postbyte in [0x87u8, 0x8A, 0x8E, 0x8F, 0x90, 0x92, 0x97] {
        let mut cpu = setup_cpu(&[0xA6, postbyte]);
        let err = cpu.step().unwrap_err();
        assert_eq!(
            err,
            ExecutionError::InvalidPostbyte {
                postbyte,
                pc: 0x1000
            }
        );
        assert_eq!(err.code(), -2);
    }
}

#[test]
fn test_store_indexed_writes_effective_address() {
    let mut cpu = setup_cpu(&[0xA7, 0x1F]); // STA -1,X
    cpu.set_a(0x42);
    assert_eq!(cpu.step().unwrap(), Step::Cycles(5));
    assert_eq!(cpu.memory().peek(0x1FFF), 0x42);
}
