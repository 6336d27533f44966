//! Fuzz target for CPU step execution.
//!
//! This target creates arbitrary CPU states and memory contents, then
//! executes a few steps on a routed system bus to find panics in decoding,
//! addressing and bus classification.

#![no_main]

use arbitrary::Arbitrary;
use lib6809::{
    AddressMap, ExecutionError, InterruptLine, Registers, Step, SystemBus, CPU, SYSTEM_CALL,
};
use libfuzzer_sys::fuzz_target;

/// Arbitrary register file
#[derive(Debug, Arbitrary)]
struct FuzzRegisters {
    a: u8,
    b: u8,
    dp: u8,
    x: u16,
    y: u16,
    u: u16,
    s: u16,
    cc: u8,
}

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    registers: FuzzRegisters,
    /// Bytes at the PC location (prefix, opcode, postbyte, operands)
    instruction_bytes: [u8; 5],
    /// Direct page contents
    direct_page: [u8; 256],
    /// Region the index registers may point into
    data: [u8; 256],
    /// Interrupt requested before stepping
    interrupt: Option<u8>,
    /// Address map boundaries
    mem_high: u16,
    rom: u16,
}

fuzz_target!(|input: FuzzInput| {
    let map = AddressMap::new(
        0,
        input.mem_high as u32,
        0xE000,
        0xE800,
        (input.rom as u32).max(0x8000),
    );
    let mut bus = SystemBus::new(map);
    for (i, &byte) in input.instruction_bytes.iter().enumerate() {
        bus.poke(0x4000 + i as u16, byte);
    }
    for (i, &byte) in input.direct_page.iter().enumerate() {
        bus.poke(((input.registers.dp as u16) << 8) | i as u16, byte);
    }
    for (i, &byte) in input.data.iter().enumerate() {
        bus.poke(input.registers.x.wrapping_add(i as u16), byte);
    }

    let mut cpu = CPU::new(bus);
    cpu.set_registers(Registers {
        a: input.registers.a,
        b: input.registers.b,
        dp: input.registers.dp,
        x: input.registers.x,
        y: input.registers.y,
        u: input.registers.u,
        s: input.registers.s,
        pc: 0x4000,
        cc: input.registers.cc.into(),
    });

    if let Some(line) = input.interrupt {
        let line = match line % 3 {
            0 => InterruptLine::Irq,
            1 => InterruptLine::Firq,
            _ => InterruptLine::Nmi,
        };
        cpu.request_interrupt(line);
    }

    for _ in 0..4 {
        match cpu.step() {
            Ok(Step::Cycles(cycles)) => assert!(cycles < 64),
            Ok(Step::SystemCall) => {
                assert_eq!(Step::SystemCall.code(), SYSTEM_CALL);
                let _ = cpu.return_from_interrupt();
            }
            Err(err) => {
                // Error codes stay in the documented range
                let code = ExecutionError::code(&err);
                assert!((-7..=-1).contains(&code));
                break;
            }
        }
    }
});
