//! End-to-end scenarios for the core: reset and first instruction, ROM
//! protection, an ACIA status handshake, masked interrupts and the
//! branch-to-self idle loop.

use lib6809::{
    AddressMap, BufferedSerial, BusError, DeviceRecord, DeviceRegistry, ExecutionError,
    FlatMemory, InterruptController, InterruptLine, Mc6850, MemoryBus, Peripheral, Step,
    SystemBus, CPU,
};

/// CPU over flat memory with the reset vector pointing at `start`.
fn setup_cpu(start: u16, program: &[u8]) -> CPU<FlatMemory> {
    let mut memory = FlatMemory::new();
    memory.write_word(0xFFFE, start).unwrap();
    memory.load(start, program);
    CPU::new(memory)
}

// ========== Reset and first instruction ==========

#[test]
fn test_reset_then_load_immediate() {
    // Zeroed memory: the reset vector reads 0x0000
    let mut memory = FlatMemory::new();
    memory.load(0x0000, &[0x86, 0x42]);
    let mut cpu = CPU::new(memory);

    assert_eq!(cpu.pc(), 0x0000);
    assert_eq!(cpu.step().unwrap(), Step::Cycles(2));
    assert_eq!(cpu.a(), 0x42);
    assert_eq!(cpu.pc(), 0x0002);
}

#[test]
fn test_reset_state() {
    let cpu = setup_cpu(0x1234, &[]);
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(cpu.dp(), 0);
    assert!(cpu.flag_i());
    assert!(cpu.flag_f());
    assert!(!cpu.flag_e());
}

// ========== ROM write protection ==========

#[test]
fn test_rom_write_is_rejected_and_byte_kept() {
    let mut bus = SystemBus::new(AddressMap::new(0x0000, 0xF000, 0xE000, 0xE800, 0xF000));
    bus.loading(|bus| bus.write(0xF000, 0x7E)).unwrap();

    assert_eq!(bus.write(0xF000, 0x11), Err(BusError::WriteProtected(0xF000)));
    assert_eq!(bus.read(0xF000).unwrap(), 0x7E);
}

#[test]
fn test_cpu_store_into_rom_faults() {
    let mut bus = SystemBus::new(AddressMap::default());
    bus.loading(|bus| {
        // LDA #$55 ; STA $F000
        for (i, byte) in [0x86, 0x55, 0xB7, 0xF0, 0x00].iter().enumerate() {
            bus.poke(0x1000 + i as u16, *byte);
        }
        bus.poke(0xF000, 0xAA);
    });
    let mut cpu = CPU::new(bus);
    cpu.set_pc(0x1000);

    cpu.step().unwrap();
    let err = cpu.step().unwrap_err();
    assert_eq!(err, ExecutionError::WriteProtected { addr: 0xF000 });
    assert_eq!(err.code(), -6);
    assert_eq!(cpu.memory().peek(0xF000), 0xAA);
}

// ========== ACIA status handshake ==========

#[test]
fn test_acia_data_ready_then_read_clears() {
    let serial = BufferedSerial::new();
    let mut devices = DeviceRegistry::new();
    devices
        .register(DeviceRecord::new(
            0xE000,
            Some(InterruptLine::Irq),
            Peripheral::Acia(Mc6850::new(9600, Box::new(serial.clone()))),
        ))
        .unwrap();
    let mut bus = SystemBus::with_devices(AddressMap::default(), devices);
    let mut interrupts = InterruptController::new();

    serial.push_input(b"K");
    bus.tick(1, &mut interrupts);

    assert_eq!(bus.read(0xE000).unwrap() & 0x01, 0x01);
    assert_eq!(bus.read(0xE001).unwrap(), b'K');
    assert_eq!(bus.read(0xE000).unwrap() & 0x01, 0x00);
}

// ========== Masked interrupt stays pending ==========

#[test]
fn test_masked_irq_is_not_accepted() {
    let mut cpu = setup_cpu(0x1000, &[0x12, 0x12]); // NOP ; NOP
    cpu.memory_mut().write_word(0xFFF8, 0x2000).unwrap();
    cpu.set_s(0x8000);
    assert!(cpu.flag_i());

    let before = cpu.registers();
    cpu.request_interrupt(InterruptLine::Irq);
    assert_eq!(cpu.step().unwrap(), Step::Cycles(2));

    let after = cpu.registers();
    assert_eq!(after.pc, 0x1001);
    assert_eq!(after.s, before.s);
    assert_eq!(after.cc, before.cc);
    assert_eq!((after.a, after.b, after.x), (before.a, before.b, before.x));
    assert!(cpu.interrupts().is_pending(InterruptLine::Irq));
}

#[test]
fn test_pending_irq_taken_once_unmasked() {
    // ANDCC #$EF ; NOP
    let mut cpu = setup_cpu(0x1000, &[0x1C, 0xEF, 0x12]);
    cpu.memory_mut().write_word(0xFFF8, 0x2000).unwrap();
    cpu.set_s(0x8000);

    cpu.request_interrupt(InterruptLine::Irq);
    assert_eq!(cpu.step().unwrap(), Step::Cycles(3));
    assert_eq!(cpu.pc(), 0x1002);

    assert_eq!(cpu.step().unwrap(), Step::Cycles(19));
    assert_eq!(cpu.pc(), 0x2000);
    assert!(!cpu.interrupts().is_pending(InterruptLine::Irq));
}

// ========== Branch to self ==========

#[test]
fn test_branch_always_to_self() {
    let mut cpu = setup_cpu(0x1000, &[0x20, 0xFE]);
    for _ in 0..3 {
        assert_eq!(cpu.step().unwrap(), Step::Cycles(3));
        assert_eq!(cpu.pc(), 0x1000);
    }
}
