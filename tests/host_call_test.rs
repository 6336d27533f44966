//! Tests for the host-call trap (opcode 0x3E) serviced by the machine.

use std::cell::RefCell;
use std::rc::Rc;

use lib6809::{
    AddressMap, BusErrorPolicy, ExecutionError, FlatMemory, HostCall, HostIo, Machine, MemoryBus,
    RunOutcome, Step, StepEvent, SystemBus, CPU, SYSTEM_CALL,
};

/// Console whose buffers stay visible to the test after the machine takes it.
#[derive(Clone, Default)]
struct SharedHost {
    output: Rc<RefCell<Vec<u8>>>,
    input: Rc<RefCell<Vec<u8>>>,
}

impl SharedHost {
    fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.borrow()).into_owned()
    }
}

impl HostIo for SharedHost {
    fn write(&mut self, bytes: &[u8]) {
        self.output.borrow_mut().extend_from_slice(bytes);
    }

    fn read_line(&mut self, max: usize) -> Option<Vec<u8>> {
        let mut input = self.input.borrow_mut();
        if input.is_empty() {
            return None;
        }
        let end = input
            .iter()
            .position(|&b| b == b'\n')
            .map_or(input.len(), |i| i + 1)
            .min(max);
        Some(input.drain(..end).collect())
    }
}

/// Machine running `program` from 0x1000 with S = 0x8000 and `data` at 0x2000.
fn setup_machine(program: &[u8], data: &[u8]) -> (Machine, SharedHost) {
    let mut bus = SystemBus::new(AddressMap::default());
    bus.loading(|bus| {
        for (i, byte) in program.iter().enumerate() {
            bus.poke(0x1000 + i as u16, *byte);
        }
        for (i, byte) in data.iter().enumerate() {
            bus.poke(0x2000 + i as u16, *byte);
        }
        bus.poke(0xFFFE, 0x10);
        bus.poke(0xFFFF, 0x00);
    });
    let host = SharedHost::default();
    let mut machine = Machine::new(bus).with_host(host.clone());
    machine.cpu_mut().set_s(0x8000);
    (machine, host)
}

// ========== Trap ==========

#[test]
fn test_trap_stacks_entire_state() {
    let mut memory = FlatMemory::new();
    memory.write_word(0xFFFE, 0x1000).unwrap();
    memory.load(0x1000, &[0x3E]);
    let mut cpu = CPU::new(memory);
    cpu.set_s(0x8000);
    cpu.set_a(0x05);

    let step = cpu.step().unwrap();
    assert_eq!(step, Step::SystemCall);
    assert_eq!(step.code(), SYSTEM_CALL);
    assert_eq!(cpu.s(), 0x8000 - 12);
    assert_eq!(cpu.pc(), 0x1001);
    assert_eq!(cpu.memory().peek(0x7FF5), 0x05);
    // Masks are left alone
    assert!(cpu.flag_i() && cpu.flag_f());
}

// ========== Calls through the machine ==========

#[test]
fn test_write_string_char_and_terminate() {
    let program = [
        0x8E, 0x20, 0x00, // LDX #$2000
        0x86, 0x01, // LDA #1
        0x3E, // SYS
        0x86, 0x03, // LDA #3
        0xC6, b'!', // LDB #'!'
        0x3E, // SYS
        0x4F, // CLRA
        0x3E, // SYS
        0x20, 0xFE, // BRA *
    ];
    let (mut machine, host) = setup_machine(&program, b"hello\0");

    assert_eq!(machine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(host.output(), "hello!Program terminated\n");
    assert_eq!(machine.cpu().pc(), 0x100D);
    assert_eq!(machine.cpu().s(), 0x8000);
}

#[test]
fn test_read_line_returns_count_in_a() {
    let program = [
        0x8E, 0x30, 0x00, // LDX #$3000
        0xC6, 0x08, // LDB #8
        0x86, 0x02, // LDA #2
        0x3E, // SYS
        0xB7, 0x20, 0x00, // STA $2000
        0x4F, // CLRA
        0x3E, // SYS
    ];
    let (mut machine, host) = setup_machine(&program, &[]);
    host.input.borrow_mut().extend_from_slice(b"abc\nrest");

    assert_eq!(machine.run().unwrap(), RunOutcome::Terminated);
    let bus = machine.bus();
    assert_eq!(bus.peek(0x2000), 4);
    let buffer: Vec<u8> = (0x3000..0x3005).map(|a| bus.peek(a)).collect();
    assert_eq!(buffer, b"abc\n\0");
    assert_eq!(machine.cpu().x(), 0x3000);
    assert_eq!(machine.cpu().b(), 0x08);
}

#[test]
fn test_read_line_truncated_to_buffer() {
    let program = [
        0x8E, 0x30, 0x00, // LDX #$3000
        0xC6, 0x04, // LDB #4
        0x86, 0x02, // LDA #2
        0x3E, // SYS
    ];
    let (mut machine, host) = setup_machine(&program, &[]);
    host.input.borrow_mut().extend_from_slice(b"abcdef\n");

    assert_eq!(machine.run_steps(4).unwrap(), RunOutcome::StepLimit);
    assert_eq!(machine.cpu().a(), 3);
    let buffer: Vec<u8> = (0x3000..0x3004).map(|a| machine.bus().peek(a)).collect();
    assert_eq!(buffer, b"abc\0");
}

#[test]
fn test_unknown_call_is_reported_and_skipped() {
    let program = [0x86, 0x07, 0x3E, 0x4F, 0x3E]; // LDA #7 ; SYS ; CLRA ; SYS
    let (mut machine, host) = setup_machine(&program, &[]);

    assert_eq!(machine.step().unwrap(), StepEvent::Executed(2));
    assert_eq!(
        machine.step().unwrap(),
        StepEvent::HostCall(HostCall::Unknown(7))
    );
    assert_eq!(machine.cpu().pc(), 0x1003);
    assert_eq!(machine.run().unwrap(), RunOutcome::Terminated);
    assert_eq!(
        host.output(),
        "Unknown system call 7\nProgram terminated\n"
    );
}

#[test]
fn test_host_call_preserves_registers_and_cycles() {
    let program = [
        0x8E, 0x20, 0x00, // LDX #$2000
        0x10, 0x8E, 0x12, 0x34, // LDY #$1234
        0x86, 0x01, // LDA #1
        0x3E, // SYS
    ];
    let (mut machine, host) = setup_machine(&program, b"x\0");

    assert_eq!(machine.run_steps(3).unwrap(), RunOutcome::StepLimit);
    let before = machine.cpu().registers();
    let cycles = machine.cycles();
    assert_eq!(cycles, 3 + 4 + 2);

    assert_eq!(
        machine.step().unwrap(),
        StepEvent::HostCall(HostCall::WriteString)
    );
    let after = machine.cpu().registers();
    assert_eq!(after.pc, before.pc + 1);
    assert_eq!(
        (after.a, after.x, after.y, after.s),
        (before.a, before.x, before.y, before.s)
    );
    // RTI brings back the trap's CC, which has E set
    assert_eq!(after.cc.bits(), before.cc.bits() | 0x80);
    assert_eq!(machine.cycles(), cycles);
    assert_eq!(host.output(), "x");
}

// ========== Faulting calls ==========

/// Machine with RAM only below 0x8000, trapped into write-string with X = 0x9000.
fn unmapped_string_machine() -> Machine {
    let mut bus = SystemBus::new(AddressMap::new(0x0000, 0x8000, 0xE000, 0xE800, 0xF000));
    bus.poke(0x1000, 0x3E); // SYS
    let mut machine = Machine::new(bus).with_host(SharedHost::default());
    let cpu = machine.cpu_mut();
    cpu.set_pc(0x1000);
    cpu.set_s(0x4000);
    cpu.set_a(0x01);
    cpu.set_x(0x9000);
    machine
}

#[test]
fn test_faulting_call_continues_as_bus_fault() {
    let mut machine =
        unmapped_string_machine().with_bus_error_policy(BusErrorPolicy::Continue);

    assert_eq!(
        machine.step().unwrap(),
        StepEvent::BusFault(ExecutionError::NoMemory { addr: 0x9000 })
    );
    assert_eq!(machine.cpu().pc(), 0x1001);
    assert_eq!(machine.cpu().s(), 0x4000);
    assert_eq!(machine.cpu().x(), 0x9000);
    assert_eq!(machine.cycles(), 0);
}

#[test]
fn test_faulting_call_halts_with_frame_unstacked() {
    let mut machine = unmapped_string_machine();

    assert_eq!(
        machine.step(),
        Err(ExecutionError::NoMemory { addr: 0x9000 })
    );
    assert_eq!(machine.cpu().pc(), 0x1001);
    assert_eq!(machine.cpu().s(), 0x4000);
}
