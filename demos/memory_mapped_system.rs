//! Memory-mapped system example
//!
//! Builds a complete machine from a configuration text, shows how the bus
//! classifies addresses, and runs a program that prints through host calls.
//!
//! # Configuration
//!
//! ```text
//! rom F000
//! mem 0000 F000
//! io  E000 E800
//! m6850 E000 IRQ
//! m6821 E004 FIRQ
//! m6840 E008 IRQ
//! r6522 E010 -
//! fake  E100 - E110
//! ```

use lib6809::{
    disassemble, loader, AddressMap, BusErrorPolicy, Machine, MachineConfig, MemoryBus,
    RunOutcome,
};

const CONFIG: &str = "\
# demo machine
rom F000
mem 0000 F000
io  E000 E800
m6850 E000 IRQ
m6821 E004 FIRQ
m6840 E008 IRQ
r6522 E010 -
fake  E100 - E110
";

const PROGRAM: [u8; 16] = [
    0x10, 0xCE, 0x80, 0x00, // LDS #$8000
    0x8E, 0x10, 0x10, // LDX #$1010
    0x86, 0x01, // LDA #1        write string
    0x3E, // SYS
    0x4F, // CLRA          terminate
    0x3E, // SYS
    0x20, 0xFE, // BRA *
    0x12, 0x12, // NOP NOP
];

fn show_classification(map: &AddressMap) {
    for addr in [0x0000u16, 0x1000, 0xE000, 0xE100, 0xE800, 0xF000, 0xFFFE] {
        println!("  0x{:04X} -> {:?}", addr, map.classify(addr));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("6809 Memory-Mapped System Example");
    println!("=================================\n");

    let config = MachineConfig::parse(CONFIG)?;
    let mut bus = config.build()?;

    println!("Address map: {}", bus.map());
    show_classification(bus.map());

    println!("\nDevices:");
    for line in bus.devices().status_lines() {
        println!("  {}", line);
    }

    // The fake device is plain storage
    bus.write(0xE100, 0xA5)?;
    println!("\nfake device 0xE100 = 0x{:02X}", bus.read(0xE100)?);
    // ROM rejects CPU writes, unmapped I/O addresses have no device
    println!("write 0xF000: {:?}", bus.write(0xF000, 0));
    println!("read  0xE200: {:?}", bus.read(0xE200));

    loader::load_raw(&mut bus, &PROGRAM, Some(0x1000))?;
    loader::load_raw(&mut bus, b"Hello from the 6809\n\0", Some(0x1010))?;
    loader::load_raw(&mut bus, &[0x10, 0x00], Some(0xFFFE))?;

    println!("\nProgram:");
    let mut addr = 0x1000;
    while addr < 0x100E {
        let instruction = disassemble(&mut bus, addr)?;
        println!("  {:04X}  {}", addr, instruction);
        addr = instruction.next_address();
    }

    println!("\nRunning:");
    let mut machine = Machine::new(bus).with_bus_error_policy(BusErrorPolicy::Halt);
    let outcome = machine.run()?;
    assert_eq!(outcome, RunOutcome::Terminated);
    println!("{} after {} cycles", machine.cpu().registers(), machine.cycles());

    Ok(())
}
