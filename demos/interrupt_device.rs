//! Example: Timer Interrupts
//!
//! This example wires an MC6840 programmable timer to the IRQ line and runs
//! a program whose interrupt service routine counts timer underflows.
//!
//! # Memory Map
//!
//! ```text
//! 0x0000-0xDFFF  RAM
//! 0xE000-0xE7FF  I/O window, MC6840 at 0xE010
//! 0xF000-0xFFFF  ROM (vectors)
//! ```
//!
//! # Program
//!
//! The main program selects CR1 through CR2, loads timer 1's latch with 255,
//! enables its interrupt and spins. The service routine reads the status
//! register and then the counter (which acknowledges the underflow),
//! increments a byte at $0080 and returns.

use lib6809::{loader, Machine, MachineConfig, RunOutcome};

const MAIN: [u8; 24] = [
    0x10, 0xCE, 0x80, 0x00, // LDS #$8000
    0x86, 0x01, // LDA #$01
    0xB7, 0xE0, 0x11, // STA $E011      CR2: register 0 is CR1
    0xCC, 0x00, 0xFF, // LDD #$00FF
    0xFD, 0xE0, 0x12, // STD $E012      timer 1 latch
    0x86, 0x42, // LDA #$42
    0xB7, 0xE0, 0x10, // STA $E010      CR1: IRQ enable, E clock, run
    0x1C, 0xEF, // ANDCC #$EF     unmask IRQ
    0x20, 0xFE, // BRA *
];

const ISR: [u8; 9] = [
    0xB6, 0xE0, 0x11, // LDA $E011      status
    0xFC, 0xE0, 0x12, // LDD $E012      counter, clears the flag
    0x0C, 0x80, // INC <$80
    0x3B, // RTI
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("6809 Timer Interrupt Example");
    println!("============================\n");

    let config = MachineConfig::parse("mem 0000 E000\nm6840 E010 IRQ\n")?;
    let mut bus = config.build()?;

    loader::load_raw(&mut bus, &MAIN, Some(0x1000))?;
    loader::load_raw(&mut bus, &ISR, Some(0x1100))?;
    // IRQ vector and reset vector
    loader::load_raw(&mut bus, &[0x11, 0x00], Some(0xFFF8))?;
    loader::load_raw(&mut bus, &[0x10, 0x00], Some(0xFFFE))?;

    let mut machine = Machine::new(bus);
    println!("Start: {}\n", machine.cpu().registers());

    for _ in 0..5 {
        let outcome = machine.run_cycles(2000)?;
        assert_eq!(outcome, RunOutcome::CycleLimit);
        println!(
            "after {:>5} cycles: {:>3} interrupts serviced",
            machine.cycles(),
            machine.bus().peek(0x0080)
        );
    }
    println!();

    for line in machine.device_status() {
        println!("{}", line);
    }
    println!("\nExample complete!");
    Ok(())
}
