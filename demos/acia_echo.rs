//! ACIA echo example
//!
//! Polls an MC6850 ACIA at 0xE000 and echoes every received character back.
//! The serial line is a `BufferedSerial`, so input is queued from Rust and
//! transmitted bytes are printed as they leave the ACIA.
//!
//! Run with `RUST_LOG=trace` to see every executed instruction.

use lib6809::{loader, BufferedSerial, Machine, MachineConfig, SerialPort};

const ECHO: [u8; 22] = [
    0xB6, 0xE0, 0x00, // 1000 LDA $E000   status
    0x84, 0x01, //       1003 ANDA #$01   RDRF
    0x27, 0xF9, //       1005 BEQ $1000
    0xB6, 0xE0, 0x01, // 1007 LDA $E001   received byte
    0xF6, 0xE0, 0x00, // 100A LDB $E000
    0xC5, 0x02, //       100D BITB #$02   TDRE
    0x27, 0xF9, //       100F BEQ $100A
    0xB7, 0xE0, 0x01, // 1011 STA $E001
    0x20, 0xEA, //       1014 BRA $1000
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("6809 ACIA Echo Example");
    println!("======================\n");

    let mut serial = BufferedSerial::new();
    serial.set_transmit_callback(|byte| print!("{}", byte as char));
    let port = serial.clone();

    let config = MachineConfig::parse("m6850 E000 - 19200")?;
    let mut bus = config.build_with_serial(|| Box::new(port.clone()) as Box<dyn SerialPort>)?;
    loader::load_raw(&mut bus, &ECHO, Some(0x1000))?;
    loader::load_raw(&mut bus, &[0x10, 0x00], Some(0xFFFE))?;

    let mut machine = Machine::new(bus);

    serial.push_input(b"Hello, 6809!\n");
    print!("echo: ");
    while serial.pending_input() > 0 {
        machine.run_cycles(1000)?;
    }
    // Let the last character drain out of the transmitter
    machine.run_cycles(5000)?;

    println!("\n{} cycles", machine.cycles());
    for line in machine.device_status() {
        println!("{}", line);
    }
    Ok(())
}
