//! Simple RAM example
//!
//! Demonstrates basic CPU initialization and execution with FlatMemory.
//!
//! This example shows:
//! - Creating a 64KB flat memory instance
//! - Setting up the reset vector
//! - Loading a short program
//! - Stepping the CPU and inspecting registers and cycle counts

use lib6809::{disassemble, FlatMemory, MemoryBus, Step, CPU};

fn main() {
    println!("6809 CPU Core - Simple RAM Example");
    println!("==================================\n");

    // Create 64KB flat memory (all addresses mapped to RAM)
    let mut memory = FlatMemory::new();

    // Reset vector at 0xFFFE/0xFFFF, big-endian
    memory
        .write_word(0xFFFE, 0x1000)
        .expect("flat memory accepts every address");
    println!("Reset vector set to 0x1000");

    memory.load(
        0x1000,
        &[
            0x86, 0x42, // LDA #$42
            0xC6, 0x10, // LDB #$10
            0x3D, // MUL
            0xC3, 0x01, 0x00, // ADDD #$0100
            0xFD, 0x20, 0x00, // STD $2000
            0x20, 0xFE, // BRA *
        ],
    );
    println!("Loaded program at 0x1000-0x100C\n");

    let mut cpu = CPU::new(memory);

    println!("CPU Initial State:");
    println!("-----------------");
    println!("  {}\n", cpu.registers());

    println!("Executing:");
    println!("----------");
    let mut total = 0;
    for _ in 0..6 {
        let pc = cpu.pc();
        let text = match disassemble(cpu.memory_mut(), pc) {
            Ok(instruction) => instruction.to_string(),
            Err(err) => format!("<{}>", err),
        };

        match cpu.step() {
            Ok(Step::Cycles(cycles)) => {
                total += cycles;
                println!("  {:04X}  {:<14} {:>2} cycles   D={:04X}", pc, text, cycles, cpu.d());
            }
            Ok(Step::SystemCall) => println!("  {:04X}  host call", pc),
            Err(err) => {
                println!("  {:04X}  error: {}", pc, err);
                break;
            }
        }
    }

    println!("\nCPU Final State:");
    println!("----------------");
    println!("  {}", cpu.registers());
    println!("  Total cycles: {}", total);
    println!(
        "  Memory[0x2000..0x2002]: {:02X} {:02X}",
        cpu.memory().peek(0x2000),
        cpu.memory().peek(0x2001)
    );

    println!("\nExample complete!");
}
