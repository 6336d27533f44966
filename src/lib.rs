//! # 6809 Emulator Core
//!
//! A cycle-counted Motorola 6809 emulator designed for modularity, clarity, and
//! WebAssembly portability.
//!
//! This crate provides the processor (register file, condition codes, the full
//! documented instruction set including the two prefixed opcode pages and the
//! indexed postbyte grammar), an address-space router that classifies every
//! access as RAM, ROM, I/O or unmapped, and a family of memory-mapped
//! peripheral chips reachable through that router.
//!
//! ## Quick Start
//!
//! ```rust
//! use lib6809::{FlatMemory, MemoryBus, Step, CPU};
//!
//! // 64KB flat memory, reset vector left at zero
//! let mut memory = FlatMemory::new();
//! memory.load(0x0000, &[0x86, 0x42]); // LDA #$42
//!
//! let mut cpu = CPU::new(memory);
//! assert_eq!(cpu.pc(), 0x0000);
//!
//! assert_eq!(cpu.step().unwrap(), Step::Cycles(2));
//! assert_eq!(cpu.a(), 0x42);
//! assert_eq!(cpu.pc(), 0x0002);
//! ```
//!
//! ## Architecture
//!
//! - **Modularity**: CPU state is separated from memory via the `MemoryBus` trait
//! - **Explicit ownership**: the `Machine` aggregate owns the CPU, which owns the
//!   bus, which owns the device registry. No global state.
//! - **Cycle counting**: every step reports base + addressing-mode cycles
//! - **Table-Driven Design**: opcode metadata for all three opcode pages lives in
//!   a single source of truth (`opcodes`)
//!
//! ## Modules
//!
//! - `cpu` - processor state and the fetch-decode-execute step
//! - `registers` - condition codes and register snapshots
//! - `memory` - `MemoryBus` trait and `FlatMemory`
//! - `bus` - address map and the system bus router
//! - `devices` - peripheral chips and the device registry
//! - `interrupts` - interrupt lines and the request latch
//! - `machine` - execution driver, host calls, stop token
//! - `loader` - raw, S-record and Intel-hex image loaders
//! - `config` - `.sim6809.ini` machine description parser
//! - `disassembler` - single instruction decoder/formatter

pub mod addressing;
pub mod bus;
pub mod config;
pub mod cpu;
pub mod devices;
pub mod disassembler;
pub mod host;
pub mod interrupts;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod opcodes;
pub mod registers;
pub mod wasm;

// Internal instruction implementations (not part of public API)
mod instructions;

use thiserror::Error;

// Re-export public API
pub use addressing::{AddressingMode, IndexRegister, IndexedKind, IndexedMode};
pub use bus::{AddressMap, Region, SystemBus};
pub use config::{ConfigError, DeviceSpec, MachineConfig};
pub use cpu::CPU;
pub use devices::{
    BufferedSerial, Device, DeviceKind, DeviceRecord, DeviceRegistry, FakeDevice, Fd1795,
    Mc6820, Mc6840, Mc6850, NullSerial, Peripheral, R6522, R6532, SerialPort,
};
pub use disassembler::{disassemble, Instruction};
pub use host::{BufferedHost, HostCall, HostIo, StdHost};
pub use interrupts::{InterruptController, InterruptLine, IrqPin};
pub use loader::{LoadError, LoadSummary};
pub use machine::{BusErrorPolicy, Machine, RunOutcome, StepEvent, StopHandle};
pub use memory::{BusError, FlatMemory, MemoryBus};
pub use opcodes::{OpcodeMetadata, OPCODE_TABLE, PAGE2_TABLE, PAGE3_TABLE};
pub use registers::{ConditionCodes, Registers};

/// Sentinel code reported by [`Step::code`] when the host-call trap executed.
///
/// Distinct from every cycle count (non-negative) and from every
/// [`ExecutionError::code`] (-1 to -7).
pub const SYSTEM_CALL: i32 = -8;

/// Successful result of one processor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction (or an interrupt entry) completed in this many cycles.
    Cycles(u32),

    /// The host-call trap opcode was executed. The full register set has been
    /// stacked and the host is expected to service the call and return with
    /// [`CPU::return_from_interrupt`].
    SystemCall,
}

impl Step {
    /// Integer form of the step result: the cycle count, or [`SYSTEM_CALL`].
    pub fn code(self) -> i32 {
        match self {
            Step::Cycles(cycles) => cycles as i32,
            Step::SystemCall => SYSTEM_CALL,
        }
    }
}

/// Errors that can occur during CPU execution.
///
/// Decode errors carry the address of the faulting instruction. Bus errors
/// carry the address whose access failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Opcode byte (prefixed opcodes include the page byte, e.g. 0x1001).
    #[error("Invalid Op code 0x{opcode:02X} at 0x{pc:04X}")]
    InvalidOpcode { opcode: u16, pc: u16 },

    /// Indexed addressing postbyte with no defined meaning.
    #[error("Invalid post byte 0x{postbyte:02X} at 0x{pc:04X}")]
    InvalidPostbyte { postbyte: u8, pc: u16 },

    /// Defined opcode used with an addressing mode it cannot take (e.g. STA #).
    #[error("Invalid address mode for op code 0x{opcode:02X} at 0x{pc:04X}")]
    InvalidAddressMode { opcode: u16, pc: u16 },

    /// TFR/EXG register pair is undefined or mixes 8 and 16 bit registers.
    #[error("Invalid exgr 0x{postbyte:02X} at 0x{pc:04X}")]
    InvalidExgr { postbyte: u8, pc: u16 },

    #[error("Outside memory limits at 0x{addr:04X}")]
    NoMemory { addr: u16 },

    #[error("Attempt to write read only memory at 0x{addr:04X}")]
    WriteProtected { addr: u16 },

    #[error("No peripheral at address 0x{addr:04X}")]
    NoDevice { addr: u16 },
}

impl ExecutionError {
    /// Small negative error code, in the historical numbering.
    pub fn code(&self) -> i32 {
        match self {
            ExecutionError::InvalidOpcode { .. } => -1,
            ExecutionError::InvalidPostbyte { .. } => -2,
            ExecutionError::InvalidAddressMode { .. } => -3,
            ExecutionError::InvalidExgr { .. } => -4,
            ExecutionError::NoMemory { .. } => -5,
            ExecutionError::WriteProtected { .. } => -6,
            ExecutionError::NoDevice { .. } => -7,
        }
    }

    /// True for errors raised by the address-space router rather than the decoder.
    pub fn is_bus_error(&self) -> bool {
        matches!(
            self,
            ExecutionError::NoMemory { .. }
                | ExecutionError::WriteProtected { .. }
                | ExecutionError::NoDevice { .. }
        )
    }
}

impl From<BusError> for ExecutionError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::NoMemory(addr) => ExecutionError::NoMemory { addr },
            BusError::WriteProtected(addr) => ExecutionError::WriteProtected { addr },
            BusError::NoDevice(addr) => ExecutionError::NoDevice { addr },
        }
    }
}
