//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait that decouples the CPU from specific
//! memory implementations. This enables flexible memory configurations including:
//!
//! - Flat 64KB RAM (`FlatMemory` implementation provided)
//! - The address-space router with RAM/ROM/I/O classification (`SystemBus`)
//!
//! ## Design Principles
//!
//! The simulated system reports bus faults: an access outside the configured
//! RAM, a write into ROM, or an I/O access with no peripheral behind it. Every access therefore returns a `Result`, and the CPU
//! propagates the fault as an `ExecutionError`.
//!
//! The bus is big-endian: 16-bit accesses put the high byte at the lower address.

use crate::interrupts::InterruptController;
use thiserror::Error;

/// Fault raised by a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// Address outside the emulated RAM and ROM.
    #[error("Outside memory limits at 0x{0:04X}")]
    NoMemory(u16),

    /// Write to an address at or above the ROM boundary.
    #[error("Attempt to write read only memory at 0x{0:04X}")]
    WriteProtected(u16),

    /// I/O window access with no registered device covering the address.
    #[error("No peripheral at address 0x{0:04X}")]
    NoDevice(u16),
}

/// Memory bus trait for CPU to read/write bytes.
///
/// Implementations of this trait provide the memory backend for the CPU.
/// The CPU accesses all memory (RAM, ROM, I/O) through this abstraction.
///
/// # Design
///
/// - `read(&mut self)`: mutable because peripheral registers have read side
///   effects (reading an ACIA data register clears its status bit)
/// - `write(&mut self)`: explicit side effects
/// - Both are fallible, see [`BusError`]
///
/// # Examples
///
/// ```
/// use lib6809::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new();
/// mem.write_word(0x1234, 0xBEEF).unwrap();
///
/// assert_eq!(mem.read(0x1234).unwrap(), 0xBE);
/// assert_eq!(mem.read(0x1235).unwrap(), 0xEF);
/// assert_eq!(mem.read_word(0x1234).unwrap(), 0xBEEF);
/// ```
pub trait MemoryBus {
    /// Reads a byte from the specified 16-bit address.
    fn read(&mut self, addr: u16) -> Result<u8, BusError>;

    /// Writes a byte to the specified 16-bit address.
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;

    /// Reads a big-endian word as two byte accesses, high byte first.
    ///
    /// The second access wraps from 0xFFFF to 0x0000.
    fn read_word(&mut self, addr: u16) -> Result<u16, BusError> {
        let high = self.read(addr)? as u16;
        let low = self.read(addr.wrapping_add(1))? as u16;
        Ok((high << 8) | low)
    }

    /// Writes a big-endian word as two byte accesses, high byte first.
    fn write_word(&mut self, addr: u16, value: u16) -> Result<(), BusError> {
        self.write(addr, (value >> 8) as u8)?;
        self.write(addr.wrapping_add(1), value as u8)
    }

    /// Per-instruction hook for time-driven peripherals.
    ///
    /// Called by the execution driver once after every executed instruction
    /// with the updated cycle counter. Devices raise interrupt lines by
    /// latching requests into `interrupts`.
    ///
    /// # Default Implementation
    ///
    /// Does nothing, for memories without peripherals (like `FlatMemory`).
    fn tick(&mut self, clock: u64, interrupts: &mut InterruptController) {
        let _ = (clock, interrupts);
    }
}

/// Simple 64KB flat memory implementation.
///
/// All 65536 addresses (0x0000-0xFFFF) are mapped to a single contiguous RAM
/// array and every access succeeds.
///
/// Useful for:
/// - Testing and development
/// - Programs that don't need ROM/RAM/I/O distinction
///
/// # Examples
///
/// ```
/// use lib6809::{FlatMemory, MemoryBus, CPU};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0xFFFE, &[0x80, 0x00]); // reset vector -> 0x8000
///
/// let cpu = CPU::new(memory);
/// assert_eq!(cpu.pc(), 0x8000);
/// ```
pub struct FlatMemory {
    /// 64KB contiguous memory array
    data: Box<[u8; 65536]>,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
        }
    }

    /// Copies `bytes` into memory starting at `addr`, wrapping at 0xFFFF.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.data[addr.wrapping_add(i as u16) as usize] = byte;
        }
    }

    /// Returns the byte at `addr` without going through the bus.
    pub fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        Ok(self.data[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.data[addr as usize] = value;
        Ok(())
    }
}
