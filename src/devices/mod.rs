//! Memory-mapped peripherals for the 6809 system bus.
//!
//! This module provides the device model used for the I/O window of the
//! [`SystemBus`](crate::bus::SystemBus): every peripheral chip occupies a small
//! window of addresses, receives offset-based register accesses, and is
//! ticked once per executed instruction so that time-driven behaviour (serial
//! character times, counters) can advance and raise interrupts.
//!
//! # Architecture
//!
//! - **Device trait**: register access, tick and status line for one chip
//! - **Peripheral**: closed set of the supported chip models
//! - **DeviceRecord**: a peripheral bound to its address window and interrupt line
//! - **DeviceRegistry**: address lookup and tick dispatch over all records
//!
//! # Example
//!
//! ```rust
//! use lib6809::{DeviceRecord, DeviceRegistry, InterruptLine, Mc6850, NullSerial, Peripheral};
//!
//! let mut registry = DeviceRegistry::new();
//! let acia = Mc6850::new(9600, Box::new(NullSerial));
//! registry
//!     .register(DeviceRecord::new(0xE000, Some(InterruptLine::Irq), Peripheral::Acia(acia)))
//!     .unwrap();
//!
//! // Status register: transmit data register empty
//! assert_eq!(registry.read(0xE000), Some(0x02));
//! assert_eq!(registry.read(0xE002), None);
//! ```

use crate::interrupts::{InterruptController, InterruptLine, IrqPin};
use std::fmt;
use thiserror::Error;

pub mod acia;
pub mod fake;
pub mod fdc;
pub mod pia;
pub mod riot;
pub mod timer;
pub mod via;

pub use acia::{BufferedSerial, Mc6850, NullSerial, SerialPort, StdioSerial};
pub use fake::FakeDevice;
pub use fdc::Fd1795;
pub use pia::Mc6820;
pub use riot::R6532;
pub use timer::Mc6840;
pub use via::R6522;

/// Abstract interface for memory-mapped peripheral chips.
///
/// The registry calls these methods with offset-based addressing (0 to
/// size-1), so a device model never depends on where it is mapped.
///
/// # Design
///
/// - **Offset-based**: the device receives `addr - base`, not the absolute address
/// - **No panics**: all register accesses succeed; unused registers read as 0
/// - **Mutable read**: reading a data register commonly clears status bits
/// - **Tick**: called once per executed instruction with the global cycle count
///
/// # Examples
///
/// ```rust
/// use lib6809::Device;
///
/// struct Latch {
///     value: u8,
/// }
///
/// impl Device for Latch {
///     fn read(&mut self, _offset: u16) -> u8 {
///         self.value
///     }
///
///     fn write(&mut self, _offset: u16, value: u8) {
///         self.value = value;
///     }
///
///     fn size(&self) -> u16 {
///         1
///     }
///
///     fn status(&self) -> String {
///         format!("LATCH:{:02X}", self.value)
///     }
/// }
/// ```
pub trait Device {
    /// Read the register at `offset`.
    fn read(&mut self, offset: u16) -> u8;

    /// Write the register at `offset`.
    fn write(&mut self, offset: u16, value: u8);

    /// Number of addresses the device decodes.
    fn size(&self) -> u16;

    /// Advance to `clock` cycles since the machine started.
    ///
    /// Devices raise their configured interrupt line through `irq`.
    ///
    /// # Default Implementation
    ///
    /// Does nothing, for devices without time-driven behaviour.
    fn tick(&mut self, clock: u64, irq: &mut IrqPin<'_>) {
        let _ = (clock, irq);
    }

    /// Return to the power-on register state.
    ///
    /// # Default Implementation
    ///
    /// Does nothing, for devices without reset-sensitive state.
    fn reset(&mut self) {}

    /// One-line human readable register dump.
    fn status(&self) -> String;
}

/// Chip family of a [`Peripheral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Acia,
    Pia,
    Timer,
    Via,
    Riot,
    Fdc,
    Fake,
}

impl DeviceKind {
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Acia => "MC6850",
            DeviceKind::Pia => "MC6821",
            DeviceKind::Timer => "MC6840",
            DeviceKind::Via => "R6522",
            DeviceKind::Riot => "R6532",
            DeviceKind::Fdc => "FD1795",
            DeviceKind::Fake => "FAKE",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of peripheral models the machine can host.
pub enum Peripheral {
    Acia(Mc6850),
    Pia(Mc6820),
    Timer(Mc6840),
    Via(R6522),
    Riot(R6532),
    Fdc(Fd1795),
    Fake(FakeDevice),
}

impl Peripheral {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Peripheral::Acia(_) => DeviceKind::Acia,
            Peripheral::Pia(_) => DeviceKind::Pia,
            Peripheral::Timer(_) => DeviceKind::Timer,
            Peripheral::Via(_) => DeviceKind::Via,
            Peripheral::Riot(_) => DeviceKind::Riot,
            Peripheral::Fdc(_) => DeviceKind::Fdc,
            Peripheral::Fake(_) => DeviceKind::Fake,
        }
    }

    pub fn device(&self) -> &dyn Device {
        match self {
            Peripheral::Acia(d) => d,
            Peripheral::Pia(d) => d,
            Peripheral::Timer(d) => d,
            Peripheral::Via(d) => d,
            Peripheral::Riot(d) => d,
            Peripheral::Fdc(d) => d,
            Peripheral::Fake(d) => d,
        }
    }

    pub fn device_mut(&mut self) -> &mut dyn Device {
        match self {
            Peripheral::Acia(d) => d,
            Peripheral::Pia(d) => d,
            Peripheral::Timer(d) => d,
            Peripheral::Via(d) => d,
            Peripheral::Riot(d) => d,
            Peripheral::Fdc(d) => d,
            Peripheral::Fake(d) => d,
        }
    }

    pub fn as_acia_mut(&mut self) -> Option<&mut Mc6850> {
        match self {
            Peripheral::Acia(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_pia_mut(&mut self) -> Option<&mut Mc6820> {
        match self {
            Peripheral::Pia(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_timer_mut(&mut self) -> Option<&mut Mc6840> {
        match self {
            Peripheral::Timer(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_via_mut(&mut self) -> Option<&mut R6522> {
        match self {
            Peripheral::Via(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_riot_mut(&mut self) -> Option<&mut R6532> {
        match self {
            Peripheral::Riot(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_fdc_mut(&mut self) -> Option<&mut Fd1795> {
        match self {
            Peripheral::Fdc(d) => Some(d),
            _ => None,
        }
    }
}

/// A peripheral bound to its address window `[base, end)` and interrupt line.
pub struct DeviceRecord {
    name: String,
    base: u16,
    end: u32,
    line: Option<InterruptLine>,
    chip: Peripheral,
}

impl DeviceRecord {
    /// Maps `chip` at `base`; the window size comes from the chip model.
    pub fn new(base: u16, line: Option<InterruptLine>, chip: Peripheral) -> Self {
        let end = base as u32 + chip.device().size().max(1) as u32;
        DeviceRecord {
            name: chip.kind().name().to_string(),
            base,
            end,
            line,
            chip,
        }
    }

    /// Maps `chip` over an explicit window `[base, end)`.
    ///
    /// Used for fake devices whose extent is given by configuration. `end` is
    /// raised to `base + 1` when it does not lie above `base`.
    pub fn with_end(base: u16, end: u32, line: Option<InterruptLine>, chip: Peripheral) -> Self {
        DeviceRecord {
            name: chip.kind().name().to_string(),
            base,
            end: end.max(base as u32 + 1),
            line,
            chip,
        }
    }

    /// Renames the record (defaults to the chip name).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn line(&self) -> Option<InterruptLine> {
        self.line
    }

    pub fn kind(&self) -> DeviceKind {
        self.chip.kind()
    }

    pub fn chip(&self) -> &Peripheral {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut Peripheral {
        &mut self.chip
    }

    pub fn contains(&self, addr: u16) -> bool {
        let a = addr as u32;
        a >= self.base as u32 && a < self.end
    }

    pub fn overlaps(&self, base: u32, end: u32) -> bool {
        base < self.end && end > self.base as u32
    }

    /// Status line prefixed with chip name, window and interrupt line.
    pub fn status_line(&self) -> String {
        let line = match self.line {
            Some(line) => line.name(),
            None => "-",
        };
        format!(
            "{:<7} {:04X}-{:04X} {:<4} {}",
            self.name,
            self.base,
            self.end - 1,
            line,
            self.chip.device().status()
        )
    }
}

/// Error returned when device registration fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error(
        "device window 0x{new_base:04X}-0x{new_end:04X} overlaps {existing} at 0x{existing_base:04X}-0x{existing_end:04X}"
    )]
    Overlap {
        new_base: u32,
        new_end: u32,
        existing: DeviceKind,
        existing_base: u32,
        existing_end: u32,
    },
}

/// All peripherals of the machine.
///
/// Lookup scans from the most recently registered record, so a newer
/// device shadows an older one where windows overlap. Ticks run in
/// registration order.
#[derive(Default)]
pub struct DeviceRegistry {
    // Registration order; lookups iterate in reverse
    records: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, rejecting windows that overlap an existing device.
    pub fn register(&mut self, record: DeviceRecord) -> Result<(), DeviceError> {
        if let Some(existing) = self.overlapping(record.base as u32, record.end) {
            return Err(DeviceError::Overlap {
                new_base: record.base as u32,
                new_end: record.end - 1,
                existing: existing.kind(),
                existing_base: existing.base as u32,
                existing_end: existing.end - 1,
            });
        }
        self.register_shadowing(record);
        Ok(())
    }

    /// Adds a record unconditionally; it shadows older overlapping records.
    pub fn register_shadowing(&mut self, record: DeviceRecord) {
        log::debug!(
            "registered {} at 0x{:04X}-0x{:04X}",
            record.kind(),
            record.base,
            record.end - 1
        );
        self.records.push(record);
    }

    pub fn overlapping(&self, base: u32, end: u32) -> Option<&DeviceRecord> {
        self.records.iter().rev().find(|r| r.overlaps(base, end))
    }

    pub fn find(&self, addr: u16) -> Option<&DeviceRecord> {
        self.records.iter().rev().find(|r| r.contains(addr))
    }

    pub fn find_mut(&mut self, addr: u16) -> Option<&mut DeviceRecord> {
        self.records.iter_mut().rev().find(|r| r.contains(addr))
    }

    /// Reads through the device covering `addr`, `None` if there is none.
    pub fn read(&mut self, addr: u16) -> Option<u8> {
        let record = self.find_mut(addr)?;
        let offset = addr - record.base;
        Some(record.chip.device_mut().read(offset))
    }

    /// Writes through the device covering `addr`. Returns false if there is none.
    pub fn write(&mut self, addr: u16, value: u8) -> bool {
        match self.find_mut(addr) {
            Some(record) => {
                let offset = addr - record.base;
                record.chip.device_mut().write(offset, value);
                true
            }
            None => false,
        }
    }

    /// Ticks every device, oldest first.
    pub fn tick(&mut self, clock: u64, interrupts: &mut InterruptController) {
        for record in &mut self.records {
            let mut pin = IrqPin::new(record.line, interrupts);
            record.chip.device_mut().tick(clock, &mut pin);
        }
    }

    /// Resets every device to its power-on state.
    pub fn reset(&mut self) {
        for record in &mut self.records {
            record.chip.device_mut().reset();
        }
    }

    /// Records in lookup order (newest first).
    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.iter().rev()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord> {
        self.records.iter_mut().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One status line per device, in registration order.
    pub fn status_lines(&self) -> Vec<String> {
        self.records.iter().map(DeviceRecord::status_line).collect()
    }

    /// First ACIA in lookup order.
    pub fn acia_mut(&mut self) -> Option<&mut Mc6850> {
        self.iter_mut().find_map(|r| r.chip.as_acia_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake(base: u16, size: u16) -> DeviceRecord {
        DeviceRecord::new(base, None, Peripheral::Fake(FakeDevice::new(size)))
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.read(0xE000), None);
        assert!(!registry.write(0xE000, 0x12));
    }

    #[test]
    fn test_offset_routing() {
        let mut registry = DeviceRegistry::new();
        registry.register(fake(0xE010, 4)).unwrap();

        assert!(registry.write(0xE012, 0xAB));
        assert_eq!(registry.read(0xE012), Some(0xAB));
        assert_eq!(registry.read(0xE014), None);
        assert_eq!(registry.read(0xE00F), None);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut registry = DeviceRegistry::new();
        registry.register(fake(0xE000, 4)).unwrap();
        let err = registry.register(fake(0xE002, 4)).unwrap_err();
        assert!(matches!(err, DeviceError::Overlap { existing_base: 0xE000, .. }));

        // Adjacent windows are fine
        registry.register(fake(0xE004, 4)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_newest_device_shadows_older() {
        let mut registry = DeviceRegistry::new();
        registry.register_shadowing(fake(0xE000, 8));
        registry.register_shadowing(fake(0xE004, 4));

        registry.write(0xE004, 0x11);
        let newest = registry.iter().next().unwrap();
        assert_eq!(newest.base(), 0xE004);

        // The older device never saw the write
        let oldest = registry.iter().last().unwrap();
        assert_eq!(oldest.base(), 0xE000);
        assert_eq!(registry.read(0xE004), Some(0x11));
        assert_eq!(registry.read(0xE000), Some(0x00));
    }

    #[test]
    fn test_device_window_reaching_end_of_memory() {
        let mut registry = DeviceRegistry::new();
        registry.register(fake(0xFFFC, 4)).unwrap();
        assert!(registry.write(0xFFFF, 0x99));
        assert_eq!(registry.read(0xFFFF), Some(0x99));
        assert_eq!(registry.find(0xFFFF).unwrap().end(), 0x10000);
    }
}
