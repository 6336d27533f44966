//! # System Bus
//!
//! The address-space router of the simulated machine. Every CPU access is
//! classified against four boundaries and routed to the memory image, to a
//! peripheral, or rejected with a [`BusError`].
//!
//! ```text
//! 0x0000 +----------------+
//!        |   unmapped     |  below mem_low
//!        +----------------+ mem_low
//!        |      RAM       |
//!        |   +--------+   | io_low
//!        |   |  I/O   |   |  routed to the device registry
//!        |   +--------+   | io_high
//!        +----------------+ mem_high
//!        |   unmapped     |
//!        +----------------+ rom
//!        |      ROM       |  readable, write protected
//! 0xFFFF +----------------+
//! ```
//!
//! The I/O window takes precedence over every other classification, except
//! that writes at or above `rom` are always rejected. All boundaries are
//! exclusive upper bounds and may be 0x10000.
//!
//! While the *loading* flag is asserted (image loaders), writes go straight
//! into the memory image regardless of classification.

use crate::devices::DeviceRegistry;
use crate::interrupts::InterruptController;
use crate::memory::{BusError, MemoryBus};
use std::fmt;

/// Classification of a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ram,
    Rom,
    Io,
    Unmapped,
}

/// Region boundaries of the machine.
///
/// Values are `u32` so that 0x10000 can express "up to the end of memory".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMap {
    pub mem_low: u32,
    pub mem_high: u32,
    pub io_low: u32,
    pub io_high: u32,
    pub rom: u32,
}

impl AddressMap {
    pub const fn new(mem_low: u32, mem_high: u32, io_low: u32, io_high: u32, rom: u32) -> Self {
        AddressMap {
            mem_low,
            mem_high,
            io_low,
            io_high,
            rom,
        }
    }

    /// Classifies `addr`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lib6809::{AddressMap, Region};
    ///
    /// let map = AddressMap::default();
    /// assert_eq!(map.classify(0x0000), Region::Ram);
    /// assert_eq!(map.classify(0xE000), Region::Io);
    /// assert_eq!(map.classify(0xE800), Region::Ram);
    /// assert_eq!(map.classify(0xF000), Region::Rom);
    /// ```
    pub fn classify(&self, addr: u16) -> Region {
        let a = addr as u32;
        if a >= self.io_low && a < self.io_high {
            Region::Io
        } else if a >= self.rom {
            Region::Rom
        } else if a < self.mem_low || a >= self.mem_high {
            Region::Unmapped
        } else {
            Region::Ram
        }
    }

    pub fn io_contains(&self, low: u32, high: u32) -> bool {
        low >= self.io_low && high <= self.io_high
    }
}

impl Default for AddressMap {
    /// RAM 0x0000-0xEFFF, I/O 0xE000-0xE7FF, ROM 0xF000-0xFFFF.
    fn default() -> Self {
        AddressMap::new(0x0000, 0xF000, 0xE000, 0xE800, 0xF000)
    }
}

impl fmt::Display for AddressMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MEM {:04X}-{:04X}  IO {:04X}-{:04X}  ROM {:04X}",
            self.mem_low, self.mem_high, self.io_low, self.io_high, self.rom
        )
    }
}

/// The machine's bus: a 64 KiB memory image, the address map and the devices.
///
/// # Examples
///
/// ```
/// use lib6809::{AddressMap, BusError, MemoryBus, SystemBus};
///
/// let mut bus = SystemBus::new(AddressMap::default());
/// bus.write(0x1000, 0x42).unwrap();
/// assert_eq!(bus.read(0x1000).unwrap(), 0x42);
///
/// assert_eq!(bus.write(0xF000, 0x00), Err(BusError::WriteProtected(0xF000)));
/// assert_eq!(bus.read(0xE000), Err(BusError::NoDevice(0xE000)));
///
/// // Loaders bypass protection
/// bus.loading(|bus| bus.write(0xF000, 0x7E)).unwrap();
/// assert_eq!(bus.read(0xF000).unwrap(), 0x7E);
/// ```
pub struct SystemBus {
    image: Box<[u8; 0x10000]>,
    map: AddressMap,
    devices: DeviceRegistry,
    loading: bool,
}

impl SystemBus {
    pub fn new(map: AddressMap) -> Self {
        Self::with_devices(map, DeviceRegistry::new())
    }

    pub fn with_devices(map: AddressMap, devices: DeviceRegistry) -> Self {
        SystemBus {
            image: Box::new([0; 0x10000]),
            map,
            devices,
            loading: false,
        }
    }

    pub fn map(&self) -> &AddressMap {
        &self.map
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.devices
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Runs `f` with the loading flag asserted, restoring the previous state after.
    pub fn loading<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.loading;
        self.loading = true;
        let result = f(self);
        self.loading = previous;
        result
    }

    /// Raw image byte, bypassing classification and devices.
    pub fn peek(&self, addr: u16) -> u8 {
        self.image[addr as usize]
    }

    /// Raw image write, bypassing classification and devices.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.image[addr as usize] = value;
    }

    /// Zeroes the whole memory image.
    pub fn clear_memory(&mut self) {
        self.image.fill(0);
    }

    fn io_read(&mut self, addr: u16) -> Result<u8, BusError> {
        self.devices.read(addr).ok_or(BusError::NoDevice(addr))
    }
}

impl MemoryBus for SystemBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        match self.map.classify(addr) {
            Region::Io => self.io_read(addr),
            Region::Ram | Region::Rom => Ok(self.image[addr as usize]),
            Region::Unmapped => Err(BusError::NoMemory(addr)),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        if self.loading {
            self.image[addr as usize] = value;
            return Ok(());
        }
        // The ROM guard wins even over an I/O window placed above `rom`
        if addr as u32 >= self.map.rom {
            return Err(BusError::WriteProtected(addr));
        }
        match self.map.classify(addr) {
            Region::Io => {
                if self.devices.write(addr, value) {
                    Ok(())
                } else {
                    Err(BusError::NoDevice(addr))
                }
            }
            Region::Rom => Err(BusError::WriteProtected(addr)),
            Region::Ram => {
                self.image[addr as usize] = value;
                Ok(())
            }
            Region::Unmapped => Err(BusError::NoMemory(addr)),
        }
    }

    fn tick(&mut self, clock: u64, interrupts: &mut InterruptController) {
        self.devices.tick(clock, interrupts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_window_upper_bound_is_exclusive() {
        let map = AddressMap::default();
        assert_eq!(map.classify(0xE7FF), Region::Io);
        assert_eq!(map.classify(0xE800), Region::Ram);
        assert_eq!(map.classify(0xDFFF), Region::Ram);
    }

    #[test]
    fn test_gap_between_ram_and_rom() {
        let map = AddressMap::new(0x0100, 0x8000, 0xE000, 0xE800, 0xC000);
        assert_eq!(map.classify(0x00FF), Region::Unmapped);
        assert_eq!(map.classify(0x0100), Region::Ram);
        assert_eq!(map.classify(0x7FFF), Region::Ram);
        assert_eq!(map.classify(0x8000), Region::Unmapped);
        assert_eq!(map.classify(0xBFFF), Region::Unmapped);
        assert_eq!(map.classify(0xC000), Region::Rom);
        assert_eq!(map.classify(0xE000), Region::Io);
    }

    #[test]
    fn test_rom_guard_checked_before_io_window() {
        let mut bus = SystemBus::new(AddressMap::new(0x0000, 0x8000, 0xF000, 0xF100, 0xC000));
        assert_eq!(bus.map().classify(0xF000), Region::Io);
        assert_eq!(bus.write(0xF000, 1), Err(BusError::WriteProtected(0xF000)));
    }

    #[test]
    fn test_no_rom_when_boundary_is_end_of_memory() {
        let map = AddressMap::new(0x0000, 0x10000, 0xE000, 0xE800, 0x10000);
        assert_eq!(map.classify(0xFFFF), Region::Ram);
    }

    #[test]
    fn test_unmapped_access_errors() {
        let mut bus = SystemBus::new(AddressMap::new(0x0000, 0x8000, 0xE000, 0xE800, 0xF000));
        assert_eq!(bus.read(0x9000), Err(BusError::NoMemory(0x9000)));
        assert_eq!(bus.write(0x9000, 1), Err(BusError::NoMemory(0x9000)));
        assert_eq!(bus.write(0xE010, 1), Err(BusError::NoDevice(0xE010)));
    }

    #[test]
    fn test_loading_flag_is_restored() {
        let mut bus = SystemBus::new(AddressMap::default());
        bus.loading(|bus| {
            assert!(bus.is_loading());
            bus.write(0xE000, 0x55)
        })
        .unwrap();
        assert!(!bus.is_loading());
        // The loader wrote into the image behind the I/O window
        assert_eq!(bus.peek(0xE000), 0x55);
    }
}
