//! Placeholder peripheral.
//!
//! A plain register file with no behaviour, used to stand in for hardware that
//! software probes but the machine does not model.

use super::Device;

/// Read/write scratch registers, all zero at start.
///
/// # Examples
///
/// ```rust
/// use lib6809::{Device, FakeDevice};
///
/// let mut fake = FakeDevice::new(4);
/// fake.write(2, 0xAA);
/// assert_eq!(fake.read(2), 0xAA);
/// assert_eq!(fake.size(), 4);
/// ```
pub struct FakeDevice {
    data: Vec<u8>,
}

impl FakeDevice {
    pub const DEFAULT_SIZE: u16 = 4;

    pub fn new(size: u16) -> Self {
        FakeDevice {
            data: vec![0; size.max(1) as usize],
        }
    }
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl Device for FakeDevice {
    fn read(&mut self, offset: u16) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, offset: u16, value: u8) {
        if let Some(slot) = self.data.get_mut(offset as usize) {
            *slot = value;
        }
    }

    fn size(&self) -> u16 {
        self.data.len() as u16
    }

    fn status(&self) -> String {
        let bytes: Vec<String> = self.data.iter().take(8).map(|b| format!("{:02X}", b)).collect();
        format!("SIZE:{} [{}]", self.data.len(), bytes.join(" "))
    }
}
