//! FD1795 floppy disk controller.
//!
//! A single drive holding a FLEX-formatted disk image with 256-byte sectors.
//! The geometry comes from the image's system information record: the
//! highest track number at offset 0x226, sectors per track at 0x227, and an
//! 8-character volume label at 0x210.
//!
//! Sector data is transferred byte by byte through the data register, with
//! BUSY and DRQ set in the status register for the duration of the transfer.
//! Writes modify the in-memory image only.
//!
//! ## Register Map
//!
//! | Offset | Read   | Write   |
//! |--------|--------|---------|
//! | 0      | Status | Command |
//! | 1      | Track  | Track   |
//! | 2      | Sector | Sector  |
//! | 3      | Data   | Data    |
//!
//! Track and sector transfers use the physical head position, which the step
//! commands without the update bit move independently of the track register.

use super::Device;
use crate::interrupts::IrqPin;
use std::fs;
use std::io;
use std::path::Path;

pub const SECTOR_SIZE: usize = 256;

const SR_BUSY: u8 = 0x01;
const SR_DRQ: u8 = 0x02;
const SR_TRACK0: u8 = 0x04;
const SR_RECORD_NOT_FOUND: u8 = 0x10;
const SR_HEAD_LOADED: u8 = 0x20;
const SR_WRITE_PROTECT: u8 = 0x40;
const SR_NOT_READY: u8 = 0x80;

const SIR_LABEL: usize = 0x210;
const SIR_TRACKS: usize = 0x226;
const SIR_SECTORS: usize = 0x227;

#[derive(Debug, Clone, Copy)]
struct Transfer {
    pos: usize,
    end: usize,
    write: bool,
}

/// Floppy disk controller with one drive.
///
/// # Example
///
/// ```rust
/// use lib6809::{Device, Fd1795};
///
/// // Two tracks (0 and 1) of four sectors
/// let mut image = vec![0u8; 2 * 4 * 256];
/// image[0x226] = 1;
/// image[0x227] = 4;
/// image[256] = 0xAB; // track 0, sector 2
///
/// let mut fdc = Fd1795::with_image(image, false);
/// fdc.write(2, 2);        // sector register
/// fdc.write(0, 0x80);     // READ SECTOR
/// assert_eq!(fdc.read(0) & 0x03, 0x03); // BUSY | DRQ
/// assert_eq!(fdc.read(3), 0xAB);
/// ```
pub struct Fd1795 {
    disk: Vec<u8>,
    read_only: bool,
    label: String,
    /// Highest track number
    last_track: u8,
    sectors: u8,
    cr: u8,
    sr: u8,
    track: u8,
    sector: u8,
    data: u8,
    head: u8,
    step_in: bool,
    transfer: Option<Transfer>,
    intrq: bool,
}

impl Fd1795 {
    pub const SIZE: u16 = 4;

    /// A controller with an empty drive; status reads NOT READY.
    pub fn new() -> Self {
        let mut fdc = Fd1795 {
            disk: Vec::new(),
            read_only: false,
            label: String::new(),
            last_track: 0,
            sectors: 0,
            cr: 0,
            sr: 0,
            track: 0,
            sector: 0,
            data: 0,
            head: 0,
            step_in: true,
            transfer: None,
            intrq: false,
        };
        fdc.reset_registers();
        fdc
    }

    /// A controller with `disk` inserted.
    pub fn with_image(disk: Vec<u8>, read_only: bool) -> Self {
        let (last_track, sectors, label) = if disk.len() > SIR_SECTORS {
            let label: String = disk[SIR_LABEL..SIR_LABEL + 8]
                .iter()
                .take_while(|&&b| b != 0)
                .map(|&b| b as char)
                .collect();
            (disk[SIR_TRACKS], disk[SIR_SECTORS], label)
        } else {
            (0, 0, String::new())
        };
        let mut fdc = Fd1795 {
            disk,
            read_only,
            label,
            last_track,
            sectors,
            ..Self::new()
        };
        fdc.reset_registers();
        fdc
    }

    /// Opens a disk image file; files without write permission are mounted
    /// write protected.
    pub fn open(path: &Path) -> io::Result<Self> {
        let read_only = fs::metadata(path)?.permissions().readonly();
        let disk = fs::read(path)?;
        let fdc = Self::with_image(disk, read_only);
        log::info!(
            "disk {}, label '{}', {} tracks, {} sectors{}",
            path.display(),
            fdc.label,
            fdc.last_track as u16 + 1,
            fdc.sectors,
            if read_only { " (read only)" } else { "" }
        );
        Ok(fdc)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn geometry(&self) -> (u16, u8) {
        (self.last_track as u16 + 1, self.sectors)
    }

    pub fn image(&self) -> &[u8] {
        &self.disk
    }

    fn base_status(&self) -> u8 {
        if self.disk.is_empty() {
            SR_NOT_READY
        } else if self.read_only {
            SR_WRITE_PROTECT
        } else {
            0
        }
    }

    fn reset_registers(&mut self) {
        self.cr = 0;
        self.sr = self.base_status();
        self.track = 0;
        self.sector = 0;
        self.data = 0;
        self.transfer = None;
    }

    fn type1_status(&self) -> u8 {
        let mut sr = self.base_status() | SR_HEAD_LOADED;
        if self.head == 0 {
            sr |= SR_TRACK0;
        }
        sr
    }

    fn step_head(&mut self, inward: bool, update_track: bool) {
        self.step_in = inward;
        if inward {
            if self.head < self.last_track {
                self.head += 1;
            }
            if update_track && self.track < self.last_track {
                self.track += 1;
            }
        } else {
            self.head = self.head.saturating_sub(1);
            if update_track {
                self.track = self.track.saturating_sub(1);
            }
        }
    }

    /// Starts a sector transfer at the current head position and sector.
    fn start_transfer(&mut self, multiple: bool, write: bool) {
        if write && self.read_only {
            self.sr = self.base_status();
            self.intrq = true;
            return;
        }
        let spt = self.sectors as usize;
        let start_sector = self.sector as usize;
        if spt == 0 || start_sector == 0 || start_sector > spt {
            self.sr = self.base_status() | SR_RECORD_NOT_FOUND;
            self.intrq = true;
            return;
        }
        let track_start = self.head as usize * spt * SECTOR_SIZE;
        let pos = track_start + (start_sector - 1) * SECTOR_SIZE;
        let end = if multiple {
            track_start + spt * SECTOR_SIZE
        } else {
            pos + SECTOR_SIZE
        };
        if end > self.disk.len() {
            self.sr = self.base_status() | SR_RECORD_NOT_FOUND;
            self.intrq = true;
            return;
        }
        self.transfer = Some(Transfer { pos, end, write });
        self.sr = self.base_status() | SR_BUSY | SR_DRQ;
    }

    fn advance_transfer(&mut self) {
        if let Some(t) = &mut self.transfer {
            t.pos += 1;
            if t.pos >= t.end {
                self.transfer = None;
                self.sr &= !(SR_BUSY | SR_DRQ);
                self.intrq = true;
            }
        }
    }

    fn command(&mut self, value: u8) {
        self.cr = value;
        if value & 0xF0 != 0xD0 {
            self.transfer = None;
        }
        match value & 0xF0 {
            0x00 => {
                self.head = 0;
                self.track = 0;
                self.sr = self.type1_status();
                self.intrq = true;
            }
            0x10 => {
                let target = self.data.min(self.last_track);
                self.head = target;
                self.track = target;
                self.sr = self.type1_status();
                self.intrq = true;
            }
            0x20 | 0x30 => {
                self.step_head(self.step_in, value & 0x10 != 0);
                self.sr = self.type1_status();
                self.intrq = true;
            }
            0x40 | 0x50 => {
                self.step_head(true, value & 0x10 != 0);
                self.sr = self.type1_status();
                self.intrq = true;
            }
            0x60 | 0x70 => {
                self.step_head(false, value & 0x10 != 0);
                self.sr = self.type1_status();
                self.intrq = true;
            }
            0x80 => self.start_transfer(false, false),
            0x90 => self.start_transfer(true, false),
            0xA0 => self.start_transfer(false, true),
            0xB0 => self.start_transfer(true, true),
            0xC0 => {
                self.data = self.head;
                self.sr = self.base_status();
                self.intrq = true;
            }
            0xD0 => {
                self.transfer = None;
                self.sr &= !(SR_BUSY | SR_DRQ);
                // Immediate interrupt condition
                if value & 0x08 != 0 {
                    self.intrq = true;
                }
            }
            _ => {
                log::warn!("FD1795 track read/write 0x{:02X} is not supported", value);
                self.sr = self.base_status();
            }
        }
    }
}

impl Default for Fd1795 {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Fd1795 {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 3 {
            0 => self.sr,
            1 => self.track,
            2 => self.sector,
            _ => {
                if let Some(t) = self.transfer {
                    if !t.write {
                        self.data = self.disk[t.pos];
                        self.advance_transfer();
                    }
                }
                self.data
            }
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 3 {
            0 => self.command(value),
            1 => self.track = value,
            2 => self.sector = value,
            _ => {
                self.data = value;
                if let Some(t) = self.transfer {
                    if t.write {
                        self.disk[t.pos] = value;
                        self.advance_transfer();
                    }
                }
            }
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, _clock: u64, irq: &mut IrqPin<'_>) {
        if std::mem::take(&mut self.intrq) {
            irq.raise();
        }
    }

    fn reset(&mut self) {
        self.reset_registers();
    }

    fn status(&self) -> String {
        format!(
            "SR:{:02X} CR:{:02X} track={} sector={} head={} data:{:02X}",
            self.sr, self.cr, self.track, self.sector, self.head, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{InterruptController, InterruptLine};

    fn image(tracks: u8, sectors: u8) -> Vec<u8> {
        let mut disk = vec![0u8; tracks as usize * sectors as usize * SECTOR_SIZE];
        disk[SIR_TRACKS] = tracks - 1;
        disk[SIR_SECTORS] = sectors;
        disk[SIR_LABEL..SIR_LABEL + 4].copy_from_slice(b"TEST");
        disk
    }

    #[test]
    fn test_geometry_from_system_information_record() {
        let fdc = Fd1795::with_image(image(3, 5), false);
        assert_eq!(fdc.geometry(), (3, 5));
        assert_eq!(fdc.label(), "TEST");
    }

    #[test]
    fn test_empty_drive_not_ready() {
        let mut fdc = Fd1795::new();
        assert_eq!(fdc.read(0), SR_NOT_READY);
    }

    #[test]
    fn test_seek_and_read_sector() {
        let mut disk = image(3, 4);
        // track 2, sector 3
        disk[(2 * 4 + 2) * SECTOR_SIZE] = 0x5A;
        let mut fdc = Fd1795::with_image(disk, false);

        fdc.write(3, 2);
        fdc.write(0, 0x10);
        assert_eq!(fdc.read(1), 2);
        assert_eq!(fdc.read(0) & SR_TRACK0, 0);

        fdc.write(2, 3);
        fdc.write(0, 0x80);
        assert_eq!(fdc.read(3), 0x5A);
        for _ in 1..SECTOR_SIZE {
            fdc.read(3);
        }
        assert_eq!(fdc.read(0) & (SR_BUSY | SR_DRQ), 0);
    }

    #[test]
    fn test_write_sector() {
        let mut fdc = Fd1795::with_image(image(2, 2), false);
        fdc.write(2, 1);
        fdc.write(0, 0xA0);
        fdc.write(3, 0x11);
        fdc.write(3, 0x22);
        assert_eq!(&fdc.image()[0..2], &[0x11, 0x22]);
    }

    #[test]
    fn test_write_protected_image() {
        let mut fdc = Fd1795::with_image(image(2, 2), true);
        fdc.write(2, 1);
        fdc.write(0, 0xA0);
        assert_eq!(fdc.read(0), SR_WRITE_PROTECT);
        fdc.write(3, 0x11);
        assert_eq!(fdc.image()[0], 0x00);
    }

    #[test]
    fn test_record_not_found() {
        let mut fdc = Fd1795::with_image(image(2, 2), false);
        fdc.write(2, 0);
        fdc.write(0, 0x80);
        assert_eq!(fdc.read(0) & SR_RECORD_NOT_FOUND, SR_RECORD_NOT_FOUND);
        fdc.write(2, 3);
        fdc.write(0, 0x80);
        assert_eq!(fdc.read(0) & SR_RECORD_NOT_FOUND, SR_RECORD_NOT_FOUND);
    }

    #[test]
    fn test_step_in_and_out() {
        let mut fdc = Fd1795::with_image(image(3, 2), false);
        fdc.write(0, 0x50); // step in, update track
        fdc.write(0, 0x50);
        fdc.write(0, 0x50); // clamped at the last track
        assert_eq!(fdc.read(1), 2);
        fdc.write(0, 0x60); // step out, head only
        assert_eq!(fdc.read(1), 2);
        fdc.write(0, 0xC0); // read address reports the head
        assert_eq!(fdc.read(3), 1);
    }

    #[test]
    fn test_command_completion_interrupts() {
        let mut fdc = Fd1795::with_image(image(2, 2), false);
        let mut ic = InterruptController::new();
        fdc.write(0, 0x00);
        fdc.tick(0, &mut IrqPin::new(Some(InterruptLine::Firq), &mut ic));
        assert!(ic.is_pending(InterruptLine::Firq));
    }
}
