//! # Image Loaders
//!
//! Loads program images into a [`SystemBus`] with the loading flag asserted,
//! so that ROM and the memory behind the I/O window can be initialised.
//!
//! Supported formats:
//!
//! - **Raw binary**: bytes placed at an origin, or ending at 0xFFFF when no
//!   origin is given (a ROM image containing its own vectors)
//! - **Motorola S-record**: S0 header, S1 data, S5 count, S9 start address
//! - **Intel hex**: data, end-of-file, and zero segment/linear base records
//!
//! [`load_file`] picks the format from the file extension.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::bus::SystemBus;
use crate::memory::{BusError, MemoryBus};

/// Errors raised while loading an image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    #[error("line {line}: checksum mismatch")]
    Checksum { line: usize },

    #[error("position/length mismatch: 0x{origin:04X}/0x{len:04X}")]
    Range { origin: u32, len: usize },

    #[error("unknown image format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// What a load wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Number of bytes written.
    pub bytes: usize,
    /// Lowest address written (0 if nothing was written).
    pub low: u16,
    /// Highest address written.
    pub high: u16,
    /// Start address carried by the image, if any.
    pub start: Option<u16>,
}

impl LoadSummary {
    fn record(&mut self, addr: u16, len: usize) {
        if len == 0 {
            return;
        }
        let last = addr.wrapping_add((len - 1) as u16);
        if self.bytes == 0 {
            self.low = addr;
            self.high = last;
        } else {
            self.low = self.low.min(addr);
            self.high = self.high.max(last);
        }
        self.bytes += len;
    }
}

fn write_block(bus: &mut SystemBus, addr: u16, data: &[u8]) -> Result<(), BusError> {
    bus.loading(|bus| {
        for (i, &byte) in data.iter().enumerate() {
            bus.write(addr.wrapping_add(i as u16), byte)?;
        }
        Ok(())
    })
}

/// Loads a raw binary image.
///
/// With no origin the image ends at 0xFFFF.
///
/// # Examples
///
/// ```
/// use lib6809::{loader, AddressMap, SystemBus};
///
/// let mut bus = SystemBus::new(AddressMap::default());
/// let summary = loader::load_raw(&mut bus, &[0x12, 0xF0, 0x00], None).unwrap();
/// assert_eq!(summary.low, 0xFFFD);
/// assert_eq!(bus.peek(0xFFFE), 0xF0);
/// ```
pub fn load_raw(
    bus: &mut SystemBus,
    data: &[u8],
    origin: Option<u16>,
) -> Result<LoadSummary, LoadError> {
    let origin = match origin {
        Some(origin) => origin as u32,
        None => 0x10000u32
            .checked_sub(data.len() as u32)
            .filter(|_| data.len() <= 0x10000)
            .ok_or(LoadError::Range {
                origin: 0,
                len: data.len(),
            })?,
    };
    if origin as usize + data.len() > 0x10000 {
        return Err(LoadError::Range {
            origin,
            len: data.len(),
        });
    }

    let mut summary = LoadSummary::default();
    write_block(bus, origin as u16, data)?;
    summary.record(origin as u16, data.len());
    log::info!("0x{:04X} bytes loaded at 0x{:04X}", data.len(), origin);
    Ok(summary)
}

/// Decodes the hex digit pairs of a record body.
fn hex_bytes(text: &str, line: usize) -> Result<Vec<u8>, LoadError> {
    if text.len() % 2 != 0 {
        return Err(LoadError::Syntax {
            line,
            reason: "odd number of hex digits".into(),
        });
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| LoadError::Syntax {
                    line,
                    reason: format!("invalid hex digits in {:?}", text),
                })
        })
        .collect()
}

/// Loads Motorola S-record text (S0, S1, S5 and S9 records).
pub fn load_srecord(bus: &mut SystemBus, text: &str) -> Result<LoadSummary, LoadError> {
    let mut summary = LoadSummary::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let record = raw.trim();
        if record.is_empty() {
            continue;
        }

        let body = record.strip_prefix(|c: char| c == 'S' || c == 's').ok_or(LoadError::Syntax {
            line,
            reason: "record does not start with 'S'".into(),
        })?;
        let kind = body.chars().next().unwrap_or(' ');
        let bytes = hex_bytes(body.get(kind.len_utf8()..).unwrap_or(""), line)?;

        // count, two address bytes and the checksum at least
        if bytes.len() < 4 || bytes[0] as usize != bytes.len() - 1 {
            return Err(LoadError::Syntax {
                line,
                reason: "byte count does not match record length".into(),
            });
        }
        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != 0xFF {
            return Err(LoadError::Checksum { line });
        }

        let addr = u16::from_be_bytes([bytes[1], bytes[2]]);
        let data = &bytes[3..bytes.len() - 1];
        match kind {
            '0' | '5' => {}
            '1' => {
                write_block(bus, addr, data)?;
                summary.record(addr, data.len());
            }
            '9' => {
                summary.start = Some(addr);
                break;
            }
            '2' | '3' | '7' | '8' => {
                return Err(LoadError::Syntax {
                    line,
                    reason: format!("S{} records need more than 16 address bits", kind),
                })
            }
            _ => {
                return Err(LoadError::Syntax {
                    line,
                    reason: format!("unknown record type S{}", kind),
                })
            }
        }
    }

    log::info!(
        "S-record: 0x{:04X} bytes at 0x{:04X}-0x{:04X}",
        summary.bytes,
        summary.low,
        summary.high
    );
    Ok(summary)
}

/// Loads Intel hex text.
pub fn load_intel_hex(bus: &mut SystemBus, text: &str) -> Result<LoadSummary, LoadError> {
    let mut summary = LoadSummary::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let record = raw.trim();
        if record.is_empty() {
            continue;
        }

        let body = record.strip_prefix(':').ok_or(LoadError::Syntax {
            line,
            reason: "record does not start with ':'".into(),
        })?;
        let bytes = hex_bytes(body, line)?;
        if bytes.len() < 5 || bytes[0] as usize != bytes.len() - 5 {
            return Err(LoadError::Syntax {
                line,
                reason: "byte count does not match record length".into(),
            });
        }
        if bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) != 0 {
            return Err(LoadError::Checksum { line });
        }

        let addr = u16::from_be_bytes([bytes[1], bytes[2]]);
        let data = &bytes[4..bytes.len() - 1];
        let nonzero_base = |len: usize| data.len() != len || data.iter().any(|&b| b != 0);

        match bytes[3] {
            0x00 => {
                write_block(bus, addr, data)?;
                summary.record(addr, data.len());
            }
            0x01 => break,
            0x02 | 0x04 => {
                if nonzero_base(2) {
                    return Err(LoadError::Syntax {
                        line,
                        reason: "non-zero segment or linear base".into(),
                    });
                }
            }
            0x03 if data.len() == 4 && data[0] == 0 && data[1] == 0 => {
                summary.start = Some(u16::from_be_bytes([data[2], data[3]]));
            }
            0x05 if data.len() == 4 && data[0] == 0 && data[1] == 0 => {
                summary.start = Some(u16::from_be_bytes([data[2], data[3]]));
            }
            kind => {
                return Err(LoadError::Syntax {
                    line,
                    reason: format!("unsupported record type {:02X}", kind),
                })
            }
        }
    }

    log::info!(
        "Intel hex: 0x{:04X} bytes at 0x{:04X}-0x{:04X}",
        summary.bytes,
        summary.low,
        summary.high
    );
    Ok(summary)
}

/// Loads a file, choosing the format by extension.
///
/// `.s19`, `.s`, `.srec` and `.mot` are S-records; `.hex` and `.ihx` are Intel
/// hex; extensions starting with `b` (`.bin`, `.b`) are raw binaries placed at
/// `origin`. The origin is ignored for the text formats.
pub fn load_file(
    bus: &mut SystemBus,
    path: &Path,
    origin: Option<u16>,
) -> Result<LoadSummary, LoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    log::info!("loading {}", path.display());

    match extension.as_str() {
        "s19" | "s" | "srec" | "mot" => load_srecord(bus, &fs::read_to_string(path)?),
        "hex" | "ihx" => load_intel_hex(bus, &fs::read_to_string(path)?),
        ext if ext.starts_with('b') => load_raw(bus, &fs::read(path)?, origin),
        _ => Err(LoadError::UnknownFormat(path.display().to_string())),
    }
}
