//! # Machine Configuration
//!
//! Parser for the `.sim6809.ini` machine description and the builder that
//! turns it into a [`SystemBus`].
//!
//! The format is line based and case-insensitive. `#` starts a comment and
//! blank lines are ignored. Numbers are hexadecimal except the ACIA speed.
//!
//! ```text
//! rom  F000
//! mem  0000 F000
//! io   E000 E800
//!
//! m6850  E000 IRQ 19200     # serial console
//! m6840  E010 FIRQ
//! r6522  E020 -
//! fd1795 E040 NMI disk.dsk
//! fake   E100 - E108
//! ```
//!
//! Device lines are `<type> <base> [IRQ|FIRQ|NMI|-] [parameters]`. Every
//! device window must lie inside the I/O window; overlapping windows are
//! rejected unless [`MachineConfig::allow_overlap`] is set.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bus::{AddressMap, SystemBus};
use crate::devices::{
    DeviceError, DeviceKind, DeviceRecord, DeviceRegistry, FakeDevice, Fd1795, Mc6820, Mc6840,
    Mc6850, NullSerial, Peripheral, SerialPort, R6522, R6532,
};
use crate::interrupts::InterruptLine;

/// Name of the configuration file looked up by [`MachineConfig::discover`].
pub const CONFIG_FILE_NAME: &str = ".sim6809.ini";

/// Serial speed used when an `m6850` line gives none.
pub const DEFAULT_BPS: u32 = 9600;

/// Errors raised while reading or validating a machine description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("line {line}: unrecognised device '{name}'")]
    UnknownDevice { line: usize, name: String },

    #[error("line {line}: {keyword} needs {what}")]
    MissingParameter {
        line: usize,
        keyword: String,
        what: &'static str,
    },

    #[error("line {line}: bad number '{text}'")]
    BadNumber { line: usize, text: String },

    #[error(
        "bad address for {name} @ 0x{base:04X}, outside I/O space 0x{io_low:04X}-0x{io_high:04X}"
    )]
    OutsideIoWindow {
        name: String,
        base: u16,
        io_low: u32,
        io_high: u32,
    },

    #[error(transparent)]
    Overlap(#[from] DeviceError),

    #[error("disk image {}: {source}", path.display())]
    Disk { path: PathBuf, source: io::Error },
}

/// One device line of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub kind: DeviceKind,
    /// Type name as written in the file, used as the record name.
    pub name: String,
    pub base: u16,
    /// Exclusive end for fake devices; other chips take their own size.
    pub end: Option<u32>,
    pub line: Option<InterruptLine>,
    pub bps: u32,
    pub disk: Option<PathBuf>,
}

impl DeviceSpec {
    pub fn new(kind: DeviceKind, base: u16, line: Option<InterruptLine>) -> Self {
        DeviceSpec {
            kind,
            name: kind.name().to_string(),
            base,
            end: None,
            line,
            bps: DEFAULT_BPS,
            disk: None,
        }
    }

    /// Exclusive end of the window the device will decode.
    pub fn window_end(&self) -> u32 {
        let size = match self.kind {
            DeviceKind::Acia => Mc6850::SIZE,
            DeviceKind::Pia => Mc6820::SIZE,
            DeviceKind::Timer => Mc6840::SIZE,
            DeviceKind::Via => R6522::SIZE,
            DeviceKind::Riot => R6532::SIZE,
            DeviceKind::Fdc => Fd1795::SIZE,
            DeviceKind::Fake => {
                return self
                    .end
                    .unwrap_or(self.base as u32 + 4)
                    .max(self.base as u32 + 1)
            }
        };
        self.base as u32 + size as u32
    }
}

/// Address map plus device list describing one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineConfig {
    pub map: AddressMap,
    pub devices: Vec<DeviceSpec>,
    /// Let newer devices shadow older ones instead of rejecting overlaps.
    pub allow_overlap: bool,
}

impl MachineConfig {
    /// Parses configuration text.
    ///
    /// # Examples
    ///
    /// ```
    /// use lib6809::{DeviceKind, InterruptLine, MachineConfig};
    ///
    /// let config = MachineConfig::parse("ROM F800\nm6850 e000 irq 19200\n").unwrap();
    /// assert_eq!(config.map.rom, 0xF800);
    /// assert_eq!(config.devices[0].kind, DeviceKind::Acia);
    /// assert_eq!(config.devices[0].line, Some(InterruptLine::Irq));
    /// assert_eq!(config.devices[0].bps, 19200);
    /// ```
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = MachineConfig::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let tokens: Vec<&str> = content.split_whitespace().collect();
            let Some((keyword, args)) = tokens.split_first() else {
                continue;
            };
            let keyword = keyword.to_ascii_lowercase();

            let used = match keyword.as_str() {
                "rom" => {
                    config.map.rom = hex_arg(args, 0, line, &keyword, "an address")?;
                    1
                }
                "mem" => {
                    config.map.mem_low = hex_arg(args, 0, line, &keyword, "a low address")?;
                    config.map.mem_high = hex_arg(args, 1, line, &keyword, "a high address")?;
                    2
                }
                "io" => {
                    config.map.io_low = hex_arg(args, 0, line, &keyword, "a low address")?;
                    config.map.io_high = hex_arg(args, 1, line, &keyword, "a high address")?;
                    2
                }
                _ => {
                    let (spec, used) = parse_device(&keyword, args, line)?;
                    config.devices.push(spec);
                    used
                }
            };

            if args.len() > used {
                log::warn!("line {}: ignoring '{}'", line, args[used..].join(" "));
            }
        }

        Ok(config)
    }

    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        log::info!("configuration from {}", path.display());
        Ok(config)
    }

    /// Candidate locations: `$HOME/.sim6809.ini`, then `./.sim6809.ini`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(Path::new(&home).join(CONFIG_FILE_NAME));
        }
        paths.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
        paths
    }

    /// Loads the first configuration file found, or the defaults if none exists.
    pub fn discover() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::load(&path);
            }
        }
        log::info!("no {} found, using the default machine", CONFIG_FILE_NAME);
        Ok(MachineConfig::default())
    }

    /// Checks that every device lies inside the I/O window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for spec in &self.devices {
            if !self.map.io_contains(spec.base as u32, spec.window_end()) {
                return Err(ConfigError::OutsideIoWindow {
                    name: spec.name.clone(),
                    base: spec.base,
                    io_low: self.map.io_low,
                    io_high: self.map.io_high,
                });
            }
        }
        Ok(())
    }

    /// Builds the bus with ACIAs attached to [`NullSerial`].
    pub fn build(&self) -> Result<SystemBus, ConfigError> {
        self.build_with_serial(|| Box::new(NullSerial) as Box<dyn SerialPort>)
    }

    /// Builds the bus, asking `serial` for the backend of each ACIA.
    pub fn build_with_serial<F>(&self, mut serial: F) -> Result<SystemBus, ConfigError>
    where
        F: FnMut() -> Box<dyn SerialPort>,
    {
        self.validate()?;
        log::info!("{}", self.map);

        let mut registry = DeviceRegistry::new();
        for spec in &self.devices {
            let chip = match spec.kind {
                DeviceKind::Acia => Peripheral::Acia(Mc6850::new(spec.bps, serial())),
                DeviceKind::Pia => Peripheral::Pia(Mc6820::new()),
                DeviceKind::Timer => Peripheral::Timer(Mc6840::new()),
                DeviceKind::Via => Peripheral::Via(R6522::new()),
                DeviceKind::Riot => Peripheral::Riot(R6532::new()),
                DeviceKind::Fdc => Peripheral::Fdc(open_disk(spec)?),
                DeviceKind::Fake => {
                    let size = spec.window_end() - spec.base as u32;
                    Peripheral::Fake(FakeDevice::new(size.min(u16::MAX as u32) as u16))
                }
            };
            let record = DeviceRecord::with_end(spec.base, spec.window_end(), spec.line, chip)
                .named(spec.name.clone());
            if self.allow_overlap {
                registry.register_shadowing(record);
            } else {
                registry.register(record)?;
            }
        }

        Ok(SystemBus::with_devices(self.map, registry))
    }
}

fn open_disk(spec: &DeviceSpec) -> Result<Fd1795, ConfigError> {
    match &spec.disk {
        Some(path) => Fd1795::open(path).map_err(|source| ConfigError::Disk {
            path: path.clone(),
            source,
        }),
        None => Ok(Fd1795::new()),
    }
}

/// Parses a device line. Returns the spec and how many arguments it consumed.
fn parse_device(keyword: &str, args: &[&str], line: usize) -> Result<(DeviceSpec, usize), ConfigError> {
    let kind = match keyword {
        "m6850" => DeviceKind::Acia,
        "m6840" => DeviceKind::Timer,
        "m6820" | "m6821" | "r6520" | "r6521" => DeviceKind::Pia,
        "r6522" => DeviceKind::Via,
        "r6532" => DeviceKind::Riot,
        "fd1795" => DeviceKind::Fdc,
        "fake" => DeviceKind::Fake,
        _ => {
            return Err(ConfigError::UnknownDevice {
                line,
                name: keyword.to_string(),
            })
        }
    };

    let base = hex_arg(args, 0, line, keyword, "a base address")?;
    let base = u16::try_from(base).map_err(|_| ConfigError::BadNumber {
        line,
        text: args[0].to_string(),
    })?;

    let mut next = 1;
    let mut interrupt = None;
    if let Some(token) = args.get(1) {
        if let Some(parsed) = parse_line(token) {
            interrupt = parsed;
            next = 2;
        }
    }

    let mut spec = DeviceSpec::new(kind, base, interrupt);
    spec.name = keyword.to_ascii_uppercase();

    match kind {
        DeviceKind::Acia => {
            if let Some(text) = args.get(next) {
                spec.bps = text.parse().map_err(|_| ConfigError::BadNumber {
                    line,
                    text: text.to_string(),
                })?;
                next += 1;
            }
        }
        DeviceKind::Fdc => {
            let path = args.get(next).ok_or_else(|| ConfigError::MissingParameter {
                line,
                keyword: keyword.to_string(),
                what: "a disk image path",
            })?;
            spec.disk = Some(PathBuf::from(path));
            next += 1;
        }
        DeviceKind::Fake => {
            if args.get(next).is_some() {
                spec.end = Some(hex_arg(args, next, line, keyword, "an end address")?);
                next += 1;
            }
        }
        _ => {}
    }

    Ok((spec, next))
}

/// `Some(None)` for an explicit "no line" marker, `None` if `token` is not a line.
fn parse_line(token: &str) -> Option<Option<InterruptLine>> {
    match token.to_ascii_lowercase().as_str() {
        "irq" => Some(Some(InterruptLine::Irq)),
        "firq" => Some(Some(InterruptLine::Firq)),
        "nmi" => Some(Some(InterruptLine::Nmi)),
        "-" | "x" | "none" => Some(None),
        _ => None,
    }
}

fn hex_arg(
    args: &[&str],
    index: usize,
    line: usize,
    keyword: &str,
    what: &'static str,
) -> Result<u32, ConfigError> {
    let text = args.get(index).ok_or_else(|| ConfigError::MissingParameter {
        line,
        keyword: keyword.to_string(),
        what,
    })?;
    let digits = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0x"))
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    match u32::from_str_radix(digits, 16) {
        Ok(value) if value <= 0x10000 => Ok(value),
        _ => Err(ConfigError::BadNumber {
            line,
            text: text.to_string(),
        }),
    }
}
