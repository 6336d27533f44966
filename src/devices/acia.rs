//! MC6850 ACIA serial interface.
//!
//! Provides a serial port via two memory-mapped registers, paced at one
//! character per character time, with a pluggable host-side [`SerialPort`].

use super::Device;
use crate::interrupts::IrqPin;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Host side of a serial line.
pub trait SerialPort {
    /// Next received byte, if one is waiting. Must not block.
    fn poll_byte(&mut self) -> Option<u8>;

    /// Sends a transmitted byte to the host.
    fn send_byte(&mut self, byte: u8);
}

/// A disconnected line: never receives, discards transmissions.
pub struct NullSerial;

impl SerialPort for NullSerial {
    fn poll_byte(&mut self) -> Option<u8> {
        None
    }

    fn send_byte(&mut self, _byte: u8) {}
}

#[derive(Default)]
struct SerialBuffers {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// In-memory serial line with a shared handle.
///
/// Clones share the same buffers, so the host can keep one clone to feed
/// input and collect output while the ACIA owns another.
///
/// # Example
///
/// ```rust
/// use lib6809::{BufferedSerial, SerialPort};
///
/// let host = BufferedSerial::new();
/// let mut line = host.clone();
///
/// host.push_input(b"hi");
/// assert_eq!(line.poll_byte(), Some(b'h'));
///
/// line.send_byte(b'!');
/// assert_eq!(host.take_output(), b"!".to_vec());
/// ```
#[derive(Clone, Default)]
pub struct BufferedSerial {
    buffers: Rc<RefCell<SerialBuffers>>,
    on_transmit: Option<Rc<dyn Fn(u8)>>,
}

impl BufferedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes transmitted bytes to `callback` instead of the output buffer.
    pub fn set_transmit_callback<F>(&mut self, callback: F)
    where
        F: Fn(u8) + 'static,
    {
        self.on_transmit = Some(Rc::new(callback));
    }

    pub fn push_input(&self, bytes: &[u8]) {
        self.buffers.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn pending_input(&self) -> usize {
        self.buffers.borrow().rx.len()
    }

    /// Drains everything transmitted so far.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.buffers.borrow_mut().tx)
    }
}

impl SerialPort for BufferedSerial {
    fn poll_byte(&mut self) -> Option<u8> {
        self.buffers.borrow_mut().rx.pop_front()
    }

    fn send_byte(&mut self, byte: u8) {
        match &self.on_transmit {
            Some(callback) => callback(byte),
            None => self.buffers.borrow_mut().tx.push(byte),
        }
    }
}

/// Serial line on the process's standard input and output.
///
/// A reader thread feeds stdin bytes through a channel so polling never blocks.
pub struct StdioSerial {
    rx: Receiver<u8>,
    closed: bool,
}

impl StdioSerial {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for byte in stdin.lock().bytes() {
                match byte {
                    Ok(b) => {
                        if tx.send(b).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        StdioSerial { rx, closed: false }
    }
}

impl Default for StdioSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialPort for StdioSerial {
    fn poll_byte(&mut self) -> Option<u8> {
        if self.closed {
            return None;
        }
        match self.rx.try_recv() {
            Ok(b) => Some(b),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::debug!("serial input closed");
                self.closed = true;
                None
            }
        }
    }

    fn send_byte(&mut self, byte: u8) {
        let mut out = std::io::stdout();
        if let Err(err) = out.write_all(&[byte]).and_then(|_| out.flush()) {
            log::warn!("serial write failed: {}", err);
        }
    }
}

// Status register bits
const SR_RDRF: u8 = 0x01;
const SR_TDRE: u8 = 0x02;
const SR_IRQ: u8 = 0x80;

// Control register bits
const CR_MASTER_RESET: u8 = 0x03;
const CR_RX_IRQ_ENABLE: u8 = 0x80;
const CR_TX_MASK: u8 = 0x60;
const CR_TX_IRQ_ENABLE: u8 = 0x20;

/// MC6850 Asynchronous Communications Interface Adapter.
///
/// ## Register Map (offsets from device base address)
///
/// | Offset | Read            | Write            |
/// |--------|-----------------|------------------|
/// | 0      | Status (SR)     | Control (CR)     |
/// | 1      | Receive data    | Transmit data    |
///
/// ## Status Register
///
/// | Bit | Name | Description |
/// |-----|------|-------------|
/// | 7   | IRQ  | Interrupt requested |
/// | 1   | TDRE | Transmit data register empty |
/// | 0   | RDRF | Receive data register full |
///
/// ## Timing
///
/// One character takes `round(10_000_000 / bps)` cycles (ten bit times at a
/// 1 MHz clock). Reading the receive register or writing the transmit register
/// restarts the character timer; only when it expires does the next byte get
/// received or the pending byte get sent.
///
/// # Example
///
/// ```rust
/// use lib6809::{BufferedSerial, Device, Mc6850};
///
/// let host = BufferedSerial::new();
/// let mut acia = Mc6850::new(9600, Box::new(host.clone()));
///
/// acia.write(1, b'A');                  // transmit
/// assert_eq!(acia.read(0) & 0x02, 0);   // TDRE clear while sending
/// ```
pub struct Mc6850 {
    cr: u8,
    sr: u8,
    rdr: u8,
    tdr: u8,
    char_cycles: u64,
    due: u64,
    now: u64,
    port: Box<dyn SerialPort>,
}

impl Mc6850 {
    pub const SIZE: u16 = 2;
    pub const DEFAULT_BPS: u32 = 9600;

    pub fn new(bps: u32, port: Box<dyn SerialPort>) -> Self {
        Mc6850 {
            cr: 0,
            sr: SR_TDRE,
            rdr: 0,
            tdr: 0,
            char_cycles: Self::character_cycles(bps),
            due: 0,
            now: 0,
            port,
        }
    }

    /// Cycles per character at `bps`, rounded to nearest.
    pub fn character_cycles(bps: u32) -> u64 {
        let bps = bps.max(1) as u64;
        (10_000_000 + bps / 2) / bps
    }

    pub fn control(&self) -> u8 {
        self.cr
    }

    /// Status register without read side effects.
    pub fn status_register(&self) -> u8 {
        self.sr
    }

    pub fn set_port(&mut self, port: Box<dyn SerialPort>) {
        self.port = port;
    }

    fn restart_timer(&mut self) {
        self.due = self.now + self.char_cycles;
    }
}

impl Device for Mc6850 {
    fn read(&mut self, offset: u16) -> u8 {
        if offset & 1 == 0 {
            self.sr
        } else {
            self.sr &= !(SR_RDRF | SR_IRQ);
            self.restart_timer();
            self.rdr
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        if offset & 1 == 0 {
            if value & CR_MASTER_RESET == CR_MASTER_RESET {
                self.sr = SR_TDRE;
            }
            self.cr = value;
        } else {
            self.tdr = value;
            self.sr &= !(SR_TDRE | SR_IRQ);
            self.restart_timer();
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, clock: u64, irq: &mut IrqPin<'_>) {
        self.now = clock;
        if clock < self.due {
            return;
        }

        if self.sr & SR_RDRF == 0 {
            if let Some(byte) = self.port.poll_byte() {
                self.rdr = byte;
                self.sr |= SR_RDRF;
                if self.cr & CR_RX_IRQ_ENABLE != 0 {
                    self.sr |= SR_IRQ;
                    irq.raise();
                }
            }
        }

        if self.sr & SR_TDRE == 0 {
            self.port.send_byte(self.tdr);
            self.sr |= SR_TDRE;
            if self.cr & CR_TX_MASK == CR_TX_IRQ_ENABLE {
                self.sr |= SR_IRQ;
                irq.raise();
            }
        }
    }

    fn reset(&mut self) {
        self.cr = 0;
        self.sr = SR_TDRE;
        self.due = self.now;
    }

    fn status(&self) -> String {
        format!(
            "CR:{:02X} SR:{:02X} RDR:{:02X} TDR:{:02X} char={} next={}",
            self.cr, self.sr, self.rdr, self.tdr, self.char_cycles, self.due
        )
    }
}
