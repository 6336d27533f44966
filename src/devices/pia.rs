//! MC6820/MC6821 Peripheral Interface Adapter.
//!
//! Two 8-bit ports (A and B), each with a data direction register, an output
//! register and a control register, plus two control lines per port.
//!
//! ## Register Map
//!
//! | Offset | CRx bit 2 = 1        | CRx bit 2 = 0 |
//! |--------|----------------------|---------------|
//! | 0      | Port A data          | DDRA          |
//! | 1      | CRA                  | CRA           |
//! | 2      | Port B data          | DDRB          |
//! | 3      | CRB                  | CRB           |
//!
//! ## Control Register
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 7   | C1 active transition seen (read only) |
//! | 6   | C2 active transition seen (read only, C2 input mode) |
//! | 5-3 | C2 mode |
//! | 2   | 1 = data register, 0 = DDR |
//! | 1   | C1 active edge (1 = rising) |
//! | 0   | C1 interrupt enable |
//!
//! Reading a data register clears bits 7 and 6 of its control register.

use super::Device;
use crate::interrupts::IrqPin;

const CR_IRQ1: u8 = 0x80;
const CR_IRQ2: u8 = 0x40;
const CR_C2_OUTPUT: u8 = 0x20;
const CR_C2_MANUAL: u8 = 0x10;
const CR_C2_LEVEL: u8 = 0x08;
const CR_DATA_SELECT: u8 = 0x04;
const CR_C1_ENABLE: u8 = 0x01;
// C2 input mode: bit 3 enables the interrupt
const CR_C2_ENABLE: u8 = 0x08;

#[derive(Debug, Default, Clone)]
struct Port {
    output: u8,
    ddr: u8,
    input: u8,
    control: u8,
    /// C2 output level
    c2: bool,
    /// C2 pulse output pending restore on the next tick
    c2_pulse: bool,
    /// Interrupt flag raised by the host since the last tick
    edge: bool,
}

impl Port {
    fn data(&self) -> u8 {
        (self.output & self.ddr) | (self.input & !self.ddr)
    }

    fn write_control(&mut self, value: u8) {
        self.control = (self.control & (CR_IRQ1 | CR_IRQ2)) | (value & 0x3F);
        if value & CR_C2_OUTPUT != 0 && value & CR_C2_MANUAL != 0 {
            self.c2 = value & CR_C2_LEVEL != 0;
        }
    }

    /// Handshake/pulse output modes drive C2 low on a data access.
    fn strobe_output(&mut self) {
        if self.control & (CR_C2_OUTPUT | CR_C2_MANUAL) == CR_C2_OUTPUT {
            self.c2 = false;
            if self.control & CR_C2_LEVEL != 0 {
                self.c2_pulse = true;
            }
        }
    }

    fn strobe_c1(&mut self) {
        self.control |= CR_IRQ1;
        // Handshake mode: C1 restores C2
        if self.control & (CR_C2_OUTPUT | CR_C2_MANUAL | CR_C2_LEVEL) == CR_C2_OUTPUT {
            self.c2 = true;
        }
        if self.control & CR_C1_ENABLE != 0 {
            self.edge = true;
        }
    }

    fn strobe_c2(&mut self) {
        if self.control & CR_C2_OUTPUT != 0 {
            return;
        }
        self.control |= CR_IRQ2;
        if self.control & CR_C2_ENABLE != 0 {
            self.edge = true;
        }
    }

    fn tick(&mut self) -> bool {
        if self.c2_pulse {
            self.c2_pulse = false;
            self.c2 = true;
        }
        std::mem::take(&mut self.edge)
    }

    fn status(&self, name: char) -> String {
        format!(
            "CR{n}:{:02X} DDR{n}:{:02X} OR{n}:{:02X} IN{n}:{:02X} C{n}2:{}",
            self.control,
            self.ddr,
            self.output,
            self.input,
            self.c2 as u8,
            n = name
        )
    }
}

/// Peripheral Interface Adapter.
///
/// The host drives the input pins with [`set_input_a`](Mc6820::set_input_a)
/// and the control lines with the `strobe_*` methods; output pins are
/// observable through [`output_a`](Mc6820::output_a) and friends.
#[derive(Debug, Default, Clone)]
pub struct Mc6820 {
    a: Port,
    b: Port,
}

impl Mc6820 {
    pub const SIZE: u16 = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_a(&mut self, value: u8) {
        self.a.input = value;
    }

    pub fn set_input_b(&mut self, value: u8) {
        self.b.input = value;
    }

    /// Levels on the port A pins configured as outputs (inputs read as 1).
    pub fn output_a(&self) -> u8 {
        self.a.output | !self.a.ddr
    }

    pub fn output_b(&self) -> u8 {
        self.b.output | !self.b.ddr
    }

    pub fn ca2(&self) -> bool {
        self.a.c2
    }

    pub fn cb2(&self) -> bool {
        self.b.c2
    }

    pub fn strobe_ca1(&mut self) {
        self.a.strobe_c1();
    }

    pub fn strobe_cb1(&mut self) {
        self.b.strobe_c1();
    }

    pub fn strobe_ca2(&mut self) {
        self.a.strobe_c2();
    }

    pub fn strobe_cb2(&mut self) {
        self.b.strobe_c2();
    }

    fn port_mut(&mut self, offset: u16) -> &mut Port {
        if offset & 2 == 0 {
            &mut self.a
        } else {
            &mut self.b
        }
    }
}

impl Device for Mc6820 {
    fn read(&mut self, offset: u16) -> u8 {
        let is_a = offset & 2 == 0;
        let port = self.port_mut(offset);
        if offset & 1 == 1 {
            return port.control;
        }
        if port.control & CR_DATA_SELECT == 0 {
            return port.ddr;
        }
        port.control &= !(CR_IRQ1 | CR_IRQ2);
        // Port A strobes C2 on reads, port B on writes
        if is_a {
            port.strobe_output();
        }
        port.data()
    }

    fn write(&mut self, offset: u16, value: u8) {
        let is_a = offset & 2 == 0;
        let port = self.port_mut(offset);
        if offset & 1 == 1 {
            port.write_control(value);
        } else if port.control & CR_DATA_SELECT == 0 {
            port.ddr = value;
        } else {
            port.output = value;
            if !is_a {
                port.strobe_output();
            }
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, _clock: u64, irq: &mut IrqPin<'_>) {
        let a = self.a.tick();
        let b = self.b.tick();
        if a || b {
            irq.raise();
        }
    }

    fn status(&self) -> String {
        format!("{} {}", self.a.status('A'), self.b.status('B'))
    }
}
