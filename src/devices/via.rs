//! R6522 Versatile Interface Adapter.
//!
//! Two 8-bit ports, two 16-bit timers, a shift register and an interrupt
//! flag/enable pair. The shift register is stored but does not shift.
//!
//! ## Register Map
//!
//! | Offset | Name     | Notes |
//! |--------|----------|-------|
//! | 0      | ORB/IRB  | access clears CB1/CB2 flags |
//! | 1      | ORA/IRA  | access clears CA1/CA2 flags |
//! | 2      | DDRB     | |
//! | 3      | DDRA     | |
//! | 4      | T1C-L    | read clears T1 flag; write sets latch low |
//! | 5      | T1C-H    | write loads and starts T1 |
//! | 6      | T1L-L    | |
//! | 7      | T1L-H    | write clears T1 flag |
//! | 8      | T2C-L    | read clears T2 flag; write sets latch low |
//! | 9      | T2C-H    | write loads and starts T2 |
//! | A      | SR       | |
//! | B      | ACR      | bit 6: T1 free-run; bit 5: T2 pulse counting |
//! | C      | PCR      | |
//! | D      | IFR      | write 1 bits to clear; bit 7 = any enabled flag |
//! | E      | IER      | bit 7 of write selects set/clear |
//! | F      | ORA/IRA  | without handshake |

use super::Device;
use crate::interrupts::IrqPin;

pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;
const IFR_ANY: u8 = 0x80;

const ACR_T1_FREE_RUN: u8 = 0x40;
const ACR_T2_PULSE_COUNT: u8 = 0x20;

/// Versatile Interface Adapter.
#[derive(Debug, Default, Clone)]
pub struct R6522 {
    ora: u8,
    orb: u8,
    ddra: u8,
    ddrb: u8,
    ira: u8,
    irb: u8,
    t1_counter: u16,
    t1_latch: u16,
    t1_armed: bool,
    t2_counter: u16,
    t2_latch_low: u8,
    t2_armed: bool,
    sr: u8,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,
    last_clock: u64,
    /// Enabled flags raised since the last tick
    pending_irq: bool,
}

impl R6522 {
    pub const SIZE: u16 = 16;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_a(&mut self, value: u8) {
        self.ira = value;
    }

    pub fn set_input_b(&mut self, value: u8) {
        self.irb = value;
    }

    pub fn output_a(&self) -> u8 {
        self.ora | !self.ddra
    }

    pub fn output_b(&self) -> u8 {
        self.orb | !self.ddrb
    }

    pub fn strobe_ca1(&mut self) {
        self.set_flag(IFR_CA1);
    }

    pub fn strobe_cb1(&mut self) {
        self.set_flag(IFR_CB1);
    }

    pub fn interrupt_flags(&self) -> u8 {
        self.ifr_value()
    }

    pub fn timer1(&self) -> u16 {
        self.t1_counter
    }

    pub fn timer2(&self) -> u16 {
        self.t2_counter
    }

    fn ifr_value(&self) -> u8 {
        if self.ifr & self.ier & 0x7F != 0 {
            self.ifr | IFR_ANY
        } else {
            self.ifr
        }
    }

    fn set_flag(&mut self, flag: u8) {
        self.ifr |= flag;
        if self.ier & flag != 0 {
            self.pending_irq = true;
        }
    }

    fn clear_flags(&mut self, flags: u8) {
        self.ifr &= !flags;
    }

    fn run_timer1(&mut self, delta: u64) {
        let counter = self.t1_counter as u64;
        if delta <= counter {
            self.t1_counter = (counter - delta) as u16;
            return;
        }
        let past = delta - counter - 1;
        if self.acr & ACR_T1_FREE_RUN != 0 {
            let period = self.t1_latch as u64 + 2;
            self.t1_counter = (self.t1_latch as u64 - (past % period).min(self.t1_latch as u64)) as u16;
            self.set_flag(IFR_T1);
        } else {
            self.t1_counter = 0xFFFF_u16.wrapping_sub(past as u16);
            if self.t1_armed {
                self.t1_armed = false;
                self.set_flag(IFR_T1);
            }
        }
    }

    fn run_timer2(&mut self, delta: u64) {
        if self.acr & ACR_T2_PULSE_COUNT != 0 {
            return;
        }
        let counter = self.t2_counter as u64;
        if delta <= counter {
            self.t2_counter = (counter - delta) as u16;
            return;
        }
        let past = delta - counter - 1;
        self.t2_counter = 0xFFFF_u16.wrapping_sub(past as u16);
        if self.t2_armed {
            self.t2_armed = false;
            self.set_flag(IFR_T2);
        }
    }
}

impl Device for R6522 {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x0F {
            0x0 => {
                self.clear_flags(IFR_CB1 | IFR_CB2);
                (self.orb & self.ddrb) | (self.irb & !self.ddrb)
            }
            0x1 => {
                self.clear_flags(IFR_CA1 | IFR_CA2);
                (self.ora & self.ddra) | (self.ira & !self.ddra)
            }
            0x2 => self.ddrb,
            0x3 => self.ddra,
            0x4 => {
                self.clear_flags(IFR_T1);
                self.t1_counter as u8
            }
            0x5 => (self.t1_counter >> 8) as u8,
            0x6 => self.t1_latch as u8,
            0x7 => (self.t1_latch >> 8) as u8,
            0x8 => {
                self.clear_flags(IFR_T2);
                self.t2_counter as u8
            }
            0x9 => (self.t2_counter >> 8) as u8,
            0xA => {
                self.clear_flags(IFR_SR);
                self.sr
            }
            0xB => self.acr,
            0xC => self.pcr,
            0xD => self.ifr_value(),
            0xE => self.ier | 0x80,
            _ => (self.ora & self.ddra) | (self.ira & !self.ddra),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x0F {
            0x0 => {
                self.clear_flags(IFR_CB1 | IFR_CB2);
                self.orb = value;
            }
            0x1 => {
                self.clear_flags(IFR_CA1 | IFR_CA2);
                self.ora = value;
            }
            0x2 => self.ddrb = value,
            0x3 => self.ddra = value,
            0x4 | 0x6 => self.t1_latch = (self.t1_latch & 0xFF00) | value as u16,
            0x5 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | ((value as u16) << 8);
                self.t1_counter = self.t1_latch;
                self.t1_armed = true;
                self.clear_flags(IFR_T1);
            }
            0x7 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | ((value as u16) << 8);
                self.clear_flags(IFR_T1);
            }
            0x8 => self.t2_latch_low = value,
            0x9 => {
                self.t2_counter = ((value as u16) << 8) | self.t2_latch_low as u16;
                self.t2_armed = true;
                self.clear_flags(IFR_T2);
            }
            0xA => {
                self.clear_flags(IFR_SR);
                self.sr = value;
            }
            0xB => self.acr = value,
            0xC => self.pcr = value,
            0xD => self.clear_flags(value & 0x7F),
            0xE => {
                if value & 0x80 != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !(value & 0x7F);
                }
            }
            _ => self.ora = value,
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, clock: u64, irq: &mut IrqPin<'_>) {
        let delta = clock.saturating_sub(self.last_clock);
        self.last_clock = clock;
        if delta > 0 {
            self.run_timer1(delta);
            self.run_timer2(delta);
        }
        if std::mem::take(&mut self.pending_irq) {
            irq.raise();
        }
    }

    fn status(&self) -> String {
        format!(
            "ORA:{:02X} DDRA:{:02X} ORB:{:02X} DDRB:{:02X} T1:{:04X}/{:04X} T2:{:04X} ACR:{:02X} PCR:{:02X} IFR:{:02X} IER:{:02X}",
            self.ora,
            self.ddra,
            self.orb,
            self.ddrb,
            self.t1_counter,
            self.t1_latch,
            self.t2_counter,
            self.acr,
            self.pcr,
            self.ifr_value(),
            self.ier
        )
    }
}
