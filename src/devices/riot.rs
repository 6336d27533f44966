//! R6532 RAM-I/O-Timer.
//!
//! 128 bytes of RAM, two 8-bit ports and an interval timer with a selectable
//! prescaler, in a 0xA0 byte window: offsets below 0x80 hit the RAM, the rest
//! the I/O registers.
//!
//! ## I/O Registers (offset bit 7 set)
//!
//! | A4 | A2 | A1 A0 | Read | Write |
//! |----|----|-------|------|-------|
//! | x  | 0  | 00    | Port A | Port A |
//! | x  | 0  | 01    | DDRA | DDRA |
//! | x  | 0  | 10    | Port B | Port B |
//! | x  | 0  | 11    | DDRB | DDRB |
//! | 1  | 1  | nn    | timer (A0 = 0) / flags (A0 = 1) | start timer, divide by 1/8/64/1024 |
//! | 0  | 1  | xx    | timer (A0 = 0) / flags (A0 = 1) | PA7 edge control |
//!
//! A3 set on a timer access enables the timer interrupt. Reading the timer
//! clears the timer flag; reading the flags clears the PA7 flag.

use super::Device;
use crate::interrupts::IrqPin;

const RAM_SIZE: usize = 128;

const FLAG_TIMER: u8 = 0x80;
const FLAG_PA7: u8 = 0x40;

const DIVIDERS: [u64; 4] = [1, 8, 64, 1024];

/// RAM-I/O-Timer.
#[derive(Debug, Clone)]
pub struct R6532 {
    ram: [u8; RAM_SIZE],
    ora: u8,
    orb: u8,
    ddra: u8,
    ddrb: u8,
    ina: u8,
    inb: u8,
    timer: u8,
    divider: u64,
    prescale: u64,
    expired: bool,
    timer_irq_enable: bool,
    pa7_irq_enable: bool,
    pa7_rising: bool,
    flags: u8,
    last_clock: u64,
    pending_irq: bool,
}

impl Default for R6532 {
    fn default() -> Self {
        R6532 {
            ram: [0; RAM_SIZE],
            ora: 0,
            orb: 0,
            ddra: 0,
            ddrb: 0,
            ina: 0,
            inb: 0,
            timer: 0,
            divider: 1,
            prescale: 0,
            // Free running until software starts an interval
            expired: true,
            timer_irq_enable: false,
            pa7_irq_enable: false,
            pa7_rising: false,
            flags: 0,
            last_clock: 0,
            pending_irq: false,
        }
    }
}

impl R6532 {
    pub const SIZE: u16 = 0xA0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer(&self) -> u8 {
        self.timer
    }

    pub fn output_a(&self) -> u8 {
        self.ora | !self.ddra
    }

    pub fn output_b(&self) -> u8 {
        self.orb | !self.ddrb
    }

    /// Drives the port A input pins, detecting the configured PA7 edge.
    pub fn set_input_a(&mut self, value: u8) {
        let old = self.ina & 0x80 != 0;
        let new = value & 0x80 != 0;
        self.ina = value;
        let edge = if self.pa7_rising {
            !old && new
        } else {
            old && !new
        };
        if edge {
            self.flags |= FLAG_PA7;
            if self.pa7_irq_enable {
                self.pending_irq = true;
            }
        }
    }

    pub fn set_input_b(&mut self, value: u8) {
        self.inb = value;
    }

    fn count(&mut self, cycles: u64) {
        self.prescale += cycles;
        if self.expired {
            // Post-expiry counting is a plain wrap at one per cycle
            self.timer = self.timer.wrapping_sub(self.prescale as u8);
            self.prescale = 0;
            return;
        }
        while self.prescale >= self.divider {
            self.prescale -= self.divider;
            if self.timer == 0 {
                // After expiry the timer keeps counting at one per cycle
                self.timer = 0xFF;
                if !self.expired {
                    self.expired = true;
                    self.divider = 1;
                    self.flags |= FLAG_TIMER;
                    if self.timer_irq_enable {
                        self.pending_irq = true;
                    }
                }
            } else {
                self.timer -= 1;
            }
        }
    }

    fn read_io(&mut self, offset: u16) -> u8 {
        if offset & 0x04 == 0 {
            return match offset & 0x03 {
                0 => (self.ora & self.ddra) | (self.ina & !self.ddra),
                1 => self.ddra,
                2 => (self.orb & self.ddrb) | (self.inb & !self.ddrb),
                _ => self.ddrb,
            };
        }
        if offset & 0x01 == 0 {
            self.timer_irq_enable = offset & 0x08 != 0;
            self.flags &= !FLAG_TIMER;
            self.timer
        } else {
            let flags = self.flags;
            self.flags &= !FLAG_PA7;
            flags
        }
    }

    fn write_io(&mut self, offset: u16, value: u8) {
        if offset & 0x04 == 0 {
            match offset & 0x03 {
                0 => self.ora = value,
                1 => self.ddra = value,
                2 => self.orb = value,
                _ => self.ddrb = value,
            }
        } else if offset & 0x10 != 0 {
            self.timer = value;
            self.divider = DIVIDERS[(offset & 0x03) as usize];
            self.prescale = 0;
            self.expired = false;
            self.timer_irq_enable = offset & 0x08 != 0;
            self.flags &= !FLAG_TIMER;
        } else {
            self.pa7_rising = offset & 0x01 != 0;
            self.pa7_irq_enable = offset & 0x02 != 0;
        }
    }
}

impl Device for R6532 {
    fn read(&mut self, offset: u16) -> u8 {
        if offset & 0x80 == 0 {
            self.ram[offset as usize & (RAM_SIZE - 1)]
        } else {
            self.read_io(offset)
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        if offset & 0x80 == 0 {
            self.ram[offset as usize & (RAM_SIZE - 1)] = value;
        } else {
            self.write_io(offset, value);
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, clock: u64, irq: &mut IrqPin<'_>) {
        let delta = clock.saturating_sub(self.last_clock);
        self.last_clock = clock;
        self.count(delta);
        if std::mem::take(&mut self.pending_irq) {
            irq.raise();
        }
    }

    fn status(&self) -> String {
        format!(
            "ORA:{:02X} DDRA:{:02X} ORB:{:02X} DDRB:{:02X} TIMER:{:02X}/{} FLAGS:{:02X}",
            self.ora, self.ddra, self.orb, self.ddrb, self.timer, self.divider, self.flags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{InterruptController, InterruptLine};

    fn run(riot: &mut R6532, clock: u64, ic: &mut InterruptController) {
        riot.tick(clock, &mut IrqPin::new(Some(InterruptLine::Firq), ic));
    }

    #[test]
    fn test_ram_window() {
        let mut riot = R6532::new();
        riot.write(0x00, 0x11);
        riot.write(0x7F, 0x22);
        assert_eq!(riot.read(0x00), 0x11);
        assert_eq!(riot.read(0x7F), 0x22);
    }

    #[test]
    fn test_timer_divide_by_8_with_interrupt() {
        let mut riot = R6532::new();
        let mut ic = InterruptController::new();

        // Offset 0x9D: timer write, A3 (interrupt enable), divide by 8
        riot.write(0x9D, 2);
        run(&mut riot, 8, &mut ic);
        assert_eq!(riot.timer(), 1);
        run(&mut riot, 24, &mut ic);
        assert!(ic.is_pending(InterruptLine::Firq));
        assert_eq!(riot.read(0x85) & FLAG_TIMER, FLAG_TIMER);

        // After expiry the timer counts every cycle
        let before = riot.timer();
        run(&mut riot, 28, &mut ic);
        assert_eq!(riot.timer(), before.wrapping_sub(4));
    }

    #[test]
    fn test_pa7_edge() {
        let mut riot = R6532::new();
        let mut ic = InterruptController::new();
        // Edge control: rising edge, interrupt enabled
        riot.write(0x87, 0);
        riot.set_input_a(0x80);
        run(&mut riot, 1, &mut ic);
        assert!(ic.is_pending(InterruptLine::Firq));
        assert_eq!(riot.read(0x85) & FLAG_PA7, FLAG_PA7);
        assert_eq!(riot.read(0x85) & FLAG_PA7, 0);
    }

    #[test]
    fn test_ports() {
        let mut riot = R6532::new();
        riot.write(0x81, 0x0F);
        riot.write(0x80, 0xFF);
        riot.set_input_a(0x30);
        assert_eq!(riot.read(0x80), 0x3F);
    }
}
