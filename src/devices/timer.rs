//! MC6840 Programmable Timer Module.
//!
//! Three 16-bit down counters sharing a status register. Only the internal
//! (E clock) source is modelled, in continuous and single-shot modes.
//!
//! ## Register Map
//!
//! | Offset | Write                              | Read               |
//! |--------|------------------------------------|--------------------|
//! | 0      | CR1 if CR2 bit 0 set, else CR3     | -                  |
//! | 1      | CR2                                | Status             |
//! | 2      | MSB buffer                         | Timer 1 counter MSB |
//! | 3      | Timer 1 latch (MSB buffer + value) | LSB buffer         |
//! | 4, 5   | Timer 2, as above                  | Timer 2, as above  |
//! | 6, 7   | Timer 3, as above                  | Timer 3, as above  |
//!
//! Reading a counter MSB latches the LSB into the LSB buffer, so 16-bit
//! reads (LDX) see a consistent value.
//!
//! ## Control Register Bits
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 7   | Output enable |
//! | 6   | Interrupt enable |
//! | 5-3 | Mode (x00 continuous, x01 single shot; 1xx unsupported) |
//! | 4   | 0 = latch write reinitialises the counter |
//! | 1   | Internal clock |
//! | 0   | CR1: hold all timers in reset; CR2: register select; CR3: divide by 8 |

use super::Device;
use crate::interrupts::IrqPin;

const CR_OUTPUT_ENABLE: u8 = 0x80;
const CR_IRQ_ENABLE: u8 = 0x40;
const CR_COMPARE_MODE: u8 = 0x20;
const CR_NO_WRITE_INIT: u8 = 0x10;
const CR_SINGLE_SHOT: u8 = 0x08;
const CR_INTERNAL_CLOCK: u8 = 0x02;
const CR_BIT0: u8 = 0x01;

const SR_ANY: u8 = 0x80;

#[derive(Debug, Default, Clone, Copy)]
struct Counter {
    control: u8,
    latch: u16,
    value: u16,
    running: bool,
    output: bool,
}

/// Programmable timer with three counters.
#[derive(Debug, Default, Clone)]
pub struct Mc6840 {
    counters: [Counter; 3],
    status: u8,
    /// Status bits observed by a status read, cleared by the next counter read
    status_seen: u8,
    msb_buffer: u8,
    lsb_buffer: u8,
    last_clock: u64,
    prescale: u64,
    pending_irq: bool,
}

impl Mc6840 {
    pub const SIZE: u16 = 8;

    pub fn new() -> Self {
        let mut timer = Self::default();
        // Power-on: CR1 bit 0 set holds the counters in reset
        timer.counters[0].control = CR_BIT0;
        timer
    }

    fn in_reset(&self) -> bool {
        self.counters[0].control & CR_BIT0 != 0
    }

    /// Current counter value of timer `n` (0-based).
    pub fn counter(&self, n: usize) -> u16 {
        self.counters.get(n).map(|c| c.value).unwrap_or(0)
    }

    /// Output pin level of timer `n`.
    pub fn output(&self, n: usize) -> bool {
        self.counters
            .get(n)
            .map(|c| c.output && c.control & CR_OUTPUT_ENABLE != 0)
            .unwrap_or(false)
    }

    pub fn status_register(&self) -> u8 {
        self.status
    }

    fn initialize(&mut self, n: usize) {
        let counter = &mut self.counters[n];
        counter.value = counter.latch;
        counter.running = true;
        self.status &= !(1 << n);
        self.update_composite();
    }

    fn update_composite(&mut self) {
        let mut any = false;
        for (n, counter) in self.counters.iter().enumerate() {
            if self.status & (1 << n) != 0 && counter.control & CR_IRQ_ENABLE != 0 {
                any = true;
            }
        }
        if any {
            self.status |= SR_ANY;
        } else {
            self.status &= !SR_ANY;
        }
    }

    fn write_control(&mut self, n: usize, value: u8) {
        let was_reset = self.in_reset();
        self.counters[n].control = value;
        if n == 0 {
            if value & CR_BIT0 != 0 {
                for counter in &mut self.counters {
                    counter.value = counter.latch;
                    counter.running = false;
                }
                self.status = 0;
            } else if was_reset {
                for counter in &mut self.counters {
                    counter.running = true;
                }
            }
        }
        self.update_composite();
    }

    fn underflow(&mut self, n: usize) {
        let counter = &mut self.counters[n];
        counter.output = !counter.output;
        if counter.control & CR_SINGLE_SHOT != 0 {
            counter.running = false;
        }
        self.status |= 1 << n;
        if counter.control & CR_IRQ_ENABLE != 0 {
            self.pending_irq = true;
        }
    }

    /// Counts timer `n` down by `ticks` clock pulses.
    fn advance(&mut self, n: usize, ticks: u64) {
        let mut remaining = ticks;
        while remaining > 0 && self.counters[n].running {
            let value = self.counters[n].value as u64;
            if remaining <= value {
                self.counters[n].value = (value - remaining) as u16;
                return;
            }
            remaining -= value + 1;
            self.underflow(n);
            let period = self.counters[n].latch as u64 + 1;
            self.counters[n].value = self.counters[n].latch;
            // Skip whole periods in one step
            if self.counters[n].running && remaining >= period {
                remaining %= period;
            }
        }
    }
}

impl Device for Mc6840 {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 7 {
            0 => 0,
            1 => {
                self.status_seen = self.status & 0x07;
                self.status
            }
            reg if reg & 1 == 0 => {
                let n = (reg as usize / 2) - 1;
                let value = self.counters[n].value;
                self.lsb_buffer = value as u8;
                if self.status_seen & (1 << n) != 0 {
                    self.status &= !(1 << n);
                    self.status_seen &= !(1 << n);
                    self.update_composite();
                }
                (value >> 8) as u8
            }
            _ => self.lsb_buffer,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 7 {
            0 => {
                let n = if self.counters[1].control & CR_BIT0 != 0 { 0 } else { 2 };
                self.write_control(n, value);
            }
            1 => self.write_control(1, value),
            reg if reg & 1 == 0 => self.msb_buffer = value,
            reg => {
                let n = (reg as usize - 3) / 2;
                self.counters[n].latch = ((self.msb_buffer as u16) << 8) | value as u16;
                if self.counters[n].control & CR_NO_WRITE_INIT == 0 && !self.in_reset() {
                    self.initialize(n);
                }
            }
        }
    }

    fn size(&self) -> u16 {
        Self::SIZE
    }

    fn tick(&mut self, clock: u64, irq: &mut IrqPin<'_>) {
        let delta = clock.saturating_sub(self.last_clock);
        self.last_clock = clock;

        if !self.in_reset() {
            for n in 0..3 {
                let control = self.counters[n].control;
                if control & CR_INTERNAL_CLOCK == 0 || control & CR_COMPARE_MODE != 0 {
                    continue;
                }
                let ticks = if n == 2 && control & CR_BIT0 != 0 {
                    self.prescale += delta;
                    let ticks = self.prescale / 8;
                    self.prescale %= 8;
                    ticks
                } else {
                    delta
                };
                self.advance(n, ticks);
            }
        }

        self.update_composite();
        if std::mem::take(&mut self.pending_irq) {
            irq.raise();
        }
    }

    fn status(&self) -> String {
        let timers: Vec<String> = self
            .counters
            .iter()
            .enumerate()
            .map(|(n, c)| {
                format!(
                    "CR{}:{:02X} L{}:{:04X} C{}:{:04X}",
                    n + 1,
                    c.control,
                    n + 1,
                    c.latch,
                    n + 1,
                    c.value
                )
            })
            .collect();
        format!("SR:{:02X} {}", self.status, timers.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{InterruptController, InterruptLine};

    fn run(timer: &mut Mc6840, clock: u64, ic: &mut InterruptController) {
        timer.tick(clock, &mut IrqPin::new(Some(InterruptLine::Irq), ic));
    }

    fn program_timer1(timer: &mut Mc6840, latch: u16, control: u8) {
        timer.write(1, CR_BIT0); // select CR1 through offset 0
        timer.write(0, control);
        timer.write(2, (latch >> 8) as u8);
        timer.write(3, latch as u8);
    }

    #[test]
    fn test_counts_down_and_interrupts() {
        let mut timer = Mc6840::new();
        let mut ic = InterruptController::new();
        program_timer1(&mut timer, 100, CR_INTERNAL_CLOCK | CR_IRQ_ENABLE);
        assert_eq!(timer.counter(0), 100);

        run(&mut timer, 40, &mut ic);
        assert_eq!(timer.counter(0), 60);
        assert!(!ic.any_pending());

        // 61 more pulses: 60 to reach zero, one to underflow
        run(&mut timer, 101, &mut ic);
        assert!(ic.is_pending(InterruptLine::Irq));
        assert_eq!(timer.status_register() & 0x81, 0x81);
        assert_eq!(timer.counter(0), 100);
    }

    #[test]
    fn test_status_then_counter_read_clears_flag() {
        let mut timer = Mc6840::new();
        let mut ic = InterruptController::new();
        program_timer1(&mut timer, 10, CR_INTERNAL_CLOCK | CR_IRQ_ENABLE);
        run(&mut timer, 11, &mut ic);

        assert_eq!(timer.read(1) & 0x01, 0x01);
        timer.read(2);
        assert_eq!(timer.read(1), 0x00);
    }

    #[test]
    fn test_single_shot_stops() {
        let mut timer = Mc6840::new();
        let mut ic = InterruptController::new();
        program_timer1(&mut timer, 5, CR_INTERNAL_CLOCK | CR_SINGLE_SHOT);
        run(&mut timer, 6, &mut ic);
        assert_eq!(timer.status_register() & 0x01, 0x01);
        run(&mut timer, 100, &mut ic);
        assert_eq!(timer.counter(0), 5);
        // Interrupt not enabled
        assert!(!ic.any_pending());
    }

    #[test]
    fn test_counter_msb_read_latches_lsb() {
        let mut timer = Mc6840::new();
        let mut ic = InterruptController::new();
        program_timer1(&mut timer, 0x1234, CR_INTERNAL_CLOCK);
        run(&mut timer, 0x34, &mut ic);
        assert_eq!(timer.read(2), 0x12);
        run(&mut timer, 0x40, &mut ic);
        assert_eq!(timer.read(3), 0x00);
    }

    #[test]
    fn test_held_in_reset_at_power_on() {
        let mut timer = Mc6840::new();
        let mut ic = InterruptController::new();
        timer.write(1, CR_INTERNAL_CLOCK); // CR2: CR3 selected
        timer.write(4, 0x00);
        timer.write(5, 0x10);
        run(&mut timer, 1000, &mut ic);
        assert_eq!(timer.counter(1), 0x0000);
    }
}
