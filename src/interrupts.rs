//! Interrupt lines and the request latch.
//!
//! The 6809 has three maskable-or-not interrupt inputs. Devices raise a line by
//! latching a request in the [`InterruptController`]; the CPU checks the latch
//! at the start of every step and, if a request is deliverable under the
//! current masks, services it instead of fetching an instruction.
//!
//! Requests are latched, not level sensitive: a request that is masked stays
//! pending until the mask is lifted, and accepting a request clears it.
//!
//! | Line | Vector | Masked by | State stacked |
//! |------|--------|-----------|---------------|
//! | NMI  | 0xFFFC | never     | entire        |
//! | FIRQ | 0xFFF6 | F         | PC and CC     |
//! | IRQ  | 0xFFF8 | I         | entire        |

use crate::registers::ConditionCodes;
use std::fmt;
use std::str::FromStr;

pub const SWI3_VECTOR: u16 = 0xFFF2;
pub const SWI2_VECTOR: u16 = 0xFFF4;
pub const FIRQ_VECTOR: u16 = 0xFFF6;
pub const IRQ_VECTOR: u16 = 0xFFF8;
pub const SWI_VECTOR: u16 = 0xFFFA;
pub const NMI_VECTOR: u16 = 0xFFFC;
pub const RESET_VECTOR: u16 = 0xFFFE;

/// One of the three external interrupt inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptLine {
    Irq,
    Firq,
    Nmi,
}

impl InterruptLine {
    pub fn vector(self) -> u16 {
        match self {
            InterruptLine::Irq => IRQ_VECTOR,
            InterruptLine::Firq => FIRQ_VECTOR,
            InterruptLine::Nmi => NMI_VECTOR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InterruptLine::Irq => "IRQ",
            InterruptLine::Firq => "FIRQ",
            InterruptLine::Nmi => "NMI",
        }
    }
}

impl fmt::Display for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterruptLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IRQ" => Ok(InterruptLine::Irq),
            "FIRQ" => Ok(InterruptLine::Firq),
            "NMI" => Ok(InterruptLine::Nmi),
            other => Err(format!("unknown interrupt line '{}'", other)),
        }
    }
}

/// Pending-request latch for the three interrupt lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptController {
    nmi: bool,
    firq: bool,
    irq: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches a request on `line`.
    pub fn request(&mut self, line: InterruptLine) {
        log::trace!("interrupt request on {}", line);
        match line {
            InterruptLine::Nmi => self.nmi = true,
            InterruptLine::Firq => self.firq = true,
            InterruptLine::Irq => self.irq = true,
        }
    }

    pub fn is_pending(&self, line: InterruptLine) -> bool {
        match line {
            InterruptLine::Nmi => self.nmi,
            InterruptLine::Firq => self.firq,
            InterruptLine::Irq => self.irq,
        }
    }

    pub fn any_pending(&self) -> bool {
        self.nmi || self.firq || self.irq
    }

    /// Clears the request on `line` (done when the request is accepted).
    pub fn clear(&mut self, line: InterruptLine) {
        match line {
            InterruptLine::Nmi => self.nmi = false,
            InterruptLine::Firq => self.firq = false,
            InterruptLine::Irq => self.irq = false,
        }
    }

    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    /// Highest priority request deliverable under the masks in `cc`.
    ///
    /// NMI beats FIRQ beats IRQ. Masked requests are not returned but stay latched.
    pub fn next(&self, cc: ConditionCodes) -> Option<InterruptLine> {
        if self.nmi {
            Some(InterruptLine::Nmi)
        } else if self.firq && !cc.f() {
            Some(InterruptLine::Firq)
        } else if self.irq && !cc.i() {
            Some(InterruptLine::Irq)
        } else {
            None
        }
    }
}

/// A device's view of its interrupt output during a tick.
///
/// Binds the line the device was configured with (if any) to the controller,
/// so device models only decide *when* to interrupt, never *which* line.
pub struct IrqPin<'a> {
    line: Option<InterruptLine>,
    controller: &'a mut InterruptController,
}

impl<'a> IrqPin<'a> {
    pub fn new(line: Option<InterruptLine>, controller: &'a mut InterruptController) -> Self {
        IrqPin { line, controller }
    }

    /// Requests an interrupt on the bound line. No-op for unwired devices.
    pub fn raise(&mut self) {
        if let Some(line) = self.line {
            self.controller.request(line);
        }
    }

    pub fn line(&self) -> Option<InterruptLine> {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut ic = InterruptController::new();
        ic.request(InterruptLine::Irq);
        ic.request(InterruptLine::Firq);
        ic.request(InterruptLine::Nmi);

        let cc = ConditionCodes::default();
        assert_eq!(ic.next(cc), Some(InterruptLine::Nmi));
        ic.clear(InterruptLine::Nmi);
        assert_eq!(ic.next(cc), Some(InterruptLine::Firq));
        ic.clear(InterruptLine::Firq);
        assert_eq!(ic.next(cc), Some(InterruptLine::Irq));
    }

    #[test]
    fn test_masked_request_stays_pending() {
        let mut ic = InterruptController::new();
        ic.request(InterruptLine::Irq);

        let masked = ConditionCodes::from_bits(ConditionCodes::IRQ_MASK);
        assert_eq!(ic.next(masked), None);
        assert!(ic.is_pending(InterruptLine::Irq));
        assert_eq!(ic.next(ConditionCodes::default()), Some(InterruptLine::Irq));
    }

    #[test]
    fn test_nmi_ignores_masks() {
        let mut ic = InterruptController::new();
        ic.request(InterruptLine::Nmi);
        let all_masked =
            ConditionCodes::from_bits(ConditionCodes::IRQ_MASK | ConditionCodes::FIRQ_MASK);
        assert_eq!(ic.next(all_masked), Some(InterruptLine::Nmi));
    }

    #[test]
    fn test_unwired_pin_is_silent() {
        let mut ic = InterruptController::new();
        IrqPin::new(None, &mut ic).raise();
        assert!(!ic.any_pending());
        IrqPin::new(Some(InterruptLine::Firq), &mut ic).raise();
        assert!(ic.is_pending(InterruptLine::Firq));
    }

    #[test]
    fn test_line_parsing() {
        assert_eq!("firq".parse::<InterruptLine>(), Ok(InterruptLine::Firq));
        assert!("XIRQ".parse::<InterruptLine>().is_err());
    }
}
