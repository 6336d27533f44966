//! # Machine and Execution Driver
//!
//! [`Machine`] is the whole emulated computer: a [`CPU`] over a [`SystemBus`]
//! (memory image, address map and devices), the cycle counter, the host
//! console used by host calls, and a stop token.
//!
//! Each [`Machine::step`] executes one CPU step, adds its cycles to the
//! counter and then ticks every device once with the new count. Host-call
//! traps are serviced in the same step; they take no cycles and do not tick
//! the devices, and neither does a step that ends in a bus fault.
//!
//! ## Stopping
//!
//! A [`StopHandle`] can be cloned to another thread (a Ctrl-C handler, a UI)
//! and triggers a stop that the run loops notice at the next instruction
//! boundary. A step in progress always completes.
//!
//! ## Bus Errors
//!
//! Decode errors always stop the run. Bus errors stop it under
//! [`BusErrorPolicy::Halt`] (the default); under [`BusErrorPolicy::Continue`]
//! they are logged and execution resumes, unless the failed access was the
//! opcode fetch itself, which would fail again forever. A host call that
//! faults has already unwound its trap frame and follows the same policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bus::{Region, SystemBus};
use crate::disassembler::disassemble;
use crate::host::{self, HostCall, HostIo, StdHost};
use crate::memory::BusError;
use crate::{ExecutionError, MemoryBus, Step, CPU};

/// What to do when a memory access fails during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusErrorPolicy {
    #[default]
    Halt,
    Continue,
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stop handle was triggered.
    Stopped,
    /// The program made the terminate host call.
    Terminated,
    /// PC reached the requested address.
    ReachedAddress(u16),
    /// The requested number of steps ran.
    StepLimit,
    /// The cycle budget was used up.
    CycleLimit,
}

/// Result of one [`Machine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// An instruction or interrupt entry took this many cycles.
    Executed(u32),
    /// A host call was serviced.
    HostCall(HostCall),
    /// A bus error was logged and skipped (continue policy).
    BusFault(ExecutionError),
}

/// Cooperative stop request shared between the machine and other threads.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop at the next instruction boundary.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consumes a pending request.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// A 6809 computer: CPU, system bus, cycle counter and host console.
///
/// # Examples
///
/// ```
/// use lib6809::{AddressMap, BufferedHost, Machine, RunOutcome, SystemBus};
///
/// let mut bus = SystemBus::new(AddressMap::default());
/// // LDA #1 ; LDX #$2000 ; SYS (A=1: print string at X) ; CLRA ; SYS (terminate)
/// bus.loading(|bus| {
///     for (i, byte) in [0x86, 0x01, 0x8E, 0x20, 0x00, 0x3E, 0x4F, 0x3E].iter().enumerate() {
///         bus.poke(0x1000 + i as u16, *byte);
///     }
///     for (i, byte) in b"Hi\0".iter().enumerate() {
///         bus.poke(0x2000 + i as u16, *byte);
///     }
/// });
///
/// let mut machine = Machine::new(bus).with_host(BufferedHost::new());
/// machine.cpu_mut().set_pc(0x1000);
/// machine.cpu_mut().set_s(0x8000);
/// assert_eq!(machine.run().unwrap(), RunOutcome::Terminated);
/// ```
pub struct Machine {
    cpu: CPU<SystemBus>,
    cycles: u64,
    host: Box<dyn HostIo>,
    policy: BusErrorPolicy,
    stop: StopHandle,
}

impl Machine {
    /// Builds a machine around a bus and resets the CPU from its reset vector.
    pub fn new(bus: SystemBus) -> Self {
        Machine {
            cpu: CPU::new(bus),
            cycles: 0,
            host: Box::new(StdHost::new()),
            policy: BusErrorPolicy::default(),
            stop: StopHandle::new(),
        }
    }

    /// Replaces the host console used by host calls.
    pub fn with_host(mut self, host: impl HostIo + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn set_host(&mut self, host: Box<dyn HostIo>) {
        self.host = host;
    }

    pub fn host_mut(&mut self) -> &mut dyn HostIo {
        self.host.as_mut()
    }

    pub fn with_bus_error_policy(mut self, policy: BusErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_bus_error_policy(&mut self, policy: BusErrorPolicy) {
        self.policy = policy;
    }

    pub fn bus_error_policy(&self) -> BusErrorPolicy {
        self.policy
    }

    pub fn cpu(&self) -> &CPU<SystemBus> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU<SystemBus> {
        &mut self.cpu
    }

    pub fn bus(&self) -> &SystemBus {
        self.cpu.memory()
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        self.cpu.memory_mut()
    }

    /// Cycles executed since start or the last [`reset_cycles`](Self::reset_cycles).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn reset_cycles(&mut self) {
        self.cycles = 0;
    }

    /// A handle that stops the run loops from anywhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Resets the CPU (PC from the reset vector) and every device.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.bus_mut().devices_mut().reset();
        self.cpu.reset()
    }

    /// One status line per device, in registration order.
    pub fn device_status(&self) -> Vec<String> {
        self.bus().devices().status_lines()
    }

    /// Executes one step and ticks the devices.
    pub fn step(&mut self) -> Result<StepEvent, ExecutionError> {
        let pc = self.cpu.pc();
        if log::log_enabled!(log::Level::Trace) {
            self.trace(pc);
        }

        let outcome = match self.cpu.step() {
            Ok(Step::Cycles(cycles)) => Ok(StepEvent::Executed(cycles)),
            Ok(Step::SystemCall) => {
                host::service(&mut self.cpu, self.host.as_mut()).map(StepEvent::HostCall)
            }
            Err(err) => Err(err),
        };

        let event = match outcome {
            Ok(event) => event,
            Err(err)
                if err.is_bus_error()
                    && self.policy == BusErrorPolicy::Continue
                    && self.cpu.pc() != pc =>
            {
                log::warn!("{} (PC 0x{:04X}), continuing", err, self.cpu.instruction_pc());
                StepEvent::BusFault(err)
            }
            Err(err) => return Err(err),
        };

        // Devices only run after an instruction or interrupt entry
        if let StepEvent::Executed(cycles) = event {
            self.cycles += cycles as u64;
            self.cpu.tick_devices(self.cycles);
        }
        Ok(event)
    }

    fn trace(&mut self, pc: u16) {
        // Disassembling reads memory; keep away from device registers
        if self.bus().map().classify(pc) == Region::Io {
            return;
        }
        let regs = self.cpu.registers();
        match disassemble(self.cpu.memory_mut(), pc) {
            Ok(instruction) => log::trace!("{:04X}  {:<20} {}", pc, instruction, regs),
            Err(err) => log::trace!("{:04X}  <{}>", pc, err),
        }
    }

    /// Runs until stopped, terminated, or an error.
    pub fn run(&mut self) -> Result<RunOutcome, ExecutionError> {
        self.run_loop(None, None, None)
    }

    /// Runs until PC equals `addr` at an instruction boundary.
    ///
    /// Returns immediately if PC is already `addr`.
    pub fn run_until(&mut self, addr: u16) -> Result<RunOutcome, ExecutionError> {
        self.run_loop(Some(addr), None, None)
    }

    /// Runs at most `steps` steps.
    pub fn run_steps(&mut self, steps: u64) -> Result<RunOutcome, ExecutionError> {
        self.run_loop(None, Some(steps), None)
    }

    /// Runs until at least `budget` more cycles have elapsed.
    pub fn run_cycles(&mut self, budget: u64) -> Result<RunOutcome, ExecutionError> {
        let target = self.cycles.saturating_add(budget);
        self.run_loop(None, None, Some(target))
    }

    fn run_loop(
        &mut self,
        until: Option<u16>,
        steps: Option<u64>,
        cycle_target: Option<u64>,
    ) -> Result<RunOutcome, ExecutionError> {
        let mut executed = 0u64;
        loop {
            if self.stop.take() {
                return Ok(RunOutcome::Stopped);
            }
            if until == Some(self.cpu.pc()) {
                return Ok(RunOutcome::ReachedAddress(self.cpu.pc()));
            }
            if steps.is_some_and(|limit| executed >= limit) {
                return Ok(RunOutcome::StepLimit);
            }
            if cycle_target.is_some_and(|target| self.cycles >= target) {
                return Ok(RunOutcome::CycleLimit);
            }

            let event = self.step()?;
            executed += 1;
            if event == StepEvent::HostCall(HostCall::Terminate) {
                return Ok(RunOutcome::Terminated);
            }
        }
    }
}
