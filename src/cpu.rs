//! # CPU State and Execution
//!
//! This module contains the CPU struct representing the 6809 processor state and
//! the fetch-decode-execute step.
//!
//! ## CPU State
//!
//! The CPU maintains:
//! - **Accumulators**: A and B (8-bit), addressable together as D (16-bit)
//! - **Index registers**: X and Y
//! - **Stack pointers**: U (user) and S (system, used by interrupts and calls)
//! - **Program counter** (PC) and **direct page** register (DP)
//! - **Condition codes**: E F H I N Z V C
//! - **Interrupt latch**: pending NMI/FIRQ/IRQ requests
//! - **Wait state**: running, or idling in CWAI or SYNC
//!
//! ## Execution Model
//!
//! `step()` first checks the interrupt latch: a deliverable request is
//! serviced instead of an instruction and reported as one step. Otherwise the
//! opcode is fetched (following a 0x10 or 0x11 prefix to the second or third
//! opcode page), looked up in the metadata tables and dispatched. The returned
//! cycle count is the base cost plus the addressing-mode surcharge plus one
//! cycle for a page prefix.
//!
//! The CPU does not keep a cycle counter; the [`Machine`](crate::Machine)
//! driver accumulates the cycles reported by each step.

use crate::addressing::{AddressingMode, IndexRegister, IndexedKind, IndexedMode};
use crate::instructions;
use crate::interrupts::{InterruptController, InterruptLine, RESET_VECTOR};
use crate::opcodes::{self, PAGE2_PREFIX, PAGE3_PREFIX};
use crate::registers::{ConditionCodes, Registers};
use crate::{BusError, ExecutionError, MemoryBus, Step};

/// Opcode that hands control to the host (see [`Step::SystemCall`]).
pub const HOST_CALL_OPCODE: u8 = 0x3E;

// Interrupt entry costs, including stacking and the vector fetch
const FULL_ENTRY_CYCLES: u32 = 19;
const FIRQ_ENTRY_CYCLES: u32 = 10;
// Leaving CWAI: the state is already stacked
const WAIT_ENTRY_CYCLES: u32 = 1;
const IDLE_CYCLES: u32 = 1;

/// Whether the processor is executing or waiting for an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Running,
    /// CWAI: state stacked, waiting for an interrupt to vector through.
    Cwai,
    /// SYNC: waiting for any interrupt request, masked or not.
    Sync,
}

/// Accumulator selector for the 8-bit instruction forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acc {
    A,
    B,
}

/// 16-bit register selector for loads, stores and compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reg16 {
    D,
    X,
    Y,
    U,
    S,
}

/// Stack selector for pushes and pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stack {
    S,
    U,
}

/// 6809 CPU state and execution engine.
///
/// The CPU is generic over the memory implementation via the `MemoryBus` trait,
/// and owns its memory and its interrupt latch.
///
/// # Examples
///
/// ```
/// use lib6809::{FlatMemory, MemoryBus, Step, CPU};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0xFFFE, &[0x10, 0x00]);
/// memory.load(0x1000, &[0x8E, 0x12, 0x34]); // LDX #$1234
///
/// let mut cpu = CPU::new(memory);
/// assert_eq!(cpu.step().unwrap(), Step::Cycles(3));
/// assert_eq!(cpu.x(), 0x1234);
/// ```
pub struct CPU<M: MemoryBus> {
    pub(crate) a: u8,
    pub(crate) b: u8,
    pub(crate) dp: u8,
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) u: u16,
    pub(crate) s: u16,
    pub(crate) pc: u16,
    pub(crate) cc: ConditionCodes,

    pub(crate) interrupts: InterruptController,
    pub(crate) wait: WaitState,

    /// Address of the instruction being executed, for error reports.
    pub(crate) instruction_pc: u16,
    /// Current opcode with its page prefix in the high byte.
    pub(crate) current_opcode: u16,

    pub(crate) memory: M,
}

impl<M: MemoryBus> CPU<M> {
    /// Creates a new CPU and performs a reset.
    ///
    /// PC is loaded from the reset vector at 0xFFFE. If the vector cannot be
    /// read, PC stays 0 and the failure is logged.
    pub fn new(memory: M) -> Self {
        let mut cpu = CPU {
            a: 0,
            b: 0,
            dp: 0,
            x: 0,
            y: 0,
            u: 0,
            s: 0,
            pc: 0,
            cc: ConditionCodes::default(),
            interrupts: InterruptController::new(),
            wait: WaitState::Running,
            instruction_pc: 0,
            current_opcode: 0,
            memory,
        };
        if let Err(err) = cpu.reset() {
            log::warn!("reset vector unreadable: {}", err);
        }
        cpu
    }

    /// Hardware reset: DP cleared, interrupts masked, latch cleared, PC from
    /// the reset vector. Other registers are left as they are.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.dp = 0;
        self.cc = ConditionCodes::from_bits(ConditionCodes::IRQ_MASK | ConditionCodes::FIRQ_MASK);
        self.wait = WaitState::Running;
        self.interrupts.clear_all();
        self.pc = self.memory.read_word(RESET_VECTOR)?;
        Ok(())
    }

    /// Executes one step: an interrupt entry, an idle cycle while waiting, or
    /// one instruction.
    ///
    /// # Returns
    ///
    /// * `Ok(Step::Cycles(n))` - cycles consumed
    /// * `Ok(Step::SystemCall)` - the host-call trap ran; the host must service
    ///   the call and then call [`return_from_interrupt`](Self::return_from_interrupt)
    /// * `Err(ExecutionError)` - decode or bus fault
    pub fn step(&mut self) -> Result<Step, ExecutionError> {
        if let Some(line) = self.interrupts.next(self.cc) {
            return Ok(Step::Cycles(self.enter_interrupt(line)?));
        }

        match self.wait {
            WaitState::Running => {}
            WaitState::Cwai => return Ok(Step::Cycles(IDLE_CYCLES)),
            WaitState::Sync => {
                // A masked request ends SYNC without being serviced
                if !self.interrupts.any_pending() {
                    return Ok(Step::Cycles(IDLE_CYCLES));
                }
                self.wait = WaitState::Running;
            }
        }

        self.instruction_pc = self.pc;
        let mut page = 0;
        let mut opcode = self.fetch_byte()?;
        if opcode == PAGE2_PREFIX || opcode == PAGE3_PREFIX {
            page = opcode;
            opcode = self.fetch_byte()?;
        }
        self.current_opcode = ((page as u16) << 8) | opcode as u16;

        let metadata = opcodes::lookup(page, opcode);
        if !metadata.implemented {
            return Err(if metadata.is_defined() {
                self.invalid_address_mode()
            } else {
                self.invalid_opcode()
            });
        }

        if page == 0 && opcode == HOST_CALL_OPCODE {
            self.push_entire_state()?;
            return Ok(Step::SystemCall);
        }

        let extra = instructions::execute(self, page, opcode, metadata)?;
        let prefix = u32::from(page != 0);
        Ok(Step::Cycles(metadata.base_cycles as u32 + extra as u32 + prefix))
    }

    /// Restores state stacked by an interrupt, SWI or host-call trap (RTI).
    ///
    /// Pulls CC; if its E bit is set also A, B, DP, X, Y and U; then PC.
    /// Returns the cycles an RTI instruction takes for that frame (6 or 15).
    pub fn return_from_interrupt(&mut self) -> Result<u32, ExecutionError> {
        let entire = self.pull_interrupt_frame()?;
        Ok(if entire { 15 } else { 6 })
    }

    /// Latches an interrupt request, as a device would.
    pub fn request_interrupt(&mut self, line: InterruptLine) {
        self.interrupts.request(line);
    }

    /// Runs the memory's per-instruction device hook with the given cycle count.
    pub fn tick_devices(&mut self, clock: u64) {
        self.memory.tick(clock, &mut self.interrupts);
    }

    // ========== Interrupts and stacking ==========

    fn enter_interrupt(&mut self, line: InterruptLine) -> Result<u32, ExecutionError> {
        self.interrupts.clear(line);
        let from_wait = self.wait == WaitState::Cwai;
        self.wait = WaitState::Running;

        let cycles = if from_wait {
            WAIT_ENTRY_CYCLES
        } else if line == InterruptLine::Firq {
            self.cc.set(ConditionCodes::ENTIRE, false);
            self.push16(Stack::S, self.pc)?;
            self.push8(Stack::S, self.cc.bits())?;
            FIRQ_ENTRY_CYCLES
        } else {
            self.push_entire_state()?;
            FULL_ENTRY_CYCLES
        };

        self.cc.set(ConditionCodes::IRQ_MASK, true);
        if line != InterruptLine::Irq {
            self.cc.set(ConditionCodes::FIRQ_MASK, true);
        }
        self.pc = self.memory.read_word(line.vector())?;
        log::debug!("{} accepted, vectoring to 0x{:04X}", line, self.pc);
        Ok(cycles)
    }

    /// Sets E and pushes PC, U, Y, X, DP, B, A, CC onto S.
    pub(crate) fn push_entire_state(&mut self) -> Result<(), ExecutionError> {
        self.cc.set(ConditionCodes::ENTIRE, true);
        self.push16(Stack::S, self.pc)?;
        self.push16(Stack::S, self.u)?;
        self.push16(Stack::S, self.y)?;
        self.push16(Stack::S, self.x)?;
        self.push8(Stack::S, self.dp)?;
        self.push8(Stack::S, self.b)?;
        self.push8(Stack::S, self.a)?;
        self.push8(Stack::S, self.cc.bits())?;
        Ok(())
    }

    /// Pulls an interrupt frame from S; returns whether it was an entire frame.
    pub(crate) fn pull_interrupt_frame(&mut self) -> Result<bool, ExecutionError> {
        self.cc = ConditionCodes::from_bits(self.pull8(Stack::S)?);
        let entire = self.cc.e();
        if entire {
            self.a = self.pull8(Stack::S)?;
            self.b = self.pull8(Stack::S)?;
            self.dp = self.pull8(Stack::S)?;
            self.x = self.pull16(Stack::S)?;
            self.y = self.pull16(Stack::S)?;
            self.u = self.pull16(Stack::S)?;
        }
        self.pc = self.pull16(Stack::S)?;
        Ok(entire)
    }

    fn stack_pointer(&mut self, stack: Stack) -> &mut u16 {
        match stack {
            Stack::S => &mut self.s,
            Stack::U => &mut self.u,
        }
    }

    pub(crate) fn push8(&mut self, stack: Stack, value: u8) -> Result<(), ExecutionError> {
        let sp = self.stack_pointer(stack);
        *sp = sp.wrapping_sub(1);
        let addr = *sp;
        self.memory.write(addr, value)?;
        Ok(())
    }

    /// Pushes low byte first, leaving the word big-endian in memory.
    pub(crate) fn push16(&mut self, stack: Stack, value: u16) -> Result<(), ExecutionError> {
        self.push8(stack, value as u8)?;
        self.push8(stack, (value >> 8) as u8)
    }

    pub(crate) fn pull8(&mut self, stack: Stack) -> Result<u8, ExecutionError> {
        let sp = self.stack_pointer(stack);
        let addr = *sp;
        *sp = sp.wrapping_add(1);
        Ok(self.memory.read(addr)?)
    }

    pub(crate) fn pull16(&mut self, stack: Stack) -> Result<u16, ExecutionError> {
        let high = self.pull8(stack)? as u16;
        let low = self.pull8(stack)? as u16;
        Ok((high << 8) | low)
    }

    // ========== Operand fetch and addressing ==========

    pub(crate) fn fetch_byte(&mut self) -> Result<u8, ExecutionError> {
        let value = self.memory.read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(value)
    }

    pub(crate) fn fetch_word(&mut self) -> Result<u16, ExecutionError> {
        let high = self.fetch_byte()? as u16;
        let low = self.fetch_byte()? as u16;
        Ok((high << 8) | low)
    }

    pub(crate) fn invalid_opcode(&self) -> ExecutionError {
        ExecutionError::InvalidOpcode {
            opcode: self.current_opcode,
            pc: self.instruction_pc,
        }
    }

    pub(crate) fn invalid_address_mode(&self) -> ExecutionError {
        ExecutionError::InvalidAddressMode {
            opcode: self.current_opcode,
            pc: self.instruction_pc,
        }
    }

    fn index_register(&self, register: IndexRegister) -> u16 {
        match register {
            IndexRegister::X => self.x,
            IndexRegister::Y => self.y,
            IndexRegister::U => self.u,
            IndexRegister::S => self.s,
        }
    }

    fn set_index_register(&mut self, register: IndexRegister, value: u16) {
        match register {
            IndexRegister::X => self.x = value,
            IndexRegister::Y => self.y = value,
            IndexRegister::U => self.u = value,
            IndexRegister::S => self.s = value,
        }
    }

    /// Decodes an indexed postbyte (and its offset bytes) at PC.
    ///
    /// Returns the effective address and the postbyte's cycle surcharge.
    /// Auto increment/decrement forms update the index register.
    pub(crate) fn indexed_address(&mut self) -> Result<(u16, u8), ExecutionError> {
        let postbyte = self.fetch_byte()?;
        let mode = IndexedMode::decode(postbyte).ok_or(ExecutionError::InvalidPostbyte {
            postbyte,
            pc: self.instruction_pc,
        })?;

        let register = mode.register;
        let base = self.index_register(register);
        let addr = match mode.kind {
            IndexedKind::Offset5(offset) => base.wrapping_add(offset as i16 as u16),
            IndexedKind::PostIncrement1 => {
                self.set_index_register(register, base.wrapping_add(1));
                base
            }
            IndexedKind::PostIncrement2 => {
                self.set_index_register(register, base.wrapping_add(2));
                base
            }
            IndexedKind::PreDecrement1 => {
                let addr = base.wrapping_sub(1);
                self.set_index_register(register, addr);
                addr
            }
            IndexedKind::PreDecrement2 => {
                let addr = base.wrapping_sub(2);
                self.set_index_register(register, addr);
                addr
            }
            IndexedKind::NoOffset => base,
            IndexedKind::AccumulatorB => base.wrapping_add(self.b as i8 as i16 as u16),
            IndexedKind::AccumulatorA => base.wrapping_add(self.a as i8 as i16 as u16),
            IndexedKind::AccumulatorD => base.wrapping_add(self.d()),
            IndexedKind::Offset8 => {
                let offset = self.fetch_byte()? as i8;
                base.wrapping_add(offset as i16 as u16)
            }
            IndexedKind::Offset16 => {
                let offset = self.fetch_word()?;
                base.wrapping_add(offset)
            }
            // PC-relative offsets count from the end of the instruction
            IndexedKind::PcOffset8 => {
                let offset = self.fetch_byte()? as i8;
                self.pc.wrapping_add(offset as i16 as u16)
            }
            IndexedKind::PcOffset16 => {
                let offset = self.fetch_word()?;
                self.pc.wrapping_add(offset)
            }
            IndexedKind::ExtendedIndirect => self.fetch_word()?,
        };

        let addr = if mode.indirect {
            self.memory.read_word(addr)?
        } else {
            addr
        };
        Ok((addr, mode.extra_cycles()))
    }

    /// Effective address for a memory addressing mode, with its surcharge.
    pub(crate) fn effective_address(
        &mut self,
        mode: AddressingMode,
    ) -> Result<(u16, u8), ExecutionError> {
        match mode {
            AddressingMode::Direct => {
                let low = self.fetch_byte()?;
                Ok((((self.dp as u16) << 8) | low as u16, 0))
            }
            AddressingMode::Extended => Ok((self.fetch_word()?, 0)),
            AddressingMode::Indexed => self.indexed_address(),
            _ => Err(self.invalid_address_mode()),
        }
    }

    /// 8-bit operand: immediate byte or memory byte at the effective address.
    pub(crate) fn read_operand8(&mut self, mode: AddressingMode) -> Result<(u8, u8), ExecutionError> {
        if mode == AddressingMode::Immediate {
            return Ok((self.fetch_byte()?, 0));
        }
        let (addr, extra) = self.effective_address(mode)?;
        Ok((self.memory.read(addr)?, extra))
    }

    /// 16-bit operand: immediate word or memory word at the effective address.
    pub(crate) fn read_operand16(
        &mut self,
        mode: AddressingMode,
    ) -> Result<(u16, u8), ExecutionError> {
        if mode == AddressingMode::Immediate {
            return Ok((self.fetch_word()?, 0));
        }
        let (addr, extra) = self.effective_address(mode)?;
        Ok((self.memory.read_word(addr)?, extra))
    }

    pub(crate) fn acc(&self, acc: Acc) -> u8 {
        match acc {
            Acc::A => self.a,
            Acc::B => self.b,
        }
    }

    pub(crate) fn set_acc(&mut self, acc: Acc, value: u8) {
        match acc {
            Acc::A => self.a = value,
            Acc::B => self.b = value,
        }
    }

    pub(crate) fn reg16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::D => self.d(),
            Reg16::X => self.x,
            Reg16::Y => self.y,
            Reg16::U => self.u,
            Reg16::S => self.s,
        }
    }

    pub(crate) fn set_reg16(&mut self, reg: Reg16, value: u16) {
        match reg {
            Reg16::D => self.set_d(value),
            Reg16::X => self.x = value,
            Reg16::Y => self.y = value,
            Reg16::U => self.u = value,
            Reg16::S => self.s = value,
        }
    }

    // ========== Register Getters ==========

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    /// The D register: A in the high byte, B in the low byte.
    pub fn d(&self) -> u16 {
        ((self.a as u16) << 8) | self.b as u16
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn u(&self) -> u16 {
        self.u
    }

    pub fn s(&self) -> u16 {
        self.s
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn dp(&self) -> u8 {
        self.dp
    }

    pub fn cc(&self) -> ConditionCodes {
        self.cc
    }

    pub fn flag_e(&self) -> bool {
        self.cc.e()
    }

    pub fn flag_f(&self) -> bool {
        self.cc.f()
    }

    pub fn flag_h(&self) -> bool {
        self.cc.h()
    }

    pub fn flag_i(&self) -> bool {
        self.cc.i()
    }

    pub fn flag_n(&self) -> bool {
        self.cc.n()
    }

    pub fn flag_z(&self) -> bool {
        self.cc.z()
    }

    pub fn flag_v(&self) -> bool {
        self.cc.v()
    }

    pub fn flag_c(&self) -> bool {
        self.cc.c()
    }

    pub fn wait_state(&self) -> WaitState {
        self.wait
    }

    /// Address of the most recently fetched instruction.
    pub fn instruction_pc(&self) -> u16 {
        self.instruction_pc
    }

    /// Snapshot of every register.
    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            b: self.b,
            dp: self.dp,
            cc: self.cc,
            x: self.x,
            y: self.y,
            u: self.u,
            s: self.s,
            pc: self.pc,
        }
    }

    // ========== Register Setters ==========

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_b(&mut self, value: u8) {
        self.b = value;
    }

    pub fn set_d(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.b = value as u8;
    }

    pub fn set_x(&mut self, value: u16) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u16) {
        self.y = value;
    }

    pub fn set_u(&mut self, value: u16) {
        self.u = value;
    }

    pub fn set_s(&mut self, value: u16) {
        self.s = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn set_dp(&mut self, value: u8) {
        self.dp = value;
    }

    pub fn set_cc(&mut self, cc: impl Into<ConditionCodes>) {
        self.cc = cc.into();
    }

    /// Restores every register from a snapshot.
    pub fn set_registers(&mut self, regs: Registers) {
        self.a = regs.a;
        self.b = regs.b;
        self.dp = regs.dp;
        self.cc = regs.cc;
        self.x = regs.x;
        self.y = regs.y;
        self.u = regs.u;
        self.s = regs.s;
        self.pc = regs.pc;
    }

    // ========== Memory and interrupt access ==========

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.interrupts
    }

    pub fn into_memory(self) -> M {
        self.memory
    }
}
