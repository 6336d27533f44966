//! # Host Calls
//!
//! Opcode 0x3E traps to the host: the CPU stacks its entire state and reports
//! [`Step::SystemCall`](crate::Step::SystemCall). The driver then services the
//! call with [`service`] and resumes the program through RTI semantics.
//!
//! Registers at the time of the trap select the call and its arguments:
//!
//! | A | Call | Arguments |
//! |---|------|-----------|
//! | 0 | terminate | |
//! | 1 | write string | X = NUL-terminated string |
//! | 2 | read line | X = buffer, B = buffer size; count returned in A |
//! | 3 | write character | B = character |
//!
//! Any other value is reported and ignored.
//!
//! Host I/O goes through the [`HostIo`] trait so the same program can talk to
//! the process console ([`StdHost`]) or to in-memory buffers ([`BufferedHost`]).

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};

use crate::{ExecutionError, MemoryBus, CPU};

/// Console services available to emulated programs.
pub trait HostIo {
    /// Writes bytes to the host console.
    fn write(&mut self, bytes: &[u8]);

    /// Reads one line of at most `max` bytes, newline included when it fits.
    ///
    /// Returns `None` at end of input.
    fn read_line(&mut self, max: usize) -> Option<Vec<u8>>;
}

/// Host console backed by the process stdin and stdout.
///
/// Reads are line buffered: a line longer than the requested size is split,
/// the rest staying queued for the next read.
#[derive(Debug, Default, Clone)]
pub struct StdHost {
    pending: VecDeque<u8>,
}

impl StdHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the next line from `reader` once everything queued has been consumed.
    pub fn read_line_from<R: BufRead>(&mut self, reader: &mut R, max: usize) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => return None,
                Ok(_) => self.pending.extend(line),
                Err(err) => {
                    log::warn!("host read failed: {}", err);
                    return None;
                }
            }
        }
        Some(take_line(&mut self.pending, max))
    }
}

impl HostIo for StdHost {
    fn write(&mut self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(bytes).and_then(|_| stdout.flush()) {
            log::warn!("host write failed: {}", err);
        }
    }

    fn read_line(&mut self, max: usize) -> Option<Vec<u8>> {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        self.read_line_from(&mut reader, max)
    }
}

/// In-memory host console.
///
/// Input is queued with [`push_input`](Self::push_input); a line longer than
/// the requested size is split, the rest staying queued for the next read.
#[derive(Debug, Default, Clone)]
pub struct BufferedHost {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output as text, lossily decoded.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl HostIo for BufferedHost {
    fn write(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    fn read_line(&mut self, max: usize) -> Option<Vec<u8>> {
        if self.input.is_empty() {
            return None;
        }
        Some(take_line(&mut self.input, max))
    }
}

/// Pops up to `max` bytes off `queue`, stopping after a newline.
fn take_line(queue: &mut VecDeque<u8>, max: usize) -> Vec<u8> {
    let mut line = Vec::new();
    while line.len() < max {
        match queue.pop_front() {
            Some(byte) => {
                line.push(byte);
                if byte == b'\n' {
                    break;
                }
            }
            None => break,
        }
    }
    line
}

/// A decoded host call number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Terminate,
    WriteString,
    ReadLine,
    WriteChar,
    Unknown(u8),
}

impl From<u8> for HostCall {
    fn from(number: u8) -> Self {
        match number {
            0 => HostCall::Terminate,
            1 => HostCall::WriteString,
            2 => HostCall::ReadLine,
            3 => HostCall::WriteChar,
            n => HostCall::Unknown(n),
        }
    }
}

impl fmt::Display for HostCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCall::Terminate => write!(f, "terminate"),
            HostCall::WriteString => write!(f, "write string"),
            HostCall::ReadLine => write!(f, "read line"),
            HostCall::WriteChar => write!(f, "write char"),
            HostCall::Unknown(n) => write!(f, "unknown call {}", n),
        }
    }
}

/// Services the host call the CPU just trapped on, then returns from the trap.
///
/// The CPU must have just returned [`Step::SystemCall`](crate::Step::SystemCall),
/// so that its entire state is on the S stack. Results that the program sees
/// in registers are written into that stacked frame.
///
/// The trap frame is unstacked even when the call fails on a bus error, so
/// the CPU resumes after the trap with its registers as they were.
pub fn service<M: MemoryBus>(
    cpu: &mut CPU<M>,
    io: &mut dyn HostIo,
) -> Result<HostCall, ExecutionError> {
    let call = HostCall::from(cpu.a());
    log::debug!("host call: {}", call);

    let performed = perform(cpu, io, call);
    cpu.return_from_interrupt()?;
    performed?;
    Ok(call)
}

fn perform<M: MemoryBus>(
    cpu: &mut CPU<M>,
    io: &mut dyn HostIo,
    call: HostCall,
) -> Result<(), ExecutionError> {
    match call {
        HostCall::Terminate => io.write(b"Program terminated\n"),
        HostCall::WriteString => {
            let start = cpu.x();
            let text = read_string(cpu, start)?;
            io.write(&text);
        }
        HostCall::ReadLine => read_line(cpu, io)?,
        HostCall::WriteChar => io.write(&[cpu.b()]),
        HostCall::Unknown(n) => {
            log::warn!("unknown system call {}", n);
            io.write(format!("Unknown system call {}\n", n).as_bytes());
        }
    }
    Ok(())
}

/// Reads a NUL-terminated string, stopping after one full wrap of memory.
fn read_string<M: MemoryBus>(cpu: &mut CPU<M>, start: u16) -> Result<Vec<u8>, ExecutionError> {
    let mut text = Vec::new();
    let mut addr = start;
    for _ in 0..=u16::MAX as usize {
        let byte = cpu.memory_mut().read(addr)?;
        if byte == 0 {
            break;
        }
        text.push(byte);
        addr = addr.wrapping_add(1);
    }
    Ok(text)
}

fn read_line<M: MemoryBus>(cpu: &mut CPU<M>, io: &mut dyn HostIo) -> Result<(), ExecutionError> {
    let buffer = cpu.x();
    let size = cpu.b() as usize;
    let mut count = 0u8;

    if size > 0 {
        let line = io.read_line(size - 1).unwrap_or_default();
        let mut addr = buffer;
        for &byte in &line {
            cpu.memory_mut().write(addr, byte)?;
            addr = addr.wrapping_add(1);
        }
        cpu.memory_mut().write(addr, 0)?;
        count = line.len() as u8;
    }

    // The stacked frame starts with CC; A is the next byte up
    let stacked_a = cpu.s().wrapping_add(1);
    cpu.memory_mut().write(stacked_a, count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatMemory, Step};

    fn trapped_cpu(a: u8, b: u8, x: u16) -> CPU<FlatMemory> {
        let mut memory = FlatMemory::new();
        memory.load(0x1000, &[0x3E, 0x12]);
        memory.load(0xFFFE, &[0x10, 0x00]);
        let mut cpu = CPU::new(memory);
        cpu.set_s(0x8000);
        cpu.set_a(a);
        cpu.set_b(b);
        cpu.set_x(x);
        assert_eq!(cpu.step().unwrap(), Step::SystemCall);
        cpu
    }

    #[test]
    fn test_write_string() {
        let mut cpu = trapped_cpu(1, 0, 0x2000);
        cpu.memory_mut().load(0x2000, b"hello\0");
        let mut host = BufferedHost::new();
        assert_eq!(service(&mut cpu, &mut host).unwrap(), HostCall::WriteString);
        assert_eq!(host.output(), b"hello");
        assert_eq!(cpu.pc(), 0x1001);
        assert_eq!(cpu.s(), 0x8000);
        assert_eq!(cpu.x(), 0x2000);
    }

    #[test]
    fn test_read_line_bounded_by_b() {
        let mut cpu = trapped_cpu(2, 4, 0x3000);
        let mut host = BufferedHost::new();
        host.push_input(b"abcdef\n");
        service(&mut cpu, &mut host).unwrap();

        assert_eq!(cpu.memory().peek(0x3000), b'a');
        assert_eq!(cpu.memory().peek(0x3002), b'c');
        assert_eq!(cpu.memory().peek(0x3003), 0);
        assert_eq!(cpu.a(), 3);
        assert_eq!(cpu.b(), 4);
    }

    #[test]
    fn test_read_line_at_end_of_input() {
        let mut cpu = trapped_cpu(2, 16, 0x3000);
        cpu.memory_mut().load(0x3000, &[0xFF]);
        let mut host = BufferedHost::new();
        service(&mut cpu, &mut host).unwrap();
        assert_eq!(cpu.memory().peek(0x3000), 0);
        assert_eq!(cpu.a(), 0);
    }

    #[test]
    fn test_write_char_and_terminate() {
        let mut cpu = trapped_cpu(3, b'!', 0);
        let mut host = BufferedHost::new();
        service(&mut cpu, &mut host).unwrap();
        assert_eq!(host.output(), b"!");

        let mut cpu = trapped_cpu(0, 0, 0);
        assert_eq!(service(&mut cpu, &mut host).unwrap(), HostCall::Terminate);
        assert!(host.output_string().ends_with("Program terminated\n"));
    }

    #[test]
    fn test_std_host_keeps_rest_of_long_line() {
        let mut input: &[u8] = b"abcdef\nxy\n";
        let mut host = StdHost::new();
        assert_eq!(host.read_line_from(&mut input, 3).unwrap(), b"abc");
        assert_eq!(host.read_line_from(&mut input, 3).unwrap(), b"def");
        assert_eq!(host.read_line_from(&mut input, 3).unwrap(), b"\n");
        assert_eq!(host.read_line_from(&mut input, 8).unwrap(), b"xy\n");
        assert_eq!(host.read_line_from(&mut input, 8), None);
    }

    #[test]
    fn test_unknown_call_resumes() {
        let mut cpu = trapped_cpu(9, 0, 0);
        let mut host = BufferedHost::new();
        assert_eq!(service(&mut cpu, &mut host).unwrap(), HostCall::Unknown(9));
        assert_eq!(cpu.pc(), 0x1001);
        assert_eq!(host.output_string(), "Unknown system call 9\n");
    }
}
