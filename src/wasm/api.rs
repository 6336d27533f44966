//! WASM API for the 6809 emulator.
//!
//! Provides JavaScript-callable interfaces for machine control, state
//! inspection, image loading and disassembly.

use crate::config::{DeviceSpec, MachineConfig};
use crate::devices::DeviceKind;
use crate::host::HostIo;
use crate::loader;
use crate::{
    disassemble, AddressMap, BufferedSerial, InterruptLine, Machine, SerialPort, StepEvent,
    SystemBus,
};
use wasm_bindgen::prelude::*;

/// Base address of the ACIA in the browser machine.
const ACIA_BASE: u16 = 0xE000;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

/// Result of disassembly operation
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct DisassemblyLine {
    address: u16,
    bytes: Vec<u8>,
    mnemonic: String,
    operand: String,
}

#[wasm_bindgen]
impl DisassemblyLine {
    #[wasm_bindgen(getter)]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mnemonic(&self) -> String {
        self.mnemonic.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn operand(&self) -> String {
        self.operand.clone()
    }
}

/// Host calls write to the same JavaScript callback as the ACIA.
struct JsHost {
    on_transmit: js_sys::Function,
}

impl HostIo for JsHost {
    fn write(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let _ = self.on_transmit.call1(&JsValue::NULL, &JsValue::from_str(&text));
    }

    fn read_line(&mut self, _max: usize) -> Option<Vec<u8>> {
        None
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct Emulator6809 {
    machine: Machine,
    serial: BufferedSerial,
    on_transmit: js_sys::Function,
}

impl Emulator6809 {
    fn build(on_transmit: &js_sys::Function) -> Result<(Machine, BufferedSerial), JsError> {
        let mut serial = BufferedSerial::new();
        let callback = on_transmit.clone();
        serial.set_transmit_callback(move |byte| {
            let text = String::from_utf8_lossy(&[byte]).into_owned();
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&text));
        });

        let config = MachineConfig {
            map: AddressMap::new(0x0000, 0xE000, 0xE000, 0xE800, 0xF000),
            devices: vec![DeviceSpec::new(
                DeviceKind::Acia,
                ACIA_BASE,
                Some(InterruptLine::Irq),
            )],
            allow_overlap: false,
        };
        let port = serial.clone();
        let bus: SystemBus = config
            .build_with_serial(|| Box::new(port.clone()) as Box<dyn SerialPort>)
            .map_err(js_error)?;

        let machine = Machine::new(bus).with_host(JsHost {
            on_transmit: on_transmit.clone(),
        });
        Ok((machine, serial))
    }
}

#[wasm_bindgen]
impl Emulator6809 {
    /// Create a machine with RAM at $0000-$DFFF, an ACIA at $E000 and ROM at $F000
    #[wasm_bindgen(constructor)]
    pub fn new(on_transmit: js_sys::Function) -> Result<Emulator6809, JsError> {
        let (machine, serial) = Self::build(&on_transmit)?;
        Ok(Emulator6809 {
            machine,
            serial,
            on_transmit,
        })
    }

    /// Execute a single step and return its cycle count
    pub fn step(&mut self) -> Result<u32, JsError> {
        match self.machine.step().map_err(js_error)? {
            StepEvent::Executed(cycles) => Ok(cycles),
            StepEvent::HostCall(_) => Ok(0),
            StepEvent::BusFault(err) => Err(js_error(err)),
        }
    }

    /// Run until the cycle budget is spent, the program terminates or an error
    ///
    /// Returns the cycles actually executed.
    pub fn run_for_cycles(&mut self, cycles: u32) -> Result<f64, JsError> {
        let start = self.machine.cycles();
        self.machine
            .run_cycles(cycles as u64)
            .map_err(js_error)?;
        Ok((self.machine.cycles() - start) as f64)
    }

    /// Rebuild the devices and reset the CPU; RAM contents survive
    pub fn reset(&mut self) -> Result<(), JsError> {
        let ram: Vec<u8> = (0..0xE000u32)
            .map(|addr| self.machine.bus().peek(addr as u16))
            .collect();
        let (mut machine, serial) = Self::build(&self.on_transmit)?;
        for (addr, &byte) in ram.iter().enumerate() {
            machine.bus_mut().poke(addr as u16, byte);
        }
        machine.reset().map_err(js_error)?;
        self.machine = machine;
        self.serial = serial;
        Ok(())
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn a(&self) -> u8 {
        self.machine.cpu().a()
    }

    #[wasm_bindgen(getter)]
    pub fn b(&self) -> u8 {
        self.machine.cpu().b()
    }

    #[wasm_bindgen(getter)]
    pub fn d(&self) -> u16 {
        self.machine.cpu().d()
    }

    #[wasm_bindgen(getter)]
    pub fn x(&self) -> u16 {
        self.machine.cpu().x()
    }

    #[wasm_bindgen(getter)]
    pub fn y(&self) -> u16 {
        self.machine.cpu().y()
    }

    #[wasm_bindgen(getter)]
    pub fn u(&self) -> u16 {
        self.machine.cpu().u()
    }

    #[wasm_bindgen(getter)]
    pub fn s(&self) -> u16 {
        self.machine.cpu().s()
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u16 {
        self.machine.cpu().pc()
    }

    #[wasm_bindgen(getter)]
    pub fn dp(&self) -> u8 {
        self.machine.cpu().dp()
    }

    #[wasm_bindgen(getter)]
    pub fn cc(&self) -> u8 {
        self.machine.cpu().cc().bits()
    }

    #[wasm_bindgen(getter)]
    pub fn cycles(&self) -> f64 {
        self.machine.cycles() as f64 // Convert u64 to f64 for JavaScript
    }

    // Flag getters
    #[wasm_bindgen(getter)]
    pub fn flag_e(&self) -> bool {
        self.machine.cpu().flag_e()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_f(&self) -> bool {
        self.machine.cpu().flag_f()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_h(&self) -> bool {
        self.machine.cpu().flag_h()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_i(&self) -> bool {
        self.machine.cpu().flag_i()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_n(&self) -> bool {
        self.machine.cpu().flag_n()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_z(&self) -> bool {
        self.machine.cpu().flag_z()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_v(&self) -> bool {
        self.machine.cpu().flag_v()
    }

    #[wasm_bindgen(getter)]
    pub fn flag_c(&self) -> bool {
        self.machine.cpu().flag_c()
    }

    /// Set the program counter
    pub fn set_pc(&mut self, addr: u16) {
        self.machine.cpu_mut().set_pc(addr);
    }

    /// Queue a byte for the ACIA receiver
    pub fn receive_char(&mut self, byte: u8) {
        self.serial.push_input(&[byte]);
    }

    // Memory access methods

    /// Read a byte of the memory image (devices are not touched)
    pub fn read_memory(&self, addr: u16) -> u8 {
        self.machine.bus().peek(addr)
    }

    /// Write a byte of the memory image, bypassing protection
    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.machine.bus_mut().poke(addr, value);
    }

    /// Read a 256-byte page from memory (for efficient display)
    pub fn get_memory_page(&self, page: u8) -> Vec<u8> {
        let start = (page as u16) << 8;
        (0..256u16)
            .map(|i| self.machine.bus().peek(start.wrapping_add(i)))
            .collect()
    }

    /// Load raw bytes at `origin` and point PC at them
    pub fn load_program(&mut self, program: &[u8], origin: u16) -> Result<(), JsError> {
        loader::load_raw(self.machine.bus_mut(), program, Some(origin)).map_err(js_error)?;
        self.machine.cpu_mut().set_pc(origin);
        Ok(())
    }

    /// Load Motorola S-record text; PC is set from the S9 record when present
    pub fn load_srecord(&mut self, text: &str) -> Result<(), JsError> {
        let summary = loader::load_srecord(self.machine.bus_mut(), text).map_err(js_error)?;
        if let Some(start) = summary.start {
            self.machine.cpu_mut().set_pc(start);
        }
        Ok(())
    }

    /// Disassemble `count` instructions starting at `start`
    pub fn disassemble(&mut self, start: u16, count: u32) -> Vec<JsValue> {
        let mut lines = Vec::new();
        let mut addr = start;
        for _ in 0..count {
            let Ok(instruction) = disassemble(self.machine.bus_mut(), addr) else {
                break;
            };
            addr = instruction.next_address();
            lines.push(JsValue::from(DisassemblyLine {
                address: instruction.address,
                bytes: instruction.bytes,
                mnemonic: instruction.mnemonic.to_string(),
                operand: instruction.operand,
            }));
        }
        lines
    }
}
