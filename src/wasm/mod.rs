//! WebAssembly bindings for the lib6809 emulator.
//!
//! This module provides JavaScript-callable interfaces to a small 6809
//! machine (RAM, one ACIA, ROM), enabling browser-based execution of 6809
//! programs.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::Emulator6809;
