//! GRiP game pad to USB keyboard adapter for RP2040.
//!
//! This crate provides the embedded implementation of an adapter that reads
//! two GRiP game pads and types their buttons on a host as a USB keyboard.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) and:
//! 1. Samples each pad's data line on the falling edge of its clock line
//! 2. Assembles and validates 24-bit GRiP packets
//! 3. Sends button changes as USB HID boot keyboard reports
//!
//! # Hardware Configuration
//!
//! | Function  | GPIO | Description |
//! |-----------|------|-------------|
//! | JS1 clock | 2    | Port 1 clock (edge interrupt) |
//! | JS1 data  | 3    | Port 1 data |
//! | JS2 clock | 4    | Port 2 clock (edge interrupt) |
//! | JS2 data  | 5    | Port 2 data |
//!
//! All four lines use the internal pull-ups. GRiP pads drive 5 V levels,
//! so the lines need level shifting or series resistors on the RP2040.
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with two executors:
//!
//! - **Interrupt executor** (`SWI_IRQ_1`): one sampler task per port, which
//!   preempts everything else so no clock edge is missed
//! - **Thread executor**: the USB device task, the bridge task that decodes
//!   packets and emits key events, and a periodic statistics task
//!
//! Samplers hand packets to the bridge through each port's lock-free
//! [`PacketSlot`](grip_core::PacketSlot) with "latest packet wins" semantics.
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//!
//! # Re-exports
//!
//! This crate re-exports the public items from [`grip_core`] needed by the
//! firmware binary, so it only needs to depend on this crate.

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features - they define conflicting panic handlers");

// Re-export core types for convenience
pub use grip_core::{
    BridgeError, Button, Buttons, ControllerPort, EdgeSampler, EmitError, GripBridge,
    InputEmitter, KeyEvent, Keymap, KeymapError, PortDecoder, PortId, SampleError,
    SamplerStats,
};

pub mod usb_output;

pub use usb_output::{configure_usb_hid, UsbKeyboardOutput};

/// How often sampler statistics are logged, in seconds.
pub const STATS_INTERVAL_SECS: u64 = 30;
