//! Platform-agnostic GRiP gamepad decoding, keymaps, and traits.
//!
//! This crate decodes the two-wire (clock + data) GRiP protocol spoken by
//! legacy Gravis game pads and turns button changes into key events. It has
//! no platform-specific dependencies and can be used both in embedded
//! `no_std` firmware and on host for testing.
//!
//! # Overview
//!
//! Each controller port runs the same pipeline:
//!
//! - [`sampler`]: interrupt-context bit sampling and packet assembly
//!   ([`EdgeSampler`], [`PacketSlot`])
//! - [`input`]: drives a sampler from `embedded-hal` pins ([`ControllerPort`])
//! - [`packet`]: framing validation and button mapping ([`decode`], [`encode`])
//! - [`events`]: bitmap diffing ([`transitions`], [`KeyEvent`])
//! - [`keymap`]: button to key symbol tables ([`Keymap`])
//! - [`bridge`]: thread-context consumer for both ports ([`GripBridge`])
//! - [`output`]: input emitter trait ([`InputEmitter`])
//! - [`report`]: HID boot keyboard model ([`KeyboardState`])
//!
//! # Example
//!
//! ```rust
//! use grip_core::{decode, encode, Buttons, EdgeSampler};
//!
//! let sampler = EdgeSampler::new();
//! let packet = encode(Buttons::UP | Buttons::RED);
//!
//! // Clock the packet in, MSB first, one bit per falling edge.
//! for bit in (0..24).rev() {
//!     sampler.on_edge(packet.bits() & (1 << bit) != 0);
//! }
//!
//! let received = sampler.slot().try_take().unwrap();
//! assert_eq!(decode(received), Ok(Buttons::UP | Buttons::RED));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and logging (for embedded targets)
//! - **`log`**: Log through the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bridge;
pub mod events;
pub mod input;
pub mod keymap;
pub mod output;
pub mod packet;
pub mod report;
pub mod sampler;
pub mod types;

// Re-export main types at crate root
pub use bridge::{BridgeError, DecodeStats, GripBridge, PortDecoder, RESYNC_AFTER};
pub use events::{transitions, KeyAction, KeyEvent, Transition, Transitions};
pub use input::{ControllerPort, SampleError};
pub use keymap::{Keymap, KeymapError, NamedKey, Symbol};
pub use output::{EmitError, InputEmitter};
pub use packet::{
    decode, encode, find_alignment, FrameError, RawPacket, FRAME_EXPECTED, FRAME_MASK,
    PACKET_BITS, PACKET_MASK,
};
pub use report::{keystroke, KeyboardReport, KeyboardState, Keystroke, MAX_KEYS};
pub use sampler::{EdgeSampler, PacketSlot, SamplerStats};
pub use types::{Button, Buttons, PortId};
