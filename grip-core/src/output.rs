//! Input emitter trait and error types.

use crate::events::KeyEvent;
use core::future::Future;

/// Error type for emitting key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmitError {
    /// USB/communication I/O error.
    Io,
    /// Host not ready (e.g., USB not enumerated).
    NotReady,
    /// Too many keys held to report another one.
    Rollover,
}

/// Async trait for whatever turns key events into host keystrokes.
///
/// This trait abstracts the destination for key events, enabling
/// different output methods (USB HID keyboard, BLE HID, serial debug, etc.).
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait InputEmitter {
    /// Emit a single press or release.
    fn emit(&mut self, event: &KeyEvent) -> impl Future<Output = Result<(), EmitError>>;

    /// Re-send everything currently held, e.g. after the host reconnects.
    ///
    /// Held state must survive a failed `emit`, so the decoder's bitmap and
    /// the host agree again once this succeeds.
    fn refresh(&mut self) -> impl Future<Output = Result<(), EmitError>>;

    /// Check if the emitter is ready to accept events.
    fn is_ready(&self) -> bool;
}
