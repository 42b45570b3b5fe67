//! GRiP packet layout, framing validation and button mapping.
//!
//! A GRiP pad sends 24-bit packets on its data line, one bit per falling
//! clock edge. Bits are shifted in MSB-first, so the first bit on the wire
//! lands in bit 23 of the [`RawPacket`]:
//!
//! ```text
//! bit 23                                          bit 0
//!  S S S S 0 S S S S 0 S S S S 0 S S 0 1 1 1 1 1 0
//! ```
//!
//! `S` bits carry button state (1 = pressed). The low seven bits are the
//! `0111110` sync pattern and the three interleaved `0` bits are group
//! separators. Together they form the framing that every accepted packet
//! must match.

use crate::types::{Button, Buttons};

/// Number of bits in one GRiP packet.
pub const PACKET_BITS: u8 = 24;

/// Mask covering all packet bits.
pub const PACKET_MASK: u32 = (1 << PACKET_BITS) - 1;

/// Packet layout, bit 23 first. `0`/`1` are framing, anything else is data.
const LAYOUT: &[u8; PACKET_BITS as usize] = b"SSSS0SSSS0SSSS0SS0111110";

/// Turn a layout string into `(mask, expected)` for the framing check.
const fn framing(layout: &[u8; PACKET_BITS as usize]) -> (u32, u32) {
    let mut mask = 0;
    let mut expected = 0;
    let mut i = 0;
    while i < layout.len() {
        let bit = 1 << (layout.len() - 1 - i);
        match layout[i] {
            b'0' => mask |= bit,
            b'1' => {
                mask |= bit;
                expected |= bit;
            }
            _ => {}
        }
        i += 1;
    }
    (mask, expected)
}

const FRAMING: (u32, u32) = framing(LAYOUT);

/// Bits that must match [`FRAME_EXPECTED`] in every valid packet.
pub const FRAME_MASK: u32 = FRAMING.0;

/// Expected value of the framing bits.
pub const FRAME_EXPECTED: u32 = FRAMING.1;

/// Raw packet bit position of each button, indexed by [`Button::index`].
const BUTTON_BITS: [u8; Button::COUNT] = [
    7,  // left
    8,  // right
    10, // down
    11, // up
    12, // r1
    13, // l1
    15, // red
    16, // yellow
    17, // green
    18, // l2
    20, // blue
    21, // r2
    22, // start
    23, // select
];

/// A completed 24-bit packet as captured by the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPacket(u32);

impl RawPacket {
    /// Wrap a raw value, discarding anything above bit 23.
    #[inline]
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits & PACKET_MASK)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check the framing bits without decoding.
    #[inline]
    #[must_use]
    pub const fn is_framed(self) -> bool {
        self.0 & FRAME_MASK == FRAME_EXPECTED
    }

    /// Rotate the 24-bit window left by `n` bits.
    #[inline]
    #[must_use]
    pub const fn rotate_left(self, n: u8) -> Self {
        let n = n % PACKET_BITS;
        if n == 0 {
            return self;
        }
        Self::new((self.0 << n) | (self.0 >> (PACKET_BITS - n)))
    }
}

/// Packet rejected by [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Framing bits did not match; carries the offending framing bits.
    Framing(u32),
}

/// Validate a packet and extract its button bitmap.
pub fn decode(packet: RawPacket) -> Result<Buttons, FrameError> {
    if !packet.is_framed() {
        return Err(FrameError::Framing(packet.bits() & FRAME_MASK));
    }

    let mut buttons = Buttons::NONE;
    for button in Button::ALL {
        let bit = BUTTON_BITS[button.index()];
        buttons.set(button, packet.bits() & (1 << bit) != 0);
    }
    Ok(buttons)
}

/// Build the well-framed packet a pad would send for `buttons`.
#[must_use]
pub fn encode(buttons: Buttons) -> RawPacket {
    let mut bits = FRAME_EXPECTED;
    for button in buttons.iter() {
        bits |= 1 << BUTTON_BITS[button.index()];
    }
    RawPacket::new(bits)
}

/// Find how far the packet boundary is offset within a misaligned window.
///
/// Returns the smallest `s` in `1..24` such that the window rotated left by
/// `s` is well framed, i.e. the real packet starts `s` bits into the window.
#[must_use]
pub fn find_alignment(packet: RawPacket) -> Option<u8> {
    (1..PACKET_BITS).find(|&s| packet.rotate_left(s).is_framed())
}
