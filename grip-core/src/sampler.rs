//! Edge sampler and packet assembler.
//!
//! [`EdgeSampler::on_edge`] runs in interrupt context on every falling clock
//! edge of one controller port. It is the only writer of the shift register,
//! cursor and statistics of that port. Completed packets are handed to the
//! thread-context consumer through a [`PacketSlot`].

use crate::packet::{RawPacket, PACKET_BITS, PACKET_MASK};
use core::future::poll_fn;
use core::task::Poll;
use embassy_sync::waitqueue::AtomicWaker;
use portable_atomic::{AtomicU32, AtomicU8, Ordering};

/// Set in the slot word while a packet is waiting to be taken.
const READY: u32 = 1 << 31;

/// Single-word, most-recent-wins handoff of completed packets.
///
/// Packet and ready flag share one atomic word, so a consumer can never
/// observe a partially written packet.
pub struct PacketSlot {
    word: AtomicU32,
    overwritten: AtomicU32,
    waker: AtomicWaker,
}

impl PacketSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
            overwritten: AtomicU32::new(0),
            waker: AtomicWaker::new(),
        }
    }

    /// Store a completed packet, replacing any packet not yet taken.
    pub fn publish(&self, packet: RawPacket) {
        let previous = self.word.swap(packet.bits() | READY, Ordering::Release);
        if previous & READY != 0 {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.waker.wake();
    }

    /// Take the pending packet, if any. Each packet is returned once.
    pub fn try_take(&self) -> Option<RawPacket> {
        let word = self.word.swap(0, Ordering::Acquire);
        (word & READY != 0).then(|| RawPacket::new(word & PACKET_MASK))
    }

    /// Check for a pending packet without consuming it.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.word.load(Ordering::Acquire) & READY != 0
    }

    /// Wait until a packet is published and take it.
    pub async fn wait(&self) -> RawPacket {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            match self.try_take() {
                Some(packet) => Poll::Ready(packet),
                None => Poll::Pending,
            }
        })
        .await
    }

    /// Packets replaced before the consumer took them.
    #[must_use]
    pub fn overwritten(&self) -> u32 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl Default for PacketSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters maintained by one [`EdgeSampler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerStats {
    /// Packets assembled and published.
    pub packets: u32,
    /// Published packets the consumer never saw.
    pub overwritten: u32,
    /// Edges that arrived with the cursor already at packet width.
    pub desyncs: u32,
    /// Packet boundary adjustments applied on request.
    pub slips: u32,
}

/// Bit sampler and packet assembler for one controller port.
///
/// The shift register always holds the last 24 bits received; the cursor
/// counts bits since the last packet boundary.
pub struct EdgeSampler {
    shift: AtomicU32,
    cursor: AtomicU8,
    slip: AtomicU8,
    packets: AtomicU32,
    desyncs: AtomicU32,
    slips: AtomicU32,
    slot: PacketSlot,
}

impl EdgeSampler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shift: AtomicU32::new(0),
            cursor: AtomicU8::new(0),
            slip: AtomicU8::new(0),
            packets: AtomicU32::new(0),
            desyncs: AtomicU32::new(0),
            slips: AtomicU32::new(0),
            slot: PacketSlot::new(),
        }
    }

    /// Shift in the data level sampled on a falling clock edge.
    ///
    /// Must only be called from a single context per sampler.
    pub fn on_edge(&self, data_high: bool) {
        let mut cursor = self.cursor.load(Ordering::Relaxed);

        if cursor >= PACKET_BITS {
            // Unreachable while the boundary logic below keeps cursor < 24;
            // guards the invariant if that logic changes.
            // Stray bit: drop it and start the next packet from scratch.
            self.desyncs.fetch_add(1, Ordering::Relaxed);
            self.cursor.store(0, Ordering::Relaxed);
            return;
        }

        if self.slip.load(Ordering::Relaxed) != 0 {
            let slip = self.slip.swap(0, Ordering::Relaxed) % PACKET_BITS;
            cursor = (cursor + PACKET_BITS - slip) % PACKET_BITS;
            self.slips.fetch_add(1, Ordering::Relaxed);
        }

        let shift = ((self.shift.load(Ordering::Relaxed) << 1) | u32::from(data_high)) & PACKET_MASK;
        self.shift.store(shift, Ordering::Relaxed);

        cursor += 1;
        if cursor == PACKET_BITS {
            self.packets.fetch_add(1, Ordering::Relaxed);
            self.slot.publish(RawPacket::new(shift));
            cursor = 0;
        }
        self.cursor.store(cursor, Ordering::Relaxed);
    }

    /// Ask the sampler to move the packet boundary `bits` later.
    ///
    /// Applied on the next edge. Shift register contents are kept, so the
    /// next packet is the 24 bits ending at the new boundary.
    pub fn request_slip(&self, bits: u8) {
        self.slip.store(bits % PACKET_BITS, Ordering::Relaxed);
    }

    /// Bits received since the last packet boundary.
    #[must_use]
    pub fn cursor(&self) -> u8 {
        self.cursor.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn slot(&self) -> &PacketSlot {
        &self.slot
    }

    #[must_use]
    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            packets: self.packets.load(Ordering::Relaxed),
            overwritten: self.slot.overwritten(),
            desyncs: self.desyncs.load(Ordering::Relaxed),
            slips: self.slips.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub(crate) fn force_cursor(&self, cursor: u8) {
        self.cursor.store(cursor, Ordering::Relaxed);
    }
}

impl Default for EdgeSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock a whole packet into a sampler, MSB first.
#[cfg(test)]
pub(crate) fn feed_packet(sampler: &EdgeSampler, packet: RawPacket) {
    for bit in (0..PACKET_BITS).rev() {
        sampler.on_edge(packet.bits() & (1 << bit) != 0);
    }
}
