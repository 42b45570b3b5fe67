//! GripBridge: connects both controller ports to an input emitter.

use crate::events::{transitions, KeyEvent, Transitions};
use crate::keymap::Keymap;
use crate::output::{EmitError, InputEmitter};
use crate::packet::{decode, find_alignment, FrameError, RawPacket};
use crate::sampler::EdgeSampler;
use crate::types::{Buttons, PortId};
use embassy_futures::select::{select, Either};

/// Consecutive misaligned packets, agreeing on the offset, before a slip.
pub const RESYNC_AFTER: u8 = 2;

/// Counters maintained by one [`PortDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeStats {
    /// Packets that passed the framing check.
    pub accepted: u32,
    /// Packets discarded for bad framing.
    pub framing_errors: u32,
    /// Slip requests sent to the sampler.
    pub resyncs: u32,
}

/// Decoding state for one controller port.
///
/// Holds the last accepted bitmap, so decoding the same packet twice only
/// produces transitions the first time.
pub struct PortDecoder<'a> {
    id: PortId,
    sampler: &'a EdgeSampler,
    keymap: Keymap,
    previous: Buttons,
    /// Candidate slip offset and how many packets in a row agreed on it.
    misaligned: Option<(u8, u8)>,
    stats: DecodeStats,
}

impl<'a> PortDecoder<'a> {
    pub fn new(id: PortId, sampler: &'a EdgeSampler, keymap: Keymap) -> Self {
        Self {
            id,
            sampler,
            keymap,
            previous: Buttons::NONE,
            misaligned: None,
            stats: DecodeStats::default(),
        }
    }

    /// Validate a packet and diff it against the previous bitmap.
    ///
    /// Returns `None` for a rejected packet; the previous bitmap is kept.
    pub fn process(&mut self, packet: RawPacket) -> Option<Transitions> {
        match decode(packet) {
            Ok(buttons) => {
                self.stats.accepted += 1;
                self.misaligned = None;
                let changes = transitions(self.previous, buttons);
                self.previous = buttons;
                Some(changes)
            }
            Err(FrameError::Framing(bits)) => {
                self.stats.framing_errors += 1;
                trace!("{:?}: framing mismatch {:?}", self.id, bits);
                self.track_alignment(packet);
                None
            }
        }
    }

    fn track_alignment(&mut self, packet: RawPacket) {
        let Some(offset) = find_alignment(packet) else {
            self.misaligned = None;
            return;
        };

        let count = match self.misaligned {
            Some((candidate, count)) if candidate == offset => count + 1,
            _ => 1,
        };

        if count >= RESYNC_AFTER {
            debug!("{:?}: slipping {:?} bits", self.id, offset);
            self.sampler.request_slip(offset);
            self.stats.resyncs += 1;
            self.misaligned = None;
        } else {
            self.misaligned = Some((offset, count));
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.id
    }

    #[must_use]
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Bitmap of the most recently accepted packet.
    #[inline]
    #[must_use]
    pub fn buttons(&self) -> Buttons {
        self.previous
    }

    #[must_use]
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    #[must_use]
    pub fn sampler(&self) -> &'a EdgeSampler {
        self.sampler
    }
}

/// A bridge that turns completed packets from both ports into key events.
///
/// Packets are consumed from each port's sampler slot and decoded in thread
/// context; the samplers themselves run in interrupt context and are only
/// touched through their lock-free slot.
pub struct GripBridge<'a, E> {
    ports: [PortDecoder<'a>; 2],
    emitter: E,
}

impl<'a, E: InputEmitter> GripBridge<'a, E> {
    /// Create a new bridge from two port decoders and an emitter.
    pub fn new(js1: PortDecoder<'a>, js2: PortDecoder<'a>, emitter: E) -> Self {
        Self {
            ports: [js1, js2],
            emitter,
        }
    }

    /// Run the bridge, decoding packets indefinitely.
    ///
    /// This method never returns under normal operation.
    pub async fn run(&mut self) -> ! {
        loop {
            if let Err(e) = self.process_one().await {
                warn!("Emit error: {:?}", e);
            }
        }
    }

    /// Wait for the next packet from either port and handle it.
    ///
    /// Returns the number of events emitted.
    pub async fn process_one(&mut self) -> Result<usize, BridgeError> {
        let (port, packet) = match select(
            self.ports[0].sampler.slot().wait(),
            self.ports[1].sampler.slot().wait(),
        )
        .await
        {
            Either::First(packet) => (PortId::Js1, packet),
            Either::Second(packet) => (PortId::Js2, packet),
        };
        self.handle(port, packet).await
    }

    /// Handle whatever packets are ready right now, without waiting.
    pub async fn poll(&mut self) -> Result<usize, BridgeError> {
        let mut emitted = 0;
        for port in PortId::ALL {
            if let Some(packet) = self.ports[port.index()].sampler.slot().try_take() {
                emitted += self.handle(port, packet).await?;
            }
        }
        Ok(emitted)
    }

    async fn handle(&mut self, port: PortId, packet: RawPacket) -> Result<usize, BridgeError> {
        let decoder = &mut self.ports[port.index()];
        let Some(changes) = decoder.process(packet) else {
            return Ok(0);
        };

        // Every transition reaches the emitter; the first failure is reported.
        let mut emitted = 0;
        let mut failure = None;
        for transition in changes {
            let event = KeyEvent::resolve(port, &decoder.keymap, transition);
            trace!("{:?}", event);
            match self.emitter.emit(&event).await {
                Ok(()) => emitted += 1,
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(BridgeError::Emit(e)),
            None => Ok(emitted),
        }
    }

    /// Re-send the held keys to the host, keeping the port bitmaps as they are.
    pub async fn refresh(&mut self) -> Result<(), BridgeError> {
        self.emitter.refresh().await?;
        Ok(())
    }

    /// Get a port decoder.
    pub fn port(&self, port: PortId) -> &PortDecoder<'a> {
        &self.ports[port.index()]
    }

    /// Get a reference to the emitter.
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Get a mutable reference to the emitter.
    pub fn emitter_mut(&mut self) -> &mut E {
        &mut self.emitter
    }

    /// Decompose the bridge into its port decoders and emitter.
    pub fn into_parts(self) -> ([PortDecoder<'a>; 2], E) {
        (self.ports, self.emitter)
    }
}

/// Error type for bridge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    /// Error from the input emitter.
    Emit(EmitError),
}

impl From<EmitError> for BridgeError {
    fn from(err: EmitError) -> Self {
        BridgeError::Emit(err)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::events::KeyAction;
    use crate::keymap::{NamedKey, Symbol};
    use crate::packet::{encode, PACKET_BITS};
    use crate::report::{KeyboardReport, KeyboardState, MAX_KEYS};
    use crate::sampler::feed_packet;
    use core::future::Future;
    use embassy_futures::block_on;
    use std::vec::Vec;

    // Records emitted events; optionally fails every call.
    struct MockEmitter {
        events: Vec<KeyEvent>,
        fail: Option<EmitError>,
    }

    impl MockEmitter {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                fail: None,
            }
        }

        fn presses(&self) -> Vec<(Symbol, KeyAction)> {
            self.events.iter().map(|e| (e.symbol, e.action)).collect()
        }
    }

    impl InputEmitter for MockEmitter {
        fn emit(&mut self, event: &KeyEvent) -> impl Future<Output = Result<(), EmitError>> {
            let result = match self.fail {
                Some(err) => Err(err),
                None => {
                    self.events.push(*event);
                    Ok(())
                }
            };
            core::future::ready(result)
        }

        fn refresh(&mut self) -> impl Future<Output = Result<(), EmitError>> {
            core::future::ready(self.fail.map_or(Ok(()), Err))
        }

        fn is_ready(&self) -> bool {
            self.fail.is_none()
        }
    }

    // Keyboard model over a link that drops writes while `link_up` is false.
    // A failed write clears `ready` until the test reconnects.
    struct MockKeyboard {
        keys: KeyboardState,
        host: Vec<KeyboardReport>,
        link_up: bool,
        ready: bool,
    }

    impl MockKeyboard {
        fn new() -> Self {
            Self {
                keys: KeyboardState::new(),
                host: Vec::new(),
                link_up: true,
                ready: true,
            }
        }

        fn reconnect(&mut self) {
            self.link_up = true;
            self.ready = true;
        }

        fn write(&mut self) -> Result<(), EmitError> {
            if !self.ready {
                return Err(EmitError::NotReady);
            }
            if !self.link_up {
                self.ready = false;
                return Err(EmitError::Io);
            }
            self.host.push(self.keys.report());
            Ok(())
        }

        fn host_keys(&self) -> [u8; MAX_KEYS] {
            self.host.last().map_or([0; MAX_KEYS], |r| r.keycodes)
        }
    }

    impl InputEmitter for MockKeyboard {
        fn emit(&mut self, event: &KeyEvent) -> impl Future<Output = Result<(), EmitError>> {
            let result = match self.keys.apply(event) {
                Ok(true) => self.write(),
                Ok(false) => Ok(()),
                Err(e) => Err(e),
            };
            core::future::ready(result)
        }

        fn refresh(&mut self) -> impl Future<Output = Result<(), EmitError>> {
            core::future::ready(self.write())
        }

        fn is_ready(&self) -> bool {
            self.ready
        }
    }

    fn bridge<'a>(samplers: &'a [EdgeSampler; 2]) -> GripBridge<'a, MockEmitter> {
        GripBridge::new(
            PortDecoder::new(PortId::Js1, &samplers[0], Keymap::js1().unwrap()),
            PortDecoder::new(PortId::Js2, &samplers[1], Keymap::js2().unwrap()),
            MockEmitter::new(),
        )
    }

    #[test]
    fn test_up_on_port1_presses_up_arrow() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);

        feed_packet(&samplers[0], encode(Buttons::UP));
        assert_eq!(block_on(bridge.process_one()), Ok(1));
        assert_eq!(
            bridge.emitter().presses(),
            [(Symbol::Named(NamedKey::UpArrow), KeyAction::Press)]
        );
        assert_eq!(bridge.port(PortId::Js1).buttons(), Buttons::UP);
    }

    #[test]
    fn test_port2_release_left_keeps_red() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);

        feed_packet(&samplers[1], encode(Buttons::LEFT | Buttons::RED));
        assert_eq!(block_on(bridge.process_one()), Ok(2));
        bridge.emitter_mut().events.clear();

        feed_packet(&samplers[1], encode(Buttons::RED));
        assert_eq!(block_on(bridge.process_one()), Ok(1));
        let event = bridge.emitter().events[0];
        assert_eq!(event.port, PortId::Js2);
        assert_eq!(event.symbol, Symbol::Char('a'));
        assert_eq!(event.action, KeyAction::Release);
    }

    #[test]
    fn test_corrupted_packet_between_identical_packets() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        let packet = encode(Buttons::GREEN | Buttons::L2);

        feed_packet(&samplers[0], packet);
        assert_eq!(block_on(bridge.poll()), Ok(2));

        feed_packet(&samplers[0], RawPacket::new(packet.bits() ^ 0b10));
        assert_eq!(block_on(bridge.poll()), Ok(0));
        assert_eq!(bridge.port(PortId::Js1).buttons(), Buttons::GREEN | Buttons::L2);

        feed_packet(&samplers[0], packet);
        assert_eq!(block_on(bridge.poll()), Ok(0));

        assert_eq!(bridge.emitter().events.len(), 2);
        let stats = bridge.port(PortId::Js1).stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.resyncs, 0);
    }

    #[test]
    fn test_first_empty_packet_emits_nothing() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);

        feed_packet(&samplers[1], encode(Buttons::NONE));
        assert_eq!(block_on(bridge.process_one()), Ok(0));
        assert!(bridge.emitter().events.is_empty());
        assert_eq!(bridge.port(PortId::Js2).stats().accepted, 1);
    }

    #[test]
    fn test_repeated_invalid_packets_emit_nothing() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);

        for _ in 0..5 {
            feed_packet(&samplers[0], RawPacket::new(0));
            assert_eq!(block_on(bridge.poll()), Ok(0));
        }
        assert!(bridge.emitter().events.is_empty());
        assert_eq!(bridge.port(PortId::Js1).stats().framing_errors, 5);
    }

    #[test]
    fn test_poll_with_nothing_ready() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        assert_eq!(block_on(bridge.poll()), Ok(0));
    }

    #[test]
    fn test_ports_are_independent() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);

        feed_packet(&samplers[0], encode(Buttons::START));
        feed_packet(&samplers[1], encode(Buttons::START));
        assert_eq!(block_on(bridge.poll()), Ok(2));
        assert_eq!(
            bridge.emitter().presses(),
            [
                (Symbol::Named(NamedKey::Return), KeyAction::Press),
                (Symbol::Char('z'), KeyAction::Press),
            ]
        );
    }

    #[test]
    fn test_emit_error_is_reported() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        bridge.emitter_mut().fail = Some(EmitError::NotReady);

        feed_packet(&samplers[0], encode(Buttons::BLUE));
        assert_eq!(
            block_on(bridge.process_one()),
            Err(BridgeError::Emit(EmitError::NotReady))
        );
        // The bitmap still advances; the same packet is not retried.
        assert_eq!(bridge.port(PortId::Js1).buttons(), Buttons::BLUE);
        bridge.emitter_mut().fail = None;
        feed_packet(&samplers[0], encode(Buttons::BLUE));
        assert_eq!(block_on(bridge.process_one()), Ok(0));
    }

    #[test]
    fn test_refresh_restores_key_held_through_failed_write() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = GripBridge::new(
            PortDecoder::new(PortId::Js1, &samplers[0], Keymap::js1().unwrap()),
            PortDecoder::new(PortId::Js2, &samplers[1], Keymap::js2().unwrap()),
            MockKeyboard::new(),
        );
        let up_and_return = [0x52, 0x28, 0, 0, 0, 0];

        bridge.emitter_mut().link_up = false;
        feed_packet(&samplers[0], encode(Buttons::UP));
        assert_eq!(
            block_on(bridge.process_one()),
            Err(BridgeError::Emit(EmitError::Io))
        );
        assert!(!bridge.emitter().is_ready());

        // Pressed while disconnected: refused, but still tracked.
        feed_packet(&samplers[0], encode(Buttons::UP | Buttons::START));
        assert_eq!(
            block_on(bridge.process_one()),
            Err(BridgeError::Emit(EmitError::NotReady))
        );
        assert!(bridge.emitter().host.is_empty());

        bridge.emitter_mut().reconnect();
        assert_eq!(block_on(bridge.refresh()), Ok(()));
        assert_eq!(bridge.emitter().host_keys(), up_and_return);

        // Still held: no new transitions, host keeps both keys.
        feed_packet(&samplers[0], encode(Buttons::UP | Buttons::START));
        assert_eq!(block_on(bridge.process_one()), Ok(0));
        assert_eq!(bridge.emitter().host_keys(), up_and_return);

        feed_packet(&samplers[0], encode(Buttons::NONE));
        assert_eq!(block_on(bridge.process_one()), Ok(2));
        assert_eq!(bridge.emitter().host_keys(), [0; MAX_KEYS]);
    }

    #[test]
    fn test_refresh_reports_emitter_error() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        bridge.emitter_mut().fail = Some(EmitError::NotReady);
        assert_eq!(
            block_on(bridge.refresh()),
            Err(BridgeError::Emit(EmitError::NotReady))
        );
    }

    #[test]
    fn test_misaligned_stream_resynchronizes() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        let packet = encode(Buttons::YELLOW);

        // Join the stream seven bits into a packet.
        for bit in (0..PACKET_BITS - 7).rev() {
            samplers[0].on_edge(packet.bits() & (1 << bit) != 0);
        }

        let mut emitted = 0;
        for _ in 0..6 {
            for bit in (0..PACKET_BITS).rev() {
                samplers[0].on_edge(packet.bits() & (1 << bit) != 0);
                emitted += block_on(bridge.poll()).unwrap();
            }
        }

        assert_eq!(emitted, 1);
        assert_eq!(bridge.emitter().presses(), [(Symbol::Char(' '), KeyAction::Press)]);
        let stats = bridge.port(PortId::Js1).stats();
        assert_eq!(stats.resyncs, 1);
        assert!(stats.accepted >= 1);
        assert_eq!(samplers[0].stats().slips, 1);
    }

    #[test]
    fn test_lost_clock_edge_recovers_alignment() {
        let samplers = [EdgeSampler::new(), EdgeSampler::new()];
        let mut bridge = bridge(&samplers);
        let packet = encode(Buttons::YELLOW);
        let bits = || (0..PACKET_BITS).rev().map(move |bit| packet.bits() & (1 << bit) != 0);

        let mut emitted = 0;
        for level in bits() {
            samplers[0].on_edge(level);
            emitted += block_on(bridge.poll()).unwrap();
        }
        assert_eq!(emitted, 1);

        // One edge of the second packet never reaches the sampler.
        for (i, level) in bits().enumerate() {
            if i != 10 {
                samplers[0].on_edge(level);
                emitted += block_on(bridge.poll()).unwrap();
            }
        }

        for _ in 0..6 {
            for level in bits() {
                samplers[0].on_edge(level);
                emitted += block_on(bridge.poll()).unwrap();
            }
        }

        assert_eq!(emitted, 1);
        assert_eq!(bridge.port(PortId::Js1).buttons(), Buttons::YELLOW);
        assert_eq!(bridge.port(PortId::Js1).stats().resyncs, 1);
        assert_eq!(samplers[0].stats().slips, 1);
    }
}
