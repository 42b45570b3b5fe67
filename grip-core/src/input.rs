//! Controller port wiring: clock and data lines feeding an edge sampler.

use crate::sampler::EdgeSampler;
use crate::types::PortId;
use core::convert::Infallible;
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

/// Error type for sampling a controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    /// Waiting for a clock edge failed.
    Clock,
    /// Reading the data level failed.
    Data,
}

/// One controller port: a clock line with edge detection and a data line.
///
/// The clock line must be backed by an edge-capable interrupt; the data line
/// is a plain digital input. Any `embedded-hal` implementation works, which
/// keeps the sampling loop testable with simulated pins.
pub struct ControllerPort<C, D> {
    id: PortId,
    clock: C,
    data: D,
}

impl<C: Wait, D: InputPin> ControllerPort<C, D> {
    pub fn new(id: PortId, clock: C, data: D) -> Self {
        Self { id, clock, data }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Sample one bit: wait for a falling clock edge, then read data.
    ///
    /// The data line is read when the task is polled after the wake, and the
    /// edge wait is re-armed only after that. The clock low phase must be
    /// longer than this wake latency; an edge landing in the re-arm gap is
    /// lost and costs packets until the decoder slips back into alignment.
    pub async fn sample_one(&mut self, sampler: &EdgeSampler) -> Result<(), SampleError> {
        self.clock
            .wait_for_falling_edge()
            .await
            .map_err(|_| SampleError::Clock)?;
        let level = self.data.is_high().map_err(|_| SampleError::Data)?;
        sampler.on_edge(level);
        Ok(())
    }

    /// Feed the sampler forever. Only returns if a pin reports an error.
    pub async fn run(&mut self, sampler: &EdgeSampler) -> Result<Infallible, SampleError> {
        loop {
            self.sample_one(sampler).await?;
        }
    }

    /// Decompose the port into its clock and data lines.
    pub fn into_parts(self) -> (C, D) {
        (self.clock, self.data)
    }
}
