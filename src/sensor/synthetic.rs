//! Non-hardware sample sources.
//!
//! These exist so the binary runs (and the pipeline is testable) without an
//! I2C bus attached. [`SyntheticThermometer`] and [`SyntheticOximeter`]
//! generate deterministic, physiologically plausible waveforms;
//! [`ChannelSource`] lets tests and demos feed scripted samples through a
//! channel sender.

use crate::sensor::types::PulseSample;
use crate::sensor::{SampleSource, SensorError};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// Heart rate of the synthetic pulse waveform, in beats per minute.
const SYNTHETIC_BPM: f64 = 72.0;

/// Sample rate the synthetic oximeter pretends to run at.
const SYNTHETIC_SAMPLE_RATE_HZ: f64 = 25.0;

/// A thermometer that reports a slowly drifting device-unit value.
///
/// Values are pre-calibration: with the default 6.7 offset applied they land
/// around 36.5 degrees C.
pub struct SyntheticThermometer {
    tick: u64,
    powered: bool,
}

impl SyntheticThermometer {
    pub fn new() -> Self {
        Self {
            tick: 0,
            powered: true,
        }
    }
}

impl Default for SyntheticThermometer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SyntheticThermometer {
    type Sample = f64;

    fn poll(&mut self) -> Result<Vec<f64>, SensorError> {
        if !self.powered {
            return Err(SensorError::Device("thermometer is powered down".into()));
        }
        self.tick += 1;
        let drift = (self.tick as f64 * 0.05).sin() * 0.35;
        Ok(vec![29.8 + drift])
    }

    fn shutdown(&mut self) {
        if self.powered {
            self.powered = false;
            tracing::debug!("synthetic thermometer powered down");
        }
    }
}

/// An oximeter front-end that reports a clean pulse waveform with finger
/// contact present (intensities well above the contact threshold).
pub struct SyntheticOximeter {
    tick: u64,
    powered: bool,
}

impl SyntheticOximeter {
    pub fn new() -> Self {
        Self {
            tick: 0,
            powered: true,
        }
    }

    fn sample_at(tick: u64) -> PulseSample {
        let phase =
            tick as f64 * std::f64::consts::TAU * (SYNTHETIC_BPM / 60.0) / SYNTHETIC_SAMPLE_RATE_HZ;
        let ir = 100_000.0 + 2_000.0 * phase.sin();
        let red = 95_000.0 + 1_140.0 * phase.sin();
        PulseSample::new(ir as u32, red as u32)
    }
}

impl Default for SyntheticOximeter {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SyntheticOximeter {
    type Sample = PulseSample;

    fn poll(&mut self) -> Result<Vec<PulseSample>, SensorError> {
        if !self.powered {
            return Err(SensorError::Device("oximeter is powered down".into()));
        }
        // Hardware drains a small FIFO burst per poll; mimic that shape.
        let burst: Vec<PulseSample> = (0..5)
            .map(|i| Self::sample_at(self.tick + i))
            .collect();
        self.tick += 5;
        Ok(burst)
    }

    fn shutdown(&mut self) {
        if self.powered {
            self.powered = false;
            tracing::debug!("synthetic oximeter powered down");
        }
    }
}

/// A sample source fed from the sending half of a channel.
///
/// `poll` drains everything queued without blocking. Once the sender is
/// dropped and the queue is empty, the source reports
/// [`SensorError::Disconnected`].
pub struct ChannelSource<T> {
    receiver: Receiver<T>,
}

impl<T> ChannelSource<T> {
    /// Create a source plus the sender that feeds it.
    pub fn new() -> (Sender<T>, Self) {
        let (sender, receiver) = unbounded();
        (sender, Self { receiver })
    }
}

impl<T> SampleSource for ChannelSource<T> {
    type Sample = T;

    fn poll(&mut self) -> Result<Vec<T>, SensorError> {
        let mut drained = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(sample) => drained.push(sample),
                Err(TryRecvError::Empty) => return Ok(drained),
                Err(TryRecvError::Disconnected) => {
                    if drained.is_empty() {
                        return Err(SensorError::Disconnected);
                    }
                    return Ok(drained);
                }
            }
        }
    }

    fn shutdown(&mut self) {}
}
