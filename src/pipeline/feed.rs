//! Turning raw sensor samples into candidate readings.
//!
//! A [`ReadingPipeline`] is cranked once per polling cycle by the delivery
//! session. Temperature readings come straight off the device; vitals
//! readings go through the sliding window, the contact gate, and the
//! estimator first.

use crate::pipeline::quality;
use crate::pipeline::readings::{TemperatureReading, VitalsReading};
use crate::pipeline::reduce::Reading;
use crate::pipeline::vitals::VitalsEstimator;
use crate::pipeline::windowing::SampleWindow;
use crate::sensor::{PulseSample, SampleSource, SensorError, SensorGuard};
use std::collections::VecDeque;

/// Result of one turn of the raw-sample crank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineStep<R> {
    /// A candidate reading, with the producing algorithm's own verdict.
    Reading { value: R, algorithm_valid: bool },
    /// Contact with the sensor was lost; the in-progress batch must be
    /// cleared before the cycle continues.
    ContactLost,
    /// Nothing to report this cycle.
    Pending,
}

/// A sampling front-end the delivery session can drive.
pub trait ReadingPipeline {
    type Reading: Reading;

    /// Advance one cycle: poll the source and produce at most one reading.
    fn next(&mut self) -> Result<PipelineStep<Self::Reading>, SensorError>;
}

/// Temperature front-end: each raw sample is one reading, with the fixed
/// calibration offset applied.
pub struct TemperaturePipeline<S: SampleSource<Sample = f64>> {
    source: SensorGuard<S>,
    calibration_offset: f64,
    pending: VecDeque<f64>,
}

impl<S: SampleSource<Sample = f64>> TemperaturePipeline<S> {
    pub fn new(source: S, calibration_offset: f64) -> Self {
        Self {
            source: SensorGuard::new(source),
            calibration_offset,
            pending: VecDeque::new(),
        }
    }
}

impl<S: SampleSource<Sample = f64>> ReadingPipeline for TemperaturePipeline<S> {
    type Reading = TemperatureReading;

    fn next(&mut self) -> Result<PipelineStep<TemperatureReading>, SensorError> {
        // Drained samples are handed out one per cycle so every observation
        // counts toward the batch in order.
        if self.pending.is_empty() {
            self.pending.extend(self.source.poll()?);
        }
        match self.pending.pop_front() {
            Some(raw) => Ok(PipelineStep::Reading {
                value: TemperatureReading(raw + self.calibration_offset),
                algorithm_valid: true,
            }),
            None => Ok(PipelineStep::Pending),
        }
    }
}

/// Pulse-oximetry front-end: samples slide through the window; once it is
/// full, each drain cycle yields one estimate, gated on finger contact.
pub struct PulsePipeline<S, E>
where
    S: SampleSource<Sample = PulseSample>,
    E: VitalsEstimator,
{
    source: SensorGuard<S>,
    window: SampleWindow,
    estimator: E,
}

impl<S, E> PulsePipeline<S, E>
where
    S: SampleSource<Sample = PulseSample>,
    E: VitalsEstimator,
{
    pub fn new(source: S, estimator: E) -> Self {
        Self {
            source: SensorGuard::new(source),
            window: SampleWindow::new(),
            estimator,
        }
    }
}

impl<S, E> ReadingPipeline for PulsePipeline<S, E>
where
    S: SampleSource<Sample = PulseSample>,
    E: VitalsEstimator,
{
    type Reading = VitalsReading;

    fn next(&mut self) -> Result<PipelineStep<VitalsReading>, SensorError> {
        let drained = self.source.poll()?;
        if drained.is_empty() {
            return Ok(PipelineStep::Pending);
        }
        for sample in drained {
            self.window.push(sample);
        }
        if !self.window.is_full() {
            return Ok(PipelineStep::Pending);
        }

        if !quality::contact_present(&self.window) {
            return Ok(PipelineStep::ContactLost);
        }

        // The window is not cleared: the next cycle sees it shifted by
        // however many samples this drain brought in.
        let estimate = self.estimator.estimate(&self.window);
        Ok(PipelineStep::Reading {
            value: VitalsReading {
                bpm: estimate.bpm,
                spo2: estimate.spo2,
            },
            algorithm_valid: estimate.algorithm_valid(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::vitals::VitalsEstimate;
    use crate::sensor::ChannelSource;

    /// Estimator stub returning a fixed estimate, counting invocations.
    struct FixedEstimator {
        estimate: VitalsEstimate,
        calls: usize,
    }

    impl FixedEstimator {
        fn new(bpm: f64, spo2: f64) -> Self {
            Self {
                estimate: VitalsEstimate {
                    bpm,
                    bpm_valid: true,
                    spo2,
                    spo2_valid: true,
                },
                calls: 0,
            }
        }
    }

    impl VitalsEstimator for FixedEstimator {
        fn estimate(&mut self, _window: &SampleWindow) -> VitalsEstimate {
            self.calls += 1;
            self.estimate
        }
    }

    #[test]
    fn test_temperature_applies_calibration_offset() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = TemperaturePipeline::new(source, 6.7);

        sender.send(29.8).unwrap();
        match pipeline.next().unwrap() {
            PipelineStep::Reading {
                value,
                algorithm_valid,
            } => {
                assert!((value.0 - 36.5).abs() < 1e-9);
                assert!(algorithm_valid);
            }
            other => panic!("expected a reading, got {other:?}"),
        }
    }

    #[test]
    fn test_temperature_emits_one_reading_per_cycle() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = TemperaturePipeline::new(source, 0.0);

        sender.send(35.0).unwrap();
        sender.send(36.0).unwrap();

        assert!(matches!(
            pipeline.next().unwrap(),
            PipelineStep::Reading { value, .. } if value.0 == 35.0
        ));
        assert!(matches!(
            pipeline.next().unwrap(),
            PipelineStep::Reading { value, .. } if value.0 == 36.0
        ));
        assert_eq!(pipeline.next().unwrap(), PipelineStep::Pending);
    }

    #[test]
    fn test_pulse_pending_until_window_full() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = PulsePipeline::new(source, FixedEstimator::new(72.0, 97.0));

        for _ in 0..99 {
            sender.send(PulseSample::new(90_000, 85_000)).unwrap();
        }
        assert_eq!(pipeline.next().unwrap(), PipelineStep::Pending);
        assert_eq!(pipeline.estimator.calls, 0);

        sender.send(PulseSample::new(90_000, 85_000)).unwrap();
        assert!(matches!(
            pipeline.next().unwrap(),
            PipelineStep::Reading { .. }
        ));
        assert_eq!(pipeline.estimator.calls, 1);
    }

    #[test]
    fn test_pulse_reports_contact_lost_when_window_goes_dim() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = PulsePipeline::new(source, FixedEstimator::new(72.0, 97.0));

        for _ in 0..100 {
            sender.send(PulseSample::new(1_000, 900)).unwrap();
        }
        assert_eq!(pipeline.next().unwrap(), PipelineStep::ContactLost);
        // The gate short-circuits the estimator entirely
        assert_eq!(pipeline.estimator.calls, 0);
    }

    #[test]
    fn test_pulse_estimates_once_per_drain_cycle() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = PulsePipeline::new(source, FixedEstimator::new(72.0, 97.0));

        // A single drain of 150 queued samples yields one estimate, not 50.
        for _ in 0..150 {
            sender.send(PulseSample::new(90_000, 85_000)).unwrap();
        }
        assert!(matches!(
            pipeline.next().unwrap(),
            PipelineStep::Reading { .. }
        ));
        assert_eq!(pipeline.estimator.calls, 1);

        // No new samples: nothing to do this cycle.
        assert_eq!(pipeline.next().unwrap(), PipelineStep::Pending);
        assert_eq!(pipeline.estimator.calls, 1);
    }

    #[test]
    fn test_pulse_source_failure_propagates() {
        let (sender, source) = ChannelSource::new();
        let mut pipeline = PulsePipeline::new(source, FixedEstimator::new(72.0, 97.0));
        drop(sender);

        assert!(pipeline.next().is_err());
    }
}
