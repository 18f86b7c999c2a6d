//! Heart-rate and oxygen-saturation estimation from a full sample window.
//!
//! The estimation algorithm is a capability of its own: [`VitalsEstimator`]
//! is the seam, and [`WaveformEstimator`] is the built-in implementation
//! (infrared peak detection for the beat rate, ratio-of-ratios for SpO2).
//! Each field carries its own validity flag; the reading is
//! algorithm-valid only when both hold.

use crate::pipeline::windowing::SampleWindow;
use statrs::statistics::Statistics;

/// Default photoplethysmography sample rate, samples per second.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 25.0;

/// Minimum samples between two beats (caps detectable rate at ~375 bpm
/// at the default rate; anything near that is noise anyway).
const MIN_PEAK_SEPARATION: usize = 4;

/// A local maximum must reach this fraction of the tallest excursion to
/// count as a beat.
const PEAK_HEIGHT_FRACTION: f64 = 0.25;

/// One estimation result with per-field validity verdicts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalsEstimate {
    pub bpm: f64,
    pub bpm_valid: bool,
    pub spo2: f64,
    pub spo2_valid: bool,
}

impl VitalsEstimate {
    /// The producing algorithm's overall verdict on this estimate.
    pub fn algorithm_valid(&self) -> bool {
        self.bpm_valid && self.spo2_valid
    }
}

/// The beat/SpO2 estimation capability.
pub trait VitalsEstimator {
    /// Consume the current window contents and produce one estimate.
    /// Called once per raw-sample-drain cycle, only on a full window.
    fn estimate(&mut self, window: &SampleWindow) -> VitalsEstimate;
}

/// Built-in estimator working directly on the raw LED waveforms.
pub struct WaveformEstimator {
    sample_rate_hz: f64,
}

impl WaveformEstimator {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self { sample_rate_hz }
    }
}

impl Default for WaveformEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE_HZ)
    }
}

impl VitalsEstimator for WaveformEstimator {
    fn estimate(&mut self, window: &SampleWindow) -> VitalsEstimate {
        let ir: Vec<f64> = window.ir().collect();
        let red: Vec<f64> = window.red().collect();

        let (bpm, bpm_valid) = estimate_bpm(&ir, self.sample_rate_hz);
        let (spo2, spo2_valid) = estimate_spo2(&ir, &red);

        VitalsEstimate {
            bpm,
            bpm_valid,
            spo2,
            spo2_valid,
        }
    }
}

/// Beat rate from infrared peak spacing.
fn estimate_bpm(ir: &[f64], sample_rate_hz: f64) -> (f64, bool) {
    if ir.len() < 3 {
        return (0.0, false);
    }

    let mean = ir.iter().mean();
    let detrended: Vec<f64> = ir.iter().map(|v| v - mean).collect();
    let tallest = detrended.iter().cloned().fold(f64::MIN, f64::max);
    if tallest <= 0.0 {
        // Flat or monotonically falling signal, no beats to find
        return (0.0, false);
    }
    let height = tallest * PEAK_HEIGHT_FRACTION;

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..detrended.len() - 1 {
        let v = detrended[i];
        if v < height || v <= detrended[i - 1] || v < detrended[i + 1] {
            continue;
        }
        if let Some(last) = peaks.last_mut() {
            if i - *last < MIN_PEAK_SEPARATION {
                // Too close to the previous beat: keep the taller one
                if v > detrended[*last] {
                    *last = i;
                }
                continue;
            }
        }
        peaks.push(i);
    }

    if peaks.len() < 2 {
        return (0.0, false);
    }
    let span = (peaks[peaks.len() - 1] - peaks[0]) as f64;
    let bpm = 60.0 * sample_rate_hz * (peaks.len() - 1) as f64 / span;
    (bpm, bpm.is_finite())
}

/// Oxygen saturation from the ratio of the pulsatile (AC) to steady (DC)
/// components of the two channels.
fn estimate_spo2(ir: &[f64], red: &[f64]) -> (f64, bool) {
    if ir.is_empty() || red.is_empty() {
        return (0.0, false);
    }

    let dc_ir = ir.iter().mean();
    let dc_red = red.iter().mean();
    if dc_ir <= 0.0 || dc_red <= 0.0 {
        return (0.0, false);
    }

    let ac_ir = peak_to_peak(ir);
    let ac_red = peak_to_peak(red);
    if ac_ir <= 0.0 || ac_red <= 0.0 {
        return (0.0, false);
    }

    let ratio = (ac_red / dc_red) / (ac_ir / dc_ir);
    if !ratio.is_finite() || ratio <= 0.0 {
        return (0.0, false);
    }

    // Empirical calibration curve used by the reference front-end
    let spo2 = -45.060 * ratio * ratio + 30.354 * ratio + 94.845;
    (spo2, spo2.is_finite())
}

fn peak_to_peak(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::PulseSample;

    /// 100-sample window of a clean pulse at the given rate.
    fn pulse_window(bpm: f64, ir_dc: f64, ir_ac: f64, red_dc: f64, red_ac: f64) -> SampleWindow {
        let mut window = SampleWindow::with_capacity(100);
        for i in 0..100 {
            let phase = i as f64 * std::f64::consts::TAU * (bpm / 60.0) / DEFAULT_SAMPLE_RATE_HZ;
            window.push(PulseSample::new(
                (ir_dc + ir_ac * phase.sin()) as u32,
                (red_dc + red_ac * phase.sin()) as u32,
            ));
        }
        window
    }

    #[test]
    fn test_estimates_clean_pulse() {
        let window = pulse_window(72.0, 100_000.0, 2_000.0, 95_000.0, 1_140.0);
        let estimate = WaveformEstimator::default().estimate(&window);

        assert!(estimate.bpm_valid);
        assert!(
            estimate.bpm > 60.0 && estimate.bpm < 85.0,
            "bpm {} out of expected band",
            estimate.bpm
        );

        // ratio-of-ratios = (1140/95000)/(2000/100000) = 0.6 -> ~96.8%
        assert!(estimate.spo2_valid);
        assert!(
            estimate.spo2 > 90.0 && estimate.spo2 < 100.0,
            "spo2 {} out of expected band",
            estimate.spo2
        );
        assert!(estimate.algorithm_valid());
    }

    #[test]
    fn test_flat_signal_is_invalid() {
        let mut window = SampleWindow::with_capacity(100);
        for _ in 0..100 {
            window.push(PulseSample::new(80_000, 76_000));
        }

        let estimate = WaveformEstimator::default().estimate(&window);
        assert!(!estimate.bpm_valid);
        assert!(!estimate.algorithm_valid());
    }

    #[test]
    fn test_faster_pulse_reads_higher() {
        let slow = WaveformEstimator::default()
            .estimate(&pulse_window(60.0, 100_000.0, 2_000.0, 95_000.0, 1_140.0));
        let fast = WaveformEstimator::default()
            .estimate(&pulse_window(120.0, 100_000.0, 2_000.0, 95_000.0, 1_140.0));

        assert!(slow.bpm_valid && fast.bpm_valid);
        assert!(fast.bpm > slow.bpm + 20.0);
    }

    #[test]
    fn test_per_field_validity_is_independent() {
        let estimate = VitalsEstimate {
            bpm: 72.0,
            bpm_valid: true,
            spo2: 0.0,
            spo2_valid: false,
        };
        assert!(!estimate.algorithm_valid());
    }
}
