//! Range-gated median reduction of a closed batch.
//!
//! The plausibility ranges here are an authority independent from the
//! producing algorithm's own validity flag: a vitals reading can be rejected
//! twice, once at ingestion and once here, before it is dropped from the
//! median.

use crate::pipeline::readings::{
    TemperaturePayload, TemperatureReading, VitalsPayload, VitalsReading, BPM_MAX, BPM_MIN,
    SPO2_MAX, SPO2_MIN, TEMPERATURE_MAX_C, TEMPERATURE_MIN_C,
};
use serde::Serialize;
use std::cmp::Ordering;

/// A reading kind that can be accumulated, range-checked, and reduced to a
/// wire payload.
pub trait Reading: Clone {
    type Payload: Serialize + PartialEq + std::fmt::Debug;

    /// Stateless plausibility check.
    fn in_range(&self) -> bool;

    /// Median summary of the readings that survived the range filter.
    /// `valid` is never empty.
    fn summarize(valid: &[Self]) -> Self::Payload;
}

/// Outcome of closing a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult<P> {
    /// At least one reading survived range filtering; the payload is ready
    /// to send.
    Ready(P),
    /// Zero readings survived. The batch is dropped and accumulation
    /// resumes on the same connection.
    Discarded,
}

/// Filter a closed batch through the plausibility ranges, then reduce the
/// survivors to their median summary.
pub fn reduce<R: Reading>(batch: &[R]) -> BatchResult<R::Payload> {
    let valid: Vec<R> = batch.iter().filter(|r| r.in_range()).cloned().collect();
    if valid.is_empty() {
        return BatchResult::Discarded;
    }
    BatchResult::Ready(R::summarize(&valid))
}

/// Median of a non-empty slice: sort ascending, take the middle element, or
/// the arithmetic mean of the two middle elements for even lengths.
pub fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Reading for TemperatureReading {
    type Payload = TemperaturePayload;

    fn in_range(&self) -> bool {
        (TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&self.0)
    }

    fn summarize(valid: &[Self]) -> TemperaturePayload {
        let values: Vec<f64> = valid.iter().map(|r| r.0).collect();
        TemperaturePayload {
            temperature: round2(median(&values)),
        }
    }
}

impl Reading for VitalsReading {
    type Payload = VitalsPayload;

    /// Both fields must be plausible for the pair to count.
    fn in_range(&self) -> bool {
        (BPM_MIN..=BPM_MAX).contains(&self.bpm) && (SPO2_MIN..=SPO2_MAX).contains(&self.spo2)
    }

    /// Medians are taken per field over the surviving pairs.
    fn summarize(valid: &[Self]) -> VitalsPayload {
        let bpms: Vec<f64> = valid.iter().map(|r| r.bpm).collect();
        let spo2s: Vec<f64> = valid.iter().map(|r| r.spo2).collect();
        VitalsPayload {
            bpm: median(&bpms).round() as i64,
            spo2: median(&spo2s).round() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median(&[39.0, 35.0, 37.0]), 37.0);
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[34.0, 36.0]), 35.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_median_single_element() {
        assert_eq!(median(&[36.6]), 36.6);
    }

    #[test]
    fn test_temperature_range_bounds() {
        assert!(TemperatureReading(34.0).in_range());
        assert!(TemperatureReading(42.0).in_range());
        assert!(!TemperatureReading(33.99).in_range());
        assert!(!TemperatureReading(42.01).in_range());
    }

    #[test]
    fn test_vitals_pair_needs_both_fields_in_range() {
        assert!(VitalsReading { bpm: 72.0, spo2: 97.0 }.in_range());
        assert!(!VitalsReading { bpm: 250.0, spo2: 97.0 }.in_range());
        assert!(!VitalsReading { bpm: 72.0, spo2: 60.0 }.in_range());
    }

    #[test]
    fn test_reduce_excludes_outliers() {
        // Ten accumulated readings, one implausible: the median is taken
        // over the remaining nine.
        let batch: Vec<TemperatureReading> =
            [35.0, 36.0, 36.5, 37.0, 1000.0, 38.0, 39.0, 40.0, 41.0, 42.0]
                .iter()
                .map(|&t| TemperatureReading(t))
                .collect();

        assert_eq!(
            reduce(&batch),
            BatchResult::Ready(TemperaturePayload { temperature: 38.0 })
        );
    }

    #[test]
    fn test_reduce_discards_when_nothing_survives() {
        let batch = vec![TemperatureReading(25.6); 10];
        assert_eq!(reduce(&batch), BatchResult::Discarded);
    }

    #[test]
    fn test_reduce_rounds_temperature_to_two_decimals() {
        let batch = vec![TemperatureReading(36.558)];
        match reduce(&batch) {
            BatchResult::Ready(payload) => assert_eq!(payload.temperature, 36.56),
            BatchResult::Discarded => panic!("batch should be ready"),
        }
    }

    #[test]
    fn test_reduce_vitals_per_field_medians() {
        let batch = vec![
            VitalsReading { bpm: 70.0, spo2: 99.0 },
            VitalsReading { bpm: 80.0, spo2: 95.0 },
            VitalsReading { bpm: 75.0, spo2: 97.4 },
        ];
        assert_eq!(
            reduce(&batch),
            BatchResult::Ready(VitalsPayload { bpm: 75, spo2: 97 })
        );
    }
}
