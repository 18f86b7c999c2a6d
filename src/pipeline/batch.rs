//! Batch accumulation and the close/retry state machine.
//!
//! The accumulator is a per-session value object; there is no process-wide
//! accumulation state. Transitions are named rather than inferred from loop
//! control flow: [`BatchAccumulator::ingest`] reports what happened to the
//! reading, and [`BatchAccumulator::reset`] is the signal-loss side effect.

use crate::pipeline::reduce::{reduce, BatchResult, Reading};

/// How readings count toward the batch capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPolicy {
    /// Every reading counts; the plausibility range is applied only once,
    /// to the whole batch at close time. Used for temperature.
    IngestAll,
    /// Only readings the producing algorithm flagged valid count; the range
    /// filter still runs again at close time as an independent second gate.
    /// Used for vitals.
    IngestIfAlgorithmValid,
}

/// What happened to a reading offered to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome<P> {
    /// Appended; the batch is still open at the given fill level.
    Accumulated(usize),
    /// Did not count toward the batch (algorithm flagged it invalid).
    Rejected,
    /// This reading triggered capacity. The batch closed atomically and was
    /// reduced; a fresh empty batch is already accumulating.
    Closed(BatchResult<P>),
}

/// Collects readings until capacity, then closes and reduces the batch.
pub struct BatchAccumulator<R: Reading> {
    capacity: usize,
    policy: IngestPolicy,
    readings: Vec<R>,
}

impl<R: Reading> BatchAccumulator<R> {
    pub fn new(capacity: usize, policy: IngestPolicy) -> Self {
        Self {
            capacity: capacity.max(1),
            policy,
            readings: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Offer one reading, with the producing algorithm's own verdict.
    pub fn ingest(&mut self, reading: R, algorithm_valid: bool) -> IngestOutcome<R::Payload> {
        if self.policy == IngestPolicy::IngestIfAlgorithmValid && !algorithm_valid {
            return IngestOutcome::Rejected;
        }

        self.readings.push(reading);
        if self.readings.len() < self.capacity {
            return IngestOutcome::Accumulated(self.readings.len());
        }

        // Atomic close: nothing observed after the triggering reading can
        // belong to this batch.
        let batch = std::mem::take(&mut self.readings);
        IngestOutcome::Closed(reduce(&batch))
    }

    /// Drop everything accumulated so far (signal-quality loss). The batch
    /// stays in the accumulating state, just empty.
    pub fn reset(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::readings::{TemperaturePayload, TemperatureReading, VitalsReading};

    #[test]
    fn test_closes_exactly_at_capacity() {
        let mut acc = BatchAccumulator::new(10, IngestPolicy::IngestAll);

        for i in 1..10 {
            match acc.ingest(TemperatureReading(36.0), true) {
                IngestOutcome::Accumulated(n) => assert_eq!(n, i),
                other => panic!("unexpected outcome before capacity: {other:?}"),
            }
        }
        assert!(matches!(
            acc.ingest(TemperatureReading(36.0), true),
            IngestOutcome::Closed(BatchResult::Ready(_))
        ));
        // Close is atomic: the next reading starts a fresh batch.
        assert!(acc.is_empty());
    }

    #[test]
    fn test_ingest_all_counts_implausible_readings() {
        let mut acc = BatchAccumulator::new(3, IngestPolicy::IngestAll);

        // Out-of-range readings still advance the capacity trigger...
        acc.ingest(TemperatureReading(1000.0), true);
        acc.ingest(TemperatureReading(1000.0), true);
        let outcome = acc.ingest(TemperatureReading(1000.0), true);

        // ...and a batch where nothing survives is discarded.
        assert_eq!(outcome, IngestOutcome::Closed(BatchResult::Discarded));
    }

    #[test]
    fn test_algorithm_invalid_readings_do_not_count() {
        let mut acc = BatchAccumulator::new(2, IngestPolicy::IngestIfAlgorithmValid);
        let reading = VitalsReading { bpm: 72.0, spo2: 97.0 };

        assert_eq!(acc.ingest(reading, false), IngestOutcome::Rejected);
        assert_eq!(acc.ingest(reading, false), IngestOutcome::Rejected);
        assert_eq!(acc.len(), 0);

        assert_eq!(acc.ingest(reading, true), IngestOutcome::Accumulated(1));
        assert!(matches!(
            acc.ingest(reading, true),
            IngestOutcome::Closed(BatchResult::Ready(_))
        ));
    }

    #[test]
    fn test_ingest_all_ignores_algorithm_flag() {
        // Temperature has no producing-algorithm verdict; the flag is moot.
        let mut acc = BatchAccumulator::new(2, IngestPolicy::IngestAll);
        assert_eq!(
            acc.ingest(TemperatureReading(36.0), false),
            IngestOutcome::Accumulated(1)
        );
    }

    #[test]
    fn test_reset_clears_in_progress_batch() {
        let mut acc = BatchAccumulator::new(5, IngestPolicy::IngestAll);
        acc.ingest(TemperatureReading(36.0), true);
        acc.ingest(TemperatureReading(36.5), true);
        assert_eq!(acc.len(), 2);

        acc.reset();
        assert!(acc.is_empty());

        // The next reading starts a fresh batch of length 1.
        assert_eq!(
            acc.ingest(TemperatureReading(37.0), true),
            IngestOutcome::Accumulated(1)
        );
    }

    #[test]
    fn test_close_filters_then_takes_median() {
        let mut acc = BatchAccumulator::new(10, IngestPolicy::IngestAll);
        let mut last = IngestOutcome::Rejected;
        for t in [35.0, 36.0, 36.5, 37.0, 1000.0, 38.0, 39.0, 40.0, 41.0, 42.0] {
            last = acc.ingest(TemperatureReading(t), true);
        }
        assert_eq!(
            last,
            IngestOutcome::Closed(BatchResult::Ready(TemperaturePayload {
                temperature: 38.0
            }))
        );
    }
}
