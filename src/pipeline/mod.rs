//! The sampling-window, validity-filtering, and batch-aggregation pipeline.
//!
//! This module contains:
//! - Sliding sample window feeding the vitals estimator
//! - Signal-quality (finger contact) gating
//! - Batch accumulation with per-kind ingestion policies
//! - Range-gated median reduction to wire payloads

pub mod batch;
pub mod feed;
pub mod quality;
pub mod readings;
pub mod reduce;
pub mod vitals;
pub mod windowing;

// Re-export commonly used types
pub use batch::{BatchAccumulator, IngestOutcome, IngestPolicy};
pub use feed::{PipelineStep, PulsePipeline, ReadingPipeline, TemperaturePipeline};
pub use quality::{contact_present, CONTACT_THRESHOLD};
pub use readings::{TemperaturePayload, TemperatureReading, VitalsPayload, VitalsReading};
pub use reduce::{median, reduce, BatchResult, Reading};
pub use vitals::{VitalsEstimate, VitalsEstimator, WaveformEstimator, DEFAULT_SAMPLE_RATE_HZ};
pub use windowing::{SampleWindow, WINDOW_CAPACITY};
