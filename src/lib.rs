//! Vitalstream - physiological sensor telemetry over TCP.
//!
//! This library polls a physiological sensor (skin temperature, or a
//! photoplethysmography front-end yielding heart rate and blood-oxygen
//! saturation), filters out implausible readings, reduces each batch to its
//! median, and pushes one JSON payload per completed batch to a connected
//! consumer.
//!
//! # Robustness Guarantees
//!
//! - **No single-sample output**: every value on the wire is the median of a
//!   capacity-bounded batch of readings
//! - **Two validity authorities**: the producing algorithm's own flag and an
//!   independent plausibility range both gate what reaches the median
//! - **Batch-level retry**: a batch with no surviving readings is discarded
//!   and re-accumulated on the same connection, never by reconnecting
//! - **Scoped sensor ownership**: the sensor capability is powered down on
//!   every exit path, including interrupt
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Vitalstream                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌─────────────┐  │
//! │  │  Sample  │──▶│ Sliding  │──▶│  Quality  │──▶│   Vitals    │  │
//! │  │  Source  │   │  Window  │   │   Gate    │   │  Estimator  │  │
//! │  └──────────┘   └──────────┘   └───────────┘   └─────────────┘  │
//! │        │                                              │         │
//! │        ▼                                              ▼         │
//! │  ┌──────────┐   ┌───────────────┐   ┌──────────────────────┐   │
//! │  │ Session  │◀──│ Median Reduce │◀──│  Batch Accumulator   │   │
//! │  │  Stats   │   │ (range-gated) │   │ (capacity + policy)  │   │
//! │  └──────────┘   └───────────────┘   └──────────────────────┘   │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                 ┌─────────────────┐                             │
//! │                 │ DeliverySession │──▶ one JSON payload / batch │
//! │                 └─────────────────┘                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use vitalstream::{
//!     pipeline::TemperaturePipeline,
//!     sensor::SyntheticThermometer,
//!     server::TelemetryServer,
//!     stats::SessionStats,
//! };
//!
//! let config = vitalstream::server::ServerConfig::default();
//! let stats = Arc::new(SessionStats::new());
//! let running = Arc::new(AtomicBool::new(true));
//!
//! let server = TelemetryServer::bind(config, stats, running).expect("bind failed");
//! server
//!     .run(|| Ok(TemperaturePipeline::new(SyntheticThermometer::new(), 6.7)))
//!     .expect("server failed");
//! ```

pub mod config;
pub mod pipeline;
pub mod sensor;
pub mod server;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, DeliveryMode, OximeterConfig, TemperatureConfig};
pub use pipeline::{
    BatchAccumulator, BatchResult, IngestOutcome, IngestPolicy, PipelineStep, PulsePipeline,
    Reading, ReadingPipeline, SampleWindow, TemperaturePipeline, VitalsEstimator,
    WaveformEstimator,
};
pub use sensor::{PulseSample, SampleSource, SensorError, SensorGuard};
pub use server::{DeliverySession, ServerConfig, SessionEnd, TelemetryServer};
pub use stats::{SessionStats, SharedSessionStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
