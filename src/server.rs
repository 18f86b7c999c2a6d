//! TCP delivery: the serial accept loop and the per-connection session.
//!
//! One `DeliverySession` exists at a time. It owns the accepted connection
//! and a pipeline (which owns the sensor), drives the
//! accumulate→reduce→send cycle, and implements the batch-retry and
//! session-termination policy.

use crate::config::DeliveryMode;
use crate::pipeline::{
    BatchAccumulator, BatchResult, IngestOutcome, IngestPolicy, PipelineStep, Reading,
    ReadingPipeline,
};
use crate::sensor::SensorError;
use crate::stats::SharedSessionStats;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cadence at which the accept loop re-checks for connections and for the
/// process stop flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Server-level errors.
#[derive(Debug)]
pub enum ServerError {
    /// Could not bind or configure the listener.
    Bind(io::Error),
    /// The sensor capability could not be brought up.
    Sensor(SensorError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "failed to bind listener: {e}"),
            ServerError::Sensor(e) => write!(f, "sensor capability failed: {e}"),
        }
    }
}

impl std::error::Error for ServerError {}

/// How a delivery session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// One-shot: the first payload was delivered and the connection closed.
    Delivered,
    /// The peer reset or closed the connection during a write.
    PeerDisconnected,
    /// The process-level stop flag was raised.
    Interrupted,
}

/// Per-session knobs, split from [`ServerConfig`] so sessions can be driven
/// directly in tests.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: DeliveryMode,
    pub batch_capacity: usize,
    pub ingest_policy: IngestPolicy,
    /// Delay between polling cycles; bounds CPU and sampling cadence.
    pub poll_interval: Duration,
}

/// One accepted connection and its accumulation/delivery state.
pub struct DeliverySession<P: ReadingPipeline, W: Write> {
    pipeline: P,
    conn: W,
    accumulator: BatchAccumulator<P::Reading>,
    options: SessionOptions,
    stats: SharedSessionStats,
}

impl<P: ReadingPipeline, W: Write> DeliverySession<P, W> {
    pub fn new(pipeline: P, conn: W, options: SessionOptions, stats: SharedSessionStats) -> Self {
        let accumulator = BatchAccumulator::new(options.batch_capacity, options.ingest_policy);
        Self {
            pipeline,
            conn,
            accumulator,
            options,
            stats,
        }
    }

    /// Drive the accumulate→reduce→send cycle until the session ends.
    ///
    /// A discarded batch is retried by re-accumulating on this same
    /// connection. Only a successful one-shot delivery, a peer disconnect,
    /// an interrupt, or a sensor failure ends the session.
    pub fn run(&mut self, running: &AtomicBool) -> Result<SessionEnd, SensorError> {
        loop {
            if !running.load(Ordering::SeqCst) {
                return Ok(SessionEnd::Interrupted);
            }

            match self.pipeline.next()? {
                PipelineStep::Pending => {}
                PipelineStep::ContactLost => {
                    if !self.accumulator.is_empty() {
                        tracing::info!(
                            cleared = self.accumulator.len(),
                            "contact lost, clearing in-progress batch"
                        );
                        self.accumulator.reset();
                    }
                }
                PipelineStep::Reading {
                    value,
                    algorithm_valid,
                } => {
                    self.stats.record_reading();
                    match self.accumulator.ingest(value, algorithm_valid) {
                        IngestOutcome::Accumulated(fill) => {
                            tracing::debug!(fill, "reading accumulated");
                        }
                        IngestOutcome::Rejected => {
                            tracing::debug!("reading rejected by producing algorithm");
                        }
                        IngestOutcome::Closed(result) => {
                            self.stats.record_batch_closed();
                            match result {
                                BatchResult::Discarded => {
                                    self.stats.record_batch_discarded();
                                    tracing::info!(
                                        "batch discarded, no reading survived range \
                                         filtering; re-accumulating"
                                    );
                                }
                                BatchResult::Ready(payload) => {
                                    if let Err(e) = self.send(&payload) {
                                        tracing::warn!(
                                            error = %e,
                                            "peer disconnected during delivery"
                                        );
                                        return Ok(SessionEnd::PeerDisconnected);
                                    }
                                    self.stats.record_payload_sent();
                                    tracing::info!("payload delivered");
                                    if self.options.mode == DeliveryMode::OneShot {
                                        return Ok(SessionEnd::Delivered);
                                    }
                                }
                            }
                        }
                    }
                }
            }

            if !self.options.poll_interval.is_zero() {
                thread::sleep(self.options.poll_interval);
            }
        }
    }

    /// Serialize the payload to one UTF-8 JSON document and write it once.
    /// Streaming connections carry multiple documents, so they get newline
    /// framing; a one-shot connection carries exactly one bare document.
    fn send(&mut self, payload: &<P::Reading as Reading>::Payload) -> io::Result<()> {
        let mut encoded = serde_json::to_vec(payload).map_err(io::Error::other)?;
        if self.options.mode == DeliveryMode::Streaming {
            encoded.push(b'\n');
        }
        self.conn.write_all(&encoded)?;
        self.conn.flush()
    }
}

/// Deployment settings for one telemetry listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub mode: DeliveryMode,
    pub batch_capacity: usize,
    pub ingest_policy: IngestPolicy,
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ([127, 0, 0, 1], 65432).into(),
            mode: DeliveryMode::OneShot,
            batch_capacity: 10,
            ingest_policy: IngestPolicy::IngestAll,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Serial accept loop: one delivery session at a time, a fresh pipeline per
/// session.
pub struct TelemetryServer {
    listener: TcpListener,
    config: ServerConfig,
    stats: SharedSessionStats,
    running: Arc<AtomicBool>,
}

impl TelemetryServer {
    /// Bind the listener. The listener itself polls in non-blocking mode so
    /// an interrupt can stop the loop; accepted connections keep blocking
    /// semantics.
    pub fn bind(
        config: ServerConfig,
        stats: SharedSessionStats,
        running: Arc<AtomicBool>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.listen).map_err(ServerError::Bind)?;
        listener.set_nonblocking(true).map_err(ServerError::Bind)?;
        Ok(Self {
            listener,
            config,
            stats,
            running,
        })
    }

    /// The address actually bound (differs from the configured one when
    /// port 0 was requested).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until the stop flag is raised.
    ///
    /// `make_pipeline` is invoked once per accepted connection; a failure to
    /// bring the sensor capability up is fatal to the whole server. A
    /// sensor failure mid-session only ends that session.
    pub fn run<P, F>(&self, mut make_pipeline: F) -> Result<(), ServerError>
    where
        P: ReadingPipeline,
        F: FnMut() -> Result<P, SensorError>,
    {
        tracing::info!(addr = ?self.local_addr().ok(), "telemetry server listening");

        while self.running.load(Ordering::SeqCst) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
            };
            if let Err(e) = stream.set_nonblocking(false) {
                tracing::warn!(error = %e, "could not configure accepted connection");
                continue;
            }

            tracing::info!(%peer, "client connected");
            self.stats.record_session();

            let pipeline = make_pipeline().map_err(ServerError::Sensor)?;
            let options = SessionOptions {
                mode: self.config.mode,
                batch_capacity: self.config.batch_capacity,
                ingest_policy: self.config.ingest_policy,
                poll_interval: self.config.poll_interval,
            };
            let mut session = DeliverySession::new(pipeline, stream, options, self.stats.clone());

            match session.run(&self.running) {
                Ok(end) => tracing::info!(%peer, outcome = ?end, "session ended"),
                Err(e) => tracing::warn!(%peer, error = %e, "session ended on sensor failure"),
            }
            // The session drops here, and with it the pipeline's sensor
            // guard: the sensor is powered down before the next accept.
        }

        Ok(())
    }
}
