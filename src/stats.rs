//! Session statistics.
//!
//! Tracks what the pipeline did (readings, batches, payloads) without ever
//! storing the readings themselves; historical values live only in the
//! consumer that received them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current server run.
#[derive(Debug)]
pub struct SessionStats {
    /// Candidate readings observed by the delivery loop
    readings_observed: AtomicU64,
    /// Batches that reached capacity and closed
    batches_closed: AtomicU64,
    /// Closed batches with zero surviving readings
    batches_discarded: AtomicU64,
    /// Payloads written to a consumer
    payloads_sent: AtomicU64,
    /// Connections served
    sessions_served: AtomicU64,
    /// Server start time
    started: DateTime<Utc>,
    /// Path for persisting cumulative stats
    persist_path: Option<PathBuf>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            readings_observed: AtomicU64::new(0),
            batches_closed: AtomicU64::new(0),
            batches_discarded: AtomicU64::new(0),
            payloads_sent: AtomicU64::new(0),
            sessions_served: AtomicU64::new(0),
            started: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats with persistence, seeding counters from a previous run.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            eprintln!("Note: Could not load previous session stats: {e}");
        }

        stats
    }

    pub fn record_reading(&self) {
        self.readings_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_closed(&self) {
        self.batches_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_discarded(&self) {
        self.batches_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payload_sent(&self) {
        self.payloads_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session(&self) {
        self.sessions_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            readings_observed: self.readings_observed.load(Ordering::Relaxed),
            batches_closed: self.batches_closed.load(Ordering::Relaxed),
            batches_discarded: self.batches_discarded.load(Ordering::Relaxed),
            payloads_sent: self.payloads_sent.load(Ordering::Relaxed),
            sessions_served: self.sessions_served.load(Ordering::Relaxed),
            started: self.started,
            uptime_secs: (Utc::now() - self.started).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "Server Statistics:\n\
             - Sessions served: {}\n\
             - Readings observed: {}\n\
             - Batches closed: {}\n\
             - Batches discarded: {}\n\
             - Payloads sent: {}\n\
             - Uptime: {} seconds",
            snapshot.sessions_served,
            snapshot.readings_observed,
            snapshot.batches_closed,
            snapshot.batches_discarded,
            snapshot.payloads_sent,
            snapshot.uptime_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let snapshot = self.snapshot();
            let persisted = PersistedStats {
                readings_observed: snapshot.readings_observed,
                batches_closed: snapshot.batches_closed,
                batches_discarded: snapshot.batches_discarded,
                payloads_sent: snapshot.payloads_sent,
                sessions_served: snapshot.sessions_served,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load counters from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings_observed
                    .store(persisted.readings_observed, Ordering::Relaxed);
                self.batches_closed
                    .store(persisted.batches_closed, Ordering::Relaxed);
                self.batches_discarded
                    .store(persisted.batches_discarded, Ordering::Relaxed);
                self.payloads_sent
                    .store(persisted.payloads_sent, Ordering::Relaxed);
                self.sessions_served
                    .store(persisted.sessions_served, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.readings_observed.store(0, Ordering::Relaxed);
        self.batches_closed.store(0, Ordering::Relaxed);
        self.batches_discarded.store(0, Ordering::Relaxed);
        self.payloads_sent.store(0, Ordering::Relaxed);
        self.sessions_served.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub readings_observed: u64,
    pub batches_closed: u64,
    pub batches_discarded: u64,
    pub payloads_sent: u64,
    pub sessions_served: u64,
    pub started: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    readings_observed: u64,
    batches_closed: u64,
    batches_discarded: u64,
    payloads_sent: u64,
    sessions_served: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats handle.
pub type SharedSessionStats = Arc<SessionStats>;
