//! Sensor capability for the telemetry pipeline.
//!
//! Hardware drivers are external collaborators; the pipeline only needs a
//! blocking "pull whatever you have buffered" operation and a guaranteed
//! power-down. [`SampleSource`] is that seam, and [`SensorGuard`] makes the
//! power-down run on every exit path.

pub mod synthetic;
pub mod types;

// Re-export commonly used types
pub use synthetic::{ChannelSource, SyntheticOximeter, SyntheticThermometer};
pub use types::PulseSample;

use std::ops::{Deref, DerefMut};

/// Errors from the sensor capability.
#[derive(Debug)]
pub enum SensorError {
    /// The sample feed ended (device unplugged or the feeding half dropped).
    Disconnected,
    /// Device-level failure reported by the driver.
    Device(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Disconnected => write!(f, "sample source disconnected"),
            SensorError::Device(e) => write!(f, "sensor device error: {e}"),
        }
    }
}

impl std::error::Error for SensorError {}

/// A source of raw sensor samples.
///
/// `poll` drains whatever the device has buffered since the last call and
/// may return an empty batch. The sequence is infinite and non-restartable:
/// once `poll` fails, the source is done.
pub trait SampleSource {
    type Sample;

    /// Drain buffered samples. Blocks only as long as the device read takes.
    fn poll(&mut self) -> Result<Vec<Self::Sample>, SensorError>;

    /// Power the device down (LEDs off, measurement stopped). Idempotent.
    fn shutdown(&mut self);
}

/// Scoped ownership of a sample source.
///
/// The wrapped source is powered down when the guard is dropped, which
/// covers normal session end, sensor failure, and process interrupt alike.
pub struct SensorGuard<S: SampleSource> {
    source: S,
}

impl<S: SampleSource> SensorGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: SampleSource> Deref for SensorGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: SampleSource> DerefMut for SensorGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SampleSource> Drop for SensorGuard<S> {
    fn drop(&mut self) {
        self.source.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FlagSource {
        shut_down: Arc<AtomicBool>,
    }

    impl SampleSource for FlagSource {
        type Sample = f64;

        fn poll(&mut self) -> Result<Vec<f64>, SensorError> {
            Ok(vec![0.0])
        }

        fn shutdown(&mut self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_shuts_down_on_drop() {
        let shut_down = Arc::new(AtomicBool::new(false));
        {
            let _guard = SensorGuard::new(FlagSource {
                shut_down: shut_down.clone(),
            });
        }
        assert!(shut_down.load(Ordering::SeqCst));
    }

    #[test]
    fn test_guard_shuts_down_on_panic_unwind() {
        let shut_down = Arc::new(AtomicBool::new(false));
        let flag = shut_down.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = SensorGuard::new(FlagSource { shut_down: flag });
            panic!("session aborted");
        });
        assert!(result.is_err());
        assert!(shut_down.load(Ordering::SeqCst));
    }
}
