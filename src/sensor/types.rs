//! Raw sample types produced by the sensor capability.
//!
//! A thermometer yields a single device-unit scalar per observation, so it
//! uses plain `f64` samples. The photoplethysmography front-end yields a
//! pair of LED intensities per observation.

use serde::{Deserialize, Serialize};

/// One photoplethysmography observation: raw infrared and red LED
/// intensities in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseSample {
    /// Infrared channel intensity
    pub ir: u32,
    /// Red channel intensity
    pub red: u32,
}

impl PulseSample {
    pub fn new(ir: u32, red: u32) -> Self {
        Self { ir, red }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_sample_fields() {
        let sample = PulseSample::new(90_000, 85_000);
        assert_eq!(sample.ir, 90_000);
        assert_eq!(sample.red, 85_000);
    }
}
