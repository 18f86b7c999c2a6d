//! Derived reading and wire payload types.

use serde::{Deserialize, Serialize};

/// Plausible skin temperature range, degrees C.
pub const TEMPERATURE_MIN_C: f64 = 34.0;
pub const TEMPERATURE_MAX_C: f64 = 42.0;

/// Plausible heart rate range, beats per minute.
pub const BPM_MIN: f64 = 40.0;
pub const BPM_MAX: f64 = 200.0;

/// Plausible oxygen saturation range, percent.
pub const SPO2_MIN: f64 = 85.0;
pub const SPO2_MAX: f64 = 100.0;

/// One temperature reading in degrees C, calibration offset already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading(pub f64);

/// One heart-rate / oxygen-saturation estimate produced from a full sample
/// window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalsReading {
    pub bpm: f64,
    pub spo2: f64,
}

/// Wire payload for a temperature batch: `{"temperature": <2-decimal>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperaturePayload {
    pub temperature: f64,
}

/// Wire payload for a vitals batch: `{"bpm": <int>, "spo2": <int>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsPayload {
    pub bpm: i64,
    pub spo2: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_payload_schema() {
        let json = serde_json::to_string(&TemperaturePayload { temperature: 36.52 }).unwrap();
        assert_eq!(json, r#"{"temperature":36.52}"#);
    }

    #[test]
    fn test_vitals_payload_schema() {
        let json = serde_json::to_string(&VitalsPayload { bpm: 72, spo2: 97 }).unwrap();
        assert_eq!(json, r#"{"bpm":72,"spo2":97}"#);
    }
}
