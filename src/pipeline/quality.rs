//! Signal-quality gate: is a finger actually on the sensor?
//!
//! With nothing on the optical window both LED channels read dim. Readings
//! computed across a finger placement change would stitch two different
//! contacts into one median, so loss of contact must clear the in-progress
//! batch (the caller's job; this module only decides presence).

use crate::pipeline::windowing::SampleWindow;
use statrs::statistics::Statistics;

/// Mean intensity below which a channel sees no finger, in device units.
pub const CONTACT_THRESHOLD: f64 = 50_000.0;

/// Contact is absent only when BOTH channel means are below the threshold.
pub fn contact_present(window: &SampleWindow) -> bool {
    if window.is_empty() {
        return false;
    }
    let ir_mean = window.ir().mean();
    let red_mean = window.red().mean();
    !(ir_mean < CONTACT_THRESHOLD && red_mean < CONTACT_THRESHOLD)
}
