//! Stop decision for bounded captures.

use crate::models::format::PcmFormat;
use crate::processing::accumulator::PcmAccumulator;

/// Returns true iff a bounded duration was requested and the captured
/// duration has strictly exceeded it. Zero or negative means unbounded.
pub fn should_stop(requested_secs: f64, current_secs: f64) -> bool {
    requested_secs > 0.0 && current_secs > requested_secs
}

/// Requested capture length evaluated against accumulated PCM bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationGate {
    requested_secs: f64,
}

impl DurationGate {
    pub fn new(requested_secs: f64) -> Self {
        Self { requested_secs }
    }

    pub fn unbounded() -> Self {
        Self::new(0.0)
    }

    pub fn requested_secs(&self) -> f64 {
        self.requested_secs
    }

    pub fn is_unbounded(&self) -> bool {
        self.requested_secs <= 0.0
    }

    pub fn should_stop(&self, accumulator: &PcmAccumulator, format: &PcmFormat) -> bool {
        should_stop(self.requested_secs, accumulator.duration_secs(format))
    }
}
