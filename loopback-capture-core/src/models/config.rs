use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a loopback capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    /// Requested capture length in seconds. Zero or negative means
    /// "until cancelled".
    pub duration_secs: f64,

    /// Where the finished WAV file is written. `None` means no capture is
    /// performed at all.
    pub output_path: Option<PathBuf>,

    /// Sleep before the first poll. `None` uses the endpoint's default
    /// device period.
    pub pre_roll: Option<Duration>,

    /// Sleep after a poll that returned no frames (default: zero, i.e. poll
    /// again immediately).
    pub empty_poll_backoff: Duration,

    /// Write a `.metadata.json` sidecar next to the recording.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !self.duration_secs.is_finite() {
            return Err(format!("duration must be finite, got {}", self.duration_secs));
        }
        if let Some(ref path) = self.output_path {
            if path.as_os_str().is_empty() {
                return Err("output path is empty".into());
            }
        }
        Ok(())
    }

    /// Whether the capture only ends through cancellation.
    pub fn is_unbounded(&self) -> bool {
        self.duration_secs <= 0.0
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            duration_secs: 0.0,
            output_path: None,
            pre_roll: None,
            empty_poll_backoff: Duration::ZERO,
            write_metadata: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded_and_valid() {
        let config = CaptureConfiguration::default();
        assert!(config.is_unbounded());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_duration_is_unbounded() {
        let config = CaptureConfiguration {
            duration_secs: -3.0,
            ..Default::default()
        };
        assert!(config.is_unbounded());
    }

    #[test]
    fn rejects_non_finite_duration() {
        let config = CaptureConfiguration {
            duration_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_output_path() {
        let config = CaptureConfiguration {
            output_path: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
