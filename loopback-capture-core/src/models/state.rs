use serde::{Deserialize, Serialize};

/// Capture loop state machine.
///
/// State transitions:
/// ```text
/// idle → running → stopping → stopped
///            └─→ failed
/// ```
/// Each transition happens at most once; there is no way back to `Running`.
/// `Failed` is entered when a session error aborts the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Running,
    Stopping(StopReason),
    Stopped(StopReason),
    Failed,
}

/// Why the capture loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The requested duration was exceeded.
    DurationReached,
    /// The cancellation token was observed.
    Cancelled,
    /// The next packet would not fit in a WAV data chunk.
    SizeLimitReached,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped(_) | Self::Failed)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Stopping(reason) | Self::Stopped(reason) => Some(*reason),
            _ => None,
        }
    }
}
