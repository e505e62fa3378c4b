use thiserror::Error;

/// Errors that can occur while negotiating, running, or persisting a loopback capture.
///
/// Every variant is fatal: nothing is retried and no partial recording is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Endpoint or audio client setup failed before capture began.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// Acquiring, reading, or releasing a buffer region failed mid-capture.
    #[error("capture failed: {0}")]
    Capture(String),

    /// The audio format or the output container format is unusable.
    #[error("format error: {0}")]
    Format(String),

    /// Writing the finished recording failed.
    #[error("io error: {0}")]
    Io(String),
}
