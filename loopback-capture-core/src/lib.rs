//! # loopback-capture-core
//!
//! Platform-agnostic core for timer-driven loopback capture.
//!
//! Drains a shared-mode endpoint buffer on an adaptive cadence, accumulates
//! raw PCM in memory, and encodes the result as a canonical PCM WAV file.
//! Platform backends (Windows WASAPI) implement the `EndpointSession` trait
//! and plug into the generic `CaptureDriver`.
//!
//! ## Architecture
//!
//! ```text
//! loopback-capture-core (this crate)
//! ├── traits/       ← EndpointSession, BufferRegion, Pacer
//! ├── models/       ← CaptureError, PcmFormat, CaptureConfiguration, CaptureState, RecordingResult
//! ├── processing/   ← PcmAccumulator, DurationGate, WAV encoding
//! ├── session/      ← CaptureDriver (poll/sleep/drain loop), CancellationToken
//! └── storage/      ← WAV file output, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::format::{NativeFormat, PcmFormat};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::{CaptureState, StopReason};
pub use processing::accumulator::PcmAccumulator;
pub use processing::duration_gate::DurationGate;
pub use session::cancellation::CancellationToken;
pub use session::driver::{CaptureDriver, CaptureStats, CapturedAudio};
pub use traits::endpoint_session::{BufferRegion, EndpointSession};
pub use traits::pacer::{Pacer, ThreadPacer};
