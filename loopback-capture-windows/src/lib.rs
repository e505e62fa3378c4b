//! # loopback-capture-windows
//!
//! Windows WASAPI backend for loopback-capture.
//!
//! Provides:
//! - `WasapiLoopbackSession` — shared-mode, timer-driven loopback on the default render endpoint
//! - `DeviceEnumerator` — default render endpoint lookup via MMDevice API
//!
//! ## Usage
//! ```ignore
//! use loopback_capture_core::{CancellationToken, CaptureConfiguration, CaptureDriver};
//! use loopback_capture_windows::WasapiLoopbackSession;
//!
//! let session = WasapiLoopbackSession::open_default()?;
//! let mut driver = CaptureDriver::new(session, &CaptureConfiguration::default(), CancellationToken::new());
//! let captured = driver.run()?;
//! ```

#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use wasapi_loopback::WasapiLoopbackSession;

/// Whether this build can open a loopback session at all.
pub const fn is_supported() -> bool {
    cfg!(target_os = "windows")
}
