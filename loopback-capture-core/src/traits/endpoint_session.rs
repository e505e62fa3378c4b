use std::time::Duration;

use crate::models::error::CaptureError;
use crate::models::format::PcmFormat;

/// `AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY`
pub const BUFFER_FLAG_DATA_DISCONTINUITY: u32 = 0x1;
/// `AUDCLNT_BUFFERFLAGS_SILENT`
pub const BUFFER_FLAG_SILENT: u32 = 0x2;
/// `AUDCLNT_BUFFERFLAGS_TIMESTAMP_ERROR`
pub const BUFFER_FLAG_TIMESTAMP_ERROR: u32 = 0x4;

/// A region of the endpoint's buffer that is ready to be read.
///
/// `bytes` borrows the session and is only valid until the next call on it,
/// so the driver copies out of it before doing anything else. The region
/// itself stays held by the endpoint until [`EndpointSession::release_region`].
#[derive(Debug)]
pub struct BufferRegion<'a> {
    pub bytes: &'a [u8],
    pub frames: u32,
    pub flags: u32,
    pub device_position: u64,
    pub qpc_position: u64,
}

impl BufferRegion<'_> {
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn is_silent(&self) -> bool {
        self.flags & BUFFER_FLAG_SILENT != 0
    }

    pub fn is_discontinuous(&self) -> bool {
        self.flags & BUFFER_FLAG_DATA_DISCONTINUITY != 0
    }
}

/// An activated shared-mode endpoint that the capture loop drains.
///
/// Implemented by `WasapiLoopbackSession` on Windows and by scripted fakes in
/// tests. Implementations release their native resources on drop.
pub trait EndpointSession {
    /// Format the stream was initialized with.
    fn format(&self) -> PcmFormat;

    /// Human-readable endpoint name.
    fn device_name(&self) -> String;

    /// The subsystem's default polling interval for this endpoint.
    fn device_period(&self) -> Duration;

    /// Size of the endpoint buffer, in frames.
    fn buffer_frame_capacity(&self) -> u32;

    fn start(&mut self) -> Result<(), CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Acquire the next readable region. `frames == 0` means nothing is
    /// queued yet, and such a region must not be released.
    fn buffer_region(&mut self) -> Result<BufferRegion<'_>, CaptureError>;

    /// Hand `frames` frames of the last acquired region back to the endpoint.
    fn release_region(&mut self, frames: u32) -> Result<(), CaptureError>;

    /// Frames currently queued in the endpoint buffer.
    fn current_padding(&self) -> Result<u32, CaptureError>;
}
