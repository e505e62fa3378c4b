//! WASAPI shared-mode loopback session on the default render endpoint.
//!
//! Opens the endpoint with `AUDCLNT_STREAMFLAGS_LOOPBACK` in timer-driven
//! mode (no event handle): the capture driver decides when to poll.
//!
//! ## Notes
//! - No permissions are required for loopback on Windows
//! - DRM-protected audio is delivered as silence
//! - The endpoint's mix format is replaced with 16-bit / 44.1 kHz / stereo PCM;
//!   the engine converts on our behalf

use std::ffi::c_void;
use std::time::Duration;

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use loopback_capture_core::models::error::CaptureError;
use loopback_capture_core::models::format::{NativeFormat, PcmFormat};
use loopback_capture_core::traits::endpoint_session::{BufferRegion, EndpointSession};

use crate::device_enumerator::{DeviceEnumerator, RenderEndpoint};

/// Requested endpoint buffer length: 200 ms in 100-ns units.
const BUFFER_DURATION_HNS: i64 = 200 * 10_000;

/// Timer-driven loopback capture client.
///
/// Field order matters: the COM interfaces are released before the apartment
/// guard uninitializes COM.
pub struct WasapiLoopbackSession {
    capture_client: IAudioCaptureClient,
    audio_client: IAudioClient,
    device_name: String,
    format: PcmFormat,
    device_period: Duration,
    buffer_frame_capacity: u32,
    running: bool,
    _com: ComGuard,
}

impl WasapiLoopbackSession {
    /// Negotiate a loopback session on the default render endpoint.
    ///
    /// Sequence:
    /// 1. CoInitializeEx (MTA)
    /// 2. Default render endpoint + friendly name
    /// 3. Activate IAudioClient
    /// 4. GetMixFormat, override to the fixed PCM profile
    /// 5. GetDevicePeriod
    /// 6. Initialize (shared, loopback, 200 ms)
    /// 7. GetBufferSize, IAudioCaptureClient
    pub fn open_default() -> Result<Self, CaptureError> {
        let com = ComGuard::new()?;
        let endpoint = DeviceEnumerator::new()?.default_render_endpoint()?;
        Self::open(com, endpoint)
    }

    fn open(com: ComGuard, endpoint: RenderEndpoint) -> Result<Self, CaptureError> {
        unsafe {
            let audio_client: IAudioClient = endpoint
                .device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| CaptureError::Negotiation(format!("Activate failed: {}", e)))?;

            let mix_format = MixFormat(
                audio_client
                    .GetMixFormat()
                    .map_err(|e| CaptureError::Format(format!("GetMixFormat failed: {}", e)))?,
            );
            let native = mix_format.native();
            log::debug!(
                "Endpoint mix format: tag {:#06x}, {} Hz, {} ch, {} bit",
                native.format_tag,
                native.samples_per_sec,
                native.channels,
                native.bits_per_sample
            );

            let target = native.override_to_target();
            let format = PcmFormat::from_native(&target)?;
            let wave_format = WAVEFORMATEX {
                wFormatTag: target.format_tag,
                nChannels: target.channels,
                nSamplesPerSec: target.samples_per_sec,
                nAvgBytesPerSec: target.avg_bytes_per_sec,
                nBlockAlign: target.block_align,
                wBitsPerSample: target.bits_per_sample,
                cbSize: target.extra_size,
            };
            drop(mix_format);

            let mut default_period: i64 = 0;
            audio_client
                .GetDevicePeriod(Some(&mut default_period as *mut i64), None)
                .map_err(|e| CaptureError::Negotiation(format!("GetDevicePeriod failed: {}", e)))?;
            let device_period = Duration::from_nanos(default_period.max(0) as u64 * 100);

            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_LOOPBACK
                        | AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                        | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                    BUFFER_DURATION_HNS,
                    0,
                    &wave_format,
                    None,
                )
                .map_err(|e| {
                    CaptureError::Negotiation(format!("IAudioClient::Initialize (loopback) failed: {}", e))
                })?;

            let buffer_frame_capacity = audio_client
                .GetBufferSize()
                .map_err(|e| CaptureError::Negotiation(format!("GetBufferSize failed: {}", e)))?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::Negotiation(format!("GetService failed: {}", e)))?;

            log::info!(
                "Opened loopback on {} (period {:?}, buffer {} frames)",
                endpoint.name,
                device_period,
                buffer_frame_capacity
            );

            Ok(Self {
                capture_client,
                audio_client,
                device_name: endpoint.name,
                format,
                device_period,
                buffer_frame_capacity,
                running: false,
                _com: com,
            })
        }
    }
}

impl EndpointSession for WasapiLoopbackSession {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn device_period(&self) -> Duration {
        self.device_period
    }

    fn buffer_frame_capacity(&self) -> u32 {
        self.buffer_frame_capacity
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        unsafe {
            self.audio_client
                .Start()
                .map_err(|e| CaptureError::Negotiation(format!("IAudioClient::Start failed: {}", e)))?;
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        unsafe {
            self.audio_client
                .Stop()
                .map_err(|e| CaptureError::Capture(format!("IAudioClient::Stop failed: {}", e)))
        }
    }

    fn buffer_region(&mut self) -> Result<BufferRegion<'_>, CaptureError> {
        let mut data: *mut u8 = std::ptr::null_mut();
        let mut frames: u32 = 0;
        let mut flags: u32 = 0;
        let mut device_position: u64 = 0;
        let mut qpc_position: u64 = 0;

        unsafe {
            self.capture_client
                .GetBuffer(
                    &mut data,
                    &mut frames,
                    &mut flags,
                    Some(&mut device_position as *mut u64),
                    Some(&mut qpc_position as *mut u64),
                )
                .map_err(|e| CaptureError::Capture(format!("GetBuffer failed: {}", e)))?;
        }

        let bytes: &[u8] = if frames == 0 || data.is_null() {
            &[]
        } else {
            let len = frames as usize * self.format.block_align() as usize;
            // SAFETY: GetBuffer hands out `frames` frames of `block_align` bytes
            // that stay valid until ReleaseBuffer, and the slice borrows `self`,
            // so it cannot outlive the next call on this session.
            unsafe { std::slice::from_raw_parts(data, len) }
        };

        Ok(BufferRegion {
            bytes,
            frames,
            flags,
            device_position,
            qpc_position,
        })
    }

    fn release_region(&mut self, frames: u32) -> Result<(), CaptureError> {
        unsafe {
            self.capture_client
                .ReleaseBuffer(frames)
                .map_err(|e| CaptureError::Capture(format!("ReleaseBuffer failed: {}", e)))
        }
    }

    fn current_padding(&self) -> Result<u32, CaptureError> {
        unsafe {
            self.audio_client
                .GetCurrentPadding()
                .map_err(|e| CaptureError::Capture(format!("GetCurrentPadding failed: {}", e)))
        }
    }
}

impl Drop for WasapiLoopbackSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Failed to stop loopback client on drop: {}", e);
        }
    }
}

/// `GetMixFormat` allocation, freed with CoTaskMemFree when dropped.
struct MixFormat(*mut WAVEFORMATEX);

impl MixFormat {
    fn native(&self) -> NativeFormat {
        // WAVEFORMATEX is packed; copy it out before touching fields.
        let raw: WAVEFORMATEX = unsafe { *self.0 };
        NativeFormat {
            format_tag: raw.wFormatTag,
            channels: raw.nChannels,
            samples_per_sec: raw.nSamplesPerSec,
            avg_bytes_per_sec: raw.nAvgBytesPerSec,
            block_align: raw.nBlockAlign,
            bits_per_sample: raw.wBitsPerSample,
            extra_size: raw.cbSize,
        }
    }
}

impl Drop for MixFormat {
    fn drop(&mut self) {
        unsafe {
            CoTaskMemFree(Some(self.0 as *const c_void));
        }
    }
}

/// RAII guard pairing CoInitializeEx with CoUninitialize.
struct ComGuard;

impl ComGuard {
    fn new() -> Result<Self, CaptureError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| CaptureError::Negotiation(format!("CoInitializeEx failed: {}", e)))?;
        }
        Ok(Self)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
