//! Default render endpoint lookup via the MMDevice API.
//!
//! Loopback capture reads from a render (speaker/headphone) endpoint, so only
//! `eRender` endpoints are resolved here.

use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use loopback_capture_core::models::error::CaptureError;

/// A render endpoint plus the name shown to the user.
pub struct RenderEndpoint {
    pub device: IMMDevice,
    pub name: String,
}

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> Result<Self, CaptureError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|e| CaptureError::Negotiation(format!("failed to create enumerator: {}", e)))?;
            Ok(Self { enumerator })
        }
    }

    /// The console-role default render endpoint, i.e. what the user is hearing.
    pub fn default_render_endpoint(&self) -> Result<RenderEndpoint, CaptureError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|e| CaptureError::Negotiation(format!("no default render endpoint: {}", e)))?;

            let name = Self::friendly_name(&device).unwrap_or_else(|| {
                log::warn!("Could not read endpoint friendly name");
                "Default Output Device".into()
            });

            Ok(RenderEndpoint { device, name })
        }
    }

    /// Read the PKEY_Device_FriendlyName property from a device.
    fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            let name = value.to_string();
            if name.is_empty() {
                None
            } else {
                Some(name)
            }
        }
    }
}
