use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// `WAVE_FORMAT_PCM` format tag.
pub const WAVE_FORMAT_PCM: u16 = 1;

/// Fixed output profile: 16-bit signed integer PCM.
pub const TARGET_BITS_PER_SAMPLE: u16 = 16;

/// Fixed output profile: 44.1 kHz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Fixed output profile: stereo.
pub const TARGET_CHANNELS: u16 = 2;

/// Mix format as reported by the endpoint during negotiation.
///
/// Mirrors the fields of a `WAVEFORMATEX`. Nothing here is trusted for the
/// output container; see [`NativeFormat::override_to_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub extra_size: u16,
}

impl NativeFormat {
    /// Overwrite the negotiated fields with the fixed target profile.
    ///
    /// Block align and byte rate are recomputed from the overrides, never
    /// carried over from the endpoint's mix format. The result is what gets
    /// handed back to the audio client for initialization.
    pub fn override_to_target(self) -> Self {
        let target = PcmFormat::target_profile();
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels: target.channels(),
            samples_per_sec: target.samples_per_sec(),
            avg_bytes_per_sec: target.avg_bytes_per_sec(),
            block_align: target.block_align(),
            bits_per_sample: target.bits_per_sample(),
            extra_size: 0,
        }
    }
}

/// Immutable description of the PCM stream being captured.
///
/// `block_align` and `avg_bytes_per_sec` are always derived, so the invariants
/// `block_align == bits_per_sample / 8 * channels` and
/// `avg_bytes_per_sec == samples_per_sec * block_align` hold for every value
/// of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    channels: u16,
    samples_per_sec: u32,
    avg_bytes_per_sec: u32,
    block_align: u16,
    bits_per_sample: u16,
}

impl PcmFormat {
    pub fn new(channels: u16, samples_per_sec: u32, bits_per_sample: u16) -> Result<Self, CaptureError> {
        if channels == 0 {
            return Err(CaptureError::Format("channel count must be positive".into()));
        }
        if samples_per_sec == 0 {
            return Err(CaptureError::Format("sample rate must be positive".into()));
        }
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(CaptureError::Format(format!(
                "unsupported bits per sample: {}",
                bits_per_sample
            )));
        }

        let block_align = (bits_per_sample / 8)
            .checked_mul(channels)
            .ok_or_else(|| CaptureError::Format("block align overflows u16".into()))?;
        let avg_bytes_per_sec = samples_per_sec
            .checked_mul(block_align as u32)
            .ok_or_else(|| CaptureError::Format("byte rate overflows u32".into()))?;

        Ok(Self {
            channels,
            samples_per_sec,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
        })
    }

    /// 16-bit / 44100 Hz / stereo integer PCM.
    pub fn target_profile() -> Self {
        let block_align = TARGET_BITS_PER_SAMPLE / 8 * TARGET_CHANNELS;
        Self {
            channels: TARGET_CHANNELS,
            samples_per_sec: TARGET_SAMPLE_RATE,
            avg_bytes_per_sec: TARGET_SAMPLE_RATE * block_align as u32,
            block_align,
            bits_per_sample: TARGET_BITS_PER_SAMPLE,
        }
    }

    /// Build a descriptor from a negotiated format that has already been
    /// overridden. Rejects non-PCM tags and inconsistent derived fields.
    pub fn from_native(native: &NativeFormat) -> Result<Self, CaptureError> {
        if native.format_tag != WAVE_FORMAT_PCM {
            return Err(CaptureError::Format(format!(
                "expected integer PCM format tag, got {:#06x}",
                native.format_tag
            )));
        }

        let format = Self::new(native.channels, native.samples_per_sec, native.bits_per_sample)?;
        if format.block_align != native.block_align || format.avg_bytes_per_sec != native.avg_bytes_per_sec {
            return Err(CaptureError::Format(format!(
                "inconsistent format: block align {} / byte rate {} (expected {} / {})",
                native.block_align, native.avg_bytes_per_sec, format.block_align, format.avg_bytes_per_sec
            )));
        }
        Ok(format)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples_per_sec(&self) -> u32 {
        self.samples_per_sec
    }

    pub fn avg_bytes_per_sec(&self) -> u32 {
        self.avg_bytes_per_sec
    }

    pub fn block_align(&self) -> u16 {
        self.block_align
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Seconds of audio represented by `byte_count` bytes of this format.
    pub fn duration_of(&self, byte_count: u32) -> f64 {
        byte_count as f64
            / (self.bits_per_sample / 8) as f64
            / self.channels as f64
            / self.samples_per_sec as f64
    }
}
