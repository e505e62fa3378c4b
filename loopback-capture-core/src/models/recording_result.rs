use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::PcmFormat;
use super::state::StopReason;

/// Result returned once a capture has been encoded and written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub data_size: u32,
    pub stop_reason: StopReason,
    pub checksum: String,
}

/// Metadata written as a JSON sidecar next to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub device_name: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub data_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub stop_reason: StopReason,
    pub file_path: String,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(result: &RecordingResult, format: &PcmFormat, device_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            device_name: device_name.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs: result.duration_secs,
            data_size: result.data_size,
            channels: format.channels(),
            sample_rate: format.samples_per_sec(),
            bits_per_sample: format.bits_per_sample(),
            stop_reason: result.stop_reason,
            file_path: result.file_path.to_string_lossy().into_owned(),
            checksum: result.checksum.clone(),
        }
    }
}
