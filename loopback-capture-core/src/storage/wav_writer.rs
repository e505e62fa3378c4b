use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::processing::wav_format;
use crate::session::driver::CapturedAudio;

/// Required output file extension.
pub const WAV_EXTENSION: &str = "wav";

/// Check that `path` names a WAVE file: the path text ends in `.wav`, any case.
///
/// A bare `dir/.wav` counts; a trailing separator does not.
pub fn validate_output_path(path: &Path) -> Result<(), CaptureError> {
    let suffix = format!(".{}", WAV_EXTENSION);
    let is_wav = path
        .as_os_str()
        .to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(&suffix);

    if is_wav {
        Ok(())
    } else {
        Err(CaptureError::Format(format!(
            "specify WAVE audio file (*.{}), got {}",
            WAV_EXTENSION,
            path.display()
        )))
    }
}

/// Write an encoded file in one shot and return its SHA-256 hex digest.
///
/// Creates missing parent directories.
pub fn write_wav_file(path: &Path, bytes: &[u8]) -> Result<String, CaptureError> {
    write_chunks(path, &[bytes])
}

/// Write the header and then the accumulated samples straight from the
/// accumulator, so the capture is never held in memory twice.
pub fn write_recording(path: &Path, captured: &CapturedAudio) -> Result<RecordingResult, CaptureError> {
    validate_output_path(path)?;

    let header = wav_format::generate_wav_header(&captured.format, captured.data.size());
    let data = captured.data.as_bytes();
    let checksum = write_chunks(path, &[&header[..], data])?;
    log::info!("Wrote {} bytes to {}", header.len() + data.len(), path.display());

    Ok(RecordingResult {
        file_path: PathBuf::from(path),
        duration_secs: captured.duration_secs(),
        data_size: captured.data.size(),
        stop_reason: captured.stop_reason,
        checksum,
    })
}

/// Write `chunks` back to back into a fresh file, hashing as they go.
fn write_chunks(path: &Path, chunks: &[&[u8]]) -> Result<String, CaptureError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::Io(format!("failed to create directory: {}", e)))?;
    }

    let io_err = |e: std::io::Error| CaptureError::Io(format!("failed to write {}: {}", path.display(), e));
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    for chunk in chunks {
        writer.write_all(chunk).map_err(io_err)?;
        hasher.update(chunk);
    }
    writer.flush().map_err(io_err)?;

    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
