//! WAV container encoding.
//!
//! Produces the canonical 44-byte RIFF/PCM header followed by the raw sample
//! bytes. The whole container is built in one pass once capture has stopped.

use crate::models::error::CaptureError;
use crate::models::format::{PcmFormat, WAVE_FORMAT_PCM};

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bytes counted by the RIFF size field beyond the data chunk (44 - 8).
pub const RIFF_OVERHEAD: u32 = 36;

/// Largest data chunk whose RIFF size still fits in a `u32`.
pub const MAX_DATA_SIZE: u32 = u32::MAX - RIFF_OVERHEAD;

/// Format fields recovered from an encoded header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub format: PcmFormat,
    pub data_size: u32,
}

/// Generate a 44-byte WAV RIFF header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    data_size + 36
/// [8-15]   "WAVEfmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  samples_per_sec
/// [28-31]  avg_bytes_per_sec
/// [32-33]  block_align
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &PcmFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let riff_size = data_size.saturating_add(RIFF_OVERHEAD);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..16].copy_from_slice(b"WAVEfmt ");

    // fmt sub-chunk
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels().to_le_bytes());
    header[24..28].copy_from_slice(&format.samples_per_sec().to_le_bytes());
    header[28..32].copy_from_slice(&format.avg_bytes_per_sec().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample().to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Encode a complete WAV file: header followed by `data` verbatim.
///
/// `data` must not exceed [`MAX_DATA_SIZE`]; the accumulator enforces this.
pub fn encode_wav(format: &PcmFormat, data: &[u8]) -> Vec<u8> {
    let data_size = u32::try_from(data.len()).unwrap_or(u32::MAX);
    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + data.len());
    out.extend_from_slice(&generate_wav_header(format, data_size));
    out.extend_from_slice(data);
    out
}

/// Decode the header of a canonical PCM WAV file.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::Format(format!(
            "WAV header needs {} bytes, got {}",
            WAV_HEADER_SIZE,
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..16] != b"WAVEfmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::Format("not a canonical RIFF/WAVE header".into()));
    }

    let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
    let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

    if u32_at(16) != 16 {
        return Err(CaptureError::Format(format!("unexpected fmt chunk size {}", u32_at(16))));
    }

    let format_tag = u16_at(20);
    let format = PcmFormat::new(u16_at(22), u32_at(24), u16_at(34))?;
    if format.avg_bytes_per_sec() != u32_at(28) || format.block_align() != u16_at(32) {
        return Err(CaptureError::Format("derived format fields do not match".into()));
    }

    Ok(WavHeader {
        riff_size: u32_at(4),
        format_tag,
        format,
        data_size: u32_at(40),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_44k() -> PcmFormat {
        PcmFormat::new(2, 44100, 16).unwrap()
    }

    #[test]
    fn header_size_is_44_bytes() {
        let header = generate_wav_header(&stereo_44k(), 0);
        assert_eq!(header.len(), 44);
    }

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&stereo_44k(), 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_pcm_format() {
        let header = generate_wav_header(&stereo_44k(), 0);
        assert_eq!(u16::from_le_bytes([header[20], header[21]]), 1);
        assert_eq!(u32::from_le_bytes([header[16], header[17], header[18], header[19]]), 16);
    }

    #[test]
    fn header_44khz_stereo_16bit() {
        let header = generate_wav_header(&stereo_44k(), 17640);

        let channels = u16::from_le_bytes([header[22], header[23]]);
        assert_eq!(channels, 2);

        let sample_rate = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);
        assert_eq!(sample_rate, 44100);

        let byte_rate = u32::from_le_bytes([header[28], header[29], header[30], header[31]]);
        assert_eq!(byte_rate, 176_400);

        let block_align = u16::from_le_bytes([header[32], header[33]]);
        assert_eq!(block_align, 4);

        let bit_depth = u16::from_le_bytes([header[34], header[35]]);
        assert_eq!(bit_depth, 16);

        let data_size = u32::from_le_bytes([header[40], header[41], header[42], header[43]]);
        assert_eq!(data_size, 17640);

        let chunk_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        assert_eq!(chunk_size, 36 + 17640);
    }

    #[test]
    fn encode_eight_bytes() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let wav = encode_wav(&stereo_44k(), &data);

        assert_eq!(wav.len(), 52);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 44);
        assert_eq!(&wav[44..], &data);
    }

    #[test]
    fn encode_empty_capture() {
        let wav = encode_wav(&stereo_44k(), &[]);
        assert_eq!(wav.len(), WAV_HEADER_SIZE);

        let header = parse_wav_header(&wav).unwrap();
        assert_eq!(header.data_size, 0);
        assert_eq!(header.riff_size, 36);
    }

    #[test]
    fn encode_is_deterministic() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(encode_wav(&stereo_44k(), &data), encode_wav(&stereo_44k(), &data));
    }

    #[test]
    fn parse_recovers_format() {
        let format = PcmFormat::new(1, 48000, 24).unwrap();
        let data = vec![0x7Fu8; 300];
        let header = parse_wav_header(&encode_wav(&format, &data)).unwrap();

        assert_eq!(header.format, format);
        assert_eq!(header.format_tag, WAVE_FORMAT_PCM);
        assert_eq!(header.data_size as usize, data.len());
        assert_eq!(header.riff_size, header.data_size + 36);
    }

    #[test]
    fn parse_rejects_truncated_and_foreign_headers() {
        assert!(parse_wav_header(&[0u8; 20]).is_err());

        let mut wav = encode_wav(&stereo_44k(), &[]);
        wav[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(parse_wav_header(&wav), Err(CaptureError::Format(_))));
    }
}
