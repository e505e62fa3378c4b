use crate::models::error::CaptureError;
use crate::models::format::PcmFormat;
use crate::processing::wav_format::MAX_DATA_SIZE;

/// Append-only store for raw PCM bytes captured from the endpoint.
///
/// Grows monotonically and never compacts. The only bound is the WAV
/// container's: a `data` chunk cannot exceed [`MAX_DATA_SIZE`] bytes.
#[derive(Debug, Default)]
pub struct PcmAccumulator {
    data: Vec<u8>,
    size: u32,
}

impl PcmAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the tail and return the new total size.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u32, CaptureError> {
        let new_size = u32::try_from(bytes.len())
            .ok()
            .and_then(|len| self.size.checked_add(len))
            .filter(|&size| size <= MAX_DATA_SIZE)
            .ok_or_else(|| {
                CaptureError::Capture(format!(
                    "recording exceeds the WAV size limit of {} bytes",
                    MAX_DATA_SIZE
                ))
            })?;

        self.data.extend_from_slice(bytes);
        self.size = new_size;
        Ok(new_size)
    }

    /// Total bytes accumulated so far.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes that can still be appended before hitting the container limit.
    pub fn remaining_capacity(&self) -> u32 {
        MAX_DATA_SIZE - self.size
    }

    /// Borrowed view of everything accumulated so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Empty accumulator that already counts as holding all but `remaining`
    /// bytes of the container limit.
    #[cfg(test)]
    pub(crate) fn with_remaining_capacity(remaining: u32) -> Self {
        Self {
            data: Vec::new(),
            size: MAX_DATA_SIZE - remaining,
        }
    }

    /// Seconds of audio accumulated, interpreting the bytes as `format`.
    pub fn duration_secs(&self, format: &PcmFormat) -> f64 {
        format.duration_of(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_tracks_size() {
        let mut acc = PcmAccumulator::new();
        assert!(acc.is_empty());

        assert_eq!(acc.append(&[1, 2, 3, 4]).unwrap(), 4);
        assert_eq!(acc.append(&[5, 6]).unwrap(), 6);

        assert_eq!(acc.size(), 6);
        assert_eq!(acc.as_bytes(), &[1u8, 2, 3, 4, 5, 6]);
        assert_eq!(acc.as_bytes().len(), acc.size() as usize);
    }

    #[test]
    fn empty_append_is_noop() {
        let mut acc = PcmAccumulator::new();
        acc.append(&[9, 9]).unwrap();
        assert_eq!(acc.append(&[]).unwrap(), 2);
        assert_eq!(acc.into_bytes(), vec![9, 9]);
    }

    #[test]
    fn duration_uses_format() {
        let format = PcmFormat::target_profile();
        let mut acc = PcmAccumulator::new();
        acc.append(&vec![0u8; 88_200]).unwrap();
        assert!((acc.duration_secs(&format) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_growth_past_container_limit() {
        let mut acc = PcmAccumulator::with_remaining_capacity(2);
        assert_eq!(acc.remaining_capacity(), 2);
        assert_eq!(acc.append(&[0, 0]).unwrap(), MAX_DATA_SIZE);
        assert_eq!(acc.remaining_capacity(), 0);

        let err = acc.append(&[0]).unwrap_err();
        assert!(matches!(err, CaptureError::Capture(_)));
        assert_eq!(acc.size(), MAX_DATA_SIZE);
    }
}
