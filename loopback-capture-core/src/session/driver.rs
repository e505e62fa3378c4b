use std::time::Duration;

use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::format::PcmFormat;
use crate::models::state::{CaptureState, StopReason};
use crate::processing::accumulator::PcmAccumulator;
use crate::processing::duration_gate::DurationGate;
use crate::processing::wav_format;
use crate::session::cancellation::CancellationToken;
use crate::traits::endpoint_session::EndpointSession;
use crate::traits::pacer::{Pacer, ThreadPacer};

/// Counters collected while draining the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub polls: u64,
    pub empty_polls: u64,
    pub packets: u64,
    pub frames: u64,
    pub silent_packets: u64,
    pub discontinuities: u64,
}

/// Everything the capture produced, ready to be encoded.
#[derive(Debug)]
pub struct CapturedAudio {
    pub format: PcmFormat,
    pub data: PcmAccumulator,
    pub stop_reason: StopReason,
    pub stats: CaptureStats,
}

impl CapturedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.data.duration_secs(&self.format)
    }

    /// Encode the accumulated samples into a complete WAV file.
    pub fn to_wav(&self) -> Vec<u8> {
        wav_format::encode_wav(&self.format, self.data.as_bytes())
    }
}

/// Sleep between two drains: half the time the endpoint needs to fill the
/// space that is currently free.
pub fn poll_interval(buffer_frame_capacity: u32, padding: u32, samples_per_sec: u32) -> Duration {
    if samples_per_sec == 0 {
        return Duration::ZERO;
    }
    let free_frames = buffer_frame_capacity.saturating_sub(padding);
    Duration::from_secs_f64(free_frames as f64 / samples_per_sec as f64) / 2
}

/// Timer-driven loop that drains a shared-mode endpoint into memory.
///
/// ```text
/// start → sleep(device period) → ┌ cancelled / duration exceeded? → stop
///                                 │ acquire region (0 frames → retry)
///                                 │ copy frames → accumulator
///                                 │ padding → sleep(free / rate / 2)
///                                 └ release region
/// ```
///
/// Runs on the calling thread. The cancellation token is only read at the top
/// of each iteration.
pub struct CaptureDriver<S: EndpointSession, P: Pacer = ThreadPacer> {
    session: S,
    pacer: P,
    format: PcmFormat,
    gate: DurationGate,
    cancel: CancellationToken,
    pre_roll: Option<Duration>,
    empty_poll_backoff: Duration,
    accumulator: PcmAccumulator,
    state: CaptureState,
    stats: CaptureStats,
}

impl<S: EndpointSession> CaptureDriver<S, ThreadPacer> {
    pub fn new(session: S, config: &CaptureConfiguration, cancel: CancellationToken) -> Self {
        Self::with_pacer(session, ThreadPacer, config, cancel)
    }
}

impl<S: EndpointSession, P: Pacer> CaptureDriver<S, P> {
    pub fn with_pacer(session: S, pacer: P, config: &CaptureConfiguration, cancel: CancellationToken) -> Self {
        let format = session.format();
        Self {
            session,
            pacer,
            format,
            gate: DurationGate::new(config.duration_secs),
            cancel,
            pre_roll: config.pre_roll,
            empty_poll_backoff: config.empty_poll_backoff,
            accumulator: PcmAccumulator::new(),
            state: CaptureState::Idle,
            stats: CaptureStats::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    /// Run the capture to completion. Transitions: idle → running → stopping → stopped.
    ///
    /// Any session error aborts the capture, leaves the driver `Failed`, and
    /// drops the accumulated audio with it.
    pub fn run(&mut self) -> Result<CapturedAudio, CaptureError> {
        if !self.state.is_idle() {
            return Err(CaptureError::Capture("capture driver has already run".into()));
        }

        self.session.start()?;
        self.state = CaptureState::Running;
        log::info!(
            "Capturing from {} ({} Hz, {} ch, {} bit)",
            self.session.device_name(),
            self.format.samples_per_sec(),
            self.format.channels(),
            self.format.bits_per_sample()
        );

        let reason = match self.capture_loop() {
            Ok(reason) => reason,
            Err(e) => {
                log::error!("Capture aborted: {}", e);
                if let Err(stop_err) = self.session.stop() {
                    log::warn!("Failed to stop endpoint after error: {}", stop_err);
                }
                self.state = CaptureState::Failed;
                return Err(e);
            }
        };

        self.state = CaptureState::Stopping(reason);
        log::info!("Stopping capture ({:?})", reason);
        self.session.stop()?;
        self.state = CaptureState::Stopped(reason);

        log::debug!(
            "Captured {} bytes in {} packets ({} empty polls, {} silent, {} discontinuities)",
            self.accumulator.size(),
            self.stats.packets,
            self.stats.empty_polls,
            self.stats.silent_packets,
            self.stats.discontinuities
        );

        Ok(CapturedAudio {
            format: self.format,
            data: std::mem::take(&mut self.accumulator),
            stop_reason: reason,
            stats: self.stats,
        })
    }

    fn capture_loop(&mut self) -> Result<StopReason, CaptureError> {
        // Let the engine fill the buffer before the first read.
        let pre_roll = self.pre_roll.unwrap_or_else(|| self.session.device_period());
        self.pacer.sleep(pre_roll);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }
            if self.gate.should_stop(&self.accumulator, &self.format) {
                return Ok(StopReason::DurationReached);
            }
            if let Some(reason) = self.drain_once()? {
                return Ok(reason);
            }
        }
    }

    /// One acquire → copy → pace → release cycle.
    fn drain_once(&mut self) -> Result<Option<StopReason>, CaptureError> {
        self.stats.polls += 1;
        let block_align = self.format.block_align() as usize;

        let region = self.session.buffer_region()?;
        if region.is_empty() {
            self.stats.empty_polls += 1;
            if !self.empty_poll_backoff.is_zero() {
                self.pacer.sleep(self.empty_poll_backoff);
            }
            return Ok(None);
        }

        let frames = region.frames;
        let len = frames as usize * block_align;
        let bytes = region.bytes.get(..len).ok_or_else(|| {
            CaptureError::Capture(format!(
                "buffer region holds {} bytes but {} frames need {}",
                region.bytes.len(),
                frames,
                len
            ))
        })?;

        if len > self.accumulator.remaining_capacity() as usize {
            log::warn!("WAV size limit reached; dropping final packet of {} frames", frames);
            self.session.release_region(frames)?;
            return Ok(Some(StopReason::SizeLimitReached));
        }

        if region.is_discontinuous() {
            self.stats.discontinuities += 1;
            log::warn!("Data discontinuity at device position {}", region.device_position);
        }
        if region.is_silent() {
            self.stats.silent_packets += 1;
            self.accumulator.append(&vec![0u8; len])?;
        } else {
            self.accumulator.append(bytes)?;
        }
        self.stats.packets += 1;
        self.stats.frames += frames as u64;

        let padding = self.session.current_padding()?;
        let interval = poll_interval(
            self.session.buffer_frame_capacity(),
            padding,
            self.format.samples_per_sec(),
        );
        log::trace!("Read {} frames, padding {}, sleeping {:?}", frames, padding, interval);
        self.pacer.sleep(interval);

        self.session.release_region(frames)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::endpoint_session::BufferRegion;

    /// Serves the same packet forever and logs every release.
    struct RepeatingPacket {
        bytes: Vec<u8>,
        releases: Vec<u32>,
        stopped: bool,
    }

    impl EndpointSession for RepeatingPacket {
        fn format(&self) -> PcmFormat {
            PcmFormat::target_profile()
        }
        fn device_name(&self) -> String {
            "Repeating Speakers".into()
        }
        fn device_period(&self) -> Duration {
            Duration::ZERO
        }
        fn buffer_frame_capacity(&self) -> u32 {
            0
        }
        fn start(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), CaptureError> {
            self.stopped = true;
            Ok(())
        }
        fn buffer_region(&mut self) -> Result<BufferRegion<'_>, CaptureError> {
            Ok(BufferRegion {
                bytes: &self.bytes,
                frames: (self.bytes.len() / 4) as u32,
                flags: 0,
                device_position: 0,
                qpc_position: 0,
            })
        }
        fn release_region(&mut self, frames: u32) -> Result<(), CaptureError> {
            self.releases.push(frames);
            Ok(())
        }
        fn current_padding(&self) -> Result<u32, CaptureError> {
            Ok(0)
        }
    }

    struct NoSleep;

    impl Pacer for NoSleep {
        fn sleep(&mut self, _duration: Duration) {}
    }

    #[test]
    fn stops_at_wav_size_limit_and_keeps_captured_audio() {
        let session = RepeatingPacket {
            bytes: vec![0x3C; 16],
            releases: Vec::new(),
            stopped: false,
        };
        let mut driver =
            CaptureDriver::with_pacer(session, NoSleep, &CaptureConfiguration::default(), CancellationToken::new());
        // Room for one 16-byte packet, not two.
        driver.accumulator = PcmAccumulator::with_remaining_capacity(20);

        let captured = driver.run().unwrap();
        assert_eq!(captured.stop_reason, StopReason::SizeLimitReached);
        assert_eq!(captured.data.remaining_capacity(), 4);
        assert_eq!(captured.data.as_bytes(), &[0x3Cu8; 16]);
        assert_eq!(captured.stats.packets, 1);
        assert_eq!(driver.state(), CaptureState::Stopped(StopReason::SizeLimitReached));

        let session = driver.into_session();
        // The packet that did not fit is still handed back to the endpoint.
        assert_eq!(session.releases, vec![4, 4]);
        assert!(session.stopped);
    }

    #[test]
    fn poll_interval_is_half_the_fill_time() {
        // 4410 free frames at 44.1 kHz take 100 ms to fill.
        assert_eq!(poll_interval(8820, 4410, 44100), Duration::from_millis(50));
    }

    #[test]
    fn poll_interval_with_full_buffer_is_zero() {
        assert_eq!(poll_interval(8820, 8820, 44100), Duration::ZERO);
        assert_eq!(poll_interval(8820, 9000, 44100), Duration::ZERO);
    }

    #[test]
    fn poll_interval_with_empty_buffer() {
        assert_eq!(poll_interval(44100, 0, 44100), Duration::from_millis(500));
    }
}
