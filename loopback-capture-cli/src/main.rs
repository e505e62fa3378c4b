use anyhow::{anyhow, Context, Result};
use clap::Parser;
use loopback_capture_core::storage::{metadata, wav_writer};
use loopback_capture_core::{
    CancellationToken, CaptureConfiguration, CaptureDriver, EndpointSession, RecordingMetadata, RecordingResult,
    StopReason,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "loopback-capture")]
#[command(about = "Record what the default output device is playing to a WAV file")]
struct Args {
    /// Recording duration in seconds (0 = until Ctrl+C)
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    duration: f64,

    /// Output WAV file path. Nothing is recorded when omitted.
    #[arg(short, long, value_parser = parse_output_path)]
    output: Option<PathBuf>,

    /// Also write a `.metadata.json` sidecar next to the recording
    #[arg(long)]
    metadata: bool,
}

impl Args {
    fn to_config(&self) -> CaptureConfiguration {
        CaptureConfiguration {
            duration_secs: self.duration,
            output_path: self.output.clone().filter(|p| !p.as_os_str().is_empty()),
            write_metadata: self.metadata,
            ..Default::default()
        }
    }
}

/// Accepts `*.wav` paths, and the empty string as "no output".
fn parse_output_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if value.is_empty() {
        return Ok(path);
    }
    wav_writer::validate_output_path(&path).map_err(|e| e.to_string())?;
    Ok(path)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = args.to_config();
    config.validate().map_err(|e| anyhow!(e))?;

    let Some(output) = config.output_path.clone() else {
        log::debug!("No output path given; nothing to record");
        return Ok(());
    };

    if !loopback_capture_windows::is_supported() {
        anyhow::bail!("loopback capture requires Windows (WASAPI)");
    }

    // Set up Ctrl+C handler
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by SIGINT");
        handler_token.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let result = run_capture(&config, &output, cancel)?;
    log::info!(
        "Recorded {:.2}s ({} bytes, sha256 {})",
        result.duration_secs,
        result.data_size,
        result.checksum
    );

    println!("Successfully done");
    Ok(())
}

#[cfg(target_os = "windows")]
fn run_capture(config: &CaptureConfiguration, output: &Path, cancel: CancellationToken) -> Result<RecordingResult> {
    let session = loopback_capture_windows::WasapiLoopbackSession::open_default()
        .context("Failed to open loopback session on the default output device")?;
    record(session, config, output, cancel)
}

#[cfg(not(target_os = "windows"))]
fn run_capture(_config: &CaptureConfiguration, _output: &Path, _cancel: CancellationToken) -> Result<RecordingResult> {
    anyhow::bail!("loopback capture requires Windows (WASAPI)")
}

/// Drive a capture on `session` and write the result to `output`.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn record<S: EndpointSession>(
    session: S,
    config: &CaptureConfiguration,
    output: &Path,
    cancel: CancellationToken,
) -> Result<RecordingResult> {
    let format = session.format();
    let device_name = session.device_name();

    println!("Capturing what you hear from: {}", device_name);
    println!("--------");
    println!("Format: PCM {} bit signed integer", format.bits_per_sample());
    println!("Rate: {} Hz", format.samples_per_sec());
    println!("Channels: {}", format.channels());
    println!("--------");
    println!("Default capturing period: {} ms", session.device_period().as_millis());
    println!("Allocated buffer size: {}", session.buffer_frame_capacity());

    let mut driver = CaptureDriver::new(session, config, cancel);

    println!("Start capturing loopback audio with shared-timer-driven mode");
    if config.is_unbounded() {
        println!("Press Ctrl-C to stop capturing");
    }

    let captured = driver.run().context("Capture failed")?;
    println!("Stop capturing");
    if captured.stop_reason == StopReason::SizeLimitReached {
        eprintln!("Recording stopped early: WAV size limit reached");
    }

    let result = wav_writer::write_recording(output, &captured)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if config.write_metadata {
        let sidecar = RecordingMetadata::new(&result, &captured.format, &device_name);
        let path = metadata::write_metadata(&sidecar, output).context("Failed to write metadata")?;
        log::info!("Wrote metadata to {}", path.display());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_flags() {
        let args = Args::try_parse_from(["loopback-capture", "-d", "2.5", "-o", "take.wav"]).unwrap();
        assert_eq!(args.duration, 2.5);
        assert_eq!(args.output, Some(PathBuf::from("take.wav")));

        let args = Args::try_parse_from(["loopback-capture", "--duration", "1", "--output", "x.WAV"]).unwrap();
        assert_eq!(args.duration, 1.0);
        assert!(!args.metadata);
    }

    #[test]
    fn defaults_to_unbounded_without_output() {
        let args = Args::try_parse_from(["loopback-capture"]).unwrap();
        let config = args.to_config();
        assert!(config.is_unbounded());
        assert!(config.output_path.is_none());
    }

    #[test]
    fn empty_output_means_no_capture() {
        let args = Args::try_parse_from(["loopback-capture", "-o", ""]).unwrap();
        assert!(args.to_config().output_path.is_none());
    }

    #[test]
    fn rejects_non_wav_output() {
        assert!(Args::try_parse_from(["loopback-capture", "-o", "take.mp3"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_duration() {
        assert!(Args::try_parse_from(["loopback-capture", "-d", "forever", "-o", "a.wav"]).is_err());
    }

    #[test]
    fn negative_duration_is_unbounded() {
        let args = Args::try_parse_from(["loopback-capture", "-d", "-1", "-o", "a.wav"]).unwrap();
        assert!(args.to_config().is_unbounded());
    }

    #[test]
    fn metadata_flag() {
        let args = Args::try_parse_from(["loopback-capture", "-o", "a.wav", "--metadata"]).unwrap();
        assert!(args.to_config().write_metadata);
    }

    /// Serves one packet of `frames` frames, then nothing.
    struct OnePacket {
        bytes: Vec<u8>,
        served: bool,
    }

    impl EndpointSession for OnePacket {
        fn format(&self) -> loopback_capture_core::PcmFormat {
            loopback_capture_core::PcmFormat::target_profile()
        }
        fn device_name(&self) -> String {
            "Test Speakers".into()
        }
        fn device_period(&self) -> std::time::Duration {
            std::time::Duration::ZERO
        }
        fn buffer_frame_capacity(&self) -> u32 {
            0
        }
        fn start(&mut self) -> Result<(), loopback_capture_core::CaptureError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), loopback_capture_core::CaptureError> {
            Ok(())
        }
        fn buffer_region(
            &mut self,
        ) -> Result<loopback_capture_core::BufferRegion<'_>, loopback_capture_core::CaptureError> {
            let frames = if self.served { 0 } else { (self.bytes.len() / 4) as u32 };
            self.served = true;
            Ok(loopback_capture_core::BufferRegion {
                bytes: &self.bytes,
                frames,
                flags: 0,
                device_position: 0,
                qpc_position: 0,
            })
        }
        fn release_region(&mut self, _frames: u32) -> Result<(), loopback_capture_core::CaptureError> {
            Ok(())
        }
        fn current_padding(&self) -> Result<u32, loopback_capture_core::CaptureError> {
            Ok(0)
        }
    }

    #[test]
    fn record_writes_wav_and_metadata() {
        let dir = std::env::temp_dir().join(format!("loopback_capture_cli_{}", std::process::id()));
        let output = dir.join("take.wav");
        let config = CaptureConfiguration {
            // 4 frames at 44.1 kHz exceed this, so the second check stops the loop.
            duration_secs: 1e-6,
            output_path: Some(output.clone()),
            write_metadata: true,
            ..Default::default()
        };
        let session = OnePacket {
            bytes: vec![7u8; 16],
            served: false,
        };

        let result = record(session, &config, &output, CancellationToken::new()).unwrap();
        assert_eq!(result.stop_reason, StopReason::DurationReached);
        assert_eq!(result.data_size, 16);
        assert_eq!(std::fs::read(&output).unwrap().len(), 60);

        let sidecar = metadata::read_metadata(&output).unwrap();
        assert_eq!(sidecar.device_name, "Test Speakers");
        assert_eq!(sidecar.checksum, result.checksum);

        std::fs::remove_dir_all(&dir).ok();
    }
}
