//! Audio playback to speakers

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// How often a running playback checks its stop signal and ceiling
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tail left for the device buffer to drain after the last sample
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Shared flag asking a running playback to stop early
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both handles control the same playback
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// The clip played to the end
    Finished,
    /// The ceiling elapsed and the stream was torn down
    TimedOut,
    /// The stop signal was raised
    Stopped,
}

/// Plays an encoded audio file, blocking until it ends
///
/// Implementations must return within `ceiling` (plus a small drain margin)
/// and must stop promptly once `stop` is raised.
pub trait Player: Send + Sync {
    /// # Errors
    ///
    /// Returns error if the file cannot be decoded or no device can play it
    fn play_file(&self, path: &Path, ceiling: Duration, stop: &StopSignal) -> Result<PlaybackEnd>;
}

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Plays audio to the default output device
///
/// The device is looked up on every call so a missing or unplugged speaker
/// only fails the playback that needed it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioPlayback;

impl AudioPlayback {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Play MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub fn play_mp3(&self, mp3_data: &[u8], ceiling: Duration, stop: &StopSignal) -> Result<PlaybackEnd> {
        let audio = decode_mp3(mp3_data)?;
        self.play_samples(&audio.samples, audio.sample_rate, ceiling, stop)
    }

    /// Play mono f32 samples
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available or the stream fails
    pub fn play_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        ceiling: Duration,
        stop: &StopSignal,
    ) -> Result<PlaybackEnd> {
        if samples.is_empty() {
            return Ok(PlaybackEnd::Finished);
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let config = output_config(&device, sample_rate)?;
        let samples = if config.sample_rate.0 == sample_rate {
            samples.to_vec()
        } else {
            resample(samples, sample_rate, config.sample_rate.0)
        };

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            samples = samples.len(),
            "starting playback"
        );

        let channels = usize::from(config.channels);
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = {
            let samples = Arc::clone(&samples);
            let position = Arc::clone(&position);
            let finished = Arc::clone(&finished);
            device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            let sample = samples.get(pos).copied().unwrap_or_else(|| {
                                finished.store(true, Ordering::Release);
                                0.0
                            });
                            frame.fill(sample);
                            if pos < samples.len() {
                                pos += 1;
                            }
                        }
                        position.store(pos, Ordering::Relaxed);
                    },
                    |err| {
                        tracing::error!(error = %err, "audio playback error");
                    },
                    None,
                )
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let start = Instant::now();
        let end = loop {
            if finished.load(Ordering::Acquire) {
                std::thread::sleep(DRAIN_DELAY);
                break PlaybackEnd::Finished;
            }
            if stop.is_raised() {
                break PlaybackEnd::Stopped;
            }
            if start.elapsed() >= ceiling {
                break PlaybackEnd::TimedOut;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        // Dropping the stream releases the device and halts output mid-clip
        drop(stream);
        tracing::debug!(?end, elapsed_ms = start.elapsed().as_millis(), "playback ended");

        Ok(end)
    }
}

impl Player for AudioPlayback {
    fn play_file(&self, path: &Path, ceiling: Duration, stop: &StopSignal) -> Result<PlaybackEnd> {
        let data = std::fs::read(path)?;
        self.play_mp3(&data, ceiling, stop)
    }
}

/// Pick an output config at `sample_rate`, preferring mono, else the
/// device default
fn output_config(device: &Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports = |channels: u16| {
        device.supported_output_configs().ok()?.find(|c| {
            c.channels() == channels
                && c.sample_format() == cpal::SampleFormat::F32
                && c.min_sample_rate() <= rate
                && c.max_sample_rate() >= rate
        })
    };

    if let Some(supported) = supports(1).or_else(|| supports(2)) {
        return Ok(supported.with_sample_rate(rate).config());
    }

    device
        .default_output_config()
        .map(|c| c.config())
        .map_err(|e| Error::Audio(format!("no suitable output config: {e}")))
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = u32::try_from(frame.sample_rate).unwrap_or_default();
                }
                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Playback("no audio frames in clip".to_string()));
    }

    Ok(DecodedAudio { samples, sample_rate })
}

/// Linear resampling between rates
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if samples.is_empty() || from == 0 || to == 0 {
        return Vec::new();
    }

    let ratio = f64::from(from) / f64::from(to);
    let out_len = (samples.len() as f64 / ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let src = i as f64 * ratio;
            let idx = (src.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (src - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!handle.is_raised());
        signal.raise();
        assert!(handle.is_raised());
        assert!(signal.ptr_eq(&handle));
        assert!(!signal.ptr_eq(&StopSignal::new()));
    }

    #[test]
    fn garbage_is_not_mp3() {
        assert!(decode_mp3(b"definitely not audio").is_err());
        assert!(decode_mp3(&[]).is_err());
    }

    #[test]
    fn resample_changes_length_by_ratio() {
        let samples = vec![0.0; 24_000];
        assert_eq!(resample(&samples, 24_000, 48_000).len(), 48_000);
        assert_eq!(resample(&samples, 24_000, 16_000).len(), 16_000);
    }

    #[test]
    fn resample_interpolates() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_samples_finish_immediately() {
        let end = AudioPlayback::new()
            .play_samples(&[], 24_000, Duration::from_secs(1), &StopSignal::new())
            .unwrap();
        assert_eq!(end, PlaybackEnd::Finished);
    }
}
