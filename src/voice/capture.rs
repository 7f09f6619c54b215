//! Audio capture from microphone

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Lowest energy ever treated as speech, even in a silent room
const MIN_ENERGY_THRESHOLD: f32 = 0.01;

/// Speech must be this many times louder than the calibrated ambient level
const AMBIENT_RATIO: f32 = 1.5;

/// How often the capture loop drains the device buffer
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captures audio from the default input device
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if capture fails
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured audio buffer and clear it
    ///
    /// Returns the audio samples captured since last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Clear the audio buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Capture one spoken phrase, blocking the calling thread
    ///
    /// Measures ambient noise for `voice.calibration`, then waits up to
    /// `voice.listen_timeout` for speech to start and records until
    /// `voice.pause_threshold` of silence or `voice.phrase_limit`.
    /// Returns `None` when nobody spoke before the timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn listen(&mut self, voice: &VoiceConfig) -> Result<Option<Vec<f32>>> {
        self.clear_buffer();
        self.start()?;

        std::thread::sleep(voice.calibration);
        let ambient = self.take_buffer();
        let threshold = energy_threshold(&ambient);
        tracing::debug!(
            ambient_samples = ambient.len(),
            threshold,
            "calibrated for ambient noise"
        );

        let mut detector = UtteranceDetector::new(threshold, SAMPLE_RATE, voice);
        let started = Instant::now();
        let deadline = listen_deadline(voice);

        let state = loop {
            std::thread::sleep(POLL_INTERVAL);
            let state = detector.feed(&self.take_buffer());
            if matches!(state, ListenState::Complete | ListenState::TimedOut) {
                break state;
            }
            if started.elapsed() > deadline {
                tracing::warn!("input device stalled while listening");
                break ListenState::TimedOut;
            }
        };

        self.stop();

        match state {
            ListenState::Complete => Ok(Some(detector.into_utterance())),
            _ => {
                tracing::debug!("no speech before listen timeout");
                Ok(None)
            }
        }
    }
}

/// Progress of a single listen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    /// Waiting for speech to start
    Waiting,
    /// Speech in progress
    Speaking,
    /// Phrase ended by a pause or the phrase limit
    Complete,
    /// Nobody spoke before the listen timeout
    TimedOut,
}

/// Splits a stream of samples into one utterance
///
/// A chunk counts as speech when its RMS energy exceeds the threshold.
/// Limits come from [`VoiceConfig`].
#[derive(Debug)]
pub struct UtteranceDetector {
    threshold: f32,
    state: ListenState,
    buffer: Vec<f32>,
    waited: usize,
    silence: usize,
    listen_timeout: usize,
    phrase_limit: usize,
    pause: usize,
}

impl UtteranceDetector {
    /// Create a detector for samples at `sample_rate`
    #[must_use]
    pub fn new(threshold: f32, sample_rate: u32, voice: &VoiceConfig) -> Self {
        let samples = |d: Duration| duration_to_samples(d, sample_rate);
        Self {
            threshold,
            state: ListenState::Waiting,
            buffer: Vec::new(),
            waited: 0,
            silence: 0,
            listen_timeout: samples(voice.listen_timeout),
            phrase_limit: samples(voice.phrase_limit),
            pause: samples(voice.pause_threshold),
        }
    }

    /// Feed the next chunk of samples
    pub fn feed(&mut self, samples: &[f32]) -> ListenState {
        if samples.is_empty() {
            return self.state;
        }

        let is_speech = calculate_energy(samples) > self.threshold;

        match self.state {
            ListenState::Waiting => {
                if is_speech {
                    self.state = ListenState::Speaking;
                    self.buffer.extend_from_slice(samples);
                    tracing::trace!("speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited > self.listen_timeout {
                        self.state = ListenState::TimedOut;
                    }
                }
            }
            ListenState::Speaking => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence >= self.pause || self.buffer.len() >= self.phrase_limit {
                    tracing::debug!(samples = self.buffer.len(), "phrase complete");
                    self.state = ListenState::Complete;
                }
            }
            ListenState::Complete | ListenState::TimedOut => {}
        }

        self.state
    }

    #[must_use]
    pub const fn state(&self) -> ListenState {
        self.state
    }

    /// Consume the detector, returning the captured phrase
    #[must_use]
    pub fn into_utterance(self) -> Vec<f32> {
        self.buffer
    }
}

/// Speech threshold derived from a window of ambient noise
#[must_use]
pub fn energy_threshold(ambient: &[f32]) -> f32 {
    (calculate_energy(ambient) * AMBIENT_RATIO).max(MIN_ENERGY_THRESHOLD)
}

/// Calculate RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    usize::try_from(duration.as_millis().saturating_mul(u128::from(sample_rate)) / 1000)
        .unwrap_or(usize::MAX)
}

/// Wall-clock backstop for `listen` in case the device delivers no samples
fn listen_deadline(voice: &VoiceConfig) -> Duration {
    voice
        .listen_timeout
        .saturating_add(voice.phrase_limit)
        .saturating_add(Duration::from_secs(1))
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;

    fn tone(seconds: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * seconds) as usize;
        (0..n)
            .map(|i| 0.3 * (i as f32 * 0.1).sin())
            .collect()
    }

    fn silence(seconds: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * seconds) as usize;
        vec![0.0; n]
    }

    fn voice() -> VoiceConfig {
        VoiceConfig {
            listen_timeout: Duration::from_secs(1),
            phrase_limit: Duration::from_secs(3),
            pause_threshold: Duration::from_millis(500),
            ..VoiceConfig::default()
        }
    }

    #[test]
    fn pause_ends_phrase() {
        let mut detector = UtteranceDetector::new(0.05, SAMPLE_RATE, &voice());
        assert_eq!(detector.feed(&silence(0.2)), ListenState::Waiting);
        assert_eq!(detector.feed(&tone(0.5)), ListenState::Speaking);
        assert_eq!(detector.feed(&silence(0.3)), ListenState::Speaking);
        assert_eq!(detector.feed(&silence(0.3)), ListenState::Complete);

        // Leading silence is dropped, trailing pause is kept
        let utterance = detector.into_utterance();
        assert_eq!(utterance.len(), tone(0.5).len() + 2 * silence(0.3).len());
    }

    #[test]
    fn silence_times_out() {
        let mut detector = UtteranceDetector::new(0.05, SAMPLE_RATE, &voice());
        assert_eq!(detector.feed(&silence(0.6)), ListenState::Waiting);
        assert_eq!(detector.feed(&silence(0.6)), ListenState::TimedOut);
        // Terminal states stick
        assert_eq!(detector.feed(&tone(0.5)), ListenState::TimedOut);
    }

    #[test]
    fn huge_limits_saturate() {
        let voice = VoiceConfig {
            listen_timeout: Duration::from_secs(u64::MAX),
            phrase_limit: Duration::from_secs(u64::MAX),
            ..VoiceConfig::default()
        };
        assert_eq!(listen_deadline(&voice), Duration::MAX);

        let mut detector = UtteranceDetector::new(0.05, SAMPLE_RATE, &voice);
        assert_eq!(detector.feed(&silence(0.5)), ListenState::Waiting);
        assert_eq!(detector.feed(&tone(0.5)), ListenState::Speaking);
    }

    #[test]
    fn phrase_limit_caps_recording() {
        let mut detector = UtteranceDetector::new(0.05, SAMPLE_RATE, &voice());
        detector.feed(&tone(2.0));
        assert_eq!(detector.feed(&tone(1.5)), ListenState::Complete);
    }

    #[test]
    fn threshold_tracks_ambient_noise() {
        assert!((energy_threshold(&silence(0.1)) - MIN_ENERGY_THRESHOLD).abs() < f32::EPSILON);
        let noisy = vec![0.1; 1600];
        assert!((energy_threshold(&noisy) - 0.15).abs() < 1e-4);
    }

    #[test]
    fn empty_chunk_does_not_advance() {
        let mut detector = UtteranceDetector::new(0.05, SAMPLE_RATE, &voice());
        assert_eq!(detector.feed(&[]), ListenState::Waiting);
        assert_eq!(detector.state(), ListenState::Waiting);
    }
}
