//! Voice processing module
//!
//! Handles microphone capture, speech recognition, speech synthesis and
//! playback.

mod capture;
mod playback;
mod speaker;
mod stt;
mod tts;

pub use capture::{
    AudioCapture, ListenState, SAMPLE_RATE, UtteranceDetector, calculate_energy, energy_threshold,
    samples_to_wav,
};
pub use playback::{AudioPlayback, DecodedAudio, PlaybackEnd, Player, StopSignal, decode_mp3};
pub use speaker::{PlaybackReport, Speaker};
pub use stt::{MicrophoneRecognizer, Recognition, Recognizer, SpeechToText};
pub use tts::{Synthesizer, TextToSpeech, chunk_text};
