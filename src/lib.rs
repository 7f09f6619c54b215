//! Linguify - pronunciation and translation practice in the terminal
//!
//! This library provides the practice engine behind the `linguify` binary:
//! - Text normalization and similarity scoring
//! - The practice-loop state machine
//! - `DeepL` translation with failure sentinels
//! - Voice capture, speech recognition, speech synthesis and playback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Shell                           │
//! │  Dashboard  │  Translation practice  │  Enunciation  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ task::spawn_background
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Practice engine                      │
//! │  PracticeSession  │  normalize  │  similarity        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 External services                    │
//! │  DeepL  │  Whisper STT  │  Google/OpenAI TTS  │  cpal  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod language;
pub mod practice;
pub mod setup;
pub mod shell;
pub mod task;
pub mod translate;
pub mod voice;

pub use config::{AppearanceMode, Config};
pub use error::{Error, Result};
pub use language::{Language, Phrase};
pub use practice::{Feedback, Outcome, PracticeSession, PracticeState, evaluate, normalize, similarity};
pub use task::{Pending, spawn_background, spawn_blocking_background};
pub use translate::{TRANSLATION_ERROR_MARKER, TranslateTransport, Translator, is_translation_error};
pub use voice::{PlaybackReport, Recognition, Recognizer, Speaker};
