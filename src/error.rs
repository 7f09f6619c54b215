//! Error types for Linguify

use thiserror::Error;

/// Result type alias for Linguify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Linguify
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Translation error
    #[error("translation error: {0}")]
    Translation(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Practice session received an action its current state does not allow
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Background task ended without delivering its result
    #[error("background task failed: {0}")]
    Task(String),

    /// Language name or code not supported
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML writing error
    #[error("toml write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
