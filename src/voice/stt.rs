//! Speech-to-text (STT) processing

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{Config, VoiceConfig};
use crate::language::Language;
use crate::voice::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use crate::{Error, Result};

/// What came back from a voice capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Recognized speech
    Text(String),
    /// Audio was captured but could not be understood
    Unintelligible,
    /// Nobody spoke before the listen timeout, or no microphone
    NoSpeech,
    /// Recognition service could not be reached
    Unavailable(String),
}

impl Recognition {
    /// Recognized text, if any non-blank text was heard
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Status line suitable for the learner
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Text(_) => "Speech recognized.",
            Self::Unintelligible => "Sorry, I could not understand that. Please try again.",
            Self::NoSpeech => "Could not detect speech. Please try again.",
            Self::Unavailable(_) => "Could not reach the recognition service. Please try again.",
        }
    }
}

impl fmt::Display for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            other => f.write_str(other.status()),
        }
    }
}

/// Captures an attempt and turns it into a [`Recognition`]
///
/// Implementations block the calling task until a result or a timeout and
/// never fail; faults become non-text variants. `language` is a hint; with
/// `None` the service detects the spoken language itself.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, language: Option<Language>) -> Recognition;
}

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl SpeechToText {
    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new_whisper(api_key: Option<SecretString>, model: String, config: &Config) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key required for Whisper".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.network.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    /// Transcribe audio to text
    ///
    /// # Arguments
    ///
    /// * `audio` - WAV audio bytes
    /// * `language` - expected spoken language, sent as a hint
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8], language: Option<Language>) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), ?language, "starting Whisper transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());
        if let Some(language) = language {
            form = form.text("language", language.speech_code());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            e
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe, folding every failure into a [`Recognition`]
    pub async fn recognize_wav(&self, audio: &[u8], language: Option<Language>) -> Recognition {
        match self.transcribe(audio, language).await {
            Ok(text) if text.trim().is_empty() => Recognition::Unintelligible,
            Ok(text) => Recognition::Text(text.trim().to_string()),
            Err(e) => Recognition::Unavailable(e.to_string()),
        }
    }
}

/// Listens on the default microphone and transcribes with Whisper
pub struct MicrophoneRecognizer {
    stt: Option<SpeechToText>,
    voice: VoiceConfig,
}

impl MicrophoneRecognizer {
    /// Build from configuration
    ///
    /// A missing `OpenAI` key is not fatal here: every capture then reports
    /// [`Recognition::Unavailable`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let stt = match SpeechToText::new_whisper(
            config.api_keys.clone().openai,
            config.voice.stt_model.clone(),
            config,
        ) {
            Ok(stt) => Some(stt),
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition disabled");
                None
            }
        };

        Self {
            stt,
            voice: config.voice.clone(),
        }
    }
}

#[async_trait]
impl Recognizer for MicrophoneRecognizer {
    async fn recognize(&self, language: Option<Language>) -> Recognition {
        let Some(stt) = &self.stt else {
            return Recognition::Unavailable("OpenAI API key not configured".to_string());
        };

        let voice = self.voice.clone();
        let captured = tokio::task::spawn_blocking(move || {
            let mut capture = AudioCapture::new()?;
            capture.listen(&voice)
        })
        .await;

        let samples = match captured {
            Ok(Ok(Some(samples))) => samples,
            Ok(Ok(None)) => return Recognition::NoSpeech,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "microphone capture failed");
                return Recognition::NoSpeech;
            }
            Err(e) => {
                tracing::error!(error = %e, "capture task failed");
                return Recognition::NoSpeech;
            }
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode capture");
                return Recognition::Unintelligible;
            }
        };

        let recognition = stt.recognize_wav(&wav, language).await;
        if let Recognition::Unavailable(reason) = &recognition {
            tracing::warn!(%reason, "recognition unavailable");
        }
        recognition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_not_text() {
        assert_eq!(Recognition::Text("  ".to_string()).text(), None);
        assert_eq!(Recognition::Text("hola".to_string()).text(), Some("hola"));
        assert_eq!(Recognition::NoSpeech.text(), None);
    }

    #[test]
    fn failures_render_as_try_again() {
        for r in [
            Recognition::Unintelligible,
            Recognition::NoSpeech,
            Recognition::Unavailable("timeout".to_string()),
        ] {
            assert!(r.to_string().contains("try again"), "{r:?}");
        }
    }

    #[test]
    fn whisper_requires_key() {
        let config = Config::default();
        assert!(SpeechToText::new_whisper(None, "whisper-1".to_string(), &config).is_err());
        assert!(
            SpeechToText::new_whisper(
                Some(SecretString::from(String::new())),
                "whisper-1".to_string(),
                &config
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn recognizer_without_key_is_unavailable() {
        let recognizer = MicrophoneRecognizer::from_config(&Config::default());
        assert!(matches!(
            recognizer.recognize(Some(Language::Spanish)).await,
            Recognition::Unavailable(_)
        ));
    }
}
