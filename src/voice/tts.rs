//! Text-to-speech (TTS) processing

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{Config, TtsProviderKind};
use crate::language::Language;
use crate::{Error, Result};

/// Longest text the Google endpoint accepts per request
const GOOGLE_MAX_CHARS: usize = 200;

/// Turns text into encoded audio (MP3)
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// TTS provider backend
#[derive(Clone, Debug)]
enum TtsProvider {
    Google,
    OpenAI { api_key: SecretString },
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    voice: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a TTS instance using the Google Translate speech endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_google(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            voice: String::new(),
            provider: TtsProvider::Google,
        })
    }

    /// Create a TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: Option<SecretString>, config: &Config) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key required for TTS".to_string()))?;

        Ok(Self {
            client: http_client(config)?,
            voice: config.voice.tts_voice.clone(),
            provider: TtsProvider::OpenAI { api_key },
        })
    }

    /// Create the configured provider, falling back to Google when the
    /// `OpenAI` key is missing
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.voice.tts_provider {
            TtsProviderKind::Google => Self::new_google(config),
            TtsProviderKind::OpenAi => Self::new_openai(config.api_keys.clone().openai, config)
                .or_else(|e| {
                    tracing::warn!(error = %e, "falling back to Google TTS");
                    Self::new_google(config)
                }),
        }
    }

    /// Synthesize using the Google Translate speech endpoint
    async fn synthesize_google(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        let mut audio = Vec::new();

        // MP3 frames concatenate cleanly, so long text is spoken chunk by chunk
        for chunk in chunk_text(text, GOOGLE_MAX_CHARS) {
            let response = self
                .client
                .get("https://translate.google.com/translate_tts")
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", language.speech_code()),
                    ("client", "tw-ob"),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Tts(format!("Google TTS error {status}: {body}")));
            }

            audio.extend_from_slice(&response.bytes().await?);
        }

        Ok(audio)
    }

    /// Synthesize using `OpenAI` TTS
    async fn synthesize_openai(&self, api_key: &SecretString, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
        }

        let request = TtsRequest {
            model: "tts-1",
            input: text,
            voice: &self.voice,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::Tts("nothing to synthesize".to_string()));
        }

        tracing::debug!(provider = self.name(), %language, chars = text.chars().count(), "synthesizing");

        match &self.provider {
            TtsProvider::Google => self.synthesize_google(text, language).await,
            // OpenAI voices infer the language from the text itself
            TtsProvider::OpenAI { api_key } => self.synthesize_openai(api_key, text).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.provider {
            TtsProvider::Google => "google",
            TtsProvider::OpenAI { .. } => "openai",
        }
    }
}

fn http_client(config: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.network.request_timeout)
        .build()?)
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// word boundaries
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("Buenos días", 200), vec!["Buenos días"]);
    }

    #[test]
    fn splits_on_word_boundaries() {
        assert_eq!(
            chunk_text("uno dos tres cuatro", 8),
            vec!["uno dos", "tres", "cuatro"]
        );
    }

    #[test]
    fn oversized_words_are_split() {
        assert_eq!(chunk_text("abcdefghij k", 4), vec!["abcd", "efgh", "ij", "k"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "こんにちは、お元気ですか？";
        assert_eq!(chunk_text(text, 13), vec![text]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_text("   ", 10).is_empty());
    }

    #[test]
    fn openai_requires_key() {
        assert!(TextToSpeech::new_openai(None, &Config::default()).is_err());
    }

    #[test]
    fn openai_without_key_falls_back_to_google() {
        let mut config = Config::default();
        config.voice.tts_provider = TtsProviderKind::OpenAi;
        let tts = TextToSpeech::from_config(&config).unwrap();
        assert_eq!(tts.name(), "google");
    }

    #[tokio::test]
    async fn refuses_blank_text() {
        let tts = TextToSpeech::new_google(&Config::default()).unwrap();
        assert!(tts.synthesize("  ", Language::Spanish).await.is_err());
    }
}
