//! Configuration management for Linguify
//!
//! Every collaborator receives the parts of [`Config`] it needs when it is
//! constructed; there is no process-wide configuration state.

pub mod file;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::{Error, Result};

/// Default timeout for translation and synthesis requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default hard ceiling for a single playback
pub const DEFAULT_PLAYBACK_CEILING: Duration = Duration::from_secs(30);

/// Terminal appearance preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppearanceMode {
    Light,
    Dark,
    #[default]
    System,
}

impl AppearanceMode {
    pub const ALL: [Self; 3] = [Self::Light, Self::Dark, Self::System];
}

impl fmt::Display for AppearanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
            Self::System => "System",
        })
    }
}

impl FromStr for AppearanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Config(format!("unknown appearance mode: {s}")))
    }
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProviderKind {
    /// Google Translate speech endpoint (no key, language aware)
    #[default]
    Google,
    /// `OpenAI` speech API (requires key)
    #[serde(rename = "openai")]
    OpenAi,
}

impl FromStr for TtsProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `DeepL` API key (translation)
    pub deepl: Option<SecretString>,

    /// `OpenAI` API key (Whisper STT and optional TTS)
    pub openai: Option<SecretString>,
}

impl Clone for ApiKeys {
    fn clone(&self) -> Self {
        Self {
            deepl: self.deepl.as_ref().map(clone_secret),
            openai: self.openai.as_ref().map(clone_secret),
        }
    }
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}

/// Wrap a raw key, treating blank input as absent
#[must_use]
pub fn secret_from(raw: Option<String>) -> Option<SecretString> {
    raw.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model for Whisper (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS backend
    pub tts_provider: TtsProviderKind,

    /// `OpenAI` TTS voice identifier
    pub tts_voice: String,

    /// Hard ceiling on a single playback, independent of clip length
    pub playback_ceiling: Duration,

    /// Delay before retrying a failed temp-file deletion
    pub cleanup_retry_delay: Duration,

    /// Number of deferred deletion attempts
    pub cleanup_retry_attempts: u32,

    /// Window used to measure background noise before listening
    pub calibration: Duration,

    /// How long to wait for speech to start
    pub listen_timeout: Duration,

    /// Longest phrase captured in one attempt
    pub phrase_limit: Duration,

    /// Silence that ends a phrase
    pub pause_threshold: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: "whisper-1".to_string(),
            tts_provider: TtsProviderKind::Google,
            tts_voice: "alloy".to_string(),
            playback_ceiling: DEFAULT_PLAYBACK_CEILING,
            cleanup_retry_delay: Duration::from_millis(500),
            cleanup_retry_attempts: 5,
            calibration: Duration::from_millis(500),
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(15),
            pause_threshold: Duration::from_secs(2),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Timeout applied to translation and synthesis requests
    pub request_timeout: Duration,

    /// `DeepL` endpoint override; chosen from the key type when absent
    pub deepl_url: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            deepl_url: None,
        }
    }
}

/// Linguify configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Terminal appearance preference
    pub appearance: AppearanceMode,

    /// Language selected at startup
    pub language: Language,

    /// API keys
    pub api_keys: ApiKeys,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Network configuration
    pub network: NetworkConfig,

    /// Directory for temporary audio artifacts
    pub temp_dir: PathBuf,

    /// Where settings changes are written; `None` disables persistence
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appearance: AppearanceMode::default(),
            language: Language::default(),
            api_keys: ApiKeys::default(),
            voice: VoiceConfig::default(),
            network: NetworkConfig::default(),
            temp_dir: std::env::temp_dir(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the standard config file and environment
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn load() -> Result<Self> {
        let path = file::config_file_path();
        Self::load_from(path.as_deref())
    }

    /// Load configuration with an explicit config file path
    ///
    /// Precedence is env > file > default. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let fc = path.map(file::load_config_file_from).unwrap_or_default();
        let defaults = Self::default();

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            deepl: secret_from(std::env::var("DEEPL_API_KEY").ok().or(fc.api_keys.deepl)),
            openai: secret_from(std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai)),
        };

        let language = match std::env::var("LINGUIFY_LANGUAGE") {
            Ok(name) => name.parse()?,
            Err(_) => fc
                .language
                .as_deref()
                .map_or(defaults.language, Language::from_name_or_default),
        };

        let tts_provider = match std::env::var("LINGUIFY_TTS_PROVIDER") {
            Ok(name) => name.parse()?,
            Err(_) => fc.voice.tts_provider.unwrap_or(defaults.voice.tts_provider),
        };

        let request_timeout = match std::env::var("LINGUIFY_REQUEST_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(secs.trim().parse().map_err(|_| {
                Error::Config(format!("LINGUIFY_REQUEST_TIMEOUT_SECS is not a number: {secs}"))
            })?),
            Err(_) => fc
                .network
                .request_timeout_secs
                .map_or(defaults.network.request_timeout, Duration::from_secs),
        };

        let voice = VoiceConfig {
            stt_model: fc.voice.stt_model.unwrap_or(defaults.voice.stt_model),
            tts_provider,
            tts_voice: fc.voice.tts_voice.unwrap_or(defaults.voice.tts_voice),
            playback_ceiling: fc
                .voice
                .playback_ceiling_secs
                .map_or(defaults.voice.playback_ceiling, Duration::from_secs),
            listen_timeout: fc
                .voice
                .listen_timeout_secs
                .map_or(defaults.voice.listen_timeout, Duration::from_secs),
            phrase_limit: fc
                .voice
                .phrase_limit_secs
                .map_or(defaults.voice.phrase_limit, Duration::from_secs),
            pause_threshold: fc
                .voice
                .pause_threshold_secs
                .filter(|s| *s > 0.0)
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .unwrap_or(defaults.voice.pause_threshold),
            ..defaults.voice
        };

        let network = NetworkConfig {
            request_timeout,
            deepl_url: std::env::var("LINGUIFY_DEEPL_URL")
                .ok()
                .or(fc.network.deepl_url),
        };

        Ok(Self {
            appearance: fc.appearance_mode.unwrap_or(defaults.appearance),
            language,
            api_keys,
            voice,
            network,
            temp_dir: defaults.temp_dir,
            config_path: path.map(Path::to_path_buf),
        })
    }

    /// Persist a settings change to the config file, if one is configured
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn persist(&self, update: impl FnOnce(&mut file::LinguifyConfigFile)) -> Result<()> {
        match &self.config_path {
            Some(path) => file::update_config_file(path, update).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Use `dir` for temporary audio artifacts
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_deepl_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.deepl = secret_from(Some(key.into()));
        self
    }

    #[must_use]
    pub fn with_deepl_url(mut self, url: impl Into<String>) -> Self {
        self.network.deepl_url = Some(url.into());
        self
    }

    /// Bound translation and synthesis requests by `timeout`
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.network.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_playback_ceiling(mut self, ceiling: Duration) -> Self {
        self.voice.playback_ceiling = ceiling;
        self
    }

    /// Shorten or lengthen the deferred deletion schedule
    #[must_use]
    pub const fn with_cleanup_retry(mut self, delay: Duration, attempts: u32) -> Self {
        self.voice.cleanup_retry_delay = delay;
        self.voice.cleanup_retry_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let config = Config::default();
        assert_eq!(config.appearance, AppearanceMode::System);
        assert_eq!(config.language, Language::Spanish);
        assert_eq!(config.voice.playback_ceiling, Duration::from_secs(30));
        assert_eq!(config.network.request_timeout, Duration::from_secs(10));
        assert!(config.api_keys.deepl.is_none());
    }

    #[test]
    fn blank_keys_are_absent() {
        assert!(secret_from(Some("   ".to_string())).is_none());
        assert!(secret_from(None).is_none());
        let key = secret_from(Some(" abc ".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "abc");
    }

    #[test]
    fn appearance_parses_case_insensitively() {
        assert_eq!("dark".parse::<AppearanceMode>().unwrap(), AppearanceMode::Dark);
        assert!("neon".parse::<AppearanceMode>().is_err());
    }

    #[test]
    fn tts_provider_parses() {
        assert_eq!("OpenAI".parse::<TtsProviderKind>().unwrap(), TtsProviderKind::OpenAi);
        assert_eq!("google".parse::<TtsProviderKind>().unwrap(), TtsProviderKind::Google);
        assert!("espeak".parse::<TtsProviderKind>().is_err());
    }

    #[test]
    fn api_keys_clone_keeps_values() {
        let keys = ApiKeys {
            deepl: secret_from(Some("k:fx".to_string())),
            openai: None,
        };
        let cloned = keys.clone();
        assert_eq!(cloned.deepl.unwrap().expose_secret(), "k:fx");
        assert!(cloned.openai.is_none());
    }

    #[test]
    fn persisted_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(Some(path.as_path())).unwrap();
        assert_eq!(config.appearance, AppearanceMode::System);

        config
            .persist(|fc| {
                fc.appearance_mode = Some(AppearanceMode::Light);
                fc.api_keys.deepl = Some("from-file:fx".to_string());
                fc.network.request_timeout_secs = Some(3);
            })
            .unwrap();

        let reloaded = Config::load_from(Some(path.as_path())).unwrap();
        assert_eq!(reloaded.appearance, AppearanceMode::Light);
        assert_eq!(reloaded.config_path.as_deref(), Some(path.as_path()));
        if std::env::var("DEEPL_API_KEY").is_err() {
            assert_eq!(reloaded.api_keys.deepl.unwrap().expose_secret(), "from-file:fx");
        }
        if std::env::var("LINGUIFY_REQUEST_TIMEOUT_SECS").is_err() {
            assert_eq!(reloaded.network.request_timeout, Duration::from_secs(3));
        }
    }

    #[test]
    fn out_of_range_durations_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            language = "Klingon"

            [voice]
            pause_threshold_secs = 1e300
            listen_timeout_secs = 9223372036854775807
            phrase_limit_secs = 9223372036854775807
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.as_path())).unwrap();
        assert_eq!(config.voice.pause_threshold, VoiceConfig::default().pause_threshold);
        assert_eq!(config.voice.listen_timeout, Duration::from_secs(i64::MAX.unsigned_abs()));
        if std::env::var("LINGUIFY_LANGUAGE").is_err() {
            assert_eq!(config.language, Language::Spanish);
        }
    }

    #[test]
    fn negative_pause_threshold_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[voice]\npause_threshold_secs = -2.0\n").unwrap();

        let config = Config::load_from(Some(path.as_path())).unwrap();
        assert_eq!(config.voice.pause_threshold, VoiceConfig::default().pause_threshold);
    }

    #[test]
    fn builders_override_defaults() {
        let config = Config::default()
            .with_temp_dir("/tmp/linguify-test")
            .with_deepl_key(" key ")
            .with_request_timeout(Duration::from_secs(1))
            .with_cleanup_retry(Duration::from_millis(5), 2);
        assert_eq!(config.temp_dir, PathBuf::from("/tmp/linguify-test"));
        assert_eq!(config.api_keys.deepl.unwrap().expose_secret(), "key");
        assert_eq!(config.network.request_timeout, Duration::from_secs(1));
        assert_eq!(config.voice.cleanup_retry_attempts, 2);
    }

    #[test]
    fn persist_without_path_is_a_no_op() {
        let config = Config::default();
        config
            .persist(|fc| fc.appearance_mode = Some(AppearanceMode::Dark))
            .unwrap();
    }
}
