//! TOML configuration file loading and saving
//!
//! Supports `~/.config/linguify/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::{AppearanceMode, TtsProviderKind};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinguifyConfigFile {
    /// Terminal appearance ("Light", "Dark" or "System")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance_mode: Option<AppearanceMode>,

    /// Language selected in the sidebar (e.g. "Spanish"); unknown names
    /// fall back to Spanish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Outbound HTTP configuration
    #[serde(default)]
    pub network: NetworkFileConfig,
}

/// API keys configuration
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt_model: Option<String>,

    /// TTS backend ("google" or "openai")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_provider: Option<TtsProviderKind>,

    /// `OpenAI` TTS voice identifier (e.g. "alloy")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_voice: Option<String>,

    /// Hard ceiling on a single playback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_ceiling_secs: Option<u64>,

    /// How long to wait for speech to start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_timeout_secs: Option<u64>,

    /// Longest phrase captured in one attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase_limit_secs: Option<u64>,

    /// Silence that ends a phrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_threshold_secs: Option<f64>,
}

/// Outbound HTTP configuration
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkFileConfig {
    /// Timeout applied to translation and synthesis requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// `DeepL` endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepl_url: Option<String>,
}

/// Load the TOML config file from an explicit path
///
/// A missing file is not an error; defaults apply.
pub fn load_config_file_from(path: &Path) -> LinguifyConfigFile {
    if !path.exists() {
        return LinguifyConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                LinguifyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            LinguifyConfigFile::default()
        }
    }
}

/// Write the config file, creating parent directories as needed
///
/// # Errors
///
/// Returns error if the file cannot be serialized or written
pub fn save_config_file_to(path: &Path, config: &LinguifyConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    tracing::debug!(path = %path.display(), "saved config file");
    Ok(())
}

/// Load, modify and write back the config file at `path`
///
/// An existing file that cannot be parsed is copied to `<path>.bak` before
/// it is replaced.
///
/// # Errors
///
/// Returns error if the existing file cannot be read or backed up, or the
/// updated file cannot be written
pub fn update_config_file(
    path: &Path,
    update: impl FnOnce(&mut LinguifyConfigFile),
) -> Result<LinguifyConfigFile> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                let backup = backup_path(path);
                std::fs::copy(path, &backup)?;
                tracing::warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "config file unparsable, replacing it"
                );
                LinguifyConfigFile::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LinguifyConfigFile::default(),
        Err(e) => return Err(e.into()),
    };
    update(&mut config);
    save_config_file_to(path, &config)?;
    Ok(config)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Return the config file path: `~/.config/linguify/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("linguify").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_file_from(&dir.path().join("absent.toml"));
        assert_eq!(config, LinguifyConfigFile::default());
    }

    #[test]
    fn unparsable_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "appearance_mode = [not toml").unwrap();
        assert_eq!(load_config_file_from(&path), LinguifyConfigFile::default());
    }

    #[test]
    fn update_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        update_config_file(&path, |fc| {
            fc.appearance_mode = Some(AppearanceMode::Dark);
            fc.api_keys.deepl = Some("abc:fx".to_string());
        })
        .unwrap();

        update_config_file(&path, |fc| fc.language = Some("German".to_string())).unwrap();

        let loaded = load_config_file_from(&path);
        assert_eq!(loaded.appearance_mode, Some(AppearanceMode::Dark));
        assert_eq!(loaded.language.as_deref(), Some("German"));
        assert_eq!(loaded.api_keys.deepl.as_deref(), Some("abc:fx"));
    }

    #[test]
    fn unparsable_file_is_backed_up_before_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let broken = "[api_keys]\ndeepl = \"keep-me:fx\"\nlanguage = [oops";
        std::fs::write(&path, broken).unwrap();

        update_config_file(&path, |fc| fc.appearance_mode = Some(AppearanceMode::Light)).unwrap();

        let backup = dir.path().join("config.toml.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), broken);
        let loaded = load_config_file_from(&path);
        assert_eq!(loaded.appearance_mode, Some(AppearanceMode::Light));
        assert!(loaded.api_keys.deepl.is_none());
    }

    #[test]
    fn parses_partial_file() {
        let parsed: LinguifyConfigFile = toml::from_str(
            r#"
            appearance_mode = "Light"

            [voice]
            tts_provider = "openai"
            playback_ceiling_secs = 12
            "#,
        )
        .unwrap();

        assert_eq!(parsed.appearance_mode, Some(AppearanceMode::Light));
        assert_eq!(parsed.voice.tts_provider, Some(TtsProviderKind::OpenAi));
        assert_eq!(parsed.voice.playback_ceiling_secs, Some(12));
        assert!(parsed.api_keys.deepl.is_none());
    }
}
