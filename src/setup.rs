//! Interactive first-run setup wizard (`linguify setup`)

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{self, LinguifyConfigFile};
use crate::config::{AppearanceMode, TtsProviderKind};
use crate::language::Language;
use crate::shell::theme_for;

/// Run the interactive setup wizard
///
/// Writes to `path`, or the standard config location when `None`.
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup(path: Option<&Path>) -> anyhow::Result<()> {
    println!("Linguify Setup\n");

    let config_path = path
        .map(Path::to_path_buf)
        .or_else(file::config_file_path)
        .unwrap_or_else(|| PathBuf::from("linguify.toml"));

    // Load existing config if present
    let existing = file::load_config_file_from(&config_path);
    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Appearance first so the remaining prompts use it
    let appearance_default = existing.appearance_mode.unwrap_or_default();
    let appearance_idx = Select::with_theme(&*theme_for(appearance_default))
        .with_prompt("Appearance mode")
        .items(&AppearanceMode::ALL)
        .default(
            AppearanceMode::ALL
                .iter()
                .position(|m| *m == appearance_default)
                .unwrap_or_default(),
        )
        .interact()?;
    let appearance = AppearanceMode::ALL[appearance_idx];
    let theme = theme_for(appearance);

    // 2. Practice language
    let language_default = existing
        .language
        .as_deref()
        .map_or_else(Language::default, Language::from_name_or_default);
    let language_idx = Select::with_theme(&*theme)
        .with_prompt("Language to practice")
        .items(&Language::ALL)
        .default(
            Language::ALL
                .iter()
                .position(|l| *l == language_default)
                .unwrap_or_default(),
        )
        .interact()?;
    let language = Language::ALL[language_idx];

    // 3. DeepL key (translation)
    let deepl = prompt_key(
        &*theme,
        "DeepL API key (DEEPL_API_KEY)",
        existing.api_keys.deepl.as_deref(),
    )?;
    if deepl.is_none() {
        println!("Without a DeepL key, translation practice shows an error instead of a translation.");
    }

    // 4. OpenAI key (speech recognition, optional TTS)
    let openai = prompt_key(
        &*theme,
        "OpenAI API key for speech recognition (OPENAI_API_KEY)",
        existing.api_keys.openai.as_deref(),
    )?;

    // 5. TTS provider
    let mut tts_provider = existing.voice.tts_provider.unwrap_or_default();
    if openai.is_some() {
        let providers = ["Google (no key)", "OpenAI"];
        let default = usize::from(tts_provider == TtsProviderKind::OpenAi);
        let provider_idx = Select::with_theme(&*theme)
            .with_prompt("Speech synthesis provider")
            .items(&providers)
            .default(default)
            .interact()?;
        tts_provider = if provider_idx == 1 {
            TtsProviderKind::OpenAi
        } else {
            TtsProviderKind::Google
        };
    } else if tts_provider == TtsProviderKind::OpenAi {
        println!("OpenAI speech synthesis needs an OpenAI key; using Google.");
        tts_provider = TtsProviderKind::Google;
    }

    let mut config_file = LinguifyConfigFile {
        appearance_mode: Some(appearance),
        language: Some(language.to_string()),
        ..existing
    };
    config_file.api_keys.deepl = deepl;
    config_file.api_keys.openai = openai;
    config_file.voice.tts_provider = Some(tts_provider);

    let write = Confirm::with_theme(&*theme)
        .with_prompt(format!("Write config to {}?", config_path.display()))
        .default(true)
        .interact()?;

    if !write {
        println!("\nNothing written.");
        return Ok(());
    }

    file::save_config_file_to(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `linguify` to start practicing.");

    Ok(())
}

/// Ask for a key, keeping the current one on blank input
fn prompt_key(
    theme: &dyn dialoguer::theme::Theme,
    label: &str,
    existing: Option<&str>,
) -> anyhow::Result<Option<String>> {
    let prompt = match existing.map(mask_key) {
        Some(masked) => format!("{label} (current: {masked}, leave blank to keep)"),
        None => format!("{label} (leave blank to skip)"),
    };

    let input: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok(if input.is_empty() {
        existing.map(str::to_string)
    } else {
        Some(input.to_string())
    })
}

/// Show only the ends of a key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
