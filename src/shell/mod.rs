//! Interactive terminal screens
//!
//! The shell owns the session and is the only consumer of background
//! results. Slow work (capture, translation, playback) runs through
//! [`crate::task`]; every service fault becomes a status line.

use std::sync::Arc;

use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Input, Select};

use crate::config::{AppearanceMode, Config};
use crate::language::Language;
use crate::practice::{PracticeSession, PracticeState};
use crate::task::{self, Pending};
use crate::translate::{Translator, is_translation_error};
use crate::voice::{MicrophoneRecognizer, PlaybackReport, Recognition, Recognizer, Speaker};

/// Prompt theme for an appearance mode
#[must_use]
pub fn theme_for(mode: AppearanceMode) -> Box<dyn Theme> {
    match mode {
        AppearanceMode::Light => Box::new(SimpleTheme),
        AppearanceMode::Dark | AppearanceMode::System => Box::new(ColorfulTheme::default()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PracticeAction {
    Record,
    TryAgain,
    Listen,
    Next,
    Previous,
    Back,
}

impl PracticeAction {
    const fn label(self, replay_label: &'static str) -> &'static str {
        match self {
            Self::Record => "Record your attempt",
            Self::TryAgain => "Try again",
            Self::Listen => replay_label,
            Self::Next => "Next phrase",
            Self::Previous => "Previous phrase",
            Self::Back => "Back",
        }
    }
}

/// Terminal front end over the practice engine
pub struct Shell {
    config: Config,
    translator: Arc<Translator>,
    recognizer: Arc<dyn Recognizer>,
    speaker: Arc<Speaker>,
    playback: Option<Pending<PlaybackReport>>,
}

impl Shell {
    /// Build a shell with its collaborators
    #[must_use]
    pub fn new(
        config: Config,
        translator: Arc<Translator>,
        recognizer: Arc<dyn Recognizer>,
        speaker: Arc<Speaker>,
    ) -> Self {
        Self {
            config,
            translator,
            recognizer,
            speaker,
            playback: None,
        }
    }

    /// Build a shell wired to the real services
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let translator = Arc::new(Translator::from_config(&config)?);
        let recognizer = Arc::new(MicrophoneRecognizer::from_config(&config));
        let speaker = Arc::new(Speaker::from_config(&config)?);
        Ok(Self::new(config, translator, recognizer, speaker))
    }

    /// Show the dashboard until the learner quits
    ///
    /// # Errors
    ///
    /// Returns error if the terminal cannot be read
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("Welcome to Linguify");
        println!("Start practicing your language skills with our translation tool.");

        loop {
            self.report_playback();
            println!("\nCurrently selected language: {}", self.config.language);

            let items = [
                "Begin translation practice".to_string(),
                "Enunciation practice".to_string(),
                format!("Language ({})", self.config.language),
                format!("Appearance ({})", self.config.appearance),
                "Quit".to_string(),
            ];

            match self.select("Dashboard", &items, 0)? {
                0 => self.translation_practice().await?,
                1 => {
                    let session = PracticeSession::new(self.config.language);
                    self.practice(session, None).await?;
                }
                2 => self.choose_language()?,
                3 => self.choose_appearance()?,
                _ => break,
            }
        }

        if let Some(pending) = self.playback.take() {
            // Let a clip that is still playing finish before the runtime exits
            if let Ok(report) = pending.wait().await {
                tracing::debug!(%report, "final playback");
            }
        }
        self.speaker.finish_cleanup().await;

        Ok(())
    }

    /// Record or type a sentence, translate it, hear it, then practice it
    #[allow(clippy::future_not_send)]
    async fn translation_practice(&mut self) -> anyhow::Result<()> {
        let language = self.config.language;

        loop {
            self.report_playback();
            let items = ["Record a sentence", "Type a sentence", "Back"];
            let source = match self.select("Translation practice", &items, 0)? {
                0 => {
                    println!("Listening...");
                    let recognition = self.capture(None).await;
                    match recognition.text() {
                        Some(text) => text.to_string(),
                        None => {
                            println!("Could not recognize speech. Please try again.");
                            continue;
                        }
                    }
                }
                1 => {
                    let text: String = Input::with_theme(&*self.theme())
                        .with_prompt("Sentence to translate")
                        .allow_empty(true)
                        .interact_text()?;
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        println!("Please enter or record text to translate first.");
                        continue;
                    }
                    text
                }
                _ => return Ok(()),
            };

            println!("You said: {source}");
            println!("Translating...");

            let translator = Arc::clone(&self.translator);
            let request = source.clone();
            let translation = task::spawn_background("translation", async move {
                translator.translate(&request, language).await
            })
            .wait()
            .await
            .unwrap_or_else(|e| crate::translate::translation_error(&e.to_string()));

            println!("{language}: {translation}");
            if is_translation_error(&translation) {
                continue;
            }

            self.start_playback(translation.clone(), language);

            let session = PracticeSession::with_phrases(language, vec![translation])?;
            let prompt = format!("Say this sentence in {language}: {source}");
            self.practice(session, Some(prompt)).await?;
        }
    }

    /// Drive one practice session until the learner leaves it
    #[allow(clippy::future_not_send)]
    async fn practice(&mut self, mut session: PracticeSession, prompt: Option<String>) -> anyhow::Result<()> {
        let language = session.language();
        let single = session.phrase_count() == 1;
        let replay_label = if single { "Repeat translation" } else { "Listen" };

        loop {
            self.report_playback();
            let phrase = session.current_phrase();

            match &prompt {
                Some(prompt) => println!("\n{prompt}"),
                None => println!(
                    "\n[{}/{}] {}",
                    session.index() + 1,
                    session.phrase_count(),
                    phrase.text
                ),
            }

            let mut actions = match session.state() {
                PracticeState::Idle => vec![PracticeAction::Record, PracticeAction::Listen],
                PracticeState::Feedback(_) => vec![PracticeAction::TryAgain, PracticeAction::Listen],
                _ => break,
            };
            if !single {
                actions.extend([PracticeAction::Next, PracticeAction::Previous]);
            }
            actions.push(PracticeAction::Back);

            let labels: Vec<String> = actions
                .iter()
                .map(|a| a.label(replay_label).to_string())
                .collect();
            let choice = actions[self.select(language.name(), &labels, 0)?];

            match choice {
                PracticeAction::Record | PracticeAction::TryAgain => {
                    if choice == PracticeAction::TryAgain {
                        session.retry()?;
                    } else {
                        session.begin_capture()?;
                    }
                    println!("Listening...");
                    let recognition = self.capture(Some(language)).await;
                    let feedback = session.submit(&recognition)?;
                    println!("{feedback}");
                }
                PracticeAction::Listen => self.start_playback(phrase.text, language),
                PracticeAction::Next => {
                    session.next_phrase()?;
                }
                PracticeAction::Previous => {
                    session.previous_phrase()?;
                }
                PracticeAction::Back => {
                    session.exit()?;
                    println!(
                        "Session: {} of {} attempts correct",
                        session.correct(),
                        session.attempts()
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    /// Capture one utterance without blocking the shell task
    async fn capture(&self, language: Option<Language>) -> Recognition {
        let recognizer = Arc::clone(&self.recognizer);
        let recognition = task::spawn_background("capture", async move {
            recognizer.recognize(language).await
        })
        .wait()
        .await
        .unwrap_or_else(|e| Recognition::Unavailable(e.to_string()));

        if recognition.text().is_none() {
            tracing::debug!(?recognition, "no usable capture");
        }
        recognition
    }

    /// Speak `text` in the background; a newer request stops an older one
    fn start_playback(&mut self, text: String, language: Language) {
        self.report_playback();
        println!("Playing {language} audio...");

        let speaker = Arc::clone(&self.speaker);
        // The previous handle is dropped; its playback reports Superseded
        self.playback = Some(task::spawn_background("playback", async move {
            speaker.speak(&text, language).await
        }));
    }

    /// Show the outcome of a finished background playback, if any
    fn report_playback(&mut self) {
        let Some(pending) = self.playback.as_mut() else {
            return;
        };

        match pending.try_take() {
            Ok(None) => {}
            Ok(Some(report)) => {
                if !matches!(report, PlaybackReport::Played | PlaybackReport::Superseded) {
                    println!("{report}");
                }
                self.playback = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "playback result lost");
                self.playback = None;
            }
        }
    }

    fn choose_language(&mut self) -> anyhow::Result<()> {
        let names: Vec<String> = Language::ALL.iter().map(ToString::to_string).collect();
        let current = Language::ALL
            .iter()
            .position(|l| *l == self.config.language)
            .unwrap_or_default();

        let language = Language::ALL[self.select("Select a language", &names, current)?];
        self.config.language = language;
        tracing::info!(%language, "language changed");

        if let Err(e) = self.config.persist(|fc| fc.language = Some(language.to_string())) {
            tracing::warn!(error = %e, "failed to save language");
            println!("Could not save settings: {e}");
        }
        Ok(())
    }

    fn choose_appearance(&mut self) -> anyhow::Result<()> {
        let names: Vec<String> = AppearanceMode::ALL.iter().map(ToString::to_string).collect();
        let current = AppearanceMode::ALL
            .iter()
            .position(|m| *m == self.config.appearance)
            .unwrap_or_default();

        let mode = AppearanceMode::ALL[self.select("Appearance mode", &names, current)?];
        self.config.appearance = mode;
        tracing::info!(%mode, "appearance changed");

        if let Err(e) = self.config.persist(|fc| fc.appearance_mode = Some(mode)) {
            tracing::warn!(error = %e, "failed to save appearance");
            println!("Could not save settings: {e}");
        }
        Ok(())
    }

    fn theme(&self) -> Box<dyn Theme> {
        theme_for(self.config.appearance)
    }

    fn select<T: ToString>(&self, prompt: &str, items: &[T], default: usize) -> anyhow::Result<usize> {
        Ok(Select::with_theme(&*self.theme())
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?)
    }
}
