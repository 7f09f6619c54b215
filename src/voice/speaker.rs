//! Speaks text aloud through temporary audio artifacts
//!
//! Each request synthesizes into a uniquely named `.mp3` under the configured
//! temp directory, plays it on a blocking worker and deletes it afterwards.
//! Deletion that fails is retried in the background. Only one playback runs
//! at a time; a newer request stops the running one.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use uuid::Uuid;

use super::playback::{AudioPlayback, PlaybackEnd, Player, StopSignal};
use super::tts::{Synthesizer, TextToSpeech};
use crate::Result;
use crate::config::Config;
use crate::language::Language;

/// How a `speak` request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackReport {
    /// The clip played to the end
    Played,
    /// The playback ceiling elapsed and the stream was stopped
    TimedOut,
    /// A newer request took over the speaker
    Superseded,
    /// Synthesis failed, timed out, or the artifact could not be written
    SynthesisFailed(String),
    /// The clip could not be played
    PlaybackFailed(String),
}

impl PlaybackReport {
    /// Whether any audio reached the speaker
    #[must_use]
    pub const fn was_heard(&self) -> bool {
        matches!(self, Self::Played | Self::TimedOut)
    }
}

impl fmt::Display for PlaybackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Played => f.write_str("Played."),
            Self::TimedOut => f.write_str("Playback stopped after reaching its time limit."),
            Self::Superseded => f.write_str("Playback interrupted."),
            Self::SynthesisFailed(reason) => write!(f, "Could not synthesize speech: {reason}"),
            Self::PlaybackFailed(reason) => write!(f, "Could not play audio: {reason}"),
        }
    }
}

/// Deferred deletion policy for artifacts that could not be removed at once
#[derive(Debug, Clone, Copy)]
struct CleanupPolicy {
    retry_delay: Duration,
    attempts: u32,
}

impl CleanupPolicy {
    fn from_config(config: &Config) -> Self {
        Self {
            retry_delay: config.voice.cleanup_retry_delay,
            attempts: config.voice.cleanup_retry_attempts,
        }
    }
}

/// Text-to-speech playback with exclusive ownership of the output device
pub struct Speaker {
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn Player>,
    temp_dir: PathBuf,
    ceiling: Duration,
    synthesis_timeout: Duration,
    cleanup: CleanupPolicy,
    slot: tokio::sync::Mutex<()>,
    in_flight: Mutex<Option<StopSignal>>,
    deferred: Mutex<JoinSet<()>>,
}

impl Speaker {
    /// Build a speaker from explicit collaborators
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>, player: Arc<dyn Player>, config: &Config) -> Self {
        Self {
            synthesizer,
            player,
            temp_dir: config.temp_dir.clone(),
            ceiling: config.voice.playback_ceiling,
            synthesis_timeout: config.network.request_timeout,
            cleanup: CleanupPolicy::from_config(config),
            slot: tokio::sync::Mutex::new(()),
            in_flight: Mutex::new(None),
            deferred: Mutex::new(JoinSet::new()),
        }
    }

    /// Build a speaker using the configured TTS provider and the default
    /// output device
    ///
    /// # Errors
    ///
    /// Returns error if the TTS client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let synthesizer = TextToSpeech::from_config(config)?;
        tracing::debug!(provider = synthesizer.name(), "speaker ready");
        Ok(Self::new(Arc::new(synthesizer), Arc::new(AudioPlayback::new()), config))
    }

    /// Synthesize `text` in `language` and play it
    ///
    /// Never fails; every fault is logged and reported.
    pub async fn speak(&self, text: &str, language: Language) -> PlaybackReport {
        let playback_id = Uuid::new_v4();
        let stop = StopSignal::new();

        let previous = self.lock_in_flight().replace(stop.clone());
        if let Some(previous) = previous {
            tracing::debug!(%playback_id, "stopping previous playback");
            previous.raise();
        }

        let _slot = self.slot.lock().await;

        let report = if stop.is_raised() {
            PlaybackReport::Superseded
        } else {
            self.run(playback_id, text, language, &stop).await
        };

        {
            let mut in_flight = self.lock_in_flight();
            if in_flight.as_ref().is_some_and(|s| s.ptr_eq(&stop)) {
                *in_flight = None;
            }
        }

        match &report {
            PlaybackReport::SynthesisFailed(reason) | PlaybackReport::PlaybackFailed(reason) => {
                tracing::warn!(%playback_id, %reason, "speech failed");
            }
            other => tracing::debug!(%playback_id, report = ?other, "speech finished"),
        }

        report
    }

    /// Wait for deferred artifact deletions scheduled by earlier requests
    ///
    /// Call before the runtime shuts down so retries are not dropped.
    pub async fn finish_cleanup(&self) {
        let mut pending = std::mem::take(&mut *self.deferred.lock().unwrap_or_else(PoisonError::into_inner));
        if !pending.is_empty() {
            tracing::debug!(pending = pending.len(), "waiting for deferred artifact deletion");
        }
        while pending.join_next().await.is_some() {}
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<StopSignal>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, playback_id: Uuid, text: &str, language: Language, stop: &StopSignal) -> PlaybackReport {
        let path = match acquire_artifact(&self.temp_dir) {
            Ok(path) => path,
            Err(e) => return PlaybackReport::SynthesisFailed(format!("temp file: {e}")),
        };
        tracing::debug!(%playback_id, path = %path.display(), "artifact acquired");

        let report = self.synthesize_and_play(&path, text, language, stop).await;

        if let Some(retry) = release_artifact(path, self.cleanup) {
            self.deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .spawn(retry);
        }
        report
    }

    async fn synthesize_and_play(
        &self,
        path: &Path,
        text: &str,
        language: Language,
        stop: &StopSignal,
    ) -> PlaybackReport {
        let audio = match tokio::time::timeout(
            self.synthesis_timeout,
            self.synthesizer.synthesize(text, language),
        )
        .await
        {
            Ok(Ok(audio)) => audio,
            Ok(Err(e)) => return PlaybackReport::SynthesisFailed(e.to_string()),
            Err(_) => {
                return PlaybackReport::SynthesisFailed(format!(
                    "timed out after {}s",
                    self.synthesis_timeout.as_secs_f32()
                ));
            }
        };

        if let Err(e) = tokio::fs::write(path, &audio).await {
            return PlaybackReport::SynthesisFailed(format!("writing audio: {e}"));
        }

        if stop.is_raised() {
            return PlaybackReport::Superseded;
        }

        let player = Arc::clone(&self.player);
        let artifact = path.to_path_buf();
        let ceiling = self.ceiling;
        let signal = stop.clone();
        let played =
            tokio::task::spawn_blocking(move || player.play_file(&artifact, ceiling, &signal)).await;

        match played {
            Ok(Ok(PlaybackEnd::Finished)) => PlaybackReport::Played,
            Ok(Ok(PlaybackEnd::TimedOut)) => PlaybackReport::TimedOut,
            Ok(Ok(PlaybackEnd::Stopped)) => PlaybackReport::Superseded,
            Ok(Err(e)) => PlaybackReport::PlaybackFailed(e.to_string()),
            Err(e) => PlaybackReport::PlaybackFailed(format!("playback worker failed: {e}")),
        }
    }
}

/// Create a uniquely named, empty `.mp3` artifact in `dir`
fn acquire_artifact(dir: &Path) -> io::Result<PathBuf> {
    tempfile::Builder::new()
        .prefix("linguify-")
        .suffix(".mp3")
        .tempfile_in(dir)?
        .into_temp_path()
        .keep()
        .map_err(|e| e.error)
}

/// Delete an artifact now, or return the retry loop to run if that fails
fn release_artifact(path: PathBuf, policy: CleanupPolicy) -> Option<impl Future<Output = ()> + Send + 'static> {
    match remove(&path) {
        Ok(()) => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "artifact deletion failed, retrying later");
        }
    }

    Some(async move {
        for attempt in 1..=policy.attempts {
            tokio::time::sleep(policy.retry_delay).await;
            match remove(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), attempt, "deferred deletion succeeded");
                    return;
                }
                Err(e) => tracing::debug!(path = %path.display(), attempt, error = %e, "deferred deletion failed"),
            }
        }
        tracing::warn!(path = %path.display(), attempts = policy.attempts, "giving up on artifact deletion");
    })
}

fn remove(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
