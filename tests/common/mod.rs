//! Shared test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use linguify::translate::TransportResponse;
use linguify::voice::{PlaybackEnd, Player, StopSignal, Synthesizer};
use linguify::{Config, Error, Language, Result, TranslateTransport};

/// Config whose artifacts land in `dir` and whose retries are quick
#[must_use]
pub fn test_config(dir: &Path) -> Config {
    Config::default()
        .with_temp_dir(dir)
        .with_request_timeout(Duration::from_secs(2))
        .with_playback_ceiling(Duration::from_secs(2))
        .with_cleanup_retry(Duration::from_millis(20), 5)
}

/// Number of entries left in a directory
#[must_use]
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read temp dir").count()
}

/// Wait up to `within` for `dir` to become empty
pub async fn wait_until_empty(dir: &Path, within: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < within {
        if entries(dir) == 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    entries(dir) == 0
}

/// A form request captured by [`StubTransport`]
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub api_key: String,
    pub form: Vec<(String, String)>,
}

/// Transport that replays a canned response and counts invocations
pub struct StubTransport {
    response: std::result::Result<TransportResponse, String>,
    calls: AtomicUsize,
    sent: Mutex<Vec<SentRequest>>,
}

impl StubTransport {
    pub fn ok(status: u16, body: &str) -> Self {
        Self::with(Ok(TransportResponse {
            status,
            body: body.to_string(),
        }))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with(Err(reason.to_string()))
    }

    fn with(response: std::result::Result<TransportResponse, String>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SentRequest> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TranslateTransport for StubTransport {
    async fn post_form(&self, url: &str, api_key: &str, form: &[(&str, &str)]) -> Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            api_key: api_key.to_string(),
            form: form
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
        self.response.clone().map_err(Error::Translation)
    }
}

/// Synthesizer returning canned bytes, optionally after a delay
pub struct StubSynthesizer {
    result: std::result::Result<Vec<u8>, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubSynthesizer {
    pub fn ok(bytes: &[u8]) -> Self {
        Self {
            result: Ok(bytes.to_vec()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str, _language: Language) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone().map_err(Error::Tts)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Player that "plays" for a fixed time, honoring the ceiling and stop signal
pub struct StubPlayer {
    clip: Duration,
    fail: Option<String>,
    lock_artifact: bool,
    started: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl StubPlayer {
    pub fn new(clip: Duration) -> Self {
        Self {
            clip,
            fail: None,
            lock_artifact: false,
            started: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail: Some(reason.to_string()),
            ..Self::new(Duration::ZERO)
        }
    }

    /// Leaves the artifact undeletable (a directory in its place) after playing
    pub fn locking(clip: Duration) -> Self {
        Self {
            lock_artifact: true,
            ..Self::new(clip)
        }
    }

    /// Number of playbacks that reached the device
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Largest number of simultaneous playbacks observed
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Paths and contents of every file handed to the player
    pub fn seen(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl Player for StubPlayer {
    fn play_file(&self, path: &Path, ceiling: Duration, stop: &StopSignal) -> Result<PlaybackEnd> {
        let contents = std::fs::read(path)?;
        self.seen.lock().unwrap().push((path.to_path_buf(), contents));

        if let Some(reason) = &self.fail {
            return Err(Error::Playback(reason.clone()));
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let start = Instant::now();
        let end = loop {
            if stop.is_raised() {
                break PlaybackEnd::Stopped;
            }
            if start.elapsed() >= self.clip {
                break PlaybackEnd::Finished;
            }
            if start.elapsed() >= ceiling {
                break PlaybackEnd::TimedOut;
            }
            std::thread::sleep(Duration::from_millis(5));
        };

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.lock_artifact {
            std::fs::remove_file(path)?;
            std::fs::create_dir(path)?;
        }
        Ok(end)
    }
}
