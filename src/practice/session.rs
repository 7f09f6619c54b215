//! Practice loop: present a phrase, capture an attempt, compare, give feedback

use std::fmt;

use crate::language::{Language, Phrase};
use crate::practice::{normalize_str, similarity};
use crate::voice::Recognition;
use crate::{Error, Result};

/// Score above which a non-exact attempt counts as close
pub const CLOSE_THRESHOLD: f64 = 0.7;

/// Result of comparing an attempt to its target phrase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Normalized texts are identical
    Correct,
    /// Token similarity above [`CLOSE_THRESHOLD`]
    Close { score: f64 },
    /// Token similarity at or below [`CLOSE_THRESHOLD`]
    Incorrect { score: f64 },
    /// Nothing usable was captured
    NotRecognized,
}

impl Outcome {
    #[must_use]
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Compare an attempt against a target phrase
///
/// Exact normalized equality wins; otherwise the Jaccard token score decides
/// between close and incorrect. A missing or blank attempt is not recognized.
#[must_use]
pub fn evaluate(target: &str, attempt: Option<&str>) -> Outcome {
    let Some(attempt) = attempt.filter(|a| !a.trim().is_empty()) else {
        return Outcome::NotRecognized;
    };

    let attempt = normalize_str(attempt);
    let target = normalize_str(target);

    if attempt == target {
        return Outcome::Correct;
    }

    let score = similarity(&attempt, &target);
    if score > CLOSE_THRESHOLD {
        Outcome::Close { score }
    } else {
        Outcome::Incorrect { score }
    }
}

/// Feedback shown after an attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub outcome: Outcome,
    /// What the recognizer heard, as spoken (not normalized)
    pub attempt: Option<String>,
    pub target: String,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attempt = self.attempt.as_deref().unwrap_or_default();
        match self.outcome {
            Outcome::Correct => write!(f, "Great job! You said it correctly!"),
            Outcome::NotRecognized => {
                write!(f, "Could not recognize your speech. Please try again.")
            }
            Outcome::Close { score } => write!(
                f,
                "Good attempt! ({:.0}% match)\nYou said: {attempt}\nCorrect: {}",
                score * 100.0,
                self.target
            ),
            Outcome::Incorrect { .. } => write!(
                f,
                "Keep practicing!\nYou said: {attempt}\nCorrect: {}",
                self.target
            ),
        }
    }
}

/// Wrapping cursor over a fixed phrase list
#[derive(Debug, Clone)]
pub struct PhraseCursor {
    phrases: Vec<String>,
    index: usize,
}

impl PhraseCursor {
    /// Create a cursor at index 0
    ///
    /// # Errors
    ///
    /// Returns error if `phrases` is empty
    pub fn new(phrases: Vec<String>) -> Result<Self> {
        if phrases.is_empty() {
            return Err(Error::Config("practice needs at least one phrase".to_string()));
        }
        Ok(Self { phrases, index: 0 })
    }

    #[must_use]
    pub fn current(&self) -> &str {
        &self.phrases[self.index]
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of phrases; never zero
    #[must_use]
    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// Move forward, wrapping from the last phrase to the first
    pub fn next_phrase(&mut self) -> usize {
        self.index = (self.index + 1) % self.phrases.len();
        self.index
    }

    /// Move back, wrapping from the first phrase to the last
    pub fn previous_phrase(&mut self) -> usize {
        let len = self.phrases.len();
        self.index = (self.index + len - 1) % len;
        self.index
    }
}

/// State of a practice session
#[derive(Debug, Clone, PartialEq)]
pub enum PracticeState {
    /// A phrase is selected and waiting for the learner
    Idle,
    /// Voice capture in progress
    AwaitingCapture,
    /// Attempt received, being scored
    Comparing,
    /// Outcome available
    Feedback(Feedback),
    /// Session ended
    Finished,
}

impl PracticeState {
    const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingCapture => "awaiting capture",
            Self::Comparing => "comparing",
            Self::Feedback(_) => "showing feedback",
            Self::Finished => "finished",
        }
    }
}

/// A single learner's practice session over one phrase list
///
/// All looping is driven by the caller; nothing here retries on its own and
/// nothing is persisted.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    language: Language,
    cursor: PhraseCursor,
    state: PracticeState,
    attempts: u32,
    correct: u32,
}

impl PracticeSession {
    /// Practice the built-in phrases of `language`
    #[must_use]
    pub fn new(language: Language) -> Self {
        let phrases = language.phrases().iter().map(ToString::to_string).collect();
        Self {
            language,
            // Built-in lists are never empty
            cursor: PhraseCursor {
                phrases,
                index: 0,
            },
            state: PracticeState::Idle,
            attempts: 0,
            correct: 0,
        }
    }

    /// Practice a caller-supplied list (e.g. a fresh translation)
    ///
    /// # Errors
    ///
    /// Returns error if `phrases` is empty
    pub fn with_phrases(language: Language, phrases: Vec<String>) -> Result<Self> {
        Ok(Self {
            language,
            cursor: PhraseCursor::new(phrases)?,
            state: PracticeState::Idle,
            attempts: 0,
            correct: 0,
        })
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub const fn state(&self) -> &PracticeState {
        &self.state
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.cursor.index()
    }

    #[must_use]
    pub fn phrase_count(&self) -> usize {
        self.cursor.phrase_count()
    }

    /// The phrase currently being practiced
    #[must_use]
    pub fn current_phrase(&self) -> Phrase {
        Phrase::new(self.cursor.current(), self.language)
    }

    /// Number of attempts submitted this session
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of attempts scored as correct this session
    #[must_use]
    pub const fn correct(&self) -> u32 {
        self.correct
    }

    /// Learner pressed "record"
    ///
    /// # Errors
    ///
    /// Returns error unless the session is idle or showing feedback
    pub fn begin_capture(&mut self) -> Result<()> {
        match self.state {
            PracticeState::Idle | PracticeState::Feedback(_) => {
                self.transition(PracticeState::AwaitingCapture);
                Ok(())
            }
            _ => Err(self.invalid("record")),
        }
    }

    /// Score the capture result and move to feedback
    ///
    /// # Errors
    ///
    /// Returns error unless a capture is in progress
    pub fn submit(&mut self, recognition: &Recognition) -> Result<Feedback> {
        if self.state != PracticeState::AwaitingCapture {
            return Err(self.invalid("submit an attempt"));
        }

        let target = self.cursor.current().to_string();
        let attempt = recognition.text().map(ToString::to_string);

        let outcome = if attempt.is_some() {
            self.transition(PracticeState::Comparing);
            evaluate(&target, attempt.as_deref())
        } else {
            Outcome::NotRecognized
        };

        self.attempts += 1;
        if outcome.is_correct() {
            self.correct += 1;
        }

        tracing::debug!(
            language = %self.language,
            index = self.cursor.index(),
            ?outcome,
            "attempt scored"
        );

        let feedback = Feedback {
            outcome,
            attempt,
            target,
        };
        self.transition(PracticeState::Feedback(feedback.clone()));
        Ok(feedback)
    }

    /// Try the same phrase again
    ///
    /// # Errors
    ///
    /// Returns error unless feedback is showing
    pub fn retry(&mut self) -> Result<()> {
        match self.state {
            PracticeState::Feedback(_) => {
                self.transition(PracticeState::AwaitingCapture);
                Ok(())
            }
            _ => Err(self.invalid("retry")),
        }
    }

    /// Advance to the next phrase (wrapping)
    ///
    /// # Errors
    ///
    /// Returns error while capturing or after the session finished
    pub fn next_phrase(&mut self) -> Result<usize> {
        self.ensure_navigable("go to the next phrase")?;
        let index = self.cursor.next_phrase();
        self.transition(PracticeState::Idle);
        Ok(index)
    }

    /// Go back to the previous phrase (wrapping)
    ///
    /// # Errors
    ///
    /// Returns error while capturing or after the session finished
    pub fn previous_phrase(&mut self) -> Result<usize> {
        self.ensure_navigable("go to the previous phrase")?;
        let index = self.cursor.previous_phrase();
        self.transition(PracticeState::Idle);
        Ok(index)
    }

    /// End the session
    ///
    /// # Errors
    ///
    /// Returns error while capturing or if already finished
    pub fn exit(&mut self) -> Result<()> {
        self.ensure_navigable("exit")?;
        tracing::info!(
            language = %self.language,
            attempts = self.attempts,
            correct = self.correct,
            "practice session finished"
        );
        self.transition(PracticeState::Finished);
        Ok(())
    }

    fn ensure_navigable(&self, action: &'static str) -> Result<()> {
        match self.state {
            PracticeState::Idle | PracticeState::Feedback(_) => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    fn transition(&mut self, next: PracticeState) {
        tracing::trace!(from = self.state.label(), to = next.label(), "practice transition");
        self.state = next;
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.label(),
        }
    }
}
