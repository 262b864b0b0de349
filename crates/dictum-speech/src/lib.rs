//! Dictum Speech crate - text-to-speech capability for drill cues.
//!
//! Provides the [`SpeechEngine`] trait the playback scheduler speaks through,
//! an external-command engine for real audio, a silent engine for headless
//! runs, and a mock engine for testing without audio hardware.
//!
//! Engines report completion asynchronously by sending
//! [`PlaybackSignal::SpeechFinished`] tagged with the utterance's generation.

pub mod command;

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use dictum_core::error::DictumError;
use dictum_core::types::{Generation, PlaybackSignal, Pronunciation};

pub use command::CommandSpeech;

// =============================================================================
// Errors
// =============================================================================

/// Failure reported synchronously by a speech engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// The speech backend could not be reached or started.
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused this particular utterance.
    #[error("utterance {text:?} rejected: {reason}")]
    Rejected { text: String, reason: String },
}

impl From<SpeechError> for DictumError {
    fn from(err: SpeechError) -> Self {
        DictumError::Speech(err.to_string())
    }
}

// =============================================================================
// Utterance
// =============================================================================

/// One spoken cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub pronunciation: Pronunciation,
    /// Playback generation the completion signal must carry.
    pub generation: Generation,
}

impl Utterance {
    pub fn new(text: impl Into<String>, pronunciation: Pronunciation, generation: Generation) -> Self {
        Self {
            text: text.into(),
            pronunciation,
            generation,
        }
    }

    pub fn locale(&self) -> &'static str {
        self.pronunciation.locale()
    }
}

// =============================================================================
// Trait
// =============================================================================

/// Speech capability used by the playback scheduler.
///
/// `speak` must return promptly. Completion is reported later as
/// `PlaybackSignal::SpeechFinished(utterance.generation)`; an engine that
/// returns `Err` never reports completion for that utterance.
pub trait SpeechEngine: Send {
    /// Begin speaking an utterance.
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Abort any in-flight utterance. Idempotent.
    fn cancel(&mut self);
}

// =============================================================================
// Silent engine
// =============================================================================

/// Engine that produces no audio and completes every utterance at once.
///
/// Used when speech is disabled so that cue pacing still runs.
#[derive(Debug, Clone)]
pub struct SilentSpeech {
    signals: UnboundedSender<PlaybackSignal>,
}

impl SilentSpeech {
    pub fn new(signals: UnboundedSender<PlaybackSignal>) -> Self {
        Self { signals }
    }
}

impl SpeechEngine for SilentSpeech {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        debug!(word = %utterance.text, generation = %utterance.generation, "Silent cue");
        self.signals
            .send(PlaybackSignal::SpeechFinished(utterance.generation))
            .map_err(|_| SpeechError::Unavailable("signal channel closed".to_string()))
    }

    fn cancel(&mut self) {}
}

// =============================================================================
// Mock implementation
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    spoken: Vec<Utterance>,
    cancels: usize,
    fail_remaining: usize,
    fail_always: bool,
    notifier: Option<UnboundedSender<PlaybackSignal>>,
}

/// Mock speech engine for testing.
///
/// Records every utterance and cancel call. Clones share state, so a test can
/// keep one handle while the scheduler owns another. Completion is driven by
/// the test unless a notifier channel is attached.
#[derive(Debug, Clone, Default)]
pub struct MockSpeech {
    state: Arc<Mutex<MockState>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every accepted utterance immediately on `notifier`.
    pub fn with_notifier(notifier: UnboundedSender<PlaybackSignal>) -> Self {
        let mock = Self::default();
        mock.lock().notifier = Some(notifier);
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reject the next `count` utterances.
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_remaining = count;
    }

    /// Reject every utterance until turned off.
    pub fn fail_always(&self, fail: bool) {
        self.lock().fail_always = fail;
    }

    /// Utterances accepted so far, in order.
    pub fn spoken(&self) -> Vec<Utterance> {
        self.lock().spoken.clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.lock().spoken.iter().map(|u| u.text.clone()).collect()
    }

    pub fn spoken_count(&self) -> usize {
        self.lock().spoken.len()
    }

    pub fn last_generation(&self) -> Option<Generation> {
        self.lock().spoken.last().map(|u| u.generation)
    }

    pub fn cancel_count(&self) -> usize {
        self.lock().cancels
    }
}

impl SpeechEngine for MockSpeech {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        let mut state = self.lock();
        if state.fail_always || state.fail_remaining > 0 {
            state.fail_remaining = state.fail_remaining.saturating_sub(1);
            return Err(SpeechError::Rejected {
                text: utterance.text.clone(),
                reason: "mock failure".to_string(),
            });
        }
        state.spoken.push(utterance.clone());
        if let Some(notifier) = &state.notifier {
            let _ = notifier.send(PlaybackSignal::SpeechFinished(utterance.generation));
        }
        Ok(())
    }

    fn cancel(&mut self) {
        self.lock().cancels += 1;
    }
}

// =============================================================================
// Tests
// =============================================================================
