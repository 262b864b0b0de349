//! The drill session state machine.
//!
//! Orchestrates the queue, playback scheduler, evaluator, progress tracker,
//! and history log. Lifecycle:
//! - Idle -> Presenting (begin with a non-empty queue)
//! - Idle -> Exhausted (begin with nothing to drill)
//! - Presenting -> Presenting (submit / navigate to another word)
//! - Presenting -> Exhausted (submit past the last word, empty re-derivation)
//! - Exhausted -> Presenting (go back, restart the pass, switch mode)
//!
//! The queue is a snapshot for the current pass. It is re-derived when the
//! session begins, the mode changes, progress is reset, the random-order
//! setting changes, or a new pass is started; judging a word advances the
//! cursor through the existing snapshot.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use dictum_core::config::DrillSettings;
use dictum_core::error::DictumError;
use dictum_core::events::DrillEvent;
use dictum_core::traits::{MemoryProgressStore, NoTranslations, ProgressStore, TranslationLookup};
use dictum_core::types::{
    Attempt, Mode, PlaybackSignal, PlaybackStatus, SessionStatus, Tallies, Word,
};
use dictum_speech::SpeechEngine;

use crate::evaluator::{evaluate, is_exact_match};
use crate::history::HistoryLog;
use crate::progress::ProgressTracker;
use crate::queue::derive_queue;
use crate::scheduler::{CueProgress, CueTimer, PlaybackError, PlaybackScheduler, PlaybackState};

// =============================================================================
// Errors
// =============================================================================

/// Rejected session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("review mode needs at least one missed word")]
    ReviewUnavailable,

    #[error("session is already in {0} mode")]
    ModeUnchanged(Mode),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("session runner has stopped")]
    Closed,
}

impl From<SessionError> for DictumError {
    fn from(err: SessionError) -> Self {
        DictumError::Session(err.to_string())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read-only view of everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub mode: Mode,
    pub current_word: Option<Word>,
    pub translation: Option<String>,
    /// Zero-based cursor; equals `queue_len` once the pass is exhausted.
    pub position: usize,
    pub queue_len: usize,
    pub playback: PlaybackStatus,
    pub tallies: Tallies,
    pub history_len: usize,
    pub last_attempt: Option<Attempt>,
    pub typed_input: String,
    pub review_available: bool,
    pub last_playback_error: Option<String>,
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`DrillSession`] from its collaborators.
pub struct SessionBuilder {
    words: Vec<Word>,
    settings: DrillSettings,
    store: Option<Box<dyn ProgressStore>>,
    translations: Option<Arc<dyn TranslationLookup>>,
    seed: Option<u64>,
    mode: Mode,
}

impl SessionBuilder {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Word>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            settings: DrillSettings::default(),
            store: None,
            translations: None,
            seed: None,
            mode: Mode::Normal,
        }
    }

    pub fn settings(mut self, settings: DrillSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Where progress is loaded from and written to. Defaults to memory.
    pub fn progress_store(mut self, store: impl ProgressStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn translations(mut self, translations: impl TranslationLookup + 'static) -> Self {
        self.translations = Some(Arc::new(translations));
        self
    }

    pub fn shared_translations(mut self, translations: Arc<dyn TranslationLookup>) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Mode the first pass runs in.
    ///
    /// Review with no missed words on record falls back to Normal.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Seed the shuffle for reproducible orderings.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(
        self,
        speech: Box<dyn SpeechEngine>,
        timer: Box<dyn CueTimer>,
    ) -> Result<DrillSession, SessionError> {
        self.settings
            .validate()
            .map_err(|e| SessionError::InvalidSettings(e.to_string()))?;

        let full_list: Vec<Word> = self.words.into_iter().filter(|w| !w.is_blank()).collect();
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryProgressStore::new()));
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let progress = ProgressTracker::load(store);
        let mode = if self.mode == Mode::Review && progress.missed_count() == 0 {
            warn!("No missed words to review; starting in Normal mode");
            Mode::Normal
        } else {
            self.mode
        };

        Ok(DrillSession {
            settings: self.settings,
            full_list,
            progress,
            history: HistoryLog::new(),
            queue: Vec::new(),
            cursor: 0,
            mode,
            status: SessionStatus::Idle,
            typed: String::new(),
            scheduler: PlaybackScheduler::new(speech, timer),
            translations: self
                .translations
                .unwrap_or_else(|| Arc::new(NoTranslations)),
            rng,
            events: Vec::new(),
            last_playback_error: None,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// A dictation drill over one word list.
///
/// All operations run to completion synchronously. Asynchronous playback
/// notifications are fed back through [`DrillSession::handle_signal`].
pub struct DrillSession {
    settings: DrillSettings,
    full_list: Vec<Word>,
    progress: ProgressTracker,
    history: HistoryLog,
    queue: Vec<Word>,
    cursor: usize,
    mode: Mode,
    status: SessionStatus,
    typed: String,
    scheduler: PlaybackScheduler,
    translations: Arc<dyn TranslationLookup>,
    rng: StdRng,
    events: Vec<DrillEvent>,
    last_playback_error: Option<String>,
}

impl std::fmt::Debug for DrillSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrillSession")
            .field("status", &self.status)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("queue_len", &self.queue.len())
            .field("progress", &self.progress)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl DrillSession {
    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Derive the first queue and present its first word with playback.
    ///
    /// Has no effect once the session has begun.
    pub fn begin(&mut self) -> SessionStatus {
        if self.status != SessionStatus::Idle {
            return self.status;
        }
        info!(
            words = self.full_list.len(),
            mode = %self.mode,
            "Drill session started"
        );
        self.rederive();
        self.present(true);
        self.status
    }

    /// Start a new pass over the active mode's queue.
    pub fn restart_pass(&mut self) {
        self.stop_playback();
        self.typed.clear();
        info!(mode = %self.mode, "New pass started");
        self.rederive();
        self.present(true);
    }

    fn transition(&mut self, target: SessionStatus) {
        if !self.status.can_transition_to(&target) {
            warn!("Invalid session transition: {} -> {}", self.status, target);
            return;
        }
        if self.status != target {
            debug!("Session state: {} -> {}", self.status, target);
        }
        self.status = target;
    }

    fn rederive(&mut self) {
        self.queue = derive_queue(
            &self.full_list,
            &self.progress,
            self.mode,
            self.settings.random_order,
            &mut self.rng,
        );
        self.cursor = 0;
        self.emit(DrillEvent::QueueRederived {
            mode: self.mode,
            queue_len: self.queue.len(),
        });
    }

    /// Enter the word under the cursor, or the exhausted state.
    fn present(&mut self, autoplay: bool) {
        match self.queue.get(self.cursor).cloned() {
            Some(word) => {
                self.transition(SessionStatus::Presenting);
                self.emit(DrillEvent::WordPresented {
                    word: word.clone(),
                    position: self.cursor,
                    queue_len: self.queue.len(),
                });
                if autoplay {
                    self.start_playback(&word);
                }
            }
            None => {
                self.stop_playback();
                self.transition(SessionStatus::Exhausted);
                info!(mode = %self.mode, "Nothing left to drill");
                self.emit(DrillEvent::SessionExhausted { mode: self.mode });
            }
        }
    }

    // -------------------------------------------------------------------------
    // Answers
    // -------------------------------------------------------------------------

    /// Judge `typed` against the current word and advance.
    ///
    /// Returns `None` when there is no current word.
    pub fn submit(&mut self, typed: &str) -> Option<Attempt> {
        let word = self.current_word()?.clone();
        self.stop_playback();

        let attempt = Attempt {
            word: word.clone(),
            translation: self.translations.lookup(word.as_str()),
            error_positions: evaluate(word.as_str(), typed),
        };
        let correct = attempt.is_correct();

        self.history.append(attempt.clone());
        match self.mode {
            Mode::Normal => self.progress.record_outcome(&word, correct),
            Mode::Review => self.progress.record_review_outcome(&word, correct),
        }

        info!(word = %word, correct, mode = %self.mode, "Attempt recorded");
        self.emit(DrillEvent::AttemptRecorded {
            word,
            correct,
            error_positions: attempt.error_positions.clone(),
            mode: self.mode,
        });

        self.typed.clear();
        self.cursor = (self.cursor + 1).min(self.queue.len());
        self.present(true);
        Some(attempt)
    }

    /// Record a keystroke; submit when the input exactly matches the word.
    ///
    /// Does nothing beyond updating the pending input when auto-submit is
    /// switched off.
    pub fn auto_submit_on_exact_match(&mut self, typed_so_far: &str) -> Option<Attempt> {
        self.typed = typed_so_far.to_string();
        if !self.settings.auto_submit {
            return None;
        }
        let matched = self
            .current_word()
            .is_some_and(|word| is_exact_match(word.as_str(), typed_so_far));
        if matched {
            self.submit(typed_so_far)
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Step back one word, undoing the most recent history entry.
    ///
    /// Progress is not rolled back. Returns whether the cursor moved.
    pub fn go_to_previous(&mut self) -> bool {
        self.stop_playback();
        self.typed.clear();
        if self.status == SessionStatus::Idle || self.cursor == 0 {
            return false;
        }

        self.cursor -= 1;
        let undone = self.history.pop_last();
        let word = self.queue[self.cursor].clone();
        debug!(
            word = %word,
            undone = ?undone.as_ref().map(|a| a.word.as_str()),
            "Navigated back"
        );
        self.emit(DrillEvent::NavigatedBack {
            word,
            undone: undone.map(|a| a.word),
        });
        self.present(false);
        true
    }

    /// Peek at the next word without judging the current one.
    ///
    /// Returns whether the cursor moved; it never moves past the last word.
    pub fn go_to_next(&mut self) -> bool {
        self.stop_playback();
        self.typed.clear();
        if self.status != SessionStatus::Presenting || self.cursor + 1 >= self.queue.len() {
            return false;
        }

        self.cursor += 1;
        let word = self.queue[self.cursor].clone();
        debug!(word = %word, "Navigated forward");
        self.emit(DrillEvent::NavigatedForward { word });
        self.present(false);
        true
    }

    // -------------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------------

    /// Start continuous playback when idle, stop it when playing.
    pub fn toggle_continuous_play(&mut self) -> PlaybackStatus {
        if self.scheduler.is_playing() {
            self.stop_playback();
        } else if let Some(word) = self.current_word().cloned() {
            self.start_playback(&word);
        }
        self.scheduler.status()
    }

    /// Speak the current word once. Returns whether a cue was issued.
    pub fn replay(&mut self) -> bool {
        let Some(word) = self.current_word().cloned() else {
            return false;
        };
        self.stop_playback();
        match self.scheduler.play_once(&word, self.settings.pronunciation) {
            Ok(_) => {
                self.last_playback_error = None;
                true
            }
            Err(e) => {
                self.playback_failed(e);
                false
            }
        }
    }

    /// Stop continuous playback, invalidating in-flight cues.
    pub fn stop_playback(&mut self) {
        let generation = self.scheduler.generation();
        if self.scheduler.stop() {
            self.emit(DrillEvent::PlaybackStopped { generation });
        }
    }

    fn start_playback(&mut self, word: &Word) {
        let result = self.scheduler.start(
            word,
            self.settings.cue_count,
            self.settings.interval(),
            self.settings.pronunciation,
        );
        match result {
            Ok(generation) => {
                self.last_playback_error = None;
                self.emit(DrillEvent::PlaybackStarted {
                    word: word.clone(),
                    cues: self.settings.cue_count,
                    generation,
                });
            }
            Err(e) => self.playback_failed(e),
        }
    }

    fn playback_failed(&mut self, error: PlaybackError) {
        warn!("Playback failed: {}", error);
        self.last_playback_error = Some(error.to_string());
        self.emit(DrillEvent::PlaybackFailed {
            word: error.word,
            reason: error.source.to_string(),
        });
    }

    /// Feed a speech completion or timer expiry back into playback.
    ///
    /// Exhaustion only ends playback; it never submits. A speech failure is
    /// recorded as a non-fatal playback failure and also returned.
    pub fn handle_signal(&mut self, signal: PlaybackSignal) -> Result<CueProgress, PlaybackError> {
        match self.scheduler.handle_signal(signal) {
            Ok(CueProgress::Exhausted) => {
                if let Some(word) = self.scheduler.word().cloned() {
                    self.emit(DrillEvent::PlaybackExhausted { word });
                }
                Ok(CueProgress::Exhausted)
            }
            Ok(progress) => Ok(progress),
            Err(e) => {
                self.playback_failed(e.clone());
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mode, progress, settings
    // -------------------------------------------------------------------------

    /// Switch between Normal and Review, restarting at the first word.
    ///
    /// Review requires at least one missed word. Playback is not restarted.
    pub fn switch_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        if mode == self.mode {
            return Err(SessionError::ModeUnchanged(mode));
        }
        if mode == Mode::Review && !self.review_available() {
            return Err(SessionError::ReviewUnavailable);
        }

        self.stop_playback();
        self.typed.clear();
        let from = self.mode;
        self.mode = mode;
        info!("Mode switched: {} -> {}", from, mode);
        self.emit(DrillEvent::ModeSwitched { from, to: mode });
        self.rederive();
        self.present(false);
        Ok(())
    }

    /// Clear all progress and return to the start of a Normal pass.
    ///
    /// Irreversible; confirmation is the caller's concern.
    pub fn reset_progress(&mut self) {
        self.stop_playback();
        self.typed.clear();
        self.progress.reset();
        info!("Progress reset");
        self.emit(DrillEvent::ProgressReset);

        if self.mode != Mode::Normal {
            let from = self.mode;
            self.mode = Mode::Normal;
            self.emit(DrillEvent::ModeSwitched {
                from,
                to: Mode::Normal,
            });
        }
        if self.status != SessionStatus::Idle {
            self.rederive();
            self.present(false);
        }
    }

    /// Replace the drill settings.
    ///
    /// Changing how cues sound or are paced stops playback; changing the
    /// random-order flag re-derives the queue from the first word.
    pub fn update_settings(&mut self, settings: DrillSettings) -> Result<(), SessionError> {
        settings
            .validate()
            .map_err(|e| SessionError::InvalidSettings(e.to_string()))?;

        let old = std::mem::replace(&mut self.settings, settings);
        debug!(?settings, "Settings updated");

        let cues_changed = old.pronunciation != settings.pronunciation
            || old.cue_count != settings.cue_count
            || old.interval_secs != settings.interval_secs;
        if cues_changed {
            self.stop_playback();
        }

        if old.random_order != settings.random_order && self.status != SessionStatus::Idle {
            self.stop_playback();
            self.typed.clear();
            self.rederive();
            self.present(false);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self) -> &DrillSettings {
        &self.settings
    }

    /// The word awaiting an answer, if any.
    pub fn current_word(&self) -> Option<&Word> {
        match self.status {
            SessionStatus::Presenting => self.queue.get(self.cursor),
            _ => None,
        }
    }

    pub fn current_translation(&self) -> Option<String> {
        self.current_word()
            .map(|word| self.translations.lookup(word.as_str()))
    }

    /// `(cursor, queue length)`.
    pub fn position(&self) -> (usize, usize) {
        (self.cursor, self.queue.len())
    }

    pub fn queue(&self) -> &[Word] {
        &self.queue
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.scheduler.status()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    /// Running mastered / missed counts.
    pub fn tallies(&self) -> Tallies {
        self.progress.tallies()
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn history(&self) -> &[Attempt] {
        self.history.all()
    }

    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.history.last()
    }

    pub fn typed_input(&self) -> &str {
        &self.typed
    }

    pub fn review_available(&self) -> bool {
        self.progress.missed_count() > 0
    }

    pub fn last_playback_error(&self) -> Option<&str> {
        self.last_playback_error.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            mode: self.mode,
            current_word: self.current_word().cloned(),
            translation: self.current_translation(),
            position: self.cursor,
            queue_len: self.queue.len(),
            playback: self.scheduler.status(),
            tallies: self.tallies(),
            history_len: self.history.len(),
            last_attempt: self.history.last().cloned(),
            typed_input: self.typed.clone(),
            review_available: self.review_available(),
            last_playback_error: self.last_playback_error.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    fn emit(&mut self, event: DrillEvent) {
        trace!(event = event.name(), "Drill event");
        self.events.push(event);
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<DrillEvent> {
        std::mem::take(&mut self.events)
    }
}

// =============================================================================
// Tests
// =============================================================================
