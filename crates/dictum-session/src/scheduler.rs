//! Generation-tagged playback of repeated speech cues.
//!
//! The scheduler is sans-IO: it asks a [`SpeechEngine`] to speak and a
//! [`CueTimer`] to wake it up later, and is told about completions through
//! [`PlaybackScheduler::handle_signal`]. Every state-changing action and every
//! spoken cue mints a new [`Generation`]; a completion or timer carrying any
//! other generation is discarded, so a repeated completion for an earlier cue
//! never counts for the one now speaking.
//!
//! Cue lifecycle for `start(word, 3, 1s)`:
//! - speak cue 1 as g1, remaining = 2
//! - speech finished(g1): remaining = 1, timer(1s, g1)
//! - timer fired(g1): speak cue 2 as g2
//! - speech finished(g2): remaining = 0, timer(1s, g2)
//! - timer fired(g2): speak cue 3 as g3
//! - speech finished(g3): exhausted, status = Idle

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use dictum_core::types::{Generation, PlaybackSignal, PlaybackStatus, Pronunciation, Word};
use dictum_speech::{SpeechEngine, SpeechError, Utterance};

// =============================================================================
// Errors
// =============================================================================

/// A cue the speech capability refused. Playback is left idle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to speak '{word}': {source}")]
pub struct PlaybackError {
    pub word: Word,
    #[source]
    pub source: SpeechError,
}

// =============================================================================
// Timer seam
// =============================================================================

/// Cancellable one-shot timer for inter-cue delays.
///
/// When `delay` elapses the implementation must deliver
/// `PlaybackSignal::CueDue(generation)`. Scheduling replaces any pending
/// timer.
pub trait CueTimer: Send {
    fn schedule(&mut self, delay: Duration, generation: Generation);

    /// Drop the pending timer, if any. Idempotent.
    fn cancel(&mut self);
}

#[derive(Debug, Default)]
struct ManualTimerState {
    pending: Option<(Duration, Generation)>,
    scheduled: Vec<(Duration, Generation)>,
    cancels: usize,
}

/// Timer that never fires on its own; tests fire it explicitly.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualCueTimer {
    state: Arc<Mutex<ManualTimerState>>,
}

impl ManualCueTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualTimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The pending timer, if one is armed.
    pub fn pending(&self) -> Option<(Duration, Generation)> {
        self.lock().pending
    }

    /// Disarm the pending timer and return the signal it would deliver.
    pub fn fire(&self) -> Option<PlaybackSignal> {
        self.lock()
            .pending
            .take()
            .map(|(_, generation)| PlaybackSignal::CueDue(generation))
    }

    /// Every schedule call so far.
    pub fn scheduled(&self) -> Vec<(Duration, Generation)> {
        self.lock().scheduled.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock().cancels
    }
}

impl CueTimer for ManualCueTimer {
    fn schedule(&mut self, delay: Duration, generation: Generation) {
        let mut state = self.lock();
        state.pending = Some((delay, generation));
        state.scheduled.push((delay, generation));
    }

    fn cancel(&mut self) {
        let mut state = self.lock();
        state.pending = None;
        state.cancels += 1;
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Observable playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub remaining_cues: u32,
    pub generation: Generation,
}

/// What a delivered signal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueProgress {
    /// Stale, duplicate, or unexpected; nothing changed.
    Ignored,
    /// A cue finished and the next one is waiting on the timer.
    NextCueScheduled,
    /// The timer fired and the next cue is being spoken.
    CueSpoken,
    /// The final cue finished; playback is idle.
    Exhausted,
}

/// Drives 1..N cues for one word with a delay between them.
pub struct PlaybackScheduler {
    speech: Box<dyn SpeechEngine>,
    timer: Box<dyn CueTimer>,
    state: PlaybackState,
    word: Option<Word>,
    pronunciation: Pronunciation,
    interval: Duration,
    /// Generation of the utterance whose completion is expected next.
    awaiting: Option<Generation>,
}

impl std::fmt::Debug for PlaybackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("state", &self.state)
            .field("word", &self.word)
            .field("awaiting", &self.awaiting)
            .finish()
    }
}

impl PlaybackScheduler {
    pub fn new(speech: Box<dyn SpeechEngine>, timer: Box<dyn CueTimer>) -> Self {
        Self {
            speech,
            timer,
            state: PlaybackState::default(),
            word: None,
            pronunciation: Pronunciation::default(),
            interval: Duration::ZERO,
            awaiting: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn generation(&self) -> Generation {
        self.state.generation
    }

    pub fn is_playing(&self) -> bool {
        self.state.status == PlaybackStatus::Playing
    }

    /// Word of the current or most recent playback.
    pub fn word(&self) -> Option<&Word> {
        self.word.as_ref()
    }

    /// Cancel everything in flight and mint a new generation.
    fn invalidate(&mut self) {
        self.state.generation = self.state.generation.next();
        self.timer.cancel();
        self.speech.cancel();
        self.awaiting = None;
    }

    /// Begin continuous playback of `word`, speaking the first cue now.
    ///
    /// A `cue_count` of zero is treated as one.
    pub fn start(
        &mut self,
        word: &Word,
        cue_count: u32,
        interval: Duration,
        pronunciation: Pronunciation,
    ) -> Result<Generation, PlaybackError> {
        self.invalidate();
        self.word = Some(word.clone());
        self.pronunciation = pronunciation;
        self.interval = interval;
        self.state.remaining_cues = cue_count.max(1) - 1;

        let generation = self.state.generation;
        match self.speak(word, generation) {
            Ok(()) => {
                self.state.status = PlaybackStatus::Playing;
                self.awaiting = Some(generation);
                debug!(
                    word = %word,
                    cues = cue_count.max(1),
                    %generation,
                    "Continuous playback started"
                );
                Ok(generation)
            }
            Err(e) => {
                self.state.status = PlaybackStatus::Idle;
                self.state.remaining_cues = 0;
                Err(e)
            }
        }
    }

    /// Stop playback. Any pending timer or completion becomes stale.
    ///
    /// Returns whether playback was running.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.is_playing();
        self.invalidate();
        self.state.status = PlaybackStatus::Idle;
        self.state.remaining_cues = 0;
        if was_playing {
            debug!(generation = %self.state.generation, "Playback stopped");
        }
        was_playing
    }

    /// Speak `word` exactly once, stopping continuous playback first.
    ///
    /// The completion of this cue never reports exhaustion.
    pub fn play_once(
        &mut self,
        word: &Word,
        pronunciation: Pronunciation,
    ) -> Result<Generation, PlaybackError> {
        self.stop();
        self.word = Some(word.clone());
        self.pronunciation = pronunciation;
        let generation = self.state.generation;
        self.speak(word, generation)?;
        debug!(word = %word, %generation, "Single cue");
        Ok(generation)
    }

    /// Apply a completion or timer signal.
    pub fn handle_signal(&mut self, signal: PlaybackSignal) -> Result<CueProgress, PlaybackError> {
        match signal {
            PlaybackSignal::SpeechFinished(generation) => Ok(self.on_speech_finished(generation)),
            PlaybackSignal::CueDue(generation) => self.on_timer_fired(generation),
        }
    }

    /// A cue finished speaking.
    pub fn on_speech_finished(&mut self, generation: Generation) -> CueProgress {
        if !self.is_playing() || self.awaiting != Some(generation) {
            trace!(
                %generation,
                current = %self.state.generation,
                "Ignoring stale speech completion"
            );
            return CueProgress::Ignored;
        }
        self.awaiting = None;

        if self.state.remaining_cues > 0 {
            self.state.remaining_cues -= 1;
            self.timer.schedule(self.interval, generation);
            trace!(
                remaining = self.state.remaining_cues,
                %generation,
                "Next cue scheduled"
            );
            CueProgress::NextCueScheduled
        } else {
            self.state.status = PlaybackStatus::Idle;
            debug!(%generation, "Playback exhausted");
            CueProgress::Exhausted
        }
    }

    /// An inter-cue delay elapsed.
    pub fn on_timer_fired(&mut self, generation: Generation) -> Result<CueProgress, PlaybackError> {
        if !self.is_playing() || generation != self.state.generation || self.awaiting.is_some() {
            trace!(
                %generation,
                current = %self.state.generation,
                "Ignoring stale cue timer"
            );
            return Ok(CueProgress::Ignored);
        }

        let Some(word) = self.word.clone() else {
            return Ok(CueProgress::Ignored);
        };

        let cue = generation.next();
        self.state.generation = cue;
        match self.speak(&word, cue) {
            Ok(()) => {
                self.awaiting = Some(cue);
                Ok(CueProgress::CueSpoken)
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    fn speak(&mut self, word: &Word, generation: Generation) -> Result<(), PlaybackError> {
        let utterance = Utterance::new(word.as_str(), self.pronunciation, generation);
        self.speech.speak(&utterance).map_err(|source| PlaybackError {
            word: word.clone(),
            source,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dictum_speech::MockSpeech;

    const SECOND: Duration = Duration::from_secs(1);

    fn scheduler() -> (PlaybackScheduler, MockSpeech, ManualCueTimer) {
        let speech = MockSpeech::new();
        let timer = ManualCueTimer::new();
        let scheduler = PlaybackScheduler::new(Box::new(speech.clone()), Box::new(timer.clone()));
        (scheduler, speech, timer)
    }

    fn word(text: &str) -> Word {
        Word::new(text)
    }

    /// Complete the last spoken cue and fire the resulting timer until idle.
    fn run_to_completion(s: &mut PlaybackScheduler, speech: &MockSpeech, timer: &ManualCueTimer) {
        loop {
            let generation = speech.last_generation().unwrap();
            match s.on_speech_finished(generation) {
                CueProgress::NextCueScheduled => {
                    let signal = timer.fire().unwrap();
                    assert_eq!(s.handle_signal(signal).unwrap(), CueProgress::CueSpoken);
                }
                CueProgress::Exhausted => break,
                other => panic!("unexpected progress {:?}", other),
            }
        }
    }

    // -------------------------------------------------------------------------
    // start / exhaustion
    // -------------------------------------------------------------------------

    #[test]
    fn test_start_speaks_first_cue_immediately() {
        let (mut s, speech, _) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();

        assert_eq!(speech.spoken_texts(), vec!["cause"]);
        assert_eq!(speech.last_generation(), Some(generation));
        assert_eq!(s.status(), PlaybackStatus::Playing);
        assert_eq!(s.state().remaining_cues, 2);
    }

    #[test]
    fn test_cues_play_count_times_then_exhaust() {
        let (mut s, speech, timer) = scheduler();
        s.start(&word("cause"), 2, SECOND, Pronunciation::American).unwrap();
        run_to_completion(&mut s, &speech, &timer);

        assert_eq!(speech.spoken_texts(), vec!["cause", "cause"]);
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert_eq!(timer.scheduled().len(), 1);
        assert_eq!(timer.scheduled()[0].0, SECOND);
    }

    #[test]
    fn test_single_cue_exhausts_without_timer() {
        let (mut s, speech, timer) = scheduler();
        let generation = s.start(&word("cause"), 1, SECOND, Pronunciation::American).unwrap();
        assert_eq!(s.on_speech_finished(generation), CueProgress::Exhausted);
        assert_eq!(speech.spoken_count(), 1);
        assert!(timer.scheduled().is_empty());
    }

    #[test]
    fn test_zero_cue_count_plays_once() {
        let (mut s, speech, _) = scheduler();
        let generation = s.start(&word("cause"), 0, SECOND, Pronunciation::American).unwrap();
        assert_eq!(s.on_speech_finished(generation), CueProgress::Exhausted);
        assert_eq!(speech.spoken_count(), 1);
    }

    #[test]
    fn test_pronunciation_reaches_speech() {
        let (mut s, speech, _) = scheduler();
        s.start(&word("colour"), 1, SECOND, Pronunciation::British).unwrap();
        assert_eq!(speech.spoken()[0].locale(), "en-GB");
    }

    #[test]
    fn test_restart_invalidates_previous_generation() {
        let (mut s, speech, _) = scheduler();
        let first = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        let second = s.start(&word("habit"), 3, SECOND, Pronunciation::American).unwrap();

        assert!(second > first);
        assert_eq!(s.on_speech_finished(first), CueProgress::Ignored);
        assert_eq!(speech.spoken_texts(), vec!["cause", "habit"]);
    }

    // -------------------------------------------------------------------------
    // stop / stale callbacks
    // -------------------------------------------------------------------------

    #[test]
    fn test_stop_makes_pending_timer_inert() {
        let (mut s, speech, timer) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        s.on_speech_finished(generation);
        let pending = PlaybackSignal::CueDue(timer.pending().unwrap().1);

        assert!(s.stop());
        assert!(timer.pending().is_none());
        assert_eq!(s.handle_signal(pending).unwrap(), CueProgress::Ignored);
        assert_eq!(speech.spoken_count(), 1);
        assert_eq!(s.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn test_stop_makes_inflight_completion_inert() {
        let (mut s, _, timer) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        s.stop();
        assert_eq!(s.on_speech_finished(generation), CueProgress::Ignored);
        assert!(timer.scheduled().is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut s, speech, _) = scheduler();
        assert!(!s.stop());
        s.start(&word("cause"), 2, SECOND, Pronunciation::American).unwrap();
        assert!(s.stop());
        assert!(!s.stop());
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert!(speech.cancel_count() >= 2);
    }

    #[test]
    fn test_duplicate_completion_ignored() {
        let (mut s, _, timer) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        assert_eq!(s.on_speech_finished(generation), CueProgress::NextCueScheduled);
        assert_eq!(s.on_speech_finished(generation), CueProgress::Ignored);
        assert_eq!(s.state().remaining_cues, 1);
        assert_eq!(timer.scheduled().len(), 1);
    }

    #[test]
    fn test_earlier_cue_completion_ignored_after_next_cue_starts() {
        let (mut s, speech, timer) = scheduler();
        let first = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        assert_eq!(s.on_speech_finished(first), CueProgress::NextCueScheduled);
        let signal = timer.fire().unwrap();
        assert_eq!(s.handle_signal(signal).unwrap(), CueProgress::CueSpoken);

        assert_eq!(s.on_speech_finished(first), CueProgress::Ignored);
        assert_eq!(s.state().remaining_cues, 1);
        assert_eq!(timer.scheduled().len(), 1);
        assert!(timer.pending().is_none());

        let second = speech.last_generation().unwrap();
        assert!(second > first);
        assert_eq!(s.on_speech_finished(second), CueProgress::NextCueScheduled);
        assert_eq!(s.state().remaining_cues, 0);
    }

    #[test]
    fn test_each_cue_gets_its_own_generation() {
        let (mut s, speech, timer) = scheduler();
        s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        run_to_completion(&mut s, &speech, &timer);

        let generations: Vec<Generation> = speech.spoken().iter().map(|u| u.generation).collect();
        assert_eq!(generations.len(), 3);
        assert!(generations.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(s.generation(), generations[2]);
    }

    #[test]
    fn test_replayed_timer_ignored_after_cue_spoken() {
        let (mut s, speech, timer) = scheduler();
        let first = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        s.on_speech_finished(first);
        let signal = timer.fire().unwrap();
        s.handle_signal(signal).unwrap();

        assert_eq!(s.handle_signal(signal).unwrap(), CueProgress::Ignored);
        assert_eq!(speech.spoken_count(), 2);
    }

    #[test]
    fn test_early_timer_ignored_while_cue_speaking() {
        let (mut s, speech, _) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        let progress = s.on_timer_fired(generation).unwrap();
        assert_eq!(progress, CueProgress::Ignored);
        assert_eq!(speech.spoken_count(), 1);
    }

    // -------------------------------------------------------------------------
    // play_once
    // -------------------------------------------------------------------------

    #[test]
    fn test_play_once_never_exhausts() {
        let (mut s, speech, _) = scheduler();
        let generation = s.play_once(&word("cause"), Pronunciation::American).unwrap();
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert_eq!(s.on_speech_finished(generation), CueProgress::Ignored);
        assert_eq!(speech.spoken_count(), 1);
    }

    #[test]
    fn test_play_once_stops_continuous_playback() {
        let (mut s, speech, timer) = scheduler();
        let first = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        s.on_speech_finished(first);
        s.play_once(&word("cause"), Pronunciation::American).unwrap();

        assert!(timer.pending().is_none());
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert_eq!(speech.spoken_count(), 2);
    }

    // -------------------------------------------------------------------------
    // speech failures
    // -------------------------------------------------------------------------

    #[test]
    fn test_start_failure_leaves_idle() {
        let (mut s, speech, _) = scheduler();
        speech.fail_next(1);
        let err = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap_err();
        assert_eq!(err.word, word("cause"));
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert_eq!(s.state().remaining_cues, 0);
    }

    #[test]
    fn test_failure_on_later_cue_stops_playback() {
        let (mut s, speech, timer) = scheduler();
        let generation = s.start(&word("cause"), 3, SECOND, Pronunciation::American).unwrap();
        s.on_speech_finished(generation);
        speech.fail_next(1);
        let signal = timer.fire().unwrap();

        assert!(s.handle_signal(signal).is_err());
        assert_eq!(s.status(), PlaybackStatus::Idle);
        assert!(s.generation() > generation);
    }

    #[test]
    fn test_play_once_failure() {
        let (mut s, speech, _) = scheduler();
        speech.fail_always(true);
        assert!(s.play_once(&word("cause"), Pronunciation::American).is_err());
        assert_eq!(s.status(), PlaybackStatus::Idle);
    }

    // -------------------------------------------------------------------------
    // ManualCueTimer
    // -------------------------------------------------------------------------

    #[test]
    fn test_manual_timer_replaces_pending() {
        let mut timer = ManualCueTimer::new();
        timer.schedule(SECOND, Generation(1));
        timer.schedule(SECOND * 2, Generation(2));
        assert_eq!(timer.pending(), Some((SECOND * 2, Generation(2))));
        assert_eq!(timer.fire(), Some(PlaybackSignal::CueDue(Generation(2))));
        assert_eq!(timer.fire(), None);
    }
}
