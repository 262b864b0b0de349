use serde::{Deserialize, Serialize};

use crate::types::{Generation, Mode, Word};

/// Domain events emitted by a drill session.
///
/// The session appends events to an outbox after each state change; the
/// caller drains them for display, logging, or tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DrillEvent {
    // =========================================================================
    // Navigation
    // =========================================================================
    /// A word became the current word.
    WordPresented {
        word: Word,
        position: usize,
        queue_len: usize,
    },

    /// The cursor moved back and the latest judgment was undone.
    NavigatedBack {
        word: Word,
        undone: Option<Word>,
    },

    /// The cursor moved forward without judging the word.
    NavigatedForward { word: Word },

    // =========================================================================
    // Judgments
    // =========================================================================
    /// An answer was evaluated and recorded.
    AttemptRecorded {
        word: Word,
        correct: bool,
        error_positions: Vec<usize>,
        mode: Mode,
    },

    /// All progress was cleared.
    ProgressReset,

    // =========================================================================
    // Playback
    // =========================================================================
    /// Continuous playback started for a word.
    PlaybackStarted {
        word: Word,
        cues: u32,
        generation: Generation,
    },

    /// Playback was stopped before exhaustion.
    PlaybackStopped { generation: Generation },

    /// All scheduled cues for a word were spoken.
    PlaybackExhausted { word: Word },

    /// The speech capability rejected a cue. Non-fatal.
    PlaybackFailed { word: Word, reason: String },

    // =========================================================================
    // Queue
    // =========================================================================
    /// The active mode changed.
    ModeSwitched { from: Mode, to: Mode },

    /// The queue was re-derived from its governing inputs.
    QueueRederived { mode: Mode, queue_len: usize },

    /// No further word is available in the active mode.
    SessionExhausted { mode: Mode },
}

impl DrillEvent {
    /// Short event name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            DrillEvent::WordPresented { .. } => "word_presented",
            DrillEvent::NavigatedBack { .. } => "navigated_back",
            DrillEvent::NavigatedForward { .. } => "navigated_forward",
            DrillEvent::AttemptRecorded { .. } => "attempt_recorded",
            DrillEvent::ProgressReset => "progress_reset",
            DrillEvent::PlaybackStarted { .. } => "playback_started",
            DrillEvent::PlaybackStopped { .. } => "playback_stopped",
            DrillEvent::PlaybackExhausted { .. } => "playback_exhausted",
            DrillEvent::PlaybackFailed { .. } => "playback_failed",
            DrillEvent::ModeSwitched { .. } => "mode_switched",
            DrillEvent::QueueRederived { .. } => "queue_rederived",
            DrillEvent::SessionExhausted { .. } => "session_exhausted",
        }
    }
}
