use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize text for comparison: trim surrounding whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

// =============================================================================
// Word
// =============================================================================

/// A drill word.
///
/// The original spelling (trimmed) is preserved for display and speech, while
/// equality and hashing use the normalized form, so `"Cause"` and `" cause "`
/// are the same word for set membership.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.len() == text.len() {
            Self(text)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The word as it should be shown and spoken.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The normalized membership key.
    pub fn key(&self) -> String {
        normalize(&self.0)
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Word {}

impl Hash for Word {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Word::new(text)
    }
}

impl From<String> for Word {
    fn from(text: String) -> Self {
        Word::new(text)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Which subset of the word list the session drills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Words never yet judged.
    #[default]
    Normal,
    /// Previously missed words only.
    Review,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "Normal"),
            Mode::Review => write!(f, "Review"),
        }
    }
}

/// Accent used by the speech capability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pronunciation {
    #[default]
    American,
    British,
}

impl Pronunciation {
    /// BCP 47 locale tag passed to the speech capability.
    pub fn locale(&self) -> &'static str {
        match self {
            Pronunciation::American => "en-US",
            Pronunciation::British => "en-GB",
        }
    }
}

/// Whether continuous playback is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "Idle"),
            PlaybackStatus::Playing => write!(f, "Playing"),
        }
    }
}

/// Lifecycle state of a drill session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Constructed but not yet begun.
    #[default]
    Idle,
    /// A current word is set and the session awaits input.
    Presenting,
    /// Nothing left to drill in the active mode.
    Exhausted,
}

impl SessionStatus {
    /// Returns whether a transition from `self` to `target` is valid.
    ///
    /// A session never returns to `Idle` once begun; `Presenting` and
    /// `Exhausted` alternate freely as the cursor and queue change.
    pub fn can_transition_to(&self, target: &SessionStatus) -> bool {
        matches!(
            (self, target),
            (SessionStatus::Idle, SessionStatus::Presenting)
                | (SessionStatus::Idle, SessionStatus::Exhausted)
                | (SessionStatus::Presenting, SessionStatus::Presenting)
                | (SessionStatus::Presenting, SessionStatus::Exhausted)
                | (SessionStatus::Exhausted, SessionStatus::Presenting)
                | (SessionStatus::Exhausted, SessionStatus::Exhausted)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Presenting => write!(f, "Presenting"),
            SessionStatus::Exhausted => write!(f, "Exhausted"),
        }
    }
}

// =============================================================================
// Playback tokens
// =============================================================================

/// Token invalidating in-flight playback callbacks.
///
/// A new generation is minted on every state-changing playback action; a
/// timer or speech completion carrying an older generation is inert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Asynchronous notifications delivered back to the playback scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSignal {
    /// The speech capability finished an utterance.
    SpeechFinished(Generation),
    /// An inter-cue delay elapsed.
    CueDue(Generation),
}

impl PlaybackSignal {
    pub fn generation(&self) -> Generation {
        match self {
            PlaybackSignal::SpeechFinished(g) | PlaybackSignal::CueDue(g) => *g,
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// One judged answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub word: Word,
    pub translation: String,
    /// Mismatched character positions in ascending order; empty iff correct.
    pub error_positions: Vec<usize>,
}

impl Attempt {
    pub fn is_correct(&self) -> bool {
        self.error_positions.is_empty()
    }
}

/// Persisted form of the mastered / missed sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub mastered: Vec<String>,
    #[serde(default)]
    pub missed: Vec<String>,
}

impl ProgressSnapshot {
    pub fn is_empty(&self) -> bool {
        self.mastered.is_empty() && self.missed.is_empty()
    }
}

/// Running correct / incorrect counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tallies {
    pub correct: usize,
    pub incorrect: usize,
}

/// A named, imported word list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordList {
    pub id: Uuid,
    pub name: String,
    pub words: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl WordList {
    pub fn new(name: impl Into<String>, words: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            words,
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Cause \n"), "cause");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_word_equality_ignores_case_and_whitespace() {
        assert_eq!(Word::new("Cause"), Word::new(" cause "));
        assert_ne!(Word::new("cause"), Word::new("causes"));
    }

    #[test]
    fn test_word_preserves_case() {
        let word = Word::new("  Paris ");
        assert_eq!(word.as_str(), "Paris");
        assert_eq!(word.key(), "paris");
        assert_eq!(word.to_string(), "Paris");
    }

    #[test]
    fn test_word_hash_matches_equality() {
        let mut set = HashSet::new();
        set.insert(Word::new("Habit"));
        assert!(set.contains(&Word::new("habit")));
        assert!(!set.insert(Word::new("HABIT ")));
    }

    #[test]
    fn test_word_serializes_as_plain_string() {
        let json = serde_json::to_string(&Word::new("cause")).unwrap();
        assert_eq!(json, "\"cause\"");
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Review).unwrap(), "\"review\"");
        assert_eq!(Mode::default(), Mode::Normal);
    }

    #[test]
    fn test_pronunciation_locale() {
        assert_eq!(Pronunciation::American.locale(), "en-US");
        assert_eq!(Pronunciation::British.locale(), "en-GB");
    }

    #[test]
    fn test_session_status_transitions() {
        assert!(SessionStatus::Idle.can_transition_to(&SessionStatus::Presenting));
        assert!(SessionStatus::Idle.can_transition_to(&SessionStatus::Exhausted));
        assert!(SessionStatus::Presenting.can_transition_to(&SessionStatus::Exhausted));
        assert!(SessionStatus::Exhausted.can_transition_to(&SessionStatus::Presenting));

        // Never back to Idle
        assert!(!SessionStatus::Presenting.can_transition_to(&SessionStatus::Idle));
        assert!(!SessionStatus::Exhausted.can_transition_to(&SessionStatus::Idle));
        assert!(!SessionStatus::Idle.can_transition_to(&SessionStatus::Idle));
    }

    #[test]
    fn test_generation_next_is_monotonic() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
    }

    #[test]
    fn test_playback_signal_generation() {
        assert_eq!(
            PlaybackSignal::SpeechFinished(Generation(4)).generation(),
            Generation(4)
        );
        assert_eq!(PlaybackSignal::CueDue(Generation(7)).generation(), Generation(7));
    }

    #[test]
    fn test_attempt_is_correct() {
        let attempt = Attempt {
            word: Word::new("cause"),
            translation: "reason".to_string(),
            error_positions: vec![],
        };
        assert!(attempt.is_correct());

        let attempt = Attempt {
            error_positions: vec![3],
            ..attempt
        };
        assert!(!attempt.is_correct());
    }

    #[test]
    fn test_progress_snapshot_defaults_missing_fields() {
        let snapshot: ProgressSnapshot = serde_json::from_str(r#"{"missed":["cause"]}"#).unwrap();
        assert!(snapshot.mastered.is_empty());
        assert_eq!(snapshot.missed, vec!["cause".to_string()]);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_word_list_new() {
        let list = WordList::new("Basic", vec!["cause".into(), "habit".into()]);
        assert!(!list.id.is_nil());
        assert_eq!(list.len(), 2);
        assert!(!list.is_empty());
    }
}
