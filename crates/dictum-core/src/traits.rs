//! Seams between the drill session and its external collaborators.
//!
//! The session crate consumes these traits; `dictum-storage` and
//! `dictum-lexicon` provide the production implementations.

use std::sync::Mutex;

use crate::error::{DictumError, Result};
use crate::types::ProgressSnapshot;

/// Sentinel returned by [`TranslationLookup::lookup`] on a miss.
pub const NOT_FOUND_TRANSLATION: &str = "translation not found";

// ---------------------------------------------------------------------------
// Progress persistence
// ---------------------------------------------------------------------------

/// Durable storage for the mastered / missed sets.
pub trait ProgressStore: Send {
    /// Load the persisted sets. Missing state is an empty snapshot; corrupt
    /// state is an error (the caller decides how to recover).
    fn load_progress(&self) -> Result<ProgressSnapshot>;

    /// Replace the persisted sets with `snapshot`.
    fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()>;
}

/// Process-local progress store used for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    snapshot: Mutex<ProgressSnapshot>,
    saves: Mutex<usize>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful `save_progress` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load_progress(&self) -> Result<ProgressSnapshot> {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .map_err(|e| DictumError::Storage(format!("Progress lock poisoned: {}", e)))
    }

    fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|e| DictumError::Storage(format!("Progress lock poisoned: {}", e)))?;
        *guard = snapshot.clone();
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Translation lookup
// ---------------------------------------------------------------------------

/// Maps a word to its translation. Never fails: a miss yields
/// [`NOT_FOUND_TRANSLATION`].
pub trait TranslationLookup: Send + Sync {
    fn lookup(&self, word: &str) -> String;
}

/// Lookup used when no dictionary is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTranslations;

impl TranslationLookup for NoTranslations {
    fn lookup(&self, _word: &str) -> String {
        NOT_FOUND_TRANSLATION.to_string()
    }
}

impl<F> TranslationLookup for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn lookup(&self, word: &str) -> String {
        self(word)
    }
}
