//! Mastered / missed word sets with move semantics.
//!
//! The two sets are always disjoint. Every mutation is written through to the
//! [`ProgressStore`] immediately; a write failure is logged and remembered but
//! never aborts the drill.

use indexmap::IndexSet;
use tracing::{debug, warn};

use dictum_core::traits::ProgressStore;
use dictum_core::types::{ProgressSnapshot, Tallies, Word};

/// Owner of the persisted outcome sets.
pub struct ProgressTracker {
    mastered: IndexSet<Word>,
    missed: IndexSet<Word>,
    store: Box<dyn ProgressStore>,
    last_save_error: Option<String>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("mastered", &self.mastered.len())
            .field("missed", &self.missed.len())
            .finish()
    }
}

impl ProgressTracker {
    /// Load the sets from `store`.
    ///
    /// Missing, unreadable, or corrupt state yields empty sets.
    pub fn load(store: Box<dyn ProgressStore>) -> Self {
        let snapshot = match store.load_progress() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to load progress: {}. Starting with empty progress.", e);
                ProgressSnapshot::default()
            }
        };

        let mut tracker = Self {
            mastered: IndexSet::new(),
            missed: IndexSet::new(),
            store,
            last_save_error: None,
        };
        tracker.restore(snapshot);
        tracker
    }

    fn restore(&mut self, snapshot: ProgressSnapshot) {
        for word in snapshot.mastered.into_iter().map(Word::new) {
            if !word.is_blank() {
                self.mastered.insert(word);
            }
        }
        for word in snapshot.missed.into_iter().map(Word::new) {
            if word.is_blank() {
                continue;
            }
            if self.mastered.contains(&word) {
                warn!(word = %word, "Word stored as both mastered and missed; keeping mastered");
                continue;
            }
            self.missed.insert(word);
        }
        debug!(
            mastered = self.mastered.len(),
            missed = self.missed.len(),
            "Progress restored"
        );
    }

    /// Record a Normal-mode judgment.
    ///
    /// Correct moves the word into the mastered set; incorrect moves it into
    /// the missed set. Either way it leaves the other set.
    pub fn record_outcome(&mut self, word: &Word, correct: bool) {
        if correct {
            self.missed.shift_remove(word);
            self.mastered.insert(word.clone());
        } else {
            self.mastered.shift_remove(word);
            self.missed.insert(word.clone());
        }
        debug!(word = %word, correct, "Outcome recorded");
        self.persist();
    }

    /// Record a Review-mode judgment.
    ///
    /// Correct graduates the word from missed to mastered; incorrect leaves
    /// it flagged as missed.
    pub fn record_review_outcome(&mut self, word: &Word, correct: bool) {
        if correct {
            self.missed.shift_remove(word);
            self.mastered.insert(word.clone());
        } else {
            self.missed.insert(word.clone());
        }
        debug!(word = %word, correct, "Review outcome recorded");
        self.persist();
    }

    /// Clear both sets.
    pub fn reset(&mut self) {
        self.mastered.clear();
        self.missed.clear();
        debug!("Progress reset");
        self.persist();
    }

    fn persist(&mut self) {
        match self.store.save_progress(&self.snapshot()) {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                warn!("Failed to persist progress: {}", e);
                self.last_save_error = Some(e.to_string());
            }
        }
    }

    pub fn is_mastered(&self, word: &Word) -> bool {
        self.mastered.contains(word)
    }

    pub fn is_missed(&self, word: &Word) -> bool {
        self.missed.contains(word)
    }

    /// Whether the word has been judged at all.
    pub fn is_judged(&self, word: &Word) -> bool {
        self.is_mastered(word) || self.is_missed(word)
    }

    /// Mastered words in the order they were mastered.
    pub fn mastered(&self) -> impl Iterator<Item = &Word> {
        self.mastered.iter()
    }

    /// Missed words in the order they were missed.
    pub fn missed(&self) -> impl Iterator<Item = &Word> {
        self.missed.iter()
    }

    pub fn missed_count(&self) -> usize {
        self.missed.len()
    }

    pub fn tallies(&self) -> Tallies {
        Tallies {
            correct: self.mastered.len(),
            incorrect: self.missed.len(),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            mastered: self.mastered.iter().map(|w| w.as_str().to_string()).collect(),
            missed: self.missed.iter().map(|w| w.as_str().to_string()).collect(),
        }
    }

    /// Message of the most recent failed save, cleared by the next success.
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }
}
