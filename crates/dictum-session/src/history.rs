//! Append-only attempt log with single-step undo.

use dictum_core::types::Attempt;

/// Attempts in the order they were judged, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    attempts: Vec<Attempt>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt. Repeated attempts on one word are all kept.
    pub fn append(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// Remove and return the most recent attempt.
    pub fn pop_last(&mut self) -> Option<Attempt> {
        self.attempts.pop()
    }

    pub fn all(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dictum_core::types::Word;

    fn attempt(word: &str, errors: Vec<usize>) -> Attempt {
        Attempt {
            word: Word::new(word),
            translation: String::new(),
            error_positions: errors,
        }
    }

    #[test]
    fn test_append_keeps_order() {
        let mut log = HistoryLog::new();
        log.append(attempt("cause", vec![]));
        log.append(attempt("habit", vec![1]));
        let words: Vec<&str> = log.all().iter().map(|a| a.word.as_str()).collect();
        assert_eq!(words, vec!["cause", "habit"]);
        assert_eq!(log.last().unwrap().word.as_str(), "habit");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut log = HistoryLog::new();
        log.append(attempt("cause", vec![3]));
        log.append(attempt("cause", vec![]));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_pop_last_returns_newest() {
        let mut log = HistoryLog::new();
        log.append(attempt("cause", vec![]));
        log.append(attempt("habit", vec![]));
        assert_eq!(log.pop_last().unwrap().word.as_str(), "habit");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_pop_empty() {
        let mut log = HistoryLog::new();
        assert!(log.pop_last().is_none());
        assert!(log.is_empty());
    }
}
