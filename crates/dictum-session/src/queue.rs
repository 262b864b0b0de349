//! Queue derivation for the active mode.
//!
//! A queue is always recomputed from its governing inputs (the full word
//! list, the progress sets, the mode, and the random-order flag) and never
//! patched in place.

use rand::seq::SliceRandom;
use rand::Rng;

use dictum_core::types::{Mode, Word};

use crate::progress::ProgressTracker;

/// Derive the ordered words to present.
///
/// - Normal: the full list minus every judged word, in list order.
/// - Review: the missed words, in the order they were missed.
///
/// With `shuffle`, the result is uniformly permuted with a fresh
/// Fisher-Yates pass on every call.
pub fn derive_queue<R: Rng + ?Sized>(
    full_list: &[Word],
    progress: &ProgressTracker,
    mode: Mode,
    shuffle: bool,
    rng: &mut R,
) -> Vec<Word> {
    let mut queue: Vec<Word> = match mode {
        Mode::Normal => full_list
            .iter()
            .filter(|word| !progress.is_judged(word))
            .cloned()
            .collect(),
        Mode::Review => progress.missed().cloned().collect(),
    };

    if shuffle {
        queue.shuffle(rng);
    }
    queue
}
