//! Character-by-character answer scoring.

use dictum_core::types::normalize;

/// Compare a typed answer against the target word.
///
/// Both strings are normalized (trimmed, lowercased) and compared per
/// character. Returns the mismatched positions of the target in ascending
/// order; a position the typed answer does not reach counts as a mismatch.
/// Characters typed beyond the end of the target are not checked.
pub fn evaluate(target: &str, typed: &str) -> Vec<usize> {
    let target = normalize(target);
    let typed: Vec<char> = normalize(typed).chars().collect();

    target
        .chars()
        .enumerate()
        .filter(|(i, expected)| typed.get(*i) != Some(expected))
        .map(|(i, _)| i)
        .collect()
}

/// Whether the typed text is exactly the target word after normalization.
///
/// Unlike [`evaluate`], trailing extra characters make this false.
pub fn is_exact_match(target: &str, typed: &str) -> bool {
    normalize(target) == normalize(typed)
}
