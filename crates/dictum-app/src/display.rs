//! Terminal rendering of drill state.

use std::collections::BTreeSet;

use dictum_core::events::DrillEvent;
use dictum_core::types::{Attempt, PlaybackStatus, SessionStatus};
use dictum_session::SessionSnapshot;

/// Wrap every mismatched character of `word` in brackets: `cau[s]e`.
pub fn highlight_errors(word: &str, error_positions: &[usize]) -> String {
    let errors: BTreeSet<usize> = error_positions.iter().copied().collect();
    let mut out = String::with_capacity(word.len() + errors.len() * 2);
    for (i, c) in word.chars().enumerate() {
        if errors.contains(&i) {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

pub fn render_attempt(attempt: &Attempt) -> String {
    if attempt.is_correct() {
        format!("  ✓ {}  ({})", attempt.word, attempt.translation)
    } else {
        format!(
            "  ✗ {}  ({})",
            highlight_errors(attempt.word.as_str(), &attempt.error_positions),
            attempt.translation
        )
    }
}

pub fn render_history(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "  no attempts yet".to_string();
    }
    attempts
        .iter()
        .enumerate()
        .map(|(i, attempt)| format!("{:>3}.{}", i + 1, render_attempt(attempt)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line status shown before reading the next answer.
pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let tallies = format!(
        "correct {} · missed {}",
        snapshot.tallies.correct, snapshot.tallies.incorrect
    );
    match snapshot.status {
        SessionStatus::Presenting => {
            let playing = match snapshot.playback {
                PlaybackStatus::Playing => " · playing",
                PlaybackStatus::Idle => "",
            };
            format!(
                "[{} {}/{}] {}{}",
                snapshot.mode,
                snapshot.position + 1,
                snapshot.queue_len,
                tallies,
                playing
            )
        }
        SessionStatus::Exhausted => {
            let hint = if snapshot.review_available {
                ":review to drill missed words, "
            } else {
                ""
            };
            format!(
                "[{}] pass complete, {}. {}:restart for a new pass, :q to quit",
                snapshot.mode, tallies, hint
            )
        }
        SessionStatus::Idle => String::new(),
    }
}

/// Notices for events the user would otherwise not see.
pub fn render_event(event: &DrillEvent) -> Option<String> {
    match event {
        DrillEvent::PlaybackFailed { word, reason } => {
            Some(format!("  (could not speak '{}': {})", word, reason))
        }
        DrillEvent::ModeSwitched { to, .. } => Some(format!("  switched to {} mode", to)),
        DrillEvent::ProgressReset => Some("  progress cleared".to_string()),
        _ => None,
    }
}
