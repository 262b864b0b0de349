//! Line commands accepted by the interactive drill.
//!
//! Lines starting with `:` are commands; anything else is an answer.

use dictum_core::types::Mode;

pub const HELP: &str = "\
Type the word you hear and press Enter to submit it.
  :p        start / stop playback
  :r        hear the word once more
  :b        previous word
  :n        next word (skip without judging)
  :review   drill missed words
  :normal   back to unjudged words
  :restart  start a new pass
  :history  show attempts so far
  :help     this help
  :q        quit";

/// One parsed line of drill input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillInput {
    TogglePlay,
    Replay,
    Previous,
    Next,
    SwitchMode(Mode),
    Restart,
    History,
    Help,
    Quit,
    Unknown(String),
    Answer(String),
}

pub fn parse_input(line: &str) -> DrillInput {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.trim().strip_prefix(':') else {
        return DrillInput::Answer(line.to_string());
    };

    match command.trim().to_lowercase().as_str() {
        "p" | "play" => DrillInput::TogglePlay,
        "r" | "replay" => DrillInput::Replay,
        "b" | "back" => DrillInput::Previous,
        "n" | "next" => DrillInput::Next,
        "review" => DrillInput::SwitchMode(Mode::Review),
        "normal" => DrillInput::SwitchMode(Mode::Normal),
        "restart" => DrillInput::Restart,
        "h" | "history" => DrillInput::History,
        "?" | "help" => DrillInput::Help,
        "q" | "quit" => DrillInput::Quit,
        other => DrillInput::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_answer() {
        assert_eq!(parse_input("cause\n"), DrillInput::Answer("cause".into()));
        assert_eq!(parse_input("Cause\r\n"), DrillInput::Answer("Cause".into()));
    }

    #[test]
    fn test_empty_line_is_answer() {
        assert_eq!(parse_input("\n"), DrillInput::Answer(String::new()));
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(parse_input(":p"), DrillInput::TogglePlay);
        assert_eq!(parse_input(":r"), DrillInput::Replay);
        assert_eq!(parse_input(":b"), DrillInput::Previous);
        assert_eq!(parse_input(":n"), DrillInput::Next);
        assert_eq!(parse_input(":q"), DrillInput::Quit);
        assert_eq!(parse_input(" :Review "), DrillInput::SwitchMode(Mode::Review));
        assert_eq!(parse_input(":normal"), DrillInput::SwitchMode(Mode::Normal));
        assert_eq!(parse_input(":restart"), DrillInput::Restart);
        assert_eq!(parse_input(":history"), DrillInput::History);
    }

    #[test]
    fn test_exact_word_still_waits_for_enter() {
        // Lines arrive whole, so a full match is an ordinary answer.
        assert_eq!(parse_input("cause"), DrillInput::Answer("cause".into()));
        assert!(HELP.lines().next().unwrap().contains("press Enter to submit"));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse_input(":zap"), DrillInput::Unknown("zap".into()));
    }
}
