//! CLI argument definitions for the Dictum application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Dictum - a spelling dictation drill for the terminal.
#[derive(Parser, Debug)]
#[command(name = "dictum", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Drill a word list (default).
    Drill(DrillArgs),

    /// Import a plain-text or CSV word list.
    Import {
        /// File with one word per line, or a CSV whose first column holds words.
        file: PathBuf,

        /// List name. Defaults to the file name without extension.
        #[arg(short = 'n', long = "name")]
        name: Option<String>,
    },

    /// Show imported word lists.
    Lists,

    /// Show mastered and missed words.
    Progress {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Clear all progress. Irreversible.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct DrillArgs {
    /// Word list name or id. Defaults to the most recently imported list.
    #[arg(long = "list")]
    pub list: Option<String>,

    /// Start in review mode.
    #[arg(long)]
    pub review: bool,

    /// Present words in random order.
    #[arg(long)]
    pub random: bool,

    /// Do not speak; cues complete immediately.
    #[arg(long)]
    pub silent: bool,

    /// Keep progress in memory only.
    #[arg(long)]
    pub ephemeral: bool,
}

impl CliArgs {
    /// The subcommand to run, `drill` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Drill(DrillArgs::default()))
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > DICTUM_CONFIG env var > ~/.dictum/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("DICTUM_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > DICTUM_DATA_DIR env var > config file value.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> String {
        if let Some(ref p) = self.data_dir {
            return p.to_string_lossy().to_string();
        }
        if let Ok(p) = std::env::var("DICTUM_DATA_DIR") {
            return p;
        }
        config_data_dir.to_string()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value > info.
    pub fn resolve_log_level(&self, config_level: Option<&str>) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        match config_level {
            Some(level) if !level.trim().is_empty() => level.to_string(),
            _ => "info".to_string(),
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".dictum").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".dictum").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_command_is_drill() {
        let args = parse(&["dictum"]);
        assert_eq!(args.command(), Command::Drill(DrillArgs::default()));
    }

    #[test]
    fn test_drill_flags() {
        let args = parse(&["dictum", "drill", "--list", "Basic", "--review", "--silent"]);
        match args.command() {
            Command::Drill(drill) => {
                assert_eq!(drill.list.as_deref(), Some("Basic"));
                assert!(drill.review);
                assert!(drill.silent);
                assert!(!drill.random);
                assert!(!drill.ephemeral);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_with_name() {
        let args = parse(&["dictum", "import", "words.csv", "--name", "Week 1"]);
        assert_eq!(
            args.command(),
            Command::Import {
                file: PathBuf::from("words.csv"),
                name: Some("Week 1".to_string()),
            }
        );
    }

    #[test]
    fn test_reset_requires_flag_to_confirm() {
        assert_eq!(parse(&["dictum", "reset"]).command(), Command::Reset { yes: false });
        assert_eq!(
            parse(&["dictum", "reset", "--yes"]).command(),
            Command::Reset { yes: true }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["dictum", "lists", "--data-dir", "/tmp/dictum", "-l", "debug"]);
        assert_eq!(args.command(), Command::Lists);
        assert_eq!(args.resolve_data_dir("~/.dictum/data"), "/tmp/dictum");
        assert_eq!(args.resolve_log_level(Some("warn")), "debug");
    }

    #[test]
    fn test_config_flag_wins() {
        let args = parse(&["dictum", "-c", "/etc/dictum.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/dictum.toml"));
    }

    #[test]
    fn test_log_level_falls_back() {
        let args = parse(&["dictum"]);
        assert_eq!(args.resolve_log_level(Some("warn")), "warn");
        assert_eq!(args.resolve_log_level(Some(" ")), "info");
        assert_eq!(args.resolve_log_level(None), "info");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliArgs::try_parse_from(["dictum", "--port", "80"]).is_err());
    }
}
