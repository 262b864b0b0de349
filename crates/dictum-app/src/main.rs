//! Dictum application binary - composition root.
//!
//! Ties together all Dictum crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the SQLite database (progress + imported word lists)
//! 3. Run the requested subcommand; `drill` builds a session with the
//!    configured speech engine and drives it from stdin

mod cli;
mod commands;
mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use dictum_core::config::DictumConfig;
use dictum_core::error::DictumError;
use dictum_core::traits::ProgressStore;
use dictum_core::types::{Mode, PlaybackStatus, WordList};
use dictum_lexicon::{import_file, Dictionary};
use dictum_session::{SessionBuilder, SessionHandle, SessionRunner, SessionSnapshot, TokioCueTimer};
use dictum_speech::{CommandSpeech, SilentSpeech, SpeechEngine};
use dictum_storage::{Database, ProgressRepository, WordListRepository};

use cli::{CliArgs, Command, DrillArgs};
use commands::{parse_input, DrillInput, HELP};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Expand ~ to home directory in a path string.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

// =============================================================================
// Subcommands
// =============================================================================

fn run_import(db: Arc<Database>, file: &Path, name: Option<String>) -> AppResult<()> {
    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let list = import_file(file, &name)?;
    WordListRepository::new(db).save(&list)?;
    println!("Imported {} words into '{}' ({})", list.len(), list.name, list.id);
    Ok(())
}

fn run_lists(db: Arc<Database>) -> AppResult<()> {
    let lists = WordListRepository::new(db).list()?;
    if lists.is_empty() {
        println!("No word lists yet. Import one with `dictum import <file>`.");
        return Ok(());
    }
    for list in lists {
        println!(
            "{:<24} {:>5} words  {}  {}",
            list.name,
            list.word_count,
            list.created_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            list.id
        );
    }
    Ok(())
}

fn run_progress(db: Arc<Database>, json: bool) -> AppResult<()> {
    let snapshot = ProgressRepository::new(db).load_progress()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    println!("Mastered ({}): {}", snapshot.mastered.len(), snapshot.mastered.join(", "));
    println!("Missed ({}): {}", snapshot.missed.len(), snapshot.missed.join(", "));
    Ok(())
}

fn run_reset(db: Arc<Database>, confirmed: bool) -> AppResult<()> {
    if !confirmed {
        println!("This clears every mastered and missed word. Re-run with --yes to confirm.");
        return Ok(());
    }
    ProgressRepository::new(db).clear()?;
    println!("Progress cleared.");
    Ok(())
}

/// Find the list to drill: by id, then by name, else the newest import.
fn select_list(repo: &WordListRepository, selector: Option<&str>) -> AppResult<WordList> {
    let found = match selector {
        Some(selector) => match uuid::Uuid::parse_str(selector) {
            Ok(id) => repo.get(id)?,
            Err(_) => repo.find_by_name(selector)?,
        },
        None => repo.latest()?,
    };
    let list = found.ok_or_else(|| match selector {
        Some(selector) => DictumError::Import(format!("No word list named '{}'", selector)),
        None => DictumError::Import(
            "No word lists yet. Import one with `dictum import <file>`.".to_string(),
        ),
    })?;
    Ok(list)
}

// =============================================================================
// Drill
// =============================================================================

fn show(snapshot: &SessionSnapshot) {
    let status = display::render_status(snapshot);
    if !status.is_empty() {
        println!("{}", status);
    }
}

async fn run_drill(config: &DictumConfig, db: Arc<Database>, args: DrillArgs) -> AppResult<()> {
    let list = select_list(&WordListRepository::new(Arc::clone(&db)), args.list.as_deref())?;

    let mut settings = config.drill_settings()?;
    if args.random {
        settings.random_order = true;
    }

    let dictionary = if config.dictionary.path.trim().is_empty() {
        Dictionary::empty()
    } else {
        Dictionary::load_or_empty(&expand_home(&config.dictionary.path))
    };

    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let speech: Box<dyn SpeechEngine> = if args.silent || !config.speech.enabled {
        info!("Speech disabled; cues complete silently");
        Box::new(SilentSpeech::new(signal_tx.clone()))
    } else {
        info!(command = %config.speech.command, "Using external speech command");
        Box::new(CommandSpeech::new(config.speech.command.clone(), signal_tx.clone()))
    };

    let requested_mode = if args.review { Mode::Review } else { Mode::Normal };
    let mut builder = SessionBuilder::new(list.words.clone())
        .settings(settings)
        .translations(dictionary)
        .mode(requested_mode);
    if !args.ephemeral {
        builder = builder.progress_store(ProgressRepository::new(db));
    }
    let session = builder.build(speech, Box::new(TokioCueTimer::new(signal_tx)))?;

    info!(list = %list.name, words = list.len(), "Starting drill");
    println!("Drilling '{}' ({} words). Type :help for commands.", list.name, list.len());

    let (handle, runner) = SessionRunner::spawn(session, signal_rx);
    let mut events = handle.subscribe();
    let notices = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = display::render_event(&event) {
                        println!("{}", line);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event display lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let reply = handle.begin().await?;
    if reply.snapshot.mode != requested_mode {
        println!("  no missed words to review yet; drilling the full list");
    }
    show(&reply.snapshot);

    drill_loop(&handle).await?;

    handle.shutdown();
    let session = runner.await?;
    notices.abort();

    let tallies = session.tallies();
    if let Some(error) = session.progress().last_save_error() {
        warn!("Last progress save failed: {}", error);
    }
    println!(
        "Session over: {} mastered, {} missed.",
        tallies.correct, tallies.incorrect
    );
    Ok(())
}

async fn drill_loop(handle: &SessionHandle) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let snapshot = match parse_input(&line) {
            DrillInput::Answer(typed) => {
                let reply = handle.submit(&typed).await?;
                match &reply.value {
                    Some(attempt) => println!("{}", display::render_attempt(attempt)),
                    None => println!("  nothing to answer"),
                }
                reply.snapshot
            }
            DrillInput::TogglePlay => {
                let reply = handle.toggle_play().await?;
                if reply.value == PlaybackStatus::Idle {
                    println!("  playback stopped");
                }
                reply.snapshot
            }
            DrillInput::Replay => {
                let reply = handle.replay().await?;
                if !reply.value {
                    println!("  nothing to replay");
                }
                reply.snapshot
            }
            DrillInput::Previous => {
                let reply = handle.previous().await?;
                if !reply.value {
                    println!("  already at the first word");
                }
                reply.snapshot
            }
            DrillInput::Next => {
                let reply = handle.next().await?;
                if !reply.value {
                    println!("  no further word");
                }
                reply.snapshot
            }
            DrillInput::SwitchMode(mode) => match handle.switch_mode(mode).await {
                Ok(reply) => reply.snapshot,
                Err(e) => {
                    println!("  {}", e);
                    continue;
                }
            },
            DrillInput::Restart => handle.restart_pass().await?.snapshot,
            DrillInput::History => {
                println!("{}", display::render_history(&handle.history().await?));
                continue;
            }
            DrillInput::Help => {
                println!("{}", HELP);
                continue;
            }
            DrillInput::Unknown(command) => {
                println!("  unknown command ':{}' (try :help)", command);
                continue;
            }
            DrillInput::Quit => break,
        };
        show(&snapshot);
    }
    Ok(())
}

// =============================================================================
// Entry point
// =============================================================================

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level applies.
    let config_file = args.resolve_config_path();
    let loaded = DictumConfig::load(&config_file);
    let log_level = args.resolve_log_level(loaded.as_ref().ok().map(|c| c.general.log_level.as_str()));
    init_tracing(&log_level);

    info!("Starting Dictum v{}", env!("CARGO_PKG_VERSION"));
    let config = match loaded {
        Ok(config) => config,
        Err(e) if config_file.exists() => {
            warn!(
                "Failed to load config from {}: {}. Using defaults.",
                config_file.display(),
                e
            );
            DictumConfig::default()
        }
        Err(_) => {
            debug!(path = %config_file.display(), "No config file; using defaults");
            DictumConfig::default()
        }
    };

    // Storage.
    let data_dir = expand_home(&args.resolve_data_dir(&config.general.data_dir));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db = Arc::new(Database::open_in_dir(&data_dir)?);
    info!(path = %data_dir.display(), "SQLite database opened");

    match args.command() {
        Command::Drill(drill) => run_drill(&config, db, drill).await,
        Command::Import { file, name } => run_import(db, &file, name),
        Command::Lists => run_lists(db),
        Command::Progress { json } => run_progress(db, json),
        Command::Reset { yes } => run_reset(db, yes),
    }
}
