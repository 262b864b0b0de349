//! Tokio driver for a [`DrillSession`].
//!
//! The session itself is synchronous. [`SessionRunner`] owns it on a single
//! task and serializes three inputs through `tokio::select!`: commands from
//! [`SessionHandle`]s, playback signals from the speech engine and
//! [`TokioCueTimer`], and a shutdown notification. Domain events are fanned
//! out on a broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dictum_core::config::DrillSettings;
use dictum_core::events::DrillEvent;
use dictum_core::types::{Attempt, Generation, Mode, PlaybackSignal, PlaybackStatus, SessionStatus};

use crate::scheduler::CueTimer;
use crate::session::{DrillSession, SessionError, SessionSnapshot};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

// =============================================================================
// Timer
// =============================================================================

/// [`CueTimer`] backed by `tokio::time::sleep`.
///
/// Each schedule spawns one sleeping task; cancelling aborts it.
#[derive(Debug)]
pub struct TokioCueTimer {
    signals: UnboundedSender<PlaybackSignal>,
    pending: Option<JoinHandle<()>>,
}

impl TokioCueTimer {
    pub fn new(signals: UnboundedSender<PlaybackSignal>) -> Self {
        Self {
            signals,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl CueTimer for TokioCueTimer {
    fn schedule(&mut self, delay: Duration, generation: Generation) {
        self.cancel();
        let Ok(runtime) = Handle::try_current() else {
            warn!(%generation, "No tokio runtime; cue timer dropped");
            return;
        };
        let signals = self.signals.clone();
        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(PlaybackSignal::CueDue(generation));
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for TokioCueTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Result of a command together with the session state right after it.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    pub value: T,
    pub snapshot: SessionSnapshot,
}

type Responder<T> = oneshot::Sender<Reply<T>>;

enum Command {
    Begin(Responder<SessionStatus>),
    Submit(String, Responder<Option<Attempt>>),
    Keystroke(String, Responder<Option<Attempt>>),
    Previous(Responder<bool>),
    Next(Responder<bool>),
    TogglePlay(Responder<PlaybackStatus>),
    Replay(Responder<bool>),
    SwitchMode(Mode, Responder<Result<(), SessionError>>),
    ResetProgress(Responder<()>),
    UpdateSettings(DrillSettings, Responder<Result<(), SessionError>>),
    RestartPass(Responder<()>),
    History(oneshot::Sender<Vec<Attempt>>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

// =============================================================================
// Runner
// =============================================================================

/// Single-task owner of a [`DrillSession`].
pub struct SessionRunner {
    session: DrillSession,
    commands: mpsc::Receiver<Command>,
    signals: UnboundedReceiver<PlaybackSignal>,
    events: broadcast::Sender<DrillEvent>,
    shutdown: Arc<Notify>,
}

impl SessionRunner {
    /// Wrap `session`. `signals` must be the receiving end of the channel the
    /// session's speech engine and cue timer report to.
    pub fn new(
        session: DrillSession,
        signals: UnboundedReceiver<PlaybackSignal>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shutdown = Arc::new(Notify::new());

        let handle = SessionHandle {
            commands: command_tx,
            events: events.clone(),
            shutdown: Arc::clone(&shutdown),
        };
        let runner = Self {
            session,
            commands: command_rx,
            signals,
            events,
            shutdown,
        };
        (runner, handle)
    }

    /// Spawn the runner on the current runtime.
    ///
    /// The join handle yields the session back once the runner stops.
    pub fn spawn(
        session: DrillSession,
        signals: UnboundedReceiver<PlaybackSignal>,
    ) -> (SessionHandle, JoinHandle<DrillSession>) {
        let (runner, handle) = Self::new(session, signals);
        (handle, tokio::spawn(runner.run()))
    }

    /// Process commands and playback signals until shutdown or until every
    /// handle is dropped. Playback is stopped before returning.
    pub async fn run(mut self) -> DrillSession {
        info!("Session runner started");
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
                Some(signal) = self.signals.recv() => {
                    // Failures are already recorded on the session.
                    let _ = self.session.handle_signal(signal);
                    self.publish();
                }
            }
        }

        self.session.stop_playback();
        self.publish();
        info!("Session runner stopped");
        self.session
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Begin(tx) => {
                let value = self.session.begin();
                self.reply(tx, value);
            }
            Command::Submit(typed, tx) => {
                let value = self.session.submit(&typed);
                self.reply(tx, value);
            }
            Command::Keystroke(typed, tx) => {
                let value = self.session.auto_submit_on_exact_match(&typed);
                self.reply(tx, value);
            }
            Command::Previous(tx) => {
                let value = self.session.go_to_previous();
                self.reply(tx, value);
            }
            Command::Next(tx) => {
                let value = self.session.go_to_next();
                self.reply(tx, value);
            }
            Command::TogglePlay(tx) => {
                let value = self.session.toggle_continuous_play();
                self.reply(tx, value);
            }
            Command::Replay(tx) => {
                let value = self.session.replay();
                self.reply(tx, value);
            }
            Command::SwitchMode(mode, tx) => {
                let value = self.session.switch_mode(mode);
                self.reply(tx, value);
            }
            Command::ResetProgress(tx) => {
                self.session.reset_progress();
                self.reply(tx, ());
            }
            Command::UpdateSettings(settings, tx) => {
                let value = self.session.update_settings(settings);
                self.reply(tx, value);
            }
            Command::RestartPass(tx) => {
                self.session.restart_pass();
                self.reply(tx, ());
            }
            Command::History(tx) => {
                let _ = tx.send(self.session.history().to_vec());
            }
            Command::Snapshot(tx) => {
                let _ = tx.send(self.session.snapshot());
            }
        }
    }

    /// Publish pending events, then answer the caller.
    fn reply<T>(&mut self, tx: Responder<T>, value: T) {
        self.publish();
        let reply = Reply {
            value,
            snapshot: self.session.snapshot(),
        };
        if tx.send(reply).is_err() {
            debug!("Command caller went away before the reply");
        }
    }

    fn publish(&mut self) {
        for event in self.session.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable front end to a running [`SessionRunner`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<DrillEvent>,
    shutdown: Arc<Notify>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn begin(&self) -> Result<Reply<SessionStatus>, SessionError> {
        self.request(Command::Begin).await
    }

    pub async fn submit(&self, typed: &str) -> Result<Reply<Option<Attempt>>, SessionError> {
        let typed = typed.to_string();
        self.request(|tx| Command::Submit(typed, tx)).await
    }

    /// Report the input typed so far; submits on an exact match.
    pub async fn keystroke(&self, typed: &str) -> Result<Reply<Option<Attempt>>, SessionError> {
        let typed = typed.to_string();
        self.request(|tx| Command::Keystroke(typed, tx)).await
    }

    pub async fn previous(&self) -> Result<Reply<bool>, SessionError> {
        self.request(Command::Previous).await
    }

    pub async fn next(&self) -> Result<Reply<bool>, SessionError> {
        self.request(Command::Next).await
    }

    pub async fn toggle_play(&self) -> Result<Reply<PlaybackStatus>, SessionError> {
        self.request(Command::TogglePlay).await
    }

    pub async fn replay(&self) -> Result<Reply<bool>, SessionError> {
        self.request(Command::Replay).await
    }

    pub async fn switch_mode(&self, mode: Mode) -> Result<Reply<()>, SessionError> {
        let reply = self.request(|tx| Command::SwitchMode(mode, tx)).await?;
        reply.value.map(|()| Reply {
            value: (),
            snapshot: reply.snapshot,
        })
    }

    pub async fn reset_progress(&self) -> Result<Reply<()>, SessionError> {
        self.request(Command::ResetProgress).await
    }

    pub async fn update_settings(&self, settings: DrillSettings) -> Result<Reply<()>, SessionError> {
        let reply = self
            .request(|tx| Command::UpdateSettings(settings, tx))
            .await?;
        reply.value.map(|()| Reply {
            value: (),
            snapshot: reply.snapshot,
        })
    }

    pub async fn restart_pass(&self) -> Result<Reply<()>, SessionError> {
        self.request(Command::RestartPass).await
    }

    pub async fn history(&self) -> Result<Vec<Attempt>, SessionError> {
        self.request(Command::History).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DrillEvent> {
        self.events.subscribe()
    }

    /// Signal the runner to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

// =============================================================================
// Tests
// =============================================================================
