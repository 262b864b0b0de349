//! Speech through an external text-to-speech program.
//!
//! Spawns one child process per cue (`espeak-ng -v en-us <word>` by default)
//! and reports `SpeechFinished` when the process exits. Cancelling aborts the
//! waiter task, which kills the child.

use std::process::Stdio;

use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dictum_core::types::{PlaybackSignal, Pronunciation};

use crate::{SpeechEngine, SpeechError, Utterance};

/// espeak-style voice name for an accent.
pub fn voice_for(pronunciation: Pronunciation) -> &'static str {
    match pronunciation {
        Pronunciation::American => "en-us",
        Pronunciation::British => "en-gb",
    }
}

/// Speech engine backed by an external command.
#[derive(Debug)]
pub struct CommandSpeech {
    program: String,
    signals: UnboundedSender<PlaybackSignal>,
    current: Option<JoinHandle<()>>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, signals: UnboundedSender<PlaybackSignal>) -> Self {
        Self {
            program: program.into(),
            signals,
            current: None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Whether a cue process is still being awaited.
    pub fn is_speaking(&self) -> bool {
        self.current.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl SpeechEngine for CommandSpeech {
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        if utterance.text.trim().is_empty() {
            return Err(SpeechError::Rejected {
                text: utterance.text.clone(),
                reason: "empty utterance".to_string(),
            });
        }

        let handle = Handle::try_current()
            .map_err(|_| SpeechError::Unavailable("no async runtime for speech".to_string()))?;
        let _guard = handle.enter();

        self.cancel();

        let mut child = Command::new(&self.program)
            .arg("-v")
            .arg(voice_for(utterance.pronunciation))
            .arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeechError::Unavailable(format!("failed to start {}: {}", self.program, e))
            })?;

        debug!(
            program = %self.program,
            word = %utterance.text,
            generation = %utterance.generation,
            "Speaking cue"
        );

        let signals = self.signals.clone();
        let generation = utterance.generation;
        let text = utterance.text.clone();
        self.current = Some(handle.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {}
                Ok(status) => warn!(word = %text, %status, "Speech process exited with failure"),
                Err(e) => warn!(word = %text, error = %e, "Failed to wait for speech process"),
            }
            // Completion is reported whatever the exit status.
            let _ = signals.send(PlaybackSignal::SpeechFinished(generation));
        }));

        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}
