//! Dictum Session crate - the dictation drill engine.
//!
//! A drill session presents words one at a time, speaks each as a series of
//! cues, judges the typed answer, and tracks which words are mastered and
//! which were missed. Lifecycle: Idle -> Presenting <-> Exhausted.
//!
//! Everything under [`session`] is synchronous and free of I/O;
//! [`runtime`] drives it on tokio.

pub mod evaluator;
pub mod history;
pub mod progress;
pub mod queue;
pub mod runtime;
pub mod scheduler;
pub mod session;

pub use evaluator::{evaluate, is_exact_match};
pub use history::HistoryLog;
pub use progress::ProgressTracker;
pub use queue::derive_queue;
pub use runtime::{Reply, SessionHandle, SessionRunner, TokioCueTimer};
pub use scheduler::{
    CueProgress, CueTimer, ManualCueTimer, PlaybackError, PlaybackScheduler, PlaybackState,
};
pub use session::{DrillSession, SessionBuilder, SessionError, SessionSnapshot};
