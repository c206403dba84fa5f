//! Hand-off of finished recordings to the document's thread
//!
//! The game reports recordings on a listener thread while the document
//! lives on the UI thread with no internal locking. [`RecordingInbox`] is
//! the seam between the two: the listener pushes [`RecordedTake`]s into an
//! mpsc channel and the owning thread drains it and reconciles each take.
//!
//! A panic on the listener thread means the recording stream is in an
//! unknown state. It is logged and the process is aborted.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tas_core::{presses_to_lines, InputLine, Press};
use tracing::{debug, error, warn};

use crate::core::document::ScriptDocument;
use crate::core::errors::{EditorError, Result};
use crate::reconcile::ReconcileOutcome;

/// One finished recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTake {
    /// Stage the take was recorded on
    pub stage: String,
    /// Recorded input, in play order
    pub lines: Vec<InputLine>,
    /// Append input running past the end of the script
    pub force: bool,
}

impl RecordedTake {
    /// Wrap already grouped lines
    pub fn new(stage: impl Into<String>, lines: Vec<InputLine>) -> Self {
        Self {
            stage: stage.into(),
            lines,
            force: false,
        }
    }

    /// Build a take from raw press/release events
    pub fn from_presses(stage: impl Into<String>, presses: &[Press]) -> Self {
        Self::new(stage, presses_to_lines(presses))
    }

    /// Set whether overflowing input is appended
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Frames carried by the take
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.frames)).sum()
    }
}

/// Queue of takes waiting to be reconciled on the owning thread
#[derive(Debug)]
pub struct RecordingInbox {
    tx: Sender<RecordedTake>,
    rx: Receiver<RecordedTake>,
}

impl Default for RecordingInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingInbox {
    /// Create an empty inbox
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Sender for a listener thread
    #[must_use]
    pub fn sender(&self) -> Sender<RecordedTake> {
        self.tx.clone()
    }

    /// Reconcile every queued take into `document`, oldest first
    ///
    /// A take that fails (for example one recorded on another stage) does not
    /// stop the rest; each take's result is returned in order.
    pub fn drain(&self, document: &mut ScriptDocument) -> Vec<Result<ReconcileOutcome>> {
        self.rx
            .try_iter()
            .map(|take| {
                let result = document.reconcile(&take.stage, &take.lines, take.force);
                match &result {
                    Ok(outcome) => debug!(
                        stage = %take.stage,
                        frames = take.frames(),
                        outcome = outcome.kind_name(),
                        "take reconciled"
                    ),
                    Err(err) => warn!(stage = %take.stage, error = %err, "take rejected"),
                }
                result
            })
            .collect()
    }
}

/// Forward takes from `source` into an inbox on a dedicated thread
///
/// The thread ends when `source` is exhausted or the inbox is dropped. A
/// panic inside `source` aborts the process.
///
/// # Errors
/// Returns [`EditorError::IoError`] when the thread cannot be spawned.
pub fn spawn_listener<I>(inbox: Sender<RecordedTake>, source: I) -> Result<JoinHandle<()>>
where
    I: IntoIterator<Item = RecordedTake>,
    I::IntoIter: Send + 'static,
{
    let takes = source.into_iter();
    thread::Builder::new()
        .name("tas-recording".into())
        .spawn(move || {
            let forwarded = panic::catch_unwind(AssertUnwindSafe(|| forward(takes, &inbox)));
            if forwarded.is_err() {
                error!("recording listener panicked, aborting");
                std::process::abort();
            }
        })
        .map_err(|e| EditorError::io(format!("Failed to spawn recording listener: {e}")))
}

fn forward(takes: impl Iterator<Item = RecordedTake>, inbox: &Sender<RecordedTake>) {
    for take in takes {
        debug!(stage = %take.stage, lines = take.lines.len(), "take received");
        if inbox.send(take).is_err() {
            debug!("recording inbox closed");
            return;
        }
    }
}
