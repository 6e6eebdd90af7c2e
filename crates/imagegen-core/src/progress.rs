//! Progress events for the CLI.
//!
//! Sent with `try_send` on a bounded channel: a slow or absent consumer drops
//! events instead of stalling a job.

use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::FailureKind;

/// Run state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Preflight,
    Plan,
    Running,
    Settled,
    Finalized,
    /// Terminal; persisted state was not touched.
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase(RunPhase),
    PreflightWarning(String),
    /// Partition of the job list after planning.
    Planned {
        total: usize,
        pending: usize,
        skipped: usize,
    },
    JobSkipped {
        filename: String,
    },
    JobStarted {
        filename: String,
    },
    JobRetrying {
        filename: String,
        attempt: u32,
        error: String,
        delay: Duration,
    },
    JobSucceeded {
        filename: String,
        attempts: u32,
    },
    JobFailed {
        filename: String,
        kind: FailureKind,
        error: String,
    },
    /// A permanent failure stopped new dispatch.
    DispatchHalted {
        kind: FailureKind,
        not_dispatched: usize,
    },
}

pub type ProgressSender = mpsc::Sender<ProgressEvent>;

/// Default capacity used by `channel`.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

pub fn channel() -> (ProgressSender, mpsc::Receiver<ProgressEvent>) {
    mpsc::channel(PROGRESS_CHANNEL_CAPACITY)
}

/// Best-effort send; full or closed channels drop the event.
pub(crate) fn emit(tx: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = tx {
        let _ = tx.try_send(event);
    }
}
