//! Error taxonomy for the pipeline.
//!
//! Run-level failures are `PipelineError`; a failure that stays isolated to a
//! single job is described by `FailureKind` and recorded in the state file
//! instead of being propagated.

use std::fmt;
use std::path::PathBuf;

/// Per-job failure classification, decided once at the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential rejected by the provider. Not retried.
    Auth,
    /// Provider reports the account is out of credits. Not retried.
    Quota,
    /// Network, rate limit or unknown failure. Retried up to the policy bound.
    Transient,
    /// Manifest entry has no derivable prompt.
    Input,
}

impl FailureKind {
    /// Auth and quota failures will not self-correct within a run.
    pub fn is_permanent(self) -> bool {
        matches!(self, FailureKind::Auth | FailureKind::Quota)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Auth => "auth",
            FailureKind::Quota => "quota",
            FailureKind::Transient => "transient",
            FailureKind::Input => "input",
        };
        f.write_str(s)
    }
}

/// Errors that end a run (or a command) as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or unusable configuration, e.g. no API credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Not enough remaining credits for the batch.
    #[error("quota error: {0}")]
    Quota(String),

    /// Credential rejected by the provider.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Failure expected to go away on its own (network, rate limit).
    #[error("transient error: {0}")]
    Transient(String),

    /// A manifest entry could not be turned into a job.
    #[error("input error: {0}")]
    Input(String),

    /// Manifest missing, unreadable or failing validation.
    #[error("manifest error ({}): {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    /// Persisted generation state could not be read or written.
    #[error("state file {}: {message}", path.display())]
    State { path: PathBuf, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True for errors raised before any spend (preflight gate).
    pub fn is_preflight_abort(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_) | PipelineError::Quota(_) | PipelineError::Auth(_)
        )
    }
}
