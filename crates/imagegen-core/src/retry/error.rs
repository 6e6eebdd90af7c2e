use std::fmt;

use crate::error::FailureKind;
use crate::provider::ProviderError;

/// Last error of a retried call, with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError {
    pub kind: FailureKind,
    /// Attempts made, including the failing one.
    pub attempts: u32,
    pub last: ProviderError,
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failure after {} attempt(s): {}",
            self.kind, self.attempts, self.last
        )
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}
