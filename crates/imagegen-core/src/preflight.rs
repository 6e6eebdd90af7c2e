//! Pre-spend gate: credential present and enough credits for the batch.
//!
//! The credits query is best-effort. If it cannot be answered within the
//! timeout the run proceeds with a warning; only a definite answer (credential
//! rejected, balance too low) blocks it.

use std::fmt;
use std::time::Duration;

use crate::error::PipelineError;
use crate::provider::{ImageProvider, ProviderError};

/// Required headroom over the estimated cost.
pub const SAFETY_MARGIN: f64 = 1.2;

#[derive(Debug, Clone, PartialEq)]
pub enum PreflightFailure {
    MissingCredential,
    CredentialRejected(String),
    InsufficientCredits { remaining: f64, required: f64 },
}

impl fmt::Display for PreflightFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightFailure::MissingCredential => {
                write!(f, "no API credential configured (set IMAGEGEN_API_KEY)")
            }
            PreflightFailure::CredentialRejected(msg) => {
                write!(f, "API credential rejected: {}", msg)
            }
            PreflightFailure::InsufficientCredits { remaining, required } => write!(
                f,
                "insufficient credits: {:.4} remaining, {:.4} required (estimate x {})",
                remaining, required, SAFETY_MARGIN
            ),
        }
    }
}

/// Outcome of the gate. Computed once per run, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreflightResult {
    pub failure: Option<PreflightFailure>,
    pub credits_remaining: Option<f64>,
    pub estimated_cost: Option<f64>,
    /// Set when the credits query could not be answered.
    pub warning: Option<String>,
}

impl PreflightResult {
    pub fn ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn error(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }

    /// Run-level error for a failed gate.
    pub fn to_error(&self) -> Option<PipelineError> {
        let failure = self.failure.as_ref()?;
        let msg = failure.to_string();
        Some(match failure {
            PreflightFailure::MissingCredential => PipelineError::Configuration(msg),
            PreflightFailure::CredentialRejected(_) => PipelineError::Auth(msg),
            PreflightFailure::InsufficientCredits { .. } => PipelineError::Quota(msg),
        })
    }
}

/// Preflight inputs, all taken from `PipelineSettings`.
#[derive(Debug, Clone)]
pub struct PreflightValidator<'a> {
    pub api_key: Option<&'a str>,
    pub cost_per_image: f64,
    pub timeout: Duration,
}

impl PreflightValidator<'_> {
    pub async fn check(&self, provider: &dyn ImageProvider, job_count: usize) -> PreflightResult {
        if self.api_key.map_or(true, |k| k.trim().is_empty()) {
            return PreflightResult {
                failure: Some(PreflightFailure::MissingCredential),
                ..PreflightResult::default()
            };
        }

        let estimated = job_count as f64 * self.cost_per_image;
        let mut result = PreflightResult {
            estimated_cost: Some(estimated),
            ..PreflightResult::default()
        };

        let balance = match tokio::time::timeout(self.timeout, provider.credits()).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(ProviderError::Auth(msg))) => {
                result.failure = Some(PreflightFailure::CredentialRejected(msg));
                return result;
            }
            Ok(Err(ProviderError::Quota(_))) => {
                result.credits_remaining = Some(0.0);
                result.failure = Some(PreflightFailure::InsufficientCredits {
                    remaining: 0.0,
                    required: estimated * SAFETY_MARGIN,
                });
                return result;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "credits query failed; proceeding without budget check");
                result.warning = Some(format!("could not check credits: {}", e));
                return result;
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "credits query timed out; proceeding without budget check");
                result.warning = Some(format!(
                    "credits query timed out after {}s",
                    self.timeout.as_secs_f64()
                ));
                return result;
            }
        };

        let remaining = balance.remaining();
        let required = estimated * SAFETY_MARGIN;
        result.credits_remaining = Some(remaining);
        if remaining < required {
            result.failure = Some(PreflightFailure::InsufficientCredits {
                remaining,
                required,
            });
        }
        tracing::debug!(remaining, estimated, job_count, ok = result.ok(), "preflight");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn validator(key: Option<&str>) -> PreflightValidator<'_> {
        PreflightValidator {
            api_key: key,
            cost_per_image: 0.04,
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_without_query() {
        let p = MockProvider::new();
        for key in [None, Some(""), Some("  ")] {
            let r = validator(key).check(&p, 3).await;
            assert_eq!(r.failure, Some(PreflightFailure::MissingCredential));
            assert!(matches!(r.to_error(), Some(PipelineError::Configuration(_))));
        }
        assert_eq!(p.credit_queries(), 0);
    }

    #[tokio::test]
    async fn enough_credits_passes() {
        let p = MockProvider::new().with_credits(Some(1.0));
        let r = validator(Some("k")).check(&p, 10).await;
        assert!(r.ok());
        assert_eq!(r.credits_remaining, Some(1.0));
        assert!((r.estimated_cost.unwrap() - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn margin_is_applied() {
        // 10 jobs x 0.04 = 0.40; with margin 0.48 is needed.
        let p = MockProvider::new().with_credits(Some(0.45));
        let r = validator(Some("k")).check(&p, 10).await;
        assert!(!r.ok());
        assert!(matches!(r.to_error(), Some(PipelineError::Quota(_))));
        assert!(r.error().unwrap().contains("insufficient credits"));
    }

    #[tokio::test]
    async fn unreachable_credits_endpoint_warns_and_passes() {
        let p = MockProvider::new().with_credits(None);
        let r = validator(Some("k")).check(&p, 10).await;
        assert!(r.ok());
        assert!(r.warning.is_some());
        assert_eq!(r.credits_remaining, None);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_credits_endpoint_times_out_and_passes() {
        let p = MockProvider::new().with_credits_delay(Duration::from_secs(60));
        let r = validator(Some("k")).check(&p, 10).await;
        assert!(r.ok());
        assert!(r.warning.unwrap().contains("timed out"));
    }
}
