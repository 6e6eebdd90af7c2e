//! Run one job: build the request, call the provider under the retry policy,
//! write the image and record the outcome in the state store.
//!
//! Failures are returned as `JobOutcome::Failed`, never as `Err`, so the
//! scheduler can keep going.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::FailureKind;
use crate::job::{CanonicalImageJob, ImageResult};
use crate::progress::{emit, ProgressEvent, ProgressSender};
use crate::provider::{ImageProvider, SynthesisRequest};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::state::StateStore;

/// Result of executing one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Generated {
        result: ImageResult,
        attempts: u32,
    },
    Failed {
        filename: String,
        kind: FailureKind,
        error: String,
        attempts: u32,
    },
}

impl JobOutcome {
    pub fn filename(&self) -> &str {
        match self {
            JobOutcome::Generated { result, .. } => &result.filename,
            JobOutcome::Failed { filename, .. } => filename,
        }
    }

    /// Kind of a failure that should stop further dispatch.
    pub fn permanent_failure(&self) -> Option<FailureKind> {
        match self {
            JobOutcome::Failed { kind, .. } if kind.is_permanent() => Some(*kind),
            _ => None,
        }
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// "Aspect ratio 16:9 (1200x675 pixels)."
pub fn aspect_hint(width: u32, height: u32) -> String {
    let g = gcd(width, height).max(1);
    format!(
        "Aspect ratio {}:{} ({}x{} pixels).",
        width / g,
        height / g,
        width,
        height
    )
}

/// Normalized prompt plus size hint and, unless already present, the negative prompt.
pub fn build_prompt(job: &CanonicalImageJob) -> String {
    let base = job.prompt.trim();
    let mut prompt = String::with_capacity(base.len() + 64);
    prompt.push_str(base);
    if !base.ends_with('.') {
        prompt.push('.');
    }
    prompt.push(' ');
    prompt.push_str(&aspect_hint(job.width, job.height));
    if let Some(neg) = job.negative_prompt.as_deref().map(str::trim) {
        let neg = neg.trim_end_matches('.');
        if !neg.is_empty() && !base.contains(&format!("Avoid: {}", neg)) {
            prompt.push_str(&format!(" Avoid: {}.", neg));
        }
    }
    prompt
}

#[derive(Clone)]
pub struct JobExecutor {
    provider: Arc<dyn ImageProvider>,
    state: Arc<StateStore>,
    output_dir: PathBuf,
    retry: RetryPolicy,
    progress: Option<ProgressSender>,
}

impl JobExecutor {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        state: Arc<StateStore>,
        output_dir: PathBuf,
        retry: RetryPolicy,
        progress: Option<ProgressSender>,
    ) -> Self {
        Self {
            provider,
            state,
            output_dir,
            retry,
            progress,
        }
    }

    pub async fn execute(&self, job: &CanonicalImageJob) -> JobOutcome {
        let request = SynthesisRequest {
            label: job.filename.clone(),
            prompt: build_prompt(job),
            width: job.width,
            height: job.height,
        };
        emit(
            self.progress.as_ref(),
            ProgressEvent::JobStarted {
                filename: job.filename.clone(),
            },
        );
        tracing::debug!(filename = %job.filename, provider = self.provider.name(), "job started");

        let provider = &self.provider;
        let request = &request;
        let mut attempts = 1u32;
        let synthesized = run_with_retry(
            &self.retry,
            |attempt, err, delay| {
                attempts = attempt + 1;
                tracing::warn!(filename = %job.filename, attempt, error = %err, "synthesis failed; retrying");
                emit(
                    self.progress.as_ref(),
                    ProgressEvent::JobRetrying {
                        filename: job.filename.clone(),
                        attempt,
                        error: err.to_string(),
                        delay,
                    },
                );
            },
            move || async move {
                let response = provider.synthesize(request).await?;
                response.decode()
            },
        )
        .await;

        let bytes = match synthesized {
            Ok(bytes) => bytes,
            Err(e) => {
                return self.fail(job, e.kind, e.last.to_string(), e.attempts);
            }
        };

        let path = self.output_dir.join(&job.filename);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            let msg = format!("write {}: {}", path.display(), e);
            return self.fail(job, FailureKind::Transient, msg, attempts);
        }

        if let Err(e) = self.state.record_success(&job.filename) {
            // Kept in memory; `finalize` writes it again or fails the run.
            tracing::error!(filename = %job.filename, error = %e, "could not record success");
        }
        tracing::info!(filename = %job.filename, attempts, bytes = bytes.len(), "image generated");
        emit(
            self.progress.as_ref(),
            ProgressEvent::JobSucceeded {
                filename: job.filename.clone(),
                attempts,
            },
        );
        JobOutcome::Generated {
            result: ImageResult::for_job(job, path),
            attempts,
        }
    }

    /// Record a job that was never sent because dispatch halted on a `kind` failure.
    pub fn not_dispatched(&self, job: &CanonicalImageJob, kind: FailureKind) -> JobOutcome {
        let msg = format!("not dispatched: batch halted after {} failure", kind);
        self.fail(job, kind, msg, 0)
    }

    fn fail(
        &self,
        job: &CanonicalImageJob,
        kind: FailureKind,
        error: String,
        attempts: u32,
    ) -> JobOutcome {
        if let Err(e) = self.state.record_failure(&job.filename) {
            tracing::error!(filename = %job.filename, error = %e, "could not record failure");
        }
        tracing::warn!(filename = %job.filename, %kind, attempts, error = %error, "job failed");
        emit(
            self.progress.as_ref(),
            ProgressEvent::JobFailed {
                filename: job.filename.clone(),
                kind,
                error: error.clone(),
            },
        );
        JobOutcome::Failed {
            filename: job.filename.clone(),
            kind,
            error,
            attempts,
        }
    }
}
