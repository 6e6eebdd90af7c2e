//! The run state machine:
//! `Init -> Preflight -> Plan -> Running -> Settled -> Finalized`, or
//! `Init -> Preflight -> Aborted`.
//!
//! Nothing under the output directory is written before preflight passes, so
//! an aborted run leaves earlier state exactly as it was.

use std::collections::HashSet;
use std::sync::Arc;

use crate::aggregate::{aggregate, existing_outputs};
use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::executor::{JobExecutor, JobOutcome};
use crate::job::ImageResult;
use crate::manifest::{normalize, validate_manifest, Manifest, Normalized};
use crate::preflight::{PreflightResult, PreflightValidator};
use crate::progress::{emit, ProgressEvent, ProgressSender, RunPhase};
use crate::provider::ImageProvider;
use crate::scheduler::{plan, Plan, Scheduler};
use crate::state::{GenerationState, StateStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Regenerate every job and replace the persisted state.
    pub force: bool,
    /// Do not run the credential/credits gate.
    pub skip_preflight: bool,
}

/// Summary of one `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub slug: String,
    /// Images available after the run, in manifest order.
    pub results: Vec<ImageResult>,
    /// Terminal state as written to disk.
    pub state: GenerationState,
    /// Number of image requests in the manifest.
    pub total: usize,
    pub generated: usize,
    /// Results carried over from earlier runs.
    pub reused: usize,
    /// Jobs recorded as failed this run (rejected and not-dispatched included).
    pub failed: usize,
    pub not_dispatched: usize,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.results.len() == self.total
    }
}

/// Manifest, normalized jobs and the skip/run partition for one slug.
struct Prepared {
    manifest: Manifest,
    normalized: Normalized,
    previous: Option<GenerationState>,
    plan: Plan,
}

pub struct Pipeline {
    settings: PipelineSettings,
    provider: Arc<dyn ImageProvider>,
    progress: Option<ProgressSender>,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            settings,
            provider,
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn phase(&self, phase: RunPhase) {
        tracing::debug!(?phase, "run phase");
        emit(self.progress.as_ref(), ProgressEvent::Phase(phase));
    }

    /// Load, validate and normalize the manifest and plan against the
    /// persisted state. Read-only.
    fn prepare(&self, slug: &str, force: bool) -> Result<Prepared, PipelineError> {
        let manifest_path = self.settings.manifest_path(slug);
        let manifest = Manifest::load(&manifest_path)?;
        if manifest.slug != slug {
            tracing::warn!(manifest_slug = %manifest.slug, slug, "manifest slug differs from requested slug");
        }
        let validation = validate_manifest(&manifest);
        if !validation.is_runnable() {
            return Err(PipelineError::Manifest {
                path: manifest_path,
                message: validation.errors.join("; "),
            });
        }
        let normalized = normalize(&manifest);

        let output_dir = self.settings.output_dir(slug);
        let previous = match StateStore::load(&output_dir) {
            Ok(prev) => prev,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable generation state");
                None
            }
        };
        let plan = plan(
            normalized.jobs.clone(),
            previous.as_ref(),
            &output_dir,
            force,
        );
        Ok(Prepared {
            manifest,
            normalized,
            previous,
            plan,
        })
    }

    async fn check(&self, job_count: usize) -> PreflightResult {
        PreflightValidator {
            api_key: self.settings.api_key.as_deref(),
            cost_per_image: self.settings.cost_per_image,
            timeout: self.settings.preflight_timeout,
        }
        .check(self.provider.as_ref(), job_count)
        .await
    }

    /// Run only the preflight gate for `slug`, estimating for the jobs a
    /// `generate` would actually send.
    pub async fn preflight(&self, slug: &str) -> Result<PreflightResult, PipelineError> {
        let prepared = self.prepare(slug, false)?;
        Ok(self.check(prepared.plan.pending.len()).await)
    }

    pub async fn generate(
        &self,
        slug: &str,
        opts: GenerateOptions,
    ) -> Result<RunReport, PipelineError> {
        self.phase(RunPhase::Init);
        let prepared = match self.prepare(slug, opts.force) {
            Ok(p) => p,
            Err(e) => {
                self.phase(RunPhase::Aborted);
                return Err(e);
            }
        };
        let Prepared {
            manifest,
            normalized,
            previous,
            plan,
        } = prepared;
        let output_dir = self.settings.output_dir(slug);
        let mut warnings: Vec<String> = normalized.warnings.iter().map(ToString::to_string).collect();

        if opts.skip_preflight {
            tracing::warn!(slug, "preflight skipped");
        } else {
            self.phase(RunPhase::Preflight);
            let result = self.check(plan.pending.len()).await;
            if let Some(w) = result.warning.clone() {
                emit(self.progress.as_ref(), ProgressEvent::PreflightWarning(w.clone()));
                warnings.push(w);
            }
            if let Some(err) = result.to_error() {
                tracing::error!(slug, error = %err, "preflight failed; run aborted");
                self.phase(RunPhase::Aborted);
                return Err(err);
            }
        }

        self.phase(RunPhase::Plan);
        emit(
            self.progress.as_ref(),
            ProgressEvent::Planned {
                total: manifest.total(),
                pending: plan.pending.len(),
                skipped: plan.skipped.len(),
            },
        );
        for job in &plan.skipped {
            tracing::debug!(filename = %job.filename, "already generated; skipping");
            emit(
                self.progress.as_ref(),
                ProgressEvent::JobSkipped {
                    filename: job.filename.clone(),
                },
            );
        }

        let pre_existing: HashSet<String> = existing_outputs(&normalized.jobs, &output_dir);
        tokio::fs::create_dir_all(&output_dir).await?;

        // Forget entries that no longer belong to this manifest.
        let carried = if opts.force {
            None
        } else {
            previous.map(|mut prev| {
                let known: HashSet<&str> = normalized
                    .jobs
                    .iter()
                    .map(|j| j.filename.as_str())
                    .chain(normalized.rejected.iter().map(|r| r.filename.as_str()))
                    .collect();
                prev.completed.retain(|f| known.contains(f.as_str()));
                prev.failed.retain(|f| known.contains(f.as_str()));
                prev
            })
        };
        let state = Arc::new(StateStore::begin(
            &output_dir,
            slug,
            manifest.total(),
            carried,
        )?);

        for rejected in &normalized.rejected {
            tracing::warn!(filename = %rejected.filename, reason = %rejected.reason, "entry rejected");
            state.record_failure(&rejected.filename)?;
            warnings.push(rejected.reason.clone());
        }

        self.phase(RunPhase::Running);
        tracing::info!(
            slug,
            pending = plan.pending.len(),
            skipped = plan.skipped.len(),
            concurrency = self.settings.concurrency,
            "generation started"
        );
        let executor = JobExecutor::new(
            Arc::clone(&self.provider),
            Arc::clone(&state),
            output_dir.clone(),
            self.settings.retry,
            self.progress.clone(),
        );
        let schedule = Scheduler::new(self.settings.concurrency, self.progress.clone())
            .run(executor, plan.pending)
            .await;
        self.phase(RunPhase::Settled);

        let final_state = state.finalize().map_err(|e| {
            tracing::error!(
                slug,
                error = %e,
                "generation state not saved; images from this run will be generated again"
            );
            self.phase(RunPhase::Aborted);
            e
        })?;
        let results = aggregate(&normalized.jobs, &schedule.outcomes, &pre_existing, &output_dir);
        let generated = schedule
            .outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Generated { .. }))
            .count();
        let failed = schedule.outcomes.len() - generated + normalized.rejected.len();

        let report = RunReport {
            slug: slug.to_string(),
            reused: results.len() - generated,
            results,
            state: final_state,
            total: manifest.total(),
            generated,
            failed,
            not_dispatched: schedule.not_dispatched.len(),
            warnings,
        };
        tracing::info!(
            slug,
            status = report.state.status.as_str(),
            generated = report.generated,
            reused = report.reused,
            failed = report.failed,
            "generation finished"
        );
        self.phase(RunPhase::Finalized);
        Ok(report)
    }

    /// Persisted state for `slug`, if any.
    pub fn status(&self, slug: &str) -> Result<Option<GenerationState>, PipelineError> {
        StateStore::load(&self.settings.output_dir(slug))
    }
}
