//! Bounded-concurrency dispatch of jobs.
//!
//! Jobs are admitted in manifest order through a semaphore of `K` slots.
//! Completion order is unconstrained. A permanent failure (auth, quota) closes
//! the dispatch gate: jobs already running finish, jobs not yet admitted are
//! recorded as failed without calling the provider.

mod plan;

pub use plan::{plan, Plan};

use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::FailureKind;
use crate::executor::{JobExecutor, JobOutcome};
use crate::job::CanonicalImageJob;
use crate::progress::{emit, ProgressEvent, ProgressSender};

/// What happened to each dispatched job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// One outcome per input job, in manifest order.
    pub outcomes: Vec<JobOutcome>,
    /// Filenames never sent because dispatch halted.
    pub not_dispatched: Vec<String>,
    /// Kind of the failure that closed the gate, if any.
    pub halted: Option<FailureKind>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency: usize,
    progress: Option<ProgressSender>,
}

impl Scheduler {
    pub fn new(concurrency: usize, progress: Option<ProgressSender>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every job and wait for all admitted jobs to settle.
    pub async fn run(&self, executor: JobExecutor, jobs: Vec<CanonicalImageJob>) -> ScheduleReport {
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let gate: Arc<OnceLock<FailureKind>> = Arc::new(OnceLock::new());
        let mut join_set = JoinSet::new();
        let mut report = ScheduleReport::default();
        let mut settled: Vec<(usize, JobOutcome)> = Vec::with_capacity(jobs.len());

        let mut queue = jobs.into_iter().enumerate();
        for (pos, job) in queue.by_ref() {
            let permit = match Arc::clone(&slots).acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    tracing::error!("slot semaphore closed");
                    settled.push((pos, executor.not_dispatched(&job, FailureKind::Transient)));
                    continue;
                }
            };
            if let Some(kind) = gate.get() {
                drop(permit);
                settled.push((pos, executor.not_dispatched(&job, *kind)));
                report.not_dispatched.push(job.filename);
                break;
            }
            let executor = executor.clone();
            let gate = Arc::clone(&gate);
            join_set.spawn(async move {
                let outcome = executor.execute(&job).await;
                if let Some(kind) = outcome.permanent_failure() {
                    if gate.set(kind).is_ok() {
                        tracing::warn!(filename = %job.filename, %kind, "halting dispatch");
                    }
                }
                drop(permit);
                (pos, outcome)
            });
        }

        // Gate closed: the rest of the queue is never admitted.
        if let Some(kind) = gate.get().copied() {
            for (pos, job) in queue {
                settled.push((pos, executor.not_dispatched(&job, kind)));
                report.not_dispatched.push(job.filename);
            }
        }

        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(entry) => settled.push(entry),
                Err(e) => tracing::error!(error = %e, "job task join"),
            }
        }

        report.halted = gate.get().copied();
        if let Some(kind) = report.halted {
            tracing::warn!(%kind, not_dispatched = report.not_dispatched.len(), "dispatch halted");
            emit(
                self.progress.as_ref(),
                ProgressEvent::DispatchHalted {
                    kind,
                    not_dispatched: report.not_dispatched.len(),
                },
            );
        }

        settled.sort_by_key(|(pos, _)| *pos);
        report.outcomes = settled.into_iter().map(|(_, o)| o).collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockBehavior, MockProvider};
    use crate::retry::RetryPolicy;
    use crate::state::StateStore;
    use std::time::Duration;

    fn jobs(n: usize) -> Vec<CanonicalImageJob> {
        (0..n)
            .map(|i| CanonicalImageJob {
                index: i,
                filename: format!("x-{}.png", i),
                prompt: "p".to_string(),
                alt_text: "a".to_string(),
                width: 16,
                height: 9,
                caption: None,
                placement: None,
                negative_prompt: None,
                is_hero: i == 0,
            })
            .collect()
    }

    fn setup(
        provider: Arc<MockProvider>,
        dir: &std::path::Path,
        n: usize,
    ) -> (JobExecutor, Arc<StateStore>) {
        let state = Arc::new(StateStore::begin(dir, "x", n, None).unwrap());
        let exec = JobExecutor::new(
            provider,
            state.clone(),
            dir.to_path_buf(),
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::from_millis(1),
            },
            None,
        );
        (exec, state)
    }

    #[tokio::test]
    async fn outcomes_follow_manifest_order_and_respect_the_bound() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new().with_latency(Duration::from_millis(20)));
        let (exec, _state) = setup(provider.clone(), dir.path(), 6);
        let report = Scheduler::new(2, None).run(exec, jobs(6)).await;
        let names: Vec<_> = report.outcomes.iter().map(|o| o.filename().to_string()).collect();
        assert_eq!(names, (0..6).map(|i| format!("x-{}.png", i)).collect::<Vec<_>>());
        assert!(provider.max_in_flight() <= 2);
        assert_eq!(provider.calls(), 6);
        assert!(report.halted.is_none());
    }

    #[tokio::test]
    async fn permanent_failure_stops_new_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new().script("x-0.png", MockBehavior::Quota));
        let (exec, state) = setup(provider.clone(), dir.path(), 4);
        let report = Scheduler::new(1, None).run(exec, jobs(4)).await;
        assert_eq!(report.halted, Some(FailureKind::Quota));
        assert_eq!(provider.calls(), 1);
        assert_eq!(report.not_dispatched, vec!["x-1.png", "x-2.png", "x-3.png"]);
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(state.snapshot().failed.len(), 4);
    }
}
