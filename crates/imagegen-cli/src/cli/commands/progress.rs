//! Render pipeline progress events as terminal lines.

use imagegen_core::progress::{ProgressEvent, RunPhase};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn render(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::Phase(RunPhase::Preflight) => Some("Checking credentials and credits...".to_string()),
        ProgressEvent::Phase(_) => None,
        ProgressEvent::PreflightWarning(w) => Some(format!("  warning: {}", w)),
        ProgressEvent::Planned {
            total,
            pending,
            skipped,
        } => Some(format!(
            "{} image(s): {} to generate, {} already done",
            total, pending, skipped
        )),
        ProgressEvent::JobSkipped { filename } => Some(format!("  skip  {}", filename)),
        ProgressEvent::JobStarted { filename } => Some(format!("  start {}", filename)),
        ProgressEvent::JobRetrying {
            filename,
            attempt,
            error,
            delay,
        } => Some(format!(
            "  retry {} (attempt {} failed: {}; waiting {:.1}s)",
            filename,
            attempt,
            error,
            delay.as_secs_f64()
        )),
        ProgressEvent::JobSucceeded { filename, attempts } => {
            if *attempts > 1 {
                Some(format!("  done  {} ({} attempts)", filename, attempts))
            } else {
                Some(format!("  done  {}", filename))
            }
        }
        ProgressEvent::JobFailed {
            filename,
            kind,
            error,
        } => Some(format!("  FAIL  {} [{}] {}", filename, kind, error)),
        ProgressEvent::DispatchHalted {
            kind,
            not_dispatched,
        } => Some(format!(
            "Stopped dispatching after {} failure ({} image(s) not started)",
            kind, not_dispatched
        )),
    }
}

/// Print events until every sender is dropped.
pub fn spawn_printer(mut rx: mpsc::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = render(&event) {
                println!("{}", line);
            }
        }
    })
}
