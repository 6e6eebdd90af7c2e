//! `imagegen generate` – run the pipeline for one slug.

use anyhow::{bail, Result};
use imagegen_core::config::ImagegenConfig;
use imagegen_core::progress;
use imagegen_core::{GenerateOptions, RunReport};

use super::build_pipeline;
use super::progress::spawn_printer;

pub async fn run_generate(
    cfg: &ImagegenConfig,
    slug: &str,
    force: bool,
    skip_preflight: bool,
) -> Result<()> {
    let (tx, rx) = progress::channel();
    let printer = spawn_printer(rx);
    let pipeline = build_pipeline(cfg).with_progress(tx);

    let opts = GenerateOptions {
        force,
        skip_preflight,
    };
    let outcome = pipeline.generate(slug, opts).await;
    // Closes the channel so the printer drains and exits.
    drop(pipeline);
    let _ = printer.await;

    let report = outcome?;
    print_summary(&report);
    if report.results.is_empty() {
        bail!("no images available for {}", slug);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!(
        "{}: {} of {} image(s) available ({} generated, {} reused, {} failed) - status {}",
        report.slug,
        report.results.len(),
        report.total,
        report.generated,
        report.reused,
        report.failed,
        report.state.status.as_str()
    );
    for w in &report.warnings {
        println!("  warning: {}", w);
    }
    if !report.state.failed.is_empty() {
        println!("  failed: {}", join(&report.state.failed));
        println!(
            "Run `imagegen generate {}` again to retry only the missing images.",
            report.slug
        );
    }
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
