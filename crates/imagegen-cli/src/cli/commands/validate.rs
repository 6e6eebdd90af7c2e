//! `imagegen validate` – check a manifest file.

use anyhow::{bail, Result};
use imagegen_core::manifest::{validate_manifest, Manifest};
use std::path::Path;

pub fn run_validate(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let report = validate_manifest(&manifest);

    println!(
        "{}: {} image(s), {} valid",
        report.slug, report.total, report.valid_jobs
    );
    for e in report.errors.iter().chain(&report.entry_errors) {
        println!("  error: {}", e);
    }
    for w in &report.warnings {
        println!("  warning: {}", w);
    }
    if !report.is_clean() {
        bail!(
            "{} has {} error(s)",
            path.display(),
            report.errors.len() + report.entry_errors.len()
        );
    }
    println!("OK");
    Ok(())
}
