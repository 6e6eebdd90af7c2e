//! Manifest validation for `imagegen validate` and the start of `generate`.
//!
//! `errors` are structural and stop a run before anything happens.
//! `entry_errors` are isolated to one job: `generate` records that job as failed
//! and carries on, while `validate` still reports them as a failure.

use std::collections::HashMap;

use super::normalize::{normalize, parse_dimensions};
use super::schema::ImageSpec;
use super::Manifest;
use crate::state::is_reserved_name;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub slug: String,
    pub total: usize,
    pub valid_jobs: usize,
    pub errors: Vec<String>,
    pub entry_errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// No structural errors: a run can start.
    pub fn is_runnable(&self) -> bool {
        self.errors.is_empty()
    }

    /// Nothing wrong at all.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.entry_errors.is_empty()
    }
}

pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let normalized = normalize(manifest);
    let mut report = ValidationReport {
        slug: manifest.slug.clone(),
        total: manifest.total(),
        valid_jobs: normalized.jobs.len(),
        ..ValidationReport::default()
    };

    if manifest.slug.trim().is_empty() {
        report.errors.push("slug is empty".to_string());
    }
    if manifest.hero.is_none() {
        report.errors.push("manifest has no hero image".to_string());
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let filenames = normalized
        .jobs
        .iter()
        .map(|j| (j.index, j.filename.as_str()))
        .chain(normalized.rejected.iter().map(|r| (r.index, r.filename.as_str())));
    for (index, filename) in filenames {
        if let Some(first) = seen.insert(filename, index) {
            report.errors.push(format!(
                "duplicate filename {} (entries {} and {})",
                filename,
                first.min(index),
                first.max(index)
            ));
        }
        if filename.contains('/') || filename.contains('\\') || filename == ".." {
            report
                .errors
                .push(format!("filename {} must not contain a path", filename));
        }
        if is_reserved_name(filename) {
            report
                .errors
                .push(format!("filename {} is reserved for generation state", filename));
        }
    }

    for rejected in &normalized.rejected {
        report.entry_errors.push(rejected.reason.clone());
    }

    for (index, _, spec) in manifest.entries() {
        report.warnings.extend(dimension_warnings(index, spec));
    }
    report
        .warnings
        .extend(normalized.warnings.iter().map(ToString::to_string));

    report
}

fn dimension_warnings(index: usize, spec: &ImageSpec) -> Vec<String> {
    let (width, height, dimensions) = match spec {
        ImageSpec::Simple(s) => (s.width, s.height, s.dimensions.as_deref()),
        ImageSpec::Enhanced(e) => match &e.technical {
            Some(t) => (t.width, t.height, t.dimensions.as_deref()),
            None => (None, None, None),
        },
    };
    let mut out = Vec::new();
    if width == Some(0) || height == Some(0) {
        out.push(format!("entry {}: zero width/height ignored", index));
    } else if width.is_some() != height.is_some() {
        out.push(format!("entry {}: width and height must be given together", index));
    }
    if let Some(d) = dimensions {
        if parse_dimensions(d).is_none() {
            out.push(format!("entry {}: unparseable dimensions {:?}", index, d));
        }
    }
    out
}
