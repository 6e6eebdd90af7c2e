//! Canonical job and result records shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default hero dimensions (16:9).
pub const HERO_DIMENSIONS: (u32, u32) = (1200, 675);
/// Default section dimensions (3:2).
pub const SECTION_DIMENSIONS: (u32, u32) = (1200, 800);

/// Schema-independent unit of work derived from one manifest entry.
///
/// Built once per run by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalImageJob {
    /// Position in the manifest: 0 for the hero, `n + 1` for section `n`.
    pub index: usize,
    pub filename: String,
    pub prompt: String,
    pub alt_text: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    /// Appended to the request as an "avoid" fragment by the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub is_hero: bool,
}

/// One generated (or carried-over) image, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub filename: String,
    pub path: PathBuf,
    pub alt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl ImageResult {
    /// Result record for `job` with its file at `path`.
    pub fn for_job(job: &CanonicalImageJob, path: PathBuf) -> Self {
        Self {
            filename: job.filename.clone(),
            path,
            alt_text: job.alt_text.clone(),
            caption: job.caption.clone(),
            placement: job.placement.clone(),
            width: job.width,
            height: job.height,
        }
    }
}
