//! Build the final result list once every admitted job has settled.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::executor::JobOutcome;
use crate::job::{CanonicalImageJob, ImageResult};

/// Union of freshly generated images and manifest jobs whose output file
/// already existed before this run, in manifest order.
///
/// Failed jobs with no earlier file are absent; callers compare the length
/// with the manifest total (or read `GenerationState::failed`).
pub fn aggregate(
    jobs: &[CanonicalImageJob],
    outcomes: &[JobOutcome],
    pre_existing: &HashSet<String>,
    output_dir: &Path,
) -> Vec<ImageResult> {
    let mut generated: HashMap<&str, &ImageResult> = outcomes
        .iter()
        .filter_map(|o| match o {
            JobOutcome::Generated { result, .. } => Some((result.filename.as_str(), result)),
            JobOutcome::Failed { .. } => None,
        })
        .collect();

    jobs.iter()
        .filter_map(|job| {
            if let Some(result) = generated.remove(job.filename.as_str()) {
                return Some(result.clone());
            }
            pre_existing
                .contains(&job.filename)
                .then(|| ImageResult::for_job(job, output_dir.join(&job.filename)))
        })
        .collect()
}

/// Filenames of `jobs` whose output file is on disk right now.
pub fn existing_outputs(jobs: &[CanonicalImageJob], output_dir: &Path) -> HashSet<String> {
    jobs.iter()
        .filter(|j| output_dir.join(&j.filename).is_file())
        .map(|j| j.filename.clone())
        .collect()
}
