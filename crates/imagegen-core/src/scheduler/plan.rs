//! Split the job list into work to run and work already done.

use std::path::Path;

use crate::job::CanonicalImageJob;
use crate::state::GenerationState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Jobs to dispatch, in manifest order.
    pub pending: Vec<CanonicalImageJob>,
    /// Jobs whose output is recorded complete and present on disk.
    pub skipped: Vec<CanonicalImageJob>,
}

/// A job is skipped only when its filename is in `state.completed` and the
/// file still exists. `force` runs everything.
pub fn plan(
    jobs: Vec<CanonicalImageJob>,
    state: Option<&GenerationState>,
    output_dir: &Path,
    force: bool,
) -> Plan {
    let mut out = Plan::default();
    for job in jobs {
        let done = !force
            && state.map_or(false, |s| s.completed.contains(&job.filename))
            && output_dir.join(&job.filename).is_file();
        if done {
            out.skipped.push(job);
        } else {
            out.pending.push(job);
        }
    }
    out
}
