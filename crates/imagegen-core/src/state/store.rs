//! Persist `GenerationState` to `{output_dir}/.generation-state.json`.
//!
//! Every record call rewrites the whole file (temp file + rename), so a crash
//! at any point leaves the last consistent state on disk. Single writer only.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PipelineError;

use super::GenerationState;

pub const STATE_FILE_NAME: &str = ".generation-state.json";
/// Temp sibling written before the rename over `STATE_FILE_NAME`.
pub const STATE_TMP_FILE_NAME: &str = ".generation-state.json.tmp";

/// Whether an output filename would collide with the state file or its temp sibling.
pub fn is_reserved_name(filename: &str) -> bool {
    filename == STATE_FILE_NAME || filename == STATE_TMP_FILE_NAME
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Shared, write-through handle on one output directory's state.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: Mutex<GenerationState>,
}

impl StateStore {
    /// Path of the state file for an output directory.
    pub fn state_path(output_dir: &Path) -> PathBuf {
        output_dir.join(STATE_FILE_NAME)
    }

    /// Load persisted state. Missing file is `Ok(None)`; unreadable or corrupt is `Err`.
    pub fn load(output_dir: &Path) -> Result<Option<GenerationState>, PipelineError> {
        let path = Self::state_path(output_dir);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PipelineError::State {
                    path,
                    message: e.to_string(),
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| PipelineError::State {
                path,
                message: format!("parse: {}", e),
            })
    }

    /// Start a run. Keeps the completed/failed sets of `previous` (resume) and
    /// writes the `running` state immediately.
    pub fn begin(
        output_dir: &Path,
        slug: &str,
        total: usize,
        previous: Option<GenerationState>,
    ) -> Result<Self, PipelineError> {
        let mut state = GenerationState::new(slug, total, now_unix());
        if let Some(prev) = previous {
            state.completed = prev.completed;
            state.failed = prev.failed;
        }
        let store = Self {
            path: Self::state_path(output_dir),
            state: Mutex::new(state),
        };
        store.persist(&store.lock())?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the in-memory state.
    pub fn snapshot(&self) -> GenerationState {
        self.lock().clone()
    }

    pub fn is_completed(&self, filename: &str) -> bool {
        self.lock().completed.contains(filename)
    }

    /// Mark `filename` done and rewrite the file. Idempotent.
    ///
    /// The in-memory state is updated even when the write fails, so the next
    /// successful write (at the latest `finalize`) still records it. If that
    /// write fails too, `finalize` returns the error.
    pub fn record_success(&self, filename: &str) -> Result<(), PipelineError> {
        let mut state = self.lock();
        state.mark_completed(filename);
        self.persist(&state)
    }

    /// Mark `filename` failed and rewrite the file.
    pub fn record_failure(&self, filename: &str) -> Result<(), PipelineError> {
        let mut state = self.lock();
        state.mark_failed(filename);
        self.persist(&state)
    }

    /// Compute the terminal status, stamp `completed_at` and write the final file.
    pub fn finalize(&self) -> Result<GenerationState, PipelineError> {
        let mut state = self.lock();
        state.status = state.computed_status();
        state.completed_at = Some(now_unix());
        self.persist(&state)?;
        Ok(state.clone())
    }

    /// Write while holding the lock so concurrent records cannot interleave.
    fn persist(&self, state: &GenerationState) -> Result<(), PipelineError> {
        let err = |message: String| PipelineError::State {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| err(format!("create dir {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_vec_pretty(state).map_err(|e| err(format!("serialize: {}", e)))?;
        let tmp = self.path.with_file_name(STATE_TMP_FILE_NAME);
        std::fs::write(&tmp, json).map_err(|e| err(format!("write: {}", e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| err(format!("rename: {}", e)))?;
        Ok(())
    }
}
