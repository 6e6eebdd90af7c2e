//! Resumable generation state, one side file per output directory.
//!
//! The file records which output files are done and which failed so a later
//! invocation only retries what is missing.

mod store;

pub use store::{is_reserved_name, StateStore, STATE_FILE_NAME, STATE_TMP_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Overall run status. Recomputed only at finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Running,
    Complete,
    Partial,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Running => "running",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Partial => "partial",
            GenerationStatus::Failed => "failed",
        }
    }
}

/// Persisted per-slug generation state.
///
/// `completed` and `failed` are always disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub slug: String,
    /// Unix seconds when the current run started.
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    pub total: usize,
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub failed: BTreeSet<String>,
    pub status: GenerationStatus,
}

impl GenerationState {
    pub fn new(slug: &str, total: usize, started_at: i64) -> Self {
        Self {
            slug: slug.to_string(),
            started_at,
            completed_at: None,
            total,
            completed: BTreeSet::new(),
            failed: BTreeSet::new(),
            status: GenerationStatus::Running,
        }
    }

    /// Status implied by the current sets.
    pub fn computed_status(&self) -> GenerationStatus {
        match (self.completed.is_empty(), self.failed.is_empty()) {
            (_, true) => GenerationStatus::Complete,
            (true, false) => GenerationStatus::Failed,
            (false, false) => GenerationStatus::Partial,
        }
    }

    /// Idempotent; clears any stale failure for the same file.
    pub fn mark_completed(&mut self, filename: &str) {
        self.failed.remove(filename);
        self.completed.insert(filename.to_string());
    }

    /// Clears any earlier success for the same file (its output is gone or stale).
    pub fn mark_failed(&mut self, filename: &str) {
        self.completed.remove(filename);
        self.failed.insert(filename.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_clears_failure_and_is_idempotent() {
        let mut s = GenerationState::new("x", 2, 0);
        s.mark_failed("a.png");
        s.mark_completed("a.png");
        s.mark_completed("a.png");
        assert_eq!(s.completed.len(), 1);
        assert!(s.failed.is_empty());
    }

    #[test]
    fn failure_clears_success() {
        let mut s = GenerationState::new("x", 1, 0);
        s.mark_completed("a.png");
        s.mark_failed("a.png");
        assert!(s.completed.is_empty());
        assert!(s.failed.contains("a.png"));
    }

    #[test]
    fn computed_status_table() {
        let mut s = GenerationState::new("x", 2, 0);
        assert_eq!(s.computed_status(), GenerationStatus::Complete);
        s.mark_failed("b.png");
        assert_eq!(s.computed_status(), GenerationStatus::Failed);
        s.mark_completed("a.png");
        assert_eq!(s.computed_status(), GenerationStatus::Partial);
        s.mark_completed("b.png");
        assert_eq!(s.computed_status(), GenerationStatus::Complete);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut s = GenerationState::new("x", 1, 42);
        s.mark_completed("x-hero.png");
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["startedAt"], 42);
        assert_eq!(json["status"], "running");
        assert_eq!(json["completed"][0], "x-hero.png");
        assert!(json.get("completedAt").is_none());
    }
}
