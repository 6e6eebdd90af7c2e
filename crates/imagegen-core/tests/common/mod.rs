//! Shared fixtures for integration tests.
#![allow(dead_code)]

pub mod api_server;

use std::path::{Path, PathBuf};
use std::time::Duration;

use imagegen_core::config::PipelineSettings;
use imagegen_core::retry::RetryPolicy;
use imagegen_core::state::STATE_FILE_NAME;
use serde_json::json;
use tempfile::TempDir;

/// Temp workspace with `content/` and `images/` roots and test settings.
pub struct Fixture {
    pub dir: TempDir,
    pub settings: PipelineSettings,
}

impl Fixture {
    pub fn new(concurrency: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = PipelineSettings {
            api_key: Some("test-key".to_string()),
            concurrency,
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
            manifest_root: dir.path().join("content"),
            output_root: dir.path().join("images"),
            cost_per_image: 0.04,
            preflight_timeout: Duration::from_secs(2),
        };
        Self { dir, settings }
    }

    pub fn write_manifest(&self, slug: &str, manifest: &serde_json::Value) -> PathBuf {
        let path = self.settings.manifest_path(slug);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_vec_pretty(manifest).unwrap()).unwrap();
        path
    }

    pub fn output_dir(&self, slug: &str) -> PathBuf {
        self.settings.output_dir(slug)
    }

    pub fn state_path(&self, slug: &str) -> PathBuf {
        self.output_dir(slug).join(STATE_FILE_NAME)
    }
}

/// `{slug:"x", hero:{x-hero.png, "a cat"}, sections:[{x-1.png, "a dog"}]}`
pub fn scenario_manifest() -> serde_json::Value {
    json!({
        "slug": "x",
        "hero": { "filename": "x-hero.png", "prompt": "a cat" },
        "sections": [{ "filename": "x-1.png", "prompt": "a dog" }]
    })
}

/// Hero plus `sections` section entries named `x-1.png..`.
pub fn manifest_with_sections(sections: usize) -> serde_json::Value {
    let sections: Vec<_> = (1..=sections)
        .map(|i| json!({ "filename": format!("x-{}.png", i), "prompt": format!("scene {}", i) }))
        .collect();
    json!({
        "slug": "x",
        "hero": { "filename": "x-hero.png", "prompt": "a cat", "alt": "a cat" },
        "sections": sections
    })
}

pub fn exists(dir: &Path, name: &str) -> bool {
    dir.join(name).is_file()
}
