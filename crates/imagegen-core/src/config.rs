use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::provider::Modality;
use crate::retry::RetryPolicy;

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "IMAGEGEN_API_KEY";

/// File name of the manifest inside `{manifest_root}/{slug}/`.
pub const MANIFEST_FILE_NAME: &str = "images.json";

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per job (including the first).
    pub max_attempts: u32,
    /// Fixed delay in seconds between attempts (e.g. 2.0).
    pub delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            delay: Duration::from_secs_f64(self.delay_secs.max(0.0)),
        }
    }
}

/// Which synthesis backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Http,
    /// Offline provider that writes placeholder PNGs; for dry runs.
    Mock,
}

/// Synthesis provider settings (`[provider]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL of the API; `/chat/completions` and `/credits` are appended.
    pub api_url: String,
    /// Model identifier sent with every synthesis request.
    pub model: String,
    /// Output modalities requested with each synthesis call.
    #[serde(default)]
    pub modality: Modality,
    /// API credential. `IMAGEGEN_API_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional whole-request timeout for synthesis calls. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Http,
            api_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-flash-image".to_string(),
            modality: Modality::ImageAndText,
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

/// Global configuration loaded from `~/.config/imagegen/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagegenConfig {
    /// Maximum number of synthesis calls in flight at once.
    pub concurrency: usize,
    /// Directory holding `{slug}/images.json` manifests.
    pub manifest_root: PathBuf,
    /// Directory under which `{slug}/` output directories are created.
    pub output_root: PathBuf,
    /// Flat per-image rate used by the preflight cost estimate.
    pub cost_per_image: f64,
    /// Upper bound on the best-effort credits query.
    pub preflight_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for ImagegenConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            manifest_root: PathBuf::from("content"),
            output_root: PathBuf::from("images"),
            cost_per_image: 0.04,
            preflight_timeout_secs: 10,
            retry: None,
            provider: ProviderConfig::default(),
        }
    }
}

impl ImagegenConfig {
    /// Replace the file credential with `IMAGEGEN_API_KEY` when it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.provider.api_key = Some(key);
            }
        }
    }

    /// Runtime settings handed to the pipeline.
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            api_key: self
                .provider
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            concurrency: self.concurrency.max(1),
            retry: self.retry.clone().unwrap_or_default().to_policy(),
            manifest_root: self.manifest_root.clone(),
            output_root: self.output_root.clone(),
            cost_per_image: self.cost_per_image,
            preflight_timeout: Duration::from_secs(self.preflight_timeout_secs),
        }
    }
}

/// Explicit configuration value consumed by the pipeline. Built once by the CLI.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub api_key: Option<String>,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub manifest_root: PathBuf,
    pub output_root: PathBuf,
    pub cost_per_image: f64,
    pub preflight_timeout: Duration,
}

impl PipelineSettings {
    /// `{manifest_root}/{slug}/images.json`
    pub fn manifest_path(&self, slug: &str) -> PathBuf {
        self.manifest_root.join(slug).join(MANIFEST_FILE_NAME)
    }

    /// `{output_root}/{slug}`
    pub fn output_dir(&self, slug: &str) -> PathBuf {
        self.output_root.join(slug)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imagegen")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overrides are applied to the returned value only.
pub fn load_or_init() -> Result<ImagegenConfig> {
    let path = config_path()?;
    let mut cfg = load_or_init_at(&path)?;
    cfg.apply_env_overrides();
    Ok(cfg)
}

/// Same as `load_or_init` but at an explicit path and without env overrides.
pub fn load_or_init_at(path: &Path) -> Result<ImagegenConfig> {
    if !path.exists() {
        let default_cfg = ImagegenConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: ImagegenConfig = toml::from_str(&data)?;
    Ok(cfg)
}
