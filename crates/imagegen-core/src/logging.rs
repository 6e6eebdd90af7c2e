//! Tracing setup for the `imagegen` binary.
//!
//! Runs append to `$XDG_STATE_HOME/imagegen/imagegen.log` so per-job retry and
//! failure lines survive after the terminal summary is gone. `IMAGEGEN_LOG`
//! takes an `EnvFilter` directive; `RUST_LOG` is honoured when it is unset.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "IMAGEGEN_LOG";
pub const LOG_FILE_NAME: &str = "imagegen.log";

const DEFAULT_FILTER: &str = "info,imagegen=debug,imagegen_core=debug";

/// `{state_home}/imagegen/imagegen.log`
pub fn log_path_in(state_home: &Path) -> PathBuf {
    state_home.join("imagegen").join(LOG_FILE_NAME)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Log to the state-dir file. Returns the file path.
///
/// Errors when the directory or file cannot be opened or a subscriber is
/// already installed; the CLI then calls `init_logging_stderr`.
pub fn init_logging() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imagegen")?;
    let path = log_path_in(&xdg_dirs.get_state_home());
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "imagegen logging started");
    Ok(path)
}

/// Stderr-only logging for when the log file is unavailable.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
