//! CLI command handlers, one file per command.

mod generate;
mod preflight;
mod progress;
mod status;
mod validate;

pub use generate::run_generate;
pub use preflight::run_preflight;
pub use status::run_status;
pub use validate::run_validate;

use imagegen_core::config::ImagegenConfig;
use imagegen_core::provider::create_provider;
use imagegen_core::Pipeline;

/// Pipeline wired to the configured provider.
fn build_pipeline(cfg: &ImagegenConfig) -> Pipeline {
    let settings = cfg.settings();
    let provider = create_provider(
        &cfg.provider,
        settings.api_key.as_deref(),
        settings.preflight_timeout,
    );
    tracing::debug!(provider = provider.name(), concurrency = settings.concurrency, "pipeline");
    Pipeline::new(settings, provider)
}
