//! CLI for the imagegen pipeline.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imagegen_core::config;
use std::path::PathBuf;

use commands::{run_generate, run_preflight, run_status, run_validate};

/// Top-level CLI for imagegen.
#[derive(Debug, Parser)]
#[command(name = "imagegen")]
#[command(about = "imagegen: resumable batch image generation from content manifests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Generate the images listed in `{manifest_root}/<SLUG>/images.json`.
    Generate {
        /// Manifest slug.
        slug: String,
        /// Regenerate every image, even those already on disk.
        #[arg(long)]
        force: bool,
        /// Skip the credential and credit check.
        #[arg(long)]
        skip_preflight: bool,
        /// Override the configured number of concurrent requests.
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Check a manifest file without generating anything.
    Validate {
        /// Path to an images.json manifest.
        manifest_path: PathBuf,
    },

    /// Run only the credential and credit check for a slug.
    Preflight {
        /// Manifest slug.
        slug: String,
    },

    /// Show the persisted generation state for a slug.
    Status {
        /// Manifest slug.
        slug: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Generate {
                slug,
                force,
                skip_preflight,
                concurrency,
            } => {
                if let Some(n) = concurrency {
                    cfg.concurrency = n;
                }
                run_generate(&cfg, &slug, force, skip_preflight).await?
            }
            CliCommand::Validate { manifest_path } => run_validate(&manifest_path)?,
            CliCommand::Preflight { slug } => run_preflight(&cfg, &slug).await?,
            CliCommand::Status { slug } => run_status(&cfg, &slug)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
