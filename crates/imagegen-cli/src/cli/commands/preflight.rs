//! `imagegen preflight` – credential and credit check only.

use anyhow::{anyhow, Result};
use imagegen_core::config::ImagegenConfig;

use super::build_pipeline;

pub async fn run_preflight(cfg: &ImagegenConfig, slug: &str) -> Result<()> {
    let pipeline = build_pipeline(cfg);
    let result = pipeline.preflight(slug).await?;

    if let Some(cost) = result.estimated_cost {
        println!("estimated cost: {:.4}", cost);
    }
    match result.credits_remaining {
        Some(c) => println!("credits remaining: {:.4}", c),
        None => println!("credits remaining: unknown"),
    }
    if let Some(w) = &result.warning {
        println!("warning: {}", w);
    }
    if let Some(err) = result.to_error() {
        return Err(anyhow!(err).context(format!("preflight failed for {}", slug)));
    }
    println!("preflight OK");
    Ok(())
}
