//! `imagegen status` – show the persisted generation state.

use anyhow::Result;
use imagegen_core::config::ImagegenConfig;
use imagegen_core::state::StateStore;

pub fn run_status(cfg: &ImagegenConfig, slug: &str) -> Result<()> {
    let output_dir = cfg.settings().output_dir(slug);
    let Some(state) = StateStore::load(&output_dir)? else {
        println!("No generation state for {} (looked in {}).", slug, output_dir.display());
        return Ok(());
    };

    println!(
        "{:<10} {:<9} {:<9} {:<9}",
        "SLUG", "STATUS", "DONE", "FAILED"
    );
    println!(
        "{:<10} {:<9} {:<9} {:<9}",
        state.slug,
        state.status.as_str(),
        format!("{}/{}", state.completed.len(), state.total),
        state.failed.len()
    );
    for f in &state.failed {
        println!("  failed: {}", f);
    }
    Ok(())
}
