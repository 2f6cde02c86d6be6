//! Show or write the effective configuration.

use std::path::Path;

use framebatch_common::config::AppConfig;

pub fn run(config: &AppConfig, path: &Path, write: bool) -> anyhow::Result<()> {
    println!("Config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if write {
        config.save_to(path)?;
        println!("\nWritten to {}", path.display());
    }

    Ok(())
}
