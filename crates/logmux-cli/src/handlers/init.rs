use anyhow::{Context, Result};
use logmux_runtime::Config;
use std::path::PathBuf;

pub fn handle(explicit: Option<&PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => Config::default_path().context("failed to resolve config path")?,
    };

    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    Config::default()
        .save_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
