pub mod fork;
pub mod init;
pub mod search;
pub mod sessions;
pub mod show;
pub mod watch;

use anyhow::{Context, Result};
use logmux_index::Repository;
use logmux_runtime::Config;
use std::path::PathBuf;

pub fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    match explicit {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load().context("failed to load config"),
    }
}

pub fn open_repository(config: &Config) -> Result<Repository> {
    let sources = config.build_sources();
    if sources.is_empty() {
        anyhow::bail!("no sources enabled; check the config file");
    }
    Ok(Repository::new(sources))
}
