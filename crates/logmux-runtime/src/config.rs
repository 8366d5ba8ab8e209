use crate::{Error, Result};
use logmux_providers::{ClaudeSource, CodexSource, LogSource};
use logmux_types::Source;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lower bound on the poll interval; a config asking for less is clamped.
pub const MIN_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
const DEFAULT_SESSION_LIMIT: usize = 400;
const DEFAULT_STATUS_MAX_ENTRIES: usize = 5_000;

/// Resolve the config directory path based on priority:
/// 1. LOGMUX_PATH environment variable (with tilde expansion)
/// 2. XDG config directory (recommended default)
/// 3. ~/.logmux (fallback for systems without XDG)
pub fn resolve_config_dir() -> Result<PathBuf> {
    if let Ok(env_path) = std::env::var("LOGMUX_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("logmux"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".logmux"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub enabled: bool,
    /// Log roots to scan; empty means the source's well-known defaults.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            enabled: true,
            roots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_status_max_entries")]
    pub max_entries: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            max_entries: DEFAULT_STATUS_MAX_ENTRIES,
        }
    }
}

fn default_status_max_entries() -> usize {
    DEFAULT_STATUS_MAX_ENTRIES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_session_limit")]
    pub session_limit: usize,
    #[serde(default)]
    pub claude: SourceConfig,
    #[serde(default)]
    pub codex: SourceConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            session_limit: DEFAULT_SESSION_LIMIT,
            claude: SourceConfig::default(),
            codex: SourceConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_session_limit() -> usize {
    DEFAULT_SESSION_LIMIT
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_config_dir()?.join("config.toml"))
    }

    pub fn effective_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)
    }

    fn source_config(&self, source: Source) -> &SourceConfig {
        match source {
            Source::Claude => &self.claude,
            Source::Codex => &self.codex,
        }
    }

    pub fn roots_for(&self, source: Source) -> Vec<PathBuf> {
        let config = self.source_config(source);
        if !config.roots.is_empty() {
            return config.roots.clone();
        }
        match source {
            Source::Claude => ClaudeSource::default_roots(),
            Source::Codex => CodexSource::default_roots(),
        }
    }

    /// Instantiate the enabled ingestion backends described by this config.
    pub fn build_sources(&self) -> Vec<Box<dyn LogSource>> {
        let mut sources: Vec<Box<dyn LogSource>> = Vec::new();
        if self.claude.enabled {
            sources.push(Box::new(ClaudeSource::new(self.roots_for(Source::Claude))));
        }
        if self.codex.enabled {
            sources.push(Box::new(CodexSource::new(self.roots_for(Source::Codex))));
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 3_000);
        assert_eq!(config.session_limit, 400);
        assert!(config.claude.enabled);
        assert!(config.codex.enabled);
        assert_eq!(config.status.max_entries, 5_000);
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = Config {
            poll_interval_ms: 50,
            ..Config::default()
        };
        assert_eq!(config.effective_poll_interval_ms(), 200);
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.codex.enabled = false;
        config.claude.roots = vec![PathBuf::from("/test/claude")];

        config.save_to(&config_path)?;
        assert!(config_path.exists());

        let loaded = Config::load_from(&config_path)?;
        assert!(!loaded.codex.enabled);
        assert_eq!(loaded.claude.roots, vec![PathBuf::from("/test/claude")]);

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path)?;
        assert_eq!(config.session_limit, 400);

        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "poll_interval_ms = 1000\n")?;

        let config = Config::load_from(&config_path)?;
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.session_limit, 400);
        assert!(config.claude.enabled);

        Ok(())
    }

    #[test]
    fn test_explicit_roots_win() {
        let mut config = Config::default();
        config.codex.roots = vec![PathBuf::from("/srv/codex-logs")];
        assert_eq!(
            config.roots_for(Source::Codex),
            vec![PathBuf::from("/srv/codex-logs")]
        );
    }
}
