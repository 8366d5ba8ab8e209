//! Isolated on-disk log trees for integration tests.

use anyhow::Result;
use filetime::FileTime;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::builders::{ClaudeSessionBuilder, CodexSessionBuilder};

/// A temp home directory holding a claude project store and a codex
/// sessions tree, laid out the way the real CLIs write them.
pub struct TestWorld {
    temp_dir: TempDir,
    claude_root: PathBuf,
    codex_root: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();
        let claude_root = base.join(".claude");
        let codex_root = base.join(".codex/sessions");
        std::fs::create_dir_all(claude_root.join("projects")).expect("Failed to create claude root");
        std::fs::create_dir_all(&codex_root).expect("Failed to create codex root");
        TestWorld {
            temp_dir,
            claude_root,
            codex_root,
        }
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn claude_root(&self) -> &Path {
        &self.claude_root
    }

    pub fn codex_root(&self) -> &Path {
        &self.codex_root
    }

    /// Project-store encoding of a workspace path.
    pub fn encode_project_dir(cwd: &str) -> String {
        let encoded: String = cwd
            .chars()
            .map(|c| match c {
                '/' | '\\' | '.' | ':' => '-',
                other => other,
            })
            .collect();
        if encoded.starts_with('-') {
            encoded
        } else {
            format!("-{}", encoded)
        }
    }

    /// Write a claude session under its encoded project directory and
    /// return the file path.
    pub fn write_claude_session(
        &self,
        builder: &ClaudeSessionBuilder,
        cwd: &str,
    ) -> Result<PathBuf> {
        let project_dir = self
            .claude_root
            .join("projects")
            .join(Self::encode_project_dir(cwd));
        std::fs::create_dir_all(&project_dir)?;
        let path = project_dir.join(format!("{}.jsonl", builder.session_id));
        std::fs::write(&path, builder.to_jsonl())?;
        Ok(path)
    }

    /// Write a codex rollout under the dated subdirectory convention and
    /// return the file path.
    pub fn write_codex_session(
        &self,
        builder: &CodexSessionBuilder,
        ts_ms: i64,
    ) -> Result<PathBuf> {
        let dated = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ts_ms)
            .unwrap_or_default()
            .format("%Y/%m/%d")
            .to_string();
        let dir = self.codex_root.join(dated);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(builder.file_name(ts_ms));
        std::fs::write(&path, builder.to_jsonl())?;
        Ok(path)
    }

    /// Pin a file's mtime, for index-ordering and change-detection tests.
    pub fn set_mtime_ms(path: &Path, mtime_ms: i64) -> Result<()> {
        let ft = FileTime::from_unix_time(mtime_ms / 1000, ((mtime_ms % 1000) * 1_000_000) as u32);
        filetime::set_file_mtime(path, ft)?;
        Ok(())
    }

    pub fn append_line(path: &Path, line: &str) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
