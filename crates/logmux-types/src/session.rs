use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::block::{ConversationBlock, Source};

/// Snapshot of a physical log file taken at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileInfo {
    pub path: PathBuf,
    pub mtime_ms: i64,
    pub size_bytes: u64,
}

/// One session resolved to the newest file that contains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    pub source: Source,
    pub session_id: String,
    pub file: LogFileInfo,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

impl SessionIndexEntry {
    pub fn session_key(&self) -> String {
        session_key(self.source, &self.session_id)
    }
}

/// `"{source}:{session_id}"`, the key used across the sync and status feeds.
pub fn session_key(source: Source, session_id: &str) -> String {
    format!("{}:{}", source.as_str(), session_id.trim())
}

/// Split a session key back into its parts. The id may itself contain colons.
pub fn split_session_key(key: &str) -> (Option<Source>, String) {
    match key.split_once(':') {
        Some((src, id)) => (src.parse().ok(), id.to_string()),
        None => (None, key.to_string()),
    }
}

/// Ordering for merged session listings: latest activity first, then
/// creation time, then id for a stable tiebreak.
pub fn compare_summaries(a: &ConversationBlock, b: &ConversationBlock) -> Ordering {
    b.activity_at()
        .cmp(&a.activity_at())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.session_id.cmp(&b.session_id))
}

/// Change-detection fingerprint for a session summary. Two summaries with
/// the same fingerprint need no delta.
pub fn session_fingerprint(block: &ConversationBlock) -> String {
    [
        block.last_output_at.to_string(),
        block.created_at.to_string(),
        crate::block::head_chars(&block.input, 200),
        block.output_tail.clone(),
        block.cwd.clone().unwrap_or_default(),
        block.source_path.clone().unwrap_or_default(),
    ]
    .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(session_id: &str, created: i64, last: i64) -> ConversationBlock {
        ConversationBlock::assemble(
            Source::Claude,
            None,
            session_id.into(),
            "in".into(),
            "out".into(),
            created,
            last,
        )
        .unwrap()
    }

    #[test]
    fn key_round_trip() {
        let key = session_key(Source::Codex, "abc:def");
        assert_eq!(key, "codex:abc:def");
        let (source, id) = split_session_key(&key);
        assert_eq!(source, Some(Source::Codex));
        assert_eq!(id, "abc:def");
    }

    #[test]
    fn ordering_prefers_latest_activity() {
        let older = block("a", 100, 200);
        let newer = block("b", 50, 300);
        assert_eq!(compare_summaries(&newer, &older), Ordering::Less);
    }

    #[test]
    fn ordering_ties_break_on_id() {
        let a = block("a", 100, 200);
        let b = block("b", 100, 200);
        assert_eq!(compare_summaries(&a, &b), Ordering::Less);
    }

    #[test]
    fn fingerprint_tracks_output_change() {
        let a = block("a", 100, 200);
        let mut b = a.clone();
        assert_eq!(session_fingerprint(&a), session_fingerprint(&b));
        b.last_output_at = 300;
        assert_ne!(session_fingerprint(&a), session_fingerprint(&b));
    }
}
