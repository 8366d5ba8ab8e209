//! Wire shapes for the sync and status push feeds.
//!
//! These are serialized as-is across the subscriber boundary, so field
//! names carry a `version` and must not change without bumping it.

use logmux_index::FileStats;
use logmux_types::{now_ms, ConversationBlock, Source, StatusEntry};
use serde::Serialize;

pub const FEED_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// First successful poll for a source after startup.
    Bootstrap,
    Incremental,
}

/// Per-source change signature carried on every delta and snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SourceMeta {
    pub file_count: usize,
    pub latest_mtime: i64,
    pub latest_size: u64,
    pub signature: String,
}

impl From<FileStats> for SourceMeta {
    fn from(stats: FileStats) -> Self {
        SourceMeta {
            file_count: stats.file_count,
            latest_mtime: stats.latest_mtime,
            latest_size: stats.latest_size,
            signature: stats.signature(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    Delta {
        version: u32,
        generated_at: i64,
        source: Source,
        added: Vec<ConversationBlock>,
        updated: Vec<ConversationBlock>,
        meta: SourceMeta,
        phase: SyncPhase,
    },
    /// Session keys whose files disappeared from the index.
    Invalidate { keys: Vec<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub generated_at: i64,
    pub source: Source,
    pub sessions: Vec<ConversationBlock>,
    pub meta: SourceMeta,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    Update {
        version: u32,
        entries: Vec<StatusEntry>,
        removed: Vec<String>,
    },
}

impl StatusEvent {
    pub fn update(entries: Vec<StatusEntry>, removed: Vec<String>) -> Self {
        StatusEvent::Update {
            version: FEED_VERSION,
            entries,
            removed,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StatusEvent::Update {
                entries, removed, ..
            } => entries.is_empty() && removed.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub version: u32,
    pub generated_at: i64,
    pub entries: Vec<StatusEntry>,
}

impl StatusSnapshot {
    pub fn new(entries: Vec<StatusEntry>) -> Self {
        StatusSnapshot {
            version: FEED_VERSION,
            generated_at: now_ms(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_event_serializes_with_tag_and_phase() {
        let event = SyncEvent::Delta {
            version: FEED_VERSION,
            generated_at: 1_700_000_000_000,
            source: Source::Claude,
            added: Vec::new(),
            updated: Vec::new(),
            meta: FileStats::default().into(),
            phase: SyncPhase::Bootstrap,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "delta");
        assert_eq!(json["phase"], "bootstrap");
        assert_eq!(json["source"], "claude");
        assert_eq!(json["meta"]["signature"], "0:0:0");
    }

    #[test]
    fn invalidate_event_carries_keys() {
        let event = SyncEvent::Invalidate {
            keys: vec!["codex:abc".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "invalidate");
        assert_eq!(json["keys"][0], "codex:abc");
    }

    #[test]
    fn empty_status_update_is_detectable() {
        assert!(StatusEvent::update(Vec::new(), Vec::new()).is_empty());
        assert!(!StatusEvent::update(Vec::new(), vec!["claude:x".into()]).is_empty());
    }
}
