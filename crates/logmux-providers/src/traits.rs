//! The seam between source-specific ingestion and the source-agnostic
//! index/sync layers.

use logmux_types::{ConversationBlock, LogFileInfo, SessionIndexEntry, Source};
use serde::Serialize;
use std::path::Path;

/// Recent turns of one session, newest first. `maybe_more` is set when the
/// bounded tail window did not cover the whole file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSlice {
    pub blocks: Vec<ConversationBlock>,
    pub maybe_more: bool,
}

/// Successful Time Machine fork.
#[derive(Debug, Clone, Serialize)]
pub struct ForkOutcome {
    pub source: Source,
    pub session_id: String,
    /// Shell command that resumes the forked session in the owning CLI.
    pub command: String,
    pub file_path: std::path::PathBuf,
}

/// Diagnostic counters attached to a fork failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForkDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_source_id: Option<String>,
    pub total_lines: usize,
    pub parsed_entries: usize,
    pub user_entries: usize,
    pub matched_id_entry: bool,
    pub matched_id_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

/// Structured, non-throwing fork failure. Nothing propagates past the fork
/// boundary; partially written output has already been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ForkFailure {
    pub error: String,
    pub detail: ForkDetail,
}

impl ForkFailure {
    pub fn new(error: impl Into<String>) -> Self {
        ForkFailure {
            error: error.into(),
            detail: ForkDetail::default(),
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: ForkDetail) -> Self {
        ForkFailure {
            error: error.into(),
            detail,
        }
    }
}

pub type ForkResult = std::result::Result<ForkOutcome, ForkFailure>;

/// One ingestion backend. Implementations own their caches and root lists;
/// all methods degrade to empty results on transient I/O trouble.
pub trait LogSource: Send {
    fn source(&self) -> Source;

    /// Enumerate sessions, newest file first, one entry per unique session
    /// id (the newest file wins when a session spans files). `refresh`
    /// bypasses the TTL cache.
    fn list_session_index(&mut self, refresh: bool) -> Vec<SessionIndexEntry>;

    /// Cheapest latest-turn summary for one session, via the
    /// doubling-window tail read. `None` when the file yields no block.
    fn build_summary(&self, entry: &SessionIndexEntry) -> Option<ConversationBlock>;

    /// Recent turns for one session, newest first.
    fn load_session(
        &self,
        session_id: &str,
        source_path: Option<&Path>,
        max_blocks: usize,
    ) -> SessionSlice;

    /// The full file set a keyword search walks, newest mtime first;
    /// cached per source with `refresh` forced on cursor restart.
    fn search_files(&mut self, refresh: bool) -> Vec<LogFileInfo>;

    /// Normalize every turn in one file (full streaming read) for search
    /// scoring.
    fn scan_file(&self, file: &LogFileInfo) -> Vec<ConversationBlock>;

    /// Fork the session behind `block` at that turn into a new resumable
    /// file.
    fn fork(&self, block: &ConversationBlock) -> ForkResult;
}
