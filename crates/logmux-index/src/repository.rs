//! One facade over every ingestion backend: merged listings, chunked
//! keyword search, session loading, and fork dispatch.

use serde::Serialize;
use std::path::Path;

use logmux_providers::{ForkFailure, ForkResult, LogSource, SessionSlice};
use logmux_types::{
    compare_summaries, split_session_key, ConversationBlock, SessionIndexEntry, Source,
};

use crate::batch::build_summaries;
use crate::cursor::FileCursor;
use crate::score::{normalize_terms, score_text};
use crate::stats::FileStats;

/// Default page size for merged listings.
pub const DEFAULT_PAGE_LIMIT: usize = 200;
/// Default file count per search chunk.
pub const DEFAULT_SEARCH_CHUNK: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub block: ConversationBlock,
    pub score: f64,
    pub why: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SessionPage {
    pub sessions: Vec<ConversationBlock>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<usize>,
}

pub struct Repository {
    sources: Vec<Box<dyn LogSource>>,
}

impl Repository {
    pub fn new(sources: Vec<Box<dyn LogSource>>) -> Self {
        Repository { sources }
    }

    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        self.sources.iter().map(|s| s.source())
    }

    fn source_mut(&mut self, source: Source) -> Option<&mut Box<dyn LogSource>> {
        self.sources.iter_mut().find(|s| s.source() == source)
    }

    fn source_ref(&self, source: Source) -> Option<&dyn LogSource> {
        self.sources
            .iter()
            .find(|s| s.source() == source)
            .map(|s| s.as_ref())
    }

    /// Session index for one source, newest file first.
    pub fn session_index(&mut self, source: Source, refresh: bool) -> Vec<SessionIndexEntry> {
        self.source_mut(source)
            .map(|s| s.list_session_index(refresh))
            .unwrap_or_default()
    }

    /// Aggregate file statistics for one source's current index.
    pub fn index_stats(&mut self, source: Source, refresh: bool) -> FileStats {
        let entries = self.session_index(source, refresh);
        FileStats::aggregate(entries.iter().map(|e| &e.file))
    }

    /// Latest-turn summary for one index entry.
    pub fn build_summary(&self, entry: &SessionIndexEntry) -> Option<ConversationBlock> {
        self.source_ref(entry.source)?.build_summary(entry)
    }

    /// Merged listing across all sources, ordered by latest activity.
    pub fn list_sessions(&mut self, limit: usize, refresh: bool) -> SessionPage {
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
        let mut summaries: Vec<ConversationBlock> = Vec::new();
        let sources: Vec<Source> = self.sources().collect();
        for source in sources {
            let entries = self.session_index(source, refresh);
            if let Some(backend) = self.source_ref(source) {
                let (blocks, _) = build_summaries(backend, &entries, 0, limit);
                summaries.extend(blocks);
            }
        }
        summaries.sort_by(compare_summaries);
        let has_more = summaries.len() > limit;
        summaries.truncate(limit);
        SessionPage {
            sessions: summaries,
            has_more,
            next_cursor: None,
        }
    }

    /// Recent turns of one session addressed by `"{source}:{session_id}"`.
    pub fn load_session(&self, session_key: &str, max_blocks: usize) -> SessionSlice {
        let (source, session_id) = split_session_key(session_key);
        let Some(source) = source else {
            return SessionSlice::default();
        };
        let Some(backend) = self.source_ref(source) else {
            return SessionSlice::default();
        };
        backend.load_session(&session_id, None, max_blocks)
    }

    /// Keyword search across all sources. Processes at most `chunk_size`
    /// files starting at `cursor`; `next_cursor` resumes the walk and is
    /// `None` once every file in scope has been visited. A restart at
    /// cursor zero refreshes the cached file lists.
    pub fn search(&mut self, query: &str, cursor: usize, chunk_size: usize) -> SearchPage {
        let terms = normalize_terms(query);
        if terms.is_empty() {
            return SearchPage::default();
        }
        let chunk_size = if chunk_size == 0 {
            DEFAULT_SEARCH_CHUNK
        } else {
            chunk_size
        };
        let refresh = cursor == 0;
        let mut files: Vec<(Source, logmux_types::LogFileInfo)> = Vec::new();
        let sources: Vec<Source> = self.sources().collect();
        for source in sources {
            if let Some(backend) = self.source_mut(source) {
                files.extend(
                    backend
                        .search_files(refresh)
                        .into_iter()
                        .map(|f| (source, f)),
                );
            }
        }
        // Stable scope order keeps cursors meaningful across calls.
        files.sort_by(|a, b| {
            b.1.mtime_ms
                .cmp(&a.1.mtime_ms)
                .then_with(|| a.0.as_str().cmp(b.0.as_str()))
                .then_with(|| a.1.path.cmp(&b.1.path))
        });

        let mut file_cursor = FileCursor::new(files, cursor);
        let mut hits = Vec::new();
        for (source, file) in file_cursor.take_chunk(chunk_size) {
            let Some(backend) = self.source_ref(*source) else {
                continue;
            };
            for block in backend.scan_file(file) {
                if let Some(hit) = score_text(&block.input, &block.output_text, &terms) {
                    hits.push(SearchHit {
                        block,
                        score: hit.score,
                        why: hit.why,
                    });
                }
            }
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.block.activity_at().cmp(&a.block.activity_at()))
        });
        SearchPage {
            hits,
            next_cursor: file_cursor.next_cursor(),
        }
    }

    /// Fork the session behind `block` at that turn.
    pub fn fork(&self, block: &ConversationBlock) -> ForkResult {
        match self.source_ref(block.source) {
            Some(backend) => backend.fork(block),
            None => Err(ForkFailure::new(format!(
                "source {} is not configured",
                block.source
            ))),
        }
    }

    /// Convenience used by callers holding only a path and key.
    pub fn load_session_at(
        &self,
        source: Source,
        session_id: &str,
        source_path: Option<&Path>,
        max_blocks: usize,
    ) -> SessionSlice {
        self.source_ref(source)
            .map(|b| b.load_session(session_id, source_path, max_blocks))
            .unwrap_or_default()
    }
}
