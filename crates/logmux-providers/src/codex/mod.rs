//! Codex rollout logs: `{home}/.codex/sessions/**/rollout-{stamp}-{id}.jsonl`.

pub mod blocks;
pub mod fork;
pub mod schema;
pub mod status_hint;

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use logmux_types::{short_label, ConversationBlock, LogFileInfo, SessionIndexEntry, Source};

use crate::cache::TtlCache;
use crate::io::{
    self, file_info, list_jsonl_files_recursive, read_head_values, read_tail_values, TailWindows,
    TAIL_WINDOW_CAP,
};
use crate::traits::{ForkFailure, ForkResult, LogSource, SessionSlice};

const SESSIONS_DIRNAME: &str = ".codex/sessions";
const SCAN_DEPTH: usize = 6;
const HEAD_BYTES: u64 = 16 * 1024;
const SUMMARY_TAIL_BASE: u64 = 16 * 1024;
const SESSION_TAIL_BASE: u64 = 64 * 1024;

const INDEX_CACHE_TTL_MS: i64 = 15_000;
const SEARCH_CACHE_TTL_MS: i64 = 30_000;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static HEX32_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9a-fA-F]{32}").unwrap());

pub struct CodexSource {
    roots: Vec<PathBuf>,
    index_cache: TtlCache<SessionIndexEntry>,
    search_cache: TtlCache<LogFileInfo>,
}

impl CodexSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        CodexSource {
            roots,
            index_cache: TtlCache::new(INDEX_CACHE_TTL_MS),
            search_cache: TtlCache::new(SEARCH_CACHE_TTL_MS),
        }
    }

    pub fn default_roots() -> Vec<PathBuf> {
        dirs::home_dir()
            .map(|home| vec![home.join(SESSIONS_DIRNAME)])
            .unwrap_or_default()
    }

    /// Session id from a rollout file name: the last embedded UUID, else
    /// the last bare 32-hex run, else whatever follows the final hyphen.
    pub fn session_id_from_filename(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        if let Some(m) = UUID_RE.find_iter(stem).last() {
            return Some(m.as_str().to_string());
        }
        if let Some(m) = HEX32_RE.find_iter(stem).last() {
            return Some(m.as_str().to_string());
        }
        stem.rsplit('-')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn session_id_from_head(path: &Path) -> Option<String> {
        read_head_values(path, HEAD_BYTES).iter().find_map(|value| {
            value
                .get("payload")
                .and_then(|p| p.get("id"))
                .and_then(serde_json::Value::as_str)
                .filter(|id| logmux_types::is_uuid_like(id))
                .map(str::to_string)
        })
    }

    fn resolve_session_id(file: &LogFileInfo) -> Option<String> {
        let from_name = Self::session_id_from_filename(&file.path).unwrap_or_default();
        // Short name fragments are not trustworthy; confirm from the head.
        if from_name.len() >= 20 {
            return Some(from_name);
        }
        Self::session_id_from_head(&file.path).or(Some(from_name).filter(|s| !s.is_empty()))
    }

    fn list_files(&self) -> Vec<LogFileInfo> {
        let mut files: Vec<LogFileInfo> = self
            .roots
            .iter()
            .flat_map(|root| list_jsonl_files_recursive(root, SCAN_DEPTH))
            .collect();
        files.sort_by(|a, b| b.mtime_ms.cmp(&a.mtime_ms));
        files
    }

    fn build_index(&self) -> Vec<SessionIndexEntry> {
        let mut newest: HashMap<String, SessionIndexEntry> = HashMap::new();
        for file in self.list_files() {
            let Some(session_id) = Self::resolve_session_id(&file) else {
                continue;
            };
            let candidate = SessionIndexEntry {
                source: Source::Codex,
                label: Some(short_label(&session_id)),
                session_id: session_id.clone(),
                project_dir: file.path.parent().map(Path::to_path_buf),
                file,
            };
            match newest.get(&session_id) {
                Some(existing) if existing.file.mtime_ms >= candidate.file.mtime_ms => {}
                _ => {
                    newest.insert(session_id, candidate);
                }
            }
        }
        let mut entries: Vec<SessionIndexEntry> = newest.into_values().collect();
        entries.sort_by(|a, b| b.file.mtime_ms.cmp(&a.file.mtime_ms));
        entries
    }

    fn path_within_roots(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    fn resolve_session_file(
        &self,
        session_id: &str,
        source_path: Option<&Path>,
    ) -> Option<LogFileInfo> {
        if let Some(path) = source_path
            && self.path_within_roots(path)
            && let Some(info) = file_info(path)
        {
            return Some(info);
        }
        self.build_index()
            .into_iter()
            .find(|entry| entry.session_id == session_id)
            .map(|entry| entry.file)
    }

    fn blocks_from_tail(
        &self,
        file: &LogFileInfo,
        session_id: &str,
        base: u64,
        min_blocks: usize,
    ) -> (Vec<ConversationBlock>, Vec<serde_json::Value>, u64) {
        let mut blocks = Vec::new();
        let mut records = Vec::new();
        let mut covered = 0;
        for window in TailWindows::new(base, TAIL_WINDOW_CAP, file.size_bytes) {
            records = read_tail_values(&file.path, window);
            blocks = blocks::merge_deduped(blocks::stream_to_blocks(&records, session_id));
            covered = window;
            if blocks.len() >= min_blocks {
                break;
            }
        }
        (blocks, records, covered)
    }
}

impl LogSource for CodexSource {
    fn source(&self) -> Source {
        Source::Codex
    }

    fn list_session_index(&mut self, refresh: bool) -> Vec<SessionIndexEntry> {
        if let Some(cached) = self.index_cache.get(refresh) {
            return cached;
        }
        let entries = self.build_index();
        self.index_cache.put(entries.clone());
        entries
    }

    fn build_summary(&self, entry: &SessionIndexEntry) -> Option<ConversationBlock> {
        let (blocks, records, _) =
            self.blocks_from_tail(&entry.file, &entry.session_id, SUMMARY_TAIL_BASE, 1);
        let mut block = blocks
            .iter()
            .rev()
            .find(|b| !b.input.trim().is_empty())
            .or_else(|| blocks.last())
            .cloned()?;
        if block.cwd.is_none() {
            block.cwd = read_head_values(&entry.file.path, HEAD_BYTES)
                .iter()
                .find_map(|v| {
                    v.get("payload")
                        .and_then(|p| p.get("cwd"))
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                });
        }
        if let Some((status, ts)) = status_hint::infer_status_hint(&records) {
            block.status_hint = Some(status);
            block.status_hint_ts = (ts > 0).then_some(ts);
        }
        block.source_path = Some(entry.file.path.to_string_lossy().into_owned());
        block.wsl_distro = io::wsl_distro_for_path(&entry.file.path);
        Some(block)
    }

    fn load_session(
        &self,
        session_id: &str,
        source_path: Option<&Path>,
        max_blocks: usize,
    ) -> SessionSlice {
        let Some(file) = self.resolve_session_file(session_id, source_path) else {
            return SessionSlice::default();
        };
        let (mut blocks, _, covered) =
            self.blocks_from_tail(&file, session_id, SESSION_TAIL_BASE, max_blocks);
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let truncated = blocks.len() > max_blocks;
        blocks.truncate(max_blocks);
        let path_str = file.path.to_string_lossy().into_owned();
        for block in &mut blocks {
            block.source_path = Some(path_str.clone());
        }
        SessionSlice {
            blocks,
            maybe_more: truncated || covered < file.size_bytes,
        }
    }

    fn search_files(&mut self, refresh: bool) -> Vec<LogFileInfo> {
        if let Some(cached) = self.search_cache.get(refresh) {
            return cached;
        }
        let files = self.list_files();
        self.search_cache.put(files.clone());
        files
    }

    fn scan_file(&self, file: &LogFileInfo) -> Vec<ConversationBlock> {
        use std::io::BufRead;
        let Ok(handle) = std::fs::File::open(&file.path) else {
            return Vec::new();
        };
        let seed = Self::resolve_session_id(file).unwrap_or_default();
        let records: Vec<serde_json::Value> = std::io::BufReader::new(handle)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(line.trim()).ok())
            .collect();
        let mut blocks = blocks::merge_deduped(blocks::stream_to_blocks(&records, &seed));
        let path_str = file.path.to_string_lossy().into_owned();
        for block in &mut blocks {
            block.source_path = Some(path_str.clone());
        }
        blocks
    }

    fn fork(&self, block: &ConversationBlock) -> ForkResult {
        let source_path = block
            .source_path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| self.path_within_roots(p) && p.is_file())
            .or_else(|| {
                self.build_index()
                    .into_iter()
                    .find(|entry| entry.session_id == block.session_id)
                    .map(|entry| entry.file.path)
            });
        let Some(source_path) = source_path else {
            return Err(ForkFailure::new(format!(
                "no session file found for {}",
                block.session_id
            )));
        };
        fork::fork_session(&source_path, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_id_prefers_last_uuid() {
        let path = Path::new(
            "rollout-2025-01-02T03-04-05-7f2abd2d-7cfc-4447-9ddd-3ca8d14e02e9.jsonl",
        );
        assert_eq!(
            CodexSource::session_id_from_filename(path).as_deref(),
            Some("7f2abd2d-7cfc-4447-9ddd-3ca8d14e02e9")
        );
    }

    #[test]
    fn filename_id_falls_back_to_hex_run() {
        let path = Path::new("rollout-20250102-7f2abd2d7cfc44479ddd3ca8d14e02e9.jsonl");
        assert_eq!(
            CodexSource::session_id_from_filename(path).as_deref(),
            Some("7f2abd2d7cfc44479ddd3ca8d14e02e9")
        );
    }

    #[test]
    fn filename_id_last_resort_is_tail_token() {
        let path = Path::new("session-abc123.jsonl");
        assert_eq!(
            CodexSource::session_id_from_filename(path).as_deref(),
            Some("abc123")
        );
    }
}
