//! Claude session logs: `{root}/projects/{encoded-cwd}/{session_id}.jsonl`.

pub mod blocks;
pub mod extract;
pub mod fork;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use logmux_types::{short_label, ConversationBlock, LogFileInfo, SessionIndexEntry, Source};

use crate::cache::TtlCache;
use crate::io::{
    self, file_info, list_jsonl_files, read_head_values, read_tail_values, TailWindows,
    TAIL_WINDOW_CAP,
};
use crate::traits::{ForkFailure, ForkResult, LogSource, SessionSlice};

/// Starting tail window for latest-turn summaries.
const SUMMARY_TAIL_BASE: u64 = 16 * 1024;
/// Starting tail window for loading a session's recent turns.
const SESSION_TAIL_BASE: u64 = 64 * 1024;
/// Head window scanned for a session-level cwd fallback.
const HEAD_CWD_BYTES: u64 = 64 * 1024;

const INDEX_CACHE_TTL_MS: i64 = 15_000;
const SEARCH_CACHE_TTL_MS: i64 = 30_000;

pub struct ClaudeSource {
    roots: Vec<PathBuf>,
    index_cache: TtlCache<SessionIndexEntry>,
    search_cache: TtlCache<LogFileInfo>,
}

impl ClaudeSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        ClaudeSource {
            roots,
            index_cache: TtlCache::new(INDEX_CACHE_TTL_MS),
            search_cache: TtlCache::new(SEARCH_CACHE_TTL_MS),
        }
    }

    /// `~/.claude` plus nothing else; secondary roots come from config.
    pub fn default_roots() -> Vec<PathBuf> {
        dirs::home_dir()
            .map(|home| vec![home.join(".claude")])
            .unwrap_or_default()
    }

    /// Project directory encoding: `/Users/foo/bar` -> `-Users-foo-bar`.
    pub fn encode_project_dir(cwd: &str) -> String {
        let encoded = cwd
            .replace(['/', '\\', '.', ':'], "-")
            .trim_start_matches('-')
            .to_string();
        format!("-{}", encoded)
    }

    fn project_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for root in &self.roots {
            for base in [root.join("projects"), root.clone()] {
                let Ok(entries) = std::fs::read_dir(&base) else {
                    continue;
                };
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.is_dir() && !dirs.contains(&path) {
                        dirs.push(path);
                    }
                }
            }
        }
        dirs
    }

    fn resolve_project_dir(&self, cwd: &str) -> Option<PathBuf> {
        let encoded = Self::encode_project_dir(cwd);
        for root in &self.roots {
            for base in [root.join("projects"), root.clone()] {
                let candidate = base.join(&encoded);
                if candidate.is_dir() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn path_within_roots(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    fn build_index(&self) -> Vec<SessionIndexEntry> {
        let mut newest: HashMap<String, SessionIndexEntry> = HashMap::new();
        for project_dir in self.project_dirs() {
            for file in list_jsonl_files(&project_dir) {
                let Some(stem) = file.path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let session_id = stem.to_string();
                let candidate = SessionIndexEntry {
                    source: Source::Claude,
                    session_id: session_id.clone(),
                    label: Some(short_label(&session_id)),
                    project_dir: Some(project_dir.clone()),
                    file,
                };
                match newest.get(&session_id) {
                    Some(existing) if existing.file.mtime_ms >= candidate.file.mtime_ms => {}
                    _ => {
                        newest.insert(session_id, candidate);
                    }
                }
            }
        }
        let mut entries: Vec<SessionIndexEntry> = newest.into_values().collect();
        entries.sort_by(|a, b| b.file.mtime_ms.cmp(&a.file.mtime_ms));
        entries
    }

    fn find_cwd_in_head(path: &Path) -> Option<String> {
        read_head_values(path, HEAD_CWD_BYTES)
            .iter()
            .find_map(extract::record_cwd)
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
}

/// Last block with user input, else the last block.
fn select_latest_with_input(mut blocks: Vec<ConversationBlock>) -> Option<ConversationBlock> {
    if let Some(pos) = blocks.iter().rposition(|b| !b.input.trim().is_empty()) {
        return Some(blocks.swap_remove(pos));
    }
    blocks.pop()
}

impl LogSource for ClaudeSource {
    fn source(&self) -> Source {
        Source::Claude
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
        let mut found = None;
        for window in TailWindows::new(SUMMARY_TAIL_BASE, TAIL_WINDOW_CAP, entry.file.size_bytes) {
            let records = read_tail_values(&entry.file.path, window);
            let blocks = blocks::stream_to_blocks(&records, Some(&entry.session_id));
            if let Some(block) = select_latest_with_input(blocks) {
                found = Some(block);
                break;
            }
        }
        let mut block = found?;
        if block.cwd.is_none() {
            block.cwd = Self::find_cwd_in_head(&entry.file.path);
        }
        block.source_path = Some(entry.file.path.to_string_lossy().into_owned());
        block.wsl_distro = io::wsl_distro_for_path(&entry.file.path);
        if let Some(project_dir) = &entry.project_dir {
            block.pane_id = Some(project_dir.to_string_lossy().into_owned());
            block.pane_label = project_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
        }
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
        let mut blocks = Vec::new();
        let mut covered = 0;
        for window in TailWindows::new(SESSION_TAIL_BASE, TAIL_WINDOW_CAP, file.size_bytes) {
            let records = read_tail_values(&file.path, window);
            blocks = blocks::stream_to_blocks(&records, Some(session_id));
            covered = window;
            if blocks.len() >= max_blocks {
                break;
            }
        }
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let truncated = blocks.len() > max_blocks;
        blocks.truncate(max_blocks);
        let source_path_str = file.path.to_string_lossy().into_owned();
        for block in &mut blocks {
            block.source_path = Some(source_path_str.clone());
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
        let mut files: Vec<LogFileInfo> = self
            .project_dirs()
            .iter()
            .flat_map(|dir| list_jsonl_files(dir))
            .collect();
        files.sort_by(|a, b| b.mtime_ms.cmp(&a.mtime_ms));
        self.search_cache.put(files.clone());
        files
    }

    fn scan_file(&self, file: &LogFileInfo) -> Vec<ConversationBlock> {
        use std::io::BufRead;
        let Ok(handle) = std::fs::File::open(&file.path) else {
            return Vec::new();
        };
        let seed = file
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);
        let records: Vec<serde_json::Value> = std::io::BufReader::new(handle)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(line.trim()).ok())
            .collect();
        let mut blocks = blocks::stream_to_blocks(&records, seed.as_deref());
        let path_str = file.path.to_string_lossy().into_owned();
        for block in &mut blocks {
            block.source_path = Some(path_str.clone());
        }
        blocks
    }

    fn fork(&self, block: &ConversationBlock) -> ForkResult {
        let Some(target_uuid) = block.source_id.as_deref() else {
            return Err(ForkFailure::new("block carries no raw identifier"));
        };
        let project_dir = block
            .pane_id
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .or_else(|| {
                block
                    .cwd
                    .as_deref()
                    .and_then(|cwd| self.resolve_project_dir(cwd))
            });
        let Some(project_dir) = project_dir else {
            return Err(ForkFailure::new(
                "cannot resolve the project directory for this session",
            ));
        };
        let source_path = block
            .source_path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| self.path_within_roots(p) && p.is_file())
            .unwrap_or_else(|| project_dir.join(format!("{}.jsonl", block.session_id)));
        if !source_path.is_file() {
            return Err(ForkFailure::new(format!(
                "source session file not found: {}",
                source_path.display()
            )));
        }
        fork::fork_session(&source_path, &project_dir, target_uuid)
    }
}
