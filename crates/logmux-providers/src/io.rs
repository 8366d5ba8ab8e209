//! Byte-window readers over append-only JSONL files.
//!
//! Every reader here degrades to an empty result on filesystem errors and
//! silently skips lines that fail to parse; log files are written live by
//! external tools and a truncated or half-flushed record is normal, not
//! exceptional.

use logmux_types::LogFileInfo;
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Hard cap for doubling-window tail reads.
pub const TAIL_WINDOW_CAP: u64 = 2 * 1024 * 1024;
/// Starting window for doubling-window tail reads.
pub const TAIL_WINDOW_BASE: u64 = 16 * 1024;

/// Stat a file into a [`LogFileInfo`] snapshot.
pub fn file_info(path: &Path) -> Option<LogFileInfo> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    let mtime_ms = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Some(LogFileInfo {
        path: path.to_path_buf(),
        mtime_ms,
        size_bytes: meta.len(),
    })
}

/// Parse the last `max_bytes` of `path` as JSONL. When the window starts
/// mid-file the truncated partial first line is dropped; if the window
/// contains no newline at all there is no complete record to return.
pub fn read_tail_values(path: &Path, max_bytes: u64) -> Vec<Value> {
    let Ok(mut file) = File::open(path) else {
        return Vec::new();
    };
    let Ok(meta) = file.metadata() else {
        return Vec::new();
    };
    let size = meta.len();
    if size == 0 || max_bytes == 0 {
        return Vec::new();
    }
    let window = max_bytes.min(size);
    let start = size - window;
    if file.seek(SeekFrom::Start(start)).is_err() {
        return Vec::new();
    }
    let mut buf = Vec::with_capacity(window as usize);
    if file.take(window).read_to_end(&mut buf).is_err() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(&buf);
    let text = if start > 0 {
        match text.find('\n') {
            Some(idx) => &text[idx + 1..],
            None => return Vec::new(),
        }
    } else {
        &text
    };
    parse_lines(text)
}

/// Parse the first `max_bytes` of `path` as JSONL, dropping a trailing
/// partial line when the window ends mid-record.
pub fn read_head_values(path: &Path, max_bytes: u64) -> Vec<Value> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };
    let Ok(meta) = file.metadata() else {
        return Vec::new();
    };
    let size = meta.len();
    if size == 0 || max_bytes == 0 {
        return Vec::new();
    }
    let window = max_bytes.min(size);
    let mut buf = Vec::with_capacity(window as usize);
    if file.take(window).read_to_end(&mut buf).is_err() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(&buf);
    let text = if window < size {
        match text.rfind('\n') {
            Some(idx) => &text[..idx],
            None => return Vec::new(),
        }
    } else {
        &text
    };
    parse_lines(text)
}

fn parse_lines(text: &str) -> Vec<Value> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(line).ok()
        })
        .collect()
}

/// List `*.jsonl` files directly under `dir`, newest mtime first.
pub fn list_jsonl_files(dir: &Path) -> Vec<LogFileInfo> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<LogFileInfo> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|p| file_info(&p))
        .collect();
    files.sort_by(|a, b| b.mtime_ms.cmp(&a.mtime_ms));
    files
}

/// Recursively list `*.jsonl` files under `root` up to `max_depth`, newest
/// mtime first. Unreadable subtrees are skipped.
pub fn list_jsonl_files_recursive(root: &Path, max_depth: usize) -> Vec<LogFileInfo> {
    let mut files: Vec<LogFileInfo> = WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|p| file_info(&p))
        .collect();
    files.sort_by(|a, b| b.mtime_ms.cmp(&a.mtime_ms));
    files
}

/// Distro tag for log files that live under a WSL mount; `None` for native
/// paths.
pub fn wsl_distro_for_path(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("/mnt/wsl/") {
        let distro = rest.split('/').next().unwrap_or("");
        if !distro.is_empty() {
            return Some(distro.to_string());
        }
    }
    if let Some(idx) = text.find("wsl$\\") {
        let rest = &text[idx + 5..];
        let distro = rest.split('\\').next().unwrap_or("");
        if !distro.is_empty() {
            return Some(distro.to_string());
        }
    }
    None
}

/// Doubling-window sequence for tail reads: yields `base`, `2*base`, ...
/// clamped to `min(cap, file_size)`, terminating once the whole file (or
/// the cap) has been covered.
pub struct TailWindows {
    next: u64,
    cap: u64,
    file_size: u64,
    done: bool,
}

impl TailWindows {
    pub fn new(base: u64, cap: u64, file_size: u64) -> Self {
        TailWindows {
            next: base.max(1),
            cap: cap.max(1),
            file_size,
            done: file_size == 0,
        }
    }
}

impl Iterator for TailWindows {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done {
            return None;
        }
        let window = self.next.min(self.cap).min(self.file_size.max(1));
        if window >= self.file_size || window >= self.cap {
            self.done = true;
        }
        self.next = self.next.saturating_mul(2);
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn tail_drops_partial_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jsonl", "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");
        // Window lands inside the second record.
        let values = read_tail_values(&path, 12);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["n"], 3);
    }

    #[test]
    fn tail_covering_whole_file_keeps_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jsonl", "{\"n\":1}\n{\"n\":2}\n");
        let values = read_tail_values(&path, 4096);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["n"], 1);
    }

    #[test]
    fn tail_window_without_newline_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jsonl", "{\"n\":1}");
        // 4-byte window lands mid-record with no newline boundary.
        assert!(read_tail_values(&path, 4).is_empty());
    }

    #[test]
    fn head_drops_partial_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jsonl", "{\"n\":1}\n{\"n\":2}\n");
        let values = read_head_values(&path, 12);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["n"], 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.jsonl", "{\"n\":1}\nnot json\n{\"n\":2}\n");
        let values = read_head_values(&path, 4096);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn missing_file_returns_empty() {
        assert!(read_tail_values(Path::new("/nonexistent/x.jsonl"), 1024).is_empty());
        assert!(read_head_values(Path::new("/nonexistent/x.jsonl"), 1024).is_empty());
        assert!(list_jsonl_files(Path::new("/nonexistent")).is_empty());
    }

    #[test]
    fn listing_sorts_by_mtime_desc() {
        let dir = tempfile::tempdir().unwrap();
        let older = write_file(&dir, "old.jsonl", "{}\n");
        let newer = write_file(&dir, "new.jsonl", "{}\n");
        filetime_set(&older, 1_000_000);
        filetime_set(&newer, 2_000_000);
        let files = list_jsonl_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].path.ends_with("new.jsonl"));
    }

    fn filetime_set(path: &Path, secs: i64) {
        let ft = std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs as u64);
        let f = File::options().append(true).open(path).unwrap();
        f.set_modified(ft).unwrap();
    }

    #[test]
    fn doubling_windows_terminate_at_file_size() {
        let windows: Vec<u64> = TailWindows::new(4096, TAIL_WINDOW_CAP, 10_000).collect();
        assert_eq!(windows, vec![4096, 8192, 10_000]);
    }

    #[test]
    fn doubling_windows_terminate_at_cap() {
        let windows: Vec<u64> = TailWindows::new(1024 * 1024, TAIL_WINDOW_CAP, u64::MAX).collect();
        assert_eq!(windows, vec![1024 * 1024, TAIL_WINDOW_CAP]);
        // Attempt count is bounded by ceil(log2(cap / base)) + 1.
        let count = TailWindows::new(TAIL_WINDOW_BASE, TAIL_WINDOW_CAP, u64::MAX).count();
        assert!(count <= 8);
    }

    #[test]
    fn doubling_windows_never_exceed_file_size() {
        for window in TailWindows::new(4096, TAIL_WINDOW_CAP, 5000) {
            assert!(window <= 5000);
        }
    }
}
