//! Aggregate file statistics used as a cheap change signature per source.

use logmux_types::LogFileInfo;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub file_count: usize,
    pub latest_mtime: i64,
    pub latest_size: u64,
}

impl FileStats {
    pub fn update(&mut self, file: &LogFileInfo) {
        self.file_count += 1;
        if file.mtime_ms > self.latest_mtime {
            self.latest_mtime = file.mtime_ms;
            self.latest_size = file.size_bytes;
        } else if file.mtime_ms == self.latest_mtime && file.size_bytes > self.latest_size {
            self.latest_size = file.size_bytes;
        }
    }

    pub fn aggregate<'a>(files: impl IntoIterator<Item = &'a LogFileInfo>) -> Self {
        let mut stats = FileStats::default();
        for file in files {
            stats.update(file);
        }
        stats
    }

    /// `{count}:{mtime}:{size}`; equal signatures mean no poll work.
    pub fn signature(&self) -> String {
        format!("{}:{}:{}", self.file_count, self.latest_mtime, self.latest_size)
    }
}
