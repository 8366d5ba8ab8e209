//! Explicit resumable cursor over an ordered file list.
//!
//! A search scope's file list is computed once and walked in bounded
//! chunks; the caller re-invokes with the returned cursor until it comes
//! back `None`, visiting every file exactly once.

use logmux_types::{LogFileInfo, Source};

#[derive(Debug)]
pub struct FileCursor {
    files: Vec<(Source, LogFileInfo)>,
    position: usize,
}

impl FileCursor {
    /// `files` must be in a stable order (the repository sorts by mtime
    /// descending, then source, then path) so a cursor taken from one call
    /// remains meaningful on the next.
    pub fn new(files: Vec<(Source, LogFileInfo)>, start: usize) -> Self {
        let position = start.min(files.len());
        FileCursor { files, position }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Up to `chunk_size` files from the current position.
    pub fn take_chunk(&mut self, chunk_size: usize) -> &[(Source, LogFileInfo)] {
        let start = self.position;
        let end = (start + chunk_size.max(1)).min(self.files.len());
        self.position = end;
        &self.files[start..end]
    }

    /// Index to resume from, or `None` when the scope is exhausted.
    pub fn next_cursor(&self) -> Option<usize> {
        (self.position < self.files.len()).then_some(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn files(n: usize) -> Vec<(Source, LogFileInfo)> {
        (0..n)
            .map(|i| {
                (
                    Source::Claude,
                    LogFileInfo {
                        path: PathBuf::from(format!("/tmp/{i}.jsonl")),
                        mtime_ms: 0,
                        size_bytes: 0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn chunks_visit_every_file_exactly_once() {
        let mut seen = Vec::new();
        let mut cursor_value = 0usize;
        loop {
            let mut cursor = FileCursor::new(files(7), cursor_value);
            for (_, file) in cursor.take_chunk(3) {
                seen.push(file.path.clone());
            }
            match cursor.next_cursor() {
                Some(next) => cursor_value = next,
                None => break,
            }
        }
        assert_eq!(seen.len(), 7);
        seen.dedup();
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn out_of_range_start_is_exhausted() {
        let mut cursor = FileCursor::new(files(2), 10);
        assert!(cursor.take_chunk(5).is_empty());
        assert_eq!(cursor.next_cursor(), None);
    }
}
