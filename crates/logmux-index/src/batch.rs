//! Batched summary building over a session index slice.

use logmux_providers::LogSource;
use logmux_types::{ConversationBlock, SessionIndexEntry};

/// How many index entries each batch inspects.
const BATCH_SIZE: usize = 8;

/// Build latest-turn summaries starting at `start` until `target` blocks
/// have been produced or the entry list ends. Entries whose file yields no
/// block are skipped without consuming the target. Returns the blocks and
/// the cursor to resume from.
pub fn build_summaries(
    source: &dyn LogSource,
    entries: &[SessionIndexEntry],
    start: usize,
    target: usize,
) -> (Vec<ConversationBlock>, Option<usize>) {
    let mut blocks = Vec::new();
    let mut index = start.min(entries.len());
    while index < entries.len() && blocks.len() < target {
        let end = (index + BATCH_SIZE).min(entries.len());
        for entry in &entries[index..end] {
            if blocks.len() >= target {
                break;
            }
            if let Some(block) = source.build_summary(entry) {
                blocks.push(block);
            }
            index += 1;
        }
    }
    let next_cursor = (index < entries.len()).then_some(index);
    (blocks, next_cursor)
}
