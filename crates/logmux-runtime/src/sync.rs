//! Polling sync loop: one rolling snapshot per source, delta and
//! invalidate events pushed over a channel.

use crate::config::Config;
use crate::events::{SessionSnapshot, SourceMeta, SyncEvent, SyncPhase, FEED_VERSION};
use logmux_index::{FileStats, Repository};
use logmux_types::{
    compare_summaries, now_ms, session_fingerprint, ConversationBlock, Source,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone)]
struct TrackedSession {
    summary: ConversationBlock,
    fingerprint: String,
    file_path: PathBuf,
    file_mtime: i64,
}

#[derive(Debug, Default)]
struct SourceState {
    sessions: HashMap<String, TrackedSession>,
    stats: FileStats,
    bootstrapped: bool,
}

#[derive(Debug, Default)]
struct SyncState {
    by_source: HashMap<Source, SourceState>,
}

enum Control {
    Poll,
    Stop,
}

/// Owns the poll worker. Dropping the service stops the worker; no timer
/// survives shutdown.
pub struct SyncService {
    shared: Arc<(Mutex<SyncState>, Condvar)>,
    control: Sender<Control>,
    events: Receiver<SyncEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SyncService {
    pub fn spawn(mut repository: Repository, config: &Config) -> std::io::Result<Self> {
        let shared = Arc::new((Mutex::new(SyncState::default()), Condvar::new()));
        let (tx_events, rx_events) = channel();
        let (tx_control, rx_control) = channel();

        let worker_shared = Arc::clone(&shared);
        let poll_interval = Duration::from_millis(config.effective_poll_interval_ms());
        let session_limit = config.session_limit;

        let worker = std::thread::Builder::new()
            .name("logmux-sync-worker".to_string())
            .spawn(move || {
                loop {
                    poll_once(
                        &mut repository,
                        &worker_shared,
                        &tx_events,
                        session_limit,
                    );
                    match rx_control.recv_timeout(poll_interval) {
                        Ok(Control::Poll) | Err(RecvTimeoutError::Timeout) => continue,
                        Ok(Control::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(SyncService {
            shared,
            control: tx_control,
            events: rx_events,
            worker: Some(worker),
        })
    }

    pub fn events(&self) -> &Receiver<SyncEvent> {
        &self.events
    }

    /// Force a poll tick outside the regular cadence.
    pub fn request_poll(&self) {
        let _ = self.control.send(Control::Poll);
    }

    /// Full snapshot for one source, served from memory. Hydrates lazily:
    /// a request before the first poll of the source triggers one and
    /// waits briefly for it.
    pub fn snapshot(&self, source: Source, limit: usize) -> SessionSnapshot {
        let (state_lock, hydrated) = &*self.shared;
        let mut state = state_lock.lock().unwrap_or_else(|e| e.into_inner());

        if !state
            .by_source
            .get(&source)
            .map(|s| s.bootstrapped)
            .unwrap_or(false)
        {
            let _ = self.control.send(Control::Poll);
            let deadline = Duration::from_secs(5);
            let (next, _timeout) = hydrated
                .wait_timeout_while(state, deadline, |s| {
                    !s.by_source
                        .get(&source)
                        .map(|s| s.bootstrapped)
                        .unwrap_or(false)
                })
                .unwrap_or_else(|e| e.into_inner());
            state = next;
        }

        let source_state = state.by_source.entry(source).or_default();
        let mut sessions: Vec<ConversationBlock> = source_state
            .sessions
            .values()
            .map(|t| t.summary.clone())
            .collect();
        sessions.sort_by(compare_summaries);
        let has_more = limit > 0 && sessions.len() > limit;
        if has_more {
            sessions.truncate(limit);
        }

        SessionSnapshot {
            version: FEED_VERSION,
            generated_at: now_ms(),
            source,
            sessions,
            meta: source_state.stats.into(),
            has_more,
            next_cursor: has_more.then_some(limit),
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn poll_once(
    repository: &mut Repository,
    shared: &Arc<(Mutex<SyncState>, Condvar)>,
    events: &Sender<SyncEvent>,
    session_limit: usize,
) {
    let sources: Vec<Source> = repository.sources().collect();
    for source in sources {
        poll_source(repository, shared, events, source, session_limit);
    }
}

fn poll_source(
    repository: &mut Repository,
    shared: &Arc<(Mutex<SyncState>, Condvar)>,
    events: &Sender<SyncEvent>,
    source: Source,
    session_limit: usize,
) {
    let mut entries = repository.session_index(source, true);
    if session_limit > 0 {
        entries.truncate(session_limit);
    }
    let stats = FileStats::aggregate(entries.iter().map(|e| &e.file));

    let (state_lock, hydrated) = &**shared;
    let previous = {
        let state = state_lock.lock().unwrap_or_else(|e| e.into_inner());
        match state.by_source.get(&source) {
            // Unchanged index: nothing to rebuild this tick.
            Some(s) if s.bootstrapped && s.stats.signature() == stats.signature() => return,
            Some(s) => Some((s.sessions.clone(), s.bootstrapped)),
            None => None,
        }
    };
    let (previous_sessions, was_bootstrapped) = previous.unwrap_or_default();

    let mut next_sessions: HashMap<String, TrackedSession> = HashMap::new();
    let mut added = Vec::new();
    let mut updated = Vec::new();

    for entry in &entries {
        let key = entry.session_key();
        if let Some(tracked) = previous_sessions.get(&key)
            && entry.file.mtime_ms <= tracked.file_mtime
        {
            next_sessions.insert(key, tracked.clone());
            continue;
        }

        let Some(summary) = repository.build_summary(entry) else {
            continue;
        };
        let fingerprint = session_fingerprint(&summary);
        match previous_sessions.get(&key) {
            None => added.push(summary.clone()),
            Some(tracked) if tracked.fingerprint != fingerprint => updated.push(summary.clone()),
            Some(_) => {}
        }
        next_sessions.insert(
            key,
            TrackedSession {
                summary,
                fingerprint,
                file_path: entry.file.path.clone(),
                file_mtime: entry.file.mtime_ms,
            },
        );
    }

    let removed: Vec<String> = previous_sessions
        .keys()
        .filter(|key| !next_sessions.contains_key(*key))
        .cloned()
        .collect();

    {
        let mut state = state_lock.lock().unwrap_or_else(|e| e.into_inner());
        let source_state = state.by_source.entry(source).or_default();
        source_state.sessions = next_sessions;
        source_state.stats = stats;
        source_state.bootstrapped = true;
    }
    hydrated.notify_all();

    let phase = if was_bootstrapped {
        SyncPhase::Incremental
    } else {
        SyncPhase::Bootstrap
    };
    if !added.is_empty() || !updated.is_empty() || phase == SyncPhase::Bootstrap {
        let _ = events.send(SyncEvent::Delta {
            version: FEED_VERSION,
            generated_at: now_ms(),
            source,
            added,
            updated,
            meta: SourceMeta::from(stats),
            phase,
        });
    }
    if !removed.is_empty() {
        let _ = events.send(SyncEvent::Invalidate { keys: removed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_session_keeps_file_identity() {
        let block = ConversationBlock::assemble(
            Source::Claude,
            Some("u-1".to_string()),
            "session-a".to_string(),
            "hello".to_string(),
            "world".to_string(),
            1_000,
            2_000,
        )
        .unwrap();
        let tracked = TrackedSession {
            fingerprint: session_fingerprint(&block),
            summary: block,
            file_path: PathBuf::from("/tmp/session-a.jsonl"),
            file_mtime: 2_000,
        };
        assert_eq!(tracked.file_mtime, 2_000);
        assert!(tracked.fingerprint.contains("hello"));
    }
}
