//! Per-session status state machine with pane binding and pending-launch
//! correlation.

use crate::events::{StatusEvent, StatusSnapshot};
use logmux_types::{now_ms, session_key, SessionStatus, Source, StatusEntry, StatusFlags};
use std::collections::HashMap;

/// Unmatched pending launches older than this are pruned.
pub const PENDING_LAUNCH_TTL_MS: i64 = 120_000;
/// Clock-skew allowance when a session surfaces just before its launch.
pub const NEGATIVE_SKEW_MS: i64 = 5_000;

/// One status observation, from either the notify collaborator or the
/// structural inference in the sync loop. Both channels apply identically:
/// the newest timestamp wins.
#[derive(Debug, Clone)]
pub struct Observation {
    pub source: Source,
    pub session_id: String,
    pub status: Option<SessionStatus>,
    pub pane_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct PendingLaunch {
    pub started_at: i64,
    pub cwd: Option<String>,
}

pub struct StatusService {
    entries: HashMap<String, StatusEntry>,
    session_to_pane: HashMap<String, String>,
    pane_to_session: HashMap<String, String>,
    pending: HashMap<String, PendingLaunch>,
    max_entries: usize,
}

impl StatusService {
    pub fn new(max_entries: usize) -> Self {
        StatusService {
            entries: HashMap::new(),
            session_to_pane: HashMap::new(),
            pane_to_session: HashMap::new(),
            pending: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn entry(&self, key: &str) -> Option<&StatusEntry> {
        self.entries.get(key)
    }

    pub fn pane_for(&self, key: &str) -> Option<&str> {
        self.session_to_pane.get(key).map(String::as_str)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let mut entries: Vec<StatusEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.session_key.cmp(&b.session_key))
        });
        StatusSnapshot::new(entries)
    }

    /// Apply one observation. A timestamp at or below the stored
    /// `updated_at` never changes the status; the pane binding (when
    /// present) is applied either way.
    pub fn apply_observation(&mut self, observation: Observation) -> StatusEvent {
        let key = session_key(observation.source, &observation.session_id);
        let mut changed_keys = Vec::new();
        let mut removed = Vec::new();

        let entry = self.entries.entry(key.clone()).or_insert_with(|| {
            blank_entry(&key, observation.source, &observation.session_id)
        });

        if let Some(status) = observation.status {
            let is_newer = entry
                .updated_at
                .map(|stored| observation.timestamp > stored)
                .unwrap_or(true);
            if is_newer {
                entry.status = Some(status);
                entry.updated_at = Some(observation.timestamp);
                entry.flags.default_completed = false;
                changed_keys.push(key.clone());
            }
        }

        if let Some(pane_id) = observation.pane_id {
            let (bound, evicted) =
                self.bind(observation.source, &observation.session_id, &pane_id);
            changed_keys.extend(bound);
            removed.extend(evicted);
        }

        removed.extend(self.prune_to_limit());
        self.event_for(changed_keys, removed)
    }

    /// Bind a session to a pane, 1:1. Any other session previously bound
    /// to the pane is evicted. A codex session with no status yet is
    /// seeded `completed` and flagged so the seed reads as day zero.
    pub fn bind_session_to_pane(
        &mut self,
        source: Source,
        session_id: &str,
        pane_id: &str,
    ) -> StatusEvent {
        let (changed, removed) = self.bind(source, session_id, pane_id);
        self.event_for(changed, removed)
    }

    fn bind(
        &mut self,
        source: Source,
        session_id: &str,
        pane_id: &str,
    ) -> (Vec<String>, Vec<String>) {
        let key = session_key(source, session_id);
        let mut changed = Vec::new();
        let mut removed = Vec::new();

        if let Some(other) = self.pane_to_session.get(pane_id).cloned()
            && other != key
        {
            self.entries.remove(&other);
            self.session_to_pane.remove(&other);
            removed.push(other);
        }

        if let Some(old_pane) = self.session_to_pane.get(&key).cloned()
            && old_pane != pane_id
        {
            self.pane_to_session.remove(&old_pane);
        }

        self.session_to_pane.insert(key.clone(), pane_id.to_string());
        self.pane_to_session.insert(pane_id.to_string(), key.clone());
        self.pending.remove(pane_id);

        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| blank_entry(&key, source, session_id));
        if entry.pane_id != pane_id {
            entry.pane_id = pane_id.to_string();
            changed.push(key.clone());
        }
        if entry.status.is_none() && source == Source::Codex {
            entry.status = Some(SessionStatus::Completed);
            entry.flags.default_completed = true;
            if !changed.contains(&key) {
                changed.push(key.clone());
            }
        }

        (changed, removed)
    }

    /// Drop the pane bindings without removing the entries themselves.
    pub fn clear_bindings_for_pane(&mut self, pane_id: &str) {
        if let Some(key) = self.pane_to_session.remove(pane_id) {
            self.session_to_pane.remove(&key);
        }
        self.pending.remove(pane_id);
    }

    /// Pane closed: its bound session entry and any pending launch go away.
    pub fn remove_sessions_for_pane(&mut self, pane_id: &str) -> StatusEvent {
        let mut removed = Vec::new();
        if let Some(key) = self.pane_to_session.remove(pane_id) {
            self.session_to_pane.remove(&key);
            if self.entries.remove(&key).is_some() {
                removed.push(key);
            }
        }
        self.pending.remove(pane_id);
        self.event_for(Vec::new(), removed)
    }

    pub fn remove_session(&mut self, key: &str) -> StatusEvent {
        let mut removed = Vec::new();
        if self.entries.remove(key).is_some() {
            removed.push(key.to_string());
        }
        if let Some(pane) = self.session_to_pane.remove(key) {
            self.pane_to_session.remove(&pane);
        }
        self.event_for(Vec::new(), removed)
    }

    pub fn set_output_idle(&mut self, key: &str, idle: bool) -> StatusEvent {
        let mut changed = Vec::new();
        if let Some(entry) = self.entries.get_mut(key)
            && entry.flags.output_idle != idle
        {
            entry.flags.output_idle = idle;
            changed.push(key.to_string());
        }
        self.event_for(changed, Vec::new())
    }

    /// Record a launch with no extractable session id, to be matched to
    /// the next session that surfaces.
    pub fn record_pending_launch(&mut self, pane_id: &str, cwd: Option<String>) {
        self.pending.insert(
            pane_id.to_string(),
            PendingLaunch {
                started_at: now_ms(),
                cwd,
            },
        );
    }

    pub fn pending_launch_count(&self) -> usize {
        self.pending.len()
    }

    /// Match a freshly discovered session against pending launches and
    /// consume the winner. Prefers the smallest non-negative delta from
    /// launch to activity; failing that, the smallest absolute delta
    /// within the negative-skew tolerance. Candidates sharing the
    /// session's cwd are tried first, falling back to all candidates only
    /// when no cwd-scoped one exists.
    pub fn match_pending_launch(
        &mut self,
        activity_at: i64,
        cwd: Option<&str>,
    ) -> Option<String> {
        self.prune_pending(now_ms());

        let scoped: Vec<&String> = match cwd {
            Some(cwd) => self
                .pending
                .iter()
                .filter(|(_, p)| p.cwd.as_deref() == Some(cwd))
                .map(|(pane, _)| pane)
                .collect(),
            None => Vec::new(),
        };
        let candidates: Vec<String> = if scoped.is_empty() {
            self.pending.keys().cloned().collect()
        } else {
            scoped.into_iter().cloned().collect()
        };

        let best = candidates
            .into_iter()
            .filter_map(|pane| {
                let delta = activity_at - self.pending.get(&pane)?.started_at;
                if delta >= 0 {
                    Some((pane, delta, 0u8))
                } else if delta >= -NEGATIVE_SKEW_MS {
                    Some((pane, delta.abs(), 1u8))
                } else {
                    None
                }
            })
            // Non-negative deltas beat skew-tolerated ones at any size.
            .min_by_key(|(_, delta, tier)| (*tier, *delta))
            .map(|(pane, _, _)| pane)?;

        self.pending.remove(&best);
        Some(best)
    }

    fn prune_pending(&mut self, now: i64) {
        self.pending
            .retain(|_, launch| now - launch.started_at <= PENDING_LAUNCH_TTL_MS);
    }

    fn prune_to_limit(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        while self.entries.len() > self.max_entries {
            let Some(oldest) = self
                .entries
                .values()
                .min_by_key(|e| (e.updated_at.unwrap_or(i64::MIN), e.session_key.clone()))
                .map(|e| e.session_key.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            if let Some(pane) = self.session_to_pane.remove(&oldest) {
                self.pane_to_session.remove(&pane);
            }
            removed.push(oldest);
        }
        removed
    }

    fn event_for(&self, changed_keys: Vec<String>, removed: Vec<String>) -> StatusEvent {
        let mut seen = std::collections::HashSet::new();
        let entries = changed_keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .filter_map(|key| self.entries.get(&key).cloned())
            .collect();
        StatusEvent::update(entries, removed)
    }
}

fn blank_entry(key: &str, source: Source, session_id: &str) -> StatusEntry {
    StatusEntry {
        session_key: key.to_string(),
        source,
        session_id: session_id.to_string(),
        status: None,
        pane_id: String::new(),
        updated_at: None,
        flags: StatusFlags::default(),
    }
}
