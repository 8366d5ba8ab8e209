//! Structural status inference fed from the sync loop.
//!
//! Codex summaries carry a `status_hint` derived from the session tail;
//! each hint is applied as a regular observation, and an unbound session
//! is correlated against pending launches using its activity time and cwd.

use crate::events::StatusEvent;
use crate::status::service::{Observation, StatusService};
use logmux_types::ConversationBlock;

/// Apply the status hints carried by a batch of session summaries.
/// Returns the merged status update.
pub fn apply_summary_hints(
    service: &mut StatusService,
    summaries: &[ConversationBlock],
) -> StatusEvent {
    let mut entries = Vec::new();
    let mut removed = Vec::new();

    for block in summaries {
        let key = block.session_key();

        let pane_id = match service.pane_for(&key) {
            Some(_) => None,
            None => service.match_pending_launch(block.activity_at(), block.cwd.as_deref()),
        };

        let Some(status) = block.status_hint else {
            // A matched launch still binds even without a hint.
            if let Some(pane_id) = pane_id {
                merge(
                    &mut entries,
                    &mut removed,
                    service.bind_session_to_pane(block.source, &block.session_id, &pane_id),
                );
            }
            continue;
        };

        let event = service.apply_observation(Observation {
            source: block.source,
            session_id: block.session_id.clone(),
            status: Some(status),
            pane_id,
            timestamp: block.status_hint_ts.unwrap_or_else(|| block.activity_at()),
        });
        merge(&mut entries, &mut removed, event);
    }

    StatusEvent::update(entries, removed)
}

fn merge(
    entries: &mut Vec<logmux_types::StatusEntry>,
    removed: &mut Vec<String>,
    event: StatusEvent,
) {
    match event {
        StatusEvent::Update {
            entries: more,
            removed: gone,
            ..
        } => {
            for entry in more {
                entries.retain(|e| e.session_key != entry.session_key);
                entries.push(entry);
            }
            removed.extend(gone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmux_types::{ConversationBlock, SessionStatus, Source};

    fn summary(
        session_id: &str,
        hint: Option<SessionStatus>,
        hint_ts: Option<i64>,
    ) -> ConversationBlock {
        let mut block = ConversationBlock::assemble(
            Source::Codex,
            Some("raw-1".to_string()),
            session_id.to_string(),
            "prompt".to_string(),
            "answer".to_string(),
            1_000,
            2_000,
        )
        .unwrap();
        block.status_hint = hint;
        block.status_hint_ts = hint_ts;
        block.cwd = Some("/work/project".to_string());
        block
    }

    #[test]
    fn hint_becomes_an_observation() {
        let mut service = StatusService::new(100);
        apply_summary_hints(
            &mut service,
            &[summary("c1", Some(SessionStatus::Working), Some(3_000))],
        );
        let entry = service.entry("codex:c1").unwrap();
        assert_eq!(entry.status, Some(SessionStatus::Working));
        assert_eq!(entry.updated_at, Some(3_000));
    }

    #[test]
    fn unbound_session_consumes_matching_pending_launch() {
        let mut service = StatusService::new(100);
        service.record_pending_launch("pane-3", Some("/work/project".to_string()));

        let mut block = summary("c1", Some(SessionStatus::Working), None);
        block.last_output_at = logmux_types::now_ms();
        apply_summary_hints(&mut service, &[block]);

        assert_eq!(service.pane_for("codex:c1"), Some("pane-3"));
        assert_eq!(service.pending_launch_count(), 0);
    }

    #[test]
    fn bound_session_leaves_pending_launches_alone() {
        let mut service = StatusService::new(100);
        service.bind_session_to_pane(Source::Codex, "c1", "pane-1");
        service.record_pending_launch("pane-2", None);

        let mut block = summary("c1", Some(SessionStatus::Completed), None);
        block.last_output_at = logmux_types::now_ms();
        apply_summary_hints(&mut service, &[block]);

        assert_eq!(service.pane_for("codex:c1"), Some("pane-1"));
        assert_eq!(service.pending_launch_count(), 1);
    }

    #[test]
    fn hintless_summary_without_pending_is_a_no_op() {
        let mut service = StatusService::new(100);
        let event = apply_summary_hints(&mut service, &[summary("c1", None, None)]);
        assert!(event.is_empty());
        assert!(service.entry("codex:c1").is_none());
    }
}
