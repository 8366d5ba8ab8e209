//! Explicit status observations from the notify-event collaborator.
//!
//! The collaborator tails a small event log written by agent lifecycle
//! hooks and forwards `{ source, event, session_id, pane_id, timestamp,
//! hook }` records. Events name either a status or a session lifecycle
//! edge.

use crate::events::StatusEvent;
use crate::status::service::{Observation, StatusService};
use logmux_types::{normalize_status, now_ms, session_key, Source};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyPayload {
    pub source: Source,
    pub event: String,
    pub session_id: String,
    #[serde(default)]
    pub pane_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub hook: Option<String>,
}

/// Apply one notify event.
pub fn apply_notify(service: &mut StatusService, payload: &NotifyPayload) -> StatusEvent {
    if payload.session_id.trim().is_empty() {
        return StatusEvent::update(Vec::new(), Vec::new());
    }

    if is_session_end(payload) {
        let key = session_key(payload.source, &payload.session_id);
        return service.remove_session(&key);
    }

    let status = normalize_status(&payload.event)
        .or_else(|| payload.hook.as_deref().and_then(normalize_status));

    service.apply_observation(Observation {
        source: payload.source,
        session_id: payload.session_id.clone(),
        status,
        pane_id: payload.pane_id.clone(),
        timestamp: payload.timestamp.unwrap_or_else(now_ms),
    })
}

fn is_session_end(payload: &NotifyPayload) -> bool {
    let named_end = |value: &str| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "sessionend" | "session_end"
        )
    };
    named_end(&payload.event) || payload.hook.as_deref().is_some_and(named_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmux_types::SessionStatus;

    fn payload(event: &str, ts: Option<i64>) -> NotifyPayload {
        NotifyPayload {
            source: Source::Claude,
            event: event.to_string(),
            session_id: "s1".to_string(),
            pane_id: Some("pane-1".to_string()),
            timestamp: ts,
            hook: None,
        }
    }

    #[test]
    fn status_event_applies_as_observation() {
        let mut service = StatusService::new(100);
        apply_notify(&mut service, &payload("permission_prompt", Some(5_000)));
        let entry = service.entry("claude:s1").unwrap();
        assert_eq!(entry.status, Some(SessionStatus::WaitingUser));
        assert_eq!(entry.pane_id, "pane-1");
        assert_eq!(entry.updated_at, Some(5_000));
    }

    #[test]
    fn session_end_removes_the_entry() {
        let mut service = StatusService::new(100);
        apply_notify(&mut service, &payload("working", Some(1_000)));
        let event = apply_notify(&mut service, &payload("SessionEnd", Some(2_000)));
        match event {
            StatusEvent::Update { removed, .. } => {
                assert_eq!(removed, vec!["claude:s1".to_string()]);
            }
        }
        assert!(service.entry("claude:s1").is_none());
    }

    #[test]
    fn unknown_event_still_binds_the_pane() {
        let mut service = StatusService::new(100);
        apply_notify(&mut service, &payload("something_new", Some(1_000)));
        let entry = service.entry("claude:s1").unwrap();
        assert_eq!(entry.status, None);
        assert_eq!(entry.pane_id, "pane-1");
    }

    #[test]
    fn hook_field_can_carry_the_status() {
        let mut service = StatusService::new(100);
        let mut notify = payload("tool_hook", Some(1_000));
        notify.hook = Some("Stopped".to_string());
        apply_notify(&mut service, &notify);
        assert_eq!(
            service.entry("claude:s1").unwrap().status,
            Some(SessionStatus::Stopped)
        );
    }

    #[test]
    fn payload_deserializes_from_wire_json() {
        let json = r#"{
            "source": "codex",
            "event": "completed",
            "session_id": "abc",
            "pane_id": "pane-7",
            "timestamp": 1700000000000,
            "hook": "Notification"
        }"#;
        let payload: NotifyPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.source, Source::Codex);
        assert_eq!(payload.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn blank_session_id_is_dropped() {
        let mut service = StatusService::new(100);
        let mut notify = payload("working", Some(1_000));
        notify.session_id = "  ".to_string();
        assert!(apply_notify(&mut service, &notify).is_empty());
    }
}
