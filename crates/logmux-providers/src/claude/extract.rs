//! Field extraction over the loose claude record envelopes.
//!
//! The log format has grown organically: the message body may sit under
//! `message`, `payload`, or `data`; roles appear in several places; content
//! is a string, a segment array, or a nested object. Every field is pulled
//! through an ordered list of extractor strategies, first match wins, so a
//! newly observed shape is a one-line addition to the relevant list.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::text::{self, Role};
use logmux_types::parse_timestamp_ms;

/// Envelope keys that may hold the message body, probed in order.
const MESSAGE_ENVELOPE_KEYS: &[&str] = &["message", "payload", "data"];

/// Keys that may carry the working directory, probed in order on the record
/// and then on the message envelope.
const CWD_KEYS: &[&str] = &[
    "cwd",
    "workingDirectory",
    "working_directory",
    "workdir",
    "work_dir",
    "directory",
    "projectPath",
    "project_path",
    "workspaceRoot",
    "workspace_root",
    "path",
];

/// Local command transcripts are emitted as ordinary user records; they are
/// tool plumbing, not conversation.
static COMMAND_TRANSCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*<(?:local-command-(?:stdout|stderr|caveat)|command-(?:name|message|args))\b")
        .unwrap()
});

/// Resolve the message body: the first object-valued envelope key, else the
/// record itself.
pub fn resolve_message(record: &Value) -> &Value {
    for key in MESSAGE_ENVELOPE_KEYS {
        if let Some(inner) = record.get(*key)
            && inner.is_object()
        {
            return inner;
        }
    }
    record
}

/// Role strategies: message role, record role, record sender, record type.
pub fn resolve_role(record: &Value) -> Role {
    let message = resolve_message(record);
    let candidates = [
        message.get("role"),
        record.get("role"),
        record.get("sender"),
        record.get("type"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(s) = candidate.as_str() {
            let role = text::normalize_role(s);
            if role != Role::Other {
                return role;
            }
        }
    }
    Role::Other
}

pub fn record_uuid(record: &Value) -> Option<String> {
    for key in ["uuid", "id"] {
        if let Some(s) = record.get(key).and_then(Value::as_str)
            && !s.trim().is_empty()
        {
            return Some(s.trim().to_string());
        }
    }
    None
}

pub fn record_session_id(record: &Value) -> Option<String> {
    for key in ["sessionId", "session_id"] {
        if let Some(s) = record.get(key).and_then(Value::as_str)
            && !s.trim().is_empty()
        {
            return Some(s.trim().to_string());
        }
    }
    None
}

pub fn record_timestamp_ms(record: &Value) -> i64 {
    for key in ["timestamp", "ts", "created_at", "createdAt"] {
        if let Some(value) = record.get(key) {
            let ms = parse_timestamp_ms(value);
            if ms > 0 {
                return ms;
            }
        }
    }
    0
}

pub fn is_sidechain(record: &Value) -> bool {
    record
        .get("isSidechain")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn is_meta(record: &Value) -> bool {
    record.get("isMeta").and_then(Value::as_bool).unwrap_or(false)
}

/// Model strategies: message model, record model.
pub fn record_model(record: &Value) -> Option<String> {
    let message = resolve_message(record);
    for candidate in [message.get("model"), record.get("model")] {
        if let Some(s) = candidate.and_then(Value::as_str)
            && !s.trim().is_empty()
        {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Visible conversation text for a record. Tool-invocation and tool-result
/// segments are excluded (tracked separately for fork pairing), as are
/// command transcripts and meta records.
pub fn visible_text(record: &Value) -> String {
    if is_meta(record) {
        return String::new();
    }
    let message = resolve_message(record);
    let content = content_slot(message).or_else(|| content_slot(record));
    let Some(content) = content else {
        return String::new();
    };
    let text = match content {
        Value::Array(segments) => {
            let parts: Vec<String> = segments
                .iter()
                .filter(|seg| !is_tool_segment(seg))
                .map(text::extract_text)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join("\n").trim().to_string()
        }
        other => text::extract_text(other),
    };
    if COMMAND_TRANSCRIPT_RE.is_match(&text) {
        return String::new();
    }
    text
}

fn content_slot(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    for key in ["content", "text", "message", "input", "output"] {
        if let Some(slot) = map.get(key)
            && !slot.is_null()
        {
            return Some(slot);
        }
    }
    None
}

fn segment_type(segment: &Value) -> Option<&str> {
    segment.get("type").and_then(Value::as_str)
}

pub fn is_tool_segment(segment: &Value) -> bool {
    matches!(segment_type(segment), Some("tool_use") | Some("tool_result"))
}

/// Pairing id of a `tool_use` segment.
pub fn tool_use_id(segment: &Value) -> Option<&str> {
    if segment_type(segment) != Some("tool_use") {
        return None;
    }
    segment
        .get("id")
        .or_else(|| segment.get("tool_use_id"))
        .and_then(Value::as_str)
}

/// Pairing id of a `tool_result` segment.
pub fn tool_result_id(segment: &Value) -> Option<&str> {
    if segment_type(segment) != Some("tool_result") {
        return None;
    }
    segment
        .get("tool_use_id")
        .or_else(|| segment.get("id"))
        .and_then(Value::as_str)
}

/// Working-directory strategies over the record, then the message envelope.
/// Paths inside the claude projects store are only accepted when nothing
/// better exists; they name the log location, not the workspace.
pub fn record_cwd(record: &Value) -> Option<String> {
    let mut fallback: Option<String> = None;
    for holder in [record, resolve_message(record)] {
        let Some(map) = holder.as_object() else {
            continue;
        };
        for key in CWD_KEYS {
            let Some(s) = map.get(*key).and_then(Value::as_str) else {
                continue;
            };
            let trimmed = s.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.contains("/.claude/projects/") {
                fallback.get_or_insert_with(|| trimmed.to_string());
                continue;
            }
            return Some(trimmed.to_string());
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_from_nested_message() {
        let record = json!({"message": {"role": "assistant", "content": "x"}});
        assert_eq!(resolve_role(&record), Role::Assistant);
    }

    #[test]
    fn role_from_type_tag() {
        let record = json!({"type": "user", "payload": {"content": "x"}});
        assert_eq!(resolve_role(&record), Role::User);
    }

    #[test]
    fn text_skips_tool_segments() {
        let record = json!({
            "message": {
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "before"},
                    {"type": "tool_use", "id": "t1", "name": "bash", "input": {"command": "ls"}},
                    {"type": "text", "text": "after"}
                ]
            }
        });
        assert_eq!(visible_text(&record), "before\nafter");
    }

    #[test]
    fn text_skips_command_transcripts() {
        let record = json!({
            "message": {"role": "user", "content": "<local-command-stdout>ok</local-command-stdout>"}
        });
        assert_eq!(visible_text(&record), "");
    }

    #[test]
    fn text_skips_meta_records() {
        let record = json!({"isMeta": true, "message": {"role": "user", "content": "banner"}});
        assert_eq!(visible_text(&record), "");
    }

    #[test]
    fn tool_ids_prefer_their_canonical_key() {
        let tool_use = json!({"type": "tool_use", "id": "a", "tool_use_id": "b"});
        let tool_result = json!({"type": "tool_result", "id": "a", "tool_use_id": "b"});
        assert_eq!(tool_use_id(&tool_use), Some("a"));
        assert_eq!(tool_result_id(&tool_result), Some("b"));
    }

    #[test]
    fn cwd_demotes_project_store_paths() {
        let record = json!({
            "cwd": "/home/u/.claude/projects/-home-u-app/x",
            "message": {"workingDirectory": "/home/u/app"}
        });
        assert_eq!(record_cwd(&record).as_deref(), Some("/home/u/app"));

        let only_store = json!({"cwd": "/home/u/.claude/projects/-home-u-app/x"});
        assert_eq!(
            record_cwd(&only_store).as_deref(),
            Some("/home/u/.claude/projects/-home-u-app/x")
        );
    }

    #[test]
    fn timestamp_strategies() {
        let record = json!({"timestamp": "2024-05-01T12:00:00Z"});
        assert_eq!(record_timestamp_ms(&record), 1714564800000);
        let record = json!({"ts": 1714564800});
        assert_eq!(record_timestamp_ms(&record), 1714564800000);
        assert_eq!(record_timestamp_ms(&json!({})), 0);
    }
}
