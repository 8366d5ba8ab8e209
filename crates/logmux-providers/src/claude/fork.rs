//! Time Machine fork for claude session files.
//!
//! Two streaming passes over the source file. Pass one locates the cut
//! point (the record after the target turn's assistant output) and collects
//! the tool-call pairs that are complete before it. Pass two rewrites
//! session-id fields to the new identifier, drops orphaned tool halves, and
//! writes the output file, which must not already exist.

use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

use super::extract;
use crate::text::Role;
use crate::traits::{ForkDetail, ForkFailure, ForkOutcome, ForkResult};
use logmux_types::Source;

/// Session-identity keys rewritten at every known nesting level.
const SESSION_ID_KEYS: &[&str] = &[
    "session_id",
    "sessionId",
    "thread_id",
    "threadId",
    "conversation_id",
    "conversationId",
    "session",
    "thread",
    "conversation",
];

/// Envelopes that may themselves carry session-identity keys.
const REWRITE_ENVELOPES: &[&str] = &["message", "meta", "metadata", "context", "payload"];

struct CutScan {
    /// Line index one past the last line to keep.
    cut_end: usize,
    valid_tool_ids: HashSet<String>,
    detail: ForkDetail,
}

pub fn fork_session(source_path: &Path, output_dir: &Path, target_uuid: &str) -> ForkResult {
    let scan = match scan_for_cut(source_path, target_uuid) {
        Ok(scan) => scan,
        Err(failure) => return Err(failure),
    };

    let new_session_id = Uuid::new_v4().to_string();
    let output_path = output_dir.join(format!("{}.jsonl", new_session_id));

    if let Err(err) = write_fork(source_path, &output_path, &scan, &new_session_id) {
        let _ = std::fs::remove_file(&output_path);
        return Err(ForkFailure::with_detail(
            format!("failed to write forked session: {}", err),
            scan.detail,
        ));
    }

    Ok(ForkOutcome {
        source: Source::Claude,
        session_id: new_session_id.clone(),
        command: format!("claude -r {}", new_session_id),
        file_path: output_path,
    })
}

fn scan_for_cut(source_path: &Path, target_uuid: &str) -> Result<CutScan, ForkFailure> {
    let file = File::open(source_path).map_err(|err| {
        ForkFailure::new(format!(
            "cannot open source file {}: {}",
            source_path.display(),
            err
        ))
    })?;
    let reader = BufReader::new(file);

    let mut detail = ForkDetail {
        target_source_id: Some(target_uuid.to_string()),
        ..ForkDetail::default()
    };
    let mut matched = false;
    let mut cut_end: Option<usize> = None;
    let mut tool_uses_before_cut: Vec<String> = Vec::new();
    let mut tool_results_before_cut: HashSet<String> = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let Ok(line) = line else { break };
        detail.total_lines += 1;
        let Ok(record) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        detail.parsed_entries += 1;
        if cut_end.is_some() {
            continue;
        }

        let uuid = extract::record_uuid(&record);
        // Tool-result carriers are user-typed records with no visible
        // text; they sit inside a turn, not at its boundary.
        let is_user = extract::resolve_role(&record) == Role::User
            && !extract::is_meta(&record)
            && !extract::visible_text(&record).is_empty();
        if uuid.as_deref() == Some(target_uuid) {
            detail.matched_id_entry = true;
        }
        if is_user {
            detail.user_entries += 1;
            if detail.first_user_id.is_none() {
                detail.first_user_id = uuid.clone();
            }
            detail.last_user_id = uuid.clone();
            if matched {
                // The next user turn closes the target's output window.
                cut_end = Some(index);
                detail.stop_reason = Some("next_user_turn".into());
                continue;
            }
            if uuid.as_deref() == Some(target_uuid) {
                matched = true;
                detail.matched_id_user = true;
            }
        }
        collect_tool_ids(&record, &mut tool_uses_before_cut, &mut tool_results_before_cut);
    }

    if !matched {
        return Err(ForkFailure::with_detail(
            format!("target turn {} not found in source file", target_uuid),
            detail,
        ));
    }
    let cut_end = cut_end.unwrap_or_else(|| {
        detail.stop_reason = Some("end_of_file".into());
        detail.total_lines
    });

    // A pair is valid only when both halves appear before the cut.
    let valid_tool_ids: HashSet<String> = tool_uses_before_cut
        .into_iter()
        .filter(|id| tool_results_before_cut.contains(id))
        .collect();

    Ok(CutScan {
        cut_end,
        valid_tool_ids,
        detail,
    })
}

fn collect_tool_ids(record: &Value, uses: &mut Vec<String>, results: &mut HashSet<String>) {
    let message = extract::resolve_message(record);
    let Some(segments) = message.get("content").and_then(Value::as_array) else {
        return;
    };
    for segment in segments {
        if let Some(id) = extract::tool_use_id(segment) {
            uses.push(id.to_string());
        }
        if let Some(id) = extract::tool_result_id(segment) {
            results.insert(id.to_string());
        }
    }
}

fn write_fork(
    source_path: &Path,
    output_path: &Path,
    scan: &CutScan,
    new_session_id: &str,
) -> std::io::Result<()> {
    let reader = BufReader::new(File::open(source_path)?);
    let output = File::create_new(output_path)?;
    let mut writer = BufWriter::new(output);

    for (index, line) in reader.lines().enumerate() {
        if index >= scan.cut_end {
            break;
        }
        let line = line?;
        let Ok(mut record) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if !filter_tool_segments(&mut record, &scan.valid_tool_ids) {
            // All content was orphaned tool halves; drop the record.
            continue;
        }
        rewrite_session_ids(&mut record, new_session_id);
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Drop tool segments whose pair is incomplete. Returns `false` when the
/// record's content array becomes empty.
fn filter_tool_segments(record: &mut Value, valid_ids: &HashSet<String>) -> bool {
    let envelope_key = ["message", "payload", "data"]
        .iter()
        .find(|k| record.get(**k).is_some_and(|v| v.is_object()))
        .copied();
    let message = match envelope_key {
        Some(key) => record.get_mut(key).unwrap(),
        None => record,
    };
    let Some(segments) = message.get_mut("content").and_then(Value::as_array_mut) else {
        return true;
    };
    let had_segments = !segments.is_empty();
    segments.retain(|segment| {
        if let Some(id) = extract::tool_use_id(segment) {
            return valid_ids.contains(id);
        }
        if let Some(id) = extract::tool_result_id(segment) {
            return valid_ids.contains(id);
        }
        true
    });
    !(had_segments && segments.is_empty())
}

/// Rewrite session-identity string fields at the top level and inside the
/// known envelopes (one nested payload level included).
fn rewrite_session_ids(record: &mut Value, new_session_id: &str) {
    rewrite_in(record, new_session_id);
    for envelope in REWRITE_ENVELOPES {
        if let Some(inner) = record.get_mut(*envelope) {
            rewrite_in(inner, new_session_id);
            if let Some(nested) = inner.get_mut("payload") {
                rewrite_in(nested, new_session_id);
            }
        }
    }
}

fn rewrite_in(value: &mut Value, new_session_id: &str) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    for key in SESSION_ID_KEYS {
        if let Some(slot) = map.get_mut(*key)
            && slot.is_string()
        {
            *slot = Value::String(new_session_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rewrites_nested_session_ids() {
        let mut record = json!({
            "sessionId": "old",
            "message": {"session_id": "old", "content": "x"},
            "payload": {"payload": {"threadId": "old"}}
        });
        rewrite_session_ids(&mut record, "new");
        assert_eq!(record["sessionId"], "new");
        assert_eq!(record["message"]["session_id"], "new");
        assert_eq!(record["payload"]["payload"]["threadId"], "new");
    }

    #[test]
    fn orphaned_tool_use_is_dropped() {
        let valid: HashSet<String> = ["kept".to_string()].into();
        let mut record = json!({
            "message": {"content": [
                {"type": "tool_use", "id": "kept"},
                {"type": "tool_use", "id": "orphan"},
                {"type": "text", "text": "hi"}
            ]}
        });
        assert!(filter_tool_segments(&mut record, &valid));
        let segments = record["message"]["content"].as_array().unwrap();
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn record_emptied_by_filtering_is_removed() {
        let valid = HashSet::new();
        let mut record = json!({
            "message": {"content": [{"type": "tool_result", "tool_use_id": "orphan"}]}
        });
        assert!(!filter_tool_segments(&mut record, &valid));
    }

    #[test]
    fn string_content_is_untouched() {
        let valid = HashSet::new();
        let mut record = json!({"message": {"content": "plain"}});
        assert!(filter_tool_segments(&mut record, &valid));
        assert_eq!(record["message"]["content"], "plain");
    }
}
