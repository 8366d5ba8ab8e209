//! Time Machine fork for codex rollout files.
//!
//! The output opens with a synthetic `session_meta` record carrying a fresh
//! UUIDv7 id and a lineage pointer, followed by the source records streamed
//! verbatim through the target turn. Original `session_meta` records are
//! dropped; nothing else in the format carries session identity.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

use super::blocks::{is_synthetic_text, ECHO_WINDOW_MS};
use super::schema::{CodexRecord, ContentSegment, MessagePayload, ResponseItemPayload};
use crate::io::read_head_values;
use crate::traits::{ForkDetail, ForkFailure, ForkOutcome, ForkResult};
use logmux_types::{content_hash, is_uuid_like, parse_timestamp_ms, ConversationBlock, Source};

const HEAD_BYTES: u64 = 16 * 1024;
const DEFAULT_ORIGINATOR: &str = "codex_cli_rs";
const DEFAULT_CLI_VERSION: &str = "0.0.0";

/// How a user record is recognized as the fork target. A target carrying a
/// raw id matches on id equality alone; text equality and timestamp
/// proximity are fallbacks for id-less targets only, since repeated user
/// text would otherwise match an earlier occurrence.
struct TargetKey {
    source_id: Option<String>,
    text: String,
    created_at: i64,
}

impl TargetKey {
    fn from_block(block: &ConversationBlock) -> Self {
        TargetKey {
            source_id: block.source_id.clone().filter(|s| !s.is_empty()),
            text: block.input.trim().to_string(),
            created_at: block.created_at,
        }
    }

    fn matches(&self, session_id: &str, text: &str, ts: i64) -> bool {
        if let Some(source_id) = &self.source_id {
            let raw_id = format!("{}:{}:{}", session_id, ts, content_hash(text));
            return *source_id == raw_id;
        }
        if !self.text.is_empty() && self.text == text.trim() {
            return true;
        }
        self.created_at > 0 && (ts - self.created_at).abs() <= ECHO_WINDOW_MS
    }
}

pub fn fork_session(source_path: &Path, block: &ConversationBlock) -> ForkResult {
    let Some(output_dir) = source_path.parent() else {
        return Err(ForkFailure::new("source file has no parent directory"));
    };

    let new_session_id = Uuid::now_v7().to_string();
    let now = Utc::now();
    let stamp = now.format("%Y-%m-%dT%H-%M-%S");
    let output_path = output_dir.join(format!("rollout-{}-{}.jsonl", stamp, new_session_id));

    let head_cwd = read_head_values(source_path, HEAD_BYTES)
        .iter()
        .find_map(|value| {
            value
                .get("payload")
                .and_then(|p| p.get("cwd"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    let cwd = block.cwd.clone().or(head_cwd).unwrap_or_default();

    let forked_from = Some(block.session_id.as_str())
        .filter(|id| is_uuid_like(id))
        .map(str::to_string);
    let now_iso = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut meta_payload = json!({
        "id": new_session_id,
        "timestamp": now_iso,
        "cwd": cwd,
        "originator": DEFAULT_ORIGINATOR,
        "cli_version": DEFAULT_CLI_VERSION,
        "source": "cli",
    });
    if let Some(forked_from) = &forked_from {
        meta_payload["forked_from_id"] = json!(forked_from);
    }
    let meta_record = json!({
        "timestamp": now_iso,
        "type": "session_meta",
        "payload": meta_payload,
    });

    match copy_through_target(source_path, &output_path, block, &meta_record) {
        Ok(()) => Ok(ForkOutcome {
            source: Source::Codex,
            session_id: new_session_id.clone(),
            command: format!("codex resume {}", new_session_id),
            file_path: output_path,
        }),
        Err(failure) => {
            let _ = std::fs::remove_file(&output_path);
            Err(failure)
        }
    }
}

fn copy_through_target(
    source_path: &Path,
    output_path: &Path,
    block: &ConversationBlock,
    meta_record: &Value,
) -> Result<(), ForkFailure> {
    let target = TargetKey::from_block(block);
    let mut detail = ForkDetail {
        target_source_id: target.source_id.clone(),
        ..ForkDetail::default()
    };

    let reader = BufReader::new(File::open(source_path).map_err(|err| {
        ForkFailure::new(format!(
            "cannot open source file {}: {}",
            source_path.display(),
            err
        ))
    })?);
    let output = File::create_new(output_path).map_err(|err| {
        ForkFailure::new(format!(
            "cannot create output file {}: {}",
            output_path.display(),
            err
        ))
    })?;
    let mut writer = BufWriter::new(output);

    let write_line = |writer: &mut BufWriter<File>, line: &str| -> Result<(), ForkFailure> {
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|err| ForkFailure::new(format!("write failed: {}", err)))
    };

    write_line(&mut writer, &serde_json::to_string(meta_record).unwrap_or_default())?;

    let mut session_id = block.session_id.clone();
    let mut matched = false;
    let mut matched_key: Option<(String, i64)> = None;
    let mut stopped = false;

    for line in reader.lines() {
        let Ok(line) = line else { break };
        detail.total_lines += 1;
        let Ok(value) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        detail.parsed_entries += 1;
        let ts = value.get("timestamp").map(parse_timestamp_ms).unwrap_or(0);

        let record: Option<CodexRecord> = serde_json::from_value(value.clone()).ok();
        if let Some(CodexRecord::SessionMeta(meta)) = &record {
            if let Some(id) = meta.payload.id.as_deref().filter(|id| is_uuid_like(id)) {
                session_id = id.to_string();
            }
            // Replaced by the synthetic head record.
            continue;
        }

        if let Some(CodexRecord::ResponseItem(item)) = &record
            && let ResponseItemPayload::Message(message) = &item.payload
            && let Some(text) = conversational_user_text(message)
        {
            detail.user_entries += 1;
            let key_id = Some(text.clone()).filter(|t| !t.is_empty());
            if detail.first_user_id.is_none() {
                detail.first_user_id = key_id.clone();
            }
            detail.last_user_id = key_id;

            if matched {
                let same = matched_key
                    .as_ref()
                    .is_some_and(|(t, at)| *t == text && (ts - at).abs() <= ECHO_WINDOW_MS);
                if !same {
                    detail.stop_reason = Some("next_user_turn".into());
                    stopped = true;
                    break;
                }
            } else if target.matches(&session_id, &text, ts) {
                matched = true;
                detail.matched_id_entry = true;
                detail.matched_id_user = true;
                matched_key = Some((text, ts));
            }
        }

        write_line(&mut writer, &line)?;
    }

    if !matched {
        detail.stop_reason = Some("target_not_found".into());
        return Err(ForkFailure::with_detail(
            "target turn not found in source file",
            detail,
        ));
    }
    if !stopped {
        detail.stop_reason = Some("end_of_file".into());
    }
    writer
        .flush()
        .map_err(|err| ForkFailure::new(format!("flush failed: {}", err)))
}

/// Visible text of a real (non-synthetic) user message; `None` otherwise.
fn conversational_user_text(message: &MessagePayload) -> Option<String> {
    if message.role != "user" || message.kind.is_some() {
        return None;
    }
    let parts: Vec<&str> = message
        .content
        .iter()
        .filter_map(|segment| match segment {
            ContentSegment::InputText { text } | ContentSegment::Text { text } => {
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();
    let text = parts.join("\n").trim().to_string();
    if text.is_empty() || is_synthetic_text(&text) {
        return None;
    }
    Some(text)
}
