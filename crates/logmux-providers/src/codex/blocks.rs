//! Turn accumulation for codex rollout files.
//!
//! Codex tails are re-scanned from overlapping windows on every poll, so on
//! top of the turn automaton this module carries two dedup layers: an echo
//! filter for the same message appearing twice within a short window, and a
//! cross-poll key that collapses repeated observations of one turn, keeping
//! the longest output.

use std::collections::HashMap;

use logmux_types::{
    content_hash, is_uuid_like, parse_timestamp_ms, ConversationBlock, Source,
};
use serde_json::Value;

use super::schema::{CodexRecord, ContentSegment, MessagePayload, ResponseItemPayload};
use crate::text::normalize_for_key;

/// Two observations of the same role/text within this window are echoes.
pub const ECHO_WINDOW_MS: i64 = 2_000;
/// Bucket width of the cross-poll dedup key.
pub const DEDUP_BUCKET_MS: i64 = 60_000;

/// Records whose user text starts with one of these is tool plumbing, not
/// conversation.
const SYNTHETIC_PREFIXES: &[&str] = &[
    "<environment_context>",
    "<user_shell_command>",
    "<user_instructions>",
    "<skill",
    "# AGENTS.md instructions for ",
];

#[derive(Debug, Default)]
pub struct TurnState {
    pub session_id: String,
    pub forked_from_id: Option<String>,
    pub cwd: Option<String>,
    pub model: Option<String>,
    current: Option<Turn>,
    recent_echoes: HashMap<String, i64>,
}

#[derive(Debug)]
struct Turn {
    user_text: String,
    assistant_texts: Vec<String>,
    created_at: i64,
    last_output_at: i64,
}

impl TurnState {
    pub fn seeded(session_id: &str) -> Self {
        TurnState {
            session_id: session_id.to_string(),
            ..TurnState::default()
        }
    }

    fn flush(&mut self) -> Option<ConversationBlock> {
        let turn = self.current.take()?;
        let raw_id = format!(
            "{}:{}:{}",
            self.session_id,
            turn.created_at,
            content_hash(&turn.user_text)
        );
        let output = turn.assistant_texts.join("\n\n");
        let mut block = ConversationBlock::assemble(
            Source::Codex,
            Some(raw_id),
            self.session_id.clone(),
            turn.user_text,
            output,
            turn.created_at,
            turn.last_output_at,
        )?;
        block.cwd = self.cwd.clone();
        block.model = self.model.clone();
        block.forked_from_id = self.forked_from_id.clone();
        Some(block)
    }

    fn is_echo(&mut self, role: &str, text: &str, ts: i64) -> bool {
        let key = format!("{}:{}", role, text);
        if let Some(prev) = self.recent_echoes.get(&key)
            && (ts - prev).abs() <= ECHO_WINDOW_MS
        {
            return true;
        }
        self.recent_echoes.insert(key, ts);
        false
    }
}

pub fn is_synthetic_text(text: &str) -> bool {
    SYNTHETIC_PREFIXES
        .iter()
        .any(|prefix| text.trim_start().starts_with(prefix))
}

fn message_text(message: &MessagePayload) -> String {
    let parts: Vec<&str> = message
        .content
        .iter()
        .filter_map(|segment| match (segment, message.role.as_str()) {
            (ContentSegment::InputText { text }, "user") => Some(text.as_str()),
            (ContentSegment::OutputText { text }, "assistant") => Some(text.as_str()),
            (ContentSegment::Text { text }, _) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    parts.join("\n").trim().to_string()
}

fn record_timestamp_ms(value: &Value) -> i64 {
    value
        .get("timestamp")
        .map(parse_timestamp_ms)
        .unwrap_or(0)
}

/// Advance the automaton by one raw line, possibly emitting a turn.
pub fn step(state: &mut TurnState, value: &Value) -> Option<ConversationBlock> {
    let record: CodexRecord = serde_json::from_value(value.clone()).ok()?;
    let ts = record_timestamp_ms(value);
    match record {
        CodexRecord::SessionMeta(meta) => {
            if let Some(id) = meta.payload.id.as_deref().filter(|id| is_uuid_like(id)) {
                state.session_id = id.to_string();
            }
            if let Some(forked) = meta.payload.forked_from_id.filter(|s| !s.is_empty()) {
                state.forked_from_id = Some(forked);
            }
            if state.cwd.is_none() {
                state.cwd = meta.payload.cwd.filter(|s| !s.is_empty());
            }
            None
        }
        CodexRecord::TurnContext(ctx) => {
            if state.cwd.is_none() {
                state.cwd = ctx.payload.cwd.filter(|s| !s.is_empty());
            }
            if let Some(model) = ctx.payload.model.filter(|s| !s.is_empty()) {
                state.model = Some(model);
            }
            None
        }
        CodexRecord::ResponseItem(item) => match item.payload {
            ResponseItemPayload::Message(message) => {
                if message.role == "system" {
                    return None;
                }
                let text = message_text(&message);
                if text.is_empty() || state.is_echo(&message.role, &text, ts) {
                    return None;
                }
                match message.role.as_str() {
                    "user" => {
                        if message.kind.is_some() || is_synthetic_text(&text) {
                            return None;
                        }
                        let flushed = state.flush();
                        state.current = Some(Turn {
                            user_text: text,
                            assistant_texts: Vec::new(),
                            created_at: ts,
                            last_output_at: ts,
                        });
                        flushed
                    }
                    "assistant" => {
                        let turn = state.current.get_or_insert_with(|| Turn {
                            user_text: String::new(),
                            assistant_texts: Vec::new(),
                            created_at: ts,
                            last_output_at: ts,
                        });
                        turn.assistant_texts.push(text);
                        if ts > turn.last_output_at {
                            turn.last_output_at = ts;
                        }
                        None
                    }
                    _ => None,
                }
            }
            _ => None,
        },
        CodexRecord::EventMsg(_) => {
            // Message events duplicate response items; they only matter for
            // the structural status scan.
            None
        }
        CodexRecord::Unknown => None,
    }
}

pub fn finish(state: &mut TurnState) -> Option<ConversationBlock> {
    state.flush()
}

pub fn stream_to_blocks(values: &[Value], seed_session_id: &str) -> Vec<ConversationBlock> {
    let mut state = TurnState::seeded(seed_session_id);
    let mut blocks = Vec::new();
    for value in values {
        if let Some(block) = step(&mut state, value) {
            blocks.push(block);
        }
    }
    if let Some(block) = finish(&mut state) {
        blocks.push(block);
    }
    blocks
}

/// Cross-poll dedup key: pane or path, time bucket, normalized truncated
/// input/output, and fork lineage when present.
pub fn dedup_key(block: &ConversationBlock) -> String {
    let pane = block
        .pane_id
        .as_deref()
        .or(block.source_path.as_deref())
        .unwrap_or("");
    let bucket = block.created_at.div_euclid(DEDUP_BUCKET_MS);
    let lineage = if block.forked_from_id.is_some() {
        block.session_id.as_str()
    } else {
        ""
    };
    format!(
        "{}|{}|{}|{}|{}",
        pane,
        bucket,
        normalize_for_key(&block.input, 200),
        normalize_for_key(&block.output_text, 200),
        lineage
    )
}

/// Collapse blocks sharing a dedup key, keeping the longer output. Order of
/// first occurrence is preserved.
pub fn merge_deduped(blocks: Vec<ConversationBlock>) -> Vec<ConversationBlock> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, ConversationBlock> = HashMap::new();
    for block in blocks {
        let key = dedup_key(&block);
        match by_key.get_mut(&key) {
            Some(existing) => {
                if block.output_text.len() > existing.output_text.len() {
                    *existing = block;
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, block);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}
