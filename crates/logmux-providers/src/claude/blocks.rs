//! Turn accumulation for claude logs.
//!
//! The stream is folded through an explicit state struct and a `step`
//! function: a user record flushes the pending turn and seeds a new one, an
//! assistant record extends it, and session metadata is captured first-wins
//! as it scrolls past.

use logmux_types::{ConversationBlock, Source};
use serde_json::Value;

use super::extract;
use crate::text::Role;

#[derive(Debug, Default)]
pub struct TurnState {
    current: Option<Turn>,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug)]
struct Turn {
    uuid: Option<String>,
    user_text: String,
    assistant_texts: Vec<String>,
    created_at: i64,
    last_output_at: i64,
}

impl TurnState {
    pub fn seeded(session_id: Option<&str>) -> Self {
        TurnState {
            session_id: session_id.map(str::to_string),
            ..TurnState::default()
        }
    }

    fn flush(&mut self) -> Option<ConversationBlock> {
        let turn = self.current.take()?;
        let output = turn.assistant_texts.join("\n\n");
        let mut block = ConversationBlock::assemble(
            Source::Claude,
            turn.uuid,
            self.session_id.clone().unwrap_or_default(),
            turn.user_text,
            output,
            turn.created_at,
            turn.last_output_at,
        )?;
        block.cwd = self.cwd.clone();
        block.model = self.model.clone();
        Some(block)
    }
}

/// Advance the automaton by one record, possibly emitting a completed turn.
pub fn step(state: &mut TurnState, record: &Value) -> Option<ConversationBlock> {
    if extract::is_sidechain(record) {
        return None;
    }
    if state.session_id.is_none() {
        state.session_id = extract::record_session_id(record);
    }
    if state.cwd.is_none() {
        state.cwd = extract::record_cwd(record);
    }
    let ts = extract::record_timestamp_ms(record);
    match extract::resolve_role(record) {
        Role::User => {
            let text = extract::visible_text(record);
            if text.is_empty() {
                // Tool-result carriers, meta records, and command
                // transcripts sit inside a turn, not at its boundary.
                return None;
            }
            let flushed = state.current.is_some().then(|| state.flush()).flatten();
            state.current = Some(Turn {
                uuid: extract::record_uuid(record),
                user_text: text,
                assistant_texts: Vec::new(),
                created_at: ts,
                last_output_at: ts,
            });
            flushed
        }
        Role::Assistant => {
            if let Some(model) = extract::record_model(record) {
                state.model = Some(model);
            }
            let text = extract::visible_text(record);
            let turn = state.current.get_or_insert_with(|| Turn {
                uuid: extract::record_uuid(record),
                user_text: String::new(),
                assistant_texts: Vec::new(),
                created_at: ts,
                last_output_at: ts,
            });
            if !text.is_empty() {
                turn.assistant_texts.push(text);
            }
            if ts > turn.last_output_at {
                turn.last_output_at = ts;
            }
            None
        }
        Role::Other => None,
    }
}

/// Flush the final pending turn at end of stream.
pub fn finish(state: &mut TurnState) -> Option<ConversationBlock> {
    state.flush()
}

/// Fold a record slice into blocks. `seed_session_id` covers files whose
/// records omit the session id (it is also the file name).
pub fn stream_to_blocks(records: &[Value], seed_session_id: Option<&str>) -> Vec<ConversationBlock> {
    let mut state = TurnState::seeded(seed_session_id);
    let mut blocks = Vec::new();
    for record in records {
        if let Some(block) = step(&mut state, record) {
            blocks.push(block);
        }
    }
    if let Some(block) = finish(&mut state) {
        blocks.push(block);
    }
    blocks
}
