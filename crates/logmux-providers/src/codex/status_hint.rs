//! Structural status inference over a codex session tail.
//!
//! The tail scan already decodes every record, so live status can be read
//! off the same stream: unresolved calls mean the agent is working, a
//! pending `request_user_input` call means it is waiting on the user, and
//! an assistant reply after the last user turn with nothing pending means
//! the turn completed.

use std::collections::HashSet;

use logmux_types::{parse_timestamp_ms, SessionStatus};
use serde_json::Value;

use super::schema::{CodexRecord, EventMsgPayload, ResponseItemPayload};

const REQUEST_USER_INPUT: &str = "request_user_input";

#[derive(Debug, Default)]
struct StatusScan {
    saw_user: bool,
    assistant_after_user: bool,
    pending_calls: HashSet<String>,
    pending_requests: HashSet<String>,
    saw_abort: bool,
    last_ts: i64,
}

impl StatusScan {
    fn nothing_pending(&self) -> bool {
        self.pending_calls.is_empty() && self.pending_requests.is_empty()
    }
}

/// Scan decoded records and return the inferred status with the timestamp
/// of the last record that contributed to it. `None` when the tail holds no
/// conversational activity at all.
pub fn infer_status_hint(values: &[Value]) -> Option<(SessionStatus, i64)> {
    let mut scan = StatusScan::default();
    for value in values {
        let Ok(record) = serde_json::from_value::<CodexRecord>(value.clone()) else {
            continue;
        };
        let ts = value
            .get("timestamp")
            .map(parse_timestamp_ms)
            .unwrap_or(0);
        let contributed = match record {
            CodexRecord::ResponseItem(item) => match item.payload {
                ResponseItemPayload::Message(message) => match message.role.as_str() {
                    "user" if message.kind.is_none() => {
                        scan.saw_user = true;
                        scan.assistant_after_user = false;
                        true
                    }
                    "assistant" => {
                        if scan.saw_user {
                            scan.assistant_after_user = true;
                        }
                        true
                    }
                    _ => false,
                },
                ResponseItemPayload::FunctionCall(call) => {
                    if call.name == REQUEST_USER_INPUT {
                        scan.pending_requests.insert(call.call_id);
                    } else {
                        scan.pending_calls.insert(call.call_id);
                    }
                    true
                }
                ResponseItemPayload::CustomToolCall(call) => {
                    if call.name == REQUEST_USER_INPUT {
                        scan.pending_requests.insert(call.call_id);
                    } else {
                        scan.pending_calls.insert(call.call_id);
                    }
                    true
                }
                ResponseItemPayload::FunctionCallOutput(output)
                | ResponseItemPayload::CustomToolCallOutput(output) => {
                    scan.pending_calls.remove(&output.call_id);
                    scan.pending_requests.remove(&output.call_id);
                    true
                }
                ResponseItemPayload::LocalShellCall(call) => {
                    let id = call.call_id.unwrap_or_default();
                    match call.status.as_deref() {
                        Some("completed") => {
                            scan.pending_calls.remove(&id);
                        }
                        Some("in_progress") | Some("incomplete") => {
                            scan.pending_calls.insert(id);
                        }
                        _ => {}
                    }
                    true
                }
                ResponseItemPayload::Unknown => false,
            },
            CodexRecord::EventMsg(msg) => match msg.payload {
                EventMsgPayload::TurnAborted(_) => {
                    scan.saw_abort = true;
                    scan.pending_calls.clear();
                    scan.pending_requests.clear();
                    true
                }
                _ => false,
            },
            _ => false,
        };
        if contributed && ts > scan.last_ts {
            scan.last_ts = ts;
        }
    }

    let status = if scan.saw_abort {
        SessionStatus::Completed
    } else if scan.saw_user && !scan.pending_requests.is_empty() {
        SessionStatus::WaitingUser
    } else if scan.saw_user && scan.assistant_after_user && scan.nothing_pending() {
        SessionStatus::Completed
    } else if scan.saw_user {
        SessionStatus::Working
    } else {
        return None;
    };
    Some((status, scan.last_ts))
}
