//! Builders that render realistic session log files line by line.
//!
//! Each builder accumulates raw records in log order and serializes them
//! as JSONL, so tests control exactly which record shapes a fixture
//! exercises.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

fn iso(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds a claude project-store session file.
pub struct ClaudeSessionBuilder {
    pub session_id: String,
    cwd: String,
    model: String,
    records: Vec<Value>,
}

impl ClaudeSessionBuilder {
    pub fn new(session_id: &str, cwd: &str) -> Self {
        ClaudeSessionBuilder {
            session_id: session_id.to_string(),
            cwd: cwd.to_string(),
            model: "claude-sonnet-4-5".to_string(),
            records: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn base(&self, record_type: &str, uuid: &str, ts_ms: i64) -> Value {
        json!({
            "type": record_type,
            "uuid": uuid,
            "sessionId": self.session_id,
            "timestamp": iso(ts_ms),
            "cwd": self.cwd,
            "isSidechain": false,
        })
    }

    pub fn user(mut self, uuid: &str, text: &str, ts_ms: i64) -> Self {
        let mut record = self.base("user", uuid, ts_ms);
        record["message"] = json!({
            "role": "user",
            "content": [{"type": "text", "text": text}],
        });
        self.records.push(record);
        self
    }

    pub fn assistant(mut self, uuid: &str, text: &str, ts_ms: i64) -> Self {
        let mut record = self.base("assistant", uuid, ts_ms);
        record["message"] = json!({
            "role": "assistant",
            "model": self.model,
            "content": [{"type": "text", "text": text}],
        });
        self.records.push(record);
        self
    }

    /// Assistant record carrying a tool invocation alongside its text.
    pub fn assistant_tool_use(
        mut self,
        uuid: &str,
        text: &str,
        tool_use_id: &str,
        ts_ms: i64,
    ) -> Self {
        let mut record = self.base("assistant", uuid, ts_ms);
        record["message"] = json!({
            "role": "assistant",
            "model": self.model,
            "content": [
                {"type": "text", "text": text},
                {"type": "tool_use", "id": tool_use_id, "name": "Bash", "input": {"command": "ls"}},
            ],
        });
        self.records.push(record);
        self
    }

    /// User record carrying a tool result, as the CLI writes them.
    pub fn tool_result(mut self, uuid: &str, tool_use_id: &str, ts_ms: i64) -> Self {
        let mut record = self.base("user", uuid, ts_ms);
        record["message"] = json!({
            "role": "user",
            "content": [{"type": "tool_result", "tool_use_id": tool_use_id, "content": "ok"}],
        });
        self.records.push(record);
        self
    }

    pub fn meta_banner(mut self, uuid: &str, ts_ms: i64) -> Self {
        let mut record = self.base("user", uuid, ts_ms);
        record["isMeta"] = json!(true);
        record["message"] = json!({"role": "user", "content": "startup banner"});
        self.records.push(record);
        self
    }

    pub fn raw(mut self, record: Value) -> Self {
        self.records.push(record);
        self
    }

    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }
}

/// Builds a codex rollout file.
pub struct CodexSessionBuilder {
    pub session_id: String,
    cwd: String,
    records: Vec<Value>,
}

impl CodexSessionBuilder {
    pub fn new(session_id: &str, cwd: &str) -> Self {
        CodexSessionBuilder {
            session_id: session_id.to_string(),
            cwd: cwd.to_string(),
            records: Vec::new(),
        }
    }

    pub fn meta(mut self, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "session_meta",
            "payload": {
                "id": self.session_id,
                "timestamp": iso(ts_ms),
                "cwd": self.cwd,
                "originator": "codex_cli_rs",
                "cli_version": "0.42.0",
            },
        }));
        self
    }

    pub fn turn_context(mut self, model: &str, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "turn_context",
            "payload": {"cwd": self.cwd, "model": model},
        }));
        self
    }

    pub fn user(mut self, text: &str, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "response_item",
            "payload": {
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": text}],
            },
        }));
        self
    }

    pub fn assistant(mut self, text: &str, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "response_item",
            "payload": {
                "type": "message",
                "role": "assistant",
                "content": [{"type": "output_text", "text": text}],
            },
        }));
        self
    }

    pub fn function_call(mut self, call_id: &str, name: &str, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "response_item",
            "payload": {
                "type": "function_call",
                "name": name,
                "arguments": "{}",
                "call_id": call_id,
            },
        }));
        self
    }

    pub fn function_call_output(mut self, call_id: &str, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "response_item",
            "payload": {
                "type": "function_call_output",
                "call_id": call_id,
                "output": "done",
            },
        }));
        self
    }

    pub fn environment_context(mut self, ts_ms: i64) -> Self {
        self.records.push(json!({
            "timestamp": iso(ts_ms),
            "type": "response_item",
            "payload": {
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": "<environment_context>os=linux</environment_context>"}],
            },
        }));
        self
    }

    pub fn raw(mut self, record: Value) -> Self {
        self.records.push(record);
        self
    }

    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }

    /// Canonical rollout file name for this session at `ts_ms`.
    pub fn file_name(&self, ts_ms: i64) -> String {
        let stamp = DateTime::<Utc>::from_timestamp_millis(ts_ms)
            .unwrap_or_default()
            .format("%Y-%m-%dT%H-%M-%S");
        format!("rollout-{}-{}.jsonl", stamp, self.session_id)
    }
}

/// A fresh v4 id for sessions and record uuids.
pub fn fresh_uuid() -> String {
    Uuid::new_v4().to_string()
}
