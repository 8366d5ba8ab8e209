use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::short_label;
use crate::status::SessionStatus;

/// Character budget for the `output_head` / `output_tail` previews.
pub const PREVIEW_CHARS: usize = 400;

/// Which external CLI agent produced a log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Claude,
    Codex,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Claude => "claude",
            Source::Codex => "codex",
        }
    }

    pub fn all() -> [Source; 2] {
        [Source::Claude, Source::Codex]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Source::Claude),
            "codex" => Ok(Source::Codex),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// One normalized user/assistant turn pair.
///
/// This is the wire shape consumed by subscribers; field names are part of
/// the contract and must not change without a version bump on the feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationBlock {
    /// Source-prefixed, globally unique (`"claude:<raw>"` / `"codex:<raw>"`).
    pub id: String,
    pub source: Source,
    /// Raw, unprefixed identifier, or a content-hash fallback.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_id: Option<String>,
    pub session_id: String,
    /// Short display form of the session id.
    pub session_label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pane_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pane_label: Option<String>,
    pub input: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub inputs: Vec<String>,
    pub output_text: String,
    pub output_head: String,
    pub output_tail: String,
    pub has_output: bool,
    /// Epoch millis of the user turn.
    pub created_at: i64,
    /// Epoch millis of the latest assistant output; `>= created_at`.
    pub last_output_at: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    /// Set when the log file lives under a WSL mount; carried opaque.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub wsl_distro: Option<String>,
    /// Lineage pointer written by a Time Machine fork.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub forked_from_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source_path: Option<String>,
    /// Fast-path status inferred while normalizing the session tail.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_hint: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_hint_ts: Option<i64>,
}

impl ConversationBlock {
    /// Build a block from assembled turn parts, applying the preview and
    /// `last_output_at >= created_at` invariants. Returns `None` when both
    /// input and output are empty.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        source: Source,
        source_id: Option<String>,
        session_id: String,
        input: String,
        output_text: String,
        created_at: i64,
        last_output_at: i64,
    ) -> Option<Self> {
        if input.trim().is_empty() && output_text.trim().is_empty() {
            return None;
        }
        let raw_id = source_id.clone().unwrap_or_else(|| {
            crate::ids::fallback_source_id(source.as_str(), &input, &output_text, created_at)
        });
        let last_output_at = last_output_at.max(created_at);
        Some(ConversationBlock {
            id: crate::ids::build_block_id(source, &raw_id),
            source,
            source_id: Some(raw_id),
            session_label: short_label(&session_id),
            session_id,
            pane_id: None,
            pane_label: None,
            inputs: if input.is_empty() {
                Vec::new()
            } else {
                vec![input.clone()]
            },
            output_head: head_chars(&output_text, PREVIEW_CHARS),
            output_tail: tail_chars(&output_text, PREVIEW_CHARS),
            has_output: !output_text.trim().is_empty(),
            input,
            output_text,
            created_at,
            last_output_at,
            cwd: None,
            model: None,
            wsl_distro: None,
            forked_from_id: None,
            source_path: None,
            status_hint: None,
            status_hint_ts: None,
        })
    }

    pub fn session_key(&self) -> String {
        crate::session::session_key(self.source, &self.session_id)
    }

    /// Latest activity timestamp, preferring assistant output.
    pub fn activity_at(&self) -> i64 {
        if self.last_output_at > 0 {
            self.last_output_at
        } else {
            self.created_at
        }
    }
}

/// First `max` characters of `text` (character, not byte, boundary).
pub fn head_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Last `max` characters of `text`.
pub fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let skip = count - max;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => text[idx..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_rejects_empty_turn() {
        let block = ConversationBlock::assemble(
            Source::Claude,
            None,
            "abc123".into(),
            "   ".into(),
            "".into(),
            1000,
            1000,
        );
        assert!(block.is_none());
    }

    #[test]
    fn assemble_clamps_last_output_at() {
        let block = ConversationBlock::assemble(
            Source::Codex,
            Some("raw-1".into()),
            "abc123".into(),
            "hello".into(),
            "world".into(),
            5000,
            10,
        )
        .unwrap();
        assert_eq!(block.created_at, 5000);
        assert_eq!(block.last_output_at, 5000);
        assert_eq!(block.id, "codex:raw-1");
        assert!(block.has_output);
    }

    #[test]
    fn fallback_id_is_deterministic() {
        let mk = || {
            ConversationBlock::assemble(
                Source::Claude,
                None,
                "s".into(),
                "same input".into(),
                "same output".into(),
                42,
                42,
            )
            .unwrap()
        };
        assert_eq!(mk().id, mk().id);
    }

    #[test]
    fn previews_respect_char_boundaries() {
        let long: String = "é".repeat(1000);
        let block = ConversationBlock::assemble(
            Source::Claude,
            None,
            "s".into(),
            "in".into(),
            long,
            1,
            1,
        )
        .unwrap();
        assert_eq!(block.output_head.chars().count(), PREVIEW_CHARS);
        assert_eq!(block.output_tail.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let block = ConversationBlock::assemble(
            Source::Claude,
            Some("x".into()),
            "s".into(),
            "hi".into(),
            "".into(),
            1,
            1,
        )
        .unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert!(json.get("cwd").is_none());
        assert!(json.get("forked_from_id").is_none());
        assert_eq!(json["source"], "claude");
    }
}
