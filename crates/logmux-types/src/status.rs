use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::Source;

/// Live activity state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Working,
    WaitingUser,
    Completed,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Working => "working",
            SessionStatus::WaitingUser => "waiting_user",
            SessionStatus::Completed => "completed",
            SessionStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold the status vocabularies of both sources and the notify hooks into
/// the canonical states. Unknown values map to `None`.
pub fn normalize_status(value: &str) -> Option<SessionStatus> {
    match value.trim().to_ascii_lowercase().as_str() {
        "working" | "running" => Some(SessionStatus::Working),
        "waiting_user" | "waiting" | "needs_permission" | "permission" | "permission_prompt" => {
            Some(SessionStatus::WaitingUser)
        }
        "completed" | "done" => Some(SessionStatus::Completed),
        "stopped" => Some(SessionStatus::Stopped),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    /// Status was seeded as a bind-time default, not observed.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub default_completed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub output_idle: bool,
}

/// One session's tracked status plus its pane binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub session_key: String,
    pub source: Source,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<SessionStatus>,
    pub pane_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub flags: StatusFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_aliases() {
        assert_eq!(normalize_status("running"), Some(SessionStatus::Working));
        assert_eq!(normalize_status("DONE"), Some(SessionStatus::Completed));
        assert_eq!(
            normalize_status("needs_permission"),
            Some(SessionStatus::WaitingUser)
        );
        assert_eq!(normalize_status("stopped"), Some(SessionStatus::Stopped));
        assert_eq!(normalize_status("mystery"), None);
        assert_eq!(normalize_status(""), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_value(SessionStatus::WaitingUser).unwrap();
        assert_eq!(json, "waiting_user");
    }

    #[test]
    fn default_flags_are_omitted() {
        let entry = StatusEntry {
            session_key: "claude:s".into(),
            source: Source::Claude,
            session_id: "s".into(),
            status: Some(SessionStatus::Working),
            pane_id: "pane-1".into(),
            updated_at: Some(1000),
            flags: StatusFlags::default(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["flags"], serde_json::json!({}));
    }
}
