//! Canonical data model shared by every logmux crate.
//!
//! The central entity is [`ConversationBlock`], one normalized user/assistant
//! turn pair. Everything else here exists to identify, order, and track the
//! sessions those blocks belong to.

pub mod block;
pub mod ids;
pub mod session;
pub mod status;

pub use block::{ConversationBlock, Source, PREVIEW_CHARS};
pub use ids::{
    build_block_id, content_hash, fallback_source_id, is_uuid_like, now_ms, parse_timestamp_ms,
    short_label, strip_source_prefix,
};
pub use session::{
    compare_summaries, session_fingerprint, session_key, split_session_key, LogFileInfo,
    SessionIndexEntry,
};
pub use status::{normalize_status, SessionStatus, StatusEntry, StatusFlags};
