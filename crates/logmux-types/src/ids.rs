use chrono::DateTime;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::block::Source;

/// Prefix a raw identifier with its source (`"claude:<raw>"`). A value that
/// already carries the prefix is passed through unchanged.
pub fn build_block_id(source: Source, raw_id: &str) -> String {
    let prefix = format!("{}:", source.as_str());
    if raw_id.starts_with(&prefix) {
        raw_id.to_string()
    } else {
        format!("{}{}", prefix, raw_id)
    }
}

/// Inverse of [`build_block_id`].
pub fn strip_source_prefix(source: Source, id: &str) -> String {
    let prefix = format!("{}:", source.as_str());
    id.strip_prefix(&prefix).unwrap_or(id).to_string()
}

/// Deterministic 16-hex-char content hash.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Identifier for a turn with no explicit raw id. Repeated reads of the same
/// turn collapse to the same value.
pub fn fallback_source_id(prefix: &str, input: &str, output: &str, created_at: i64) -> String {
    let key = format!(
        "{}|{}|{}",
        created_at,
        crate::block::head_chars(input, 200),
        crate::block::head_chars(output, 200)
    );
    format!("{}-{}", prefix, content_hash(&key))
}

/// Epoch millis for "now".
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Best-effort timestamp decoding to epoch millis. Numbers below 1e12 are
/// treated as seconds; strings are tried as a number, then RFC3339. Returns
/// 0 when nothing decodes.
pub fn parse_timestamp_ms(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_f64().map(number_to_ms).unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return 0;
            }
            if let Ok(n) = trimmed.parse::<f64>() {
                return number_to_ms(n);
            }
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.timestamp_millis())
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn number_to_ms(n: f64) -> i64 {
    if !n.is_finite() || n <= 0.0 {
        return 0;
    }
    if n < 1e12 { (n * 1000.0) as i64 } else { n as i64 }
}

/// Accepts hyphenated UUIDs and bare 32-hex forms.
pub fn is_uuid_like(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    Uuid::try_parse(trimmed).is_ok()
}

/// Short display form of a session id (last 6 characters).
pub fn short_label(session_id: &str) -> String {
    let count = session_id.chars().count();
    if count <= 6 {
        return session_id.to_string();
    }
    session_id.chars().skip(count - 6).collect()
}
