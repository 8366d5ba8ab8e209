//! Loose text extraction over schema-free record content.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Other,
}

/// Fold the role vocabularies seen across both log formats.
pub fn normalize_role(value: &str) -> Role {
    match value.trim().to_ascii_lowercase().as_str() {
        "user" | "input" | "client" | "human" => Role::User,
        "assistant" | "output" | "ai" | "bot" => Role::Assistant,
        _ => Role::Other,
    }
}

/// Recursively collect visible text from arbitrarily shaped content: plain
/// strings and numbers pass through, arrays concatenate their text-bearing
/// elements, and objects are probed for a `text` string before recursing
/// into the usual content slots.
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(extract_text)
                .filter(|s| !s.is_empty())
                .collect();
            parts.join("\n").trim().to_string()
        }
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                return text.clone();
            }
            for key in ["content", "message", "input", "output"] {
                if let Some(inner) = map.get(key) {
                    let text = extract_text(inner);
                    if !text.is_empty() {
                        return text;
                    }
                }
            }
            String::new()
        }
        Value::Null => String::new(),
    }
}

/// Collapse runs of whitespace and truncate to `max` characters; used for
/// dedup keys and fork target matching.
pub fn normalize_for_key(text: &str, max: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    logmux_types::block::head_chars(collapsed.trim(), max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_fold() {
        assert_eq!(normalize_role("Human"), Role::User);
        assert_eq!(normalize_role("ai"), Role::Assistant);
        assert_eq!(normalize_role("system"), Role::Other);
    }

    #[test]
    fn string_passes_through() {
        assert_eq!(extract_text(&json!("hello")), "hello");
    }

    #[test]
    fn array_joins_text_segments() {
        let content = json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]);
        assert_eq!(extract_text(&content), "a\nb");
    }

    #[test]
    fn object_probes_content_slots() {
        assert_eq!(extract_text(&json!({"content": "inner"})), "inner");
        assert_eq!(extract_text(&json!({"message": {"text": "deep"}})), "deep");
        assert_eq!(extract_text(&json!({"unrelated": 1})), "");
    }

    #[test]
    fn key_normalization_collapses_whitespace() {
        assert_eq!(normalize_for_key("  a\n\n b\tc  ", 100), "a b c");
        assert_eq!(normalize_for_key("abcdef", 3), "abc");
    }
}
