//! Terminal output helpers: color only when writing to a real terminal.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use serde::Serialize;

pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_json_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn heading(text: &str) -> String {
    if use_color() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    if use_color() {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub fn label(text: &str) -> String {
    if use_color() {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_timestamp(ts_ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// First line of a text, clipped to `max` characters.
pub fn clip(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let clipped: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", clipped)
    }
}
