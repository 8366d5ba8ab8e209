//! Source-specific ingestion for logmux.
//!
//! Each supported CLI agent gets a module (`claude`, `codex`) that knows how
//! to find its log files, normalize raw records into conversation blocks,
//! and fork a historical session into a new resumable file. The shared
//! pieces live at the top level: the byte-window JSONL reader ([`io`]),
//! loose text extraction ([`text`]), and the [`traits::LogSource`] seam the
//! index layer consumes.

pub mod cache;
pub mod claude;
pub mod codex;
pub mod io;
pub mod text;
pub mod traits;

pub use claude::ClaudeSource;
pub use codex::CodexSource;
pub use traits::{ForkDetail, ForkFailure, ForkOutcome, ForkResult, LogSource, SessionSlice};
