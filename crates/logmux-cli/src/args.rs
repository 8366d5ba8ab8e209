use clap::{Parser, Subcommand};
use logmux_types::Source;
use std::path::PathBuf;
use std::str::FromStr;

fn parse_source(value: &str) -> Result<Source, String> {
    Source::from_str(value)
}

#[derive(Parser)]
#[command(name = "logmux")]
#[command(about = "List, search, inspect, fork, and watch AI agent sessions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to the XDG config location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List recent sessions across all sources")]
    Sessions {
        #[arg(long, value_parser = parse_source)]
        source: Option<Source>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },

    #[command(about = "Keyword search across session logs")]
    Search {
        query: String,

        /// Resume a previous scan from this cursor
        #[arg(long, default_value = "0")]
        cursor: usize,

        /// Files scanned per call
        #[arg(long, default_value = "25")]
        chunk_size: usize,

        /// Keep re-invoking with the returned cursor until the scan completes
        #[arg(long)]
        all: bool,
    },

    #[command(about = "Show the recent turns of one session")]
    Show {
        /// Session key, "source:session_id"
        session_key: String,

        #[arg(long, default_value = "50")]
        max_blocks: usize,
    },

    #[command(about = "Fork a session at a turn into a new resumable log file")]
    Fork {
        /// Session key, "source:session_id"
        session_key: String,

        /// Block id of the target turn (defaults to the latest turn)
        #[arg(long)]
        block: Option<String>,
    },

    #[command(about = "Poll for session changes and stream delta/status events as JSON lines")]
    Watch {
        /// Override the configured poll interval
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    #[command(about = "Write a default config file and print its path")]
    Init,
}
