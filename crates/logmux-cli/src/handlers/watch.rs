use crate::output;
use anyhow::Result;
use logmux_index::Repository;
use logmux_runtime::{apply_summary_hints, Config, StatusService, SyncEvent, SyncService};
use logmux_types::ConversationBlock;

/// Stream delta, invalidate, and status events as JSON lines until killed.
pub fn handle(repository: Repository, config: &Config, interval_ms: Option<u64>) -> Result<()> {
    let mut config = config.clone();
    if let Some(interval) = interval_ms {
        config.poll_interval_ms = interval;
    }

    let sync = SyncService::spawn(repository, &config)?;
    let mut status = StatusService::new(config.status.max_entries);

    while let Ok(event) = sync.events().recv() {
        output::print_json_line(&event)?;

        if let SyncEvent::Delta { added, updated, .. } = &event {
            let summaries: Vec<ConversationBlock> =
                added.iter().chain(updated.iter()).cloned().collect();
            let status_event = apply_summary_hints(&mut status, &summaries);
            if !status_event.is_empty() {
                output::print_json_line(&status_event)?;
            }
        }
    }
    Ok(())
}
