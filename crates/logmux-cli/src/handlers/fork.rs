use crate::output;
use anyhow::Result;
use logmux_index::Repository;
use serde_json::json;

/// How many recent turns are searched for the fork target.
const TARGET_SCAN_BLOCKS: usize = 500;

pub fn handle(
    repository: &Repository,
    session_key: &str,
    block_id: Option<&str>,
    json: bool,
) -> Result<()> {
    let slice = repository.load_session(session_key, TARGET_SCAN_BLOCKS);
    let target = match block_id {
        Some(id) => slice
            .blocks
            .iter()
            .find(|b| b.id == id || b.source_id.as_deref() == Some(id)),
        None => slice.blocks.first(),
    };
    let Some(target) = target else {
        anyhow::bail!("no matching turn found in {}", session_key);
    };

    match repository.fork(target) {
        Ok(outcome) => {
            if json {
                output::print_json(&outcome)?;
            } else {
                println!("Forked {} at {}", session_key, output::label(&target.id));
                println!("  file:   {}", outcome.file_path.display());
                println!("  resume: {}", output::heading(&outcome.command));
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                output::print_json(&json!({
                    "error": failure.error,
                    "detail": failure.detail,
                }))?;
            } else {
                eprintln!("Fork failed: {}", failure.error);
                eprintln!("  {}", serde_json::to_string(&failure.detail)?);
            }
            std::process::exit(1);
        }
    }
}
