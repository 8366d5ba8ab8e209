use crate::output;
use anyhow::Result;
use logmux_index::Repository;

pub fn handle(
    repository: &Repository,
    session_key: &str,
    max_blocks: usize,
    json: bool,
) -> Result<()> {
    let slice = repository.load_session(session_key, max_blocks);

    if json {
        return output::print_json(&slice);
    }

    if slice.blocks.is_empty() {
        println!("No turns found for {}.", session_key);
        return Ok(());
    }

    // Newest-first on the wire; read top to bottom here.
    for block in slice.blocks.iter().rev() {
        println!(
            "{} {}",
            output::heading(&format!("● {}", output::format_timestamp(block.created_at))),
            output::dim(&block.id),
        );
        println!("{}", block.input);
        if block.has_output {
            println!();
            println!("{}", block.output_text);
        }
        println!();
    }
    if slice.maybe_more {
        println!(
            "{}",
            output::dim("(older turns exist beyond the scanned window)")
        );
    }
    Ok(())
}
