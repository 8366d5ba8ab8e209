use crate::output;
use anyhow::Result;
use logmux_index::Repository;
use logmux_types::Source;

pub fn handle(
    repository: &mut Repository,
    source: Option<Source>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut page = repository.list_sessions(limit, true);
    if let Some(source) = source {
        page.sessions.retain(|block| block.source == source);
    }

    if json {
        return output::print_json(&page);
    }

    if page.sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{}",
        output::heading(&format!("{} session(s)", page.sessions.len()))
    );
    for block in &page.sessions {
        let when = output::format_timestamp(block.activity_at());
        let place = block.cwd.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {}  {}",
            output::label(&block.id),
            output::dim(&when),
            output::clip(&block.input, 60),
            output::dim(place),
        );
    }
    if page.has_more {
        println!("{}", output::dim("(more sessions not shown; raise --limit)"));
    }
    Ok(())
}
