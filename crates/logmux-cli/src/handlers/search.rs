use crate::output;
use anyhow::Result;
use logmux_index::{Repository, SearchPage};

pub fn handle(
    repository: &mut Repository,
    query: &str,
    cursor: usize,
    chunk_size: usize,
    all: bool,
    json: bool,
) -> Result<()> {
    let mut page = repository.search(query, cursor, chunk_size);
    if all {
        while let Some(next) = page.next_cursor {
            let more = repository.search(query, next, chunk_size);
            page.hits.extend(more.hits);
            page.next_cursor = more.next_cursor;
        }
    }

    if json {
        return output::print_json(&page);
    }
    print_page(query, &page);
    Ok(())
}

fn print_page(query: &str, page: &SearchPage) {
    if page.hits.is_empty() {
        println!("No matches for \"{}\".", query);
    } else {
        println!(
            "{}",
            output::heading(&format!("{} hit(s) for \"{}\"", page.hits.len(), query))
        );
        for hit in &page.hits {
            println!(
                "{}  {:.2}  {}  {}",
                output::label(&hit.block.id),
                hit.score,
                output::clip(&hit.block.input, 60),
                output::dim(&hit.why),
            );
        }
    }
    match page.next_cursor {
        Some(cursor) => println!(
            "{}",
            output::dim(&format!("(scan incomplete; resume with --cursor {})", cursor))
        ),
        None => println!("{}", output::dim("(scan complete)")),
    }
}
