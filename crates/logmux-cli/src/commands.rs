use crate::args::{Cli, Commands};
use crate::handlers;
use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    let config = handlers::load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Sessions { source, limit } => {
            let mut repository = handlers::open_repository(&config)?;
            handlers::sessions::handle(&mut repository, source, limit, cli.json)
        }
        Commands::Search {
            query,
            cursor,
            chunk_size,
            all,
        } => {
            let mut repository = handlers::open_repository(&config)?;
            handlers::search::handle(&mut repository, &query, cursor, chunk_size, all, cli.json)
        }
        Commands::Show {
            session_key,
            max_blocks,
        } => {
            let repository = handlers::open_repository(&config)?;
            handlers::show::handle(&repository, &session_key, max_blocks, cli.json)
        }
        Commands::Fork { session_key, block } => {
            let repository = handlers::open_repository(&config)?;
            handlers::fork::handle(&repository, &session_key, block.as_deref(), cli.json)
        }
        Commands::Watch { interval_ms } => {
            let repository = handlers::open_repository(&config)?;
            handlers::watch::handle(repository, &config, interval_ms)
        }
        Commands::Init => handlers::init::handle(cli.config.as_ref()),
    }
}
