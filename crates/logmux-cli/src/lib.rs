mod args;
mod commands;
mod handlers;
pub mod output;

pub use args::{Cli, Commands};
pub use commands::run;
