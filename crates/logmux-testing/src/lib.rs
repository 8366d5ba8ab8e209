//! Test-only builders and environments shared across the workspace.

pub mod builders;
pub mod world;

pub use builders::{fresh_uuid, ClaudeSessionBuilder, CodexSessionBuilder};
pub use world::TestWorld;
