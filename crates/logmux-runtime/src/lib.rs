//! Runtime layer: configuration, the polling sync service, and the
//! status engine fed by its collaborators.

pub mod config;
pub mod error;
pub mod events;
pub mod status;
pub mod sync;

pub use config::{Config, SourceConfig, StatusConfig};
pub use error::{Error, Result};
pub use events::{
    SessionSnapshot, SourceMeta, StatusEvent, StatusSnapshot, SyncEvent, SyncPhase, FEED_VERSION,
};
pub use status::{
    apply_notify, apply_pane_command, apply_pane_event, apply_summary_hints, analyze_command,
    LaunchAction, NotifyPayload, Observation, PaneEvent, StatusService,
};
pub use sync::SyncService;
