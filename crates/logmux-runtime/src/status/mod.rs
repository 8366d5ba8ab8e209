pub mod command;
pub mod hints;
pub mod hooks;
pub mod pane;
pub mod service;

pub use command::{analyze_command, LaunchAction};
pub use hints::apply_summary_hints;
pub use hooks::{apply_notify, NotifyPayload};
pub use pane::{apply_pane_command, apply_pane_event, PaneEvent};
pub use service::{Observation, PendingLaunch, StatusService};
