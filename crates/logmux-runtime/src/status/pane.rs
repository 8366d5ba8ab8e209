//! Pane lifecycle events from the terminal collaborator.

use crate::events::StatusEvent;
use crate::status::command::{analyze_command, LaunchAction};
use crate::status::service::StatusService;
use logmux_types::Source;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneEvent {
    Open,
    Close,
    /// The shell prompt returned, so whatever ran in the pane is gone.
    Prompt,
}

pub fn apply_pane_event(
    service: &mut StatusService,
    pane_id: &str,
    event: PaneEvent,
) -> StatusEvent {
    match event {
        PaneEvent::Open => StatusEvent::update(Vec::new(), Vec::new()),
        PaneEvent::Close | PaneEvent::Prompt => service.remove_sessions_for_pane(pane_id),
    }
}

/// A raw command line executed in a pane. Recognized launches either bind
/// a session directly or record a pending launch keyed by the pane.
pub fn apply_pane_command(
    service: &mut StatusService,
    pane_id: &str,
    cwd: Option<&str>,
    command: &str,
) -> StatusEvent {
    match analyze_command(command) {
        LaunchAction::BindSession { session_id } => {
            service.bind_session_to_pane(Source::Codex, &session_id, pane_id)
        }
        LaunchAction::PendingLaunch => {
            service.record_pending_launch(pane_id, cwd.map(str::to_string));
            StatusEvent::update(Vec::new(), Vec::new())
        }
        LaunchAction::None => StatusEvent::update(Vec::new(), Vec::new()),
    }
}
