//! Routes dispatched actions to their handlers.

use serde::Serialize;
use tracing::debug;

use handwave_common::clock::TimestampMs;
use handwave_common::config::SessionConfig;
use handwave_model::gesture::{GestureEvent, GestureIdentityId};
use handwave_model::mapping::actions;
use handwave_model::ui::{NodeId, WindowId};

use crate::click::ClickHandler;
use crate::controller::{DragOutcome, EndedSession, SessionController};
use crate::host::DesktopHost;
use crate::screen::ScreenMapper;

/// What routing an action did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "routed", rename_all = "snake_case")]
pub enum Routed {
    DragStarted { window: WindowId },
    DragMoved { window: WindowId },
    Clicked { node: NodeId },
    Invoked { action: String },
    /// The handler had nothing to act on, or the host refused.
    Skipped,
}

/// `drag` goes to the session controller, `click` to the click handler,
/// everything else to [`DesktopHost::invoke`].
#[derive(Debug)]
pub struct ActionRouter {
    screen: ScreenMapper,
    sessions: SessionController,
    click: ClickHandler,
}

impl ActionRouter {
    pub fn new(config: SessionConfig, mirrored: bool) -> Self {
        Self {
            screen: ScreenMapper::new(mirrored),
            sessions: SessionController::new(config),
            click: ClickHandler::new(),
        }
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn screen_mapper(&self) -> ScreenMapper {
        self.screen
    }

    pub fn apply_config(&mut self, config: SessionConfig, mirrored: bool) {
        self.screen = ScreenMapper::new(mirrored);
        self.sessions.apply_config(config);
    }

    pub fn route<H: DesktopHost + ?Sized>(
        &mut self,
        action: &str,
        event: &GestureEvent,
        host: &mut H,
    ) -> Routed {
        let cursor = self.screen.to_screen(event.position, host.screen_size());

        match action {
            actions::DRAG => match self.sessions.handle_drag(event, cursor, host) {
                DragOutcome::Started { window_id, .. } => Routed::DragStarted { window: window_id },
                DragOutcome::Moved { window_id, .. } => Routed::DragMoved { window: window_id },
                DragOutcome::Ignored => Routed::Skipped,
            },
            actions::CLICK => match self.click.click(host, cursor) {
                Some(node) => Routed::Clicked { node },
                None => Routed::Skipped,
            },
            other => {
                let focused = host.focused_window();
                match host.invoke(other, focused) {
                    Ok(()) => Routed::Invoked {
                        action: other.to_string(),
                    },
                    Err(e) => {
                        debug!(
                            action = other,
                            error = %e,
                            host = host.name(),
                            "Action not applied"
                        );
                        Routed::Skipped
                    }
                }
            }
        }
    }

    /// React to an identity ending upstream.
    pub fn release(&mut self, identity_id: GestureIdentityId, now: TimestampMs) -> bool {
        self.sessions.on_release(identity_id, now)
    }

    /// Per-tick housekeeping: focus check, then the inactivity timer.
    pub fn tick<H: DesktopHost + ?Sized>(&mut self, now: TimestampMs, host: &H) {
        self.sessions.on_focus_changed(host.focused_window(), now);
        self.sessions.poll(now);
    }

    /// Fire the inactivity timer only.
    pub fn poll(&mut self, now: TimestampMs) -> bool {
        self.sessions.poll(now)
    }

    pub fn deadline(&self) -> Option<TimestampMs> {
        self.sessions.deadline()
    }

    pub fn drain_ended(&mut self) -> Vec<EndedSession> {
        self.sessions.drain_ended()
    }
}
