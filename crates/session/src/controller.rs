//! Continuous drag sessions.
//!
//! The classifier repeats a `drag`-mapped event every frame the pinch is
//! held. This controller folds that stream into one session per identity:
//!
//! - **New:** the first event (or one with a different identity) anchors
//!   `offset = cursor - window.origin` on the focused window.
//! - **Continuing:** each event with the same identity moves the window to
//!   `cursor - offset` (clamped on screen) and re-arms the inactivity timer.
//! - **Ended:** a matching release, focus moving elsewhere, the window
//!   disappearing, a superseding identity, or the timer running out.
//!
//! At most one session is active at a time.

use serde::Serialize;
use tracing::{debug, info, warn};

use handwave_common::clock::{InactivityTimer, TimestampMs};
use handwave_common::config::SessionConfig;
use handwave_model::geometry::{Point2D, Size};
use handwave_model::gesture::{GestureEvent, GestureIdentityId};
use handwave_model::ui::WindowId;

use crate::host::DesktopHost;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The classifier released the session's identity.
    Released,
    /// No continuation within the inactivity timeout.
    Timeout,
    /// Focus moved away from the dragged window.
    FocusChanged,
    /// A drag event with a different identity arrived.
    Superseded,
    /// The host no longer knows the window.
    WindowGone,
}

/// Record of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndedSession {
    pub window_id: WindowId,
    pub identity_id: GestureIdentityId,
    pub reason: SessionEnd,
    pub started_ms: TimestampMs,
    pub ended_ms: TimestampMs,
    /// Continuation events applied during the session.
    pub updates: u32,
}

/// The active drag.
#[derive(Debug, Clone)]
pub struct DragSession {
    window_id: WindowId,
    anchor_offset: Point2D,
    active_identity_id: GestureIdentityId,
    started_ms: TimestampMs,
    updates: u32,
    timer: InactivityTimer,
}

impl DragSession {
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Cursor minus window origin at session start. Fixed for the lifetime.
    pub fn anchor_offset(&self) -> Point2D {
        self.anchor_offset
    }

    pub fn active_identity_id(&self) -> GestureIdentityId {
        self.active_identity_id
    }

    pub fn started_ms(&self) -> TimestampMs {
        self.started_ms
    }

    pub fn updates(&self) -> u32 {
        self.updates
    }

    pub fn deadline(&self) -> Option<TimestampMs> {
        self.timer.deadline()
    }
}

/// What a drag event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    Started {
        window_id: WindowId,
        anchor_offset: Point2D,
    },
    Moved {
        window_id: WindowId,
        position: Point2D,
    },
    /// No focused window (or no frame for it); nothing happened.
    Ignored,
}

/// Single-session drag state machine.
#[derive(Debug)]
pub struct SessionController {
    config: SessionConfig,
    active: Option<DragSession>,
    ended: Vec<EndedSession>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            active: None,
            ended: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// New settings. The inactivity timeout applies from the next event.
    pub fn apply_config(&mut self, config: SessionConfig) {
        if let Some(session) = self.active.as_mut() {
            session.timer.set_timeout_ms(config.inactivity_ms);
        }
        self.config = config;
    }

    pub fn active(&self) -> Option<&DragSession> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// When the active session times out, if nothing else arrives.
    pub fn deadline(&self) -> Option<TimestampMs> {
        self.active.as_ref().and_then(DragSession::deadline)
    }

    /// Sessions that ended since the last call, oldest first.
    pub fn drain_ended(&mut self) -> Vec<EndedSession> {
        std::mem::take(&mut self.ended)
    }

    /// Apply one `drag`-mapped event at screen position `cursor`.
    pub fn handle_drag<H: DesktopHost + ?Sized>(
        &mut self,
        event: &GestureEvent,
        cursor: Point2D,
        host: &mut H,
    ) -> DragOutcome {
        let now = event.timestamp_ms;

        let continuing = self
            .active
            .as_ref()
            .filter(|s| s.active_identity_id == event.identity_id)
            .map(|s| (s.window_id, s.anchor_offset));

        match continuing {
            Some((window_id, anchor_offset)) => {
                self.continue_drag(window_id, anchor_offset, cursor, now, host)
            }
            None => {
                if self.active.is_some() {
                    self.end(SessionEnd::Superseded, now);
                }
                self.start_drag(event, cursor, host)
            }
        }
    }

    fn start_drag<H: DesktopHost + ?Sized>(
        &mut self,
        event: &GestureEvent,
        cursor: Point2D,
        host: &mut H,
    ) -> DragOutcome {
        let Some(window_id) = host.focused_window() else {
            debug!(identity = %event.identity_id, "Drag without a focused window, ignoring");
            return DragOutcome::Ignored;
        };
        let Some(frame) = host.window_frame(window_id) else {
            debug!(window = %window_id, "Focused window has no frame, ignoring drag");
            return DragOutcome::Ignored;
        };

        let anchor_offset = cursor - frame.origin();
        let mut timer = InactivityTimer::new(self.config.inactivity_ms);
        timer.arm(event.timestamp_ms);

        info!(
            window = %window_id,
            identity = %event.identity_id,
            offset_x = anchor_offset.x,
            offset_y = anchor_offset.y,
            "Drag session started"
        );

        self.active = Some(DragSession {
            window_id,
            anchor_offset,
            active_identity_id: event.identity_id,
            started_ms: event.timestamp_ms,
            updates: 0,
            timer,
        });

        DragOutcome::Started {
            window_id,
            anchor_offset,
        }
    }

    fn continue_drag<H: DesktopHost + ?Sized>(
        &mut self,
        window_id: WindowId,
        anchor_offset: Point2D,
        cursor: Point2D,
        now: TimestampMs,
        host: &mut H,
    ) -> DragOutcome {
        let Some(frame) = host.window_frame(window_id) else {
            self.end(SessionEnd::WindowGone, now);
            return DragOutcome::Ignored;
        };

        let position = clamp_to_screen(
            cursor - anchor_offset,
            frame.size(),
            host.screen_size(),
            &self.config,
        );
        if let Err(e) = host.set_window_position(window_id, position) {
            warn!(window = %window_id, error = %e, "Failed to move window");
        }

        if let Some(session) = self.active.as_mut() {
            session.updates += 1;
            session.timer.arm(now);
        }

        DragOutcome::Moved {
            window_id,
            position,
        }
    }

    /// End the session if `identity_id` is the one driving it.
    pub fn on_release(&mut self, identity_id: GestureIdentityId, now: TimestampMs) -> bool {
        let matches = self
            .active
            .as_ref()
            .is_some_and(|s| s.active_identity_id == identity_id);
        if matches {
            self.end(SessionEnd::Released, now);
        }
        matches
    }

    /// End the session if focus is no longer on the dragged window.
    pub fn on_focus_changed(&mut self, focused: Option<WindowId>, now: TimestampMs) -> bool {
        let lost = self
            .active
            .as_ref()
            .is_some_and(|s| Some(s.window_id) != focused);
        if lost {
            self.end(SessionEnd::FocusChanged, now);
        }
        lost
    }

    /// Fire the inactivity timer. Returns `true` if the session ended.
    pub fn poll(&mut self, now: TimestampMs) -> bool {
        let expired = self
            .active
            .as_ref()
            .is_some_and(|s| s.timer.is_expired(now));
        if expired {
            self.end(SessionEnd::Timeout, now);
        }
        expired
    }

    fn end(&mut self, reason: SessionEnd, now: TimestampMs) -> bool {
        let Some(session) = self.active.take() else {
            return false;
        };
        info!(
            window = %session.window_id,
            identity = %session.active_identity_id,
            ?reason,
            updates = session.updates,
            "Drag session ended"
        );
        self.ended.push(EndedSession {
            window_id: session.window_id,
            identity_id: session.active_identity_id,
            reason,
            started_ms: session.started_ms,
            ended_ms: now,
            updates: session.updates,
        });
        true
    }
}

/// Keep a title-bar strip of the window on screen.
///
/// At least `min_visible_width` (or the whole window, if narrower) stays
/// visible horizontally, and the title bar never leaves the top or bottom
/// edge.
pub fn clamp_to_screen(
    position: Point2D,
    window: Size,
    screen: Size,
    config: &SessionConfig,
) -> Point2D {
    let visible = config.min_visible_width.min(window.width).max(0.0);
    let min_x = visible - window.width;
    let max_x = (screen.width - visible).max(min_x);
    let max_y = (screen.height - config.title_bar_height).max(0.0);

    Point2D::new(position.x.clamp(min_x, max_x), position.y.clamp(0.0, max_y))
}
