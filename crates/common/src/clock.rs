//! Clock and timing utilities for the frame-driven pipeline.
//!
//! Pipeline time is integer milliseconds on a single monotonic timebase,
//! normally the capture timestamps carried by incoming frames. This module
//! provides:
//! - A frame clock anchored to an epoch, for live sources
//! - A minimum-interval gate (rate limiting)
//! - A single-deadline inactivity timer

use std::time::Instant;

/// Monotonic milliseconds on the pipeline timebase.
pub type TimestampMs = u64;

/// A monotonic clock that reports milliseconds relative to a fixed epoch
/// (the moment the frame source started).
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// The instant the frame source started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl FrameClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a clock from a known epoch.
    pub fn from_epoch(epoch: Instant, wall: String) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Milliseconds elapsed since the epoch.
    pub fn elapsed_ms(&self) -> TimestampMs {
        self.epoch.elapsed().as_millis() as TimestampMs
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The `Instant` corresponding to a timestamp on this clock's timebase.
    pub fn instant_at(&self, timestamp_ms: TimestampMs) -> Instant {
        self.epoch + std::time::Duration::from_millis(timestamp_ms)
    }
}

/// Minimum-interval gate.
///
/// The first call always passes. A later call passes only once
/// `interval_ms` has elapsed since the last *accepted* call, so a burst of
/// rejected calls never pushes the window forward.
#[derive(Debug, Clone)]
pub struct RateGate {
    interval_ms: u64,
    last_accept_ms: Option<TimestampMs>,
}

impl RateGate {
    /// Create a gate with the given minimum interval.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_accept_ms: None,
        }
    }

    /// Check the gate at `now_ms`, recording `now_ms` only on acceptance.
    pub fn try_accept(&mut self, now_ms: TimestampMs) -> bool {
        match self.last_accept_ms {
            Some(last) if now_ms < last.saturating_add(self.interval_ms) => false,
            _ => {
                self.last_accept_ms = Some(now_ms);
                true
            }
        }
    }

    /// Check without recording.
    pub fn would_accept(&self, now_ms: TimestampMs) -> bool {
        self.last_accept_ms
            .map_or(true, |last| now_ms >= last.saturating_add(self.interval_ms))
    }

    /// Minimum interval in milliseconds.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Change the interval, keeping the last acceptance time.
    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// Timestamp of the last accepted call.
    pub fn last_accept_ms(&self) -> Option<TimestampMs> {
        self.last_accept_ms
    }
}

/// A single-deadline inactivity timer.
///
/// Re-arming replaces the previous deadline; there is never more than one
/// pending expiry.
#[derive(Debug, Clone)]
pub struct InactivityTimer {
    timeout_ms: u64,
    deadline_ms: Option<TimestampMs>,
}

impl InactivityTimer {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            deadline_ms: None,
        }
    }

    /// Cancel any pending deadline and schedule a new one at `now + timeout`.
    pub fn arm(&mut self, now_ms: TimestampMs) {
        self.deadline_ms = Some(now_ms.saturating_add(self.timeout_ms));
    }

    /// Cancel the pending deadline, if any.
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Whether the pending deadline has passed at `now_ms`.
    pub fn is_expired(&self, now_ms: TimestampMs) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    /// Pending deadline.
    pub fn deadline(&self) -> Option<TimestampMs> {
        self.deadline_ms
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Change the timeout. Applies from the next `arm`.
    pub fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = FrameClock::start();
        // less than 1 second
        assert!(clock.elapsed_ms() < 1_000);
    }

    #[test]
    fn test_instant_at_offsets_epoch() {
        let clock = FrameClock::start();
        let at = clock.instant_at(250);
        assert_eq!(at.duration_since(clock.epoch()).as_millis(), 250);
    }

    #[test]
    fn test_rate_gate() {
        let mut gate = RateGate::new(200);
        assert!(gate.try_accept(0)); // first call always passes
        assert!(!gate.try_accept(150));
        assert!(!gate.try_accept(199));
        assert!(gate.try_accept(200));
        assert_eq!(gate.last_accept_ms(), Some(200));
    }

    #[test]
    fn test_rate_gate_rejections_do_not_extend_window() {
        let mut gate = RateGate::new(200);
        assert!(gate.try_accept(1_000));
        for t in (1_010..1_200).step_by(10) {
            assert!(!gate.try_accept(t));
        }
        assert!(gate.would_accept(1_200));
        assert!(gate.try_accept(1_200));
    }

    #[test]
    fn test_timer_rearm_replaces_deadline() {
        let mut timer = InactivityTimer::new(200);
        assert!(!timer.is_armed());

        timer.arm(100);
        assert_eq!(timer.deadline(), Some(300));

        timer.arm(250);
        assert_eq!(timer.deadline(), Some(450));
        assert!(!timer.is_expired(300));
        assert!(timer.is_expired(450));

        timer.cancel();
        assert!(!timer.is_expired(10_000));
    }
}
