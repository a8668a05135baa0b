//! Synthesize scenario frame logs.

use std::path::PathBuf;

use anyhow::Context;

use handwave_common::clock::TimestampMs;
use handwave_model::frame_log::{serialize_ticks, FrameTick};
use handwave_model::landmark::Handedness;
use handwave_model::pose::HandPose;

use crate::{Hand, Scenario};

pub fn run(scenario: Scenario, output: PathBuf, fps: u32, hand: Hand) -> anyhow::Result<()> {
    let handedness = match hand {
        Hand::Left => Handedness::Left,
        Hand::Right => Handedness::Right,
    };
    let ticks = scenario_ticks(scenario, fps, handedness)?;

    let mut content = format!(
        "# handwave synthetic log: {} scenario, {} fps, {} hand\n",
        scenario_name(scenario),
        fps,
        handedness.as_str()
    );
    content.push_str(&serialize_ticks(&ticks)?);
    std::fs::write(&output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} tick(s) to {}", ticks.len(), output.display());
    Ok(())
}

fn scenario_name(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::OpenPalm => "open-palm",
        Scenario::PinchDrag => "pinch-drag",
        Scenario::Swipe => "swipe",
    }
}

/// Frames for a scenario, `1000 / fps` ms apart.
pub fn scenario_ticks(
    scenario: Scenario,
    fps: u32,
    handedness: Handedness,
) -> anyhow::Result<Vec<FrameTick>> {
    if fps == 0 || fps > 1000 {
        anyhow::bail!("fps must be within 1..=1000, got {fps}");
    }
    let dt = TimestampMs::from(1000 / fps);
    let mut script = Script::new(dt);

    match scenario {
        Scenario::OpenPalm => {
            script.hold(400, |_| HandPose::open_palm(handedness));
        }
        Scenario::PinchDrag => {
            script.hold(150, |_| HandPose::pinch(handedness, 0.03).at(0.6, 0.5));
            script.hold(500, |p| {
                HandPose::pinch(handedness, 0.03).at(0.6 - 0.2 * p, 0.5 + 0.05 * p)
            });
            script.hold(300, |_| HandPose::open_palm(handedness).at(0.4, 0.55));
            script.gap(300);
        }
        Scenario::Swipe => {
            script.hold(150, |_| HandPose::pointing(handedness).at(0.75, 0.5));
            script.hold(330, |p| HandPose::pointing(handedness).at(0.75 - 0.5 * p, 0.5));
            script.gap(200);
        }
    }
    Ok(script.ticks)
}

/// Sequential timeline of poses.
struct Script {
    dt: TimestampMs,
    now: TimestampMs,
    ticks: Vec<FrameTick>,
}

impl Script {
    fn new(dt: TimestampMs) -> Self {
        Self {
            dt,
            now: 0,
            ticks: Vec::new(),
        }
    }

    /// Emit frames for `duration_ms`; `pose` gets progress in [0, 1).
    fn hold(&mut self, duration_ms: TimestampMs, pose: impl Fn(f64) -> HandPose) {
        let end = self.now + duration_ms;
        let start = self.now;
        while self.now < end {
            let progress = (self.now - start) as f64 / duration_ms as f64;
            self.ticks
                .push(FrameTick::new(self.now, vec![pose(progress).frame(self.now)]));
            self.now += self.dt;
        }
    }

    /// Emit empty frames for `duration_ms`.
    fn gap(&mut self, duration_ms: TimestampMs) {
        let end = self.now + duration_ms;
        while self.now < end {
            self.ticks.push(FrameTick::empty(self.now));
            self.now += self.dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_model::geometry::{Rect, Size};
    use handwave_model::mapping::actions;
    use handwave_pipeline::GesturePipeline;
    use handwave_session::{Routed, SessionEnd, VirtualDesktop};

    fn replay(ticks: &[FrameTick]) -> (Vec<(String, Routed)>, Vec<SessionEnd>) {
        let mut desktop = VirtualDesktop::new(Size::new(1920.0, 1080.0));
        desktop.add_window("w", Rect::new(480.0, 270.0, 960.0, 540.0));
        let mut pipeline = GesturePipeline::with_defaults(desktop);

        let mut routed = Vec::new();
        let mut ended = Vec::new();
        for tick in ticks {
            let report = pipeline.process_tick(tick);
            routed.extend(report.actions.into_iter().map(|a| (a.action, a.routed)));
            ended.extend(report.ended_sessions.into_iter().map(|e| e.reason));
        }
        (routed, ended)
    }

    #[test]
    fn test_timestamps_advance_by_frame_interval() {
        let ticks = scenario_ticks(Scenario::OpenPalm, 30, Handedness::Right).unwrap();
        assert_eq!(ticks[0].timestamp_ms, 0);
        assert!(ticks.windows(2).all(|w| w[1].timestamp_ms - w[0].timestamp_ms == 33));
    }

    #[test]
    fn test_open_palm_scenario_opens_launcher() {
        let ticks = scenario_ticks(Scenario::OpenPalm, 30, Handedness::Right).unwrap();
        let (routed, _) = replay(&ticks);
        assert!(routed.iter().any(|(action, _)| action == actions::OPEN_LAUNCHER));
    }

    #[test]
    fn test_pinch_drag_scenario_drags_then_releases() {
        let ticks = scenario_ticks(Scenario::PinchDrag, 30, Handedness::Left).unwrap();
        let (routed, ended) = replay(&ticks);

        let started = routed
            .iter()
            .filter(|(_, r)| matches!(r, Routed::DragStarted { .. }))
            .count();
        let moved = routed
            .iter()
            .filter(|(_, r)| matches!(r, Routed::DragMoved { .. }))
            .count();
        assert_eq!(started, 1);
        assert!(moved > 10);
        assert_eq!(ended, vec![SessionEnd::Released]);
    }

    #[test]
    fn test_swipe_scenario_switches_window() {
        let ticks = scenario_ticks(Scenario::Swipe, 30, Handedness::Right).unwrap();
        let (routed, _) = replay(&ticks);
        assert!(routed
            .iter()
            .any(|(action, _)| action == actions::PREVIOUS_WINDOW));
    }

    #[test]
    fn test_zero_fps_is_rejected() {
        assert!(scenario_ticks(Scenario::Swipe, 0, Handedness::Right).is_err());
    }
}
