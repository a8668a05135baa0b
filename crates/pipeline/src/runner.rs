//! Async driver for live frame sources.
//!
//! One task owns the pipeline. Frames arrive on an mpsc channel; between
//! frames the task sleeps until the next session deadline so an idle drag
//! ends on time even when the camera goes quiet.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

use handwave_common::clock::{FrameClock, TimestampMs};
use handwave_model::frame_log::FrameTick;
use handwave_session::DesktopHost;

use crate::pipeline::{GesturePipeline, TickReport};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub timer_wakeups: u64,
    pub actions: u64,
    pub sessions_ended: u64,
}

impl RunSummary {
    fn record(&mut self, report: &TickReport) {
        self.actions += report.actions.len() as u64;
        self.sessions_ended += report.ended_sessions.len() as u64;
    }
}

/// Process frames until the sender side closes, then hand the pipeline back.
pub async fn run_pipeline<H: DesktopHost>(
    mut pipeline: GesturePipeline<H>,
    mut frames: mpsc::Receiver<FrameTick>,
    clock: FrameClock,
) -> (GesturePipeline<H>, RunSummary) {
    info!(epoch = clock.epoch_wall(), "Pipeline runner started");
    let mut summary = RunSummary::default();

    loop {
        let deadline = pipeline.next_deadline();
        tokio::select! {
            tick = frames.recv() => match tick {
                Some(tick) => {
                    let report = pipeline.process_tick(&tick);
                    summary.ticks += 1;
                    summary.record(&report);
                }
                None => break,
            },
            due = sleep_until(&clock, deadline) => {
                // never poll earlier than the deadline that woke us
                let now = due.max(clock.elapsed_ms());
                let report = pipeline.poll_timers(now);
                summary.timer_wakeups += 1;
                summary.record(&report);
            }
        }
    }

    info!(
        ticks = summary.ticks,
        actions = summary.actions,
        sessions_ended = summary.sessions_ended,
        "Pipeline runner stopped"
    );
    (pipeline, summary)
}

/// Resolve at `deadline` on the clock's timebase, or never.
async fn sleep_until(clock: &FrameClock, deadline: Option<TimestampMs>) -> TimestampMs {
    match deadline {
        Some(ms) => {
            tokio::time::sleep_until(Instant::from_std(clock.instant_at(ms))).await;
            ms
        }
        None => std::future::pending().await,
    }
}
