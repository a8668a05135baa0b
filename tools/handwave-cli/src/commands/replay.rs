//! Replay a frame log through the pipeline against a virtual desktop.

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::mpsc;

use handwave_common::clock::FrameClock;
use handwave_model::frame_log::{parse_ticks, FrameTick};
use handwave_model::geometry::{Rect, Size};
use handwave_pipeline::{run_pipeline, GesturePipeline, TickReport};
use handwave_session::{DesktopHost, Routed, VirtualDesktop};

pub struct ReplayOptions {
    pub log: PathBuf,
    pub json: bool,
    pub screen: String,
    pub mappings: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

type Prepared = (GesturePipeline<VirtualDesktop>, Vec<FrameTick>);

fn prepare(options: &ReplayOptions) -> anyhow::Result<Prepared> {
    let screen = Size::parse(&options.screen)
        .with_context(|| format!("Invalid screen size '{}', expected WxH", options.screen))?;
    let config = super::load_config(options.config.as_deref())?;
    let table = super::load_table(options.mappings.as_deref())?;

    let content = std::fs::read_to_string(&options.log)
        .with_context(|| format!("Failed to read {}", options.log.display()))?;
    let ticks = parse_ticks(&content)?;

    // one focused window in the middle of the screen
    let mut desktop = VirtualDesktop::new(screen);
    desktop.add_window(
        "replay",
        Rect::new(
            screen.width / 4.0,
            screen.height / 4.0,
            screen.width / 2.0,
            screen.height / 2.0,
        ),
    );

    let pipeline = GesturePipeline::with_table(config.gesture, table, desktop)?;
    Ok((pipeline, ticks))
}

/// Run ticks through the pipeline in log order. Timer deadlines that fall
/// between two frames fire at the deadline, before the later frame. Only
/// reports with actions or ended sessions are returned.
pub fn replay_ticks<H: DesktopHost>(
    pipeline: &mut GesturePipeline<H>,
    ticks: &[FrameTick],
) -> Vec<TickReport> {
    let mut reports = Vec::new();
    let mut keep = |report: TickReport| {
        if !report.actions.is_empty() || !report.ended_sessions.is_empty() {
            reports.push(report);
        }
    };
    for tick in ticks {
        while let Some(deadline) = pipeline
            .next_deadline()
            .filter(|d| *d < tick.timestamp_ms)
        {
            keep(pipeline.poll_timers(deadline));
        }
        keep(pipeline.process_tick(tick));
    }
    if let Some(deadline) = pipeline.next_deadline() {
        keep(pipeline.poll_timers(deadline));
    }
    reports
}

pub fn run(options: ReplayOptions) -> anyhow::Result<()> {
    let (mut pipeline, ticks) = prepare(&options)?;
    if !options.json {
        println!("Replaying {} tick(s) from {}", ticks.len(), options.log.display());
    }

    let reports = replay_ticks(&mut pipeline, &ticks);
    for report in &reports {
        print_report(report, options.json)?;
    }

    if !options.json {
        let actions: usize = reports.iter().map(|r| r.actions.len()).sum();
        let sessions: usize = reports.iter().map(|r| r.ended_sessions.len()).sum();
        println!();
        println!("Actions routed: {actions}");
        println!("Drag sessions:  {sessions}");
        print_desktop(pipeline.host());
    }
    Ok(())
}

/// Feed frames at their recorded pace through the async runner.
pub async fn run_realtime(options: ReplayOptions) -> anyhow::Result<()> {
    let (pipeline, ticks) = prepare(&options)?;
    let clock = FrameClock::start();
    let (tx, rx) = mpsc::channel(64);

    let feeder_clock = clock.clone();
    let feeder = tokio::spawn(async move {
        for tick in ticks {
            let at = tokio::time::Instant::from_std(feeder_clock.instant_at(tick.timestamp_ms));
            tokio::time::sleep_until(at).await;
            if tx.send(tick).await.is_err() {
                break;
            }
        }
    });

    let (pipeline, summary) = run_pipeline(pipeline, rx, clock).await;
    feeder.await.context("Frame feeder failed")?;

    println!("Ticks processed: {}", summary.ticks);
    println!("Timer wakeups:   {}", summary.timer_wakeups);
    println!("Actions routed:  {}", summary.actions);
    println!("Drag sessions:   {}", summary.sessions_ended);
    print_desktop(pipeline.host());
    Ok(())
}

fn print_report(report: &TickReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }
    for action in &report.actions {
        let outcome = match &action.routed {
            Routed::DragStarted { window } => format!("drag started on {window}"),
            Routed::DragMoved { window } => format!("moved {window}"),
            Routed::Clicked { node } => format!("clicked {node}"),
            Routed::Invoked { action } => format!("invoked {action}"),
            Routed::Skipped => "skipped".to_string(),
        };
        println!(
            "{:>7} ms  {:<18} {} -> {:<16} {}",
            action.timestamp_ms,
            action.gesture_type.to_string(),
            action.identity_id,
            action.action,
            outcome
        );
    }
    for ended in &report.ended_sessions {
        println!(
            "{:>7} ms  drag on {} ended ({:?}, {} update(s))",
            ended.ended_ms, ended.window_id, ended.reason, ended.updates
        );
    }
    Ok(())
}

fn print_desktop(desktop: &VirtualDesktop) {
    println!();
    println!("Desktop ({} event(s)):", desktop.events().len());
    for window in desktop.windows() {
        let focus = if desktop.focused_window() == Some(window.id) {
            " [focused]"
        } else {
            ""
        };
        println!(
            "  {} '{}' at ({:.0}, {:.0}) {:.0}x{:.0}{}{}",
            window.id,
            window.title,
            window.frame.x,
            window.frame.y,
            window.frame.w,
            window.frame.h,
            if window.minimized { " minimized" } else { "" },
            focus
        );
    }
    let invoked = desktop.invocations();
    if !invoked.is_empty() {
        println!("  Invoked: {}", invoked.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_model::landmark::Handedness;
    use handwave_model::mapping::actions;
    use handwave_model::pose::HandPose;
    use handwave_session::SessionEnd;

    fn pinch_at(t: u64, x: f64) -> FrameTick {
        FrameTick::new(
            t,
            vec![HandPose::pinch(Handedness::Right, 0.03).at(x, 0.5).frame(t)],
        )
    }

    fn pipeline() -> GesturePipeline<VirtualDesktop> {
        let mut desktop = VirtualDesktop::new(Size::new(1920.0, 1080.0));
        desktop.add_window("w", Rect::new(480.0, 270.0, 960.0, 540.0));
        GesturePipeline::with_defaults(desktop)
    }

    #[test]
    fn test_idle_drag_times_out_inside_frame_gap() {
        let mut ticks: Vec<FrameTick> = (0..10)
            .map(|i| pinch_at(i * 33, 0.5 + 0.005 * i as f64))
            .collect();
        ticks.push(pinch_at(297 + 400, 0.6));

        let mut pipeline = pipeline();
        let reports = replay_ticks(&mut pipeline, &ticks);

        let last_drag = reports
            .iter()
            .flat_map(|r| &r.actions)
            .filter(|a| a.action == actions::DRAG && a.timestamp_ms < 697)
            .map(|a| a.timestamp_ms)
            .max()
            .unwrap();

        let (index, timeout) = reports
            .iter()
            .enumerate()
            .find_map(|(i, r)| {
                r.ended_sessions
                    .iter()
                    .find(|e| e.reason == SessionEnd::Timeout)
                    .map(|e| (i, e))
            })
            .unwrap();
        assert_eq!(timeout.ended_ms, last_drag + 200);
        assert_eq!(reports[index].timestamp_ms, last_drag + 200);
        assert!(reports[..index].iter().all(|r| r.timestamp_ms < 697));
    }

    #[test]
    fn test_trailing_deadline_fires_after_last_frame() {
        let ticks: Vec<FrameTick> = (0..10).map(|i| pinch_at(i * 33, 0.5)).collect();
        let mut pipeline = pipeline();
        let reports = replay_ticks(&mut pipeline, &ticks);

        let last = reports.last().unwrap();
        assert_eq!(last.ended_sessions.len(), 1);
        assert_eq!(last.ended_sessions[0].reason, SessionEnd::Timeout);
        assert!(pipeline.next_deadline().is_none());
    }
}
