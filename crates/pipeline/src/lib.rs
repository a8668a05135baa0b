//! Handwave Pipeline
//!
//! The context object that owns every stage and the desktop host:
//!
//! ```text
//! FrameTick → GestureClassifier → GestureSignal → ActionMapper → ActionRouter → DesktopHost
//! ```
//!
//! [`GesturePipeline::process_tick`] is synchronous and never fails.
//! [`run_pipeline`] drives it from a tokio channel and fires session
//! timers between frames.

pub mod pipeline;
pub mod runner;

pub use pipeline::{GesturePipeline, RoutedAction, TickReport};
pub use runner::{run_pipeline, RunSummary};
