//! Handwave Classifier
//!
//! Turns per-hand landmark observations into gated gesture signals:
//! - **Tracking:** associate detections with physically tracked hands
//! - **Smoothing:** exponential smoothing of the palm position and velocity
//! - **Heuristics:** ordered geometric rules over finger extension
//! - **Gating:** running confidence and hold-time checks before emission
//!
//! This crate does no I/O and reads no clocks. Time comes from the
//! frame timestamps, so identical inputs always produce identical output.

pub mod classifier;
pub mod heuristics;
pub mod smoothing;
pub mod tracker;

pub use classifier::{GestureClassifier, HandTrackingState};
pub use heuristics::{Detection, ExtendedFingers};
pub use smoothing::PalmSmoother;
pub use tracker::HandTracker;
