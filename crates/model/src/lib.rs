//! Handwave Model
//!
//! Defines the data contracts shared by the gesture pipeline:
//! - **Landmarks:** 21-point hand observations from the vision collaborator
//! - **Gestures:** classified gesture types, events, and release signals
//! - **Mappings:** gesture-to-action bindings and their gating flags
//! - **Frame logs:** JSONL recordings of sensor ticks for replay
//! - **Synthetic poses:** landmark sets built from a finger description
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! camera image; window geometry is in screen pixels.

pub mod frame_log;
pub mod geometry;
pub mod gesture;
pub mod landmark;
pub mod mapping;
pub mod pose;
pub mod ui;

pub use frame_log::*;
pub use geometry::*;
pub use gesture::*;
pub use landmark::*;
pub use mapping::*;
pub use ui::*;
