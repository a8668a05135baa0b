//! Handwave Common Utilities
//!
//! Shared infrastructure for all Handwave crates:
//! - Error types and result aliases
//! - Frame clock, rate gating, and inactivity timers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
