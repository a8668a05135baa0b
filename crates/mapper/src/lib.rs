//! Handwave Mapper
//!
//! Turns gated gesture events into named actions:
//! - **Mapping table:** gesture type → action, mutable at runtime
//! - **Policies:** named gating strategies evaluated as an ordered AND
//! - **Listeners:** isolated fan-out to action subscribers
//!
//! Unmapped gestures and policy rejections are silent no-ops.

pub mod listeners;
pub mod mapper;
pub mod policy;

pub use listeners::{Listeners, Subscription};
pub use mapper::{ActionDispatch, ActionMapper};
pub use policy::{
    ConfidencePolicy, ContextPolicy, Policy, PolicyContext, PolicySet, RateLimitPolicy, Verdict,
};
