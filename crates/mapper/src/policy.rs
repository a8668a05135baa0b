//! Gating policies.
//!
//! Each policy is a named strategy that owns whatever bookkeeping it
//! needs. A [`PolicySet`] evaluates its policies in registration order and
//! stops at the first rejection, so stateful policies registered late (the
//! rate limiter) only record events every earlier gate accepted.

use std::collections::HashMap;

use handwave_common::clock::RateGate;
use handwave_common::config::MapperConfig;
use handwave_model::gesture::{GestureEvent, GestureIdentityId, GestureType};
use handwave_model::mapping::GestureMapping;
use handwave_model::ui::WindowId;

/// Host state a policy may consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyContext {
    pub focused_window: Option<WindowId>,
}

impl PolicyContext {
    pub fn focused(window: WindowId) -> Self {
        Self {
            focused_window: Some(window),
        }
    }

    pub fn unfocused() -> Self {
        Self::default()
    }
}

/// A named gate over gesture events.
pub trait Policy: Send {
    /// Registry key. Adding a policy with an existing name replaces it.
    fn name(&self) -> &str;

    /// Whether the event may dispatch its mapping's action.
    fn evaluate(
        &mut self,
        event: &GestureEvent,
        mapping: &GestureMapping,
        context: &PolicyContext,
    ) -> bool;

    /// Pick up new mapper settings. Policies that have none ignore this.
    fn apply_config(&mut self, _config: &MapperConfig) {}

    /// Human-readable summary of the policy's parameters.
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Requires `event.confidence >= mapping threshold` (or the default).
#[derive(Debug, Clone)]
pub struct ConfidencePolicy {
    default_threshold: f64,
}

impl ConfidencePolicy {
    pub const NAME: &'static str = "confidence";

    pub fn new(default_threshold: f64) -> Self {
        Self { default_threshold }
    }

    pub fn threshold_for(&self, mapping: &GestureMapping) -> f64 {
        mapping.confidence_threshold.unwrap_or(self.default_threshold)
    }
}

impl Policy for ConfidencePolicy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(
        &mut self,
        event: &GestureEvent,
        mapping: &GestureMapping,
        _: &PolicyContext,
    ) -> bool {
        event.confidence >= self.threshold_for(mapping)
    }

    fn apply_config(&mut self, config: &MapperConfig) {
        self.default_threshold = config.default_confidence_threshold;
    }

    fn describe(&self) -> String {
        format!("{} (default >= {:.2})", Self::NAME, self.default_threshold)
    }
}

/// Minimum interval between accepted events of the same gesture type.
///
/// For continuous mappings only the first event of an identity is limited;
/// its continuations pass while that identity stays the latest accepted one.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    interval_ms: u64,
    gates: HashMap<GestureType, RateGate>,
    continuing: HashMap<GestureType, GestureIdentityId>,
}

impl RateLimitPolicy {
    pub const NAME: &'static str = "rate-limit";

    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            gates: HashMap::new(),
            continuing: HashMap::new(),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Last accepted timestamp for a gesture type.
    pub fn last_accepted(&self, gesture_type: GestureType) -> Option<u64> {
        self.gates.get(&gesture_type).and_then(RateGate::last_accept_ms)
    }
}

impl Policy for RateLimitPolicy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(
        &mut self,
        event: &GestureEvent,
        mapping: &GestureMapping,
        _: &PolicyContext,
    ) -> bool {
        if mapping.continuous
            && self.continuing.get(&event.gesture_type) == Some(&event.identity_id)
        {
            return true;
        }

        let interval_ms = self.interval_ms;
        let accepted = self
            .gates
            .entry(event.gesture_type)
            .or_insert_with(|| RateGate::new(interval_ms))
            .try_accept(event.timestamp_ms);
        if accepted {
            if mapping.continuous {
                self.continuing.insert(event.gesture_type, event.identity_id);
            } else {
                self.continuing.remove(&event.gesture_type);
            }
        }
        accepted
    }

    fn apply_config(&mut self, config: &MapperConfig) {
        self.interval_ms = config.rate_limit_ms;
        for gate in self.gates.values_mut() {
            gate.set_interval_ms(config.rate_limit_ms);
        }
    }

    fn describe(&self) -> String {
        format!("{} ({} ms per gesture)", Self::NAME, self.interval_ms)
    }
}

/// Focus gating: `global` mappings always pass, `require_focus` mappings
/// need a focused window, everything else passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPolicy;

impl ContextPolicy {
    pub const NAME: &'static str = "context";
}

impl Policy for ContextPolicy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(
        &mut self,
        _: &GestureEvent,
        mapping: &GestureMapping,
        context: &PolicyContext,
    ) -> bool {
        if mapping.global {
            return true;
        }
        !mapping.require_focus || context.focused_window.is_some()
    }
}

/// Result of running a policy set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected { policy: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Ordered policy registry.
#[derive(Default)]
pub struct PolicySet {
    policies: Vec<Box<dyn Policy>>,
}

impl PolicySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `confidence`, `context`, then `rate-limit`.
    pub fn with_defaults(config: &MapperConfig) -> Self {
        let mut set = Self::empty();
        set.add(Box::new(ConfidencePolicy::new(
            config.default_confidence_threshold,
        )));
        set.add(Box::new(ContextPolicy));
        set.add(Box::new(RateLimitPolicy::new(config.rate_limit_ms)));
        set
    }

    /// Register a policy, replacing one with the same name in place.
    pub fn add(&mut self, policy: Box<dyn Policy>) -> Option<Box<dyn Policy>> {
        match self.policies.iter().position(|p| p.name() == policy.name()) {
            Some(index) => Some(std::mem::replace(&mut self.policies[index], policy)),
            None => {
                self.policies.push(policy);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Policy>> {
        let index = self.policies.iter().position(|p| p.name() == name)?;
        Some(self.policies.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.iter().any(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.describe()).collect()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn apply_config(&mut self, config: &MapperConfig) {
        for policy in &mut self.policies {
            policy.apply_config(config);
        }
    }

    /// Ordered AND, stopping at the first rejection.
    pub fn evaluate(
        &mut self,
        event: &GestureEvent,
        mapping: &GestureMapping,
        context: &PolicyContext,
    ) -> Verdict {
        for policy in &mut self.policies {
            if !policy.evaluate(event, mapping, context) {
                return Verdict::Rejected {
                    policy: policy.name().to_string(),
                };
            }
        }
        Verdict::Accepted
    }
}

impl std::fmt::Debug for PolicySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
