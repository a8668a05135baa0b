//! The gesture pipeline context.

use serde::Serialize;
use tracing::{debug, info};

use handwave_classifier::GestureClassifier;
use handwave_common::clock::TimestampMs;
use handwave_common::config::GestureConfig;
use handwave_common::error::HandwaveResult;
use handwave_mapper::{
    ActionDispatch, ActionMapper, Listeners, Policy, PolicyContext, Subscription,
};
use handwave_model::frame_log::FrameTick;
use handwave_model::gesture::{GestureEvent, GestureIdentityId, GestureSignal, GestureType};
use handwave_model::mapping::{GestureMapping, MappingConfig, MappingPatchConfig, MappingTable};
use handwave_session::{ActionRouter, DesktopHost, EndedSession, Routed};

/// An action that passed the mapper, with what routing did with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedAction {
    pub action: String,
    pub gesture_type: GestureType,
    pub identity_id: GestureIdentityId,
    pub timestamp_ms: TimestampMs,
    pub routed: Routed,
}

/// Everything one step of the pipeline produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub timestamp_ms: TimestampMs,
    pub signals: Vec<GestureSignal>,
    pub actions: Vec<RoutedAction>,
    pub ended_sessions: Vec<EndedSession>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.actions.is_empty() && self.ended_sessions.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &GestureEvent> {
        self.signals.iter().filter_map(GestureSignal::event)
    }
}

/// Owns the classifier, the mapper, the router and the desktop host.
///
/// Constructed once and driven from a single owner; every mutation goes
/// through `&mut self`.
pub struct GesturePipeline<H> {
    config: GestureConfig,
    classifier: GestureClassifier,
    mapper: ActionMapper,
    router: ActionRouter,
    host: H,
    gesture_listeners: Listeners<GestureEvent>,
    session_listeners: Listeners<EndedSession>,
}

impl<H: DesktopHost> GesturePipeline<H> {
    /// Pipeline with the default mapping table.
    pub fn new(config: GestureConfig, host: H) -> HandwaveResult<Self> {
        Self::with_table(config, MappingTable::with_defaults(), host)
    }

    pub fn with_table(config: GestureConfig, table: MappingTable, host: H) -> HandwaveResult<Self> {
        config.validate()?;
        Ok(Self::build(config, table, host))
    }

    /// Defaults throughout.
    pub fn with_defaults(host: H) -> Self {
        Self::build(GestureConfig::default(), MappingTable::with_defaults(), host)
    }

    fn build(config: GestureConfig, table: MappingTable, host: H) -> Self {
        let mut pipeline = Self {
            classifier: GestureClassifier::new(config.classifier.clone(), config.tracking.clone()),
            mapper: ActionMapper::with_table(table, &config.mapper),
            router: ActionRouter::new(config.session.clone(), config.classifier.mirrored),
            config,
            host,
            gesture_listeners: Listeners::new(),
            session_listeners: Listeners::new(),
        };
        pipeline.sync_hold_overrides();
        info!(
            host = pipeline.host.name(),
            mappings = pipeline.mapper.table().len(),
            "Gesture pipeline ready"
        );
        pipeline
    }

    /// Run one frame through every stage.
    pub fn process_tick(&mut self, tick: &FrameTick) -> TickReport {
        let now = tick.timestamp_ms;
        // time moved forward: settle focus changes and expired sessions first
        self.router.tick(now, &self.host);

        let signals = self.classifier.process(tick);
        self.handle_signals(now, signals)
    }

    /// Advance time without a frame: expire idle sessions and lost hands.
    pub fn poll_timers(&mut self, now: TimestampMs) -> TickReport {
        self.router.tick(now, &self.host);
        let signals = self.classifier.expire(now);
        self.handle_signals(now, signals)
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<TimestampMs> {
        self.router.deadline()
    }

    fn handle_signals(&mut self, now: TimestampMs, signals: Vec<GestureSignal>) -> TickReport {
        let mut actions = Vec::new();

        for signal in &signals {
            match signal {
                GestureSignal::Gesture(event) => {
                    self.gesture_listeners.emit(event);
                    let context = PolicyContext {
                        focused_window: self.host.focused_window(),
                    };
                    if let Some(dispatch) = self.mapper.process(event, &context) {
                        actions.push(self.route(dispatch));
                    }
                }
                GestureSignal::Released { identity_id, .. } => {
                    self.router.release(*identity_id, now);
                }
            }
        }

        let ended_sessions = self.router.drain_ended();
        for ended in &ended_sessions {
            self.session_listeners.emit(ended);
        }

        TickReport {
            timestamp_ms: now,
            signals,
            actions,
            ended_sessions,
        }
    }

    fn route(&mut self, dispatch: ActionDispatch) -> RoutedAction {
        let routed = self
            .router
            .route(&dispatch.action, &dispatch.event, &mut self.host);
        debug!(action = %dispatch.action, ?routed, "Action routed");
        RoutedAction {
            gesture_type: dispatch.event.gesture_type,
            identity_id: dispatch.event.identity_id,
            timestamp_ms: dispatch.event.timestamp_ms,
            action: dispatch.action,
            routed,
        }
    }

    /// Subscribe to actions that passed every policy.
    pub fn on_action<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ActionDispatch) -> anyhow::Result<()> + Send + 'static,
    {
        self.mapper.on_action(callback)
    }

    /// Subscribe to every emitted gesture event, before mapping.
    pub fn on_gesture_event<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&GestureEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.gesture_listeners.subscribe(callback)
    }

    /// Subscribe to finished drag sessions.
    pub fn on_session_end<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&EndedSession) -> anyhow::Result<()> + Send + 'static,
    {
        self.session_listeners.subscribe(callback)
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Swap in new tuning. Takes effect on the next tick.
    pub fn apply_config(&mut self, config: GestureConfig) -> HandwaveResult<()> {
        config.validate()?;
        self.classifier
            .set_config(config.classifier.clone(), config.tracking.clone());
        self.mapper.apply_config(&config.mapper);
        self.router
            .apply_config(config.session.clone(), config.classifier.mirrored);
        self.config = config;
        info!("Gesture configuration applied");
        Ok(())
    }

    pub fn set_mapping(&mut self, mapping: GestureMapping) -> Option<GestureMapping> {
        let previous = self.mapper.set_mapping(mapping);
        self.sync_hold_overrides();
        previous
    }

    pub fn update_mapping(
        &mut self,
        gesture_type: GestureType,
        f: impl FnOnce(&mut GestureMapping),
    ) -> bool {
        let updated = self.mapper.update_mapping(gesture_type, f);
        self.sync_hold_overrides();
        updated
    }

    pub fn remove_mapping(&mut self, gesture_type: GestureType) -> Option<GestureMapping> {
        let removed = self.mapper.remove_mapping(gesture_type);
        self.sync_hold_overrides();
        removed
    }

    pub fn replace_mappings(&mut self, config: &MappingConfig) -> HandwaveResult<()> {
        self.mapper.replace_mappings(config)?;
        self.sync_hold_overrides();
        info!(mappings = self.mapper.table().len(), "Mapping table replaced");
        Ok(())
    }

    pub fn patch_mappings(&mut self, config: &MappingPatchConfig) -> HandwaveResult<()> {
        self.mapper.patch_mappings(config)?;
        self.sync_hold_overrides();
        info!(patched = config.mappings.len(), "Mapping table patched");
        Ok(())
    }

    pub fn add_policy(&mut self, policy: Box<dyn Policy>) -> Option<Box<dyn Policy>> {
        self.mapper.add_policy(policy)
    }

    pub fn remove_policy(&mut self, name: &str) -> Option<Box<dyn Policy>> {
        self.mapper.remove_policy(name)
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.mapper.policy_names()
    }

    fn sync_hold_overrides(&mut self) {
        self.classifier
            .set_hold_overrides(self.mapper.table().hold_overrides());
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    pub fn mapper(&self) -> &ActionMapper {
        &self.mapper
    }

    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_model::geometry::{Rect, Size};
    use handwave_model::landmark::Handedness;
    use handwave_model::mapping::actions;
    use handwave_model::pose::HandPose;
    use handwave_session::VirtualDesktop;
    use std::sync::{Arc, Mutex};

    fn pipeline() -> GesturePipeline<VirtualDesktop> {
        let mut desktop = VirtualDesktop::new(Size::new(1920.0, 1080.0));
        desktop.add_window("editor", Rect::new(400.0, 200.0, 800.0, 600.0));
        GesturePipeline::with_defaults(desktop)
    }

    fn tick(pose: &HandPose, t: u64) -> FrameTick {
        FrameTick::new(t, vec![pose.frame(t)])
    }

    #[test]
    fn test_hold_overrides_follow_mapping_table() {
        let mut pipeline = pipeline();
        assert_eq!(pipeline.classifier().hold_overrides().get(&GestureType::Pinch), Some(&80));

        pipeline.update_mapping(GestureType::Pinch, |m| m.hold_ms = Some(40));
        assert_eq!(pipeline.classifier().hold_overrides().get(&GestureType::Pinch), Some(&40));

        pipeline.remove_mapping(GestureType::Pinch);
        assert!(pipeline.classifier().hold_overrides().is_empty());
    }

    #[test]
    fn test_gesture_listeners_see_pre_mapping_events() {
        let mut pipeline = pipeline();
        pipeline.remove_mapping(GestureType::ThumbsUp);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = pipeline.on_gesture_event(move |event| {
            sink.lock().unwrap().push(event.gesture_type);
            Ok(())
        });

        let pose = HandPose::thumbs_up(Handedness::Right);
        let mut actions = 0;
        for t in [0, 100, 200] {
            actions += pipeline.process_tick(&tick(&pose, t)).actions.len();
        }

        assert_eq!(actions, 0);
        assert!(seen.lock().unwrap().contains(&GestureType::ThumbsUp));
    }

    #[test]
    fn test_apply_config_rejects_invalid() {
        let mut pipeline = pipeline();
        let mut config = GestureConfig::default();
        config.classifier.smoothing_factor = 1.5;
        assert!(pipeline.apply_config(config).is_err());
        assert!((pipeline.config().classifier.smoothing_factor - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_open_palm_routes_after_hold() {
        let mut pipeline = pipeline();
        let pose = HandPose::open_palm(Handedness::Right);
        let report = pipeline.process_tick(&tick(&pose, 0));
        assert!(report.actions.is_empty());

        let report = pipeline.process_tick(&tick(&pose, 150));
        assert_eq!(report.actions.len(), 1);
        assert_eq!(report.actions[0].action, actions::OPEN_LAUNCHER);
    }
}
