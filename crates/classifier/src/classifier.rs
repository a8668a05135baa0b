//! Per-hand gesture classification with temporal gating.
//!
//! Each tracked hand carries a [`HandTrackingState`]. Every frame the palm
//! is smoothed, the heuristic cascade picks a candidate gesture, and the
//! running confidence is updated:
//!
//! - a new gesture type starts a new identity at the detected confidence;
//! - the same type blends `confidence * decay + detected * (1 - decay)`.
//!
//! An event is emitted only once the running confidence reaches the
//! threshold *and* the identity has been held for the hold time. When an
//! identity that has emitted at least once ends, a release signal follows.

use std::collections::BTreeMap;

use handwave_common::clock::TimestampMs;
use handwave_common::config::{ClassifierConfig, TrackingConfig};
use handwave_model::frame_log::FrameTick;
use handwave_model::gesture::{
    GestureEvent, GestureIdentityId, GestureSignal, GestureType, ReleaseReason, TrackId,
};
use handwave_model::geometry::Point2D;
use handwave_model::landmark::{Handedness, LandmarkFrame};

use crate::heuristics::{self, Detection};
use crate::smoothing::PalmSmoother;
use crate::tracker::HandTracker;

/// Hands out gesture identities. Never reuses an id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityAllocator {
    next: u64,
}

impl IdentityAllocator {
    pub fn next_id(&mut self) -> GestureIdentityId {
        let id = GestureIdentityId(self.next);
        self.next += 1;
        id
    }
}

/// Everything that shapes a single hand step besides the frame itself.
#[derive(Debug, Clone)]
pub struct StepSettings<'a> {
    pub config: &'a ClassifierConfig,
    pub hold_overrides: &'a BTreeMap<GestureType, u64>,
}

impl StepSettings<'_> {
    fn hold_ms(&self, gesture_type: GestureType) -> u64 {
        self.hold_overrides
            .get(&gesture_type)
            .copied()
            .unwrap_or(self.config.hold_ms)
    }
}

/// Classifier state for one tracked hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandTrackingState {
    pub track_id: TrackId,
    pub handedness: Handedness,
    pub last_gesture_type: Option<GestureType>,
    pub gesture_start_ms: TimestampMs,
    pub identity_id: Option<GestureIdentityId>,
    /// Running confidence, always in [0.0, 1.0].
    pub confidence: f64,
    pub smoother: PalmSmoother,
    pub velocity: Point2D,
    pub previous_position: Option<Point2D>,
    /// Whether the current identity has produced at least one event.
    pub emitted: bool,
}

impl HandTrackingState {
    pub fn new(track_id: TrackId, handedness: Handedness, smoothing_factor: f64) -> Self {
        Self {
            track_id,
            handedness,
            last_gesture_type: None,
            gesture_start_ms: 0,
            identity_id: None,
            confidence: 0.0,
            smoother: PalmSmoother::new(smoothing_factor),
            velocity: Point2D::ZERO,
            previous_position: None,
            emitted: false,
        }
    }

    pub fn smoothed_position(&self) -> Option<Point2D> {
        self.smoother.position()
    }

    /// Advance this hand by one complete frame.
    ///
    /// Depends only on `self`, the frame, the settings, and the allocator,
    /// so replaying the same frame against an equal state yields an equal
    /// result. Incomplete frames are ignored without touching the state.
    pub fn step(
        &mut self,
        frame: &LandmarkFrame,
        settings: &StepSettings<'_>,
        ids: &mut IdentityAllocator,
    ) -> Vec<GestureSignal> {
        let Some(palm) = frame.palm_center() else {
            return Vec::new();
        };
        let now = frame.timestamp_ms;
        let mut signals = Vec::new();

        self.handedness = frame.handedness;
        let motion = self.smoother.update(palm);
        self.velocity = motion.velocity;
        self.previous_position = motion.previous;

        let Some(detection) = heuristics::classify(frame, motion.velocity, settings.config) else {
            if let Some(release) = self.release(ReleaseReason::NoMatch, now) {
                signals.push(release);
            }
            self.clear_identity();
            return signals;
        };

        if self.last_gesture_type != Some(detection.gesture_type) {
            if let Some(release) = self.release(ReleaseReason::Changed, now) {
                signals.push(release);
            }
            self.start_identity(&detection, now, ids);
        } else {
            let decay = settings.config.confidence_decay;
            self.confidence = self.confidence * decay + detection.confidence * (1.0 - decay);
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);

        let held_ms = now.saturating_sub(self.gesture_start_ms);
        let hold_ms = settings.hold_ms(detection.gesture_type);
        if self.confidence >= settings.config.confidence_threshold && held_ms >= hold_ms {
            if let Some(identity_id) = self.identity_id {
                self.emitted = true;
                signals.push(GestureSignal::Gesture(GestureEvent {
                    identity_id,
                    gesture_type: detection.gesture_type,
                    confidence: self.confidence,
                    position: motion.smoothed,
                    handedness: self.handedness,
                    track_id: self.track_id,
                    timestamp_ms: now,
                    data: detection.data,
                }));
            }
        }

        signals
    }

    fn start_identity(
        &mut self,
        detection: &Detection,
        now: TimestampMs,
        ids: &mut IdentityAllocator,
    ) {
        self.last_gesture_type = Some(detection.gesture_type);
        self.gesture_start_ms = now;
        self.identity_id = Some(ids.next_id());
        self.confidence = detection.confidence;
        self.emitted = false;
    }

    fn clear_identity(&mut self) {
        self.last_gesture_type = None;
        self.identity_id = None;
        self.confidence = 0.0;
        self.emitted = false;
    }

    /// Release signal for the current identity, if it was ever emitted.
    fn release(&self, reason: ReleaseReason, now: TimestampMs) -> Option<GestureSignal> {
        if !self.emitted {
            return None;
        }
        Some(GestureSignal::Released {
            identity_id: self.identity_id?,
            gesture_type: self.last_gesture_type?,
            track_id: self.track_id,
            reason,
            timestamp_ms: now,
        })
    }
}

/// The gesture classifier for all hands in view.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    config: ClassifierConfig,
    tracker: HandTracker,
    hands: BTreeMap<TrackId, HandTrackingState>,
    hold_overrides: BTreeMap<GestureType, u64>,
    ids: IdentityAllocator,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig, tracking: TrackingConfig) -> Self {
        Self {
            config,
            tracker: HandTracker::new(tracking),
            hands: BTreeMap::new(),
            hold_overrides: BTreeMap::new(),
            ids: IdentityAllocator::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default(), TrackingConfig::default())
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Replace thresholds. Smoothing factor changes apply to existing
    /// hands immediately.
    pub fn set_config(&mut self, config: ClassifierConfig, tracking: TrackingConfig) {
        for hand in self.hands.values_mut() {
            hand.smoother.set_factor(config.smoothing_factor);
        }
        self.config = config;
        self.tracker.set_config(tracking);
    }

    /// Per-gesture hold times replacing `hold_ms`.
    pub fn set_hold_overrides(&mut self, overrides: BTreeMap<GestureType, u64>) {
        self.hold_overrides = overrides;
    }

    pub fn hold_overrides(&self) -> &BTreeMap<GestureType, u64> {
        &self.hold_overrides
    }

    /// Classifier state of one tracked hand.
    pub fn hand(&self, track_id: TrackId) -> Option<&HandTrackingState> {
        self.hands.get(&track_id)
    }

    pub fn hands(&self) -> impl Iterator<Item = &HandTrackingState> {
        self.hands.values()
    }

    /// Classify every hand of one tick.
    ///
    /// Frames with fewer than 21 landmarks are skipped silently. Tracks not
    /// seen within the tracking TTL are dropped at the end of the tick.
    pub fn process(&mut self, tick: &FrameTick) -> Vec<GestureSignal> {
        self.process_frames(&tick.hands, tick.timestamp_ms)
    }

    /// Classify a set of hand observations received at `now_ms`.
    pub fn process_frames(
        &mut self,
        frames: &[LandmarkFrame],
        now_ms: TimestampMs,
    ) -> Vec<GestureSignal> {
        let complete: Vec<&LandmarkFrame> = frames.iter().filter(|f| f.is_complete()).collect();
        if complete.len() < frames.len() {
            tracing::trace!(
                skipped = frames.len() - complete.len(),
                "Skipping incomplete landmark sets"
            );
        }

        let detections: Vec<(Point2D, Handedness)> = complete
            .iter()
            .filter_map(|f| f.palm_center().map(|p| (p, f.handedness)))
            .collect();
        let track_ids = self.tracker.associate(&detections, now_ms);

        let settings = StepSettings {
            config: &self.config,
            hold_overrides: &self.hold_overrides,
        };
        let mut signals = Vec::new();
        for (frame, track_id) in complete.into_iter().zip(track_ids) {
            let smoothing = settings.config.smoothing_factor;
            let hand = self
                .hands
                .entry(track_id)
                .or_insert_with(|| HandTrackingState::new(track_id, frame.handedness, smoothing));
            for signal in hand.step(frame, &settings, &mut self.ids) {
                match &signal {
                    GestureSignal::Gesture(event) => tracing::debug!(
                        gesture = %event.gesture_type,
                        identity = %event.identity_id,
                        track = %track_id,
                        confidence = event.confidence,
                        "Gesture emitted"
                    ),
                    GestureSignal::Released {
                        identity_id,
                        reason,
                        ..
                    } => tracing::debug!(
                        identity = %identity_id,
                        track = %track_id,
                        ?reason,
                        "Gesture released"
                    ),
                }
                signals.push(signal);
            }
        }

        signals.extend(self.expire(now_ms));
        signals
    }

    /// Drop hands that left the view, releasing their identities.
    pub fn expire(&mut self, now_ms: TimestampMs) -> Vec<GestureSignal> {
        self.tracker
            .expire(now_ms)
            .into_iter()
            .filter_map(|track_id| self.hands.remove(&track_id))
            .filter_map(|hand| {
                tracing::debug!(track = %hand.track_id, "Tracked hand lost");
                hand.release(ReleaseReason::Lost, now_ms)
            })
            .collect()
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_model::landmark::Landmark;
    use handwave_model::pose::HandPose;

    fn events(signals: &[GestureSignal]) -> Vec<&GestureEvent> {
        signals.iter().filter_map(GestureSignal::event).collect()
    }

    fn feed(
        classifier: &mut GestureClassifier,
        pose: &HandPose,
        times: impl IntoIterator<Item = u64>,
    ) -> Vec<GestureSignal> {
        times
            .into_iter()
            .flat_map(|t| classifier.process_frames(&[pose.frame(t)], t))
            .collect()
    }

    #[test]
    fn test_no_event_before_hold_time() {
        let mut classifier = GestureClassifier::with_defaults();
        let pose = HandPose::open_palm(Handedness::Right);

        // confidence 0.9 is above threshold from the first frame
        let early = feed(&mut classifier, &pose, [0, 33, 66, 100, 133]);
        assert!(events(&early).is_empty());

        let on_time = feed(&mut classifier, &pose, [150]);
        let emitted = events(&on_time);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].gesture_type, GestureType::OpenPalm);
        assert!((emitted[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_identity_stable_while_type_unchanged() {
        let mut classifier = GestureClassifier::with_defaults();
        let pose = HandPose::open_palm(Handedness::Right);
        let signals = feed(&mut classifier, &pose, (0..10).map(|i| i * 33));
        let emitted = events(&signals);
        assert!(emitted.len() >= 5);
        assert!(emitted
            .iter()
            .all(|e| e.identity_id == emitted[0].identity_id));
    }

    #[test]
    fn test_identity_changes_with_type_and_releases() {
        let mut classifier = GestureClassifier::with_defaults();
        let palm = HandPose::open_palm(Handedness::Right);
        let fist = HandPose::closed_fist(Handedness::Right);

        let first = feed(&mut classifier, &palm, [0, 100, 200]);
        let palm_id = events(&first)[0].identity_id;

        let switched = feed(&mut classifier, &fist, [233]);
        assert_eq!(
            switched,
            vec![GestureSignal::Released {
                identity_id: palm_id,
                gesture_type: GestureType::OpenPalm,
                track_id: TrackId(0),
                reason: ReleaseReason::Changed,
                timestamp_ms: 233,
            }]
        );

        let later = feed(&mut classifier, &fist, [400]);
        assert_ne!(events(&later)[0].identity_id, palm_id);
    }

    #[test]
    fn test_no_match_resets_hand_state() {
        let mut classifier = GestureClassifier::with_defaults();
        let palm = HandPose::open_palm(Handedness::Right);
        feed(&mut classifier, &palm, [0, 200]);

        let three = HandPose::new(Handedness::Right).extend(&[
            handwave_model::landmark::Finger::Index,
            handwave_model::landmark::Finger::Middle,
            handwave_model::landmark::Finger::Ring,
        ]);
        let signals = feed(&mut classifier, &three, [233]);
        assert!(matches!(
            signals.as_slice(),
            [GestureSignal::Released {
                reason: ReleaseReason::NoMatch,
                ..
            }]
        ));

        let hand = classifier.hand(TrackId(0)).unwrap();
        assert_eq!(hand.last_gesture_type, None);
        assert_eq!(hand.identity_id, None);
        assert_eq!(hand.confidence, 0.0);
    }

    #[test]
    fn test_unemitted_identity_is_not_released() {
        let mut classifier = GestureClassifier::with_defaults();
        feed(&mut classifier, &HandPose::open_palm(Handedness::Right), [0]);
        let signals = feed(
            &mut classifier,
            &HandPose::closed_fist(Handedness::Right),
            [33],
        );
        assert!(signals.is_empty());
    }

    #[test]
    fn test_incomplete_frame_leaves_state_untouched() {
        let mut classifier = GestureClassifier::with_defaults();
        let pose = HandPose::open_palm(Handedness::Right);
        feed(&mut classifier, &pose, [0, 33]);
        let before = classifier.hand(TrackId(0)).cloned();

        let mut short = pose.frame(66);
        short.landmarks.truncate(20);
        let signals = classifier.process_frames(&[short], 66);

        assert!(signals.is_empty());
        assert_eq!(classifier.hand(TrackId(0)).cloned(), before);
    }

    #[test]
    fn test_event_carries_smoothed_position() {
        let mut classifier = GestureClassifier::with_defaults();
        let start = HandPose::open_palm(Handedness::Right).at(0.5, 0.5);
        feed(&mut classifier, &start, [0, 100]);

        let moved = HandPose::open_palm(Handedness::Right).at(0.6, 0.5);
        let signals = feed(&mut classifier, &moved, [200]);
        let event = events(&signals)[0];
        // 0.5 * 0.6 + 0.6 * 0.4
        assert!((event.position.x - 0.54).abs() < 1e-9);
    }

    #[test]
    fn test_hold_override_shortens_hold() {
        let mut classifier = GestureClassifier::with_defaults();
        classifier.set_hold_overrides(BTreeMap::from([(GestureType::Pinch, 80)]));
        let pose = HandPose::pinch(Handedness::Right, 0.03);

        assert!(events(&feed(&mut classifier, &pose, [0, 40])).is_empty());
        let emitted = feed(&mut classifier, &pose, [80]);
        assert_eq!(events(&emitted)[0].gesture_type, GestureType::Pinch);
    }

    #[test]
    fn test_lost_hand_releases_identity() {
        let mut classifier = GestureClassifier::with_defaults();
        feed(&mut classifier, &HandPose::open_palm(Handedness::Right), [0, 200]);

        assert!(classifier.process_frames(&[], 1_000).is_empty());
        let signals = classifier.process_frames(&[], 1_300);
        assert!(matches!(
            signals.as_slice(),
            [GestureSignal::Released {
                reason: ReleaseReason::Lost,
                ..
            }]
        ));
        assert!(classifier.hand(TrackId(0)).is_none());
    }

    #[test]
    fn test_two_hands_classified_independently() {
        let mut classifier = GestureClassifier::with_defaults();
        let left = HandPose::open_palm(Handedness::Left).at(0.2, 0.5);
        let right = HandPose::closed_fist(Handedness::Right).at(0.8, 0.5);

        let mut all = Vec::new();
        for t in [0, 100, 200] {
            all.extend(classifier.process_frames(&[left.frame(t), right.frame(t)], t));
        }
        let emitted = events(&all);
        assert!(emitted.iter().any(|e| e.gesture_type == GestureType::OpenPalm
            && e.handedness == Handedness::Left));
        assert!(emitted.iter().any(|e| e.gesture_type == GestureType::ClosedFist
            && e.handedness == Handedness::Right));
    }

    #[test]
    fn test_step_is_replayable() {
        let mut ids = IdentityAllocator::default();
        let config = ClassifierConfig::default();
        let overrides = BTreeMap::new();
        let settings = StepSettings {
            config: &config,
            hold_overrides: &overrides,
        };
        let mut state = HandTrackingState::new(TrackId(4), Handedness::Left, 0.6);
        let pose = HandPose::thumbs_up(Handedness::Left);
        state.step(&pose.frame(0), &settings, &mut ids);

        let mut replica = state.clone();
        let mut replica_ids = ids.clone();
        let frame = pose.frame(200);
        let a = state.step(&frame, &settings, &mut ids);
        let b = replica.step(&frame, &settings, &mut replica_ids);
        assert_eq!(a, b);
        assert_eq!(state, replica);
    }

    #[test]
    fn test_malformed_landmarks_never_panic() {
        let mut classifier = GestureClassifier::with_defaults();
        let frame = LandmarkFrame::new(vec![Landmark::default(); 3], Handedness::Left, 0.5, 0);
        assert!(classifier.process_frames(&[frame], 0).is_empty());
        assert!(classifier.hands().next().is_none());
    }
}
