use std::collections::BTreeMap;

use proptest::prelude::*;

use handwave_classifier::classifier::{IdentityAllocator, StepSettings};
use handwave_classifier::{GestureClassifier, HandTrackingState};
use handwave_common::config::ClassifierConfig;
use handwave_model::gesture::{GestureIdentityId, GestureSignal, GestureType, TrackId};
use handwave_model::landmark::{Handedness, Landmark, LandmarkFrame};
use handwave_model::pose::HandPose;

fn landmark_strategy() -> impl Strategy<Value = Landmark> {
    (0.0f64..1.0, 0.0f64..1.0, -0.3f64..0.3).prop_map(|(x, y, z)| Landmark::new(x, y, z))
}

fn hand_strategy(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Landmark>> {
    prop::collection::vec(landmark_strategy(), len)
}

proptest! {
    #[test]
    fn confidence_stays_in_unit_range(
        frames in prop::collection::vec(hand_strategy(21..22), 1..40),
    ) {
        let mut classifier = GestureClassifier::with_defaults();
        for (i, landmarks) in frames.into_iter().enumerate() {
            let t = i as u64 * 33;
            let frame = LandmarkFrame::new(landmarks, Handedness::Right, 0.9, t);
            for signal in classifier.process_frames(&[frame], t) {
                if let GestureSignal::Gesture(event) = signal {
                    prop_assert!((0.0..=1.0).contains(&event.confidence));
                }
            }
            for hand in classifier.hands() {
                prop_assert!((0.0..=1.0).contains(&hand.confidence));
            }
        }
    }

    #[test]
    fn short_landmark_sets_produce_nothing(
        warmup in 0usize..4,
        short in hand_strategy(0..21),
    ) {
        let mut classifier = GestureClassifier::with_defaults();
        let pose = HandPose::open_palm(Handedness::Right);
        for i in 0..warmup {
            let t = i as u64 * 33;
            classifier.process_frames(&[pose.frame(t)], t);
        }
        let before: Vec<HandTrackingState> = classifier.hands().cloned().collect();

        let t = warmup as u64 * 33;
        let frame = LandmarkFrame::new(short, Handedness::Right, 0.9, t);
        let signals = classifier.process_frames(&[frame], t);

        prop_assert!(signals.is_empty());
        let after: Vec<HandTrackingState> = classifier.hands().cloned().collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn running_confidence_converges_monotonically(start in 0.0f64..1.0) {
        let config = ClassifierConfig::default();
        let overrides = BTreeMap::new();
        let settings = StepSettings { config: &config, hold_overrides: &overrides };
        let mut ids = IdentityAllocator::default();

        let mut state = HandTrackingState::new(TrackId(0), Handedness::Right, 0.6);
        state.last_gesture_type = Some(GestureType::OpenPalm);
        state.identity_id = Some(GestureIdentityId(100));
        state.confidence = start;

        let target = 0.9;
        let pose = HandPose::open_palm(Handedness::Right);
        let mut previous_gap = (start - target).abs();
        for i in 0..30u64 {
            state.step(&pose.frame(i * 33), &settings, &mut ids);
            let gap = (state.confidence - target).abs();
            prop_assert!(gap <= previous_gap + 1e-12);
            previous_gap = gap;
        }
        prop_assert!(previous_gap < 0.01);
        prop_assert_eq!(state.identity_id, Some(GestureIdentityId(100)));
    }

    #[test]
    fn identity_changes_iff_type_changes(choices in prop::collection::vec(0usize..3, 2..30)) {
        let poses = [
            HandPose::open_palm(Handedness::Right),
            HandPose::closed_fist(Handedness::Right),
            HandPose::thumbs_up(Handedness::Right),
        ];
        let mut classifier = GestureClassifier::with_defaults();
        let mut last: Option<(GestureType, GestureIdentityId)> = None;
        for (i, choice) in choices.into_iter().enumerate() {
            let t = i as u64 * 33;
            classifier.process_frames(&[poses[choice].frame(t)], t);
            let hand = classifier.hand(TrackId(0)).unwrap();
            let now = (hand.last_gesture_type.unwrap(), hand.identity_id.unwrap());
            if let Some((prev_type, prev_id)) = last {
                prop_assert_eq!(prev_type == now.0, prev_id == now.1);
            }
            last = Some(now);
        }
    }
}
