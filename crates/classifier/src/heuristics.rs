//! Geometric gesture rules.
//!
//! An ordered cascade over finger extension, tip distances, depth, and
//! palm velocity. The first rule that matches decides the gesture.

use handwave_common::config::ClassifierConfig;
use handwave_model::gesture::{GestureData, GestureType};
use handwave_model::geometry::Point2D;
use handwave_model::landmark::{Finger, LandmarkFrame, INDEX_MCP};

pub const OPEN_PALM_CONFIDENCE: f64 = 0.9;
pub const CLOSED_FIST_CONFIDENCE: f64 = 0.9;
pub const THUMBS_UP_CONFIDENCE: f64 = 0.85;
pub const PINCH_CONFIDENCE: f64 = 0.9;
pub const PUSH_FORWARD_CONFIDENCE: f64 = 0.8;
pub const SWIPE_CONFIDENCE: f64 = 0.8;
pub const TWO_FINGER_CONFIDENCE: f64 = 0.8;

/// A single-frame classification, before any temporal gating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub gesture_type: GestureType,
    pub confidence: f64,
    pub data: Option<GestureData>,
}

impl Detection {
    fn new(gesture_type: GestureType, confidence: f64) -> Self {
        Self {
            gesture_type,
            confidence,
            data: None,
        }
    }

    fn with_data(mut self, data: GestureData) -> Self {
        self.data = Some(data);
        self
    }
}

/// Which fingers read as extended in one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedFingers([bool; 5]);

impl ExtendedFingers {
    /// Measure a complete frame.
    ///
    /// The thumb is extended when its tip lies farther out along the thumb
    /// side than its IP joint; other fingers when the tip is above the PIP
    /// joint.
    pub fn measure(frame: &LandmarkFrame, mirrored: bool) -> Self {
        let side = frame.handedness.thumb_side(mirrored);
        let mut extended = [false; 5];
        for finger in Finger::ALL {
            let tip = frame.point(finger.tip());
            let pip = frame.point(finger.pip());
            extended[finger as usize] = match finger {
                Finger::Thumb => (tip.x - pip.x) * side > 0.0,
                _ => tip.y < pip.y,
            };
        }
        Self(extended)
    }

    pub fn from_fingers(fingers: &[Finger]) -> Self {
        let mut extended = [false; 5];
        for finger in fingers {
            extended[*finger as usize] = true;
        }
        Self(extended)
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|e| **e).count()
    }

    /// Exactly these fingers are extended and no others.
    pub fn exactly(&self, fingers: &[Finger]) -> bool {
        *self == Self::from_fingers(fingers)
    }
}

/// Run the rule cascade over one complete frame.
///
/// `velocity` is the palm velocity for this frame (see
/// [`PalmSmoother::update`](crate::smoothing::PalmSmoother::update)).
pub fn classify(
    frame: &LandmarkFrame,
    velocity: Point2D,
    config: &ClassifierConfig,
) -> Option<Detection> {
    let fingers = ExtendedFingers::measure(frame, config.mirrored);
    let count = fingers.count();

    if count >= 4 {
        return Some(Detection::new(GestureType::OpenPalm, OPEN_PALM_CONFIDENCE));
    }
    if count == 0 {
        return Some(Detection::new(GestureType::ClosedFist, CLOSED_FIST_CONFIDENCE));
    }
    if fingers.exactly(&[Finger::Thumb]) {
        return Some(Detection::new(GestureType::ThumbsUp, THUMBS_UP_CONFIDENCE));
    }

    // pinch distance is the image-plane (x, y) Euclidean distance, depth is ignored
    let thumb_index = frame
        .point(Finger::Thumb.tip())
        .distance_to(frame.point(Finger::Index.tip()));
    if fingers.is_extended(Finger::Thumb)
        && fingers.is_extended(Finger::Index)
        && thumb_index < config.pinch_distance
    {
        return Some(
            Detection::new(GestureType::Pinch, PINCH_CONFIDENCE).with_data(GestureData::Pinch {
                distance: thumb_index,
            }),
        );
    }

    if fingers.is_extended(Finger::Index) && frame.point(INDEX_MCP).z < config.push_depth {
        return Some(Detection::new(
            GestureType::PushForward,
            PUSH_FORWARD_CONFIDENCE,
        ));
    }

    if velocity.x.abs() > config.swipe_velocity {
        let gesture_type = if velocity.x < 0.0 {
            GestureType::SwipeLeft
        } else {
            GestureType::SwipeRight
        };
        return Some(
            Detection::new(gesture_type, SWIPE_CONFIDENCE).with_data(GestureData::Swipe {
                velocity_x: velocity.x,
            }),
        );
    }

    if fingers.exactly(&[Finger::Index, Finger::Middle]) {
        let distance = frame
            .point(Finger::Index.tip())
            .distance_to(frame.point(Finger::Middle.tip()));
        let gesture_type = if distance > config.spread_distance {
            GestureType::TwoFingerSpread
        } else {
            GestureType::TwoFingerPinch
        };
        return Some(
            Detection::new(gesture_type, TWO_FINGER_CONFIDENCE)
                .with_data(GestureData::TwoFinger { distance }),
        );
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_model::landmark::Handedness;
    use handwave_model::pose::HandPose;

    fn detect(pose: HandPose) -> Option<GestureType> {
        classify(&pose.frame(0), Point2D::ZERO, &ClassifierConfig::default())
            .map(|d| d.gesture_type)
    }

    #[test]
    fn test_open_palm() {
        let frame = HandPose::open_palm(Handedness::Right).frame(0);
        let det = classify(&frame, Point2D::ZERO, &ClassifierConfig::default()).unwrap();
        assert_eq!(det.gesture_type, GestureType::OpenPalm);
        assert_eq!(det.confidence, 0.9);
    }

    #[test]
    fn test_four_fingers_without_thumb_is_open_palm() {
        let pose = HandPose::new(Handedness::Left).extend(&[
            Finger::Index,
            Finger::Middle,
            Finger::Ring,
            Finger::Pinky,
        ]);
        assert_eq!(detect(pose), Some(GestureType::OpenPalm));
    }

    #[test]
    fn test_closed_fist_and_thumbs_up() {
        assert_eq!(
            detect(HandPose::closed_fist(Handedness::Right)),
            Some(GestureType::ClosedFist)
        );
        assert_eq!(
            detect(HandPose::thumbs_up(Handedness::Left)),
            Some(GestureType::ThumbsUp)
        );
    }

    #[test]
    fn test_thumbs_up_confidence() {
        let frame = HandPose::thumbs_up(Handedness::Right).frame(0);
        let det = classify(&frame, Point2D::ZERO, &ClassifierConfig::default()).unwrap();
        assert_eq!(det.confidence, 0.85);
    }

    #[test]
    fn test_pinch_carries_distance() {
        let frame = HandPose::pinch(Handedness::Right, 0.03).frame(0);
        let det = classify(&frame, Point2D::ZERO, &ClassifierConfig::default()).unwrap();
        assert_eq!(det.gesture_type, GestureType::Pinch);
        match det.data {
            Some(GestureData::Pinch { distance }) => assert!((distance - 0.03).abs() < 1e-9),
            other => panic!("expected pinch data, got {other:?}"),
        }
    }

    #[test]
    fn test_wide_thumb_index_is_not_pinch() {
        let pose = HandPose::new(Handedness::Right).extend(&[Finger::Thumb, Finger::Index]);
        assert_ne!(detect(pose), Some(GestureType::Pinch));
    }

    #[test]
    fn test_push_forward() {
        assert_eq!(
            detect(HandPose::push_forward(Handedness::Right)),
            Some(GestureType::PushForward)
        );
    }

    #[test]
    fn test_swipe_direction_follows_velocity_sign() {
        let config = ClassifierConfig::default();
        let frame = HandPose::pointing(Handedness::Right).frame(0);
        let left = classify(&frame, Point2D::new(-0.05, 0.0), &config).unwrap();
        let right = classify(&frame, Point2D::new(0.05, 0.0), &config).unwrap();
        assert_eq!(left.gesture_type, GestureType::SwipeLeft);
        assert_eq!(right.gesture_type, GestureType::SwipeRight);
        assert!(classify(&frame, Point2D::new(0.01, 0.0), &config).is_none());
    }

    #[test]
    fn test_open_palm_wins_over_swipe() {
        let frame = HandPose::open_palm(Handedness::Right).frame(0);
        let det = classify(&frame, Point2D::new(0.2, 0.0), &ClassifierConfig::default()).unwrap();
        assert_eq!(det.gesture_type, GestureType::OpenPalm);
    }

    #[test]
    fn test_two_finger_spread_and_pinch() {
        assert_eq!(
            detect(HandPose::two_finger(Handedness::Right, 0.12)),
            Some(GestureType::TwoFingerSpread)
        );
        assert_eq!(
            detect(HandPose::two_finger(Handedness::Right, 0.04)),
            Some(GestureType::TwoFingerPinch)
        );
    }

    #[test]
    fn test_three_fingers_still_is_no_gesture() {
        let pose =
            HandPose::new(Handedness::Right).extend(&[Finger::Index, Finger::Middle, Finger::Ring]);
        assert_eq!(detect(pose), None);
    }

    #[test]
    fn test_mirroring_flips_thumb_test() {
        // Built for an unmirrored camera, read as if mirrored: the thumb
        // appears tucked in.
        let frame = HandPose::thumbs_up(Handedness::Right)
            .mirrored(false)
            .frame(0);
        let config = ClassifierConfig::default();
        let fingers = ExtendedFingers::measure(&frame, config.mirrored);
        assert!(!fingers.is_extended(Finger::Thumb));

        let unmirrored = ClassifierConfig {
            mirrored: false,
            ..ClassifierConfig::default()
        };
        let det = classify(&frame, Point2D::ZERO, &unmirrored).unwrap();
        assert_eq!(det.gesture_type, GestureType::ThumbsUp);
    }
}
