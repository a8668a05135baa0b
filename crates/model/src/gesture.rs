//! Classified gestures and the signals the classifier emits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use handwave_common::clock::TimestampMs;

use crate::geometry::Point2D;
use crate::landmark::Handedness;

/// Gesture types produced by the heuristic cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    OpenPalm,
    ClosedFist,
    ThumbsUp,
    Pinch,
    PushForward,
    SwipeLeft,
    SwipeRight,
    TwoFingerSpread,
    TwoFingerPinch,
}

impl GestureType {
    pub const ALL: [GestureType; 9] = [
        GestureType::OpenPalm,
        GestureType::ClosedFist,
        GestureType::ThumbsUp,
        GestureType::Pinch,
        GestureType::PushForward,
        GestureType::SwipeLeft,
        GestureType::SwipeRight,
        GestureType::TwoFingerSpread,
        GestureType::TwoFingerPinch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenPalm => "open_palm",
            Self::ClosedFist => "closed_fist",
            Self::ThumbsUp => "thumbs_up",
            Self::Pinch => "pinch",
            Self::PushForward => "push_forward",
            Self::SwipeLeft => "swipe_left",
            Self::SwipeRight => "swipe_right",
            Self::TwoFingerSpread => "two_finger_spread",
            Self::TwoFingerPinch => "two_finger_pinch",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown gesture name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gesture type: {0}")]
pub struct UnknownGesture(pub String);

impl FromStr for GestureType {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GestureType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGesture(s.to_string()))
    }
}

/// Token grouping consecutive frames of one sustained gesture on one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureIdentityId(pub u64);

impl fmt::Display for GestureIdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Opaque id of one physically tracked hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hand{}", self.0)
    }
}

/// Gesture-specific measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureData {
    /// Thumb–index tip distance.
    Pinch { distance: f64 },
    /// Horizontal palm velocity that triggered a swipe.
    Swipe { velocity_x: f64 },
    /// Index–middle tip distance.
    TwoFinger { distance: f64 },
}

/// One gated emission from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub identity_id: GestureIdentityId,
    #[serde(rename = "type")]
    pub gesture_type: GestureType,
    /// Running confidence at emission, in [0.0, 1.0].
    pub confidence: f64,
    /// Smoothed palm position, normalized to the camera image.
    pub position: Point2D,
    pub handedness: Handedness,
    pub track_id: TrackId,
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<GestureData>,
}

/// Why an identity ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// The hand now shows a different gesture.
    Changed,
    /// The hand no longer matches any gesture.
    NoMatch,
    /// The hand left the camera view.
    Lost,
}

/// Classifier output for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum GestureSignal {
    /// A gesture passed the confidence and hold gates.
    Gesture(GestureEvent),
    /// A previously emitted identity ended.
    Released {
        identity_id: GestureIdentityId,
        gesture_type: GestureType,
        track_id: TrackId,
        reason: ReleaseReason,
        #[serde(rename = "t")]
        timestamp_ms: TimestampMs,
    },
}

impl GestureSignal {
    /// The event, for `Gesture` signals.
    pub fn event(&self) -> Option<&GestureEvent> {
        match self {
            Self::Gesture(event) => Some(event),
            Self::Released { .. } => None,
        }
    }

    pub fn identity_id(&self) -> GestureIdentityId {
        match self {
            Self::Gesture(event) => event.identity_id,
            Self::Released { identity_id, .. } => *identity_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_names_parse_back() {
        for gesture in GestureType::ALL {
            assert_eq!(gesture.as_str().parse::<GestureType>().unwrap(), gesture);
        }
        assert!("wave".parse::<GestureType>().is_err());
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        let json = serde_json::to_string(&GestureType::TwoFingerSpread).unwrap();
        assert_eq!(json, "\"two_finger_spread\"");
    }

    #[test]
    fn test_event_json_shape() {
        let event = GestureEvent {
            identity_id: GestureIdentityId(3),
            gesture_type: GestureType::Pinch,
            confidence: 0.9,
            position: Point2D::new(0.5, 0.5),
            handedness: Handedness::Left,
            track_id: TrackId(1),
            timestamp_ms: 1_200,
            data: Some(GestureData::Pinch { distance: 0.03 }),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"pinch\""));
        assert!(json.contains("\"identity_id\":3"));
        assert!(json.contains("\"kind\":\"pinch\""));
    }

    #[test]
    fn test_signal_identity_accessor() {
        let signal = GestureSignal::Released {
            identity_id: GestureIdentityId(9),
            gesture_type: GestureType::OpenPalm,
            track_id: TrackId(0),
            reason: ReleaseReason::Lost,
            timestamp_ms: 0,
        };
        assert_eq!(signal.identity_id(), GestureIdentityId(9));
        assert!(signal.event().is_none());
    }
}
