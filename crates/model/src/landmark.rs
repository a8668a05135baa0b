//! Hand landmark observations.
//!
//! A complete observation is 21 points in the usual hand-model order
//! (wrist, then four joints per finger from thumb to pinky). Coordinates
//! are normalized to the camera image; smaller `y` is higher up, negative
//! `z` is closer to the camera.

use serde::{Deserialize, Serialize};

use handwave_common::clock::TimestampMs;

use crate::geometry::Point2D;

/// Number of landmarks in a complete hand observation.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// A single tracked point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    /// Projection onto the image plane.
    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Image-plane distance to another landmark.
    pub fn distance_to(&self, other: &Landmark) -> f64 {
        self.xy().distance_to(&other.xy())
    }
}

/// Which hand the detector believes it is seeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }

    /// Sign of the x direction the thumb points away from the palm.
    ///
    /// In a mirrored (selfie) image the right thumb points towards smaller
    /// `x`; an unmirrored image flips both hands.
    pub fn thumb_side(&self, mirrored: bool) -> f64 {
        let side = match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        };
        if mirrored {
            side
        } else {
            -side
        }
    }
}

/// The five digits, thumb first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Landmark index of the fingertip.
    pub fn tip(&self) -> usize {
        match self {
            Self::Thumb => THUMB_TIP,
            Self::Index => INDEX_TIP,
            Self::Middle => MIDDLE_TIP,
            Self::Ring => RING_TIP,
            Self::Pinky => PINKY_TIP,
        }
    }

    /// Landmark index of the middle joint used for the extension test
    /// (the IP joint for the thumb).
    pub fn pip(&self) -> usize {
        match self {
            Self::Thumb => THUMB_IP,
            Self::Index => INDEX_PIP,
            Self::Middle => MIDDLE_PIP,
            Self::Ring => RING_PIP,
            Self::Pinky => PINKY_PIP,
        }
    }

    /// Landmark index of the finger base.
    pub fn base(&self) -> usize {
        match self {
            Self::Thumb => THUMB_MCP,
            Self::Index => INDEX_MCP,
            Self::Middle => MIDDLE_MCP,
            Self::Ring => RING_MCP,
            Self::Pinky => PINKY_MCP,
        }
    }
}

/// One hand observation for one sensor tick.
///
/// Produced by the vision collaborator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    /// Detector confidence for this hand, in [0.0, 1.0].
    #[serde(default = "default_detector_confidence")]
    pub detector_confidence: f64,
    /// Capture timestamp on the pipeline timebase.
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,
}

fn default_detector_confidence() -> f64 {
    1.0
}

impl LandmarkFrame {
    pub fn new(
        landmarks: Vec<Landmark>,
        handedness: Handedness,
        detector_confidence: f64,
        timestamp_ms: TimestampMs,
    ) -> Self {
        Self {
            landmarks,
            handedness,
            detector_confidence,
            timestamp_ms,
        }
    }

    /// Whether all 21 landmarks are present.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }

    /// Landmark by index. Panics on incomplete frames; check
    /// [`is_complete`](Self::is_complete) first.
    pub fn point(&self, index: usize) -> &Landmark {
        &self.landmarks[index]
    }

    /// Midpoint of the wrist and the middle-finger base.
    pub fn palm_center(&self) -> Option<Point2D> {
        if !self.is_complete() {
            return None;
        }
        Some(Point2D::midpoint(
            &self.landmarks[WRIST].xy(),
            &self.landmarks[MIDDLE_MCP].xy(),
        ))
    }
}
