//! Synthetic hand poses.
//!
//! Builds geometrically plausible 21-point observations for a chosen set
//! of extended fingers, so replay scenarios and tests can describe a hand
//! as "pinching at (0.4, 0.5)" instead of listing coordinates.

use handwave_common::clock::TimestampMs;

use crate::geometry::Point2D;
use crate::landmark::*;

/// Builder for a synthetic hand observation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    handedness: Handedness,
    center: Point2D,
    extended: [bool; 5],
    mirrored: bool,
    index_base_depth: f64,
    pinch_distance: Option<f64>,
    spread: Option<f64>,
    detector_confidence: f64,
}

impl HandPose {
    /// A closed hand centred in view.
    pub fn new(handedness: Handedness) -> Self {
        Self {
            handedness,
            center: Point2D::new(0.5, 0.5),
            extended: [false; 5],
            mirrored: true,
            index_base_depth: 0.0,
            pinch_distance: None,
            spread: None,
            detector_confidence: 0.95,
        }
    }

    pub fn open_palm(handedness: Handedness) -> Self {
        Self::new(handedness).extend(&Finger::ALL)
    }

    pub fn closed_fist(handedness: Handedness) -> Self {
        Self::new(handedness)
    }

    pub fn thumbs_up(handedness: Handedness) -> Self {
        Self::new(handedness).extend(&[Finger::Thumb])
    }

    /// Index finger only.
    pub fn pointing(handedness: Handedness) -> Self {
        Self::new(handedness).extend(&[Finger::Index])
    }

    /// Thumb and index extended with their tips `distance` apart.
    pub fn pinch(handedness: Handedness, distance: f64) -> Self {
        let mut pose = Self::new(handedness).extend(&[Finger::Thumb, Finger::Index]);
        pose.pinch_distance = Some(distance);
        pose
    }

    /// Index extended with its base pushed towards the camera.
    pub fn push_forward(handedness: Handedness) -> Self {
        Self::pointing(handedness).index_depth(-0.15)
    }

    /// Index and middle extended with their tips `spread` apart.
    pub fn two_finger(handedness: Handedness, spread: f64) -> Self {
        let mut pose = Self::new(handedness).extend(&[Finger::Index, Finger::Middle]);
        pose.spread = Some(spread);
        pose
    }

    /// Move the palm centre.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.center = Point2D::new(x, y);
        self
    }

    pub fn extend(mut self, fingers: &[Finger]) -> Self {
        for finger in fingers {
            self.extended[*finger as usize] = true;
        }
        self
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    /// Depth of the index-finger base landmark.
    pub fn index_depth(mut self, z: f64) -> Self {
        self.index_base_depth = z;
        self
    }

    pub fn confidence(mut self, detector_confidence: f64) -> Self {
        self.detector_confidence = detector_confidence;
        self
    }

    pub fn center(&self) -> Point2D {
        self.center
    }

    fn is_extended(&self, finger: Finger) -> bool {
        self.extended[finger as usize]
    }

    /// The 21 landmarks for this pose.
    pub fn landmarks(&self) -> Vec<Landmark> {
        let c = self.center;
        let s = self.handedness.thumb_side(self.mirrored);
        let at = |dx: f64, dy: f64| Landmark::new(c.x + dx, c.y + dy, 0.0);

        let mut points = vec![Landmark::default(); LANDMARK_COUNT];
        points[WRIST] = at(0.0, 0.10);

        // thumb
        points[THUMB_CMC] = at(s * 0.03, 0.07);
        points[THUMB_MCP] = at(s * 0.05, 0.03);
        points[THUMB_IP] = at(s * 0.07, -0.01);
        points[THUMB_TIP] = if self.is_extended(Finger::Thumb) {
            at(s * 0.11, -0.04)
        } else {
            at(s * 0.04, 0.01)
        };

        // four fingers, spaced away from the thumb
        for (finger, dx) in [
            (Finger::Index, s * 0.03),
            (Finger::Middle, 0.0),
            (Finger::Ring, -s * 0.03),
            (Finger::Pinky, -s * 0.06),
        ] {
            let base = finger.base();
            points[base] = at(dx, -0.10);
            points[base + 1] = at(dx, -0.15);
            if self.is_extended(finger) {
                points[base + 2] = at(dx, -0.19);
                points[base + 3] = at(dx, -0.23);
            } else {
                points[base + 2] = at(dx, -0.12);
                points[base + 3] = at(dx, -0.09);
            }
        }

        if let Some(distance) = self.pinch_distance {
            points[THUMB_TIP] = at(s * 0.09, -0.18);
            points[INDEX_TIP] = at(s * (0.09 - distance), -0.18);
        }
        if let Some(spread) = self.spread {
            let middle_tip = points[MIDDLE_TIP];
            points[INDEX_TIP] = Landmark::new(middle_tip.x + s * spread, middle_tip.y, 0.0);
        }
        points[INDEX_MCP].z = self.index_base_depth;

        points
    }

    /// A complete observation captured at `timestamp_ms`.
    pub fn frame(&self, timestamp_ms: TimestampMs) -> LandmarkFrame {
        LandmarkFrame::new(
            self.landmarks(),
            self.handedness,
            self.detector_confidence,
            timestamp_ms,
        )
    }
}
