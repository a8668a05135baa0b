//! Palm position smoothing.
//!
//! Exponential moving average over the raw palm centre. The factor is the
//! weight kept from the previous smoothed value, so larger values mean
//! more smoothing and more lag.

use handwave_model::geometry::Point2D;

/// Result of feeding one raw position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmMotion {
    /// Smoothed position after this sample.
    pub smoothed: Point2D,
    /// Raw position minus the previous smoothed position.
    pub velocity: Point2D,
    /// Smoothed position before this sample.
    pub previous: Option<Point2D>,
}

/// EMA smoother for one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct PalmSmoother {
    factor: f64,
    smoothed: Option<Point2D>,
}

impl PalmSmoother {
    /// `factor` is clamped to [0.0, 1.0].
    pub fn new(factor: f64) -> Self {
        Self {
            factor: factor.clamp(0.0, 1.0),
            smoothed: None,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor.clamp(0.0, 1.0);
    }

    /// Current smoothed position, if any sample has been seen.
    pub fn position(&self) -> Option<Point2D> {
        self.smoothed
    }

    /// Feed a raw position.
    ///
    /// Velocity is measured against the smoothed position *before* this
    /// sample is blended in. The first sample seeds the filter with zero
    /// velocity.
    pub fn update(&mut self, raw: Point2D) -> PalmMotion {
        let previous = self.smoothed;
        let (smoothed, velocity) = match previous {
            Some(prev) => (prev.blend(&raw, self.factor), raw - prev),
            None => (raw, Point2D::ZERO),
        };
        self.smoothed = Some(smoothed);
        PalmMotion {
            smoothed,
            velocity,
            previous,
        }
    }
}
