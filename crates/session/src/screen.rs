//! Normalized camera space to screen pixels.

use handwave_model::geometry::{Point2D, Size};

/// Converts normalized gesture positions to screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMapper {
    /// Flip x, so a hand moving right in a selfie view moves the cursor right.
    pub mirrored: bool,
}

impl ScreenMapper {
    pub fn new(mirrored: bool) -> Self {
        Self { mirrored }
    }

    /// Screen position of a normalized point. Input is clamped to [0, 1].
    pub fn to_screen(&self, normalized: Point2D, screen: Size) -> Point2D {
        let x = normalized.x.clamp(0.0, 1.0);
        let y = normalized.y.clamp(0.0, 1.0);
        let x = if self.mirrored { 1.0 - x } else { x };
        Point2D::new(x * screen.width, y * screen.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmirrored_scales_directly() {
        let mapper = ScreenMapper::new(false);
        let p = mapper.to_screen(Point2D::new(0.25, 0.5), Size::new(1920.0, 1080.0));
        assert_eq!(p, Point2D::new(480.0, 540.0));
    }

    #[test]
    fn test_mirrored_flips_x() {
        let mapper = ScreenMapper::new(true);
        let p = mapper.to_screen(Point2D::new(0.25, 0.5), Size::new(1920.0, 1080.0));
        assert_eq!(p, Point2D::new(1440.0, 540.0));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mapper = ScreenMapper::new(false);
        let p = mapper.to_screen(Point2D::new(-0.2, 1.4), Size::new(100.0, 100.0));
        assert_eq!(p, Point2D::new(0.0, 100.0));
    }
}
