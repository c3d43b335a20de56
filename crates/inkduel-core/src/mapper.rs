//! Logical-to-display coordinate mapping.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Default logical board width shared by every participant.
pub const LOGICAL_WIDTH: f64 = 800.0;

/// Default logical board height shared by every participant.
pub const LOGICAL_HEIGHT: f64 = 500.0;

/// Narrowest display a board is laid out at.
pub const MIN_DISPLAY_WIDTH: f64 = 280.0;

/// Maps between the fixed logical board and one viewer's display.
///
/// Operations on the wire are always in logical units. Each viewer renders
/// them at whatever pixel size its window allows, so both directions of the
/// mapping take the current display size as an argument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateMapper {
    /// Logical board size (W0 x H0).
    pub logical: Size,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self {
            logical: Size::new(LOGICAL_WIDTH, LOGICAL_HEIGHT),
        }
    }
}

impl CoordinateMapper {
    /// Create a mapper for the given logical board size.
    pub fn new(logical: Size) -> Self {
        Self { logical }
    }

    /// Scale factors (display / logical) or `None` for a degenerate size.
    fn scale(&self, display: Size) -> Option<(f64, f64)> {
        let usable = |s: Size| s.width > 0.0 && s.height > 0.0 && s.width.is_finite() && s.height.is_finite();
        if !usable(display) || !usable(self.logical) {
            return None;
        }
        Some((display.width / self.logical.width, display.height / self.logical.height))
    }

    /// Convert a display-relative pixel point to logical coordinates.
    ///
    /// The result is not clamped; see [`CoordinateMapper::clamp_logical`].
    pub fn to_logical(&self, pixel: Point, display: Size) -> Point {
        match self.scale(display) {
            Some((sx, sy)) => Point::new(pixel.x / sx, pixel.y / sy),
            None => pixel,
        }
    }

    /// Convert a logical point to display pixels.
    pub fn to_pixel(&self, logical: Point, display: Size) -> Point {
        match self.scale(display) {
            Some((sx, sy)) => Point::new(logical.x * sx, logical.y * sy),
            None => logical,
        }
    }

    /// Scale a logical length (stroke width, circle radius) to pixels.
    ///
    /// Lengths follow the horizontal factor.
    pub fn to_pixel_length(&self, length: f64, display: Size) -> f64 {
        match self.scale(display) {
            Some((sx, _)) => length * sx,
            None => length,
        }
    }

    /// Clamp a logical point onto the board.
    pub fn clamp_logical(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.logical.width.max(0.0)),
            point.y.clamp(0.0, self.logical.height.max(0.0)),
        )
    }

    /// Display size for a container of the given width, keeping the board's aspect ratio.
    pub fn fit_width(&self, container_width: f64) -> Size {
        let width = container_width.floor().max(MIN_DISPLAY_WIDTH);
        if self.logical.width <= 0.0 {
            return Size::new(width, 0.0);
        }
        let height = (width * self.logical.height / self.logical.width).floor();
        Size::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_half_scale() {
        let mapper = CoordinateMapper::new(Size::new(1024.0, 768.0));
        let display = Size::new(512.0, 384.0);
        let pixel = mapper.to_pixel(Point::new(100.0, 100.0), display);
        assert!((pixel.x - 50.0).abs() < EPS);
        assert!((pixel.y - 50.0).abs() < EPS);
        assert!((mapper.to_pixel_length(4.0, display) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_to_logical_not_clamped() {
        let mapper = CoordinateMapper::new(Size::new(800.0, 500.0));
        let logical = mapper.to_logical(Point::new(-40.0, 1200.0), Size::new(400.0, 250.0));
        assert!((logical.x + 80.0).abs() < EPS);
        assert!((logical.y - 2400.0).abs() < EPS);

        let clamped = mapper.clamp_logical(logical);
        assert!(clamped.x.abs() < EPS);
        assert!((clamped.y - 500.0).abs() < EPS);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mapper = CoordinateMapper::default();
        let display = Size::new(613.0, 377.0);
        for &(x, y) in &[(0.0, 0.0), (12.5, 99.25), (612.9, 376.1), (-3.0, 1000.0)] {
            let pixel = Point::new(x, y);
            let back = mapper.to_pixel(mapper.to_logical(pixel, display), display);
            assert!((back.x - pixel.x).abs() < 1e-9);
            assert!((back.y - pixel.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_degenerate_display_is_identity() {
        let mapper = CoordinateMapper::default();
        let p = Point::new(33.0, 44.0);
        assert_eq!(mapper.to_logical(p, Size::new(0.0, 300.0)), p);
        assert_eq!(mapper.to_pixel(p, Size::new(300.0, 0.0)), p);
        assert!((mapper.to_pixel_length(5.0, Size::ZERO) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_fit_width() {
        let mapper = CoordinateMapper::default();
        let size = mapper.fit_width(640.7);
        assert!((size.width - 640.0).abs() < EPS);
        assert!((size.height - 400.0).abs() < EPS);

        let narrow = mapper.fit_width(100.0);
        assert!((narrow.width - MIN_DISPLAY_WIDTH).abs() < EPS);
    }
}
