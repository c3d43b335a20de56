//! Eraser hit testing.

use crate::stroke::{Stroke, StrokeShape};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// How an erase operation's width turns into a hit radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EraserRule {
    /// Smallest radius an eraser ever uses, in logical units.
    pub min_radius: f64,
    /// Multiplier applied to the erase operation's width.
    pub width_factor: f64,
}

impl Default for EraserRule {
    fn default() -> Self {
        Self {
            min_radius: 6.0,
            width_factor: 1.5,
        }
    }
}

impl EraserRule {
    /// Hit radius for an eraser of the given width: `max(min_radius, width * width_factor)`.
    pub fn radius(&self, width: f64) -> f64 {
        self.min_radius.max(width * self.width_factor)
    }
}

/// Distance from a point to a line segment (a to b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
///
/// A single vertex degrades to point distance; no vertices is infinitely far.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    if let [only] = points {
        return point.distance(*only);
    }
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Whether an eraser of `radius` centered on `point` touches the stroke's ink.
///
/// Circles only count their outline, so erasing inside a ring leaves it alone.
pub fn hit_stroke(stroke: &Stroke, point: Point, radius: f64) -> bool {
    let reach = radius + stroke.style.width / 2.0;
    match &stroke.shape {
        StrokeShape::Segment { start, end } => point_to_segment_dist(point, *start, *end) <= reach,
        StrokeShape::Polyline(points) => {
            if !stroke.bounds().inflate(reach, reach).contains(point) {
                return false;
            }
            point_to_polyline_dist(point, points) <= reach
        }
        StrokeShape::Circle { center, radius: ring } => (point.distance(*center) - ring).abs() <= reach,
        StrokeShape::EraseMask(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;

    fn segment(a: (f64, f64), b: (f64, f64), width: f64) -> Stroke {
        Stroke::new(
            StrokeShape::Segment {
                start: Point::new(a.0, a.1),
                end: Point::new(b.0, b.1),
            },
            StrokeStyle::new("#000000", width),
        )
    }

    #[test]
    fn test_segment_distance_projection() {
        let d = point_to_segment_dist(Point::new(50.0, 10.0), Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((d - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_distance_clamps_to_endpoint() {
        let d = point_to_segment_dist(Point::new(-3.0, 4.0), Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_length_segment() {
        let a = Point::new(7.0, 7.0);
        let d = point_to_segment_dist(Point::new(10.0, 11.0), a, a);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_eraser_radius() {
        let rule = EraserRule::default();
        assert!((rule.radius(4.0) - 6.0).abs() < f64::EPSILON);
        assert!((rule.radius(10.0) - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_includes_half_width() {
        let stroke = segment((0.0, 0.0), (100.0, 0.0), 4.0);
        assert!(hit_stroke(&stroke, Point::new(50.0, 8.0), 6.0));
        assert!(!hit_stroke(&stroke, Point::new(50.0, 8.5), 6.0));
    }

    #[test]
    fn test_polyline_hit() {
        let stroke = Stroke::new(
            StrokeShape::Polyline(vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(50.0, 50.0)]),
            StrokeStyle::new("#000000", 2.0),
        );
        assert!(hit_stroke(&stroke, Point::new(55.0, 25.0), 6.0));
        assert!(!hit_stroke(&stroke, Point::new(25.0, 25.0), 6.0));
    }

    #[test]
    fn test_circle_hits_ring_not_disk() {
        let stroke = Stroke::new(
            StrokeShape::Circle {
                center: Point::new(100.0, 100.0),
                radius: 40.0,
            },
            StrokeStyle::new("#000000", 2.0),
        );
        assert!(hit_stroke(&stroke, Point::new(140.0, 100.0), 6.0));
        assert!(hit_stroke(&stroke, Point::new(100.0, 65.0), 6.0));
        assert!(!hit_stroke(&stroke, Point::new(100.0, 100.0), 6.0));
        assert!(!hit_stroke(&stroke, Point::new(160.0, 100.0), 6.0));
    }

    #[test]
    fn test_erase_mask_never_hit() {
        let mask = Stroke::new(StrokeShape::EraseMask(vec![Point::ZERO]), StrokeStyle::default());
        assert!(!hit_stroke(&mask, Point::ZERO, 100.0));
    }
}
