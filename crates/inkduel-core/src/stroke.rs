//! Renderable strokes derived from drawing operations.

use crate::operation::Operation;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Color used when an operation carries none.
pub const DEFAULT_COLOR: &str = "#000000";

/// Width used when an operation carries none.
pub const DEFAULT_WIDTH: f64 = 4.0;

/// Thinnest stroke accepted; narrower widths are raised to this.
pub const MIN_WIDTH: f64 = 1.0;

/// Style properties shared by strokes and tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// CSS-style color string, kept verbatim for dedup signatures.
    pub color: String,
    /// Stroke width in logical units.
    pub width: f64,
}

impl StrokeStyle {
    /// Create a style, raising the width to [`MIN_WIDTH`].
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width: normalize_width(width),
        }
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR, DEFAULT_WIDTH)
    }
}

/// Clamp a width to [`MIN_WIDTH`], treating non-finite values as the default.
pub(crate) fn normalize_width(width: f64) -> f64 {
    if width.is_finite() {
        width.max(MIN_WIDTH)
    } else {
        DEFAULT_WIDTH
    }
}

/// Geometry of a stroke in logical coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrokeShape {
    /// Free-form path through three or more points.
    Polyline(Vec<Point>),
    /// Straight segment.
    Segment { start: Point, end: Point },
    /// Circle outline.
    Circle { center: Point, radius: f64 },
    /// Eraser swath. Only ever shown as an in-progress preview.
    EraseMask(Vec<Point>),
}

/// A renderable stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub shape: StrokeShape,
    pub style: StrokeStyle,
}

impl Stroke {
    pub fn new(shape: StrokeShape, style: StrokeStyle) -> Self {
        Self { shape, style }
    }

    /// Derive the stroke an operation draws, if it draws one.
    ///
    /// Erase and clear operations modify the stroke list instead.
    pub fn from_operation(op: &Operation) -> Option<Self> {
        match op {
            Operation::Line(line) => {
                let shape = match line.points.as_slice() {
                    [start, end] => StrokeShape::Segment { start: *start, end: *end },
                    pts if pts.len() > 2 => StrokeShape::Polyline(pts.to_vec()),
                    _ => return None,
                };
                Some(Self::new(shape, line.style.clone()))
            }
            Operation::Circle(circle) => Some(Self::new(
                StrokeShape::Circle {
                    center: circle.center,
                    radius: circle.radius,
                },
                circle.style.clone(),
            )),
            Operation::Erase(_) | Operation::Clear => None,
        }
    }

    /// Whether this is the eraser preview rather than ink.
    pub fn is_erase_mask(&self) -> bool {
        matches!(self.shape, StrokeShape::EraseMask(_))
    }

    /// Vertices of a point-based stroke (empty for circles).
    pub fn points(&self) -> Vec<Point> {
        match &self.shape {
            StrokeShape::Polyline(points) | StrokeShape::EraseMask(points) => points.clone(),
            StrokeShape::Segment { start, end } => vec![*start, *end],
            StrokeShape::Circle { .. } => Vec::new(),
        }
    }

    /// Bounding box of the geometry, not including stroke width.
    pub fn bounds(&self) -> Rect {
        match &self.shape {
            StrokeShape::Circle { center, radius } => Rect::new(
                center.x - radius,
                center.y - radius,
                center.x + radius,
                center.y + radius,
            ),
            StrokeShape::Segment { start, end } => Rect::from_points(*start, *end),
            StrokeShape::Polyline(points) | StrokeShape::EraseMask(points) => {
                let Some(first) = points.first() else {
                    return Rect::ZERO;
                };
                points
                    .iter()
                    .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{CirclePayload, ErasePayload, LinePayload};

    #[test]
    fn test_two_point_line_is_segment() {
        let op = Operation::Line(LinePayload::new(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            StrokeStyle::default(),
        ));
        let stroke = Stroke::from_operation(&op).unwrap();
        assert!(matches!(stroke.shape, StrokeShape::Segment { .. }));
    }

    #[test]
    fn test_long_line_is_polyline() {
        let op = Operation::Line(LinePayload::new(
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)],
            StrokeStyle::new("#ff0000", 2.0),
        ));
        let stroke = Stroke::from_operation(&op).unwrap();
        assert_eq!(stroke.points().len(), 3);
        assert_eq!(stroke.style.color, "#ff0000");
    }

    #[test]
    fn test_erase_and_clear_draw_nothing() {
        let erase = Operation::Erase(ErasePayload::new(vec![Point::new(1.0, 1.0)], 4.0));
        assert!(Stroke::from_operation(&erase).is_none());
        assert!(Stroke::from_operation(&Operation::Clear).is_none());
    }

    #[test]
    fn test_bounds() {
        let circle = Operation::Circle(CirclePayload::new(Point::new(50.0, 50.0), 10.0, StrokeStyle::default()));
        let bounds = Stroke::from_operation(&circle).unwrap().bounds();
        assert!((bounds.x0 - 40.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 60.0).abs() < f64::EPSILON);

        let poly = Stroke::new(
            StrokeShape::Polyline(vec![Point::new(0.0, 0.0), Point::new(100.0, 50.0), Point::new(50.0, 100.0)]),
            StrokeStyle::default(),
        );
        let bounds = poly.bounds();
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_width_normalized() {
        assert!((StrokeStyle::new("#000", 0.2).width - MIN_WIDTH).abs() < f64::EPSILON);
        assert!((StrokeStyle::new("#000", f64::NAN).width - DEFAULT_WIDTH).abs() < f64::EPSILON);
    }
}
