//! Drawing tools and in-progress stroke accumulation.

use crate::operation::{CirclePayload, ErasePayload, LinePayload, Operation};
use crate::stroke::{Stroke, StrokeShape, StrokeStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Smallest radius a committed circle may have; smaller drags are treated as clicks.
pub const MIN_CIRCLE_RADIUS: f64 = 2.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Freehand,
    Line,
    Circle,
    Eraser,
}

impl ToolKind {
    pub fn is_eraser(self) -> bool {
        self == ToolKind::Eraser
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Active {
        tool: ToolKind,
        style: StrokeStyle,
        start: Point,
        current: Point,
        /// Accumulated path for freehand and eraser.
        points: Vec<Point>,
    },
}

/// Accumulates one pointer interaction into an operation.
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    state: ToolState,
    min_circle_radius: f64,
}

impl Default for StrokeBuilder {
    fn default() -> Self {
        Self::new(MIN_CIRCLE_RADIUS)
    }
}

impl StrokeBuilder {
    pub fn new(min_circle_radius: f64) -> Self {
        Self {
            state: ToolState::Idle,
            min_circle_radius,
        }
    }

    /// Begin an interaction, discarding any unfinished one.
    pub fn begin(&mut self, tool: ToolKind, style: StrokeStyle, point: Point) {
        self.state = ToolState::Active {
            tool,
            style,
            start: point,
            current: point,
            points: vec![point],
        };
    }

    /// Update the current interaction.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active {
            tool,
            current,
            points,
            ..
        } = &mut self.state
        {
            *current = point;
            if matches!(tool, ToolKind::Freehand | ToolKind::Eraser) {
                points.push(point);
            }
        }
    }

    /// End the interaction and return the operation it produced, if any.
    pub fn finish(&mut self) -> Option<Operation> {
        let state = std::mem::take(&mut self.state);
        let ToolState::Active {
            tool,
            style,
            start,
            current,
            points,
        } = state
        else {
            return None;
        };

        match tool {
            ToolKind::Freehand if points.len() >= 2 => Some(Operation::Line(LinePayload::new(points, style))),
            ToolKind::Line => Some(Operation::Line(LinePayload::new(vec![start, current], style))),
            ToolKind::Circle => {
                let radius = start.distance(current);
                (radius > self.min_circle_radius)
                    .then(|| Operation::Circle(CirclePayload::new(start, radius, style)))
            }
            ToolKind::Eraser if points.len() >= 2 => {
                Some(Operation::Erase(ErasePayload::new(points, style.width)))
            }
            ToolKind::Freehand | ToolKind::Eraser => None,
        }
    }

    /// Drop the current interaction without producing anything.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    pub fn current_tool(&self) -> Option<ToolKind> {
        match &self.state {
            ToolState::Active { tool, .. } => Some(*tool),
            ToolState::Idle => None,
        }
    }

    /// Stroke to draw for the interaction so far.
    pub fn preview(&self) -> Option<Stroke> {
        let ToolState::Active {
            tool,
            style,
            start,
            current,
            points,
        } = &self.state
        else {
            return None;
        };

        let shape = match tool {
            ToolKind::Freehand if points.len() >= 2 => StrokeShape::Polyline(points.clone()),
            ToolKind::Freehand => return None,
            ToolKind::Line => StrokeShape::Segment {
                start: *start,
                end: *current,
            },
            ToolKind::Circle => StrokeShape::Circle {
                center: *start,
                radius: start.distance(*current),
            },
            ToolKind::Eraser => StrokeShape::EraseMask(points.clone()),
        };
        Some(Stroke::new(shape, style.clone()))
    }
}
