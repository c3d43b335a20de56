//! Session configuration.

use crate::geometry::EraserRule;
use crate::mapper::{CoordinateMapper, LOGICAL_HEIGHT, LOGICAL_WIDTH};
use crate::stroke::{DEFAULT_COLOR, DEFAULT_WIDTH, StrokeStyle};
use crate::tools::MIN_CIRCLE_RADIUS;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Tunables shared by every surface in a session.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub logical_width: f64,
    pub logical_height: f64,
    /// Interval between countdown ticks.
    pub tick_interval_ms: u64,
    pub eraser_min_radius: f64,
    pub eraser_width_factor: f64,
    pub default_color: String,
    pub default_width: f64,
    pub min_circle_radius: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let eraser = EraserRule::default();
        Self {
            logical_width: LOGICAL_WIDTH,
            logical_height: LOGICAL_HEIGHT,
            tick_interval_ms: 250,
            eraser_min_radius: eraser.min_radius,
            eraser_width_factor: eraser.width_factor,
            default_color: DEFAULT_COLOR.to_string(),
            default_width: DEFAULT_WIDTH,
            min_circle_radius: MIN_CIRCLE_RADIUS,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(Size::new(self.logical_width, self.logical_height))
    }

    pub fn eraser_rule(&self) -> EraserRule {
        EraserRule {
            min_radius: self.eraser_min_radius,
            width_factor: self.eraser_width_factor,
        }
    }

    /// Style for strokes drawn without an explicit color or width.
    pub fn default_style(&self) -> StrokeStyle {
        StrokeStyle::new(self.default_color.clone(), self.default_width)
    }
}
