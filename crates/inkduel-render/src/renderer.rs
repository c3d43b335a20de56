//! Renderer trait abstraction.

use inkduel_core::geometry::EraserRule;
use inkduel_core::mapper::CoordinateMapper;
use inkduel_core::stroke::Stroke;
use inkduel_core::surface::Frame;
use kurbo::Size;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Nothing rendered yet")]
    Empty,
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Parse a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
pub fn parse_color(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    match hex.len() {
        3 => Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        6 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Parse a stroke color, falling back to black.
pub fn stroke_color(s: &str) -> Color {
    parse_color(s).unwrap_or_else(|| {
        log::debug!("Unparseable color {:?}, drawing black", s);
        Color::BLACK
    })
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Committed strokes, in drawing order.
    pub strokes: &'a [Stroke],
    /// In-progress stroke drawn over everything else.
    pub preview: Option<&'a Stroke>,
    /// Display size in pixels.
    pub display_size: Size,
    /// Logical-to-display mapping.
    pub mapper: CoordinateMapper,
    /// Background color.
    pub background_color: Color,
    /// Used to size the eraser preview.
    pub eraser: EraserRule,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(strokes: &'a [Stroke], display_size: Size) -> Self {
        Self {
            strokes,
            preview: None,
            display_size,
            mapper: CoordinateMapper::default(),
            background_color: Color::WHITE,
            eraser: EraserRule::default(),
        }
    }

    /// Context for a surface frame.
    pub fn from_frame(frame: &Frame<'a>, display_size: Size) -> Self {
        Self::new(frame.strokes, display_size).with_preview(frame.preview)
    }

    pub fn with_preview(mut self, preview: Option<&'a Stroke>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_mapper(mut self, mapper: CoordinateMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_eraser(mut self, eraser: EraserRule) -> Self {
        self.eraser = eraser;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the scene for a frame.
    ///
    /// Called on every present and replaces whatever the previous call built.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_forms() {
        let rgba = |c: Color| {
            let c = c.to_rgba8();
            (c.r, c.g, c.b, c.a)
        };
        assert_eq!(rgba(parse_color("#ff0000").unwrap()), (255, 0, 0, 255));
        assert_eq!(rgba(parse_color("#0f8").unwrap()), (0, 255, 136, 255));
        assert_eq!(rgba(parse_color(" #11223380 ").unwrap()), (17, 34, 51, 128));
    }

    #[test]
    fn test_bad_color_falls_back_to_black() {
        assert!(parse_color("red").is_none());
        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#ééé").is_none());
        let black = stroke_color("rgb(1,2,3)").to_rgba8();
        assert_eq!((black.r, black.g, black.b, black.a), (0, 0, 0, 255));
    }
}
