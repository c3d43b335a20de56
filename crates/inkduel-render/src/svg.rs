//! SVG renderer.
//!
//! Produces a standalone SVG document in display pixels, one element per
//! stroke. Used for replay output and snapshot tests where no GPU is around.

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError, stroke_color};
use inkduel_core::stroke::{Stroke, StrokeShape};
use kurbo::Point;
use peniko::Color;

/// Opacity of the eraser swath preview.
const ERASER_PREVIEW_OPACITY: f64 = 0.35;

/// Renders frames into an SVG document.
#[derive(Debug, Default, Clone)]
pub struct SvgRenderer {
    document: Option<String>,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last document built.
    pub fn document(&self) -> RenderResult<&str> {
        self.document.as_deref().ok_or(RendererError::Empty)
    }

    pub fn into_document(self) -> RenderResult<String> {
        self.document.ok_or(RendererError::Empty)
    }
}

impl Renderer for SvgRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        let size = ctx.display_size;
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = num(size.width),
            h = num(size.height),
        );
        out.push('\n');
        out.push_str(&format!(
            r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
            num(size.width),
            num(size.height),
            paint(self.background_color(ctx)),
        ));
        out.push('\n');

        for stroke in ctx.strokes {
            if let Some(element) = stroke_element(ctx, stroke) {
                out.push_str(&element);
                out.push('\n');
            }
        }
        if let Some(preview) = ctx.preview {
            if let Some(element) = stroke_element(ctx, preview) {
                out.push_str(&element);
                out.push('\n');
            }
        }
        out.push_str("</svg>\n");
        self.document = Some(out);
    }
}

fn stroke_element(ctx: &RenderContext, stroke: &Stroke) -> Option<String> {
    let display = ctx.display_size;
    let to_px = |p: Point| ctx.mapper.to_pixel(p, display);
    let width = ctx.mapper.to_pixel_length(stroke.style.width, display).max(1.0);
    let color = stroke_color(&stroke.style.color);
    let stroke_attrs = format!(
        r#"fill="none" stroke="{}"{} stroke-width="{}" stroke-linecap="round" stroke-linejoin="round""#,
        paint(color),
        opacity(color),
        num(width),
    );

    let element = match &stroke.shape {
        StrokeShape::Segment { start, end } => {
            let (a, b) = (to_px(*start), to_px(*end));
            format!(
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {}/>"#,
                num(a.x),
                num(a.y),
                num(b.x),
                num(b.y),
                stroke_attrs
            )
        }
        StrokeShape::Polyline(points) => {
            format!(r#"<polyline points="{}" {}/>"#, point_list(points, to_px), stroke_attrs)
        }
        StrokeShape::Circle { center, radius } => {
            let c = to_px(*center);
            let r = ctx.mapper.to_pixel_length(*radius, display);
            format!(r#"<circle cx="{}" cy="{}" r="{}" {}/>"#, num(c.x), num(c.y), num(r), stroke_attrs)
        }
        StrokeShape::EraseMask(points) => {
            if points.is_empty() {
                return None;
            }
            let diameter = ctx.mapper.to_pixel_length(ctx.eraser.radius(stroke.style.width) * 2.0, display);
            format!(
                r##"<polyline points="{}" fill="none" stroke="#808080" stroke-opacity="{}" stroke-width="{}" stroke-linecap="round" stroke-linejoin="round"/>"##,
                point_list(points, to_px),
                num(ERASER_PREVIEW_OPACITY),
                num(diameter.max(1.0)),
            )
        }
    };
    Some(element)
}

fn point_list(points: &[Point], to_px: impl Fn(Point) -> Point) -> String {
    points
        .iter()
        .map(|p| {
            let px = to_px(*p);
            format!("{},{}", num(px.x), num(px.y))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `#rrggbb` for a color, alpha handled separately.
fn paint(color: Color) -> String {
    let c = color.to_rgba8();
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}

fn opacity(color: Color) -> String {
    let a = color.to_rgba8().a;
    if a == 255 {
        String::new()
    } else {
        format!(r#" stroke-opacity="{}""#, num(f64::from(a) / 255.0))
    }
}

/// Shortest decimal form with at most two fractional digits.
fn num(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
