//! InkDuel Render Library
//!
//! Renderer abstraction for InkDuel surfaces, an SVG implementation, and the
//! adapter that lets a drawing surface present into any renderer.

mod renderer;
pub mod svg;
pub mod view;

pub use renderer::{RenderContext, RenderResult, Renderer, RendererError, parse_color, stroke_color};
pub use svg::SvgRenderer;
pub use view::RenderedView;
