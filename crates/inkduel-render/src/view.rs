//! Renderer-backed display for a drawing surface.

use crate::renderer::{RenderContext, Renderer};
use inkduel_core::geometry::EraserRule;
use inkduel_core::mapper::CoordinateMapper;
use inkduel_core::surface::{Frame, SurfaceView};
use kurbo::Size;
use peniko::Color;
use std::cell::RefCell;
use std::rc::Rc;

/// Presents surface frames through a shared renderer.
///
/// The renderer is shared so the host can read its output after the surface
/// takes ownership of the view.
pub struct RenderedView<R: Renderer> {
    renderer: Rc<RefCell<R>>,
    display_size: Size,
    mapper: CoordinateMapper,
    background_color: Color,
    eraser: EraserRule,
    frames: usize,
}

impl<R: Renderer> RenderedView<R> {
    pub fn new(renderer: Rc<RefCell<R>>, display_size: Size) -> Self {
        Self {
            renderer,
            display_size,
            mapper: CoordinateMapper::default(),
            background_color: Color::WHITE,
            eraser: EraserRule::default(),
            frames: 0,
        }
    }

    /// Wrap a renderer, returning the view and a handle to the renderer.
    pub fn shared(renderer: R, display_size: Size) -> (Self, Rc<RefCell<R>>) {
        let handle = Rc::new(RefCell::new(renderer));
        (Self::new(Rc::clone(&handle), display_size), handle)
    }

    pub fn with_mapper(mut self, mapper: CoordinateMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_eraser(mut self, eraser: EraserRule) -> Self {
        self.eraser = eraser;
        self
    }

    /// Number of frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl<R: Renderer> SurfaceView for RenderedView<R> {
    fn present(&mut self, frame: &Frame<'_>) {
        let ctx = RenderContext::from_frame(frame, self.display_size)
            .with_mapper(self.mapper)
            .with_background(self.background_color)
            .with_eraser(self.eraser);
        match self.renderer.try_borrow_mut() {
            Ok(mut renderer) => {
                renderer.build_scene(&ctx);
                self.frames += 1;
            }
            Err(_) => log::warn!("Renderer busy, skipping frame for surface {}", frame.surface),
        }
    }
}
