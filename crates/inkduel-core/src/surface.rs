//! One drawing surface: op log, in-progress stroke, echo reconciliation, display.

use crate::config::SessionConfig;
use crate::operation::{Operation, TaggedOperation};
use crate::oplog::OpLog;
use crate::reconcile::{Disposition, Reconciler};
use crate::stroke::{Stroke, StrokeStyle};
use crate::sync::{ClientMessage, Transport};
use crate::tools::{StrokeBuilder, ToolKind};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Identifies a drawing surface within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceId {
    /// The single shared board.
    #[serde(rename = "main")]
    Main,
    /// Team A's board.
    A,
    /// Team B's board.
    B,
}

impl SurfaceId {
    /// Parse a wire `canvas` value.
    pub fn parse(canvas: &str) -> Option<Self> {
        match canvas {
            "main" | "MAIN" => Some(SurfaceId::Main),
            "A" | "a" => Some(SurfaceId::A),
            "B" | "b" => Some(SurfaceId::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceId::Main => "main",
            SurfaceId::A => "A",
            SurfaceId::B => "B",
        }
    }

    /// `canvas` field for outgoing operations; the shared board omits it.
    pub fn wire_canvas(self) -> Option<String> {
        match self {
            SurfaceId::Main => None,
            team => Some(team.as_str().to_string()),
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a display needs to draw a surface.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub surface: SurfaceId,
    pub strokes: &'a [Stroke],
    /// In-progress stroke, drawn on top.
    pub preview: Option<&'a Stroke>,
}

/// A display a surface presents into.
pub trait SurfaceView {
    fn present(&mut self, frame: &Frame<'_>);
}

/// Drawing engine for one surface.
pub struct DrawingSurface {
    id: SurfaceId,
    log: OpLog,
    reconciler: Reconciler,
    builder: StrokeBuilder,
    preview: Option<Stroke>,
    transport: Rc<dyn Transport>,
    view: Option<Box<dyn SurfaceView>>,
    drawable: bool,
}

impl fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("id", &self.id)
            .field("strokes", &self.log.strokes().len())
            .field("pending", &self.reconciler.pending_len())
            .field("drawable", &self.drawable)
            .field("has_view", &self.view.is_some())
            .finish()
    }
}

impl DrawingSurface {
    pub fn new(
        id: SurfaceId,
        participant_id: Option<String>,
        transport: Rc<dyn Transport>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            id,
            log: OpLog::new(config.eraser_rule()),
            reconciler: Reconciler::new(participant_id),
            builder: StrokeBuilder::new(config.min_circle_radius),
            preview: None,
            transport,
            view: None,
            drawable: true,
        }
    }

    /// Construct with a display already attached.
    pub fn with_view(mut self, view: Box<dyn SurfaceView>) -> Self {
        self.attach_view(view);
        self
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Attach a display and present the current state into it.
    pub fn attach_view(&mut self, view: Box<dyn SurfaceView>) {
        self.view = Some(view);
        self.present();
    }

    /// Allow or refuse local drawing. Remote operations are applied either way.
    pub fn set_drawable(&mut self, drawable: bool) {
        self.drawable = drawable;
    }

    pub fn is_drawable(&self) -> bool {
        self.drawable
    }

    pub fn set_participant(&mut self, participant_id: &str) {
        self.reconciler.set_participant(participant_id);
    }

    /// Open a new in-progress stroke. Returns whether one was opened.
    pub fn begin_stroke(&mut self, tool: ToolKind, style: StrokeStyle, start: Point) -> bool {
        if !self.drawable {
            return false;
        }
        self.builder.begin(tool, style, start);
        self.refresh_preview();
        true
    }

    /// Extend the in-progress stroke.
    pub fn extend_stroke(&mut self, point: Point) {
        if !self.drawable || !self.builder.is_active() {
            return;
        }
        self.builder.update(point);
        self.refresh_preview();
    }

    /// Finish the in-progress stroke, render it optimistically and send it.
    ///
    /// Returns the operation sent, if the stroke produced one.
    pub fn commit_stroke(&mut self) -> Option<TaggedOperation> {
        if !self.builder.is_active() {
            return None;
        }
        if !self.drawable {
            self.builder.cancel();
            self.refresh_preview();
            return None;
        }
        let op = self.builder.finish();
        self.preview = None;
        match op {
            Some(op) => Some(self.submit(op)),
            None => {
                self.present();
                None
            }
        }
    }

    /// The pointer left the surface: keep what was drawn so far.
    pub fn abandon_stroke(&mut self) -> Option<TaggedOperation> {
        self.commit_stroke()
    }

    /// Clear the surface locally and send the clear.
    pub fn clear_surface(&mut self) -> TaggedOperation {
        self.builder.cancel();
        self.preview = None;
        self.submit(Operation::Clear)
    }

    fn submit(&mut self, op: Operation) -> TaggedOperation {
        self.log.apply_one(op.clone());
        let tagged = self.reconciler.stamp(op);
        self.transport.send(&ClientMessage::DrawOp {
            canvas: self.id.wire_canvas(),
            op: tagged.to_wire(),
        });
        self.present();
        tagged
    }

    /// Replace all state with a full snapshot.
    pub fn apply_snapshot<I>(&mut self, operations: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        self.log.rebuild(operations);
        self.reconciler.clear_pending();
        log::info!("Surface {} rebuilt from snapshot: {} strokes", self.id, self.log.strokes().len());
        self.present();
    }

    /// Apply an operation broadcast by the server, unless it is our own echo.
    pub fn apply_remote(&mut self, op: TaggedOperation, origin: Option<&str>) -> Disposition {
        let disposition = self.reconciler.on_broadcast(&op, origin);
        if disposition == Disposition::Apply {
            self.log.apply_one(op.op);
            self.present();
        }
        disposition
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.log.strokes()
    }

    pub fn operations(&self) -> &[Operation] {
        self.log.operations()
    }

    pub fn preview(&self) -> Option<&Stroke> {
        self.preview.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.reconciler.pending_len()
    }

    pub fn is_stroking(&self) -> bool {
        self.builder.is_active()
    }

    pub fn current_tool(&self) -> Option<ToolKind> {
        self.builder.current_tool()
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            surface: self.id,
            strokes: self.log.strokes(),
            preview: self.preview.as_ref(),
        }
    }

    fn refresh_preview(&mut self) {
        self.preview = self.builder.preview();
        self.present();
    }

    fn present(&mut self) {
        if let Some(view) = self.view.as_mut() {
            let frame = Frame {
                surface: self.id,
                strokes: self.log.strokes(),
                preview: self.preview.as_ref(),
            };
            view.present(&frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ErasePayload, LinePayload, decode_operation};
    use crate::sync::Outbox;
    use serde_json::{Value, json};
    use std::cell::RefCell;

    #[derive(Default)]
    struct CountingView {
        frames: Rc<RefCell<Vec<(usize, bool)>>>,
    }

    impl SurfaceView for CountingView {
        fn present(&mut self, frame: &Frame<'_>) {
            self.frames.borrow_mut().push((frame.strokes.len(), frame.preview.is_some()));
        }
    }

    fn surface(id: SurfaceId) -> (Rc<Outbox>, DrawingSurface) {
        let outbox = Rc::new(Outbox::new());
        let surface = DrawingSurface::new(id, Some("me".into()), outbox.clone(), &SessionConfig::default());
        (outbox, surface)
    }

    fn draw_line(surface: &mut DrawingSurface, from: Point, to: Point) -> TaggedOperation {
        surface.begin_stroke(ToolKind::Line, StrokeStyle::default(), from);
        surface.extend_stroke(to);
        surface.commit_stroke().unwrap()
    }

    #[test]
    fn test_commit_renders_and_sends() {
        let (outbox, mut surface) = surface(SurfaceId::A);
        draw_line(&mut surface, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert_eq!(surface.strokes().len(), 1);
        assert_eq!(surface.pending_len(), 1);

        let sent = outbox.take_outgoing();
        assert_eq!(sent.len(), 1);
        let msg: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(msg["type"], "draw_op");
        assert_eq!(msg["canvas"], "A");
        assert_eq!(msg["op"]["t"], "line");
        assert!(msg["op"]["p"]["cid"].is_string());
    }

    #[test]
    fn test_main_surface_omits_canvas() {
        let (outbox, mut surface) = surface(SurfaceId::Main);
        surface.clear_surface();
        let msg: Value = serde_json::from_str(&outbox.take_outgoing()[0]).unwrap();
        assert!(msg.get("canvas").is_none());
    }

    #[test]
    fn test_own_echo_not_duplicated() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        let sent = draw_line(&mut surface, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        let echo = decode_operation(&serde_json::to_value(sent.to_wire()).unwrap()).unwrap();
        assert_eq!(surface.apply_remote(echo, Some("me")), Disposition::DiscardEcho);
        assert_eq!(surface.strokes().len(), 1);
        assert_eq!(surface.pending_len(), 0);
    }

    #[test]
    fn test_remote_applied() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        let op = decode_operation(&json!({"t": "line", "p": {"pts": [[1, 1], [9, 9]]}})).unwrap();
        assert_eq!(surface.apply_remote(op, Some("them")), Disposition::Apply);
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn test_not_drawable_refuses_and_discards() {
        let (outbox, mut surface) = surface(SurfaceId::Main);
        surface.set_drawable(false);
        assert!(!surface.begin_stroke(ToolKind::Freehand, StrokeStyle::default(), Point::ZERO));
        assert!(!surface.is_stroking());

        surface.set_drawable(true);
        surface.begin_stroke(ToolKind::Freehand, StrokeStyle::default(), Point::ZERO);
        surface.extend_stroke(Point::new(10.0, 10.0));
        surface.set_drawable(false);
        surface.extend_stroke(Point::new(20.0, 20.0));
        assert!(surface.commit_stroke().is_none());
        assert!(surface.strokes().is_empty());
        assert!(!outbox.has_outgoing());
    }

    #[test]
    fn test_abandon_commits_partial() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        surface.begin_stroke(ToolKind::Freehand, StrokeStyle::default(), Point::ZERO);
        surface.extend_stroke(Point::new(5.0, 5.0));
        assert!(surface.preview().is_some());
        let op = surface.abandon_stroke().unwrap();
        assert!(matches!(op.op, Operation::Line(_)));
        assert!(surface.preview().is_none());
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn test_erase_filters_committed() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        draw_line(&mut surface, Point::new(0.0, 100.0), Point::new(200.0, 100.0));
        surface.begin_stroke(ToolKind::Eraser, StrokeStyle::default(), Point::new(100.0, 95.0));
        surface.extend_stroke(Point::new(101.0, 95.0));
        // Erased at commit, not while dragging.
        assert_eq!(surface.strokes().len(), 1);
        surface.commit_stroke();
        assert!(surface.strokes().is_empty());
    }

    #[test]
    fn test_snapshot_replaces_state_and_pending() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        draw_line(&mut surface, Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let ops = vec![
            Operation::Line(LinePayload::new(vec![Point::ZERO, Point::new(3.0, 3.0)], StrokeStyle::default())),
            Operation::Line(LinePayload::new(vec![Point::new(100.0, 0.0), Point::new(100.0, 3.0)], StrokeStyle::default())),
            Operation::Erase(ErasePayload::new(vec![Point::new(100.0, 1.0)], 4.0)),
        ];
        surface.apply_snapshot(ops.clone());
        assert_eq!(surface.pending_len(), 0);
        assert_eq!(surface.strokes().len(), 1);
        surface.apply_snapshot(ops);
        assert_eq!(surface.strokes().len(), 1);
    }

    #[test]
    fn test_view_presented_on_attach() {
        let (_outbox, mut surface) = surface(SurfaceId::Main);
        draw_line(&mut surface, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        let view = CountingView::default();
        let frames = view.frames.clone();
        surface.attach_view(Box::new(view));
        assert_eq!(frames.borrow().as_slice(), &[(1, false)]);

        surface.begin_stroke(ToolKind::Freehand, StrokeStyle::default(), Point::ZERO);
        surface.extend_stroke(Point::new(1.0, 1.0));
        assert_eq!(frames.borrow().last(), Some(&(1, true)));
    }
}
