//! InkDuel Core Library
//!
//! Platform-agnostic drawing sync for the InkDuel draw-and-guess game: the
//! operation model and wire codec, per-surface op logs with optimistic echo
//! reconciliation, eraser hit testing and server-synchronized phase timers.

pub mod clock;
pub mod config;
pub mod geometry;
pub mod lenient;
pub mod mapper;
pub mod operation;
pub mod oplog;
pub mod reconcile;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod sync;
pub mod tools;

pub use clock::{ManualClock, PhaseClock, PhaseTimer, SystemClock, TimeSource};
pub use config::SessionConfig;
pub use geometry::{EraserRule, hit_stroke};
pub use mapper::CoordinateMapper;
pub use operation::{Operation, TaggedOperation, decode_operation, decode_operation_with};
pub use oplog::OpLog;
pub use reconcile::{Disposition, Reconciler};
pub use session::{RoomMode, RoomSession, SessionError, SessionEvent};
pub use stroke::{Stroke, StrokeShape, StrokeStyle};
pub use surface::{DrawingSurface, Frame, SurfaceId, SurfaceView};
pub use sync::{ClientMessage, Outbox, ServerMessage, Transport};
pub use tools::{StrokeBuilder, ToolKind};
