//! A participant's view of one room: its surfaces, phase and countdown.

use crate::clock::{PhaseClock, PhaseTimer, TimeSource};
use crate::config::SessionConfig;
use crate::operation::{TaggedOperation, decode_operation_with};
use crate::reconcile::Disposition;
use crate::stroke::StrokeStyle;
use crate::surface::{DrawingSurface, SurfaceId};
use crate::sync::{Budget, ClientMessage, GameState, ProtocolError, ServerMessage, Transport, parse_server_message};
use crate::tools::ToolKind;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the host while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] ProtocolError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Room layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomMode {
    /// One shared board.
    #[default]
    Single,
    /// One board per team.
    Team,
}

impl RoomMode {
    pub fn surfaces(self) -> &'static [SurfaceId] {
        match self {
            RoomMode::Single => &[SurfaceId::Main],
            RoomMode::Team => &[SurfaceId::A, SurfaceId::B],
        }
    }

    /// Surface for operations that name no canvas.
    pub fn default_surface(self) -> SurfaceId {
        match self {
            RoomMode::Single => SurfaceId::Main,
            RoomMode::Team => SurfaceId::A,
        }
    }
}

/// Something the host should react to after a timer turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Seconds left in the current phase.
    Countdown { remaining: u64 },
    /// The current phase's deadline just passed.
    PhaseExpired,
}

/// Client-side room state driven by server messages and timer ticks.
pub struct RoomSession {
    mode: RoomMode,
    participant_id: Option<String>,
    transport: Rc<dyn Transport>,
    config: SessionConfig,
    surfaces: BTreeMap<SurfaceId, DrawingSurface>,
    clock: PhaseClock,
    timer: PhaseTimer,
    phase: Option<String>,
    game: GameState,
    budget: Budget,
    active: bool,
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("mode", &self.mode)
            .field("participant_id", &self.participant_id)
            .field("phase", &self.phase)
            .field("budget", &self.budget)
            .field("surfaces", &self.surfaces)
            .finish()
    }
}

impl RoomSession {
    pub fn new(
        mode: RoomMode,
        participant_id: Option<String>,
        transport: Rc<dyn Transport>,
        config: SessionConfig,
    ) -> Self {
        let surfaces = mode
            .surfaces()
            .iter()
            .map(|&id| {
                let surface = DrawingSurface::new(id, participant_id.clone(), Rc::clone(&transport), &config);
                (id, surface)
            })
            .collect();
        Self {
            mode,
            participant_id,
            transport,
            config,
            surfaces,
            clock: PhaseClock::default(),
            timer: PhaseTimer::new(),
            phase: None,
            game: GameState::default(),
            budget: Budget::default(),
            active: true,
        }
    }

    /// Replace the time source (tests, replays).
    pub fn with_time_source(mut self, source: Box<dyn TimeSource>) -> Self {
        self.clock = PhaseClock::new(source);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&DrawingSurface> {
        self.surfaces.get(&id)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut DrawingSurface> {
        self.surfaces.get_mut(&id)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &DrawingSurface> {
        self.surfaces.values()
    }

    /// Parse and dispatch one inbound message.
    pub fn handle_message(&mut self, json: &str) -> SessionResult<()> {
        let message = parse_server_message(json)?;
        self.dispatch(message);
        Ok(())
    }

    /// Dispatch an already-parsed message.
    pub fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::RoomSnapshot { ops, server_ts, game } => self.on_snapshot(ops, server_ts, game),
            ServerMessage::OpBroadcast { op, by, canvas } => self.on_broadcast(&op, by.as_deref(), canvas.as_deref()),
            ServerMessage::BudgetUpdate { budget } => {
                log::debug!("Budget update: {:?}", budget);
                self.budget = budget;
            }
            ServerMessage::PhaseChanged { phase } => {
                log::info!("Phase changed to {:?}", phase);
                self.phase = phase;
                self.refresh_deadline();
                // Deadlines for the new phase only arrive with the next snapshot.
                self.transport.send(&ClientMessage::Snapshot);
            }
            ServerMessage::Hello { pid } => {
                if self.participant_id.is_none() {
                    log::info!("Server assigned participant id {}", pid);
                    for surface in self.surfaces.values_mut() {
                        surface.set_participant(&pid);
                    }
                    self.participant_id = Some(pid);
                }
            }
            ServerMessage::Error { message } => {
                log::warn!("Server error: {}", message.as_deref().unwrap_or("unknown"));
            }
            ServerMessage::Unknown => {}
        }
    }

    fn on_snapshot(&mut self, ops: Vec<Value>, server_ts: Option<f64>, game: Option<GameState>) {
        if let Some(ts) = server_ts {
            self.clock.sync(ts);
        }
        if let Some(game) = game {
            if let Some(phase) = &game.phase {
                self.phase = Some(phase.clone());
            }
            if let Some(budget) = &game.budget {
                self.budget = budget.clone();
            }
            self.game = game;
        }
        self.refresh_deadline();

        let defaults = self.config.default_style();
        let mut partitioned: BTreeMap<SurfaceId, Vec<_>> =
            self.surfaces.keys().map(|&id| (id, Vec::new())).collect();
        for entry in &ops {
            let (canvas, raw) = split_snapshot_entry(entry);
            let Some(target) = self.resolve_surface(canvas) else {
                log::warn!("Dropping snapshot op for unknown surface {:?}", canvas);
                continue;
            };
            if let (Some(op), Some(list)) = (decode_operation_with(raw, &defaults), partitioned.get_mut(&target)) {
                list.push(op.op);
            }
        }
        for (id, list) in partitioned {
            if let Some(surface) = self.surfaces.get_mut(&id) {
                surface.apply_snapshot(list);
            }
        }
    }

    fn on_broadcast(&mut self, op: &Value, by: Option<&str>, canvas: Option<&str>) {
        let Some(tagged) = decode_operation_with(op, &self.config.default_style()) else {
            return;
        };
        let Some(target) = self.resolve_surface(canvas) else {
            log::warn!("Dropping broadcast for unknown surface {:?}", canvas);
            return;
        };
        if let Some(surface) = self.surfaces.get_mut(&target) {
            if surface.apply_remote(tagged, by) == Disposition::DiscardEcho {
                log::debug!("Discarded own echo on surface {}", target);
            }
        }
    }

    /// Surface an operation belongs to, if this session has it.
    fn resolve_surface(&self, canvas: Option<&str>) -> Option<SurfaceId> {
        let id = match canvas {
            None => self.mode.default_surface(),
            Some(name) => SurfaceId::parse(name)?,
        };
        self.surfaces.contains_key(&id).then_some(id)
    }

    fn refresh_deadline(&mut self) {
        let deadline = self.phase.as_deref().and_then(|phase| self.game.deadline_for(phase));
        self.timer.set_deadline(deadline);
    }

    /// Seconds left in the current phase, if it has a deadline.
    pub fn remaining(&self) -> Option<u64> {
        self.timer.deadline().map(|deadline| self.clock.remaining(deadline))
    }

    /// One timer turn.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        if !self.active {
            return Vec::new();
        }
        let Some(tick) = self.timer.tick(&self.clock) else {
            return Vec::new();
        };
        let mut events = vec![SessionEvent::Countdown { remaining: tick.remaining }];
        if tick.expired {
            log::info!("Phase {:?} timer expired, requesting snapshot", self.phase);
            events.push(SessionEvent::PhaseExpired);
            self.transport.send(&ClientMessage::Snapshot);
        }
        events
    }

    /// Whether the budget still allows ink on a surface.
    pub fn has_budget(&self, surface: SurfaceId) -> bool {
        self.budget.remaining(surface.as_str()).is_none_or(|left| left > 0)
    }

    /// Start a stroke, unless the surface's budget is spent. Erasing is always allowed.
    pub fn begin_stroke(&mut self, surface: SurfaceId, tool: ToolKind, style: StrokeStyle, start: Point) -> bool {
        if !tool.is_eraser() && !self.has_budget(surface) {
            log::debug!("Stroke refused on {}: budget exhausted", surface);
            return false;
        }
        self.surfaces
            .get_mut(&surface)
            .is_some_and(|s| s.begin_stroke(tool, style, start))
    }

    pub fn extend_stroke(&mut self, surface: SurfaceId, point: Point) {
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.extend_stroke(point);
        }
    }

    pub fn commit_stroke(&mut self, surface: SurfaceId) -> Option<TaggedOperation> {
        self.surfaces.get_mut(&surface)?.commit_stroke()
    }

    pub fn clear_surface(&mut self, surface: SurfaceId) -> Option<TaggedOperation> {
        Some(self.surfaces.get_mut(&surface)?.clear_surface())
    }

    /// Ask the server for a full snapshot.
    pub fn request_resync(&self) {
        self.transport.send(&ClientMessage::Snapshot);
    }

    /// Stop producing timer events.
    pub fn teardown(&mut self) {
        self.active = false;
        self.timer.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Split a snapshot entry into its canvas and operation.
///
/// Entries are either `{canvas, op}` wrappers or bare operations carrying an
/// optional `canvas` field.
fn split_snapshot_entry(entry: &Value) -> (Option<&str>, &Value) {
    let canvas = entry.get("canvas").and_then(Value::as_str);
    match entry.get("op") {
        Some(op @ Value::Object(_)) => (canvas, op),
        _ => (canvas, entry),
    }
}
