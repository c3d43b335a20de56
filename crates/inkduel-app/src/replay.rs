//! Transcript replay.
//!
//! A transcript is a JSON-lines file of server messages as one participant
//! received them. Replaying feeds each line into a fresh [`RoomSession`],
//! ticks the phase timer after every message and writes the final state of
//! each surface as SVG.

use inkduel_core::clock::ManualClock;
use inkduel_core::config::SessionConfig;
use inkduel_core::session::{RoomMode, RoomSession, SessionEvent};
use inkduel_core::sync::{Outbox, ServerMessage, parse_server_message};
use inkduel_render::{RenderedView, RendererError, SvgRenderer};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Render error: {0}")]
    Render(#[from] RendererError),
}

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// What to replay and where to put the output.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub transcript: PathBuf,
    pub participant: Option<String>,
    pub mode: RoomMode,
    /// Container width the boards are laid out in.
    pub width: f64,
    pub config: SessionConfig,
    pub out_dir: PathBuf,
}

/// Outcome of a replay.
#[derive(Debug, Default)]
pub struct ReplaySummary {
    /// Messages dispatched to the session.
    pub messages: usize,
    /// Lines that failed to decode.
    pub skipped: usize,
    /// Every message the session sent, in order.
    pub outgoing: Vec<String>,
    /// Number of phase expiries observed.
    pub expiries: usize,
    /// SVG files written, one per surface.
    pub files: Vec<PathBuf>,
}

/// Load a config file over the defaults, or the defaults alone.
pub fn load_config(path: Option<&Path>) -> ReplayResult<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let json = fs::read_to_string(path)
        .map_err(|e| ReplayError::Io(format!("Failed to read config {}: {}", path.display(), e)))?;
    Ok(SessionConfig::from_json(&json)?)
}

/// Replay a transcript and write one SVG per surface.
pub fn run(options: &ReplayOptions) -> ReplayResult<ReplaySummary> {
    let transcript = fs::read_to_string(&options.transcript).map_err(|e| {
        ReplayError::Io(format!("Failed to read transcript {}: {}", options.transcript.display(), e))
    })?;

    let outbox = Rc::new(Outbox::new());
    // Replay time follows the server timestamps in the transcript.
    let clock = Rc::new(ManualClock::new(0.0));
    let mut session = RoomSession::new(
        options.mode,
        options.participant.clone(),
        outbox.clone(),
        options.config.clone(),
    )
    .with_time_source(Box::new(Rc::clone(&clock)));

    let mapper = options.config.mapper();
    let display = mapper.fit_width(options.width);
    let mut renderers: Vec<(String, Rc<RefCell<SvgRenderer>>)> = Vec::new();
    for &id in options.mode.surfaces() {
        let (view, handle) = RenderedView::shared(SvgRenderer::new(), display);
        let view = view.with_mapper(mapper).with_eraser(options.config.eraser_rule());
        if let Some(surface) = session.surface_mut(id) {
            surface.attach_view(Box::new(view));
            renderers.push((id.as_str().to_string(), handle));
        }
    }

    let mut summary = ReplaySummary::default();
    for (index, line) in transcript.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message = match parse_server_message(line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Skipping transcript line {}: {}", index + 1, e);
                summary.skipped += 1;
                continue;
            }
        };
        if let ServerMessage::RoomSnapshot { server_ts: Some(ts), .. } = &message {
            clock.set(*ts);
        }
        session.dispatch(message);
        summary.messages += 1;

        for event in session.tick() {
            match event {
                SessionEvent::Countdown { remaining } => log::debug!("Countdown: {}s", remaining),
                SessionEvent::PhaseExpired => {
                    log::info!("Phase {:?} expired", session.phase());
                    summary.expiries += 1;
                }
            }
        }
        for sent in outbox.take_outgoing() {
            log::info!("Outgoing: {}", sent);
            summary.outgoing.push(sent);
        }
    }
    session.teardown();

    fs::create_dir_all(&options.out_dir).map_err(|e| {
        ReplayError::Io(format!("Failed to create output directory {}: {}", options.out_dir.display(), e))
    })?;
    for (name, handle) in renderers {
        let path = options.out_dir.join(format!("surface-{}.svg", name));
        let renderer = handle.borrow();
        fs::write(&path, renderer.document()?)
            .map_err(|e| ReplayError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::info!("Wrote {}", path.display());
        summary.files.push(path);
    }
    Ok(summary)
}
