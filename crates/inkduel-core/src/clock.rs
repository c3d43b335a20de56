//! Server-synchronized countdowns.
//!
//! Deadlines come from the server in server time. Local clocks can be skewed by
//! minutes, so the remaining time is always derived from the last server
//! timestamp plus the local time elapsed since it arrived.

use std::cell::Cell;

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the local wall-clock time, in seconds since the Unix epoch.
pub trait TimeSource {
    fn now(&self) -> f64;
}

/// The platform clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            Err(_) => 0.0,
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::rc::Rc<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// A server timestamp and the local time it was received at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSync {
    pub server_timestamp: f64,
    pub local_at_receipt: f64,
}

/// Maps local time onto server time.
pub struct PhaseClock {
    source: Box<dyn TimeSource>,
    sync: Option<ClockSync>,
    unsynced_logged: Cell<bool>,
}

impl std::fmt::Debug for PhaseClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseClock").field("sync", &self.sync).finish()
    }
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl PhaseClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            sync: None,
            unsynced_logged: Cell::new(false),
        }
    }

    /// Record a server timestamp received just now.
    pub fn sync(&mut self, server_timestamp: f64) {
        if !server_timestamp.is_finite() || server_timestamp <= 0.0 {
            log::debug!("Ignoring unusable server timestamp {}", server_timestamp);
            return;
        }
        self.sync = Some(ClockSync {
            server_timestamp,
            local_at_receipt: self.source.now(),
        });
    }

    pub fn last_sync(&self) -> Option<ClockSync> {
        self.sync
    }

    /// Current time on the server's clock.
    ///
    /// Before any sync the local clock stands in for the server's.
    pub fn server_now(&self) -> f64 {
        let local = self.source.now();
        match self.sync {
            Some(sync) => sync.server_timestamp + (local - sync.local_at_receipt),
            None => {
                if !self.unsynced_logged.replace(true) {
                    log::debug!("No server timestamp yet, using local clock");
                }
                local
            }
        }
    }

    /// Local time minus server time.
    pub fn drift(&self) -> f64 {
        self.source.now() - self.server_now()
    }

    /// Whole seconds left until `deadline` (server time), never negative.
    pub fn remaining(&self, deadline: f64) -> u64 {
        let left = deadline - self.server_now();
        if left.is_finite() && left > 0.0 {
            left.floor() as u64
        } else {
            0
        }
    }
}

/// Result of one timer turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub remaining: u64,
    /// Set on the first tick at which the countdown reaches zero.
    pub expired: bool,
}

/// Countdown to a single deadline with a one-shot expiry edge.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimer {
    deadline: Option<f64>,
    fired: bool,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the timer to a deadline. A different deadline re-arms the expiry edge.
    pub fn set_deadline(&mut self, deadline: Option<f64>) {
        if self.deadline != deadline {
            self.deadline = deadline;
            self.fired = false;
        }
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Recompute the countdown.
    pub fn tick(&mut self, clock: &PhaseClock) -> Option<TimerTick> {
        let deadline = self.deadline?;
        let remaining = clock.remaining(deadline);
        let expired = remaining == 0 && !self.fired;
        if expired {
            self.fired = true;
        }
        Some(TimerTick { remaining, expired })
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.fired = false;
    }
}
