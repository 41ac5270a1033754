//! Clock and timing utilities for stroke timestamps.
//!
//! Strokes carry two kinds of time:
//! - wall-clock milliseconds since the Unix epoch (`startTime`, ids,
//!   snapshot timestamps)
//! - monotonic milliseconds relative to a session epoch (`tAbs`), which
//!   never go backwards and drive the timeline layout

use std::sync::Mutex;
use std::time::Instant;

/// Source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn wall_ms(&self) -> i64;

    /// Monotonic milliseconds since the clock's epoch.
    fn monotonic_ms(&self) -> f64;

    /// Wall-clock now as a UTC datetime.
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.wall_ms()).unwrap_or_default()
    }
}

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for SessionClock {
    fn wall_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn monotonic_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// A manually driven clock for deterministic tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(i64, f64)>,
}

impl ManualClock {
    /// Create a clock frozen at the given wall and monotonic readings.
    pub fn new(wall_ms: i64, monotonic_ms: f64) -> Self {
        Self {
            state: Mutex::new((wall_ms, monotonic_ms)),
        }
    }

    /// Advance both readings by `ms`.
    pub fn advance(&self, ms: i64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.0 += ms;
        state.1 += ms as f64;
    }

    /// Set both readings.
    pub fn set(&self, wall_ms: i64, monotonic_ms: f64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = (wall_ms, monotonic_ms);
    }
}

impl Clock for ManualClock {
    fn wall_ms(&self) -> i64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn monotonic_ms(&self) -> f64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}
