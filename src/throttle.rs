//! Leading + trailing render throttle
//!
//! Progress events can arrive many times per second. The throttle lets the
//! first request in an idle window render immediately, folds every further
//! request in that window into one trailing render at the window boundary,
//! and never drops the last one.

use std::time::Duration;
use tokio::time::Instant;

/// Interval between forced refreshes of elapsed-time UI (speeds, dock progress)
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Window was idle: render now
    RunNow,
    /// Folded into the trailing render due at this instant
    Deferred(Instant),
}

/// Throttle state machine driven by explicit instants
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    window_start: Option<Instant>,
    trailing: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
            trailing: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Request a render at `now`
    pub fn schedule(&mut self, now: Instant) -> Schedule {
        match self.window_end() {
            Some(end) if now < end => {
                self.trailing = true;
                Schedule::Deferred(end)
            }
            _ => {
                self.window_start = Some(now);
                self.trailing = false;
                Schedule::RunNow
            }
        }
    }

    /// When the pending trailing render is due, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        if self.trailing {
            self.window_end()
        } else {
            None
        }
    }

    /// Consume the trailing render if it is due at `now`.
    ///
    /// A trailing render opens a new window, so requests right after it are
    /// throttled again.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(due) if now >= due => {
                self.trailing = false;
                self.window_start = Some(now);
                true
            }
            _ => false,
        }
    }

    fn window_end(&self) -> Option<Instant> {
        self.window_start.map(|start| start + self.interval)
    }
}
