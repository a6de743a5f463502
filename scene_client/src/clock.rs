//! Frame clock.
//!
//! Produces elapsed time and per-frame delta from a monotonic clock. While
//! paused, time does not advance; resuming continues from where it stopped
//! instead of jumping over the pause.

use std::time::Instant;

/// Timing of one tick, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub elapsed: f32,
    pub delta: f32,
}

/// Monotonic, pausable scene clock.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: f32,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Samples the clock at `now`. The first sample has zero delta.
    pub fn advance(&mut self, now: Instant) -> FrameTime {
        let delta = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => 0.0,
        };
        self.last = Some(now);
        self.advance_by(delta)
    }

    /// Advances by a fixed step; used by deterministic drivers and tests.
    pub fn advance_by(&mut self, dt: f32) -> FrameTime {
        let delta = if self.paused || !dt.is_finite() {
            0.0
        } else {
            dt.max(0.0)
        };
        self.elapsed += delta;
        FrameTime {
            elapsed: self.elapsed,
            delta,
        }
    }
}
