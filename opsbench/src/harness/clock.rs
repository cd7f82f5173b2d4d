// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Time sources for the engine.

use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Clock capability injected into suites and the harness.
pub trait Clock {
    /// Monotonic time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Wall-clock time, used only for report timestamps.
    fn wall(&self) -> DateTime<Utc>;
}

/// Real clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic tests.
///
/// Time only moves when [`ManualClock::advance`] or [`ManualClock::set`] is
/// called, typically from inside the candidate being measured.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Duration>,
    wall: DateTime<Utc>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            wall: DateTime::<Utc>::default(),
        }
    }

    /// Fix the wall-clock time reported at `now() == 0`.
    pub fn with_wall(wall: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            wall,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn wall(&self) -> DateTime<Utc> {
        self.wall + chrono::Duration::nanoseconds(self.now.get().as_nanos() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_millis(3));
        clock.advance(Duration::from_millis(4));
        assert_eq!(clock.now(), Duration::from_millis(7));
        assert_eq!(clock.wall().timestamp_millis(), 7);

        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
