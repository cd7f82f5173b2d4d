// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Adaptive cycling engine for a single test.
//!
//! A test runs its candidate in batches of `cycles` invocations. After every
//! batch the engine yields to the scheduler and then decides whether to go on:
//! it keeps cycling while the time budget is not used up, or while fewer than
//! `min_samples` batches have completed. A batch in progress always finishes,
//! so a test overruns its budget by at most one batch.

use super::candidate::{guarded, Candidate, SyncFn};
use super::clock::Clock;
use super::config::UnitSettings;
use crate::{BenchResult, CandidateError, HarnessError};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Statistics of a completed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Total measured time in seconds
    pub duration: f64,
    /// Seconds per iteration
    #[serde(with = "non_finite")]
    pub avg: f64,
    /// Iterations per second
    #[serde(with = "non_finite")]
    pub rps: f64,
    /// Throughput relative to the suite baseline (only in suite results)
    #[serde(default)]
    pub percent: Option<f64>,
    /// Completed batches
    pub cycle: u64,
    /// Completed iterations
    pub count: u64,
}

impl Stat {
    /// Derive statistics from raw counters.
    ///
    /// Zero iterations give NaN for both `avg` and `rps`; a zero duration with
    /// iterations gives an infinite `rps`.
    pub fn from_measurement(count: u64, batches: u64, elapsed: Duration) -> Self {
        let duration = elapsed.as_secs_f64();
        let (avg, rps) = if count == 0 {
            (f64::NAN, f64::NAN)
        } else {
            (duration / count as f64, count as f64 / duration)
        };

        Self {
            duration,
            avg,
            rps,
            percent: None,
            cycle: batches,
            count,
        }
    }

    /// Whether this result can take part in ranking.
    pub fn is_measurable(&self) -> bool {
        self.rps.is_finite() && self.rps > 0.0
    }
}

/// Non-finite floats are written as `null` and read back as NaN.
mod non_finite {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Pending,
    Running,
    Done,
}

/// One named candidate with its settings and run state.
#[derive(Debug)]
pub struct TestUnit {
    name: String,
    candidate: Candidate,
    settings: UnitSettings,
    skip: bool,
    only: bool,
    reference: bool,
    state: RunState,
    started_at: Option<Duration>,
    count: u64,
    batches: u64,
    stat: Option<Stat>,
    error: Option<CandidateError>,
}

impl TestUnit {
    pub fn new(name: impl Into<String>, candidate: Candidate, settings: UnitSettings) -> Self {
        Self {
            name: name.into(),
            candidate,
            settings,
            skip: false,
            only: false,
            reference: false,
            state: RunState::Pending,
            started_at: None,
            count: 0,
            batches: 0,
            stat: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &UnitSettings {
        &self.settings
    }

    pub fn is_async(&self) -> bool {
        self.candidate.is_async()
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn is_only(&self) -> bool {
        self.only
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    /// Iterations completed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Batches completed so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Monotonic start time, once running.
    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// Statistics; `None` until the test has completed successfully.
    pub fn stat(&self) -> Option<&Stat> {
        self.stat.as_ref()
    }

    pub fn error(&self) -> Option<&CandidateError> {
        self.error.as_ref()
    }

    pub(crate) fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    pub(crate) fn set_only(&mut self, only: bool) {
        self.only = only;
    }

    pub(crate) fn set_reference(&mut self, reference: bool) {
        self.reference = reference;
    }

    /// Mark the test failed without running it.
    pub(crate) fn fail(&mut self, error: CandidateError) {
        self.state = RunState::Done;
        self.error = Some(error);
    }

    /// Cycle the candidate until the termination condition holds.
    ///
    /// A candidate error or panic stops the test; it is recorded on the unit
    /// and returned as [`HarnessError::Candidate`]. An async candidate whose
    /// future never resolves makes this future pend forever; wrap it with
    /// [`with_timeout`](super::runner::with_timeout) when that matters.
    pub async fn run(&mut self, clock: &dyn Clock) -> BenchResult<&Stat> {
        if self.state != RunState::Pending {
            return Err(HarnessError::AlreadyRun(self.name.clone()));
        }

        self.state = RunState::Running;
        self.count = 0;
        self.batches = 0;
        let started = clock.now();
        self.started_at = Some(started);

        let outcome = self.cycle(clock, started).await;
        self.state = RunState::Done;

        match outcome {
            Ok(()) => {
                let elapsed = clock.now().saturating_sub(started);
                let stat = Stat::from_measurement(self.count, self.batches, elapsed);
                tracing::debug!(
                    test = %self.name,
                    batches = self.batches,
                    count = self.count,
                    rps = stat.rps,
                    "test finished"
                );
                Ok(self.stat.insert(stat))
            }
            Err(source) => {
                self.error = Some(source.clone());
                Err(HarnessError::Candidate {
                    test: self.name.clone(),
                    source,
                })
            }
        }
    }

    async fn cycle(&mut self, clock: &dyn Clock, started: Duration) -> Result<(), CandidateError> {
        let budget = self.settings.time_budget();
        let cycles = self.settings.cycles;
        let min_samples = self.settings.min_samples;
        let keep_cycling =
            |batches: u64| clock.now().saturating_sub(started) < budget || batches < min_samples;

        match &mut self.candidate {
            Candidate::Sync(f) => {
                while keep_cycling(self.batches) {
                    run_sync_batch(f, cycles)?;
                    self.count += cycles;
                    self.batches += 1;
                    tokio::task::yield_now().await;
                }
            }
            Candidate::Async(f) => {
                while keep_cycling(self.batches) {
                    // Strictly sequential: the next iteration starts only
                    // after the previous future resolved.
                    for _ in 0..cycles {
                        guarded(f).await?;
                        self.count += 1;
                    }
                    self.batches += 1;
                    tokio::task::yield_now().await;
                }
            }
        }

        Ok(())
    }
}

fn run_sync_batch(f: &mut SyncFn, cycles: u64) -> Result<(), CandidateError> {
    panic::catch_unwind(AssertUnwindSafe(|| (0..cycles).try_for_each(|_| f())))
        .unwrap_or_else(|payload| Err(CandidateError::from_panic(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::clock::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    fn settings(time_ms: u64, cycles: u64, min_samples: u64) -> UnitSettings {
        UnitSettings {
            time_ms,
            cycles,
            min_samples,
        }
    }

    /// Candidate that moves the fake clock forward on every call.
    fn ticking(clock: &Rc<ManualClock>, step: Duration) -> Candidate {
        let clock = clock.clone();
        Candidate::sync(move || clock.advance(step))
    }

    #[tokio::test]
    async fn test_time_budget_terminates() {
        let clock = Rc::new(ManualClock::new());
        let mut unit = TestUnit::new(
            "tick",
            ticking(&clock, Duration::from_micros(10)),
            settings(1, 10, 0),
        );

        let stat = unit.run(clock.as_ref()).await.unwrap().clone();
        assert_eq!(stat.cycle, 10);
        assert_eq!(stat.count, 100);
        assert_eq!(stat.duration, 0.001);
        assert_eq!(stat.rps, stat.count as f64 / stat.duration);
        assert_eq!(stat.avg, stat.duration / stat.count as f64);
        assert!(unit.is_done());
        assert!(!unit.is_running());
    }

    #[tokio::test]
    async fn test_overrun_is_at_most_one_batch() {
        let clock = Rc::new(ManualClock::new());
        let step = Duration::from_micros(30);
        let cycles = 7;
        let mut unit = TestUnit::new("tick", ticking(&clock, step), settings(1, cycles, 0));

        let stat = unit.run(clock.as_ref()).await.unwrap().clone();
        let batch = step * cycles as u32;
        let elapsed = Duration::from_secs_f64(stat.duration);
        assert!(elapsed >= Duration::from_millis(1));
        assert!(elapsed < Duration::from_millis(1) + batch);
        assert_eq!(stat.count, cycles * stat.cycle);
    }

    #[tokio::test]
    async fn test_min_samples_floor() {
        let clock = Rc::new(ManualClock::new());
        let mut unit = TestUnit::new("noop", ticking(&clock, Duration::ZERO), settings(0, 3, 5));

        let stat = unit.run(clock.as_ref()).await.unwrap().clone();
        assert_eq!(stat.cycle, 5);
        assert_eq!(stat.count, 15);
        // no time passed on the fake clock
        assert_eq!(stat.avg, 0.0);
        assert!(stat.rps.is_infinite());
        assert!(!stat.is_measurable());
    }

    #[tokio::test]
    async fn test_zero_iterations_are_degenerate() {
        let clock = ManualClock::new();
        let mut unit = TestUnit::new("never", Candidate::sync(|| ()), settings(0, 10, 0));

        let stat = unit.run(&clock).await.unwrap();
        assert_eq!(stat.count, 0);
        assert!(stat.avg.is_nan());
        assert!(stat.rps.is_nan());
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let clock = ManualClock::new();
        let mut unit = TestUnit::new("once", Candidate::sync(|| ()), settings(0, 1, 1));
        unit.run(&clock).await.unwrap();

        let err = unit.run(&clock).await.unwrap_err();
        assert!(matches!(err, HarnessError::AlreadyRun(name) if name == "once"));
    }

    #[tokio::test]
    async fn test_candidate_error_is_recorded() {
        let clock = ManualClock::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let candidate = Candidate::try_sync(move || {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                Err("third call")
            } else {
                Ok(())
            }
        });
        let mut unit = TestUnit::new("flaky", candidate, settings(0, 10, 2));

        let err = unit.run(&clock).await.unwrap_err();
        assert!(matches!(err, HarnessError::Candidate { .. }));
        assert_eq!(calls.get(), 3);
        assert_eq!(unit.error(), Some(&CandidateError::failed("third call")));
        assert!(unit.stat().is_none());
        assert!(unit.is_done());
    }

    #[tokio::test]
    async fn test_panic_is_recorded() {
        let clock = ManualClock::new();
        let mut unit = TestUnit::new(
            "explodes",
            Candidate::sync(|| -> () { panic!("index out of range") }),
            settings(10, 1, 0),
        );

        assert!(unit.run(&clock).await.is_err());
        assert_eq!(
            unit.error(),
            Some(&CandidateError::Panicked("index out of range".to_string()))
        );
    }

    #[tokio::test]
    async fn test_async_candidate_is_sequential() {
        let clock = Rc::new(ManualClock::new());
        let in_flight = Rc::new(Cell::new(0u32));
        let (c, flight) = (clock.clone(), in_flight.clone());
        let candidate = Candidate::future(move || {
            let (c, flight) = (c.clone(), flight.clone());
            async move {
                assert_eq!(flight.get(), 0);
                flight.set(1);
                tokio::task::yield_now().await;
                c.advance(Duration::from_micros(50));
                flight.set(0);
            }
        });
        let mut unit = TestUnit::new("async", candidate, settings(1, 4, 0));
        assert!(unit.is_async());

        let stat = unit.run(clock.as_ref()).await.unwrap().clone();
        assert_eq!(stat.cycle, 5);
        assert_eq!(stat.count, 20);
        assert_eq!(stat.rps, 20.0 / stat.duration);
    }

    #[tokio::test]
    async fn test_async_failure_is_recorded() {
        let clock = ManualClock::new();
        let mut unit = TestUnit::new(
            "rejects",
            Candidate::try_future(|| async { Err::<(), _>("connection reset") }),
            settings(10, 5, 0),
        );

        assert!(unit.run(&clock).await.is_err());
        assert_eq!(unit.error(), Some(&CandidateError::failed("connection reset")));
        assert_eq!(unit.count(), 0);
    }

    #[test]
    fn test_stat_serializes_non_finite_as_null() {
        let stat = Stat::from_measurement(0, 0, Duration::from_millis(5));
        let json = serde_json::to_value(&stat).unwrap();
        assert!(json["avg"].is_null());
        assert!(json["rps"].is_null());

        let back: Stat = serde_json::from_value(json).unwrap();
        assert!(back.rps.is_nan());
        assert_eq!(back.duration, 0.005);
    }
}
