// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Progress events emitted while suites run.

use super::clock::{Clock, SystemClock};
use super::reporter::SuiteResult;
use super::unit::Stat;
use crate::CandidateError;
use std::rc::Rc;

/// Receives per-test progress. Every method defaults to a no-op.
pub trait ProgressReporter {
    fn suite_started(&self, _suite: &str, _tests: usize) {}

    fn test_started(&self, _test: &str) {}

    fn test_skipped(&self, _test: &str) {}

    fn test_completed(&self, _test: &str, _stat: &Stat, _unit: &str) {}

    fn test_failed(&self, _test: &str, _error: &CandidateError) {}

    fn suite_completed(&self, _result: &SuiteResult) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn suite_started(&self, suite: &str, tests: usize) {
        tracing::info!(suite, tests, "suite started");
    }

    fn test_started(&self, test: &str) {
        tracing::debug!(test, "test started");
    }

    fn test_skipped(&self, test: &str) {
        tracing::info!(test, "test skipped");
    }

    fn test_completed(&self, test: &str, stat: &Stat, unit: &str) {
        tracing::info!(
            test,
            rps = stat.rps,
            unit,
            count = stat.count,
            batches = stat.cycle,
            "test completed"
        );
    }

    fn test_failed(&self, test: &str, error: &CandidateError) {
        tracing::warn!(test, %error, "test failed");
    }

    fn suite_completed(&self, result: &SuiteResult) {
        let fastest = result.fastest().map(|t| t.name.as_str());
        tracing::info!(suite = %result.name, ?fastest, "suite completed");
    }
}

/// Capabilities shared by a harness and its suites.
#[derive(Clone)]
pub struct RunContext {
    clock: Rc<dyn Clock>,
    reporter: Rc<dyn ProgressReporter>,
}

impl RunContext {
    pub fn new(clock: Rc<dyn Clock>, reporter: Rc<dyn ProgressReporter>) -> Self {
        Self { clock, reporter }
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self::new(clock, Rc::new(NullReporter))
    }

    pub fn with_reporter(reporter: Rc<dyn ProgressReporter>) -> Self {
        Self::new(Rc::new(SystemClock::new()), reporter)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn reporter(&self) -> &dyn ProgressReporter {
        self.reporter.as_ref()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock::new()), Rc::new(NullReporter))
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::candidate::Candidate;
    use crate::harness::clock::ManualClock;
    use crate::harness::config::SuiteConfig;
    use crate::harness::suite::Suite;
    use std::time::Duration;

    #[test]
    fn test_default_context_uses_system_clock() {
        let ctx = RunContext::default();
        let first = ctx.clock().now();
        assert!(ctx.clock().now() >= first);
        assert_eq!(format!("{:?}", ctx), "RunContext { .. }");
    }

    #[tokio::test]
    async fn test_tracing_reporter_accepts_every_event() {
        let clock = Rc::new(ManualClock::new());
        let ctx = RunContext::new(clock.clone(), Rc::new(TracingReporter));
        let mut suite = Suite::with_context("traced", SuiteConfig::new().time_ms(1).cycles(10), ctx);

        let c = clock.clone();
        suite.add("ok", Candidate::sync(move || c.advance(Duration::from_micros(1))));
        suite.add("fails", Candidate::try_sync(|| Err::<(), _>("nope")));
        suite.skip("skipped", Candidate::sync(|| ()));

        let result = suite.run().await;
        assert_eq!(result.fastest().map(|t| t.name.as_str()), Some("ok"));
        assert!(result.test("fails").unwrap().error.is_some());
    }
}
