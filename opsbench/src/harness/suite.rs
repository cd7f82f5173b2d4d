// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Suites: ordered tests sharing configuration, hooks and a ranking.
//!
//! Tests run strictly one after another in declaration order. Candidates often
//! close over shared state (counters, maps), so overlapping them would corrupt
//! both that state and the measurements.

use super::candidate::{run_hooks, Candidate, Hook};
use super::config::{SuiteConfig, SuiteSettings, TestOptions};
use super::progress::RunContext;
use super::reporter::{SuiteResult, TestResult};
use super::unit::TestUnit;
use crate::{CandidateError, HarnessError};

/// How a test is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marker {
    #[default]
    Plain,
    /// Run only tests marked this way; every other test is skipped
    Only,
    /// Report the test without running it
    Skip,
    /// Baseline for percentage comparison instead of the fastest test
    Reference,
}

/// An ordered, single-use collection of tests.
#[derive(Debug)]
pub struct Suite {
    name: String,
    settings: SuiteSettings,
    tests: Vec<TestUnit>,
    setup: Vec<Hook>,
    teardown: Vec<Hook>,
    ctx: RunContext,
}

impl Suite {
    /// Suite with the system clock and no progress output.
    pub fn new(name: impl Into<String>, config: SuiteConfig) -> Self {
        Self::with_context(name, config, RunContext::default())
    }

    pub fn with_context(name: impl Into<String>, config: SuiteConfig, ctx: RunContext) -> Self {
        Self {
            name: name.into(),
            settings: config.resolve(),
            tests: Vec::new(),
            setup: Vec::new(),
            teardown: Vec::new(),
            ctx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &SuiteSettings {
        &self.settings
    }

    pub fn tests(&self) -> &[TestUnit] {
        &self.tests
    }

    /// Replace the setup step with a single hook.
    pub fn setup(&mut self, hook: Hook) -> &mut Self {
        self.setup = vec![hook];
        self
    }

    /// Replace the setup step with hooks that run concurrently.
    pub fn setup_all(&mut self, hooks: impl IntoIterator<Item = Hook>) -> &mut Self {
        self.setup = hooks.into_iter().collect();
        self
    }

    pub fn teardown(&mut self, hook: Hook) -> &mut Self {
        self.teardown = vec![hook];
        self
    }

    pub fn teardown_all(&mut self, hooks: impl IntoIterator<Item = Hook>) -> &mut Self {
        self.teardown = hooks.into_iter().collect();
        self
    }

    pub fn add(&mut self, name: impl Into<String>, candidate: Candidate) -> &mut Self {
        self.push(name, candidate, TestOptions::default(), Marker::Plain)
    }

    pub fn add_with(
        &mut self,
        name: impl Into<String>,
        candidate: Candidate,
        options: TestOptions,
    ) -> &mut Self {
        self.push(name, candidate, options, Marker::Plain)
    }

    pub fn only(&mut self, name: impl Into<String>, candidate: Candidate) -> &mut Self {
        self.push(name, candidate, TestOptions::default(), Marker::Only)
    }

    pub fn skip(&mut self, name: impl Into<String>, candidate: Candidate) -> &mut Self {
        self.push(name, candidate, TestOptions::default(), Marker::Skip)
    }

    pub fn reference(&mut self, name: impl Into<String>, candidate: Candidate) -> &mut Self {
        self.push(name, candidate, TestOptions::default(), Marker::Reference)
    }

    /// Register a test. Settings are resolved here, once.
    ///
    /// A suite has at most one reference test: a second `Reference` marker is
    /// ignored with a warning and the test is registered as plain.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        candidate: Candidate,
        options: TestOptions,
        marker: Marker,
    ) -> &mut Self {
        let mut test = TestUnit::new(name, candidate, options.resolve(&self.settings));
        match marker {
            Marker::Plain => {}
            Marker::Only => test.set_only(true),
            Marker::Skip => test.set_skip(true),
            Marker::Reference => {
                if let Some(existing) = self.tests.iter().find(|t| t.is_reference()) {
                    tracing::warn!(
                        suite = %self.name,
                        test = test.name(),
                        reference = existing.name(),
                        "suite already has a reference test, registering as plain"
                    );
                } else {
                    test.set_reference(true);
                }
            }
        }
        self.tests.push(test);
        self
    }

    /// Run setup, every test, teardown, then rank the results.
    ///
    /// A failing test is recorded in its result entry and the suite moves on.
    /// If setup fails, no test runs; each would-be-run test reports the setup
    /// error. Teardown failures are logged only.
    pub async fn run(mut self) -> SuiteResult {
        self.apply_only();

        let ctx = self.ctx.clone();
        let reporter = ctx.reporter();
        tracing::info!(suite = %self.name, tests = self.tests.len(), "running suite");
        reporter.suite_started(&self.name, self.tests.len());

        let setup_error = run_hooks(&mut self.setup).await.err();
        if let Some(error) = &setup_error {
            tracing::warn!(suite = %self.name, %error, "suite setup failed");
        }

        for test in &mut self.tests {
            let name = test.name().to_string();
            if test.is_skipped() {
                reporter.test_skipped(&name);
                continue;
            }

            if let Some(error) = &setup_error {
                let error = CandidateError::Setup(error.to_string());
                reporter.test_failed(&name, &error);
                test.fail(error);
                continue;
            }

            reporter.test_started(&name);
            match test.run(ctx.clock()).await {
                Ok(stat) => reporter.test_completed(&name, stat, &self.settings.unit),
                Err(HarnessError::Candidate { source, .. }) => {
                    tracing::warn!(suite = %self.name, test = %name, error = %source, "test failed");
                    reporter.test_failed(&name, &source);
                }
                Err(other) => {
                    tracing::warn!(suite = %self.name, test = %name, error = %other, "test not run");
                }
            }
        }

        if let Err(error) = run_hooks(&mut self.teardown).await {
            tracing::warn!(suite = %self.name, %error, "suite teardown failed");
        }

        let result = self.rank();
        reporter.suite_completed(&result);
        result
    }

    /// Force-skip every test not marked only, if any test is.
    fn apply_only(&mut self) {
        if self.tests.iter().any(TestUnit::is_only) {
            for test in &mut self.tests {
                let only = test.is_only();
                test.set_skip(!only);
            }
        }
    }

    /// Reduce run tests into result entries.
    ///
    /// The fastest test is the first one with the highest finite throughput.
    /// Percentages compare against the reference test when it produced usable
    /// throughput, otherwise against the fastest.
    fn rank(&self) -> SuiteResult {
        let rps = |test: &TestUnit| {
            if test.is_skipped() || test.error().is_some() {
                return None;
            }
            test.stat().filter(|s| s.is_measurable()).map(|s| s.rps)
        };

        let mut fastest: Option<(usize, f64)> = None;
        for (index, test) in self.tests.iter().enumerate() {
            if let Some(value) = rps(test) {
                if fastest.map_or(true, |(_, best)| value > best) {
                    fastest = Some((index, value));
                }
            }
        }

        let baseline = self
            .tests
            .iter()
            .find(|t| t.is_reference())
            .and_then(rps)
            .or(fastest.map(|(_, best)| best));

        let tests = self
            .tests
            .iter()
            .enumerate()
            .map(|(index, test)| {
                let stat = if test.is_skipped() {
                    None
                } else {
                    test.stat().cloned().map(|mut stat| {
                        stat.percent = match (rps(test), baseline) {
                            (Some(own), Some(base)) => Some(own / base * 100.0 - 100.0),
                            _ => None,
                        };
                        stat
                    })
                };

                TestResult {
                    name: test.name().to_string(),
                    unit: self.settings.unit.clone(),
                    stat,
                    fastest: fastest.map_or(false, |(i, _)| i == index),
                    reference: test.is_reference(),
                    skipped: test.is_skipped(),
                    is_async: test.is_async(),
                    error: test.error().map(ToString::to_string),
                }
            })
            .collect();

        SuiteResult {
            name: self.name.clone(),
            description: self.settings.description.clone(),
            unit: self.settings.unit.clone(),
            meta: self.settings.meta.clone(),
            tests,
        }
    }
}
