// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Top-level harness: runs suites in order and aggregates their results.

use super::config::{HarnessConfig, Meta, SuiteConfig};
use super::progress::RunContext;
use super::reporter::Report;
use super::suite::Suite;
use crate::{BenchResult, HarnessError};
use std::future::Future;
use std::time::Duration;

/// Bound any engine future by a wall-clock limit.
///
/// The engine has no internal watchdog; a candidate that never completes
/// stalls its suite until this wrapper fires and drops the run.
pub async fn with_timeout<F: Future>(limit: Duration, fut: F) -> BenchResult<F::Output> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| HarnessError::Timeout(limit))
}

/// Named collection of suites.
#[derive(Debug)]
pub struct Harness {
    name: String,
    description: Option<String>,
    meta: Meta,
    defaults: SuiteConfig,
    suites: Vec<Suite>,
    ctx: RunContext,
}

impl Harness {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, RunContext::default())
    }

    pub fn with_context(name: impl Into<String>, ctx: RunContext) -> Self {
        Self {
            name: name.into(),
            description: None,
            meta: Meta::new(),
            defaults: SuiteConfig::default(),
            suites: Vec::new(),
            ctx,
        }
    }

    /// Build from a loaded config; `fallback_name` is used when it has none.
    pub fn from_config(config: &HarnessConfig, fallback_name: &str, ctx: RunContext) -> Self {
        let mut harness = Self::with_context(
            config.name.clone().unwrap_or_else(|| fallback_name.to_string()),
            ctx,
        );
        harness.description = config.description.clone();
        harness.meta = config.meta.clone();
        harness.defaults = config.defaults.clone();
        harness
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Settings applied beneath each suite's own config.
    pub fn defaults(mut self, defaults: SuiteConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Register a new suite sharing this harness's clock and reporter.
    pub fn create_suite(&mut self, name: impl Into<String>, config: SuiteConfig) -> &mut Suite {
        let suite = Suite::with_context(name, config.or(&self.defaults), self.ctx.clone());
        self.suites.push(suite);
        let last = self.suites.len() - 1;
        &mut self.suites[last]
    }

    /// Register a suite built elsewhere.
    pub fn add_suite(&mut self, suite: Suite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Drop registered suites that fail `keep`.
    pub fn retain_suites(&mut self, keep: impl FnMut(&Suite) -> bool) {
        self.suites.retain(keep);
    }

    /// Run every registered suite. Suites are single-use, so the harness is
    /// left without suites afterwards.
    pub async fn run(&mut self) -> Report {
        let suites = std::mem::take(&mut self.suites);
        self.run_suites(suites).await
    }

    /// Run the given suites strictly one after another.
    pub async fn run_suites(&self, suites: Vec<Suite>) -> Report {
        let clock = self.ctx.clock();
        let started = clock.now();
        tracing::info!(harness = %self.name, suites = suites.len(), "benchmark started");

        let mut results = Vec::with_capacity(suites.len());
        for suite in suites {
            results.push(suite.run().await);
        }

        let elapsed = clock.now().saturating_sub(started);
        let finished = clock.wall();
        tracing::info!(harness = %self.name, elapsed_ms = elapsed.as_millis() as u64, "benchmark finished");

        Report {
            name: self.name.clone(),
            description: self.description.clone(),
            meta: self.meta.clone(),
            suites: results,
            timestamp: finished.timestamp_millis(),
            generated: finished.to_rfc2822(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// [`Harness::run`] bounded by `limit`.
    pub async fn run_with_timeout(&mut self, limit: Duration) -> BenchResult<Report> {
        with_timeout(limit, self.run()).await
    }
}
