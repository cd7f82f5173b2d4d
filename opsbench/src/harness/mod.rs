// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Measurement engine and orchestration.
//!
//! This module provides:
//! - Suite and test configuration with resolved defaults
//! - Injected clock and progress-reporter capabilities
//! - The adaptive cycling engine for a single test
//! - Suite sequencing and ranking, harness aggregation
//! - Serializable reports and baseline regression gates

pub mod candidate;
pub mod clock;
pub mod config;
pub mod gates;
pub mod progress;
pub mod reporter;
pub mod runner;
pub mod suite;
pub mod unit;

pub use candidate::{Candidate, Hook};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HarnessConfig, SuiteConfig, SuiteSettings, TestOptions, UnitSettings};
pub use gates::{GateEvaluation, GateResult, RegressionGates};
pub use progress::{NullReporter, ProgressReporter, RunContext, TracingReporter};
pub use reporter::{merge_counts, ChartPoint, ChartSeries, Report, SuiteResult, TestResult};
pub use runner::{with_timeout, Harness};
pub use suite::{Marker, Suite};
pub use unit::{Stat, TestUnit};
