// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Adaptive throughput micro-benchmarks.
//!
//! This crate provides:
//! - A per-test cycling engine with time budget and minimum-sample termination
//! - Suites that sequence tests, run setup/teardown hooks and rank results
//! - A harness that runs suites in order and aggregates a serializable report
//! - Result persistence and regression comparison against saved baselines
//!
//! ```no_run
//! use opsbench::{Candidate, Harness, SuiteConfig};
//!
//! let mut harness = Harness::new("String building");
//! harness
//!     .create_suite("concat", SuiteConfig::new().time_ms(1000))
//!     .add("format", Candidate::sync(|| format!("{}{}", "a", 1)))
//!     .reference("push_str", Candidate::sync(|| {
//!         let mut s = String::from("a");
//!         s.push_str("1");
//!         s
//!     }));
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! let report = runtime.block_on(harness.run());
//! println!("{}", report.to_json().unwrap());
//! ```

pub mod console;
pub mod harness;

pub use harness::*;

use std::any::Any;
use std::time::Duration;

// ────────────────────────────────────────────────────────────────────────────────
// Error types
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, HarnessError>;

/// Failure of a benchmarked candidate or of the hooks around it.
///
/// Recorded on the failing test unit; never propagated past the suite.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandidateError {
    #[error("{0}")]
    Failed(String),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("setup failed: {0}")]
    Setup(String),
}

impl CandidateError {
    pub fn failed(message: impl Into<String>) -> Self {
        CandidateError::Failed(message.into())
    }

    /// Build an error from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        CandidateError::Panicked(message)
    }
}

impl From<String> for CandidateError {
    fn from(message: String) -> Self {
        CandidateError::Failed(message)
    }
}

impl From<&str> for CandidateError {
    fn from(message: &str) -> Self {
        CandidateError::Failed(message.to_string())
    }
}

/// Errors surfaced by the harness API.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("test '{test}' failed: {source}")]
    Candidate {
        test: String,
        #[source]
        source: CandidateError,
    },
    #[error("test '{0}' has already been run")]
    AlreadyRun(String),
    #[error("benchmark did not finish within {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config error: {0}")]
    Config(String),
}
