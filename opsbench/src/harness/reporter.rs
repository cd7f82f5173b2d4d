// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Run report generation and persistence.

use super::config::Meta;
use super::unit::Stat;
use crate::BenchResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Result entry of one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub unit: String,
    /// `None` for skipped and failed tests
    pub stat: Option<Stat>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fastest: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reference: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped: bool,
    #[serde(default, rename = "async", skip_serializing_if = "is_false")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    /// Throughput of a test that produced usable statistics.
    pub fn rps(&self) -> Option<f64> {
        self.stat
            .as_ref()
            .filter(|stat| stat.is_measurable())
            .map(|stat| stat.rps)
    }

    pub fn percent(&self) -> Option<f64> {
        self.stat.as_ref().and_then(|stat| stat.percent)
    }
}

/// Ranked results of one suite, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    #[serde(rename = "suiteName")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
    pub tests: Vec<TestResult>,
}

impl SuiteResult {
    pub fn test(&self, name: &str) -> Option<&TestResult> {
        self.tests.iter().find(|t| t.name == name)
    }

    pub fn fastest(&self) -> Option<&TestResult> {
        self.tests.iter().find(|t| t.fastest)
    }

    pub fn reference(&self) -> Option<&TestResult> {
        self.tests.iter().find(|t| t.reference)
    }

    /// Tests with usable throughput.
    pub fn measured(&self) -> impl Iterator<Item = &TestResult> {
        self.tests.iter().filter(|t| t.rps().is_some())
    }
}

/// One bar of a throughput chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub rps: f64,
}

/// Chart data of one suite, for an external chart generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub suite: String,
    pub unit: String,
    pub points: Vec<ChartPoint>,
}

/// Aggregated report of a harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub meta: Meta,
    pub suites: Vec<SuiteResult>,
    /// Unix time in milliseconds when the run finished
    pub timestamp: i64,
    /// Human-readable rendering of `timestamp`
    pub generated: String,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
}

impl Report {
    pub fn suite(&self, name: &str) -> Option<&SuiteResult> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> BenchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> BenchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save report to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> BenchResult<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Load report from a JSON file.
    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// `{name, rps}` pairs of every measured test, per suite.
    pub fn chart_series(&self) -> Vec<ChartSeries> {
        self.suites
            .iter()
            .map(|suite| ChartSeries {
                suite: suite.name.clone(),
                unit: suite.unit.clone(),
                points: suite
                    .tests
                    .iter()
                    .filter_map(|t| {
                        t.rps().map(|rps| ChartPoint {
                            name: t.name.clone(),
                            rps,
                        })
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Merge a suite's `{name, count}` pairs into the keyed JSON document at `path`.
///
/// The suite's entry replaces any previous one under the same name; other
/// keys are kept. A missing or empty file starts a new document.
pub fn merge_counts(path: &Path, suite: &SuiteResult) -> BenchResult<()> {
    let mut doc: Map<String, Value> = match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Map::new(),
        Ok(content) => serde_json::from_str(&content)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
        Err(e) => return Err(e.into()),
    };

    let entries = suite
        .tests
        .iter()
        .filter_map(|t| t.rps().map(|count| json!({ "name": t.name, "count": count })))
        .collect();
    doc.insert(suite.name.clone(), Value::Array(entries));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}
