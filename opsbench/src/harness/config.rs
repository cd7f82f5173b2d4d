// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Suite, test and harness configuration.
//!
//! Raw configs keep every field optional so they can be layered (harness
//! defaults, then suite, then per-test options). They are resolved exactly once,
//! when a suite or test is constructed, into plain settings structs.

use crate::BenchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default time budget per test in milliseconds.
pub const DEFAULT_TIME_MS: u64 = 5000;
/// Default number of candidate invocations per batch.
pub const DEFAULT_CYCLES: u64 = 1000;
/// Default minimum number of batches.
pub const DEFAULT_MIN_SAMPLES: u64 = 0;
/// Default throughput label.
pub const DEFAULT_UNIT: &str = "ops/sec";

/// Arbitrary metadata attached to harnesses and suites.
pub type Meta = BTreeMap<String, serde_json::Value>;

fn clamp_non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

fn positive(value: i64) -> Option<u64> {
    (value > 0).then_some(value as u64)
}

/// Suite configuration as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub description: Option<String>,
    /// Label for reported throughput, e.g. "ops/sec"
    #[serde(default)]
    pub unit: Option<String>,
    /// Time budget per test in milliseconds; negative values clamp to zero
    #[serde(default)]
    pub time_ms: Option<i64>,
    /// Invocations per batch; zero or negative counts as unset
    #[serde(default)]
    pub cycles: Option<i64>,
    /// Minimum number of batches before the time budget may stop a test
    #[serde(default)]
    pub min_samples: Option<i64>,
    #[serde(default)]
    pub meta: Meta,
}

impl SuiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn time_ms(mut self, time_ms: i64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    pub fn cycles(mut self, cycles: i64) -> Self {
        self.cycles = Some(cycles);
        self
    }

    pub fn min_samples(mut self, min_samples: i64) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Layer this config over `defaults`: fields set here win.
    pub fn or(&self, defaults: &SuiteConfig) -> SuiteConfig {
        let mut meta = defaults.meta.clone();
        meta.extend(self.meta.iter().map(|(k, v)| (k.clone(), v.clone())));

        SuiteConfig {
            description: self.description.clone().or_else(|| defaults.description.clone()),
            unit: self.unit.clone().or_else(|| defaults.unit.clone()),
            time_ms: self.time_ms.or(defaults.time_ms),
            cycles: self.cycles.or(defaults.cycles),
            min_samples: self.min_samples.or(defaults.min_samples),
            meta,
        }
    }

    /// Resolve into concrete settings.
    ///
    /// When cycles is unset and a positive minimum sample count is given, the
    /// batch size defaults to that count instead of [`DEFAULT_CYCLES`].
    pub fn resolve(&self) -> SuiteSettings {
        let time_ms = self
            .time_ms
            .map(clamp_non_negative)
            .unwrap_or(DEFAULT_TIME_MS);
        let min_samples = self
            .min_samples
            .map(clamp_non_negative)
            .unwrap_or(DEFAULT_MIN_SAMPLES);
        let cycles = match self.cycles.and_then(positive) {
            Some(cycles) => cycles,
            None if min_samples > 0 => min_samples,
            None => DEFAULT_CYCLES,
        };

        SuiteSettings {
            description: self.description.clone(),
            unit: self.unit.clone().unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            time_ms,
            cycles,
            min_samples,
            meta: self.meta.clone(),
        }
    }
}

/// Resolved suite settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSettings {
    pub description: Option<String>,
    pub unit: String,
    pub time_ms: u64,
    pub cycles: u64,
    pub min_samples: u64,
    pub meta: Meta,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        SuiteConfig::default().resolve()
    }
}

/// Per-test overrides of the suite's measurement settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOptions {
    #[serde(default)]
    pub time_ms: Option<i64>,
    #[serde(default)]
    pub cycles: Option<i64>,
    #[serde(default)]
    pub min_samples: Option<i64>,
}

impl TestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_ms(mut self, time_ms: i64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    pub fn cycles(mut self, cycles: i64) -> Self {
        self.cycles = Some(cycles);
        self
    }

    pub fn min_samples(mut self, min_samples: i64) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    /// Resolve against the owning suite's settings.
    pub fn resolve(&self, suite: &SuiteSettings) -> UnitSettings {
        UnitSettings {
            time_ms: self
                .time_ms
                .map(clamp_non_negative)
                .unwrap_or(suite.time_ms),
            cycles: self.cycles.and_then(positive).unwrap_or(suite.cycles),
            min_samples: self
                .min_samples
                .map(clamp_non_negative)
                .unwrap_or(suite.min_samples),
        }
    }
}

/// Resolved measurement settings of one test unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSettings {
    pub time_ms: u64,
    pub cycles: u64,
    pub min_samples: u64,
}

impl UnitSettings {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_ms)
    }
}

impl Default for UnitSettings {
    fn default() -> Self {
        TestOptions::default().resolve(&SuiteSettings::default())
    }
}

/// Harness configuration, loadable from a TOML or YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub meta: Meta,
    /// Defaults applied beneath every suite's own config
    #[serde(default)]
    pub defaults: SuiteConfig,
    /// Hard limit for the whole run
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Only run suites with these names (all when empty)
    #[serde(default)]
    pub suites: Vec<String>,
}

impl HarnessConfig {
    /// Load from a file, picking the format from its extension.
    pub fn load(path: &Path) -> BenchResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::load_yaml(path),
            _ => Self::load_toml(path),
        }
    }

    pub fn load_toml(path: &Path) -> BenchResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn load_yaml(path: &Path) -> BenchResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_defaults() {
        let settings = SuiteConfig::new().resolve();
        assert_eq!(settings.time_ms, 5000);
        assert_eq!(settings.cycles, 1000);
        assert_eq!(settings.min_samples, 0);
        assert_eq!(settings.unit, "ops/sec");
    }

    #[test]
    fn test_cycles_follow_min_samples() {
        let settings = SuiteConfig::new().min_samples(50).resolve();
        assert_eq!(settings.cycles, 50);

        let settings = SuiteConfig::new().min_samples(50).cycles(10).resolve();
        assert_eq!(settings.cycles, 10);
    }

    #[test]
    fn test_invalid_values_are_clamped() {
        let settings = SuiteConfig::new()
            .time_ms(-10)
            .min_samples(-3)
            .cycles(0)
            .resolve();
        assert_eq!(settings.time_ms, 0);
        assert_eq!(settings.min_samples, 0);
        assert_eq!(settings.cycles, DEFAULT_CYCLES);
    }

    #[test]
    fn test_options_inherit_suite() {
        let suite = SuiteConfig::new().time_ms(100).cycles(10).resolve();

        let unit = TestOptions::new().resolve(&suite);
        assert_eq!(
            unit,
            UnitSettings {
                time_ms: 100,
                cycles: 10,
                min_samples: 0
            }
        );

        let unit = TestOptions::new().cycles(-1).min_samples(3).resolve(&suite);
        assert_eq!(unit.cycles, 10);
        assert_eq!(unit.min_samples, 3);
        assert_eq!(unit.time_budget(), Duration::from_millis(100));
    }

    #[test]
    fn test_layering_over_defaults() {
        let defaults = SuiteConfig::new()
            .time_ms(200)
            .unit("req/sec")
            .meta("host", "ci");
        let own = SuiteConfig::new().time_ms(50).meta("case", 1);

        let merged = own.or(&defaults);
        assert_eq!(merged.time_ms, Some(50));
        assert_eq!(merged.unit.as_deref(), Some("req/sec"));
        assert_eq!(merged.meta.len(), 2);
    }

    #[test]
    fn test_parse_harness_toml() {
        let toml = r#"
name = "nightly"
timeout_ms = 60000
suites = ["maps"]

[defaults]
time_ms = 250
min_samples = 5

[meta]
commit = "abc123"
"#;
        let config: HarnessConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name.as_deref(), Some("nightly"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.defaults.resolve().cycles, 5);
        assert_eq!(config.suites, vec!["maps".to_string()]);
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.yaml");
        fs::write(
            &path,
            "name: quick\ndefaults:\n  time_ms: 10\n  unit: rows/sec\n",
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        let settings = config.defaults.resolve();
        assert_eq!(settings.time_ms, 10);
        assert_eq!(settings.unit, "rows/sec");
    }
}
