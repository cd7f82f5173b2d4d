// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Throughput regression gates against a saved baseline report.

use super::reporter::Report;
use serde::{Deserialize, Serialize};

/// Gate result for a single test, keyed `suite/test`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum GateResult {
    /// Throughput is within acceptable bounds
    Pass { metric: String },
    /// Throughput improved beyond the improvement threshold
    Improvement { metric: String, delta_pct: f64 },
    /// Regression in the warning zone
    Warning {
        metric: String,
        delta_pct: f64,
        threshold_pct: f64,
    },
    /// Regression beyond the threshold
    Fail {
        metric: String,
        delta_pct: f64,
        threshold_pct: f64,
    },
    /// Measured in the baseline but not in the current run
    Missing { metric: String },
}

impl GateResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateResult::Pass { .. } | GateResult::Improvement { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, GateResult::Fail { .. })
    }

    pub fn metric(&self) -> &str {
        match self {
            GateResult::Pass { metric }
            | GateResult::Improvement { metric, .. }
            | GateResult::Warning { metric, .. }
            | GateResult::Fail { metric, .. }
            | GateResult::Missing { metric } => metric,
        }
    }
}

/// Regression gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionGates {
    /// Maximum allowed throughput regression (e.g., -5% = -0.05)
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,

    /// Gain above which a change is reported as an improvement
    #[serde(default = "default_improvement_threshold")]
    pub improvement_threshold: f64,

    /// Fraction of the regression threshold where warnings start
    #[serde(default = "default_warning_factor")]
    pub warning_factor: f64,
}

fn default_regression_threshold() -> f64 { -0.05 }
fn default_improvement_threshold() -> f64 { 0.05 }
fn default_warning_factor() -> f64 { 0.5 }

impl Default for RegressionGates {
    fn default() -> Self {
        Self {
            regression_threshold: default_regression_threshold(),
            improvement_threshold: default_improvement_threshold(),
            warning_factor: default_warning_factor(),
        }
    }
}

impl RegressionGates {
    /// Gates with a custom regression threshold given in percent (e.g. 5.0).
    pub fn with_threshold_pct(threshold_pct: f64) -> Self {
        Self {
            regression_threshold: -(threshold_pct.abs() / 100.0),
            ..Default::default()
        }
    }

    /// Evaluate a higher-is-better throughput value.
    pub fn check_throughput(&self, metric: &str, baseline: f64, current: f64) -> GateResult {
        let metric = metric.to_string();
        if baseline <= 0.0 || !baseline.is_finite() {
            return GateResult::Pass { metric };
        }

        let delta = (current - baseline) / baseline;
        let threshold = self.regression_threshold;

        if delta > self.improvement_threshold {
            GateResult::Improvement {
                metric,
                delta_pct: delta * 100.0,
            }
        } else if delta < threshold {
            GateResult::Fail {
                metric,
                delta_pct: delta * 100.0,
                threshold_pct: threshold * 100.0,
            }
        } else if delta < threshold * self.warning_factor {
            GateResult::Warning {
                metric,
                delta_pct: delta * 100.0,
                threshold_pct: threshold * 100.0,
            }
        } else {
            GateResult::Pass { metric }
        }
    }

    /// Compare every test measured in `baseline` with the current run.
    pub fn evaluate(&self, baseline: &Report, current: &Report) -> GateEvaluation {
        let mut results = Vec::new();

        for base_suite in &baseline.suites {
            let current_suite = current.suite(&base_suite.name);
            for base_test in &base_suite.tests {
                let Some(base_rps) = base_test.rps() else {
                    continue;
                };
                let metric = format!("{}/{}", base_suite.name, base_test.name);
                let current_rps = current_suite
                    .and_then(|s| s.test(&base_test.name))
                    .and_then(|t| t.rps());

                results.push(match current_rps {
                    Some(rps) => self.check_throughput(&metric, base_rps, rps),
                    None => GateResult::Missing { metric },
                });
            }
        }

        let failures = results.iter().filter(|r| r.is_fail()).count();
        let overall_pass = failures == 0;
        let summary = if overall_pass {
            "All gates passed".to_string()
        } else {
            format!("{} gate(s) failed", failures)
        };

        GateEvaluation {
            overall_pass,
            results,
            summary,
        }
    }
}

/// Complete gate evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateEvaluation {
    pub overall_pass: bool,
    pub results: Vec<GateResult>,
    pub summary: String,
}

impl GateEvaluation {
    /// Get exit code for CI (0 = pass, 1 = fail).
    pub fn exit_code(&self) -> i32 {
        if self.overall_pass { 0 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::reporter::{SuiteResult, TestResult};
    use crate::harness::unit::Stat;
    use std::time::Duration;

    fn report(tests: &[(&str, Option<u64>)]) -> Report {
        let tests = tests
            .iter()
            .map(|(name, count)| TestResult {
                name: name.to_string(),
                unit: "ops/sec".to_string(),
                stat: count.map(|c| Stat::from_measurement(c, 1, Duration::from_secs(1))),
                fastest: false,
                reference: false,
                skipped: count.is_none(),
                is_async: false,
                error: None,
            })
            .collect();

        Report {
            name: "gates".to_string(),
            description: None,
            meta: Default::default(),
            suites: vec![SuiteResult {
                name: "codec".to_string(),
                description: None,
                unit: "ops/sec".to_string(),
                meta: Default::default(),
                tests,
            }],
            timestamp: 0,
            generated: String::new(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_throughput_gate() {
        let gates = RegressionGates::default();

        let result = gates.check_throughput("rps", 1000.0, 1100.0);
        assert!(matches!(result, GateResult::Improvement { .. }));

        let result = gates.check_throughput("rps", 1000.0, 980.0);
        assert!(result.is_pass());

        let result = gates.check_throughput("rps", 1000.0, 970.0);
        assert!(matches!(result, GateResult::Warning { .. }));

        let result = gates.check_throughput("rps", 1000.0, 900.0);
        assert!(result.is_fail());
    }

    #[test]
    fn test_evaluate_reports() {
        let baseline = report(&[("encode", Some(1000)), ("decode", Some(2000)), ("verify", Some(10))]);
        let current = report(&[("encode", Some(1010)), ("decode", Some(1500)), ("verify", None)]);

        let eval = RegressionGates::default().evaluate(&baseline, &current);
        assert!(!eval.overall_pass);
        assert_eq!(eval.exit_code(), 1);
        assert_eq!(eval.summary, "1 gate(s) failed");
        assert!(eval.results[0].is_pass());
        assert!(eval.results[1].is_fail());
        assert_eq!(eval.results[1].metric(), "codec/decode");
        assert!(matches!(eval.results[2], GateResult::Missing { .. }));
    }

    #[test]
    fn test_threshold_from_percent() {
        let gates = RegressionGates::with_threshold_pct(20.0);
        assert!(!gates.check_throughput("rps", 100.0, 85.0).is_fail());
        assert!(gates.check_throughput("rps", 100.0, 75.0).is_fail());
    }
}
