// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Terminal rendering of progress events and suite results.

use crate::harness::{GateEvaluation, GateResult, ProgressReporter, Stat, SuiteResult};
use crate::CandidateError;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

const NAME_WIDTH: usize = 30;

// ────────────────────────────────────────────────────────────────────────────────
// Progress
// ────────────────────────────────────────────────────────────────────────────────

/// Prints one line per finished test while suites run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn suite_started(&self, suite: &str, _tests: usize) {
        println!("\n{}", format!("Suite: {}", suite).bold().magenta());
    }

    fn test_skipped(&self, test: &str) {
        println!("{}", format!("  [SKIP] {}", test).yellow());
    }

    fn test_completed(&self, test: &str, stat: &Stat, unit: &str) {
        let throughput = format!("{} {}", format_number(stat.rps, 0, false), unit);
        println!(
            "{} {:<width$}{:>20}",
            "  ››".green(),
            test,
            throughput,
            width = NAME_WIDTH
        );
    }

    fn test_failed(&self, test: &str, error: &CandidateError) {
        println!("{} {}", format!("  [ERR] {}", test).red(), error.to_string().dimmed());
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Summaries
// ────────────────────────────────────────────────────────────────────────────────

/// Print the run banner.
pub fn print_header(name: &str) {
    let title = format!("  {}  ", name);
    let bar = "═".repeat(title.chars().count().max(40));
    println!("\n{}", format!("╔{}╗", bar).bold().blue());
    println!("{}", format!("║{:^width$}║", title, width = bar.chars().count()).bold().blue());
    println!("{}", format!("╚{}╝", bar).bold().blue());
}

/// Print the ranked comparison table of one suite.
pub fn print_suite(suite: &SuiteResult) {
    println!("\n{}", format!("━━━ {} ━━━", suite.name).bold().cyan());
    if let Some(description) = &suite.description {
        println!("  {}", description.dimmed());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Test", "Diff", "Throughput", "Avg"]);

    for test in &suite.tests {
        let mut name = test.name.clone();
        if test.is_async {
            name.push('*');
        }
        if test.reference {
            name.push_str(" (#)");
        }

        if test.skipped {
            table.add_row(vec![
                Cell::new(name).fg(Color::Yellow),
                Cell::new("skipped").fg(Color::Yellow),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        if let Some(error) = &test.error {
            table.add_row(vec![
                Cell::new(name).fg(Color::Red),
                Cell::new(format!("error: {}", error)).fg(Color::Red),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }

        let color = if test.fastest { Color::Green } else { Color::Cyan };
        let (throughput, avg) = match &test.stat {
            Some(stat) => (
                format!("{} {}", format_number(stat.rps, 0, false), test.unit),
                format_duration_secs(stat.avg),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        let diff = test
            .percent()
            .map(|p| format!("{}%", format_number(p, 2, true)))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(name).fg(color),
            Cell::new(diff).fg(color),
            Cell::new(throughput).fg(color),
            Cell::new(avg),
        ]);
    }

    println!("{table}");
}

/// Print regression gate results against a baseline.
pub fn print_gates(eval: &GateEvaluation) {
    println!("\n{}", "── Baseline comparison ──".bold().yellow());
    for result in &eval.results {
        let line = match result {
            GateResult::Pass { metric } => format!("  ok    {}", metric).normal(),
            GateResult::Improvement { metric, delta_pct } => {
                format!("  +     {} ({}%)", metric, format_number(*delta_pct, 2, true)).green()
            }
            GateResult::Warning { metric, delta_pct, .. } => {
                format!("  warn  {} ({}%)", metric, format_number(*delta_pct, 2, true)).yellow()
            }
            GateResult::Fail {
                metric,
                delta_pct,
                threshold_pct,
            } => format!(
                "  FAIL  {} ({}% < {}%)",
                metric,
                format_number(*delta_pct, 2, true),
                format_number(*threshold_pct, 2, false)
            )
            .red()
            .bold(),
            GateResult::Missing { metric } => format!("  miss  {}", metric).dimmed(),
        };
        println!("{}", line);
    }

    let summary = if eval.overall_pass {
        eval.summary.green()
    } else {
        eval.summary.red()
    };
    println!("  {}", summary.bold());
}

// ────────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────────

/// Round to `decimals`, drop trailing zeros and group thousands with `,`.
/// With `sign`, positive values get a leading `+`.
pub fn format_number(value: f64, decimals: usize, sign: bool) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    } else if sign && value > 0.0 && !is_zero {
        out.push('+');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Short human time for a duration given in seconds.
pub fn format_duration_secs(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "-".to_string();
    }

    let (value, suffix) = if secs >= 1.0 {
        (secs, "s")
    } else if secs >= 1e-3 {
        (secs * 1e3, "ms")
    } else if secs >= 1e-6 {
        (secs * 1e6, "μs")
    } else {
        (secs * 1e9, "ns")
    };

    format!("{}{}", format_number(value, 2, false), suffix)
}
