// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! opsbench demonstration runner
//!
//! Usage:
//!   opsbench                                   # run every demo suite
//!   opsbench --suite "Increment integer"       # run selected suites
//!   opsbench --time 500 --json out/run.json    # shorter budget, save report
//!   opsbench --baseline out/run.json           # compare with a saved run

mod demos;

use clap::Parser;
use colored::Colorize;
use opsbench::console::{self, ConsoleReporter};
use opsbench::{
    merge_counts, Harness, HarnessConfig, ProgressReporter, RegressionGates, Report, RunContext,
    TracingReporter,
};
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "opsbench", about = "Adaptive throughput micro-benchmarks", version)]
struct Cli {
    /// Harness config file (TOML or YAML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Default time budget per test in milliseconds.
    #[arg(long, allow_negative_numbers = true)]
    time: Option<i64>,

    /// Default invocations per batch.
    #[arg(long, allow_negative_numbers = true)]
    cycles: Option<i64>,

    /// Default minimum number of batches per test.
    #[arg(long, allow_negative_numbers = true)]
    min_samples: Option<i64>,

    /// Only run the named suite (repeatable).
    #[arg(long)]
    suite: Vec<String>,

    /// Abort the whole run after this many milliseconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the full report as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Merge `{name, count}` pairs of every suite into this JSON file.
    #[arg(long)]
    results: Option<PathBuf>,

    /// Compare throughput against a saved report.
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Allowed throughput regression in percent.
    #[arg(long, default_value = "5.0")]
    threshold: f64,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging; progress is logged instead of printed.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(time) = cli.time {
        config.defaults.time_ms = Some(time);
    }
    if let Some(cycles) = cli.cycles {
        config.defaults.cycles = Some(cycles);
    }
    if let Some(min_samples) = cli.min_samples {
        config.defaults.min_samples = Some(min_samples);
    }
    if !cli.suite.is_empty() {
        config.suites = cli.suite.clone();
    }
    if cli.timeout.is_some() {
        config.timeout_ms = cli.timeout;
    }

    // Debug runs log progress through tracing instead of progress lines.
    let reporter: Rc<dyn ProgressReporter> = if cli.debug {
        Rc::new(TracingReporter)
    } else {
        Rc::new(ConsoleReporter)
    };
    let ctx = RunContext::with_reporter(reporter);
    let mut harness = Harness::from_config(&config, "opsbench demos", ctx);
    demos::register(&mut harness);

    if !config.suites.is_empty() {
        harness.retain_suites(|s| config.suites.iter().any(|name| name == s.name()));
        if harness.suites().is_empty() {
            return Err(opsbench::HarnessError::Config(format!(
                "no suite matches {:?}",
                config.suites
            ))
            .into());
        }
    }

    console::print_header(harness.name());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = match config.timeout() {
        Some(limit) => runtime.block_on(harness.run_with_timeout(limit))?,
        None => runtime.block_on(harness.run()),
    };

    for suite in &report.suites {
        console::print_suite(suite);
    }
    println!(
        "\n  {} {} suite(s) in {:.2}s",
        "Done.".bold().green(),
        report.suites.len(),
        report.elapsed_ms as f64 / 1000.0
    );

    // ── Export ──
    if let Some(path) = &cli.json {
        report.save(path)?;
        println!("  JSON exported to {}", path.display());
    }
    if let Some(path) = &cli.results {
        for suite in &report.suites {
            merge_counts(path, suite)?;
        }
        println!("  Results merged into {}", path.display());
    }

    // ── Baseline ──
    if let Some(path) = &cli.baseline {
        let baseline = Report::load(path)?;
        let eval = RegressionGates::with_threshold_pct(cli.threshold).evaluate(&baseline, &report);
        console::print_gates(&eval);
        if !eval.overall_pass {
            std::process::exit(eval.exit_code());
        }
    }

    Ok(())
}
