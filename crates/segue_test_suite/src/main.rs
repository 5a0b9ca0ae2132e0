//! Scenario Runner
//!
//! Command-line tool for running Segue transition scenarios.
//!
//! Usage:
//!   segue-scenarios              # Run all scenarios
//!   segue-scenarios --filter foo # Run scenarios matching "foo"
//!   segue-scenarios --list       # List all scenarios
//!   segue-scenarios --json out.json # Also write a JSON report
//!
//! Set `SEGUE_SCENARIO_CONFIG` to a TOML file to run with a custom engine
//! configuration.

use anyhow::{Context, Result};
use segue_test_suite::{runner::TestRunner, tests};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--list") {
        println!("Available scenario suites:");
        for suite in tests::all_suites() {
            println!("\n  {}:", suite.name);
            for case in &suite.cases {
                println!("    - {}", case.name);
            }
        }
        return Ok(());
    }

    let flag_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let filter = flag_value("--filter");
    let report = flag_value("--json");

    println!("╔══════════════════════════════════════════╗");
    println!("║      SEGUE TRANSITION SCENARIO TESTS     ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut runner = TestRunner::new()?;
    for suite in tests::all_suites() {
        runner.add_suite(suite);
    }

    if let Some(ref pattern) = filter {
        println!("Running scenarios matching: {}\n", pattern);
        runner.filter(pattern);
    }

    let result = runner.run();
    result.print_summary();

    if let Some(path) = report {
        let json = serde_json::to_string_pretty(&result.to_json())?;
        std::fs::write(&path, json).with_context(|| format!("writing report to {path}"))?;
        println!("\nReport written to {}", path);
    }

    if result.all_passed() {
        println!("\nAll scenarios passed!");
        Ok(())
    } else {
        std::process::exit(1);
    }
}
