//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use harness::{CaseOutcome, Environment, Suite, SuiteReport};
use mock_hal::MockSensorsHal;
use serde::Serialize;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;

/// Report entry for JSON output
#[derive(Serialize)]
struct CaseJson<'a> {
    name: &'a str,
    status: &'static str,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    passed: u64,
    skipped: u64,
    failed: u64,
    cases: Vec<CaseJson<'a>>,
}

/// Execute the `run` command
///
/// Fails when any case fails, which makes the exit status the aggregate verdict.
pub async fn run_suite(args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
    }

    let mut config = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .map_err(CliError::from)
        .context("Failed to load configuration")?;

    // Apply CLI overrides
    if !args.filter.is_empty() {
        info!(filter = ?args.filter, "Overriding case filter from CLI");
        config.suite.filter = args.filter.clone();
    }
    if let Some(port) = args.metrics_port.or(config.suite.metrics_port) {
        observability::install_metrics_exporter(port)?;
    }

    let suite = Suite::catalog().filtered(&config.suite.filter);
    if suite.is_empty() {
        return Err(CliError::no_cases_selected(&config.suite.filter).into());
    }

    info!(
        sensors = config.simulated_hal.sensors.len(),
        cases = suite.len(),
        "Running suite against the simulated HAL"
    );
    let hal = MockSensorsHal::new(&config.simulated_hal);
    let env = Environment::new(Arc::new(hal));
    let report = suite
        .run(&env, &config)
        .await
        .map_err(CliError::from)?;

    if args.json {
        println!("{}", render_json(&report)?);
    } else {
        for case in &report.cases {
            println!("{case}");
        }
        println!("\n{}", report.summary);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::suite_failed(report.summary.failed, report.summary.total).into())
    }
}

fn render_json(report: &SuiteReport) -> Result<String> {
    let cases = report
        .cases
        .iter()
        .map(|case| {
            let message = match &case.outcome {
                CaseOutcome::Passed => None,
                CaseOutcome::Skipped(reason) => Some(reason.clone()),
                CaseOutcome::Failed(err) => Some(err.to_string()),
            };
            CaseJson {
                name: &case.name,
                status: case.outcome.status().as_str(),
                duration_ms: case.duration.as_secs_f64() * 1000.0,
                message,
            }
        })
        .collect();

    let json = ReportJson {
        passed: report.summary.passed,
        skipped: report.summary.skipped,
        failed: report.summary.failed,
        cases,
    };
    serde_json::to_string_pretty(&json).context("Failed to serialize report")
}
