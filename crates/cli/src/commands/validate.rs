//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{HarnessConfig, ReportMode};
use harness::Suite;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sensor_count: usize,
    selected_cases: usize,
    streaming_duration_ms: u64,
    flush_wait_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let selected_cases = Suite::catalog().filtered(&config.suite.filter).len();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    sensor_count: config.simulated_hal.sensors.len(),
                    selected_cases,
                    streaming_duration_ms: config.streaming.duration_ms,
                    flush_wait_ms: config.timeouts.flush_wait_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &HarnessConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if Suite::catalog().filtered(&config.suite.filter).is_empty() {
        warnings.push(format!(
            "suite.filter {:?} selects no test case",
            config.suite.filter
        ));
    }

    if config.simulated_hal.sensors.is_empty() {
        warnings.push("Simulated HAL has no sensors - most cases will be skipped".to_string());
    }

    let has_continuous = config
        .simulated_hal
        .sensors
        .iter()
        .any(|s| s.report_mode == ReportMode::Continuous);
    if !has_continuous {
        warnings.push("No continuous sensor configured - streaming cases will be skipped".to_string());
    }

    // slow streaming samples every 200 ms
    if config.streaming.duration_ms < 400 {
        warnings.push(format!(
            "streaming.duration_ms = {} leaves slow streaming with fewer than two samples",
            config.streaming.duration_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Simulated sensors: {}", summary.sensor_count);
            println!("  Selected cases: {}", summary.selected_cases);
            println!("  Streaming duration: {} ms", summary.streaming_duration_ms);
            println!("  Flush wait: {} ms", summary.flush_wait_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
