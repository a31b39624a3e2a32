//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate timeouts, tolerances and the simulated sensor profile
//! - Produce a `HarnessConfig`
//!
//! Every section is optional; missing sections take their defaults.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("vts.toml")).unwrap();
//! println!("flush wait: {} ms", config.timeouts.flush_wait_ms);
//! ```

mod parser;
mod validator;

pub use contracts::HarnessConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<HarnessConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<HarnessConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load from `path` when given, otherwise validated defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<HarnessConfig, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let config = HarnessConfig::default();
                validator::validate(&config)?;
                Ok(config)
            }
        }
    }

    /// Serialize HarnessConfig to TOML string
    pub fn to_toml(config: &HarnessConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize HarnessConfig to JSON string
    pub fn to_json(config: &HarnessConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<HarnessConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorType;
    use std::io::Write;

    const PARTIAL_TOML: &str = r#"
[timeouts]
flush_wait_ms = 2000
event_wait_base_ms = 500
stale_gap_ms = 1000
rebind_collection_ms = 1000
settle_ms = 200

[suite]
filter = ["flush", "batch"]

[[simulated_hal.sensors]]
sensor_type = "accelerometer"
report_mode = "continuous"
min_delay_us = 10000
max_delay_us = 100000
fifo_reserved_event_count = 100
fifo_max_event_count = 1000
"#;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        assert_eq!(config.timeouts.flush_wait_ms, 1000);
        assert_eq!(config.hot_switch.min_events, 50);
        assert!(config.suite.filter.is_empty());
    }

    #[test]
    fn test_load_from_str_toml() {
        let config = ConfigLoader::load_from_str(PARTIAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(config.timeouts.flush_wait_ms, 2000);
        assert_eq!(config.suite.filter, vec!["flush", "batch"]);
        assert_eq!(config.simulated_hal.sensors.len(), 1);
        assert_eq!(config.simulated_hal.sensors[0].sensor_type, SensorType::Accelerometer);
        // untouched sections keep defaults
        assert_eq!(config.batching.max_batching_period_ms, 30_000);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(PARTIAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config2.timeouts.flush_wait_ms, 2000);
        assert_eq!(config2.simulated_hal.sensors.len(), 1);
    }

    #[test]
    fn test_round_trip_toml_defaults() {
        let toml = ConfigLoader::to_toml(&HarnessConfig::default()).unwrap();
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.simulated_hal.sensors.len(), 6);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(PARTIAL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.timeouts.settle_ms, 200);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[batching]
min_batching_period_ms = 5000
max_batching_period_ms = 1000
fifo_fraction = 0.9
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("batching"));
    }
}
