//! Configuration validation
//!
//! Rules:
//! - numeric ranges declared on the config structs (`validator` derive)
//! - batching period bounds are ordered
//! - direct report rate fractions are ordered
//! - the direct report region holds a full measurement window at the fastest rate
//! - simulated sensors: one per type, reporting mode and delays consistent with the type

use std::collections::HashSet;

use contracts::{ContractError, HarnessConfig, ReportMode, SimulatedSensorConfig};
use validator::Validate;

/// Validate a HarnessConfig
///
/// Returns the first error encountered.
pub fn validate(config: &HarnessConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_batching(config)?;
    validate_direct_report(config)?;
    validate_simulated_sensors(config)?;
    Ok(())
}

fn validate_ranges(config: &HarnessConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let fields = errors
            .errors()
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ContractError::config_validation(fields, errors.to_string())
    })
}

fn validate_batching(config: &HarnessConfig) -> Result<(), ContractError> {
    let batching = &config.batching;
    if batching.min_batching_period_ms > batching.max_batching_period_ms {
        return Err(ContractError::config_validation(
            "batching.min_batching_period_ms / batching.max_batching_period_ms",
            format!(
                "min_batching_period_ms ({}) must be <= max_batching_period_ms ({})",
                batching.min_batching_period_ms, batching.max_batching_period_ms
            ),
        ));
    }
    Ok(())
}

fn validate_direct_report(config: &HarnessConfig) -> Result<(), ContractError> {
    let direct = &config.direct_report;
    if direct.min_rate_fraction >= direct.max_rate_fraction {
        return Err(ContractError::config_validation(
            "direct_report.min_rate_fraction / direct_report.max_rate_fraction",
            format!(
                "min_rate_fraction ({}) must be < max_rate_fraction ({})",
                direct.min_rate_fraction, direct.max_rate_fraction
            ),
        ));
    }
    let required = direct.required_region_records();
    if direct.region_records < required {
        return Err(ContractError::config_validation(
            "direct_report.region_records",
            format!(
                "region_records ({}) must be >= {} to hold {} ms at the fastest rate",
                direct.region_records,
                required,
                direct.nominal_test_time_ms + direct.init_margin_ms
            ),
        ));
    }
    Ok(())
}

fn validate_simulated_sensors(config: &HarnessConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sensor) in config.simulated_hal.sensors.iter().enumerate() {
        if !seen.insert(sensor.sensor_type) {
            return Err(ContractError::config_validation(
                format!("simulated_hal.sensors[{idx}].sensor_type"),
                format!("duplicate sensor type '{}'", sensor.sensor_type),
            ));
        }
        validate_simulated_sensor(idx, sensor)?;
    }
    Ok(())
}

fn validate_simulated_sensor(idx: usize, sensor: &SimulatedSensorConfig) -> Result<(), ContractError> {
    let field = |name: &str| format!("simulated_hal.sensors[{idx}].{name}");

    if !sensor.sensor_type.is_valid() {
        return Err(ContractError::config_validation(
            field("sensor_type"),
            format!("'{}' cannot be a physical sensor", sensor.sensor_type),
        ));
    }

    if let Some(expected) = sensor.sensor_type.expected_report_mode() {
        if expected != sensor.report_mode {
            return Err(ContractError::config_validation(
                field("report_mode"),
                format!(
                    "'{}' requires {:?}, got {:?}",
                    sensor.sensor_type, expected, sensor.report_mode
                ),
            ));
        }
    }

    let delays_ok = match sensor.report_mode {
        ReportMode::Continuous => {
            sensor.min_delay_us > 0 && sensor.max_delay_us >= sensor.min_delay_us
        }
        ReportMode::OnChange => sensor.min_delay_us >= 0 && sensor.max_delay_us >= 0,
        ReportMode::OneShot => sensor.min_delay_us == -1 && sensor.max_delay_us == 0,
        ReportMode::Special => true,
    };
    if !delays_ok {
        return Err(ContractError::config_validation(
            field("min_delay_us / max_delay_us"),
            format!(
                "delays ({}, {}) invalid for {:?} mode",
                sensor.min_delay_us, sensor.max_delay_us, sensor.report_mode
            ),
        ));
    }

    if sensor.fifo_reserved_event_count > sensor.fifo_max_event_count {
        return Err(ContractError::config_validation(
            field("fifo_reserved_event_count"),
            format!(
                "reserved ({}) exceeds fifo_max_event_count ({})",
                sensor.fifo_reserved_event_count, sensor.fifo_max_event_count
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorType;

    #[test]
    fn test_default_config_passes() {
        assert!(validate(&HarnessConfig::default()).is_ok());
    }

    #[test]
    fn test_range_violation_reports_field() {
        let mut config = HarnessConfig::default();
        config.timeouts.flush_wait_ms = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("timeouts"));
    }

    #[test]
    fn test_rate_fractions_must_be_ordered() {
        let mut config = HarnessConfig::default();
        config.direct_report.min_rate_fraction = 3.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("min_rate_fraction"));
    }

    #[test]
    fn test_region_too_small_for_window() {
        let mut config = HarnessConfig::default();
        config.direct_report.region_records = 64;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("region_records"));

        config.direct_report.region_records = config.direct_report.required_region_records();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_sensor_type() {
        let mut config = HarnessConfig::default();
        config
            .simulated_hal
            .sensors
            .push(SimulatedSensorConfig::motion(SensorType::Accelerometer, 5000, 100_000));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_report_mode_must_match_type() {
        let mut config = HarnessConfig::default();
        config.simulated_hal.sensors = vec![SimulatedSensorConfig::basic(
            SensorType::Accelerometer,
            ReportMode::OnChange,
            0,
            0,
        )];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("report_mode"));
    }

    #[test]
    fn test_one_shot_delays() {
        let mut config = HarnessConfig::default();
        config.simulated_hal.sensors = vec![SimulatedSensorConfig::basic(
            SensorType::SignificantMotion,
            ReportMode::OneShot,
            0,
            0,
        )];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_fifo_reserved_exceeds_max() {
        let mut config = HarnessConfig::default();
        let mut accel = SimulatedSensorConfig::motion(SensorType::Accelerometer, 5000, 100_000);
        accel.fifo_max_event_count = 10;
        config.simulated_hal.sensors = vec![accel];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("fifo"));
    }
}
