//! HarnessConfig - Config Loader output
//!
//! Timeouts, tolerances and durations used by the test scenarios, the case
//! filter, and the sensor profile of the simulated HAL.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{RateLevel, ReportMode, SensorType};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HarnessConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Wait budgets shared by several scenarios
    #[serde(default)]
    #[validate(nested)]
    pub timeouts: TimeoutConfig,

    /// Streaming scenario
    #[serde(default)]
    #[validate(nested)]
    pub streaming: StreamingConfig,

    /// Sampling rate hot switch scenario
    #[serde(default)]
    #[validate(nested)]
    pub hot_switch: HotSwitchConfig,

    /// Batching scenario
    #[serde(default)]
    #[validate(nested)]
    pub batching: BatchingConfig,

    /// Direct report scenario
    #[serde(default)]
    #[validate(nested)]
    pub direct_report: DirectReportConfig,

    /// Suite selection and reporting
    #[serde(default)]
    pub suite: SuiteConfig,

    /// Simulated HAL profile
    #[serde(default)]
    pub simulated_hal: SimulatedHalConfig,
}

/// Wait budgets (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimeoutConfig {
    /// Wait for flush-complete events
    #[validate(range(min = 1))]
    pub flush_wait_ms: u64,

    /// Base wait for first events, extended by `5 * max min_delay`
    #[validate(range(min = 1))]
    pub event_wait_base_ms: u64,

    /// Sleep between sessions in the stale events scenario
    pub stale_gap_ms: u64,

    /// Collection window when probing environment rebinding
    #[validate(range(min = 1))]
    pub rebind_collection_ms: u64,

    /// Settle time after changing sensor configuration
    pub settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            flush_wait_ms: 1000,
            event_wait_base_ms: 500,
            stale_gap_ms: 1000,
            rebind_collection_ms: 1000,
            settle_ms: 500,
        }
    }
}

/// Streaming scenario settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamingConfig {
    /// Collection duration
    #[validate(range(min = 1))]
    pub duration_ms: u64,

    /// Fraction of the nominal event count that must arrive
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_count_fraction: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            duration_ms: 5000,
            min_count_fraction: 0.5,
        }
    }
}

/// Hot switch scenario settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HotSwitchConfig {
    /// Events to collect per rate
    #[validate(range(min = 3))]
    pub min_events: usize,

    /// Upper bound for one collection
    #[validate(range(min = 1))]
    pub collection_timeout_ms: u64,

    /// Allowed relative deviation of the mean interval from the configured period
    #[validate(range(min = 0.0, max = 1.0))]
    pub interval_tolerance: f64,
}

impl Default for HotSwitchConfig {
    fn default() -> Self {
        Self {
            min_events: 50,
            collection_timeout_ms: 60_000,
            interval_tolerance: 0.1,
        }
    }
}

/// Batching scenario settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchingConfig {
    /// Shortest batching period worth testing; shorter sensors are skipped
    #[validate(range(min = 1))]
    pub min_batching_period_ms: u64,

    /// Cap on the batching period
    #[validate(range(min = 1))]
    pub max_batching_period_ms: u64,

    /// Fraction of the reserved FIFO that must be delivered
    #[validate(range(min = 0.0, max = 1.0))]
    pub fifo_fraction: f64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            min_batching_period_ms: 1000,
            max_batching_period_ms: 30_000,
            fifo_fraction: 0.9,
        }
    }
}

/// Direct report scenario settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectReportConfig {
    /// Nominal measurement window
    #[validate(range(min = 1))]
    pub nominal_test_time_ms: u64,

    /// Extra time allowed for channel start-up
    pub init_margin_ms: u64,

    /// Lower bound on the event count, as a fraction of nominal
    #[validate(range(min = 0.0))]
    pub min_rate_fraction: f64,

    /// Upper bound on the event count, as a fraction of nominal
    #[validate(range(min = 0.0))]
    pub max_rate_fraction: f64,

    /// Capacity of the shared region in records
    ///
    /// Must hold every record written during the measurement window; the
    /// writer wraps to the start of the region once it is full.
    #[validate(range(min = 1))]
    pub region_records: usize,
}

impl Default for DirectReportConfig {
    fn default() -> Self {
        Self {
            nominal_test_time_ms: 1000,
            init_margin_ms: 500,
            min_rate_fraction: 0.55,
            max_rate_fraction: 2.2,
            region_records: 4096,
        }
    }
}

impl DirectReportConfig {
    /// Records a HAL reporting at the fastest rate level may write within
    /// `nominal_test_time_ms + init_margin_ms` while staying under `max_rate_fraction`
    pub fn required_region_records(&self) -> usize {
        let window_s = (self.nominal_test_time_ms + self.init_margin_ms) as f64 / 1000.0;
        let records = self.max_rate_fraction * RateLevel::VeryFast.nominal_hz() * window_s;
        records.ceil() as usize
    }
}

/// Suite selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Case name substrings to run (empty = all)
    #[serde(default)]
    pub filter: Vec<String>,

    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Simulated HAL profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedHalConfig {
    /// Sensors exposed by the simulated HAL
    pub sensors: Vec<SimulatedSensorConfig>,
}

impl Default for SimulatedHalConfig {
    fn default() -> Self {
        Self {
            sensors: SimulatedSensorConfig::default_profile(),
        }
    }
}

/// One simulated sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedSensorConfig {
    /// Sensor type
    pub sensor_type: SensorType,

    /// Reporting mode
    pub report_mode: ReportMode,

    /// Minimum delay (us), -1 for one-shot
    pub min_delay_us: i32,

    /// Maximum delay (us)
    pub max_delay_us: i32,

    /// Reserved FIFO events
    #[serde(default)]
    pub fifo_reserved_event_count: u32,

    /// FIFO capacity
    #[serde(default)]
    pub fifo_max_event_count: u32,

    /// Accepts injected events
    #[serde(default)]
    pub data_injection: bool,

    /// Highest direct report rate (stop = no direct report)
    #[serde(default)]
    pub direct_report: RateLevel,

    /// Ashmem channels supported
    #[serde(default)]
    pub direct_channel_ashmem: bool,

    /// Gralloc channels supported
    #[serde(default)]
    pub direct_channel_gralloc: bool,
}

impl SimulatedSensorConfig {
    /// Continuous 3-axis sensor with batching and direct report support
    pub fn motion(sensor_type: SensorType, min_delay_us: i32, max_delay_us: i32) -> Self {
        Self {
            sensor_type,
            report_mode: ReportMode::Continuous,
            min_delay_us,
            max_delay_us,
            fifo_reserved_event_count: 300,
            fifo_max_event_count: 3000,
            data_injection: true,
            direct_report: RateLevel::VeryFast,
            direct_channel_ashmem: true,
            direct_channel_gralloc: true,
        }
    }

    /// Sensor without FIFO or direct report
    pub fn basic(sensor_type: SensorType, report_mode: ReportMode, min_delay_us: i32, max_delay_us: i32) -> Self {
        Self {
            sensor_type,
            report_mode,
            min_delay_us,
            max_delay_us,
            fifo_reserved_event_count: 0,
            fifo_max_event_count: 0,
            data_injection: false,
            direct_report: RateLevel::Stop,
            direct_channel_ashmem: false,
            direct_channel_gralloc: false,
        }
    }

    /// Accelerometer, gyroscope, magnetometer, light, significant motion, step detector
    pub fn default_profile() -> Vec<Self> {
        vec![
            Self::motion(SensorType::Accelerometer, 5_000, 200_000),
            Self::motion(SensorType::Gyroscope, 5_000, 200_000),
            Self::motion(SensorType::MagneticField, 10_000, 200_000),
            Self::basic(SensorType::Light, ReportMode::OnChange, 0, 1_000_000),
            Self::basic(SensorType::SignificantMotion, ReportMode::OneShot, -1, 0),
            Self::basic(SensorType::StepDetector, ReportMode::Special, 0, 0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeouts.flush_wait_ms, 1000);
        assert_eq!(config.simulated_hal.sensors.len(), 6);
    }

    #[test]
    fn test_required_region_records() {
        let direct = DirectReportConfig::default();
        // 2.2 * 800 Hz * 1.5 s
        assert_eq!(direct.required_region_records(), 2640);
        assert!(direct.region_records >= direct.required_region_records());
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        let mut config = HarnessConfig::default();
        config.streaming.min_count_fraction = 1.5;
        assert!(config.validate().is_err());
    }
}
