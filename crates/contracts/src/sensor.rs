//! SensorInfo - enumeration output
//!
//! Read-only snapshot of one sensor as returned by `sensors_list`.

use serde::{Deserialize, Serialize};

use crate::{RateLevel, ReportMode, SensorType, SharedMemType};

/// Sensor handle, unique among registered sensors
pub type SensorHandle = i32;

/// Direct channel handle, unique among registered channels
pub type ChannelHandle = i32;

/// Sensor flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorFlags(pub u32);

impl SensorFlags {
    pub const WAKE_UP: u32 = 0x1;
    pub const CONTINUOUS_MODE: u32 = 0x0;
    pub const ON_CHANGE_MODE: u32 = 0x2;
    pub const ONE_SHOT_MODE: u32 = 0x4;
    pub const SPECIAL_REPORTING_MODE: u32 = 0x6;
    pub const DATA_INJECTION: u32 = 0x10;
    pub const DYNAMIC_SENSOR: u32 = 0x20;
    pub const ADDITIONAL_INFO: u32 = 0x40;
    pub const DIRECT_CHANNEL_ASHMEM: u32 = 0x400;
    pub const DIRECT_CHANNEL_GRALLOC: u32 = 0x800;

    pub const MASK_REPORTING_MODE: u32 = 0xE;
    pub const MASK_DIRECT_REPORT: u32 = 0x380;
    pub const MASK_DIRECT_CHANNEL: u32 = 0xC00;

    pub const SHIFT_REPORTING_MODE: u32 = 1;
    pub const SHIFT_DIRECT_REPORT: u32 = 7;

    /// Build flags from parts
    pub fn new(mode: ReportMode, max_rate: RateLevel, extra: u32) -> Self {
        let mode_bits = match mode {
            ReportMode::Continuous => Self::CONTINUOUS_MODE,
            ReportMode::OnChange => Self::ON_CHANGE_MODE,
            ReportMode::OneShot => Self::ONE_SHOT_MODE,
            ReportMode::Special => Self::SPECIAL_REPORTING_MODE,
        };
        let rate_bits = ((max_rate as u32) << Self::SHIFT_DIRECT_REPORT) & Self::MASK_DIRECT_REPORT;
        Self(mode_bits | rate_bits | extra)
    }

    /// Reporting mode encoded in the flags
    pub fn report_mode(self) -> ReportMode {
        match self.0 & Self::MASK_REPORTING_MODE {
            Self::ON_CHANGE_MODE => ReportMode::OnChange,
            Self::ONE_SHOT_MODE => ReportMode::OneShot,
            Self::SPECIAL_REPORTING_MODE => ReportMode::Special,
            _ => ReportMode::Continuous,
        }
    }

    /// Highest direct report rate level supported
    pub fn max_direct_report_rate(self) -> RateLevel {
        RateLevel::from_raw((self.0 & Self::MASK_DIRECT_REPORT) >> Self::SHIFT_DIRECT_REPORT)
    }

    pub fn supports_data_injection(self) -> bool {
        self.0 & Self::DATA_INJECTION != 0
    }

    pub fn is_wake_up(self) -> bool {
        self.0 & Self::WAKE_UP != 0
    }

    /// Whether a direct channel of this memory type can be used
    pub fn supports_direct_channel(self, mem_type: SharedMemType) -> bool {
        let bit = match mem_type {
            SharedMemType::Ashmem => Self::DIRECT_CHANNEL_ASHMEM,
            SharedMemType::Gralloc => Self::DIRECT_CHANNEL_GRALLOC,
        };
        self.0 & bit != 0
    }
}

/// Sensor descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorInfo {
    /// Sensor handle
    pub handle: SensorHandle,

    /// Sensor type
    pub sensor_type: SensorType,

    /// String type (e.g. "android.sensor.accelerometer")
    pub type_as_string: String,

    /// Sensor name
    pub name: String,

    /// Vendor name
    pub vendor: String,

    /// Driver version
    pub version: i32,

    /// Maximum range in sensor units
    pub max_range: f32,

    /// Resolution in sensor units
    pub resolution: f32,

    /// Power draw in mA
    pub power: f32,

    /// Minimum delay (microseconds), -1 for one-shot
    pub min_delay_us: i32,

    /// Maximum delay (microseconds)
    pub max_delay_us: i32,

    /// Hardware FIFO events reserved for this sensor
    pub fifo_reserved_event_count: u32,

    /// Hardware FIFO capacity
    pub fifo_max_event_count: u32,

    /// Permission needed to access the sensor
    #[serde(default)]
    pub required_permission: String,

    /// Flag bits
    pub flags: SensorFlags,
}

impl SensorInfo {
    /// Reporting mode from the flags
    pub fn report_mode(&self) -> ReportMode {
        self.flags.report_mode()
    }

    pub fn is_one_shot(&self) -> bool {
        self.report_mode() == ReportMode::OneShot
    }

    /// Minimum sampling period in nanoseconds (0 when unspecified)
    pub fn min_sampling_period_ns(&self) -> i64 {
        i64::from(self.min_delay_us.max(0)) * 1000
    }

    /// Maximum sampling period in nanoseconds (0 when unspecified)
    pub fn max_sampling_period_ns(&self) -> i64 {
        i64::from(self.max_delay_us.max(0)) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_mode_bits() {
        assert_eq!(SensorFlags(0).report_mode(), ReportMode::Continuous);
        assert_eq!(SensorFlags(0x2).report_mode(), ReportMode::OnChange);
        assert_eq!(SensorFlags(0x5).report_mode(), ReportMode::OneShot);
        assert_eq!(SensorFlags(0x6).report_mode(), ReportMode::Special);
    }

    #[test]
    fn test_direct_report_bits() {
        let flags = SensorFlags::new(
            ReportMode::Continuous,
            RateLevel::Fast,
            SensorFlags::DIRECT_CHANNEL_ASHMEM,
        );
        assert_eq!(flags.max_direct_report_rate(), RateLevel::Fast);
        assert!(flags.supports_direct_channel(SharedMemType::Ashmem));
        assert!(!flags.supports_direct_channel(SharedMemType::Gralloc));
        assert_eq!(flags.report_mode(), ReportMode::Continuous);
    }
}
