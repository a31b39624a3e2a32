//! Sensor set helpers
//!
//! Partitions and lookups over a sensor list. The list itself is always
//! re-queried from the HAL (`Environment::sensors_list`).

use contracts::{RateLevel, ReportMode, SensorHandle, SensorInfo, SensorType, SharedMemType};

/// Sensors that report more than once
pub fn non_one_shot_sensors(sensors: &[SensorInfo]) -> Vec<SensorInfo> {
    sensors.iter().filter(|s| !s.is_one_shot()).cloned().collect()
}

pub fn one_shot_sensors(sensors: &[SensorInfo]) -> Vec<SensorInfo> {
    sensors.iter().filter(|s| s.is_one_shot()).cloned().collect()
}

/// Sensors expected to stream while active
pub fn continuous_sensors(sensors: &[SensorInfo]) -> Vec<SensorInfo> {
    sensors
        .iter()
        .filter(|s| s.report_mode() == ReportMode::Continuous)
        .cloned()
        .collect()
}

/// A handle no sensor uses: one past the largest (non-negative) handle
///
/// `None` when the largest handle is `i32::MAX`.
pub fn invalid_sensor_handle(sensors: &[SensorInfo]) -> Option<SensorHandle> {
    sensors.iter().map(|s| s.handle).fold(0, i32::max).checked_add(1)
}

/// First sensor of `sensor_type`
pub fn default_sensor_by_type(sensors: &[SensorInfo], sensor_type: SensorType) -> Option<SensorInfo> {
    sensors.iter().find(|s| s.sensor_type == sensor_type).cloned()
}

/// Whether a sensor of this type may be listed
pub fn is_valid_type(sensor_type: SensorType) -> bool {
    sensor_type.is_valid()
}

pub fn is_direct_report_rate_supported(sensor: &SensorInfo, rate: RateLevel) -> bool {
    rate != RateLevel::Stop && rate <= sensor.flags.max_direct_report_rate()
}

pub fn is_direct_channel_type_supported(sensor: &SensorInfo, mem_type: SharedMemType) -> bool {
    sensor.flags.supports_direct_channel(mem_type)
}

/// Largest minimum delay across `sensors`, in microseconds (negative delays count as 0)
pub fn max_min_delay_us(sensors: &[SensorInfo]) -> i64 {
    sensors
        .iter()
        .map(|s| i64::from(s.min_delay_us.max(0)))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use contracts::SensorFlags;

    pub(crate) fn sensor(handle: SensorHandle, sensor_type: SensorType, mode: ReportMode) -> SensorInfo {
        SensorInfo {
            handle,
            sensor_type,
            type_as_string: sensor_type.string_type().unwrap_or("vendor").to_string(),
            name: format!("sensor {handle}"),
            vendor: "test".into(),
            version: 1,
            max_range: 10.0,
            resolution: 0.1,
            power: 0.1,
            min_delay_us: if mode == ReportMode::OneShot { -1 } else { 5000 },
            max_delay_us: if mode == ReportMode::OneShot { 0 } else { 100_000 },
            fifo_reserved_event_count: 0,
            fifo_max_event_count: 0,
            required_permission: String::new(),
            flags: SensorFlags::new(mode, RateLevel::Fast, SensorFlags::DIRECT_CHANNEL_ASHMEM),
        }
    }

    #[test]
    fn test_partitions() {
        let list = vec![
            sensor(1, SensorType::Accelerometer, ReportMode::Continuous),
            sensor(2, SensorType::SignificantMotion, ReportMode::OneShot),
            sensor(3, SensorType::Light, ReportMode::OnChange),
        ];
        assert_eq!(non_one_shot_sensors(&list).len(), 2);
        assert_eq!(one_shot_sensors(&list)[0].handle, 2);
        assert_eq!(continuous_sensors(&list)[0].handle, 1);
    }

    #[test]
    fn test_invalid_handle() {
        assert_eq!(invalid_sensor_handle(&[]), Some(1));
        let list = vec![
            sensor(7, SensorType::Accelerometer, ReportMode::Continuous),
            sensor(3, SensorType::Gyroscope, ReportMode::Continuous),
        ];
        assert_eq!(invalid_sensor_handle(&list), Some(8));
        let negative = vec![sensor(-5, SensorType::Gyroscope, ReportMode::Continuous)];
        assert_eq!(invalid_sensor_handle(&negative), Some(1));
    }

    #[test]
    fn test_invalid_handle_at_max() {
        let list = vec![
            sensor(1, SensorType::Accelerometer, ReportMode::Continuous),
            sensor(i32::MAX, SensorType::Gyroscope, ReportMode::Continuous),
        ];
        assert_eq!(invalid_sensor_handle(&list), None);
    }

    #[test]
    fn test_direct_report_support() {
        let accel = sensor(1, SensorType::Accelerometer, ReportMode::Continuous);
        assert!(is_direct_report_rate_supported(&accel, RateLevel::Normal));
        assert!(is_direct_report_rate_supported(&accel, RateLevel::Fast));
        assert!(!is_direct_report_rate_supported(&accel, RateLevel::VeryFast));
        assert!(!is_direct_report_rate_supported(&accel, RateLevel::Stop));
        assert!(is_direct_channel_type_supported(&accel, SharedMemType::Ashmem));
        assert!(!is_direct_channel_type_supported(&accel, SharedMemType::Gralloc));
    }

    #[test]
    fn test_default_sensor_by_type() {
        let list = vec![
            sensor(4, SensorType::Gyroscope, ReportMode::Continuous),
            sensor(9, SensorType::Gyroscope, ReportMode::Continuous),
        ];
        assert_eq!(default_sensor_by_type(&list, SensorType::Gyroscope).map(|s| s.handle), Some(4));
        assert!(default_sensor_by_type(&list, SensorType::Light).is_none());
        assert!(!is_valid_type(SensorType::MetaData));
    }
}
