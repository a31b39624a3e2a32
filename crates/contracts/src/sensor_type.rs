//! SensorType - numeric sensor type ids, string types and expected reporting modes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// First type id reserved for vendor defined sensors
pub const DEVICE_PRIVATE_BASE: i32 = 0x10000;

/// Reporting mode, encoded in bits 1..=3 of the sensor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    Continuous,
    OnChange,
    OneShot,
    Special,
}

/// Generate the `SensorType` enum together with its lookup tables.
///
/// Each row is `Variant = raw id, "config name", "string type", expected mode`.
/// Info types (`META_DATA`, `ADDITIONAL_INFO`) carry no expected mode.
macro_rules! sensor_types {
    ($( $variant:ident = $raw:literal, $name:literal, $string_type:literal, $mode:expr; )*) => {
        /// Sensor type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum SensorType {
            $( $variant, )*
            /// Vendor defined type (raw id >= `DEVICE_PRIVATE_BASE`)
            DevicePrivate(i32),
        }

        impl SensorType {
            /// Raw numeric type id
            pub fn as_raw(self) -> i32 {
                match self {
                    $( Self::$variant => $raw, )*
                    Self::DevicePrivate(raw) => raw,
                }
            }

            /// Convert from a raw numeric type id
            pub fn from_raw(raw: i32) -> Option<Self> {
                match raw {
                    $( $raw => Some(Self::$variant), )*
                    raw if raw >= DEVICE_PRIVATE_BASE => Some(Self::DevicePrivate(raw)),
                    _ => None,
                }
            }

            /// Short snake_case name used in configuration files
            pub fn name(self) -> String {
                match self {
                    $( Self::$variant => $name.to_string(), )*
                    Self::DevicePrivate(raw) => format!("device_private:{raw}"),
                }
            }

            /// Parse the configuration name back into a type
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(Self::$variant), )*
                    other => other
                        .strip_prefix("device_private:")
                        .and_then(|raw| raw.parse::<i32>().ok())
                        .filter(|raw| *raw >= DEVICE_PRIVATE_BASE)
                        .map(Self::DevicePrivate),
                }
            }

            /// Canonical string type (`android.sensor.*`), `None` for device private types
            pub fn string_type(self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($string_type), )*
                    Self::DevicePrivate(_) => None,
                }
            }

            /// Reporting mode mandated for this type, `None` when any mode is allowed
            pub fn expected_report_mode(self) -> Option<ReportMode> {
                match self {
                    $( Self::$variant => $mode, )*
                    Self::DevicePrivate(_) => None,
                }
            }
        }
    };
}

sensor_types! {
    MetaData = 0, "meta_data", "", None;
    Accelerometer = 1, "accelerometer", "android.sensor.accelerometer", Some(ReportMode::Continuous);
    MagneticField = 2, "magnetic_field", "android.sensor.magnetic_field", Some(ReportMode::Continuous);
    Orientation = 3, "orientation", "android.sensor.orientation", Some(ReportMode::Continuous);
    Gyroscope = 4, "gyroscope", "android.sensor.gyroscope", Some(ReportMode::Continuous);
    Light = 5, "light", "android.sensor.light", Some(ReportMode::OnChange);
    Pressure = 6, "pressure", "android.sensor.pressure", Some(ReportMode::Continuous);
    Temperature = 7, "temperature", "android.sensor.temperature", Some(ReportMode::Continuous);
    Proximity = 8, "proximity", "android.sensor.proximity", Some(ReportMode::OnChange);
    Gravity = 9, "gravity", "android.sensor.gravity", Some(ReportMode::Continuous);
    LinearAcceleration = 10, "linear_acceleration", "android.sensor.linear_acceleration", Some(ReportMode::Continuous);
    RotationVector = 11, "rotation_vector", "android.sensor.rotation_vector", Some(ReportMode::Continuous);
    RelativeHumidity = 12, "relative_humidity", "android.sensor.relative_humidity", Some(ReportMode::OnChange);
    AmbientTemperature = 13, "ambient_temperature", "android.sensor.ambient_temperature", Some(ReportMode::OnChange);
    MagneticFieldUncalibrated = 14, "magnetic_field_uncalibrated", "android.sensor.magnetic_field_uncalibrated", Some(ReportMode::Continuous);
    GameRotationVector = 15, "game_rotation_vector", "android.sensor.game_rotation_vector", Some(ReportMode::Continuous);
    GyroscopeUncalibrated = 16, "gyroscope_uncalibrated", "android.sensor.gyroscope_uncalibrated", Some(ReportMode::Continuous);
    SignificantMotion = 17, "significant_motion", "android.sensor.significant_motion", Some(ReportMode::OneShot);
    StepDetector = 18, "step_detector", "android.sensor.step_detector", Some(ReportMode::Special);
    StepCounter = 19, "step_counter", "android.sensor.step_counter", Some(ReportMode::OnChange);
    GeomagneticRotationVector = 20, "geomagnetic_rotation_vector", "android.sensor.geomagnetic_rotation_vector", Some(ReportMode::Continuous);
    HeartRate = 21, "heart_rate", "android.sensor.heart_rate", Some(ReportMode::OnChange);
    TiltDetector = 22, "tilt_detector", "android.sensor.tilt_detector", Some(ReportMode::Special);
    WakeGesture = 23, "wake_gesture", "android.sensor.wake_gesture", Some(ReportMode::OneShot);
    GlanceGesture = 24, "glance_gesture", "android.sensor.glance_gesture", Some(ReportMode::OneShot);
    PickUpGesture = 25, "pick_up_gesture", "android.sensor.pick_up_gesture", Some(ReportMode::OneShot);
    WristTiltGesture = 26, "wrist_tilt_gesture", "android.sensor.wrist_tilt_gesture", Some(ReportMode::Special);
    DeviceOrientation = 27, "device_orientation", "android.sensor.device_orientation", Some(ReportMode::OnChange);
    Pose6Dof = 28, "pose_6dof", "android.sensor.pose_6dof", Some(ReportMode::Continuous);
    StationaryDetect = 29, "stationary_detect", "android.sensor.stationary_detect", Some(ReportMode::OneShot);
    MotionDetect = 30, "motion_detect", "android.sensor.motion_detect", Some(ReportMode::OneShot);
    HeartBeat = 31, "heart_beat", "android.sensor.heart_beat", Some(ReportMode::Special);
    DynamicSensorMeta = 32, "dynamic_sensor_meta", "android.sensor.dynamic_sensor_meta", Some(ReportMode::Special);
    AdditionalInfo = 33, "additional_info", "android.sensor.additional_info", None;
    LowLatencyOffbodyDetect = 34, "low_latency_offbody_detect", "android.sensor.low_latency_offbody_detect", Some(ReportMode::OnChange);
    AccelerometerUncalibrated = 35, "accelerometer_uncalibrated", "android.sensor.accelerometer_uncalibrated", Some(ReportMode::Continuous);
}

impl SensorType {
    /// Whether sensors of this type may appear in the sensor list
    ///
    /// Info types never describe a physical sensor.
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::MetaData | Self::AdditionalInfo)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for SensorType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for SensorType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_name(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown sensor type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        assert_eq!(SensorType::from_raw(1), Some(SensorType::Accelerometer));
        assert_eq!(SensorType::Gyroscope.as_raw(), 4);
        assert_eq!(SensorType::from_raw(-3), None);
        assert_eq!(
            SensorType::from_raw(DEVICE_PRIVATE_BASE + 2),
            Some(SensorType::DevicePrivate(DEVICE_PRIVATE_BASE + 2))
        );
    }

    #[test]
    fn test_expected_modes() {
        assert_eq!(
            SensorType::Accelerometer.expected_report_mode(),
            Some(ReportMode::Continuous)
        );
        assert_eq!(
            SensorType::SignificantMotion.expected_report_mode(),
            Some(ReportMode::OneShot)
        );
        assert_eq!(SensorType::DevicePrivate(DEVICE_PRIVATE_BASE).expected_report_mode(), None);
    }

    #[test]
    fn test_info_types_are_invalid() {
        assert!(!SensorType::MetaData.is_valid());
        assert!(!SensorType::AdditionalInfo.is_valid());
        assert!(SensorType::Light.is_valid());
    }

    #[test]
    fn test_serde_by_name() {
        let json = serde_json::to_string(&SensorType::MagneticField).unwrap();
        assert_eq!(json, "\"magnetic_field\"");

        let parsed: SensorType = serde_json::from_str("\"device_private:65537\"").unwrap();
        assert_eq!(parsed, SensorType::DevicePrivate(65537));

        assert!(serde_json::from_str::<SensorType>("\"barometer\"").is_err());
    }
}
