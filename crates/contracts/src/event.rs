//! Event - HAL output
//!
//! Sensor events delivered through the registered callback or parsed
//! from a direct report channel.

use serde::{Deserialize, Serialize};

use crate::{SensorHandle, SensorType};

/// Sensor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sensor handle (report token for direct report events)
    pub sensor_handle: SensorHandle,

    /// Sensor type
    pub sensor_type: SensorType,

    /// Monotonic timestamp (ns)
    pub timestamp: i64,

    /// Typed payload
    pub payload: EventPayload,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// 3-axis vector (accelerometer, gyroscope, magnetometer ...)
    Vec3(Vec3),

    /// Single value (light, proximity, pressure ...)
    Scalar(f32),

    /// Step counter value
    StepCount(u64),

    /// Metadata marker
    Meta(MetaDataEventType),

    /// Raw data words (direct report records)
    Data([f32; 16]),
}

/// 3-axis vector with accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub status: SensorStatus,
}

/// Reading accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    NoContact,
    Unreliable,
    AccuracyLow,
    AccuracyMedium,
    #[default]
    AccuracyHigh,
}

/// Metadata event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaDataEventType {
    FlushComplete,
}

impl Event {
    /// Flush-complete marker for `handle`
    pub fn flush_complete(handle: SensorHandle, timestamp: i64) -> Self {
        Self {
            sensor_handle: handle,
            sensor_type: SensorType::MetaData,
            timestamp,
            payload: EventPayload::Meta(MetaDataEventType::FlushComplete),
        }
    }

    /// Whether this event acknowledges a flush
    pub fn is_flush_complete(&self) -> bool {
        self.sensor_type == SensorType::MetaData
            && matches!(
                self.payload,
                EventPayload::Meta(MetaDataEventType::FlushComplete)
            )
    }

    /// Whether this event carries sensor data (not metadata or additional info)
    pub fn is_data(&self) -> bool {
        !matches!(
            self.sensor_type,
            SensorType::MetaData | SensorType::AdditionalInfo
        )
    }

    /// First three payload values, when the payload has them
    pub fn vec3(&self) -> Option<[f32; 3]> {
        match &self.payload {
            EventPayload::Vec3(v) => Some([v.x, v.y, v.z]),
            EventPayload::Data(d) => Some([d[0], d[1], d[2]]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_complete_classification() {
        let flush = Event::flush_complete(3, 100);
        assert!(flush.is_flush_complete());
        assert!(!flush.is_data());

        let data = Event {
            sensor_handle: 3,
            sensor_type: SensorType::Accelerometer,
            timestamp: 100,
            payload: EventPayload::Vec3(Vec3::default()),
        };
        assert!(!data.is_flush_complete());
        assert!(data.is_data());
    }

    #[test]
    fn test_vec3_from_data_words() {
        let mut words = [0.0f32; 16];
        words[..3].copy_from_slice(&[1.0, 2.0, 3.0]);
        let event = Event {
            sensor_handle: 1,
            sensor_type: SensorType::Gyroscope,
            timestamp: 0,
            payload: EventPayload::Data(words),
        };
        assert_eq!(event.vec3(), Some([1.0, 2.0, 3.0]));
    }
}
