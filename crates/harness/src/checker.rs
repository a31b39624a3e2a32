//! Payload checkers
//!
//! Validate the values carried by a sequence of events.

use contracts::{Event, SensorInfo};
use nalgebra::Vector3;

use crate::error::{HarnessError, Result};

/// Standard gravity (m/s^2)
pub const GRAVITY_EARTH: f32 = 9.806_65;

/// First failing event
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    pub index: usize,
    pub message: String,
}

/// Event payload validator
pub trait EventChecker: Send + Sync {
    /// Validate `events`, reporting the first failure
    fn check(&self, events: &[Event]) -> std::result::Result<(), CheckFailure>;
}

/// Run `checker`, attributing a failure to `sensor`
pub fn check_events(checker: &dyn EventChecker, sensor: &SensorInfo, events: &[Event]) -> Result<()> {
    checker
        .check(events)
        .map_err(|failure| HarnessError::InvalidData {
            handle: sensor.handle,
            name: sensor.name.clone(),
            index: failure.index,
            message: failure.message,
        })
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChecker;

impl EventChecker for NullChecker {
    fn check(&self, _events: &[Event]) -> std::result::Result<(), CheckFailure> {
        Ok(())
    }
}

/// Checks that the 3-axis vector norm stays within `tolerance` of `expected`
#[derive(Debug, Clone, Copy)]
pub struct Vec3NormChecker {
    expected: f32,
    tolerance: f32,
}

impl Vec3NormChecker {
    pub fn new(expected: f32, tolerance: f32) -> Self {
        Self { expected, tolerance }
    }

    /// Device at rest: accelerometer sees gravity only
    pub fn gravity() -> Self {
        Self::new(GRAVITY_EARTH, 1.0)
    }

    /// Device at rest: gyroscope reads no rotation
    pub fn still() -> Self {
        Self::new(0.0, 0.1)
    }
}

impl EventChecker for Vec3NormChecker {
    fn check(&self, events: &[Event]) -> std::result::Result<(), CheckFailure> {
        for (index, event) in events.iter().enumerate() {
            let Some([x, y, z]) = event.vec3() else {
                return Err(CheckFailure {
                    index,
                    message: "payload has no vector".to_string(),
                });
            };
            let norm = Vector3::new(x, y, z).norm();
            if (norm - self.expected).abs() > self.tolerance {
                return Err(CheckFailure {
                    index,
                    message: format!(
                        "norm {norm:.4} outside {:.4} +/- {:.4}",
                        self.expected, self.tolerance
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventPayload, SensorStatus, SensorType, Vec3};

    fn vec3_event(x: f32, y: f32, z: f32) -> Event {
        Event {
            sensor_handle: 1,
            sensor_type: SensorType::Accelerometer,
            timestamp: 0,
            payload: EventPayload::Vec3(Vec3 {
                x,
                y,
                z,
                status: SensorStatus::AccuracyHigh,
            }),
        }
    }

    #[test]
    fn test_gravity_checker() {
        let checker = Vec3NormChecker::gravity();
        assert!(checker
            .check(&[vec3_event(0.0, 0.0, 9.8), vec3_event(6.0, 0.0, 7.8)])
            .is_ok());

        let failure = checker
            .check(&[vec3_event(0.0, 0.0, 9.8), vec3_event(0.0, 0.0, 12.0)])
            .unwrap_err();
        assert_eq!(failure.index, 1);
    }

    #[test]
    fn test_still_checker_rejects_rotation() {
        let failure = Vec3NormChecker::still()
            .check(&[vec3_event(0.2, 0.0, 0.0)])
            .unwrap_err();
        assert_eq!(failure.index, 0);
        assert!(failure.message.contains("norm"));
    }

    #[test]
    fn test_non_vector_payload_fails() {
        let event = Event {
            payload: EventPayload::Scalar(1.0),
            ..vec3_event(0.0, 0.0, 0.0)
        };
        assert!(Vec3NormChecker::still().check(&[event.clone()]).is_err());
        assert!(NullChecker.check(&[event]).is_ok());
    }
}
