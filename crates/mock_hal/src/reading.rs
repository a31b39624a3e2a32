//! Simulated readings
//!
//! Values sit around what a device lying still on a table would report.

use contracts::{EventPayload, SensorStatus, SensorType, Vec3};
use rand::Rng;

/// Standard gravity (m/s^2)
pub const GRAVITY_EARTH: f32 = 9.806_65;

const ACCEL_NOISE: f32 = 0.05;
const GYRO_NOISE: f32 = 0.01;
const MAG_NOISE: f32 = 0.5;

/// Geomagnetic field vector (uT)
const MAG_FIELD: [f32; 3] = [22.0, -5.0, -40.0];

fn noisy_vec3<R: Rng>(rng: &mut R, base: [f32; 3], noise: f32) -> Vec3 {
    let mut jitter = || rng.random_range(-noise..=noise);
    Vec3 {
        x: base[0] + jitter(),
        y: base[1] + jitter(),
        z: base[2] + jitter(),
        status: SensorStatus::AccuracyHigh,
    }
}

/// Reading number `seq` for a sensor of `sensor_type`
pub fn sample<R: Rng>(sensor_type: SensorType, seq: u64, rng: &mut R) -> EventPayload {
    match sensor_type {
        SensorType::Accelerometer | SensorType::AccelerometerUncalibrated | SensorType::Gravity => {
            EventPayload::Vec3(noisy_vec3(rng, [0.0, 0.0, GRAVITY_EARTH], ACCEL_NOISE))
        }
        SensorType::Gyroscope | SensorType::GyroscopeUncalibrated | SensorType::LinearAcceleration => {
            EventPayload::Vec3(noisy_vec3(rng, [0.0; 3], GYRO_NOISE))
        }
        SensorType::MagneticField | SensorType::MagneticFieldUncalibrated => {
            EventPayload::Vec3(noisy_vec3(rng, MAG_FIELD, MAG_NOISE))
        }
        SensorType::Orientation => EventPayload::Vec3(noisy_vec3(rng, [0.0; 3], 0.1)),
        SensorType::Light => EventPayload::Scalar(300.0 + rng.random_range(-5.0..=5.0)),
        SensorType::Pressure => EventPayload::Scalar(1013.25 + rng.random_range(-0.1..=0.1)),
        SensorType::Proximity => EventPayload::Scalar(5.0),
        SensorType::StepCounter => EventPayload::StepCount(seq),
        _ => EventPayload::Scalar(1.0),
    }
}

/// Flatten a payload into the 16 data words of a direct report record
pub fn to_data_words(payload: &EventPayload) -> [f32; 16] {
    let mut words = [0f32; 16];
    match payload {
        EventPayload::Vec3(v) => words[..3].copy_from_slice(&[v.x, v.y, v.z]),
        EventPayload::Scalar(value) => words[0] = *value,
        EventPayload::StepCount(count) => words[0] = *count as f32,
        EventPayload::Data(data) => words = *data,
        EventPayload::Meta(_) => {}
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerometer_sees_gravity() {
        let mut rng = rand::rng();
        for seq in 0..100 {
            let EventPayload::Vec3(v) = sample(SensorType::Accelerometer, seq, &mut rng) else {
                panic!("accelerometer must produce a vector");
            };
            let norm = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
            assert!((norm - GRAVITY_EARTH).abs() < 0.2, "norm {norm}");
        }
    }

    #[test]
    fn test_step_counter_is_monotonic() {
        let mut rng = rand::rng();
        assert_eq!(sample(SensorType::StepCounter, 7, &mut rng), EventPayload::StepCount(7));
    }

    #[test]
    fn test_data_words_from_vec3() {
        let payload = EventPayload::Vec3(Vec3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            status: SensorStatus::AccuracyHigh,
        });
        assert_eq!(&to_data_words(&payload)[..4], &[1.0, 2.0, 3.0, 0.0]);
    }
}
