use contracts::{Event, SensorHandle, SensorType, SensorsHal, Status};
use observability::RunningStats;
use tracing::{info, instrument};

use super::{finish, millis, Scenario, Verdict};
use crate::error::{ensure, expect_status, HarnessError, Result};
use crate::sensor_set::default_sensor_by_type;

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Switch the sampling period of an active sensor between its extremes
    ///
    /// Both windows must produce events, the mean intervals must differ
    /// noticeably and each must be close to the configured period.
    #[instrument(name = "sampling_rate_hot_switch", skip(self))]
    pub async fn sampling_rate_hot_switch(
        &self,
        sensor_type: SensorType,
        fast_to_slow: bool,
    ) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(sensor) = default_sensor_by_type(&list, sensor_type) else {
            return Ok(Verdict::skipped(format!("no {sensor_type} sensor")));
        };
        let min_period = sensor.min_sampling_period_ns();
        let max_period = sensor.max_sampling_period_ns();
        if min_period == max_period {
            return Ok(Verdict::skipped(format!("{sensor_type} supports a single rate")));
        }
        let (first, second) = if fast_to_slow {
            (min_period, max_period)
        } else {
            (max_period, min_period)
        };

        let settle = millis(self.config.timeouts.settle_ms);
        let timeout = millis(self.config.hot_switch.collection_timeout_ms);
        let min_events = self.config.hot_switch.min_events;

        let mut guard = self.guard();
        let outcome = async {
            self.start_sensor(&mut guard, sensor.handle, first, 0).await?;
            tokio::time::sleep(settle).await;
            let first_events = self.env.collect_events(timeout, min_events).await;

            // no deactivation in between
            let status = self.hal().batch(sensor.handle, second, 0).await?;
            expect_status("batch", sensor.handle, Status::Ok, status)?;
            tokio::time::sleep(settle).await;
            let second_events = self.env.collect_events(timeout, min_events).await;

            let status = guard.activate(sensor.handle, false).await?;
            expect_status("activate", sensor.handle, Status::Ok, status)?;
            Ok::<_, HarnessError>((first_events, second_events))
        }
        .await;
        let (first_events, second_events) = finish(guard, outcome).await?;

        ensure(!first_events.is_empty(), || "first window collected nothing".into())?;
        ensure(!second_events.is_empty(), || "second window collected nothing".into())?;

        let (fast_events, slow_events) = if fast_to_slow {
            (&first_events, &second_events)
        } else {
            (&second_events, &first_events)
        };
        let fast_mean = mean_interval_ns(fast_events, sensor_type, sensor.handle)?;
        let slow_mean = mean_interval_ns(slow_events, sensor_type, sensor.handle)?;
        info!(fast_mean, slow_mean, "mean sampling intervals");
        observability::record_mean_interval_ns(&sensor_type.name(), fast_mean);

        let tolerance = self.config.hot_switch.interval_tolerance;
        ensure(slow_mean - fast_mean > fast_mean / 10.0, || {
            format!("rate change not observed: {fast_mean:.0} ns -> {slow_mean:.0} ns")
        })?;
        for (mean, period) in [(fast_mean, min_period), (slow_mean, max_period)] {
            let period = period as f64;
            ensure((mean - period).abs() < period * tolerance, || {
                format!("mean interval {mean:.0} ns too far from {period:.0} ns")
            })?;
        }
        Ok(Verdict::Passed)
    }
}

/// Mean timestamp interval of the events of one sensor
fn mean_interval_ns(events: &[Event], sensor_type: SensorType, handle: SensorHandle) -> Result<f64> {
    let mut previous: Option<i64> = None;
    let mut intervals = RunningStats::default();
    let mut count = 0usize;

    for event in events.iter().filter(|e| e.sensor_type == sensor_type) {
        ensure(event.sensor_handle == handle, || {
            format!("event carries handle {}, expected {handle}", event.sensor_handle)
        })?;
        if let Some(previous) = previous {
            intervals.push((event.timestamp - previous) as f64);
        }
        previous = Some(event.timestamp);
        count += 1;
    }

    ensure(count > 2, || format!("only {count} events in window"))?;
    Ok(intervals.mean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventPayload, Vec3};

    fn at(timestamp: i64) -> Event {
        Event {
            sensor_handle: 2,
            sensor_type: SensorType::Gyroscope,
            timestamp,
            payload: EventPayload::Vec3(Vec3::default()),
        }
    }

    #[test]
    fn test_mean_interval() {
        let events = [at(100), at(300), at(500), at(700)];
        let mean = mean_interval_ns(&events, SensorType::Gyroscope, 2).unwrap();
        assert!((mean - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_interval_needs_three_events() {
        assert!(mean_interval_ns(&[at(1), at(2)], SensorType::Gyroscope, 2).is_err());
        assert!(mean_interval_ns(&[at(1), at(2), at(3)], SensorType::Gyroscope, 9).is_err());
    }
}
