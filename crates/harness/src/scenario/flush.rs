//! Flush family
//!
//! | condition                          | flush status | completions |
//! |------------------------------------|--------------|-------------|
//! | active continuous/on-change sensor | Ok           | 1 per call  |
//! | active one-shot sensor             | BadValue     | 0           |
//! | inactive sensor                    | BadValue     | 0           |
//! | nonexistent handle                 | BadValue     | 0           |

use contracts::{SensorInfo, SensorsHal, Status};
use tracing::{debug, instrument};

use super::{finish, millis, Scenario, Verdict};
use crate::error::{ensure, expect_status, Result};
use crate::guard::ResourceGuard;
use crate::sensor_set::{invalid_sensor_handle, non_one_shot_sensors, one_shot_sensors};

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Flush each sensor `flush_calls` times, then wait once for the whole set
    #[instrument(name = "run_flush_test", skip(self, sensors), fields(sensors = sensors.len()))]
    pub async fn run_flush_test(
        &self,
        sensors: &[SensorInfo],
        activate: bool,
        flush_calls: u32,
        expected_flush_count: u32,
        expected_result: Status,
    ) -> Result<()> {
        let mut guard = self.guard();
        let outcome = self
            .flush_session(
                &mut guard,
                sensors,
                activate,
                flush_calls,
                expected_flush_count,
                expected_result,
            )
            .await;
        finish(guard, outcome).await
    }

    pub async fn run_single_flush_test(
        &self,
        sensors: &[SensorInfo],
        activate: bool,
        expected_flush_count: u32,
        expected_result: Status,
    ) -> Result<()> {
        self.run_flush_test(sensors, activate, 1, expected_flush_count, expected_result)
            .await
    }

    async fn flush_session(
        &self,
        guard: &mut ResourceGuard<'env, H>,
        sensors: &[SensorInfo],
        activate: bool,
        flush_calls: u32,
        expected_flush_count: u32,
        expected_result: Status,
    ) -> Result<()> {
        let (sender, mut sink) = event_sink::channel();
        guard.attach(sender);

        for sensor in sensors {
            // nonexistent handles refuse these; only the flush result matters
            self.hal()
                .batch(sensor.handle, sensor.max_sampling_period_ns(), 0)
                .await?;
            guard.activate(sensor.handle, activate).await?;

            for _ in 0..flush_calls {
                let status = self.hal().flush(sensor.handle).await?;
                expect_status("flush", sensor.handle, expected_result, status)?;
            }
        }

        let timeout = millis(self.config.timeouts.flush_wait_ms);
        let satisfied = sink.wait_for_flush_events(sensors, flush_calls, timeout).await;
        debug!(satisfied, "flush wait finished");

        // deactivate after the wait so pending completions are not abandoned
        for sensor in sensors {
            guard.activate(sensor.handle, false).await?;
        }

        for sensor in sensors {
            let count = sink.flush_count(sensor.handle);
            ensure(count == expected_flush_count, || {
                format!(
                    "sensor {} (handle={}) acknowledged {count} flushes, expected {expected_flush_count}",
                    sensor.name, sensor.handle
                )
            })?;
        }
        Ok(())
    }

    /// Active non-one-shot sensors acknowledge every flush
    pub async fn flush_sensor(&self) -> Result<Verdict> {
        let sensors = non_one_shot_sensors(&self.sensors_list().await?);
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no non-one-shot sensors"));
        }
        self.run_single_flush_test(&sensors, true, 1, Status::Ok).await?;
        self.run_flush_test(&sensors, true, 5, 5, Status::Ok).await?;
        Ok(Verdict::Passed)
    }

    /// One-shot sensors refuse flushes even while active
    pub async fn flush_one_shot_sensor(&self) -> Result<Verdict> {
        let sensors = one_shot_sensors(&self.sensors_list().await?);
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no one-shot sensors"));
        }
        self.run_single_flush_test(&sensors, true, 0, Status::BadValue)
            .await?;
        Ok(Verdict::Passed)
    }

    /// Flushing an inactive sensor is refused
    pub async fn flush_inactive_sensor(&self) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(sensor) = first_flush_candidate(&list) else {
            return Ok(Verdict::skipped("no sensors"));
        };
        self.run_single_flush_test(&[sensor], false, 0, Status::BadValue)
            .await?;
        Ok(Verdict::Passed)
    }

    /// Flushing a handle no sensor uses is refused
    pub async fn flush_nonexistent_sensor(&self) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(mut sensor) = first_flush_candidate(&list) else {
            return Ok(Verdict::skipped("no sensors"));
        };
        let Some(invalid) = invalid_sensor_handle(&list) else {
            return Ok(Verdict::skipped("no unused sensor handle"));
        };
        sensor.handle = invalid;
        self.run_single_flush_test(&[sensor], false, 0, Status::BadValue)
            .await?;
        Ok(Verdict::Passed)
    }
}

/// First non-one-shot sensor, falling back to the first one-shot sensor
fn first_flush_candidate(list: &[SensorInfo]) -> Option<SensorInfo> {
    non_one_shot_sensors(list)
        .into_iter()
        .next()
        .or_else(|| one_shot_sensors(list).into_iter().next())
}
