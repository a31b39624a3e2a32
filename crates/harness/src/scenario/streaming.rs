use std::time::Duration;

use contracts::{SensorType, SensorsHal, Status};
use tracing::{info, instrument};

use super::{finish, Scenario, Verdict};
use crate::checker::{check_events, EventChecker};
use crate::error::{ensure, expect_status, HarnessError, Result};
use crate::sensor_set::default_sensor_by_type;

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Stream the default sensor of `sensor_type` at `sampling_period` for `duration`
    ///
    /// Every collected event must come from that sensor, the payloads must pass
    /// `checker`, and the count must reach the configured fraction of
    /// `duration / sampling_period`.
    #[instrument(name = "streaming", skip(self, checker))]
    pub async fn streaming(
        &self,
        sensor_type: SensorType,
        sampling_period: Duration,
        duration: Duration,
        checker: &dyn EventChecker,
    ) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(sensor) = default_sensor_by_type(&list, sensor_type) else {
            return Ok(Verdict::skipped(format!("no {sensor_type} sensor")));
        };
        let period_ns = i64::try_from(sampling_period.as_nanos()).unwrap_or(i64::MAX);
        if sensor.min_sampling_period_ns() > period_ns {
            return Ok(Verdict::skipped(format!(
                "{sensor_type} cannot sample every {sampling_period:?}"
            )));
        }

        let nominal = (duration.as_nanos() / sampling_period.as_nanos().max(1)) as usize;
        let mut guard = self.guard();
        let outcome = async {
            self.start_sensor(&mut guard, sensor.handle, period_ns, 0).await?;
            let events = self.env.collect_events(duration, nominal).await;
            let status = guard.activate(sensor.handle, false).await?;
            expect_status("activate", sensor.handle, Status::Ok, status)?;
            Ok::<_, HarnessError>(events)
        }
        .await;
        let events = finish(guard, outcome).await?;

        info!(collected = events.len(), nominal, "streaming samples collected");
        ensure(!events.is_empty(), || format!("no events from {}", sensor.name))?;

        for event in &events {
            ensure(event.sensor_type == sensor_type, || {
                format!("unexpected {} event while streaming {sensor_type}", event.sensor_type)
            })?;
            ensure(event.sensor_handle == sensor.handle, || {
                format!(
                    "event carries handle {}, expected {}",
                    event.sensor_handle, sensor.handle
                )
            })?;
        }

        check_events(checker, &sensor, &events)?;

        let required = nominal as f64 * self.config.streaming.min_count_fraction;
        ensure(events.len() as f64 >= required, || {
            format!(
                "{} events from {}, expected at least {required:.0}",
                events.len(),
                sensor.name
            )
        })?;
        Ok(Verdict::Passed)
    }
}
