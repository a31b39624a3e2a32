use std::time::Duration;

use contracts::{SensorType, SensorsHal, Status};
use tracing::{info, instrument};

use super::{finish, millis, Scenario, Verdict};
use crate::environment::CollectOptions;
use crate::error::{ensure, expect_status, HarnessError, Result};
use crate::sensor_set::default_sensor_by_type;

const KEEP_COLLECTING: CollectOptions = CollectOptions {
    clear_before_start: false,
    change_collection: false,
};

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Batch at the fastest rate with unbounded latency and check the FIFO delivers
    ///
    /// After one batching period of accumulation a flush must hand over at
    /// least the configured fraction of the reserved FIFO.
    #[instrument(name = "batching", skip(self))]
    pub async fn batching(&self, sensor_type: SensorType) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(sensor) = default_sensor_by_type(&list, sensor_type) else {
            return Ok(Verdict::skipped(format!("no {sensor_type} sensor")));
        };

        let config = &self.config.batching;
        let min_period_ns = sensor.min_sampling_period_ns();
        let fifo_reserved = sensor.fifo_reserved_event_count;
        let batching_ns = i64::from(fifo_reserved) * min_period_ns;
        let min_batching_ns = i64::try_from(millis(config.min_batching_period_ms).as_nanos())
            .unwrap_or(i64::MAX);
        if batching_ns < min_batching_ns {
            return Ok(Verdict::skipped(format!(
                "batching period of {} ms too short to test",
                batching_ns / 1_000_000
            )));
        }

        let batching = Duration::from_nanos(batching_ns as u64)
            .min(millis(config.max_batching_period_ms));
        let deliver_window = Duration::from_secs(1).max(batching / 10);
        info!(batching_ms = batching.as_millis() as u64, "testing batching");

        let mut guard = self.guard();
        let outcome = async {
            self.start_sensor(&mut guard, sensor.handle, min_period_ns, i64::MAX)
                .await?;
            tokio::time::sleep(millis(self.config.timeouts.settle_ms)).await;
            let status = self.hal().flush(sensor.handle).await?;
            expect_status("flush", sensor.handle, Status::Ok, status)?;

            // whatever arrives now goes down the drain
            tokio::time::sleep(batching * 8 / 10).await;
            self.env.set_collection(true);
            self.env.clear_collected();

            tokio::time::sleep(batching * 8 / 10).await;
            let status = self.hal().flush(sensor.handle).await?;
            expect_status("flush", sensor.handle, Status::Ok, status)?;

            let events = self
                .env
                .collect_events_with(deliver_window, fifo_reserved as usize, KEEP_COLLECTING)
                .await;
            self.env.set_collection(false);

            let status = guard.activate(sensor.handle, false).await?;
            expect_status("activate", sensor.handle, Status::Ok, status)?;
            Ok::<_, HarnessError>(events)
        }
        .await;
        let events = finish(guard, outcome).await;
        self.env.set_collection(false);
        let events = events?;

        let delivered = events
            .iter()
            .filter(|e| e.sensor_type == sensor_type && e.sensor_handle == sensor.handle)
            .count();
        let required = f64::from(fifo_reserved) * config.fifo_fraction;
        ensure(delivered as f64 > required, || {
            format!("batch delivered {delivered} events, expected more than {required:.0}")
        })?;
        Ok(Verdict::Passed)
    }
}
