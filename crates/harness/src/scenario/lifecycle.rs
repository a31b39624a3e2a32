use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{SensorHandle, SensorsHal};
use tracing::{debug, instrument};

use super::{delay_margin, finish, millis, Scenario, Verdict};
use crate::error::{ensure, HarnessError, Result};
use crate::sensor_set::{continuous_sensors, max_min_delay_us};

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Reactivated sensors must not redeliver samples queued before deactivation
    #[instrument(name = "no_stale_events", skip(self))]
    pub async fn no_stale_events(&self) -> Result<Verdict> {
        let all = self.sensors_list().await?;
        let sensors = continuous_sensors(&all);
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no continuous sensors"));
        }
        let max_min_delay = max_min_delay_us(&sensors);
        let base_wait = millis(self.config.timeouts.event_wait_base_ms);
        let event_wait = base_wait + delay_margin(max_min_delay, 5);
        let gap = millis(self.config.timeouts.stale_gap_ms) + delay_margin(max_min_delay, 5);

        let (sender, mut sink) = event_sink::channel();
        let mut guard = self.guard();
        guard.attach(sender);

        let outcome = async {
            self.activate_all_sensors(&mut guard, &all, true).await?;
            sink.wait_for_events(&sensors, event_wait).await;
            self.activate_all_sensors(&mut guard, &all, false).await?;

            let mut last_timestamps: BTreeMap<SensorHandle, i64> = BTreeMap::new();
            for sensor in &sensors {
                let last = sink.events(sensor.handle).last().map(|e| e.timestamp);
                let Some(last) = last else {
                    return Err(HarnessError::assertion(format!(
                        "no events from {} (handle={}) before deactivation",
                        sensor.name, sensor.handle
                    )));
                };
                last_timestamps.insert(sensor.handle, last);
            }

            tokio::time::sleep(gap).await;
            sink.reset();
            self.activate_all_sensors(&mut guard, &all, true).await?;
            sink.wait_for_events(&sensors, event_wait).await;
            self.activate_all_sensors(&mut guard, &all, false).await?;

            for sensor in &sensors {
                let first = sink.events(sensor.handle).first().map(|e| e.timestamp);
                let Some(first) = first else {
                    return Err(HarnessError::assertion(format!(
                        "no events from {} (handle={}) after reactivation",
                        sensor.name, sensor.handle
                    )));
                };
                let last = last_timestamps[&sensor.handle];
                let delta = Duration::from_nanos(u64::try_from(first - last).unwrap_or(0));
                let required = base_wait + delay_margin(i64::from(sensor.min_delay_us), 3);
                debug!(handle = sensor.handle, ?delta, ?required, "reactivation gap");
                ensure(first > last && delta >= required, || {
                    format!(
                        "stale event from {} (handle={}): first new timestamp {first} vs last old {last}",
                        sensor.name, sensor.handle
                    )
                })?;
            }
            Ok::<_, HarnessError>(())
        }
        .await;
        finish(guard, outcome).await?;
        Ok(Verdict::Passed)
    }

    /// A second `initialize` rebinds delivery exclusively to the new client
    ///
    /// The original environment is torn down and set up again afterwards and
    /// must receive events once more.
    #[instrument(name = "call_initialize_twice", skip(self))]
    pub async fn call_initialize_twice(&self) -> Result<Verdict> {
        let sensors = self.sensors_list().await?;
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no sensors"));
        }
        let window = millis(self.config.timeouts.rebind_collection_ms);

        let second = self.env.sibling();
        second.setup().await?;

        let mut guard = self.guard();
        let outcome = async {
            self.activate_all_sensors(&mut guard, &sensors, true).await?;
            let stale = self.env.collect_events(window, 1).await;
            let fresh = second.collect_events(window, 1).await;
            self.activate_all_sensors(&mut guard, &sensors, false).await?;

            ensure(stale.is_empty(), || {
                format!("original environment received {} events after rebind", stale.len())
            })?;
            ensure(!fresh.is_empty(), || "new environment received no events".into())?;
            Ok::<_, HarnessError>(())
        }
        .await;
        let first = finish(guard, outcome).await;
        second.teardown();

        // restore the original binding for the cases that follow
        self.env.teardown();
        self.env.setup().await?;
        first?;

        let mut guard = self.guard();
        let outcome = async {
            self.activate_all_sensors(&mut guard, &sensors, true).await?;
            let events = self.env.collect_events(window, 1).await;
            self.activate_all_sensors(&mut guard, &sensors, false).await?;
            ensure(!events.is_empty(), || {
                "original environment received no events after restore".into()
            })
        }
        .await;
        finish(guard, outcome).await?;
        Ok(Verdict::Passed)
    }
}
