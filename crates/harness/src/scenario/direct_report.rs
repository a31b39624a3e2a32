use std::time::Duration;

use contracts::{
    parse_direct_report_events, RateLevel, SensorType, SensorsHal, SharedMemInfo, SharedMemType,
    Status,
};
use tracing::{info, instrument};

use super::{finish, millis, Scenario, Verdict};
use crate::checker::{check_events, EventChecker};
use crate::error::{ensure, expect_status, HarnessError, Result};
use crate::sensor_set::{
    default_sensor_by_type, is_direct_channel_type_supported, is_direct_report_rate_supported,
};

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Report through a shared memory channel at `rate` and validate the records
    #[instrument(name = "direct_report", skip(self, checker))]
    pub async fn direct_report(
        &self,
        sensor_type: SensorType,
        mem_type: SharedMemType,
        rate: RateLevel,
        checker: &dyn EventChecker,
    ) -> Result<Verdict> {
        let list = self.sensors_list().await?;
        let Some(sensor) = default_sensor_by_type(&list, sensor_type) else {
            return Ok(Verdict::skipped(format!("no {sensor_type} sensor")));
        };
        if !is_direct_report_rate_supported(&sensor, rate) {
            return Ok(Verdict::skipped(format!("{rate:?} direct report not supported")));
        }
        if !is_direct_channel_type_supported(&sensor, mem_type) {
            return Ok(Verdict::skipped(format!("{mem_type:?} channel not supported")));
        }

        let config = &self.config.direct_report;
        let nominal_window = millis(config.nominal_test_time_ms);
        let max_window = nominal_window + millis(config.init_margin_ms);

        // a wrapped region cannot be parsed back in order
        let records = config.region_records.max(config.required_region_records());
        let mem = SharedMemInfo::with_capacity(mem_type, records);
        mem.region.fill(0xcc);

        let mut guard = self.guard();
        let outcome = async {
            let (status, channel) = guard.register_direct_channel(&mem).await?;
            expect_status("register_direct_channel", sensor.handle, Status::Ok, status)?;
            ensure(mem.region.is_zeroed(), || {
                "shared memory not zeroed on registration".into()
            })?;

            let (status, token) = self
                .hal()
                .config_direct_report(sensor.handle, channel, rate)
                .await?;
            expect_status("config_direct_report", sensor.handle, Status::Ok, status)?;

            tokio::time::sleep(max_window).await;
            let events = parse_direct_report_events(&mem.region.snapshot(), -1, 0)?;

            let (status, _) = self
                .hal()
                .config_direct_report(sensor.handle, channel, RateLevel::Stop)
                .await?;
            expect_status("config_direct_report", sensor.handle, Status::Ok, status)?;
            let status = self.hal().unregister_direct_channel(channel).await?;
            expect_status("unregister_direct_channel", sensor.handle, Status::Ok, status)?;
            Ok::<_, HarnessError>((token, events))
        }
        .await;
        let (token, events) = finish(guard, outcome).await?;

        let nominal_hz = rate.nominal_hz();
        let lower = nominal_hz * config.min_rate_fraction * secs(nominal_window);
        let upper = nominal_hz * config.max_rate_fraction * secs(max_window);
        info!(records = events.len(), token, lower, upper, "direct report parsed");
        ensure((events.len() as f64) > lower && (events.len() as f64) < upper, || {
            format!(
                "{} records at {rate:?}, expected between {lower:.0} and {upper:.0}",
                events.len()
            )
        })?;

        let mut last_timestamp = 0;
        for event in &events {
            ensure(event.sensor_handle == token, || {
                format!("record token {}, expected {token}", event.sensor_handle)
            })?;
            ensure(event.sensor_type == sensor_type, || {
                format!("record type {}, expected {sensor_type}", event.sensor_type)
            })?;
            ensure(event.timestamp > last_timestamp, || {
                format!(
                    "timestamp {} does not advance past {last_timestamp}",
                    event.timestamp
                )
            })?;
            last_timestamp = event.timestamp;
        }

        check_events(checker, &sensor, &events)?;
        Ok(Verdict::Passed)
    }
}

fn secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}
