//! Control surface checks: enumeration, operation mode, injection, batch, activate

use contracts::{
    Event, EventPayload, OperationMode, ReportMode, SensorInfo, SensorStatus, SensorType,
    SensorsHal, Status, Vec3,
};
use tracing::{debug, instrument};

use super::{finish, millis, Scenario, Verdict};
use crate::error::{ensure, expect_status, HarnessError, Result};
use crate::sensor_set::{invalid_sensor_handle, is_valid_type};

const INJECTED: [f32; 3] = [1.0, 2.0, 3.0];

impl<'env, H: SensorsHal> Scenario<'env, H> {
    /// Every listed sensor must have a consistent descriptor
    #[instrument(name = "sensor_list_valid", skip(self))]
    pub async fn sensor_list_valid(&self) -> Result<Verdict> {
        let sensors = self.sensors_list().await?;
        let problems: Vec<String> = sensors
            .iter()
            .flat_map(|sensor| {
                descriptor_problems(sensor)
                    .into_iter()
                    .map(move |problem| format!("{} (handle={}): {problem}", sensor.name, sensor.handle))
            })
            .collect();
        ensure(problems.is_empty(), || problems.join("; "))?;
        Ok(Verdict::Passed)
    }

    /// Normal -> data injection -> normal, when any sensor accepts injection
    #[instrument(name = "set_operation_mode", skip(self))]
    pub async fn set_operation_mode(&self) -> Result<Verdict> {
        let sensors = self.sensors_list().await?;
        if !sensors.iter().any(|s| s.flags.supports_data_injection()) {
            return Ok(Verdict::skipped("no sensor supports data injection"));
        }
        for mode in [
            OperationMode::Normal,
            OperationMode::DataInjection,
            OperationMode::Normal,
        ] {
            let status = self.hal().set_operation_mode(mode).await?;
            ensure(status == Status::Ok, || {
                format!("set_operation_mode({mode:?}) returned {status:?}")
            })?;
        }
        Ok(Verdict::Passed)
    }

    /// Injected motion events are echoed back unchanged
    #[instrument(name = "inject_sensor_event_data", skip(self))]
    pub async fn inject_sensor_event_data(&self) -> Result<Verdict> {
        let sensors: Vec<SensorInfo> = self
            .sensors_list()
            .await?
            .into_iter()
            .filter(|s| {
                s.flags.supports_data_injection()
                    && matches!(
                        s.sensor_type,
                        SensorType::Accelerometer | SensorType::Gyroscope | SensorType::MagneticField
                    )
            })
            .collect();
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no injectable motion sensors"));
        }

        let status = self.hal().set_operation_mode(OperationMode::DataInjection).await?;
        ensure(status == Status::Ok, || {
            format!("set_operation_mode(DataInjection) returned {status:?}")
        })?;

        let (sender, mut sink) = event_sink::channel();
        let mut guard = self.guard();
        guard.attach(sender);

        let outcome = async {
            tokio::time::sleep(millis(100)).await;
            let timestamp = self.env.elapsed_ns();
            for sensor in &sensors {
                let status = self
                    .hal()
                    .inject_sensor_data(injected_event(sensor, timestamp))
                    .await?;
                expect_status("inject_sensor_data", sensor.handle, Status::Ok, status)?;
            }

            sink.wait_for_events(&sensors, millis(self.config.timeouts.flush_wait_ms))
                .await;
            for sensor in &sensors {
                let events = sink.events(sensor.handle);
                ensure(events.len() == 1, || {
                    format!("{} echoed {} events, expected 1", sensor.name, events.len())
                })?;
                let event = &events[0];
                ensure(
                    event.sensor_type == sensor.sensor_type
                        && event.timestamp == timestamp
                        && event.vec3() == Some(INJECTED),
                    || format!("{} echoed a different event: {event:?}", sensor.name),
                )?;
            }
            Ok::<_, HarnessError>(())
        }
        .await;
        let outcome = finish(guard, outcome).await;

        let status = self.hal().set_operation_mode(OperationMode::Normal).await?;
        outcome?;
        ensure(status == Status::Ok, || {
            format!("set_operation_mode(Normal) returned {status:?}")
        })?;
        Ok(Verdict::Passed)
    }

    /// batch succeeds on inactive and active sensors, fails on unknown handles
    #[instrument(name = "batch", skip(self))]
    pub async fn batch(&self) -> Result<Verdict> {
        let sensors = self.sensors_list().await?;
        let Some(first) = sensors.first() else {
            return Ok(Verdict::skipped("no sensors"));
        };

        let mut guard = self.guard();
        let outcome = async {
            self.activate_all_sensors(&mut guard, &sensors, false).await?;
            for sensor in &sensors {
                // one-shot sensors advertise min_delay -1
                let period = if sensor.is_one_shot() {
                    0
                } else {
                    sensor.min_sampling_period_ns()
                };
                let status = self.hal().batch(sensor.handle, period, 0).await?;
                expect_status("batch", sensor.handle, Status::Ok, status)?;

                guard.activate(sensor.handle, true).await?;
                let status = self
                    .hal()
                    .batch(sensor.handle, sensor.max_sampling_period_ns(), 0)
                    .await?;
                expect_status("batch", sensor.handle, Status::Ok, status)?;
            }
            self.activate_all_sensors(&mut guard, &sensors, false).await?;

            let Some(invalid) = invalid_sensor_handle(&sensors) else {
                debug!("no unused sensor handle, invalid batch not checked");
                return Ok(());
            };
            let status = self
                .hal()
                .batch(invalid, first.min_sampling_period_ns(), 0)
                .await?;
            expect_status("batch", invalid, Status::BadValue, status)
        }
        .await;
        finish(guard, outcome).await?;
        Ok(Verdict::Passed)
    }

    /// Activation is idempotent; unknown handles are refused
    #[instrument(name = "activate", skip(self))]
    pub async fn activate(&self) -> Result<Verdict> {
        let sensors = self.sensors_list().await?;
        if sensors.is_empty() {
            return Ok(Verdict::skipped("no sensors"));
        }

        let mut guard = self.guard();
        let outcome = async {
            for sensor in &sensors {
                self.hal()
                    .batch(sensor.handle, sensor.min_sampling_period_ns(), 0)
                    .await?;
                for enabled in [true, true, false, false] {
                    let status = guard.activate(sensor.handle, enabled).await?;
                    expect_status("activate", sensor.handle, Status::Ok, status)?;
                }
                debug!(handle = sensor.handle, "activation idempotent");
            }

            if let Some(invalid) = invalid_sensor_handle(&sensors) {
                for enabled in [true, false] {
                    let status = guard.activate(invalid, enabled).await?;
                    expect_status("activate", invalid, Status::BadValue, status)?;
                }
            }
            Ok::<_, HarnessError>(())
        }
        .await;
        finish(guard, outcome).await?;
        Ok(Verdict::Passed)
    }
}

fn injected_event(sensor: &SensorInfo, timestamp: i64) -> Event {
    let [x, y, z] = INJECTED;
    Event {
        sensor_handle: sensor.handle,
        sensor_type: sensor.sensor_type,
        timestamp,
        payload: EventPayload::Vec3(Vec3 {
            x,
            y,
            z,
            status: SensorStatus::AccuracyHigh,
        }),
    }
}

/// Descriptor inconsistencies of one sensor
fn descriptor_problems(sensor: &SensorInfo) -> Vec<String> {
    let mut problems = Vec::new();
    let sensor_type = sensor.sensor_type;
    let mode = sensor.report_mode();

    if !is_valid_type(sensor_type) {
        problems.push(format!("info type {sensor_type} listed as a sensor"));
    }
    match sensor_type.string_type() {
        Some(expected) if sensor.type_as_string != expected => problems.push(format!(
            "string type {:?}, expected {expected:?}",
            sensor.type_as_string
        )),
        None if sensor.type_as_string.is_empty() => problems.push("empty string type".into()),
        _ => {}
    }
    if sensor.name.is_empty() {
        problems.push("empty name".into());
    }
    if sensor.vendor.is_empty() {
        problems.push("empty vendor".into());
    }
    if sensor.power < 0.0 {
        problems.push(format!("negative power {}", sensor.power));
    }
    if sensor.max_range <= 0.0 {
        problems.push(format!("max range {} not positive", sensor.max_range));
    }
    if sensor.fifo_max_event_count < sensor.fifo_reserved_event_count {
        problems.push(format!(
            "fifo max {} below reserved {}",
            sensor.fifo_max_event_count, sensor.fifo_reserved_event_count
        ));
    }
    if let Some(expected) = sensor_type.expected_report_mode() {
        if expected != mode {
            problems.push(format!("report mode {mode:?}, expected {expected:?}"));
        }
    }
    if sensor.min_delay_us > sensor.max_delay_us {
        problems.push(format!(
            "min delay {} above max delay {}",
            sensor.min_delay_us, sensor.max_delay_us
        ));
    }

    let (min, max) = (sensor.min_delay_us, sensor.max_delay_us);
    let delays_ok = match mode {
        ReportMode::Continuous => min > 0 && max >= 0,
        ReportMode::OnChange => min >= 0 && max >= 0,
        ReportMode::OneShot => min == -1 && max == 0,
        ReportMode::Special => true,
    };
    if !delays_ok {
        problems.push(format!("delays ({min}, {max}) invalid for {mode:?} mode"));
    }
    problems
}
