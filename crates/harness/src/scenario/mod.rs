//! Test scenario engine
//!
//! Every procedure follows configure, act, wait, assert, cleanup. Resources
//! go through a `ResourceGuard` that is released on every exit path; the
//! procedure's own error wins over a release error.

mod basic;
mod batching;
mod direct_report;
mod flush;
mod hot_switch;
mod lifecycle;
mod streaming;

use std::time::Duration;

use contracts::{HarnessConfig, SensorHandle, SensorInfo, SensorsHal, Status};

use crate::environment::Environment;
use crate::error::{expect_status, Result};
use crate::guard::ResourceGuard;

/// Non-failing outcome of a procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Nothing to test on this HAL
    Skipped(String),
}

impl Verdict {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}

/// Scenario context: the environment under test plus timing configuration
pub struct Scenario<'env, H> {
    env: &'env Environment<H>,
    config: &'env HarnessConfig,
}

impl<'env, H: SensorsHal> Scenario<'env, H> {
    pub fn new(env: &'env Environment<H>, config: &'env HarnessConfig) -> Self {
        Self { env, config }
    }

    pub fn env(&self) -> &'env Environment<H> {
        self.env
    }

    pub fn config(&self) -> &'env HarnessConfig {
        self.config
    }

    fn hal(&self) -> &'env H {
        self.env.hal()
    }

    async fn sensors_list(&self) -> Result<Vec<SensorInfo>> {
        self.env.sensors_list().await
    }

    fn guard(&self) -> ResourceGuard<'env, H> {
        ResourceGuard::new(self.env)
    }

    /// batch then activate, both required to succeed
    async fn start_sensor(
        &self,
        guard: &mut ResourceGuard<'env, H>,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
    ) -> Result<()> {
        let status = self
            .hal()
            .batch(handle, sampling_period_ns, max_report_latency_ns)
            .await?;
        expect_status("batch", handle, Status::Ok, status)?;
        let status = guard.activate(handle, true).await?;
        expect_status("activate", handle, Status::Ok, status)
    }

    /// Configure every listed sensor at its fastest rate and switch it on or off
    ///
    /// Statuses are not checked; sensors that refuse simply produce nothing.
    async fn activate_all_sensors(
        &self,
        guard: &mut ResourceGuard<'env, H>,
        sensors: &[SensorInfo],
        enabled: bool,
    ) -> Result<()> {
        for sensor in sensors.iter().filter(|s| s.sensor_type.is_valid()) {
            self.hal()
                .batch(sensor.handle, sensor.min_sampling_period_ns(), 0)
                .await?;
            guard.activate(sensor.handle, enabled).await?;
        }
        Ok(())
    }
}

/// Release `guard`, preferring the procedure's error over a release error
async fn finish<H: SensorsHal, T>(guard: ResourceGuard<'_, H>, outcome: Result<T>) -> Result<T> {
    let released = guard.release().await;
    let value = outcome?;
    released?;
    Ok(value)
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// `5 * max min_delay` style margins
fn delay_margin(min_delay_us: i64, factor: u32) -> Duration {
    Duration::from_micros(u64::try_from(min_delay_us).unwrap_or(0)) * factor
}
