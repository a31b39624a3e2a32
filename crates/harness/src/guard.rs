//! Scoped cleanup for scenario resources
//!
//! Sensors activated and channels registered through the guard are
//! released by `release`, whatever the scenario outcome. Entries are added
//! on success and never removed; deactivation and unregistration are
//! idempotent so releasing twice is harmless.

use std::collections::BTreeSet;

use contracts::{ChannelHandle, RateLevel, SensorHandle, SensorsHal, SharedMemInfo, Status};
use event_sink::EventSender;
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::Result;

pub struct ResourceGuard<'env, H: SensorsHal> {
    env: &'env Environment<H>,
    sensors: BTreeSet<SensorHandle>,
    channels: BTreeSet<ChannelHandle>,
    callback: bool,
    released: bool,
}

impl<'env, H: SensorsHal> ResourceGuard<'env, H> {
    pub fn new(env: &'env Environment<H>) -> Self {
        Self {
            env,
            sensors: BTreeSet::new(),
            channels: BTreeSet::new(),
            callback: false,
            released: false,
        }
    }

    /// Route deliveries to `sender` until release
    pub fn attach(&mut self, sender: EventSender) {
        self.env.register_callback(sender);
        self.callback = true;
    }

    pub async fn activate(&mut self, handle: SensorHandle, enabled: bool) -> Result<Status> {
        let status = self.env.hal().activate(handle, enabled).await?;
        if enabled && status.is_ok() {
            self.sensors.insert(handle);
        }
        Ok(status)
    }

    pub async fn register_direct_channel(
        &mut self,
        mem: &SharedMemInfo,
    ) -> Result<(Status, ChannelHandle)> {
        let (status, channel) = self.env.hal().register_direct_channel(mem).await?;
        if status.is_ok() {
            self.channels.insert(channel);
        }
        Ok((status, channel))
    }

    /// Deactivate every sensor, stop and unregister every channel, detach the sink
    ///
    /// Keeps going after a failed call and returns the first error.
    pub async fn release(mut self) -> Result<()> {
        let env = self.env;
        let hal = env.hal();
        let mut first_error = None;

        for handle in std::mem::take(&mut self.sensors) {
            if let Err(err) = hal.activate(handle, false).await {
                warn!(handle, error = %err, "deactivate during release failed");
                first_error.get_or_insert(err);
            }
        }
        for channel in std::mem::take(&mut self.channels) {
            let stopped = hal.config_direct_report(-1, channel, RateLevel::Stop).await;
            let unregistered = hal.unregister_direct_channel(channel).await;
            for err in [stopped.err(), unregistered.err()].into_iter().flatten() {
                warn!(channel, error = %err, "channel release failed");
                first_error.get_or_insert(err);
            }
        }
        if self.callback {
            env.unregister_callback();
            self.callback = false;
        }

        self.released = true;
        debug!("scenario resources released");
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

impl<H: SensorsHal> Drop for ResourceGuard<'_, H> {
    fn drop(&mut self) {
        if self.callback {
            self.env.unregister_callback();
        }
        if !self.released && (!self.sensors.is_empty() || !self.channels.is_empty()) {
            warn!(
                sensors = ?self.sensors,
                channels = ?self.channels,
                "resource guard dropped without release"
            );
        }
    }
}
