//! MockSensorsHal - simulated sensors HAL
//!
//! Implements `SensorsHal` over a configurable sensor profile. Supports
//! injecting failure scenarios for exercising the harness itself.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ChannelHandle, ContractError, Event, EventCallback, HalResult, OperationMode, RateLevel,
    SensorHandle, SensorInfo, SensorsHal, SharedMemFormat, SharedMemInfo, SimulatedHalConfig,
    SimulatedSensorConfig, Status, EVENT_RECORD_SIZE,
};
use slab::Slab;
use tracing::{debug, instrument, warn};

use crate::clock::Clock;
use crate::direct::DirectChannel;
use crate::sensor::{Delivery, SensorSlot};

/// Failure scenarios
#[derive(Debug, Default, Clone)]
pub struct MockFaults {
    /// Every control call fails with a transport error
    pub unresponsive: bool,
    /// Flush requests succeed but never acknowledge
    pub drop_flush_complete: bool,
    /// `initialize` keeps delivering to the first bound callback
    pub keep_previous_callback: bool,
    /// Re-enabling a sensor first delivers the last sample taken before it was disabled
    pub redeliver_last_on_activate: bool,
    /// Re-enabling a sensor returns Ok but it never reports again
    pub silent_reactivation: bool,
}

struct HalState {
    delivery: Arc<Delivery>,
    sensors: BTreeMap<SensorHandle, Arc<SensorSlot>>,
    mode: Mutex<OperationMode>,
    channels: Mutex<Slab<DirectChannel>>,
    next_token: AtomicI32,
    unresponsive: AtomicBool,
}

/// Simulated sensors HAL
///
/// Cloning yields another handle to the same HAL.
#[derive(Clone)]
pub struct MockSensorsHal {
    state: Arc<HalState>,
}

impl MockSensorsHal {
    /// HAL exposing the sensors of `config`, with handles assigned from 1
    pub fn new(config: &SimulatedHalConfig) -> Self {
        Self::with_sensors(&config.sensors)
    }

    /// HAL with the default profile
    pub fn with_default_profile() -> Self {
        Self::with_sensors(&SimulatedSensorConfig::default_profile())
    }

    pub fn with_sensors(profiles: &[SimulatedSensorConfig]) -> Self {
        let sensors = profiles
            .iter()
            .zip(1..)
            .map(|(profile, handle)| (handle, Arc::new(SensorSlot::new(handle, profile))))
            .collect();

        Self {
            state: Arc::new(HalState {
                delivery: Arc::new(Delivery::new(Clock::new())),
                sensors,
                mode: Mutex::new(OperationMode::Normal),
                channels: Mutex::new(Slab::new()),
                next_token: AtomicI32::new(1),
                unresponsive: AtomicBool::new(false),
            }),
        }
    }

    /// Apply failure scenarios
    pub fn set_faults(&self, faults: &MockFaults) {
        self.state
            .unresponsive
            .store(faults.unresponsive, Ordering::SeqCst);
        let delivery = &self.state.delivery;
        delivery
            .drop_flush_complete
            .store(faults.drop_flush_complete, Ordering::SeqCst);
        delivery
            .keep_previous_callback
            .store(faults.keep_previous_callback, Ordering::SeqCst);
        delivery
            .redeliver_last_on_activate
            .store(faults.redeliver_last_on_activate, Ordering::SeqCst);
        delivery
            .silent_reactivation
            .store(faults.silent_reactivation, Ordering::SeqCst);
    }

    /// Number of enabled sensors
    pub fn active_sensor_count(&self) -> usize {
        self.state
            .sensors
            .values()
            .filter(|slot| slot.lock().active)
            .count()
    }

    /// Number of registered direct channels
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Current HAL clock reading (ns)
    pub fn now_ns(&self) -> i64 {
        self.state.delivery.clock.now_ns()
    }

    fn channels(&self) -> MutexGuard<'_, Slab<DirectChannel>> {
        self.state
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mode(&self) -> MutexGuard<'_, OperationMode> {
        self.state.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, handle: SensorHandle) -> Option<&Arc<SensorSlot>> {
        self.state.sensors.get(&handle)
    }

    fn ensure_responsive(&self, call: &str) -> HalResult<()> {
        if self.state.unresponsive.load(Ordering::SeqCst) {
            Err(ContractError::transport(call, "simulated HAL not responding"))
        } else {
            Ok(())
        }
    }

    fn channel_key(channel: ChannelHandle) -> Option<usize> {
        usize::try_from(channel).ok()?.checked_sub(1)
    }

    fn reset(&self) {
        for slot in self.state.sensors.values() {
            slot.disable();
        }
        self.channels().clear();
        *self.mode() = OperationMode::Normal;
    }
}

impl SensorsHal for MockSensorsHal {
    #[instrument(name = "mock_hal_sensors_list", skip(self))]
    async fn sensors_list(&self) -> HalResult<Vec<SensorInfo>> {
        self.ensure_responsive("sensors_list")?;
        Ok(self
            .state
            .sensors
            .values()
            .map(|slot| slot.info.clone())
            .collect())
    }

    #[instrument(name = "mock_hal_initialize", skip(self, callback))]
    async fn initialize(&self, callback: EventCallback) -> HalResult<Status> {
        self.ensure_responsive("initialize")?;
        // sensors and channels of the previous client do not survive a rebind
        self.reset();
        self.state.delivery.rebind(callback);
        debug!(sensors = self.state.sensors.len(), "callback bound");
        Ok(Status::Ok)
    }

    #[instrument(name = "mock_hal_activate", skip(self))]
    async fn activate(&self, handle: SensorHandle, enabled: bool) -> HalResult<Status> {
        self.ensure_responsive("activate")?;
        let Some(slot) = self.slot(handle) else {
            return Ok(Status::BadValue);
        };
        if enabled {
            slot.enable(&self.state.delivery);
        } else {
            slot.disable();
        }
        Ok(Status::Ok)
    }

    #[instrument(name = "mock_hal_batch", skip(self))]
    async fn batch(
        &self,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
    ) -> HalResult<Status> {
        self.ensure_responsive("batch")?;
        let Some(slot) = self.slot(handle) else {
            return Ok(Status::BadValue);
        };
        if max_report_latency_ns < 0 {
            return Ok(Status::BadValue);
        }
        slot.configure(sampling_period_ns, max_report_latency_ns);
        Ok(Status::Ok)
    }

    #[instrument(name = "mock_hal_flush", skip(self))]
    async fn flush(&self, handle: SensorHandle) -> HalResult<Status> {
        self.ensure_responsive("flush")?;
        let Some(slot) = self.slot(handle) else {
            return Ok(Status::BadValue);
        };
        if slot.info.is_one_shot() || !slot.lock().active {
            return Ok(Status::BadValue);
        }
        slot.flush(&self.state.delivery);
        Ok(Status::Ok)
    }

    #[instrument(
        name = "mock_hal_inject_sensor_data",
        skip(self, event),
        fields(handle = event.sensor_handle)
    )]
    async fn inject_sensor_data(&self, event: Event) -> HalResult<Status> {
        self.ensure_responsive("inject_sensor_data")?;
        if *self.mode() != OperationMode::DataInjection {
            return Ok(Status::BadValue);
        }
        let injectable = self.slot(event.sensor_handle).is_some_and(|slot| {
            slot.info.flags.supports_data_injection() && slot.info.sensor_type == event.sensor_type
        });
        if !injectable {
            return Ok(Status::BadValue);
        }
        self.state.delivery.deliver(event);
        Ok(Status::Ok)
    }

    #[instrument(name = "mock_hal_set_operation_mode", skip(self))]
    async fn set_operation_mode(&self, mode: OperationMode) -> HalResult<Status> {
        self.ensure_responsive("set_operation_mode")?;
        let supported = match mode {
            OperationMode::Normal => true,
            OperationMode::DataInjection => self
                .state
                .sensors
                .values()
                .any(|slot| slot.info.flags.supports_data_injection()),
        };
        if !supported {
            return Ok(Status::BadValue);
        }
        *self.mode() = mode;
        Ok(Status::Ok)
    }

    #[instrument(
        name = "mock_hal_register_direct_channel",
        skip(self, mem),
        fields(mem_type = ?mem.mem_type, size = mem.size)
    )]
    async fn register_direct_channel(
        &self,
        mem: &SharedMemInfo,
    ) -> HalResult<(Status, ChannelHandle)> {
        self.ensure_responsive("register_direct_channel")?;
        if mem.format != SharedMemFormat::SensorsEvent
            || mem.size < EVENT_RECORD_SIZE
            || mem.region.len() < mem.size
        {
            return Ok((Status::BadValue, -1));
        }
        let supported = self
            .state
            .sensors
            .values()
            .any(|slot| slot.info.flags.supports_direct_channel(mem.mem_type));
        if !supported {
            return Ok((Status::InvalidOperation, -1));
        }

        mem.region.fill(0);
        let key = self
            .channels()
            .insert(DirectChannel::new(mem.mem_type, mem.region.clone()));
        let handle = ChannelHandle::try_from(key + 1)
            .map_err(|_| ContractError::Other("channel handle overflow".into()))?;
        debug!(channel = handle, "direct channel registered");
        Ok((Status::Ok, handle))
    }

    #[instrument(name = "mock_hal_unregister_direct_channel", skip(self))]
    async fn unregister_direct_channel(&self, channel: ChannelHandle) -> HalResult<Status> {
        self.ensure_responsive("unregister_direct_channel")?;
        let mut channels = self.channels();
        match Self::channel_key(channel).filter(|key| channels.contains(*key)) {
            Some(key) => {
                // dropping the channel stops its writers
                channels.remove(key);
                Ok(Status::Ok)
            }
            None => Ok(Status::BadValue),
        }
    }

    #[instrument(name = "mock_hal_config_direct_report", skip(self))]
    async fn config_direct_report(
        &self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
    ) -> HalResult<(Status, i32)> {
        self.ensure_responsive("config_direct_report")?;
        let mut channels = self.channels();
        let Some(direct) = Self::channel_key(channel).and_then(|key| channels.get_mut(key)) else {
            return Ok((Status::BadValue, 0));
        };

        // handle -1 addresses every sensor on the channel, stop only
        if handle == -1 {
            if rate != RateLevel::Stop {
                return Ok((Status::BadValue, 0));
            }
            direct.stop_all();
            return Ok((Status::Ok, 0));
        }

        let Some(slot) = self.slot(handle) else {
            return Ok((Status::BadValue, 0));
        };
        let flags = slot.info.flags;
        if !flags.supports_direct_channel(direct.mem_type) || rate > flags.max_direct_report_rate()
        {
            return Ok((Status::BadValue, 0));
        }

        if rate == RateLevel::Stop {
            direct.stop(handle);
            return Ok((Status::Ok, 0));
        }

        let token = self.state.next_token.fetch_add(1, Ordering::SeqCst);
        direct.start(
            self.state.delivery.clock,
            handle,
            slot.info.sensor_type,
            rate,
            token,
        );
        Ok((Status::Ok, token))
    }
}

impl Drop for HalState {
    fn drop(&mut self) {
        let active = self
            .sensors
            .values()
            .filter(|slot| slot.lock().active)
            .count();
        if active > 0 {
            warn!(active, "mock HAL dropped with active sensors");
        }
        for slot in self.sensors.values() {
            slot.disable();
        }
    }
}
