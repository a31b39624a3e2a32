//! SensorsHal trait - the interface under test
//!
//! Abstracts the sensors HAL control surface. The harness only calls it;
//! implementations deliver events asynchronously through the callback passed
//! to `initialize`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ChannelHandle, Event, HalResult, SensorHandle, SensorInfo, SharedMemInfo};

/// Event delivery callback
///
/// Called from HAL threads for every event, including flush-complete markers.
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

/// HAL result code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    BadValue,
    PermissionDenied,
    InvalidOperation,
    NoMemory,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Global HAL operation mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    Normal,
    DataInjection,
}

/// Direct report rate level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLevel {
    #[default]
    Stop = 0,
    Normal = 1,
    Fast = 2,
    VeryFast = 3,
}

impl RateLevel {
    /// Decode from the flag bits, saturating at `VeryFast`
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Stop,
            1 => Self::Normal,
            2 => Self::Fast,
            _ => Self::VeryFast,
        }
    }

    /// Nominal report frequency (Hz)
    pub fn nominal_hz(self) -> f64 {
        match self {
            Self::Stop => 0.0,
            Self::Normal => 50.0,
            Self::Fast => 200.0,
            Self::VeryFast => 800.0,
        }
    }
}

/// Sensors HAL
///
/// `Err` from any call means the HAL did not respond; protocol level
/// failures are reported through `Status`.
#[trait_variant::make(SensorsHal: Send)]
pub trait LocalSensorsHal {
    /// Enumerate sensors
    async fn sensors_list(&self) -> HalResult<Vec<SensorInfo>>;

    /// Bind event delivery to `callback`
    ///
    /// A second call rebinds delivery; the previous callback receives nothing afterwards.
    async fn initialize(&self, callback: EventCallback) -> HalResult<Status>;

    /// Enable or disable a sensor
    async fn activate(&self, handle: SensorHandle, enabled: bool) -> HalResult<Status>;

    /// Configure sampling period and maximum report latency (both ns)
    async fn batch(
        &self,
        handle: SensorHandle,
        sampling_period_ns: i64,
        max_report_latency_ns: i64,
    ) -> HalResult<Status>;

    /// Request a flush; completion arrives as a flush-complete event
    async fn flush(&self, handle: SensorHandle) -> HalResult<Status>;

    /// Inject an event (data injection mode only)
    async fn inject_sensor_data(&self, event: Event) -> HalResult<Status>;

    /// Switch the global operation mode
    async fn set_operation_mode(&self, mode: OperationMode) -> HalResult<Status>;

    /// Register a shared memory region as a direct channel
    async fn register_direct_channel(
        &self,
        mem: &SharedMemInfo,
    ) -> HalResult<(Status, ChannelHandle)>;

    /// Unregister a direct channel
    async fn unregister_direct_channel(&self, channel: ChannelHandle) -> HalResult<Status>;

    /// Start, change or stop direct reporting; returns the report token
    async fn config_direct_report(
        &self,
        handle: SensorHandle,
        channel: ChannelHandle,
        rate: RateLevel,
    ) -> HalResult<(Status, i32)>;
}
