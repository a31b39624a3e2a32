//! Simulated sensor
//!
//! Each active sensor runs a generator thread that produces readings on an
//! ideal timeline (`next_timestamp += period`), so event timestamps are
//! monotonic and evenly spaced even when the thread wakes late.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

use contracts::{
    Event, EventCallback, ReportMode, SensorFlags, SensorHandle, SensorInfo, SensorType,
    SimulatedSensorConfig,
};
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::fifo::BatchFifo;
use crate::reading;

/// Interval between steps reported by special sensors
const SPECIAL_EVENT_INTERVAL_NS: i64 = 500_000_000;

/// Floor for generator periods
const MIN_PERIOD_NS: i64 = 100_000;

/// State shared by every sensor of one HAL instance
pub(crate) struct Delivery {
    pub clock: Clock,
    callback: RwLock<Option<EventCallback>>,
    pub drop_flush_complete: AtomicBool,
    pub keep_previous_callback: AtomicBool,
    pub redeliver_last_on_activate: AtomicBool,
    pub silent_reactivation: AtomicBool,
}

impl Delivery {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            callback: RwLock::new(None),
            drop_flush_complete: AtomicBool::new(false),
            keep_previous_callback: AtomicBool::new(false),
            redeliver_last_on_activate: AtomicBool::new(false),
            silent_reactivation: AtomicBool::new(false),
        }
    }

    /// Replace the delivery target
    pub fn rebind(&self, callback: EventCallback) {
        let mut current = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        if current.is_some() && self.keep_previous_callback.load(Ordering::Relaxed) {
            debug!("rebind ignored, previous callback kept");
            return;
        }
        *current = Some(callback);
    }

    pub fn deliver(&self, event: Event) {
        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

#[derive(Debug)]
pub(crate) struct SlotState {
    pub active: bool,
    generation: u64,
    pub period_ns: i64,
    pub latency_ns: i64,
    fifo: Option<BatchFifo>,
    next_timestamp: i64,
    seq: u64,
    last_event: Option<Event>,
}

/// One simulated sensor
pub(crate) struct SensorSlot {
    pub info: SensorInfo,
    state: Mutex<SlotState>,
}

impl SensorSlot {
    pub fn new(handle: SensorHandle, profile: &SimulatedSensorConfig) -> Self {
        let info = sensor_info(handle, profile);
        let period_ns = info.max_sampling_period_ns().max(info.min_sampling_period_ns());
        Self {
            state: Mutex::new(SlotState {
                active: false,
                generation: 0,
                period_ns,
                latency_ns: 0,
                fifo: BatchFifo::with_capacity(info.fifo_max_event_count as usize),
                next_timestamp: 0,
                seq: 0,
                last_event: None,
            }),
            info,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handle(&self) -> SensorHandle {
        self.info.handle
    }

    /// Clamp a requested sampling period to what the sensor supports
    pub fn clamp_period(&self, requested_ns: i64) -> i64 {
        let min = self.info.min_sampling_period_ns();
        let max = self.info.max_sampling_period_ns();
        let mut period = requested_ns.max(min);
        if max > 0 {
            period = period.min(max);
        }
        period.max(MIN_PERIOD_NS)
    }

    pub fn configure(&self, period_ns: i64, latency_ns: i64) {
        let mut state = self.lock();
        state.period_ns = self.clamp_period(period_ns);
        state.latency_ns = latency_ns;
    }

    /// Enable the sensor; no-op when already enabled
    pub fn enable(self: &Arc<Self>, delivery: &Arc<Delivery>) {
        let (generation, stale) = {
            let mut state = self.lock();
            if state.active {
                return;
            }
            // generation 0: never enabled
            let restart = state.generation > 0;
            state.active = true;
            state.generation += 1;
            if restart && delivery.silent_reactivation.load(Ordering::Relaxed) {
                debug!(handle = self.handle(), "reactivation acknowledged, not restarted");
                return;
            }
            state.next_timestamp = delivery.clock.now_ns() + self.event_period(state.period_ns);
            if let Some(fifo) = state.fifo.as_mut() {
                fifo.clear();
            }
            let stale = state
                .last_event
                .clone()
                .filter(|_| delivery.redeliver_last_on_activate.load(Ordering::Relaxed));
            (state.generation, stale)
        };

        if let Some(event) = stale {
            debug!(handle = self.handle(), timestamp = event.timestamp, "stale event redelivered");
            delivery.deliver(event);
        }

        if self.info.report_mode() == ReportMode::OneShot {
            // no trigger in a still environment
            return;
        }

        let slot = self.clone();
        let delivery = delivery.clone();
        thread::spawn(move || slot.run(&delivery, generation));
    }

    /// Disable the sensor, discarding anything still batched
    pub fn disable(&self) {
        let mut state = self.lock();
        if !state.active {
            return;
        }
        state.active = false;
        state.generation += 1;
        if let Some(fifo) = state.fifo.as_mut() {
            fifo.clear();
        }
    }

    /// Deliver batched events followed by a flush-complete marker
    pub fn flush(&self, delivery: &Delivery) {
        let mut state = self.lock();
        if let Some(fifo) = state.fifo.as_mut() {
            for event in fifo.drain() {
                delivery.deliver(event);
            }
        }
        if !delivery.drop_flush_complete.load(Ordering::Relaxed) {
            delivery.deliver(Event::flush_complete(self.handle(), delivery.clock.now_ns()));
        }
    }

    fn event_period(&self, period_ns: i64) -> i64 {
        match self.info.report_mode() {
            ReportMode::Special => SPECIAL_EVENT_INTERVAL_NS,
            _ => period_ns,
        }
    }

    fn run(&self, delivery: &Delivery, generation: u64) {
        let handle = self.handle();
        let sensor_type = self.info.sensor_type;
        let mut rng = rand::rng();

        debug!(handle, sensor_type = %sensor_type, "mock sensor started");

        loop {
            let due = {
                let state = self.lock();
                if !state.active || state.generation != generation {
                    break;
                }
                state.next_timestamp
            };

            delivery.clock.sleep_until(due);

            // delivery happens under the slot lock so nothing is emitted after disable returns
            let mut state = self.lock();
            if !state.active || state.generation != generation {
                break;
            }
            let timestamp = state.next_timestamp;
            state.next_timestamp += self.event_period(state.period_ns);
            state.seq += 1;

            let event = Event {
                sensor_handle: handle,
                sensor_type,
                timestamp,
                payload: reading::sample(sensor_type, state.seq, &mut rng),
            };
            state.last_event = Some(event.clone());

            let latency_ns = state.latency_ns;
            match state.fifo.as_mut().filter(|_| latency_ns > 0) {
                Some(fifo) => {
                    let full = fifo.push(event);
                    if full || fifo.is_due(timestamp, latency_ns) {
                        let batch = fifo.drain();
                        trace!(handle, count = batch.len(), "fifo drained");
                        for event in batch {
                            delivery.deliver(event);
                        }
                    }
                }
                None => {
                    trace!(handle, timestamp, "mock event sent");
                    delivery.deliver(event);
                }
            }
        }

        debug!(handle, "mock sensor stopped");
    }
}

/// Build the descriptor advertised for a profile entry
fn sensor_info(handle: SensorHandle, profile: &SimulatedSensorConfig) -> SensorInfo {
    let sensor_type = profile.sensor_type;

    let mut extra = 0;
    if profile.data_injection {
        extra |= SensorFlags::DATA_INJECTION;
    }
    if profile.direct_channel_ashmem {
        extra |= SensorFlags::DIRECT_CHANNEL_ASHMEM;
    }
    if profile.direct_channel_gralloc {
        extra |= SensorFlags::DIRECT_CHANNEL_GRALLOC;
    }
    if profile.report_mode == ReportMode::OneShot {
        extra |= SensorFlags::WAKE_UP;
    }

    let type_as_string = match sensor_type.string_type() {
        Some(s) => s.to_string(),
        None => format!("com.sensors_vts.{}", sensor_type.name().replace(':', "_")),
    };

    SensorInfo {
        handle,
        sensor_type,
        type_as_string,
        name: format!("Simulated {}", sensor_type.name().replace('_', " ")),
        vendor: "sensors-vts".to_string(),
        version: 1,
        max_range: max_range(sensor_type),
        resolution: 0.01,
        power: 0.5,
        min_delay_us: profile.min_delay_us,
        max_delay_us: profile.max_delay_us,
        fifo_reserved_event_count: profile.fifo_reserved_event_count,
        fifo_max_event_count: profile.fifo_max_event_count,
        required_permission: String::new(),
        flags: SensorFlags::new(profile.report_mode, profile.direct_report, extra),
    }
}

fn max_range(sensor_type: SensorType) -> f32 {
    match sensor_type {
        SensorType::Accelerometer | SensorType::AccelerometerUncalibrated => 78.453,
        SensorType::Gyroscope | SensorType::GyroscopeUncalibrated => 34.906,
        SensorType::MagneticField | SensorType::MagneticFieldUncalibrated => 4912.0,
        SensorType::Light => 43_000.0,
        SensorType::Pressure => 1100.0,
        _ => 1.0,
    }
}
