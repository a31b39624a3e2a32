//! Test environment
//!
//! Explicit context object binding the harness to one HAL. `setup` installs
//! the delivery callback through `initialize`; the runner owns the lifecycle.
//! Delivered events go to the scenario sink registered with
//! `register_callback` and, while collection is enabled, to a collection
//! buffer read by `collect_events`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use contracts::{Event, EventCallback, SensorInfo, SensorsHal};
use event_sink::EventSender;
use tokio::sync::Notify;
use tokio::time::timeout_at;
use tracing::{debug, instrument};

use crate::error::{HarnessError, Result};

/// Collection behaviour of `collect_events_with`
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    /// Drop previously collected events first
    pub clear_before_start: bool,
    /// Enable collection for the call and disable it afterwards
    pub change_collection: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            clear_before_start: true,
            change_collection: true,
        }
    }
}

#[derive(Default)]
struct Dispatch {
    live: AtomicBool,
    collecting: AtomicBool,
    collected: Mutex<Vec<Event>>,
    arrived: Notify,
    forward: RwLock<Option<EventSender>>,
}

impl Dispatch {
    fn collected(&self) -> MutexGuard<'_, Vec<Event>> {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_forward(&self, sender: Option<EventSender>) {
        *self.forward.write().unwrap_or_else(PoisonError::into_inner) = sender;
    }

    /// Runs on HAL threads
    fn on_event(&self, event: Event) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        if self.collecting.load(Ordering::SeqCst) && event.is_data() {
            self.collected().push(event.clone());
            self.arrived.notify_one();
        }
        if let Some(sender) = self
            .forward
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            sender.send(event);
        }
    }
}

/// Harness side of one HAL client binding
pub struct Environment<H> {
    hal: Arc<H>,
    dispatch: Arc<Dispatch>,
    epoch: Instant,
}

impl<H: SensorsHal> Environment<H> {
    pub fn new(hal: Arc<H>) -> Self {
        Self {
            hal,
            dispatch: Arc::new(Dispatch::default()),
            epoch: Instant::now(),
        }
    }

    /// Independent environment over the same HAL
    pub fn sibling(&self) -> Self {
        Self::new(Arc::clone(&self.hal))
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Bind HAL delivery to this environment
    ///
    /// Any environment previously bound to the same HAL stops receiving events.
    #[instrument(name = "environment_setup", skip(self))]
    pub async fn setup(&self) -> Result<()> {
        let dispatch = Arc::clone(&self.dispatch);
        let callback: EventCallback = Arc::new(move |event| dispatch.on_event(event));

        let status = self.hal.initialize(callback).await?;
        if !status.is_ok() {
            return Err(HarnessError::environment(format!(
                "initialize returned {status:?}"
            )));
        }
        self.dispatch.live.store(true, Ordering::SeqCst);
        debug!("environment bound");
        Ok(())
    }

    /// Stop handling deliveries and drop collected state
    #[instrument(name = "environment_teardown", skip(self))]
    pub fn teardown(&self) {
        self.dispatch.live.store(false, Ordering::SeqCst);
        self.dispatch.collecting.store(false, Ordering::SeqCst);
        self.dispatch.set_forward(None);
        self.dispatch.collected().clear();
        debug!("environment released");
    }

    /// Whether `setup` succeeded and `teardown` has not run since
    pub fn is_live(&self) -> bool {
        self.dispatch.live.load(Ordering::SeqCst)
    }

    /// Forward every delivered event to `sender`, replacing any previous sink
    pub fn register_callback(&self, sender: EventSender) {
        self.dispatch.set_forward(Some(sender));
    }

    pub fn unregister_callback(&self) {
        self.dispatch.set_forward(None);
    }

    /// Enumerate sensors (never cached)
    pub async fn sensors_list(&self) -> Result<Vec<SensorInfo>> {
        Ok(self.hal.sensors_list().await?)
    }

    pub fn set_collection(&self, enabled: bool) {
        self.dispatch.collecting.store(enabled, Ordering::SeqCst);
    }

    pub fn clear_collected(&self) {
        self.dispatch.collected().clear();
    }

    /// Collect data events for up to `timeout`, stopping early at `limit` events
    pub async fn collect_events(&self, timeout: Duration, limit: usize) -> Vec<Event> {
        self.collect_events_with(timeout, limit, CollectOptions::default())
            .await
    }

    pub async fn collect_events_with(
        &self,
        timeout: Duration,
        limit: usize,
        options: CollectOptions,
    ) -> Vec<Event> {
        if options.change_collection {
            self.set_collection(true);
        }
        if options.clear_before_start {
            self.clear_collected();
        }

        let deadline = tokio::time::Instant::now() + timeout;
        while self.dispatch.collected().len() < limit {
            if timeout_at(deadline, self.dispatch.arrived.notified())
                .await
                .is_err()
            {
                break;
            }
        }

        if options.change_collection {
            self.set_collection(false);
        }
        let events = std::mem::take(&mut *self.dispatch.collected());
        debug!(collected = events.len(), limit, "collection finished");
        events
    }

    /// Harness monotonic clock (ns since the environment was created)
    pub fn elapsed_ns(&self) -> i64 {
        i64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventPayload, SensorType, Vec3};

    fn data(handle: i32) -> Event {
        Event {
            sensor_handle: handle,
            sensor_type: SensorType::Accelerometer,
            timestamp: 1,
            payload: EventPayload::Vec3(Vec3::default()),
        }
    }

    #[tokio::test]
    async fn test_dispatch_respects_live_and_collection() {
        let dispatch = Arc::new(Dispatch::default());
        dispatch.on_event(data(1));
        assert!(dispatch.collected().is_empty());

        dispatch.live.store(true, Ordering::SeqCst);
        dispatch.on_event(data(1));
        assert!(dispatch.collected().is_empty());

        dispatch.collecting.store(true, Ordering::SeqCst);
        dispatch.on_event(data(1));
        dispatch.on_event(Event::flush_complete(1, 2));
        assert_eq!(dispatch.collected().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_forwards_to_sink() {
        let dispatch = Dispatch::default();
        dispatch.live.store(true, Ordering::SeqCst);
        let (sender, mut sink) = event_sink::channel();
        dispatch.set_forward(Some(sender));

        dispatch.on_event(data(3));
        dispatch.on_event(Event::flush_complete(3, 5));
        assert_eq!(sink.events(3).len(), 1);
        assert_eq!(sink.flush_count(3), 1);

        dispatch.set_forward(None);
        dispatch.on_event(data(3));
        assert_eq!(sink.events(3).len(), 1);
    }
}
