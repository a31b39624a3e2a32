//! Event/flush accumulator.

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{Receiver, Sender, TryRecvError};
use contracts::{Event, EventCallback, SensorHandle, SensorType};
use tracing::{debug, trace};

/// Create a connected sender/sink pair
pub fn channel() -> (EventSender, EventSink) {
    let (tx, rx) = async_channel::unbounded();
    let sender = EventSender { tx };
    let sink = EventSink {
        rx,
        events: HashMap::new(),
        flush_counts: HashMap::new(),
    };
    (sender, sink)
}

/// Producer side, callable from any thread
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    /// Forward one event; dropped silently once the sink is gone
    pub fn send(&self, event: Event) {
        if self.tx.try_send(event).is_err() {
            trace!("event sink closed, event dropped");
        }
    }

    /// Wrap as a HAL callback
    pub fn into_callback(self) -> EventCallback {
        Arc::new(move |event| self.send(event))
    }
}

/// Consumer side: per-handle events in arrival order and per-handle flush counts
#[derive(Debug)]
///
/// The channel closes once every `EventSender` is dropped; already delivered
/// events stay readable.
pub struct EventSink {
    pub(crate) rx: Receiver<Event>,
    events: HashMap<SensorHandle, Vec<Event>>,
    flush_counts: HashMap<SensorHandle, u32>,
}

impl EventSink {
    /// Classify one event
    ///
    /// Flush-complete markers bump the handle's flush count; other metadata
    /// and additional-info events are ignored; everything else is appended.
    pub fn on_event(&mut self, event: Event) {
        match event.sensor_type {
            SensorType::MetaData => {
                if event.is_flush_complete() {
                    *self.flush_counts.entry(event.sensor_handle).or_default() += 1;
                    observability::record_flush_complete();
                    trace!(handle = event.sensor_handle, "flush complete");
                }
            }
            SensorType::AdditionalInfo => {}
            sensor_type => {
                observability::record_event_received(&sensor_type.name());
                self.events.entry(event.sensor_handle).or_default().push(event);
            }
        }
    }

    /// Classify everything already delivered; returns how many messages were taken
    pub fn pump(&mut self) -> usize {
        let mut taken = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.on_event(event);
                    taken += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        taken
    }

    /// Discard pending deliveries, then clear both maps
    pub fn reset(&mut self) {
        let mut discarded = 0usize;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.events.clear();
        self.flush_counts.clear();
        debug!(discarded, "event sink reset");
    }

    /// Flush acknowledgements seen for `handle`
    pub fn flush_count(&mut self, handle: SensorHandle) -> u32 {
        self.pump();
        *self.flush_counts.entry(handle).or_default()
    }

    /// Events seen for `handle`, in arrival order
    pub fn events(&mut self, handle: SensorHandle) -> &[Event] {
        self.pump();
        self.events.entry(handle).or_default()
    }

    /// Total data events across all handles
    pub fn total_events(&mut self) -> usize {
        self.pump();
        self.events.values().map(Vec::len).sum()
    }

    pub(crate) fn peek_flush_count(&self, handle: SensorHandle) -> u32 {
        self.flush_counts.get(&handle).copied().unwrap_or(0)
    }

    pub(crate) fn peek_event_count(&self, handle: SensorHandle) -> usize {
        self.events.get(&handle).map_or(0, Vec::len)
    }
}
