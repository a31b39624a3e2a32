//! Hardware FIFO used for batching.
//!
//! Events wait here while the sensor runs with a non-zero max report latency.
//! The FIFO is drained when the oldest event has waited for the latency, when
//! it fills up, or on flush.

use std::fmt;

use contracts::Event;
use ringbuf::{traits::*, HeapRb};

pub(crate) struct BatchFifo {
    ring: HeapRb<Event>,
    capacity: usize,
}

impl fmt::Debug for BatchFifo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchFifo")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl BatchFifo {
    /// `None` for sensors without a hardware FIFO
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        (capacity > 0).then(|| Self {
            ring: HeapRb::new(capacity),
            capacity,
        })
    }

    /// Buffer an event; returns true once the FIFO is full and must be drained
    pub fn push(&mut self, event: Event) -> bool {
        let _ = self.ring.try_push(event);
        self.ring.is_full()
    }

    /// Whether the oldest buffered event has waited at least `latency_ns` at `now_ns`
    pub fn is_due(&self, now_ns: i64, latency_ns: i64) -> bool {
        self.ring
            .iter()
            .next()
            .is_some_and(|oldest| now_ns.saturating_sub(oldest.timestamp) >= latency_ns)
    }

    pub fn drain(&mut self) -> Vec<Event> {
        self.ring.pop_iter().collect()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }
}
