//! # Event Sink
//!
//! Accumulates events and flush acknowledgements delivered by the HAL, and
//! lets a test scenario wait for them.
//!
//! ## Architecture
//!
//! ```text
//! HAL threads ──callback──> EventSender ──unbounded channel──> EventSink (owned by the scenario)
//!                                                                 │
//!                                              wait_for_* drains until predicate / deadline
//! ```
//!
//! The producer side never touches the sink state, so there is no lock on
//! the per-handle maps. `reset` drains the channel before clearing, so
//! events delivered before the reset can never leak into the next phase.

mod sink;
mod wait;

pub use sink::{channel, EventSender, EventSink};
