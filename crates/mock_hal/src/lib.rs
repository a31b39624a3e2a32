//! # Mock HAL
//!
//! Simulated sensors HAL for running the conformance suite without hardware.
//!
//! - Generator thread per active sensor, events on an ideal timeline
//! - Hardware FIFO batching with max report latency
//! - Flush-complete markers per flush request
//! - Operation modes and data injection
//! - Direct report channels writing records into shared regions
//!
//! # Example
//!
//! ```ignore
//! use contracts::SensorsHal;
//! use mock_hal::MockSensorsHal;
//!
//! let hal = MockSensorsHal::with_default_profile();
//! hal.initialize(Arc::new(|event| println!("{event:?}"))).await?;
//! ```

mod clock;
mod direct;
mod fifo;
mod hal;
mod reading;
mod sensor;

pub use hal::{MockFaults, MockSensorsHal};
pub use reading::GRAVITY_EARTH;
