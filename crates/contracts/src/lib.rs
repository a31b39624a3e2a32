//! # Contracts
//!
//! Frozen interface contracts for the sensors HAL conformance harness.
//! Every other crate depends on this one; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Event timestamps are monotonic nanoseconds (`i64`), as reported by the HAL
//! - Sensor delays (`min_delay_us` / `max_delay_us`) are microseconds
//! - Sampling periods and report latencies passed to `batch` are nanoseconds

mod config;
mod error;
mod event;
mod hal;
mod sensor;
mod sensor_type;
mod shared_mem;

pub use config::*;
pub use error::*;
pub use event::*;
pub use hal::{EventCallback, LocalSensorsHal, OperationMode, RateLevel, SensorsHal, Status};
pub use sensor::*;
pub use sensor_type::{ReportMode, SensorType};
pub use shared_mem::*;
