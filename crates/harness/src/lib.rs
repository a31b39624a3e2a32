//! # Harness
//!
//! Conformance scenarios for a sensors HAL.
//!
//! - [`Environment`]: explicit binding to the HAL under test
//! - [`ResourceGuard`]: scoped release of sensors, channels and sinks
//! - [`Scenario`]: the test procedures
//! - [`Suite`]: the named case catalog and its runner

pub mod checker;
pub mod environment;
pub mod error;
pub mod guard;
pub mod scenario;
pub mod sensor_set;
pub mod suite;

pub use checker::{EventChecker, NullChecker, Vec3NormChecker, GRAVITY_EARTH};
pub use environment::{CollectOptions, Environment};
pub use error::{HarnessError, Result};
pub use guard::ResourceGuard;
pub use scenario::{Scenario, Verdict};
pub use suite::{CaseOutcome, CaseReport, Suite, SuiteReport, TestCase};
