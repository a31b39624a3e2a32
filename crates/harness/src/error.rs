//! Harness error types

use contracts::{ContractError, SensorHandle, Status};
use thiserror::Error;

/// Reasons a test case fails
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The HAL did not respond, or a contract level failure
    #[error("HAL error: {0}")]
    Hal(#[from] ContractError),

    /// A control call returned an unexpected status
    #[error("{call}(handle={handle}) returned {actual:?}, expected {expected:?}")]
    UnexpectedStatus {
        call: &'static str,
        handle: SensorHandle,
        expected: Status,
        actual: Status,
    },

    /// A behavioural assertion did not hold
    #[error("assertion failed: {message}")]
    Assertion { message: String },

    /// Event payload failed validation
    #[error("invalid data from sensor {name} (handle={handle}) at event {index}: {message}")]
    InvalidData {
        handle: SensorHandle,
        name: String,
        index: usize,
        message: String,
    },

    /// Environment misuse
    #[error("environment error: {message}")]
    Environment { message: String },
}

impl HarnessError {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment {
            message: message.into(),
        }
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Fail with `message()` unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::assertion(message()))
    }
}

/// Fail unless a control call returned `expected`
pub fn expect_status(
    call: &'static str,
    handle: SensorHandle,
    expected: Status,
    actual: Status,
) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::UnexpectedStatus {
            call,
            handle,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mismatch_message() {
        let err = expect_status("flush", 4, Status::Ok, Status::BadValue).unwrap_err();
        assert_eq!(
            err.to_string(),
            "flush(handle=4) returned BadValue, expected Ok"
        );
        assert!(expect_status("flush", 4, Status::Ok, Status::Ok).is_ok());
    }

    #[test]
    fn test_ensure_is_lazy() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let err = ensure(false, || "two events".to_string()).unwrap_err();
        assert!(err.to_string().contains("two events"));
    }
}
