//! Layered error definitions
//!
//! Categorized by source: config / transport / shared memory

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== HAL Transport Errors =====
    /// The HAL did not answer a control call
    #[error("no response from HAL for '{call}': {message}")]
    Transport { call: String, message: String },

    // ===== Shared Memory Errors =====
    /// Write outside the shared region
    #[error("shared memory write out of bounds: offset={offset}, len={len}, size={size}")]
    SharedMemoryBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Malformed direct report record
    #[error("direct report record at offset {offset}: {message}")]
    RecordFormat { offset: usize, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            call: call.into(),
            message: message.into(),
        }
    }

    /// Create record format error
    pub fn record_format(offset: usize, message: impl Into<String>) -> Self {
        Self::RecordFormat {
            offset,
            message: message.into(),
        }
    }
}

/// Result of a HAL control call: `Err` only when the HAL did not respond
pub type HalResult<T> = std::result::Result<T, ContractError>;
