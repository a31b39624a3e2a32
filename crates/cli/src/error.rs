//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Filter selected nothing
    #[error("No test case matches filter {filter:?}")]
    NoCasesSelected { filter: Vec<String> },

    /// At least one case failed
    #[error("{failed} of {total} test cases failed")]
    SuiteFailed { failed: u64, total: u64 },

    /// Configuration error
    #[error(transparent)]
    Config(#[from] contracts::ContractError),

    /// Harness error outside any test case
    #[error(transparent)]
    Harness(#[from] harness::HarnessError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn no_cases_selected(filter: &[String]) -> Self {
        Self::NoCasesSelected {
            filter: filter.to_vec(),
        }
    }

    pub fn suite_failed(failed: u64, total: u64) -> Self {
        Self::SuiteFailed { failed, total }
    }
}
