//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Some scenarios did not pass
    #[error("{failed} of {total} scenarios did not pass")]
    ScenariosFailed {
        /// Scenarios that failed, timed out or were skipped
        failed: usize,
        /// Scenarios in the run
        total: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settle library error
    #[error("{0}")]
    Settle(#[from] settle::SettleError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CliError::ScenariosFailed { failed: 1, total: 4 }.to_string(),
            "1 of 4 scenarios did not pass"
        );
        assert!(CliError::invalid_argument("no URL")
            .to_string()
            .contains("no URL"));
    }

    #[test]
    fn test_from_settle_error() {
        let err: CliError = settle::SettleError::invalid_suite("suite has no scenarios").into();
        assert!(matches!(err, CliError::Settle(_)));
        assert!(err.to_string().contains("no scenarios"));
    }
}
