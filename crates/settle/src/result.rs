//! Result and error types for Settle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::Match;

/// Result type for Settle operations
pub type SettleResult<T> = Result<T, SettleError>;

/// Errors that can occur while driving a UI
#[derive(Debug, Error)]
pub enum SettleError {
    /// The UI session is gone (page closed, navigated away, transport dropped)
    #[error("UI surface unavailable: {message}")]
    SurfaceUnavailable {
        /// Error message
        message: String,
    },

    /// A dispatch targeted a selector with no current matches
    #[error("No element matches {selector}")]
    ElementNotFound {
        /// Selector description
        selector: String,
    },

    /// A wait predicate never became true
    #[error("Timed out after {timeout_ms}ms waiting for {description} (last observed: {last_observed})")]
    Timeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
        /// Description of the awaited predicate
        description: String,
        /// Last match observed before giving up
        last_observed: Box<Match>,
        /// Number of evaluations performed
        polls: u32,
    },

    /// Observed value differs from the expected literal
    #[error("Assertion failed on {subject}: expected {expected:?}, observed {observed:?}")]
    AssertionMismatch {
        /// What was asserted on
        subject: String,
        /// Expected literal
        expected: String,
        /// Observed value
        observed: String,
    },

    /// Selector could not be parsed or is not supported by the driver
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// Selector source
        selector: String,
        /// Error message
        message: String,
    },

    /// Wait budget violates its invariants
    #[error("Invalid wait spec: {message}")]
    InvalidWaitSpec {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input dispatch failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Transport-level driver failure that does not imply the surface is gone
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Suite file is structurally valid YAML but semantically wrong
    #[error("Invalid suite: {message}")]
    InvalidSuite {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Serializable discriminant of [`SettleError`], used in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`SettleError::SurfaceUnavailable`]
    SurfaceUnavailable,
    /// See [`SettleError::ElementNotFound`]
    ElementNotFound,
    /// See [`SettleError::Timeout`]
    Timeout,
    /// See [`SettleError::AssertionMismatch`]
    AssertionMismatch,
    /// Selector, wait spec or suite problems
    Invalid,
    /// Input, driver, launch and I/O problems
    Other,
}

impl SettleError {
    /// Create a surface-unavailable error
    #[must_use]
    pub fn surface_unavailable(message: impl Into<String>) -> Self {
        Self::SurfaceUnavailable {
            message: message.into(),
        }
    }

    /// Create an invalid-selector error
    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-suite error
    #[must_use]
    pub fn invalid_suite(message: impl Into<String>) -> Self {
        Self::InvalidSuite {
            message: message.into(),
        }
    }

    /// Error discriminant
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SurfaceUnavailable { .. } => ErrorKind::SurfaceUnavailable,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AssertionMismatch { .. } => ErrorKind::AssertionMismatch,
            Self::InvalidSelector { .. } | Self::InvalidWaitSpec { .. } | Self::InvalidSuite { .. } => {
                ErrorKind::Invalid
            }
            Self::InputError { .. }
            | Self::Driver { .. }
            | Self::BrowserLaunchError { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => ErrorKind::Other,
        }
    }

    /// Whether this error ends the whole run rather than a single scenario
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable { .. })
    }
}
