//! Error types for the client.

use crate::session::FieldErrors;
use thiserror::Error;

/// Failure of a backend call
///
/// Cloneable so it can travel inside actions and be compared in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never got a response (connection, timeout, bad URL)
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("invalid response: {0}")]
    Decode(String),

    /// The backend rejected a form with per-field messages
    #[error("rejected with status {status}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Field-error mapping from the body
        errors: FieldErrors,
    },

    /// The backend answered with a non-success status
    ///
    /// Displays as the message alone; that is what the task list shows.
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Body text, or the status line when the body was empty
        message: String,
    },
}

impl ApiError {
    /// Field errors to store in the session after a failed register/login
    ///
    /// A rejection carries its own mapping. Any other failure has no field
    /// information and is reported under [`FieldErrors::REQUEST`].
    #[must_use]
    pub fn into_field_errors(self) -> FieldErrors {
        match self {
            Self::Rejected { errors, .. } => errors,
            other => FieldErrors::request(other.to_string()),
        }
    }

    /// Returns true if the backend answered at all
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Status { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport("timed out".to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Invalid client configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The API base URL does not parse or cannot carry a path
    #[error("invalid API URL {value:?}: {reason}")]
    InvalidUrl {
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The request timeout is not a positive number of seconds
    #[error("invalid request timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
}
