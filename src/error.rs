//! Error types for task polling and response verification.
//!
//! Only the poll loop, the transport and configuration loading produce
//! errors. Registry and message resolution never do: they degrade to
//! best-effort text inside an [`OperationResult`](crate::OperationResult).

use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::types::task::TaskState;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An accepted response carried no usable task monitor, or a task
    /// body is missing required fields.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// The transport failed while polling a task monitor, or the monitor
    /// returned a body that is not valid JSON.
    #[error("task monitor {uri} could not be polled: {reason}")]
    PollTransport {
        /// Task monitor URI being polled.
        uri: String,
        /// Underlying failure.
        reason: String,
    },

    /// The caller's maximum wait elapsed before the task reached a
    /// terminal state.
    #[error("task did not complete within {waited:?} (last state: {})", state_label(.last_state))]
    PollTimeout {
        /// Total time spent waiting.
        waited: Duration,
        /// Last task state observed on the monitor, if any was reported.
        last_state: Option<TaskState>,
    },

    /// The caller cancelled the poll.
    #[error("task polling was cancelled")]
    Cancelled,

    /// A request outside the poll loop failed at the transport level.
    #[error("request to {uri} failed: {reason}")]
    Transport {
        /// Request URI.
        uri: String,
        /// Underlying failure.
        reason: String,
    },

    /// A verified operation finished with a failure outcome.
    #[error("operation failed with status {status}: {summary}")]
    OperationFailed {
        /// Final HTTP status of the operation.
        status: StatusCode,
        /// Decoded messages joined for display.
        summary: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

fn state_label(state: &Option<TaskState>) -> String {
    state.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors raised while a task monitor was being
    /// polled.
    pub fn is_poll_error(&self) -> bool {
        matches!(
            self,
            Self::PollTransport { .. } | Self::PollTimeout { .. } | Self::Cancelled
        )
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {}", err))
    }
}
