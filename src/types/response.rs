//! HTTP response and operation result types.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};
use crate::shared::headers;
use crate::types::message::{DecodedMessage, Severity};

/// A response as delivered by a [`Transport`](crate::client::Transport).
///
/// The body is kept as raw bytes; [`json`](Self::json) parses it on
/// demand so that a malformed body is reported where it matters.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: &Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    /// Sets a raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns `true` for `202 Accepted`, the status of a pending operation.
    pub fn is_accepted(&self) -> bool {
        self.status == StatusCode::ACCEPTED
    }

    /// Returns `true` if the body is empty or whitespace.
    pub fn has_empty_body(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Parses the body as JSON. An empty body yields `Ok(None)`.
    pub fn json(&self) -> std::result::Result<Option<Value>, serde_json::Error> {
        if self.has_empty_body() {
            return Ok(None);
        }
        serde_json::from_slice(&self.body).map(Some)
    }

    /// `Location` header value.
    pub fn location(&self) -> Option<String> {
        headers::location(&self.headers)
    }
}

/// Aggregate outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Completed without warnings.
    Success,
    /// Completed, but at least one message warns.
    Warning,
    /// Failed.
    Failure,
}

impl Outcome {
    /// Classifies a final status and the severities of its decoded
    /// messages.
    ///
    /// `Failure` when the status is 4xx/5xx or any message is `Critical`;
    /// otherwise `Warning` when any message warns; otherwise `Success`.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::StatusCode;
    /// use tacklebox::{Outcome, Severity};
    ///
    /// assert_eq!(Outcome::classify(StatusCode::OK, []), Outcome::Success);
    /// assert_eq!(
    ///     Outcome::classify(StatusCode::OK, [Severity::Ok, Severity::Warning]),
    ///     Outcome::Warning
    /// );
    /// assert_eq!(
    ///     Outcome::classify(StatusCode::BAD_REQUEST, [Severity::Ok]),
    ///     Outcome::Failure
    /// );
    /// ```
    pub fn classify(status: StatusCode, severities: impl IntoIterator<Item = Severity>) -> Self {
        let worst = severities.into_iter().max();
        if status.is_client_error() || status.is_server_error() || worst == Some(Severity::Critical)
        {
            Self::Failure
        } else if worst == Some(Severity::Warning) {
            Self::Warning
        } else {
            Self::Success
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Warning => f.write_str("warning"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// The verified, terminal outcome of an operation.
#[derive(Debug, Clone)]
pub struct OperationResult {
    /// Final HTTP status.
    pub status: StatusCode,
    /// Aggregate outcome.
    pub outcome: Outcome,
    /// Decoded messages in body order.
    pub messages: Vec<DecodedMessage>,
    /// Parsed body, when one was present and valid JSON.
    pub body: Option<Value>,
    /// `Location` header of the final response (e.g. a created resource).
    pub location: Option<String>,
}

impl OperationResult {
    /// Returns `true` unless the outcome is [`Outcome::Failure`].
    pub fn is_success(&self) -> bool {
        self.outcome != Outcome::Failure
    }

    /// `Location` of the final response.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Message texts joined for display, or the status alone when there
    /// are no messages.
    pub fn summary(&self) -> String {
        if self.messages.is_empty() {
            return self.status.to_string();
        }
        self.messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Converts a failure outcome into [`Error::OperationFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::OperationFailed {
                status: self.status,
                summary: self.summary(),
            })
        }
    }
}
