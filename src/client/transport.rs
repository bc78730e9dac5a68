//! Transport abstraction consumed by the poller and registry source.
//!
//! A transport distinguishes two kinds of failure: a connection or
//! protocol failure is an `Err`, while any well-formed HTTP response,
//! including 4xx/5xx, is an `Ok(HttpResponse)`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::shared::http_utils::{format_headers, redact_uri_query};
use crate::types::HttpResponse;

/// Issues GET requests against a Redfish service.
///
/// `uri` is either absolute or relative to the service root
/// (`/redfish/v1/...`); resolving it is the transport's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `uri`.
    async fn get(&self, uri: &str) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, uri: &str) -> Result<HttpResponse> {
        (**self).get(uri).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, uri: &str) -> Result<HttpResponse> {
        (**self).get(uri).await
    }
}

/// Wraps a transport and traces every request at `DEBUG`.
///
/// Credentials in headers and query strings are redacted.
///
/// # Examples
///
/// ```rust,ignore
/// use tacklebox::client::{ReqwestTransport, TracingTransport};
///
/// let transport = TracingTransport::new(ReqwestTransport::new("https://bmc.example")?)
///     .with_headers(true);
/// ```
#[derive(Debug, Clone)]
pub struct TracingTransport<T> {
    inner: T,
    log_headers: bool,
}

impl<T> TracingTransport<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            log_headers: false,
        }
    }

    /// Also log (redacted) response headers.
    pub fn with_headers(mut self, log_headers: bool) -> Self {
        self.log_headers = log_headers;
        self
    }

    /// Returns the wrapped transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TracingTransport<T> {
    async fn get(&self, uri: &str) -> Result<HttpResponse> {
        let shown = redact_uri_query(uri);
        let started = Instant::now();
        let result = self.inner.get(uri).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) if self.log_headers => tracing::debug!(
                uri = %shown,
                status = %response.status,
                elapsed_ms,
                headers = %format_headers(&response.headers),
                body_bytes = response.body.len(),
                "GET"
            ),
            Ok(response) => tracing::debug!(
                uri = %shown,
                status = %response.status,
                elapsed_ms,
                body_bytes = response.body.len(),
                "GET"
            ),
            Err(err) => tracing::debug!(uri = %shown, elapsed_ms, error = %err, "GET failed"),
        }

        result
    }
}
