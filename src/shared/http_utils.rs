//! Redaction helpers for request tracing.
//!
//! Redfish sessions authenticate with `X-Auth-Token` or Basic credentials,
//! and both must stay out of trace output.

use http::header::{HeaderMap, HeaderName};

/// Headers whose values are never logged.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-auth-token",
    "cookie",
    "set-cookie",
];

/// Returns `true` if `name` is in [`SENSITIVE_HEADERS`].
pub fn is_sensitive(name: &HeaderName) -> bool {
    SENSITIVE_HEADERS.contains(&name.as_str())
}

/// Redacts a header value for logging.
///
/// For `Authorization` the scheme (`Basic`, `Bearer`) is kept.
pub fn redact_header_value(name: &HeaderName, value: &str) -> String {
    if !is_sensitive(name) {
        return value.to_string();
    }
    match (name.as_str(), value.split_once(' ')) {
        ("authorization" | "proxy-authorization", Some((scheme, _))) => {
            format!("{scheme} [REDACTED]")
        },
        _ => "[REDACTED]".to_string(),
    }
}

/// Replaces the query string of `uri` with `[REDACTED]`.
pub fn redact_uri_query(uri: &str) -> String {
    match uri.split_once('?') {
        Some((path, _)) => format!("{path}?[REDACTED]"),
        None => uri.to_string(),
    }
}

/// Formats headers as `name: value` pairs with sensitive values redacted.
pub fn format_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            format!("{}: {}", name, redact_header_value(name, value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
