//! HTTP transport backed by `reqwest`.
//!
//! Requires the `http-client` feature.

use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::transport::Transport;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::types::HttpResponse;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Clone)]
enum Credentials {
    None,
    Basic { username: String, password: String },
    Session { token: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Session { .. } => f.write_str("Session"),
        }
    }
}

/// Redfish client transport over HTTPS.
///
/// Relative URIs are joined onto the service base URL. Session login is
/// left to the caller: pass an existing token with
/// [`with_session_token`](Self::with_session_token), or use Basic
/// authentication.
///
/// # Examples
///
/// ```rust,no_run
/// use tacklebox::client::ReqwestTransport;
///
/// # async fn example() -> tacklebox::Result<()> {
/// let transport = ReqwestTransport::new("https://192.168.1.100")?
///     .with_basic_auth("root", "password");
/// let response = transport
///     .post("/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
///           &serde_json::json!({"ImageURI": "http://files/bmc.bin"}))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, Duration::from_millis(5_000), false)
    }

    /// Creates a transport from a [`ServiceConfig`].
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let transport = Self::build(
            &config.rhost,
            config.timeout(),
            config.accept_invalid_certs,
        )?;
        Ok(match (&config.username, &config.password) {
            (Some(user), Some(password)) => transport.with_basic_auth(user, password),
            _ => transport,
        })
    }

    fn build(base_url: &str, timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            credentials: Credentials::None,
        })
    }

    /// Authenticates every request with HTTP Basic credentials.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.credentials = Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }

    /// Authenticates every request with an existing session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.credentials = Credentials::Session {
            token: token.to_string(),
        };
        self
    }

    /// Service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `uri` against the base URL.
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        self.base_url
            .join(uri)
            .map_err(|e| Error::transport(uri, format!("invalid URI: {}", e)))
    }

    /// Sends a request and collects the full response.
    pub async fn send(&self, method: Method, uri: &str, body: Option<&Value>) -> Result<HttpResponse> {
        let url = self.resolve(uri)?;
        let mut request = self.client.request(method, url);
        request = match &self.credentials {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            },
            Credentials::Session { token } => request.header(AUTH_TOKEN_HEADER, token.as_str()),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(uri, e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(uri, e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// `POST`s a JSON body.
    pub async fn post(&self, uri: &str, body: &Value) -> Result<HttpResponse> {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// `PATCH`es a JSON body.
    pub async fn patch(&self, uri: &str, body: &Value) -> Result<HttpResponse> {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    /// `DELETE`s a resource.
    pub async fn delete(&self, uri: &str) -> Result<HttpResponse> {
        self.send(Method::DELETE, uri, None).await
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, uri: &str) -> Result<HttpResponse> {
        self.send(Method::GET, uri, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_uris() {
        let transport = ReqwestTransport::new("https://bmc.example:8443").unwrap();
        assert_eq!(
            transport.resolve("/redfish/v1/TaskService/TaskMonitors/5").unwrap().as_str(),
            "https://bmc.example:8443/redfish/v1/TaskService/TaskMonitors/5"
        );
        assert_eq!(
            transport.resolve("https://registries.example/Base.1.16.0.json").unwrap().as_str(),
            "https://registries.example/Base.1.16.0.json"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ReqwestTransport::new("not a url"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn debug_hides_credentials() {
        let transport = ReqwestTransport::new("https://bmc.example")
            .unwrap()
            .with_basic_auth("root", "hunter2");
        let shown = format!("{:?}", transport);
        assert!(shown.contains("root"));
        assert!(!shown.contains("hunter2"));
    }
}
