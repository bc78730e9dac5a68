//! Task monitor polling.
//!
//! [`TaskMonitor::run_to_completion`] takes the response to an operation
//! request. A synchronous response is returned untouched; a `202 Accepted`
//! response is followed through its task monitor until the task reaches a
//! terminal state, and the final monitor response is returned.
//!
//! Every monitor response is classified once, into either a pending poll
//! (with the task state, progress, an updated monitor location and the
//! server's pacing hint) or the terminal response. The loop only ever
//! looks at that classification.

use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::Transport;
use crate::config::PollerConfig;
use crate::error::{Error, Result};
use crate::shared::headers;
use crate::types::task::{Task, TaskProgress, TaskSnapshot, TaskState};
use crate::types::{HttpResponse, OperationResult};
use crate::verify::ResponseVerifier;

/// Receives task progress while a monitor is polled.
///
/// Called once per non-terminal poll. Implemented for any
/// `Fn(&TaskSnapshot) + Send + Sync` closure.
pub trait ProgressObserver: Send + Sync {
    /// Reports one observed snapshot.
    fn on_progress(&self, snapshot: &TaskSnapshot);
}

impl<F> ProgressObserver for F
where
    F: Fn(&TaskSnapshot) + Send + Sync,
{
    fn on_progress(&self, snapshot: &TaskSnapshot) {
        self(snapshot)
    }
}

/// One monitor response, classified.
#[derive(Debug)]
enum MonitorResponse {
    /// The task is still running.
    Pending {
        state: Option<TaskState>,
        percent_complete: Option<u8>,
        next_uri: Option<String>,
        retry_after: Option<Duration>,
    },
    /// The operation finished; this is its final response.
    Terminal(HttpResponse),
}

impl MonitorResponse {
    fn classify(response: HttpResponse, uri: &str) -> Result<Self> {
        let body = match response.json() {
            Ok(body) => body,
            Err(err) if response.is_accepted() => {
                return Err(Error::PollTransport {
                    uri: uri.to_string(),
                    reason: format!("invalid task body: {}", err),
                });
            },
            // A final resource is allowed to be anything; the verifier
            // copes with non-JSON bodies.
            Err(_) => return Ok(Self::Terminal(response)),
        };

        let progress = match &body {
            Some(body) if response.is_accepted() || Task::is_task_envelope(body) => {
                Some(parse_progress(body)?)
            },
            _ => None,
        };

        match progress {
            Some(progress) if progress.state.is_terminal() => Ok(Self::Terminal(response)),
            Some(progress) => Ok(Self::pending(&response, Some(progress))),
            None if response.is_accepted() => Ok(Self::pending(&response, None)),
            None => Ok(Self::Terminal(response)),
        }
    }

    fn pending(response: &HttpResponse, progress: Option<TaskProgress>) -> Self {
        Self::Pending {
            state: progress.map(|p| p.state),
            percent_complete: progress.and_then(|p| p.percent_complete),
            next_uri: response.location(),
            retry_after: headers::retry_after(&response.headers, Utc::now()),
        }
    }
}

fn parse_progress(body: &Value) -> Result<TaskProgress> {
    TaskProgress::from_body(body)
        .map_err(|e| Error::malformed(format!("task body is not a Task resource: {}", e)))
}

/// Monitor URI of an accepted response: the `Location` header, then the
/// body's `TaskMonitor`, then the Task's own `@odata.id`.
fn monitor_uri(response: &HttpResponse) -> Result<String> {
    if let Some(location) = response.location() {
        return Ok(location);
    }
    let body = response.json().ok().flatten();
    body.as_ref()
        .and_then(|body| {
            ["TaskMonitor", "@odata.id"]
                .into_iter()
                .filter_map(|field| body.get(field).and_then(Value::as_str))
                .map(str::trim)
                .find(|uri| !uri.is_empty())
        })
        .map(ToString::to_string)
        .ok_or_else(|| Error::malformed("202 Accepted without a task monitor location"))
}

/// Drives accepted operations to completion.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use tacklebox::client::ReqwestTransport;
/// use tacklebox::poller::TaskMonitor;
///
/// let transport = ReqwestTransport::new("https://bmc.example")?.with_basic_auth("root", "calvin");
/// let accepted = transport.post("/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate", &body).await?;
///
/// let monitor = TaskMonitor::new(transport)
///     .with_max_wait(Duration::from_secs(600))
///     .with_progress(|snapshot: &tacklebox::TaskSnapshot| println!("{snapshot}"));
/// let final_response = monitor.run_to_completion(accepted).await?;
/// ```
pub struct TaskMonitor<T> {
    transport: T,
    config: PollerConfig,
    cancellation: Option<CancellationToken>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl<T: fmt::Debug> fmt::Debug for TaskMonitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMonitor")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("cancellable", &self.cancellation.is_some())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl<T: Transport> TaskMonitor<T> {
    /// Creates a monitor with the default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PollerConfig::default())
    }

    /// Creates a monitor with `config`.
    pub fn with_config(transport: T, config: PollerConfig) -> Self {
        Self {
            transport,
            config,
            cancellation: None,
            observer: None,
        }
    }

    /// Bounds the total time spent waiting for a task.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.config.max_wait_ms = Some(u64::try_from(max_wait.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the delay used when the service sends no usable `Retry-After`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.default_poll_interval_ms =
            u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Stops polling with [`Error::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Reports progress of every non-terminal poll to `observer`.
    pub fn with_progress(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The polling configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// The transport used for monitor requests.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the final response of the operation started by `initial`.
    ///
    /// Non-`202` responses are returned unchanged without any request.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedResponse`] if `initial` has no monitor location,
    ///   or a monitor body is not a valid Task resource.
    /// - [`Error::PollTransport`] if a monitor request fails or returns a
    ///   body that is not JSON.
    /// - [`Error::PollTimeout`] once the configured maximum wait elapses.
    /// - [`Error::Cancelled`] if the cancellation token fires.
    pub async fn run_to_completion(&self, initial: HttpResponse) -> Result<HttpResponse> {
        if !initial.is_accepted() {
            return Ok(initial);
        }

        let mut uri = monitor_uri(&initial)?;
        let mut last_state = initial
            .json()
            .ok()
            .flatten()
            .filter(Task::is_task_envelope)
            .and_then(|body| TaskProgress::from_body(&body).ok())
            .map(|progress| progress.state);

        let started = Instant::now();
        let deadline = self.config.max_wait().map(|max_wait| started + max_wait);
        let mut poll_count: u32 = 0;
        tracing::debug!(monitor = %uri, max_wait = ?self.config.max_wait(), "polling task monitor");

        loop {
            self.check_cancelled()?;

            poll_count = poll_count.saturating_add(1);
            let response = self.transport.get(&uri).await.map_err(|err| {
                let reason = match err {
                    Error::Transport { reason, .. } => reason,
                    other => other.to_string(),
                };
                Error::PollTransport {
                    uri: uri.clone(),
                    reason,
                }
            })?;
            tracing::debug!(monitor = %uri, status = %response.status, poll = poll_count, "task monitor responded");

            let (state, percent_complete, next_uri, retry_after) =
                match MonitorResponse::classify(response, &uri)? {
                    MonitorResponse::Terminal(response) => {
                        tracing::info!(
                            monitor = %uri,
                            status = %response.status,
                            polls = poll_count,
                            "task finished"
                        );
                        return Ok(response);
                    },
                    MonitorResponse::Pending {
                        state,
                        percent_complete,
                        next_uri,
                        retry_after,
                    } => (state, percent_complete, next_uri, retry_after),
                };

            if state.is_some() && state != last_state {
                tracing::info!(monitor = %uri, state = ?state, percent = ?percent_complete, "task state changed");
            }
            last_state = state.or(last_state);

            if let Some(observer) = &self.observer {
                observer.on_progress(&TaskSnapshot {
                    monitor_uri: uri.clone(),
                    state,
                    percent_complete,
                    poll_count,
                });
            }

            if let Some(next) = next_uri.filter(|next| *next != uri) {
                tracing::debug!(from = %uri, to = %next, "task monitor moved");
                uri = next;
            }

            let mut delay = retry_after.unwrap_or_else(|| self.config.default_poll_interval());
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    tracing::warn!(monitor = %uri, state = ?last_state, "gave up waiting for task");
                    return Err(Error::PollTimeout {
                        waited: now - started,
                        last_state,
                    });
                }
                delay = delay.min(deadline - now);
            }
            self.sleep(delay).await?;
        }
    }

    /// Runs `initial` to completion and verifies the final response.
    pub async fn run_and_verify(
        &self,
        initial: HttpResponse,
        verifier: &ResponseVerifier,
    ) -> Result<OperationResult> {
        let response = self.run_to_completion(initial).await?;
        Ok(verifier.verify(&response).await)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    async fn sleep(&self, delay: Duration) -> Result<()> {
        match &self.cancellation {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            },
        }
    }
}
