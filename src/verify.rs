//! Classification of final responses.
//!
//! The verifier decodes every extended-error message in a response body
//! and derives the [`Outcome`] from the status family and the decoded
//! severities. Decoding problems degrade the message text, never the
//! outcome: a failure status is always reported as a failure.

use http::StatusCode;
use serde_json::{json, Value};

use crate::registry::{fallback_text, MessageResolver};
use crate::types::message::{DecodedMessage, MessageEntry, MessageId, Severity};
use crate::types::task::{Task, TaskProgress, TaskState};
use crate::types::{HttpResponse, OperationResult, Outcome};

const TASK_ABORTED: &str = "TaskEvent.1.0.TaskAborted";
const TASK_CANCELLED: &str = "TaskEvent.1.0.TaskCancelled";

/// Turns final responses into [`OperationResult`]s.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use http::StatusCode;
/// use serde_json::json;
/// use tacklebox::{HttpResponse, MessageResolver, Outcome, ResponseVerifier};
///
/// let verifier = ResponseVerifier::new(MessageResolver::bundled());
/// let response = HttpResponse::new(StatusCode::BAD_REQUEST).with_json(&json!({
///     "error": {
///         "code": "Base.1.8.GeneralError",
///         "message": "A general error has occurred.",
///         "@Message.ExtendedInfo": [{
///             "MessageId": "Base.1.8.PropertyValueNotInList",
///             "MessageArgs": ["Blinking", "IndicatorLED"]
///         }]
///     }
/// }));
///
/// let result = verifier.verify(&response).await;
/// assert_eq!(result.outcome, Outcome::Failure);
/// assert_eq!(
///     result.messages[0].text,
///     "The value 'Blinking' for the property IndicatorLED is not in the list of acceptable values."
/// );
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResponseVerifier {
    resolver: MessageResolver,
}

impl ResponseVerifier {
    /// Creates a verifier that decodes messages with `resolver`.
    pub fn new(resolver: MessageResolver) -> Self {
        Self { resolver }
    }

    /// The resolver used for decoding.
    pub fn resolver(&self) -> &MessageResolver {
        &self.resolver
    }

    /// Verifies a final response.
    pub async fn verify(&self, response: &HttpResponse) -> OperationResult {
        let status = response.status;
        let body = match response.json() {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(status = %status, error = %err, "response body is not JSON");
                None
            },
        };

        let mut messages = Vec::new();
        if let Some(body) = &body {
            let entries = message_entries(body);
            if entries.is_empty() {
                if let Some(entry) = error_summary_entry(body) {
                    messages.push(self.decode(&entry, status).await);
                }
            }
            for entry in entries {
                messages.push(self.decode(entry, status).await);
            }
            if let Some(message) = self.abnormal_task_message(body, &messages).await {
                messages.push(message);
            }
        }

        let outcome = Outcome::classify(status, messages.iter().map(|m| m.severity));
        match outcome {
            Outcome::Failure => tracing::warn!(status = %status, messages = messages.len(), "operation failed"),
            _ => tracing::debug!(status = %status, outcome = %outcome, "operation verified"),
        }

        OperationResult {
            status,
            outcome,
            messages,
            body,
            location: response.location(),
        }
    }

    async fn decode(&self, raw: &Value, status: StatusCode) -> DecodedMessage {
        let entry: MessageEntry = match serde_json::from_value(raw.clone()) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "unrecognised message entry");
                return DecodedMessage {
                    id: String::new(),
                    severity: status_severity(status),
                    text: raw.to_string(),
                    resolution: None,
                };
            },
        };

        let raw_id = entry.message_id.clone().unwrap_or_default();
        let args = entry.args();
        let parsed = MessageId::parse(&raw_id);
        let template = match &parsed {
            Some(id) => self.resolver.lookup(id).await,
            None => None,
        };

        let severity = entry
            .explicit_severity()
            .or_else(|| template.as_ref().and_then(|t| t.default_severity()))
            .unwrap_or_else(|| status_severity(status));

        let text = entry
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| template.as_ref().map(|t| t.render(&args)))
            .unwrap_or_else(|| {
                let key = parsed.as_ref().map_or(raw_id.as_str(), |id| id.key.as_str());
                fallback_text(key, &args)
            });

        let resolution = entry
            .resolution
            .clone()
            .or_else(|| template.as_ref().and_then(|t| t.render_resolution(&args)));

        DecodedMessage {
            id: raw_id,
            severity,
            text,
            resolution,
        }
    }

    /// A final Task body that ended abnormally without any critical
    /// message gets the matching `TaskEvent` message appended.
    async fn abnormal_task_message(
        &self,
        body: &Value,
        decoded: &[DecodedMessage],
    ) -> Option<DecodedMessage> {
        if !Task::is_task_envelope(body) {
            return None;
        }
        let state = TaskProgress::from_body(body).ok()?.state;
        if !state.is_abnormal() || decoded.iter().any(|m| m.severity == Severity::Critical) {
            return None;
        }

        let (id, severity) = match state {
            TaskState::Cancelled => (TASK_CANCELLED, Severity::Warning),
            _ => (TASK_ABORTED, Severity::Critical),
        };
        let task_id = ["Id", "@odata.id"]
            .into_iter()
            .filter_map(|field| body.get(field))
            .find_map(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();
        let mut message = self.resolver.resolve(id, &[task_id]).await;
        message.severity = severity;
        Some(message)
    }
}

/// Severity assumed for a message that could not be decoded.
fn status_severity(status: StatusCode) -> Severity {
    if status.is_client_error() || status.is_server_error() {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// Collects message entries from every place Redfish puts them:
/// `error.@Message.ExtendedInfo`, a top-level `@Message.ExtendedInfo`,
/// and a Task's `Messages`.
pub fn message_entries(body: &Value) -> Vec<&Value> {
    let mut entries = Vec::new();
    let lists = [
        body.get("error").and_then(|e| e.get("@Message.ExtendedInfo")),
        body.get("@Message.ExtendedInfo"),
        Task::is_task_envelope(body)
            .then(|| body.get("Messages"))
            .flatten(),
    ];
    for list in lists.into_iter().flatten() {
        match list {
            Value::Array(items) => entries.extend(items.iter()),
            Value::Object(_) => entries.push(list),
            _ => {},
        }
    }
    entries
}

/// The `error.code` / `error.message` pair as a message entry, for error
/// bodies that carry no `@Message.ExtendedInfo`.
fn error_summary_entry(body: &Value) -> Option<Value> {
    let error = body.get("error")?;
    let code = error.get("code").and_then(Value::as_str);
    let message = error.get("message").and_then(Value::as_str);
    if code.is_none() && message.is_none() {
        return None;
    }
    Some(json!({"MessageId": code, "Message": message}))
}
