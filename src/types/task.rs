//! Task resource wire types.
//!
//! A Redfish service answers a long-running request with `202 Accepted`
//! and a task monitor URI. Polling that monitor yields either another
//! `202` carrying a [`Task`] body, or the final response of the operation.
//!
//! # Serialization
//!
//! Field names follow the Redfish `Task` schema (`PascalCase`). Unknown
//! fields are ignored; only `TaskState` is required.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::message::{null_as_default, MessageEntry};

/// Task lifecycle state as reported by the service.
///
/// ```text
/// New, Starting, Pending, Running, Suspended, Interrupted,
/// Stopping, Service, Cancelling  -> keep polling
/// Completed, Killed, Exception, Cancelled -> terminal
/// ```
///
/// # Examples
///
/// ```
/// use tacklebox::TaskState;
///
/// assert!(!TaskState::Running.is_terminal());
/// assert!(TaskState::Exception.is_terminal());
/// assert!(TaskState::Killed.is_abnormal());
/// assert!(!TaskState::Completed.is_abnormal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Created but not yet started.
    New,
    /// Starting up.
    Starting,
    /// Actively running.
    Running,
    /// Suspended by the service or a user.
    Suspended,
    /// Interrupted, possibly resumable.
    Interrupted,
    /// Queued, waiting to start.
    Pending,
    /// Stopping.
    Stopping,
    /// Completed (terminal).
    Completed,
    /// Killed by an operator (terminal).
    Killed,
    /// Ended with an exception (terminal).
    Exception,
    /// Undergoing service or maintenance.
    Service,
    /// Cancellation in progress.
    Cancelling,
    /// Cancelled (terminal).
    Cancelled,
}

impl TaskState {
    /// Returns `true` if the task will not change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Killed | Self::Exception | Self::Cancelled
        )
    }

    /// Returns `true` for terminal states that did not complete normally.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Killed | Self::Exception | Self::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "New",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Suspended => "Suspended",
            Self::Interrupted => "Interrupted",
            Self::Pending => "Pending",
            Self::Stopping => "Stopping",
            Self::Completed => "Completed",
            Self::Killed => "Killed",
            Self::Exception => "Exception",
            Self::Service => "Service",
            Self::Cancelling => "Cancelling",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// The Redfish `Task` resource, reduced to the fields the poller and
/// verifier read.
///
/// # Examples
///
/// ```
/// use tacklebox::{Task, TaskState};
///
/// let task: Task = serde_json::from_value(serde_json::json!({
///     "@odata.id": "/redfish/v1/TaskService/Tasks/7",
///     "TaskState": "Running",
///     "PercentComplete": 40,
///     "Oem": {}
/// })).unwrap();
/// assert_eq!(task.task_state, TaskState::Running);
/// assert_eq!(task.percent_complete(), Some(40));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    /// Resource URI of the task.
    #[serde(rename = "@odata.id", default, skip_serializing_if = "Option::is_none")]
    pub odata_id: Option<String>,

    /// Schema type, e.g. `#Task.v1_7_0.Task`.
    #[serde(rename = "@odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,

    /// Task identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Current state.
    pub task_state: TaskState,

    /// Health of the task (`OK`, `Warning`, `Critical`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<String>,

    /// Completion estimate. Services occasionally report values outside
    /// `0..=100`; use [`percent_complete`](Self::percent_complete).
    #[serde(rename = "PercentComplete", default, skip_serializing_if = "Option::is_none")]
    pub raw_percent_complete: Option<i64>,

    /// Task monitor URI advertised by the task itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_monitor: Option<String>,

    /// Messages produced so far. `null` reads as an empty list.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageEntry>,
}

impl Task {
    /// Percent complete clamped to `0..=100`.
    pub fn percent_complete(&self) -> Option<u8> {
        self.raw_percent_complete
            .map(|p| p.clamp(0, 100) as u8)
    }

    /// Returns `true` if `body` looks like a Task resource: either its
    /// `@odata.type` names the Task schema or it carries a `TaskState`.
    pub fn is_task_envelope(body: &Value) -> bool {
        let typed = body
            .get("@odata.type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.starts_with("#Task."));
        typed || body.get("TaskState").is_some()
    }
}

/// The two fields of a Task body that drive polling.
///
/// Everything else in the body is ignored, so a finished task whose
/// `Messages` the service filled in sloppily still ends the poll.
/// A `PercentComplete` that is not a number is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProgress {
    /// Reported state.
    pub state: TaskState,
    /// Percent complete clamped to `0..=100`.
    pub percent_complete: Option<u8>,
}

impl TaskProgress {
    /// Reads `TaskState` and `PercentComplete` from a Task body.
    ///
    /// # Errors
    ///
    /// Fails when `TaskState` is missing or not a known state.
    pub fn from_body(body: &Value) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct View {
            task_state: TaskState,
            #[serde(default)]
            percent_complete: Option<Value>,
        }

        let view = View::deserialize(body)?;
        Ok(Self {
            state: view.task_state,
            percent_complete: view
                .percent_complete
                .as_ref()
                .and_then(Value::as_f64)
                .map(|p| p.clamp(0.0, 100.0) as u8),
        })
    }
}

/// Progress of a task observed during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Monitor URI that was polled.
    pub monitor_uri: String,
    /// Reported state; `None` when the monitor answered without a body.
    pub state: Option<TaskState>,
    /// Reported percent complete.
    pub percent_complete: Option<u8>,
    /// Number of monitor GETs issued so far, including this one.
    pub poll_count: u32,
}

impl fmt::Display for TaskSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            Some(state) => write!(f, "Task is {state}")?,
            None => write!(f, "Task is in progress")?,
        }
        if let Some(percent) = self.percent_complete {
            write!(f, ", {percent}% complete")?;
        }
        Ok(())
    }
}
