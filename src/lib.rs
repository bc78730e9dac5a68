//! Task-monitor polling and extended-error verification for Redfish
//! services.
//!
//! # Overview
//!
//! A Redfish operation either completes synchronously or answers
//! `202 Accepted` with a task monitor URI. [`TaskMonitor`] follows the
//! monitor until the task reaches a terminal state and yields the final
//! response. [`ResponseVerifier`] then decodes the `@Message.ExtendedInfo`
//! messages of that response against DMTF message registries and
//! classifies the operation as success, warning or failure.
//!
//! ```rust,ignore
//! use tacklebox::client::ReqwestTransport;
//! use tacklebox::registry::{MessageResolver, ServiceRegistrySource};
//! use tacklebox::{ResponseVerifier, ServiceConfig, TaskMonitor};
//!
//! let config = ServiceConfig::from_env()?;
//! let transport = std::sync::Arc::new(ReqwestTransport::from_config(&config)?);
//!
//! let accepted = transport
//!     .post(
//!         "/redfish/v1/Systems/1/Actions/ComputerSystem.Reset",
//!         &serde_json::json!({"ResetType": "ForceRestart"}),
//!     )
//!     .await?;
//!
//! let monitor = TaskMonitor::with_config(transport.clone(), config.poller.clone());
//! let verifier = ResponseVerifier::new(MessageResolver::new(ServiceRegistrySource::new(transport)));
//! let result = monitor.run_and_verify(accepted, &verifier).await?.into_result()?;
//! println!("{}", result.summary());
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - Task, message, registry and response types
//! - [`client`] - the [`Transport`](client::Transport) trait and an HTTP implementation
//! - [`poller`] - task monitor polling
//! - [`verify`] - response verification
//! - [`registry`] - registry lookup, caching and message resolution
//! - [`config`] - TOML and environment configuration
//! - [`error`] - error taxonomy

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod registry;
pub mod shared;
pub mod types;
pub mod verify;

pub use config::{PollerConfig, ServiceConfig};
pub use error::{Error, Result};
pub use poller::{ProgressObserver, TaskMonitor};
pub use registry::MessageResolver;
pub use types::{
    DecodedMessage, HttpResponse, MessageEntry, MessageId, OperationResult, Outcome, Severity, Task,
    TaskProgress, TaskSnapshot, TaskState,
};
pub use verify::ResponseVerifier;

#[cfg(feature = "logging")]
pub use shared::init_logging;
