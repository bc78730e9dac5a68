//! Wire and result types.

pub mod message;
pub mod registry;
pub mod response;
pub mod task;

pub use message::{DecodedMessage, MessageEntry, MessageId, Severity};
pub use registry::{MessageRegistry, RegistryMessage};
pub use response::{HttpResponse, OperationResult, Outcome};
pub use task::{Task, TaskProgress, TaskSnapshot, TaskState};
