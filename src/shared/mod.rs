//! Helpers shared by the transport, poller and verifier.

pub mod headers;
pub mod http_utils;
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::init_logging;
