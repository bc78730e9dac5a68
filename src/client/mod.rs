//! Client-side transports.

#[cfg(feature = "http-client")]
pub mod reqwest_transport;
pub mod transport;

#[cfg(feature = "http-client")]
pub use reqwest_transport::ReqwestTransport;
pub use transport::{TracingTransport, Transport};
