//! Message registries: lookup, caching and message resolution.
//!
//! A [`MessageResolver`] owns an `Arc<RegistryCache>` and a
//! [`RegistrySource`]. Resolvers built over the same cache share every
//! registry fetched through any of them.

pub mod cache;
pub mod resolver;
pub mod source;

pub use cache::{CacheEntry, RegistryCache, RegistryKey};
pub use resolver::{fallback_text, MessageResolver};
pub use source::{BundledRegistries, RegistrySource, ServiceRegistrySource, REGISTRIES_URI};
