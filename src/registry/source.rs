//! Where registry documents come from.

use async_trait::async_trait;
use serde_json::Value;

use super::cache::RegistryKey;
use crate::client::Transport;
use crate::error::{Error, Result};
use crate::types::registry::MessageRegistry;

const BUNDLED_BASE: &str = include_str!("bundled/Base.1.16.0.json");
const BUNDLED_TASK_EVENT: &str = include_str!("bundled/TaskEvent.1.0.3.json");

/// Default registries collection on a Redfish service.
pub const REGISTRIES_URI: &str = "/redfish/v1/Registries";

/// Supplies registry documents on a cache miss.
///
/// `Ok(None)` means the source does not know the registry. Both `Ok(None)`
/// and `Err` are cached as unresolved by the resolver.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Fetches the registry identified by `key`.
    async fn fetch(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>>;
}

/// Registries shipped with the crate: a subset of DMTF `Base.1` and
/// `TaskEvent.1`.
#[derive(Debug, Clone)]
pub struct BundledRegistries {
    registries: Vec<MessageRegistry>,
}

impl BundledRegistries {
    /// Loads the bundled standard registries.
    pub fn standard() -> Self {
        let registries = [BUNDLED_BASE, BUNDLED_TASK_EVENT]
            .into_iter()
            .filter_map(|doc| match serde_json::from_str(doc) {
                Ok(registry) => Some(registry),
                Err(err) => {
                    tracing::error!(error = %err, "bundled registry does not parse");
                    None
                },
            })
            .collect();
        Self { registries }
    }

    /// A bundle holding exactly `registries`.
    pub fn from_registries(registries: Vec<MessageRegistry>) -> Self {
        Self { registries }
    }

    /// Finds a bundled registry satisfying `key`.
    pub fn find(&self, key: &RegistryKey) -> Option<&MessageRegistry> {
        self.registries.iter().find(|r| key.matches(r))
    }
}

impl Default for BundledRegistries {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
impl RegistrySource for BundledRegistries {
    async fn fetch(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>> {
        Ok(self.find(key).cloned())
    }
}

/// Fetches registries from the service, falling back to the bundled set.
///
/// Lookup order:
/// 1. `GET {registries}/{Name}`;
/// 2. on failure, scan the registries collection for the member named
///    `{Name}.{Major}.*` with the highest version;
/// 3. a `MessageRegistryFile` is followed through `Location[].Uri`
///    (language `en` preferred), then `PublicationUri`.
#[derive(Debug, Clone)]
pub struct ServiceRegistrySource<T> {
    transport: T,
    registries_uri: String,
    bundled: BundledRegistries,
}

impl<T: Transport> ServiceRegistrySource<T> {
    /// Creates a source reading `/redfish/v1/Registries` through `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            registries_uri: REGISTRIES_URI.to_string(),
            bundled: BundledRegistries::standard(),
        }
    }

    /// Overrides the registries collection URI.
    pub fn with_registries_uri(mut self, uri: impl Into<String>) -> Self {
        self.registries_uri = uri.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the fallback bundle.
    pub fn with_bundled(mut self, bundled: BundledRegistries) -> Self {
        self.bundled = bundled;
        self
    }

    async fn get_json(&self, uri: &str) -> Result<Option<Value>> {
        let response = self.transport.get(uri).await?;
        if !response.status.is_success() {
            tracing::debug!(uri, status = %response.status, "registry lookup miss");
            return Ok(None);
        }
        response
            .json()
            .map_err(|e| Error::transport(uri, format!("invalid JSON: {}", e)))
    }

    async fn find_in_collection(&self, key: &RegistryKey) -> Result<Option<Value>> {
        let Some(collection) = self.get_json(&self.registries_uri).await? else {
            return Ok(None);
        };
        let prefix = match key.major {
            Some(major) => format!("{}.{}.", key.name, major),
            None => format!("{}.", key.name),
        };
        let member = collection
            .get("Members")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|m| m.get("@odata.id").and_then(Value::as_str))
            .filter_map(|uri| {
                let last = uri.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
                if last == key.name {
                    Some((Vec::new(), uri))
                } else if last.starts_with(&prefix) {
                    let version = last.get(key.name.len() + 1..).unwrap_or_default();
                    Some((member_version(version), uri))
                } else {
                    None
                }
            })
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, uri)| uri);
        match member {
            Some(uri) => self.get_json(uri).await,
            None => Ok(None),
        }
    }

    async fn follow_registry_file(&self, file: &Value) -> Result<Option<Value>> {
        let locations = file
            .get("Location")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let preferred = locations
            .iter()
            .find(|l| l.get("Language").and_then(Value::as_str) == Some("en"))
            .or_else(|| locations.first());

        let Some(location) = preferred else {
            return Ok(None);
        };
        for field in ["Uri", "PublicationUri"] {
            if let Some(uri) = location.get(field).and_then(Value::as_str) {
                if let Some(doc) = self.get_json(uri).await? {
                    return Ok(Some(doc));
                }
            }
        }
        Ok(None)
    }

    async fn fetch_from_service(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>> {
        let direct = format!("{}/{}", self.registries_uri, key.name);
        let doc = match self.get_json(&direct).await? {
            Some(doc) => Some(doc),
            None => self.find_in_collection(key).await?,
        };
        let Some(mut doc) = doc else {
            return Ok(None);
        };

        if doc.get("Messages").is_none() {
            match self.follow_registry_file(&doc).await? {
                Some(registry) => doc = registry,
                None => return Ok(None),
            }
        }

        let registry: MessageRegistry = serde_json::from_value(doc)
            .map_err(|e| Error::transport(&direct, format!("invalid registry: {}", e)))?;
        if key.matches(&registry) {
            Ok(Some(registry))
        } else {
            tracing::debug!(
                key = %key,
                found = %registry.id,
                "service registry does not match requested version"
            );
            Ok(None)
        }
    }
}

/// Numeric version segments of a collection member name; segments that
/// are not numbers count as 0.
fn member_version(version: &str) -> Vec<u32> {
    version.split('.').map(|part| part.parse().unwrap_or(0)).collect()
}

#[async_trait]
impl<T: Transport> RegistrySource for ServiceRegistrySource<T> {
    async fn fetch(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>> {
        let from_service = self.fetch_from_service(key).await;
        match from_service {
            Ok(Some(registry)) => return Ok(Some(registry)),
            Ok(None) => {},
            Err(ref err) => {
                tracing::warn!(key = %key, error = %err, "failed to fetch registry from service");
            },
        }

        match self.bundled.find(key) {
            Some(registry) => {
                tracing::debug!(key = %key, "using bundled registry");
                Ok(Some(registry.clone()))
            },
            None => from_service,
        }
    }
}
