//! Process- or session-scoped registry cache.
//!
//! Entries are written once per key and never expire. Concurrent misses
//! for the same key may both fetch; the last insert wins. Readers always
//! see a complete entry because values are swapped in whole.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::message::MessageId;
use crate::types::registry::MessageRegistry;

/// Identifies a registry by name and major version.
///
/// A key without a major version matches whatever version the source
/// returns for that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryKey {
    /// Registry name (`RegistryPrefix`).
    pub name: String,
    /// Major version.
    pub major: Option<u32>,
}

impl RegistryKey {
    /// Creates a key.
    pub fn new(name: impl Into<String>, major: Option<u32>) -> Self {
        Self {
            name: name.into(),
            major,
        }
    }

    /// Returns `true` if `registry` satisfies this key.
    pub fn matches(&self, registry: &MessageRegistry) -> bool {
        registry.registry_prefix == self.name
            && self
                .major
                .is_none_or(|major| registry.major_version() == Some(major))
    }
}

impl From<&MessageId> for RegistryKey {
    fn from(id: &MessageId) -> Self {
        Self::new(id.registry.clone(), id.major)
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.major {
            Some(major) => write!(f, "{}.{}", self.name, major),
            None => f.write_str(&self.name),
        }
    }
}

/// A cached lookup result.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// The registry was fetched.
    Loaded(Arc<MessageRegistry>),
    /// The registry could not be obtained; do not fetch again.
    Unresolved,
}

impl CacheEntry {
    /// The registry, if it was loaded.
    pub fn registry(&self) -> Option<&Arc<MessageRegistry>> {
        match self {
            Self::Loaded(registry) => Some(registry),
            Self::Unresolved => None,
        }
    }
}

/// Memoizing registry cache shared by resolvers and verifiers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tacklebox::registry::{CacheEntry, RegistryCache, RegistryKey};
///
/// let cache = Arc::new(RegistryCache::new());
/// let key = RegistryKey::new("Contoso", Some(1));
/// cache.insert(key.clone(), CacheEntry::Unresolved);
/// assert!(cache.get(&key).unwrap().registry().is_none());
/// ```
#[derive(Debug, Default)]
pub struct RegistryCache {
    entries: DashMap<RegistryKey, CacheEntry>,
}

impl RegistryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the entry for `key`. The shard lock is released
    /// before returning.
    pub fn get(&self, key: &RegistryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores `entry`, replacing any previous one.
    pub fn insert(&self, key: RegistryKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Number of cached keys, resolved or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
