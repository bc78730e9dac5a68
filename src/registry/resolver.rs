//! Resolves registry-qualified messages into rendered text.

use std::fmt;
use std::sync::Arc;

use super::cache::{CacheEntry, RegistryCache, RegistryKey};
use super::source::{BundledRegistries, RegistrySource};
use crate::types::message::{DecodedMessage, MessageId, Severity};
use crate::types::registry::{MessageRegistry, RegistryMessage};

/// Resolves `(MessageId, args)` pairs against cached registries.
///
/// Resolution never fails: an unknown registry or key yields a
/// [`DecodedMessage`] whose text is the bare key and whose severity is
/// `Warning`.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use tacklebox::registry::MessageResolver;
/// use tacklebox::Severity;
///
/// let resolver = MessageResolver::bundled();
/// let message = resolver
///     .resolve("Base.1.8.PropertyUnknown", &["Foo".to_string()])
///     .await;
/// assert_eq!(message.severity, Severity::Warning);
/// assert_eq!(
///     message.text,
///     "The property Foo is not in the list of valid properties for the resource."
/// );
/// # }
/// ```
#[derive(Clone)]
pub struct MessageResolver {
    cache: Arc<RegistryCache>,
    source: Arc<dyn RegistrySource>,
}

impl fmt::Debug for MessageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageResolver")
            .field("cached_registries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl MessageResolver {
    /// Creates a resolver with its own cache.
    pub fn new(source: impl RegistrySource + 'static) -> Self {
        Self::with_cache(source, Arc::new(RegistryCache::new()))
    }

    /// Creates a resolver sharing `cache` with other resolvers.
    pub fn with_cache(source: impl RegistrySource + 'static, cache: Arc<RegistryCache>) -> Self {
        Self {
            cache,
            source: Arc::new(source),
        }
    }

    /// A resolver backed only by the bundled registries.
    pub fn bundled() -> Self {
        Self::new(BundledRegistries::standard())
    }

    /// The cache used by this resolver.
    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    /// Returns the registry for `key`, fetching and caching it on a miss.
    pub async fn registry(&self, key: &RegistryKey) -> Option<Arc<MessageRegistry>> {
        if let Some(entry) = self.cache.get(key) {
            return entry.registry().cloned();
        }

        let entry = match self.source.fetch(key).await {
            Ok(Some(registry)) => {
                tracing::debug!(key = %key, id = %registry.id, "cached message registry");
                CacheEntry::Loaded(Arc::new(registry))
            },
            Ok(None) => {
                tracing::warn!(key = %key, "message registry not available");
                CacheEntry::Unresolved
            },
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "message registry fetch failed");
                CacheEntry::Unresolved
            },
        };
        let registry = entry.registry().cloned();
        self.cache.insert(key.clone(), entry);
        registry
    }

    /// Looks up the template for `id`.
    pub async fn lookup(&self, id: &MessageId) -> Option<RegistryMessage> {
        let registry = self.registry(&RegistryKey::from(id)).await?;
        let template = registry.message(&id.key).cloned();
        if template.is_none() {
            tracing::debug!(message_id = %id, "message key not found in registry");
        }
        template
    }

    /// Resolves `message_id` with positional `args`.
    pub async fn resolve(&self, message_id: &str, args: &[String]) -> DecodedMessage {
        let parsed = MessageId::parse(message_id);
        let template = match &parsed {
            Some(id) => self.lookup(id).await,
            None => None,
        };

        match template {
            Some(template) => DecodedMessage {
                id: message_id.to_string(),
                severity: template.default_severity().unwrap_or(Severity::Warning),
                text: template.render(args),
                resolution: template.render_resolution(args),
            },
            None => {
                let key = parsed.as_ref().map_or(message_id, |id| id.key.as_str());
                DecodedMessage {
                    id: message_id.to_string(),
                    severity: Severity::Warning,
                    text: fallback_text(key, args),
                    resolution: None,
                }
            },
        }
    }
}

/// Text used when no template is available: the bare key, followed by the
/// raw arguments when there are any.
pub fn fallback_text(key: &str, args: &[String]) -> String {
    if args.is_empty() {
        key.to_string()
    } else {
        format!("{}: {}", key, args.join(", "))
    }
}
