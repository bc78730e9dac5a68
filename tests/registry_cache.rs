//! Integration tests for registry caching across resolvers and tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tacklebox::registry::{
    BundledRegistries, CacheEntry, MessageResolver, RegistryCache, RegistryKey, RegistrySource,
};
use tacklebox::types::MessageRegistry;
use tacklebox::{Result, Severity};

/// Counts fetches and answers after a short delay, so concurrent misses
/// overlap.
struct CountingSource {
    inner: BundledRegistries,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new() -> Arc<Self> {
        let contoso: MessageRegistry = serde_json::from_value(json!({
            "Id": "Contoso.1.0.0",
            "RegistryPrefix": "Contoso",
            "RegistryVersion": "1.0.0",
            "Messages": {
                "DriveRebuilding": {
                    "Message": "Drive %1 is rebuilding (%2%).",
                    "NumberOfArgs": 2,
                    "MessageSeverity": "Warning"
                }
            }
        }))
        .unwrap();
        Arc::new(Self {
            inner: BundledRegistries::from_registries(vec![contoso]),
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistrySource for CountingSource {
    async fn fetch(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.inner.fetch(key).await
    }
}

#[async_trait]
impl<S: RegistrySource + ?Sized> RegistrySource for Shared<S> {
    async fn fetch(&self, key: &RegistryKey) -> Result<Option<MessageRegistry>> {
        self.0.fetch(key).await
    }
}

/// Lets a test keep a handle on a source it hands to a resolver.
struct Shared<S: ?Sized>(Arc<S>);

mod memoization {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_same_registry_fetched_at_most_once() {
        let source = CountingSource::new();
        let resolver = MessageResolver::new(Shared(Arc::clone(&source)));
        let args = vec!["3".to_string(), "45".to_string()];

        let first = resolver.resolve("Contoso.1.0.DriveRebuilding", &args).await;
        let second = resolver.resolve("Contoso.1.2.DriveRebuilding", &args).await;

        assert_eq!(source.fetches(), 1);
        assert_eq!(first.text, "Drive 3 is rebuilding (45%).");
        assert_eq!(first.severity, Severity::Warning);
        assert_eq!(second.text, first.text);
        assert_eq!(second.id, "Contoso.1.2.DriveRebuilding");
    }

    #[tokio::test]
    async fn test_unresolved_marker_suppresses_refetch() {
        let source = CountingSource::new();
        let resolver = MessageResolver::new(Shared(Arc::clone(&source)));

        for _ in 0..5 {
            let message = resolver.resolve("Fabrikam.3.0.LinkDown", &[]).await;
            assert_eq!(message.text, "LinkDown");
            assert_eq!(message.severity, Severity::Warning);
        }
        assert_eq!(source.fetches(), 1);
        assert!(matches!(
            resolver.cache().get(&RegistryKey::new("Fabrikam", Some(3))),
            Some(CacheEntry::Unresolved)
        ));
    }

    #[tokio::test]
    async fn test_major_versions_are_cached_separately() {
        let source = CountingSource::new();
        let resolver = MessageResolver::new(Shared(Arc::clone(&source)));

        resolver.resolve("Contoso.1.0.DriveRebuilding", &[]).await;
        let other = resolver.resolve("Contoso.2.0.DriveRebuilding", &[]).await;

        assert_eq!(source.fetches(), 2);
        assert_eq!(other.text, "DriveRebuilding");
        assert_eq!(resolver.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_stub_entry_leaves_rest_of_registry_usable() {
        let registry: MessageRegistry = serde_json::from_value(json!({
            "Id": "Contoso.1.0.0",
            "RegistryPrefix": "Contoso",
            "RegistryVersion": "1.0.0",
            "Messages": {
                "DriveRebuilding": {
                    "Message": "Drive %1 is rebuilding (%2%).",
                    "NumberOfArgs": 2,
                    "MessageSeverity": "Warning"
                },
                "Retired": {"Description": "Deprecated; no longer emitted."}
            }
        }))
        .unwrap();
        let resolver = MessageResolver::new(BundledRegistries::from_registries(vec![registry]));

        let live = resolver
            .resolve("Contoso.1.0.DriveRebuilding", &["3".to_string(), "45".to_string()])
            .await;
        assert_eq!(live.text, "Drive 3 is rebuilding (45%).");
        assert_eq!(live.severity, Severity::Warning);

        let retired = resolver.resolve("Contoso.1.0.Retired", &["x".to_string()]).await;
        assert_eq!(retired.text, "Retired: x");
    }

    #[tokio::test]
    async fn test_cleared_cache_fetches_again() {
        let source = CountingSource::new();
        let resolver = MessageResolver::new(Shared(Arc::clone(&source)));

        resolver.resolve("Contoso.1.0.DriveRebuilding", &[]).await;
        resolver.cache().clear();
        resolver.resolve("Contoso.1.0.DriveRebuilding", &[]).await;
        assert_eq!(source.fetches(), 2);
    }
}

mod concurrency {
    use super::*;
    use futures::future::join_all;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolutions_share_one_cache() {
        let source = CountingSource::new();
        let cache = Arc::new(RegistryCache::new());
        let resolvers: Vec<_> = (0..8)
            .map(|_| MessageResolver::with_cache(Shared(Arc::clone(&source)), Arc::clone(&cache)))
            .collect();

        let handles = resolvers.into_iter().enumerate().map(|(i, resolver)| {
            tokio::spawn(async move {
                resolver
                    .resolve("Contoso.1.0.DriveRebuilding", &[i.to_string(), "10".into()])
                    .await
            })
        });
        let messages: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.text, format!("Drive {i} is rebuilding (10%)."));
        }
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&RegistryKey::new("Contoso", Some(1)))
            .unwrap()
            .registry()
            .is_some());
        // Racing misses may fetch redundantly, never more than once per caller.
        assert!((1..=8).contains(&source.fetches()));

        let after = source.fetches();
        let late = MessageResolver::with_cache(Shared(Arc::clone(&source)), cache);
        late.resolve("Contoso.1.0.DriveRebuilding", &[]).await;
        assert_eq!(source.fetches(), after);
    }
}
