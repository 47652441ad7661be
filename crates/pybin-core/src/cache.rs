//! Derivation cache
//!
//! Maps (original address, strategy) to a persisted artifact, invoking the
//! strategy at most once per key. Concurrent first-time requests for one key
//! queue on a per-key flight gate and share the published result.

use crate::config::AppConfig;
use crate::error::{DeriveError, DeriveResult, StartupError};
use bytes::Bytes;
use dashmap::DashMap;
use pybin_format::StrategyRegistry;
use pybin_store::{ArtifactKey, CachedStore, ContentHash, ContentStore, FsStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Requests served from a stored artifact
    pub hits: u64,
    /// Requests that found no artifact on the fast path
    pub misses: u64,
    /// Strategy invocations
    pub computations: u64,
    /// Strategy invocations that failed
    pub failures: u64,
    /// Keys with a computation currently in progress or queued
    pub in_flight: u64,
}

impl CacheStats {
    /// Fraction of derived requests answered without a strategy call
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

type Gates = DashMap<ArtifactKey, Arc<Mutex<()>>>;

/// Formatter result cache
///
/// # Guarantees
/// - a stored artifact is returned as is, without consulting its strategy
/// - a strategy runs at most once per key while it keeps succeeding
/// - failed runs store nothing, so the next request retries
#[derive(Debug)]
pub struct DerivationCache {
    store: Arc<dyn ContentStore>,
    registry: Arc<StrategyRegistry>,
    gates: Gates,
    counters: Counters,
}

impl DerivationCache {
    /// Create cache over `store` serving strategies from `registry`
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            store,
            registry,
            gates: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Wire store and registry from configuration
    ///
    /// Creates the store root, then builds the registry (locating every
    /// external tool and running health checks).
    ///
    /// # Errors
    /// Any [`StartupError`]; all of them are fatal.
    pub async fn open(config: &AppConfig) -> Result<Self, StartupError> {
        let fs = FsStore::new(&config.store.root);
        fs.ensure_root().await?;

        let store: Arc<dyn ContentStore> = match config.store.memory_capacity_bytes {
            0 => Arc::new(fs),
            bytes => Arc::new(CachedStore::new(fs, bytes)),
        };
        let registry = StrategyRegistry::from_config(&config.formatters)?;

        tracing::info!(
            root = %config.store.root.display(),
            strategies = registry.len(),
            "derivation cache ready"
        );
        Ok(Self::new(store, Arc::new(registry)))
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Strategy registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Names of all registered strategies
    #[must_use]
    pub fn strategy_names(&self) -> BTreeSet<String> {
        self.registry.names()
    }

    /// Key under which the (original, strategy) artifact lives
    ///
    /// `None` names the original itself.
    ///
    /// # Errors
    /// A name that can never be a registry key yields
    /// [`DeriveError::UnknownStrategy`].
    pub fn derive_key(original: &ContentHash, strategy: Option<&str>) -> DeriveResult<ArtifactKey> {
        match strategy {
            None => Ok(ArtifactKey::original(*original)),
            Some(name) => ArtifactKey::derived(*original, name)
                .map_err(|_| DeriveError::UnknownStrategy(name.to_string())),
        }
    }

    /// Return the artifact for (original, strategy), computing it on a miss
    ///
    /// # Errors
    /// - [`DeriveError::UnknownStrategy`] for unregistered names
    /// - [`DeriveError::OriginalMissing`] when nothing is stored at `original`
    /// - [`DeriveError::StrategyExecutionFailed`] / [`DeriveError::StrategyTimeout`]
    ///   when the strategy fails (nothing is stored)
    /// - [`DeriveError::Store`] for store failures
    #[tracing::instrument(skip(self), fields(address = %original.short()))]
    pub async fn derive(&self, original: &ContentHash, strategy: Option<&str>) -> DeriveResult<Bytes> {
        let Some(name) = strategy else {
            return self.read_original(original).await;
        };
        let key = Self::derive_key(original, strategy)?;

        if self.store.exists(&key).await? {
            Counters::bump(&self.counters.hits);
            tracing::debug!(%key, "cache hit");
            return Ok(self.store.read(&key).await?);
        }

        let strategy = self
            .registry
            .get(name)
            .ok_or_else(|| DeriveError::UnknownStrategy(name.to_string()))?;
        Counters::bump(&self.counters.misses);

        let _gate = FlightGate::acquire(&self.gates, key.clone()).await;

        // Another caller may have published while this one waited
        if self.store.exists(&key).await? {
            Counters::bump(&self.counters.hits);
            tracing::debug!(%key, "artifact published while queued");
            return Ok(self.store.read(&key).await?);
        }

        let source = self.read_original(original).await?;
        Counters::bump(&self.counters.computations);
        let formatted = match strategy.format(&source).await {
            Ok(formatted) => formatted,
            Err(e) => {
                Counters::bump(&self.counters.failures);
                tracing::warn!(%key, error = %e, "strategy failed");
                return Err(e.into());
            }
        };

        self.store.write(&key, &formatted).await?;
        tracing::info!(%key, bytes = formatted.len(), "published artifact");
        Ok(Bytes::from(formatted))
    }

    /// Snapshot of counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computations: self.counters.computations.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            in_flight: self.gates.len() as u64,
        }
    }

    async fn read_original(&self, original: &ContentHash) -> DeriveResult<Bytes> {
        match self.store.read(&ArtifactKey::original(*original)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_not_found() => Err(DeriveError::OriginalMissing(*original)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Held per key while its artifact is computed
///
/// The map entry is removed when the last holder or waiter lets go.
struct FlightGate<'a> {
    gates: &'a Gates,
    key: ArtifactKey,
    lock: Arc<Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl<'a> FlightGate<'a> {
    async fn acquire(gates: &'a Gates, key: ArtifactKey) -> FlightGate<'a> {
        let lock = Arc::clone(&gates.entry(key.clone()).or_default());
        let mut gate = Self {
            gates,
            key,
            lock,
            held: None,
        };
        gate.held = Some(Arc::clone(&gate.lock).lock_owned().await);
        gate
    }
}

impl Drop for FlightGate<'_> {
    fn drop(&mut self) {
        self.held.take();
        // Map entry plus this gate's handle
        self.gates
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pybin_format::Pep8Fixer;
    use pybin_store::MemoryStore;

    async fn cache_with_original(text: &str) -> (DerivationCache, ContentHash) {
        let store = Arc::new(MemoryStore::new());
        let address = ContentHash::compute(text.as_bytes());
        store
            .write(&ArtifactKey::original(address), text.as_bytes())
            .await
            .unwrap();
        let registry = StrategyRegistry::builder()
            .register(Pep8Fixer::new())
            .build()
            .unwrap();
        (DerivationCache::new(store, Arc::new(registry)), address)
    }

    #[test]
    fn derive_key_for_original() {
        let address = ContentHash::compute(b"x");
        assert_eq!(
            DerivationCache::derive_key(&address, None).unwrap(),
            ArtifactKey::original(address)
        );
        assert_eq!(
            DerivationCache::derive_key(&address, Some("pep8")).unwrap(),
            ArtifactKey::derived(address, "pep8").unwrap()
        );
    }

    #[test]
    fn derive_key_rejects_unusable_names() {
        let address = ContentHash::compute(b"x");
        let err = DerivationCache::derive_key(&address, Some("../etc")).unwrap_err();
        assert!(matches!(err, DeriveError::UnknownStrategy(_)));
    }

    #[tokio::test]
    async fn stats_track_hits_and_misses() {
        let (cache, address) = cache_with_original("x=1").await;

        cache.derive(&address, Some("pep8")).await.unwrap();
        cache.derive(&address, Some("pep8")).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.in_flight, 0);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn original_missing() {
        let (cache, _) = cache_with_original("x=1").await;
        let absent = ContentHash::compute(b"absent");

        let err = cache.derive(&absent, None).await.unwrap_err();
        assert!(matches!(err, DeriveError::OriginalMissing(a) if a == absent));

        let err = cache.derive(&absent, Some("pep8")).await.unwrap_err();
        assert!(matches!(err, DeriveError::OriginalMissing(_)));
    }

    #[test]
    fn empty_stats_hit_rate() {
        assert!(CacheStats::default().hit_rate().abs() < f64::EPSILON);
    }
}
