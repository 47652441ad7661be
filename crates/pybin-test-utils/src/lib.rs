//! Testing utilities for pybin workspace
//!
//! Stub strategies and seeded stores shared by integration tests.

#![allow(missing_docs)]

use pybin_core::DerivationCache;
use pybin_format::{ExecutionMode, FormatError, FormatStrategy, StrategyRegistry};
use pybin_store::{ArtifactKey, ContentHash, ContentStore, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Strategy that records how often it ran
#[derive(Debug, Clone)]
pub struct CountingStrategy {
    name: String,
    calls: Arc<AtomicUsize>,
    output: Option<Vec<u8>>,
    delay: Option<Duration>,
}

impl CountingStrategy {
    /// Upper-cases its input
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
            output: None,
            delay: None,
        }
    }

    /// Always returns `output`
    pub fn returning(mut self, output: &[u8]) -> Self {
        self.output = Some(output.to_vec());
        self
    }

    /// Sleeps before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter, readable after the strategy moved into a registry
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FormatStrategy for CountingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::InProcess
    }

    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(match &self.output {
            Some(output) => output.clone(),
            None => source.to_ascii_uppercase(),
        })
    }
}

/// How a [`FailingStrategy`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Exit,
    Timeout,
}

/// Strategy that always fails
#[derive(Debug, Clone)]
pub struct FailingStrategy {
    name: String,
    failure: Failure,
    calls: Arc<AtomicUsize>,
}

impl FailingStrategy {
    pub fn new(name: &str, failure: Failure) -> Self {
        Self {
            name: name.to_string(),
            failure,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl FormatStrategy for FailingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::External
    }

    async fn format(&self, _source: &[u8]) -> Result<Vec<u8>, FormatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(match self.failure {
            Failure::Exit => FormatError::execution_failed(&self.name, "exit status: 1"),
            Failure::Timeout => FormatError::Timeout {
                strategy: self.name.clone(),
                after: Duration::from_millis(1),
            },
        })
    }
}

/// Cache over a fresh [`MemoryStore`] serving `strategies`
pub fn memory_cache(strategies: Vec<Arc<dyn FormatStrategy>>) -> (DerivationCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let registry = strategies
        .into_iter()
        .fold(StrategyRegistry::builder(), |builder, strategy| {
            builder.register_arc(strategy)
        })
        .build()
        .unwrap();
    let cache = DerivationCache::new(Arc::clone(&store) as Arc<dyn ContentStore>, Arc::new(registry));
    (cache, store)
}

/// Store `text` as an original and return its address
pub async fn seed_original(store: &dyn ContentStore, text: &str) -> ContentHash {
    let address = ContentHash::compute(text.as_bytes());
    store
        .write(&ArtifactKey::original(address), text.as_bytes())
        .await
        .unwrap();
    address
}
