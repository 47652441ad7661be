//! Strategy registry
//!
//! Provides [`StrategyRegistry`], the immutable name → strategy map built
//! once at startup through [`RegistryBuilder`].

use crate::config::FormatterConfig;
use crate::error::FormatError;
use crate::strategy::FormatStrategy;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Immutable registry of named formatter strategies
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn FormatStrategy>>,
}

impl StrategyRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build registry from configuration
    ///
    /// # Errors
    /// Fails when a strategy definition is invalid, a tool is missing or a
    /// health check fails.
    pub fn from_config(config: &FormatterConfig) -> Result<Self, FormatError> {
        config
            .build_strategies()?
            .into_iter()
            .fold(Self::builder(), RegistryBuilder::register_arc)
            .build()
    }

    /// Look up strategy by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FormatStrategy>> {
        self.strategies.get(name)
    }

    /// Check if strategy exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// All registered names
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.strategies.keys().cloned().collect()
    }

    /// Iterate strategies in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FormatStrategy>> {
        self.strategies.values()
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Collects strategies and validates them into a [`StrategyRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    pending: Vec<Arc<dyn FormatStrategy>>,
}

impl RegistryBuilder {
    /// Add a strategy
    #[must_use]
    pub fn register<S: FormatStrategy + 'static>(self, strategy: S) -> Self {
        self.register_arc(Arc::new(strategy))
    }

    /// Add an already shared strategy
    #[must_use]
    pub fn register_arc(mut self, strategy: Arc<dyn FormatStrategy>) -> Self {
        self.pending.push(strategy);
        self
    }

    /// Validate names, reject duplicates and run health checks
    ///
    /// # Errors
    /// - [`FormatError::InvalidName`] for names outside `[a-z0-9_-]{1,64}`
    /// - [`FormatError::DuplicateStrategy`] when a name is registered twice
    /// - whatever a strategy's `health_check` returns
    #[tracing::instrument(skip(self), fields(count = self.pending.len()))]
    pub fn build(self) -> Result<StrategyRegistry, FormatError> {
        let mut strategies = BTreeMap::new();

        for strategy in self.pending {
            let name = strategy.name().to_string();
            pybin_store::validate_tag(&name).map_err(|source| FormatError::InvalidName {
                name: name.clone(),
                source,
            })?;
            if strategies.contains_key(&name) {
                return Err(FormatError::DuplicateStrategy(name));
            }
            strategy.health_check()?;
            tracing::info!(strategy = %name, mode = %strategy.mode(), "registered strategy");
            strategies.insert(name, strategy);
        }

        Ok(StrategyRegistry { strategies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pep8::Pep8Fixer;
    use crate::strategy::ExecutionMode;
    use crate::unify::QuoteUnifier;

    #[derive(Debug)]
    struct Named(&'static str);

    #[async_trait::async_trait]
    impl FormatStrategy for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn mode(&self) -> ExecutionMode {
            ExecutionMode::InProcess
        }

        async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
            Ok(source.to_vec())
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait::async_trait]
    impl FormatStrategy for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn mode(&self) -> ExecutionMode {
            ExecutionMode::External
        }

        async fn format(&self, _source: &[u8]) -> Result<Vec<u8>, FormatError> {
            unreachable!("never registered")
        }

        fn health_check(&self) -> Result<(), FormatError> {
            Err(FormatError::HealthCheckFailed {
                strategy: "broken".to_string(),
                reason: "binary vanished".to_string(),
            })
        }
    }

    #[test]
    fn test_lookup() {
        let registry = StrategyRegistry::builder()
            .register(Pep8Fixer::new())
            .register(QuoteUnifier::default())
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("pep8"));
        assert!(registry.get("unify").is_some());
        assert!(registry.get("black").is_none());
        assert_eq!(
            registry.names().into_iter().collect::<Vec<_>>(),
            vec!["pep8".to_string(), "unify".to_string()]
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = StrategyRegistry::builder()
            .register(Named("dup"))
            .register(Named("dup"))
            .build()
            .unwrap_err();
        assert!(matches!(err, FormatError::DuplicateStrategy(ref n) if n == "dup"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        for bad in ["", "Pep8", "a/b", "x.py"] {
            let err = StrategyRegistry::builder()
                .register(Named(bad))
                .build()
                .unwrap_err();
            assert!(matches!(err, FormatError::InvalidName { .. }), "{bad}");
        }
    }

    #[test]
    fn test_health_check_runs_at_build() {
        let err = StrategyRegistry::builder()
            .register(Broken)
            .build()
            .unwrap_err();
        assert!(matches!(err, FormatError::HealthCheckFailed { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = StrategyRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
