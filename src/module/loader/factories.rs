//! Factory registry resolver
//!
//! Maps source references to known [`ModuleFactory`] implementations.
//! Entries are either ready factories or deferred constructors that produce
//! a factory asynchronously. Lookups go through an alias table first, the
//! way a module loader maps ids to paths, then relative references are
//! placed under the optional base path.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::module::manager::Initr;
use crate::module::registry::descriptor::Dependency;
use crate::module::scope::ElementSet;
use crate::module::traits::{Component, ModuleError, ModuleFactory, SourceResolver};
use crate::utils::with_custom_timeout;

type DeferredFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn ModuleFactory>, ModuleError>> + Send + Sync>;

#[derive(Clone)]
enum FactoryEntry {
    Ready(Arc<dyn ModuleFactory>),
    Deferred(DeferredFactory),
}

/// Closure-backed factory
pub struct FnFactory<F> {
    name: String,
    construct: F,
}

impl<F> ModuleFactory for FnFactory<F>
where
    F: Fn(&Dependency, &ElementSet, &Initr) -> Result<Arc<dyn Component>, ModuleError>
        + Send
        + Sync,
{
    fn construct(
        &self,
        dependency: &Dependency,
        elements: &ElementSet,
        loader: &Initr,
    ) -> Result<Arc<dyn Component>, ModuleError> {
        (self.construct)(dependency, elements, loader)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build a named factory from a closure
pub fn factory_fn<F>(name: impl Into<String>, construct: F) -> FnFactory<F>
where
    F: Fn(&Dependency, &ElementSet, &Initr) -> Result<Arc<dyn Component>, ModuleError>
        + Send
        + Sync,
{
    FnFactory {
        name: name.into(),
        construct,
    }
}

/// Registry of known factories, usable as a [`SourceResolver`]
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, FactoryEntry>>,
    aliases: HashMap<String, String>,
    base_path: Option<String>,
    timeout: Option<Duration>,
}

impl FactoryRegistry {
    /// Create an empty registry with no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry using resolver configuration (aliases, timeout)
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            aliases: config.aliases.clone(),
            base_path: config.base_path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Fail deferred resolutions that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Map `reference` to `target` before lookup
    pub fn with_alias(mut self, reference: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(reference.into(), target.into());
        self
    }

    /// Resolve relative references under `base` (e.g. "javascript/")
    ///
    /// Factories are looked up under the joined path first, then under the
    /// reference as written.
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Register a ready factory under `reference`
    pub fn register<M>(&self, reference: impl Into<String>, factory: M)
    where
        M: ModuleFactory + 'static,
    {
        self.insert(reference.into(), FactoryEntry::Ready(Arc::new(factory)));
    }

    /// Register a closure factory under `reference`
    pub fn register_fn<F>(&self, reference: impl Into<String>, construct: F)
    where
        F: Fn(&Dependency, &ElementSet, &Initr) -> Result<Arc<dyn Component>, ModuleError>
            + Send
            + Sync
            + 'static,
    {
        let reference = reference.into();
        let factory = factory_fn(reference.clone(), construct);
        self.insert(reference, FactoryEntry::Ready(Arc::new(factory)));
    }

    /// Register a factory that is produced asynchronously on each resolve
    pub fn register_deferred<F, Fut>(&self, reference: impl Into<String>, make: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn ModuleFactory>, ModuleError>> + Send + 'static,
    {
        let deferred: DeferredFactory = Arc::new(move || make().boxed());
        self.insert(reference.into(), FactoryEntry::Deferred(deferred));
    }

    /// Is `reference` (after aliasing and base path) known?
    pub fn contains(&self, reference: &str) -> bool {
        self.find(reference).is_some()
    }

    /// Registered references
    pub fn references(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn insert(&self, reference: String, entry: FactoryEntry) {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.insert(reference.clone(), entry).is_some() {
            warn!("Factory {} registered twice, replacing", reference);
        }
    }

    fn canonical<'a>(&'a self, reference: &'a str) -> &'a str {
        self.aliases
            .get(reference)
            .map(String::as_str)
            .unwrap_or(reference)
    }

    /// Path of `reference` under the base path, if it is relative
    fn rooted(&self, reference: &str) -> Option<String> {
        let base = self.base_path.as_deref()?.trim_end_matches('/');
        if base.is_empty() || reference.starts_with('/') || reference.contains("://") {
            return None;
        }
        Some(format!("{}/{}", base, reference))
    }

    fn find(&self, reference: &str) -> Option<FactoryEntry> {
        let target = self.canonical(reference);
        let factories = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        self.rooted(target)
            .and_then(|path| factories.get(&path).cloned())
            .or_else(|| factories.get(target).cloned())
    }
}

#[async_trait]
impl SourceResolver for FactoryRegistry {
    async fn resolve(&self, reference: &str) -> Result<Arc<dyn ModuleFactory>, ModuleError> {
        let pending = match self.find(reference) {
            None => return Err(ModuleError::UnresolvedSource(reference.to_string())),
            Some(FactoryEntry::Ready(factory)) => {
                debug!("Resolved {} -> {}", reference, factory.name());
                return Ok(factory);
            }
            Some(FactoryEntry::Deferred(make)) => make(),
        };

        match self.timeout {
            Some(limit) => with_custom_timeout(pending, limit)
                .await
                .map_err(|_| ModuleError::ResolveTimeout {
                    reference: reference.to_string(),
                    after: limit,
                })?,
            None => pending.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug)]
    struct Unit;

    impl Component for Unit {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn unit_factory(
        _: &Dependency,
        _: &ElementSet,
        _: &Initr,
    ) -> Result<Arc<dyn Component>, ModuleError> {
        Ok(Arc::new(Unit))
    }

    #[tokio::test]
    async fn test_resolve_registered() {
        let registry = FactoryRegistry::new();
        registry.register_fn("unit", unit_factory);

        assert!(registry.contains("unit"));
        let factory = registry.resolve("unit").await.unwrap();
        assert_eq!(factory.name(), "unit");
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let registry = FactoryRegistry::new();
        let result = registry.resolve("nope").await;
        assert!(matches!(result, Err(ModuleError::UnresolvedSource(r)) if r == "nope"));
    }

    #[tokio::test]
    async fn test_resolve_through_alias() {
        let registry = FactoryRegistry::new().with_alias("app.yourModule.js", "your-module");
        registry.register_fn("your-module", unit_factory);

        assert!(registry.contains("app.yourModule.js"));
        let factory = registry.resolve("app.yourModule.js").await.unwrap();
        assert_eq!(factory.name(), "your-module");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_timeout() {
        let registry = FactoryRegistry::new().with_timeout(Duration::from_millis(50));
        registry.register_deferred("slow", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let factory: Arc<dyn ModuleFactory> = Arc::new(factory_fn("slow", unit_factory));
            Ok(factory)
        });

        let result = registry.resolve("slow").await;
        assert!(matches!(
            result,
            Err(ModuleError::ResolveTimeout { after, .. }) if after == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_deferred_without_timeout() {
        let registry = FactoryRegistry::new();
        registry.register_deferred("later", || async {
            tokio::task::yield_now().await;
            let factory: Arc<dyn ModuleFactory> = Arc::new(factory_fn("later", unit_factory));
            Ok(factory)
        });

        let factory = registry.resolve("later").await.unwrap();
        assert_eq!(factory.name(), "later");
    }

    #[tokio::test]
    async fn test_resolve_under_base_path() {
        let registry = FactoryRegistry::new()
            .with_base_path("javascript/")
            .with_alias("datepicker", "vendor/jquery-ui.js");
        registry.register_fn("javascript/vendor/jquery-ui.js", unit_factory);
        registry.register_fn("javascript/app.yourModule.js", unit_factory);
        registry.register_fn("builtin", unit_factory);

        assert_eq!(
            registry.resolve("datepicker").await.unwrap().name(),
            "javascript/vendor/jquery-ui.js"
        );
        assert_eq!(
            registry.resolve("app.yourModule.js").await.unwrap().name(),
            "javascript/app.yourModule.js"
        );
        // Falls back to the reference as written
        assert_eq!(registry.resolve("builtin").await.unwrap().name(), "builtin");
        assert!(!registry.contains("/app.yourModule.js"));
        assert_eq!(registry.rooted("https://cdn/x.js"), None);
    }

    #[test]
    fn test_from_config() {
        let mut config = ResolverConfig::default();
        config.timeout_ms = Some(12_000);
        config.base_path = Some("javascript".to_string());
        config
            .aliases
            .insert("datepicker".to_string(), "vendor/jquery-ui".to_string());

        let registry = FactoryRegistry::from_config(&config);
        assert_eq!(registry.timeout, Some(Duration::from_millis(12_000)));
        assert_eq!(registry.canonical("datepicker"), "vendor/jquery-ui");
        assert_eq!(registry.canonical("other"), "other");
        assert_eq!(
            registry.rooted("other").as_deref(),
            Some("javascript/other")
        );
    }
}
