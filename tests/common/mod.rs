//! Shared fixtures for loader integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use initr::{
    Component, Dependency, ElementSet, FactoryRegistry, HtmlDocument, Initr, InitrOptions,
    LogLevel, MemorySink, ModuleError, ModuleFactory, ModuleRegistry, SourceResolver,
};

/// Page used by most tests
///
/// - `#app` holds two `.datepicker` inputs and one `yourModule` list
/// - `#sidebar` holds one more `.datepicker` and a `.tooltip`
pub const PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <div id="app">
    <input class="datepicker" data-format="yy-mm-dd">
    <input class="datepicker">
    <ul data-plugin="yourModule"><li>one</li><li>two</li></ul>
  </div>
  <div id="sidebar">
    <input class="datepicker">
    <span class="tooltip" title="hi"></span>
  </div>
</body>
</html>"#;

/// Component recording what it was constructed with
#[derive(Debug)]
pub struct Widget {
    pub source: String,
    pub dependency: Option<String>,
    pub elements: usize,
    pub loader_id: String,
}

impl Component for Widget {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory building a [`Widget`] tagged with `source`
pub fn widget_factory(source: &str) -> impl ModuleFactory + 'static {
    let tag = source.to_string();
    initr::factory_fn(source, move |dependency: &Dependency, elements: &ElementSet, loader: &Initr| {
        Ok(Arc::new(Widget {
            source: tag.clone(),
            dependency: dependency.name.clone(),
            elements: elements.len(),
            loader_id: loader.id().to_string(),
        }) as Arc<dyn Component>)
    })
}

/// Resolver counting calls, with optional per-reference delays
pub struct TrackingResolver {
    inner: FactoryRegistry,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl TrackingResolver {
    pub fn new() -> Self {
        Self {
            inner: FactoryRegistry::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Register widget factories for every reference
    pub fn with_widgets(self, references: &[&str]) -> Self {
        for reference in references {
            self.inner.register(*reference, widget_factory(reference));
        }
        self
    }

    /// Register a factory whose construction always fails
    pub fn with_failing(self, reference: &str) -> Self {
        self.inner
            .register_fn(reference, |dependency: &Dependency, _: &ElementSet, _: &Initr| {
                Err(ModuleError::instantiation(
                    dependency.name.as_deref(),
                    "constructor failed",
                ))
            });
        self
    }

    pub fn with_delay(mut self, reference: &str, delay: Duration) -> Self {
        self.delays.insert(reference.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceResolver for TrackingResolver {
    async fn resolve(&self, reference: &str) -> Result<Arc<dyn ModuleFactory>, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(reference.to_string());
        if let Some(delay) = self.delays.get(reference) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.resolve(reference).await
    }
}

/// Loader with its own registry and an in-memory console
pub struct Fixture {
    pub initr: Initr,
    pub registry: ModuleRegistry,
    pub resolver: Arc<TrackingResolver>,
    pub sink: Arc<MemorySink>,
}

impl Fixture {
    pub fn new(resolver: TrackingResolver) -> Self {
        Self::with_options(resolver, InitrOptions::default())
    }

    pub fn with_options(resolver: TrackingResolver, options: InitrOptions) -> Self {
        Self::build(PAGE, resolver, options)
    }

    pub fn build(markup: &str, resolver: TrackingResolver, options: InitrOptions) -> Self {
        let registry = ModuleRegistry::new();
        let resolver = Arc::new(resolver);
        let sink = Arc::new(MemorySink::new());
        let initr = Initr::builder(Arc::new(HtmlDocument::parse(markup)), resolver.clone())
            .options(options)
            .registry(registry.clone())
            .sink(sink.clone())
            .build();

        Self {
            initr,
            registry,
            resolver,
            sink,
        }
    }

    pub fn debug_records(&self) -> usize {
        self.sink.count(LogLevel::Debug)
    }
}

/// Widgets recorded under `name`, in registry order
pub fn widgets(registry: &ModuleRegistry, name: &str) -> Vec<String> {
    registry
        .get(name)
        .map(|entry| {
            entry
                .modules
                .iter()
                .filter_map(|m| m.downcast_ref::<Widget>())
                .map(|w| w.source.clone())
                .collect()
        })
        .unwrap_or_default()
}
