//! Loader instance orchestrating dependency loading
//!
//! `Initr` runs the pipeline for every dependency it is given:
//! match the selector in scope, optionally validate and init, resolve the
//! sources, construct one instance per source and record the results in the
//! shared registry. Each matching dependency runs as its own tokio task, so
//! dependencies finish in no particular order and a failure in one never
//! blocks another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::InitrConfig;
use crate::module::api::events::{EventManager, LoadEvent};
use crate::module::console::{Console, LogLevel, LogSink, TracingSink, TAG};
use crate::module::loader::SourceLoader;
use crate::module::registry::descriptor::{Dependency, DependencyInput};
use crate::module::registry::store::{ModuleRegistry, RegistryEntry};
use crate::module::scope::ElementSet;
use crate::module::traits::{Component, DomQuery, ModuleError, ModuleFactory, SourceResolver};
use crate::utils::current_timestamp;

/// Instance options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitrOptions {
    /// Scope selector; the whole document when `None`
    #[serde(default)]
    pub scope: Option<String>,

    /// Console threshold
    #[serde(default)]
    pub log_level: LogLevel,
}

impl InitrOptions {
    pub fn from_config(config: &InitrConfig) -> Self {
        Self {
            scope: config.scope.clone(),
            log_level: config.log_level(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

/// Outcome of matching one dependency against the scope
enum MatchResult {
    NoSelector,
    NoMatch,
    Invalid(ModuleError),
    Rejected(ElementSet),
    Matched(ElementSet),
}

/// Dry-run status of one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// No selector; never loads
    NoSelector,
    /// Selector matched nothing in scope
    NoMatch,
    /// Selector failed to parse
    InvalidSelector(String),
    /// `validate` returned false
    Rejected,
    /// Matched but nothing to load
    NothingToLoad,
    /// Would resolve and instantiate its sources
    Ready,
}

/// Dry-run report for one dependency
#[derive(Debug, Clone, Serialize)]
pub struct PlannedDependency {
    pub name: Option<String>,
    pub selector: Option<String>,
    pub status: PlanStatus,
    pub element_count: usize,
    pub sources: Vec<String>,
}

/// Result of one spawned dependency
#[derive(Debug)]
pub struct LoadOutcome {
    pub name: Option<String>,
    /// Number of instances recorded, or why nothing was recorded
    pub result: Result<usize, ModuleError>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

enum PendingTask {
    Spawned(JoinHandle<Result<usize, ModuleError>>),
    Failed(ModuleError),
}

struct PendingLoad {
    name: Option<String>,
    task: PendingTask,
}

/// Handle to the dependencies started by one `load` call
///
/// Dropping the handle does not cancel anything; the tasks keep running
/// and still record their results.
pub struct LoadHandle {
    pending: Vec<PendingLoad>,
    skipped: usize,
}

impl LoadHandle {
    /// Dependencies that were started (or failed before starting)
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Dependencies skipped without side effects
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn names(&self) -> Vec<Option<String>> {
        self.pending.iter().map(|p| p.name.clone()).collect()
    }

    /// Wait for every started dependency, in input order
    pub async fn wait(self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            let result = match pending.task {
                PendingTask::Spawned(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(ModuleError::TaskFailed(e.to_string())),
                },
                PendingTask::Failed(e) => Err(e),
            };
            outcomes.push(LoadOutcome {
                name: pending.name,
                result,
            });
        }
        outcomes
    }
}

struct InitrInner {
    id: String,
    options: InitrOptions,
    document: Arc<dyn DomQuery>,
    resolver: Arc<dyn SourceResolver>,
    registry: ModuleRegistry,
    console: Console,
    events: EventManager,
}

/// Conditional module loader
///
/// Cheap to clone; clones are the same instance (same id, same options,
/// same registry).
#[derive(Clone)]
pub struct Initr {
    inner: Arc<InitrInner>,
}

/// Builder for [`Initr`]
pub struct InitrBuilder {
    options: InitrOptions,
    document: Arc<dyn DomQuery>,
    resolver: Arc<dyn SourceResolver>,
    registry: Option<ModuleRegistry>,
    sink: Option<Arc<dyn LogSink>>,
}

impl InitrBuilder {
    pub fn options(mut self, options: InitrOptions) -> Self {
        self.options = options;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.options.scope = Some(scope.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.options.log_level = level;
        self
    }

    /// Use an explicit registry instead of the process-wide one
    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Send console output to `sink` instead of `tracing`
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Initr {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let tag = format!("{}#{}", TAG, &id[..8]);
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let console = Console::with_sink(self.options.log_level, tag, sink);
        console.debug(format_args!("Starting... {:?}", self.options));

        Initr {
            inner: Arc::new(InitrInner {
                id,
                options: self.options,
                document: self.document,
                resolver: self.resolver,
                registry: self.registry.unwrap_or_else(ModuleRegistry::global),
                console,
                events: EventManager::new(),
            }),
        }
    }
}

impl Initr {
    /// Create a loader sharing the process-wide registry
    pub fn new(
        options: InitrOptions,
        document: Arc<dyn DomQuery>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        Self::builder(document, resolver).options(options).build()
    }

    /// Create a loader recording into `registry`
    pub fn with_registry(
        options: InitrOptions,
        document: Arc<dyn DomQuery>,
        resolver: Arc<dyn SourceResolver>,
        registry: ModuleRegistry,
    ) -> Self {
        Self::builder(document, resolver)
            .options(options)
            .registry(registry)
            .build()
    }

    pub fn builder(document: Arc<dyn DomQuery>, resolver: Arc<dyn SourceResolver>) -> InitrBuilder {
        InitrBuilder {
            options: InitrOptions::default(),
            document,
            resolver,
            registry: None,
            sink: None,
        }
    }

    /// Unique id of this instance
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn options(&self) -> &InitrOptions {
        &self.inner.options
    }

    pub fn scope(&self) -> Option<&str> {
        self.inner.options.scope.as_deref()
    }

    pub fn console(&self) -> &Console {
        &self.inner.console
    }

    /// Live handle to the registry this loader records into
    pub fn get_modules(&self) -> ModuleRegistry {
        self.inner.registry.clone()
    }

    /// Subscribe to load events from this instance
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.inner.events.subscribe()
    }

    /// Is `other` the same loader instance?
    pub fn same_instance(&self, other: &Initr) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Load one dependency or a sequence of dependencies
    ///
    /// Dependencies without a selector (absent or blank), or whose selector
    /// matches nothing, are skipped without side effects. Every other
    /// dependency either fails immediately or starts its own task.
    ///
    /// Outside a Tokio runtime, dependencies with sources fail with
    /// [`ModuleError::TaskFailed`] instead of starting.
    pub fn load(&self, input: impl Into<DependencyInput>) -> LoadHandle {
        let mut handle = LoadHandle {
            pending: Vec::new(),
            skipped: 0,
        };

        for dependency in input.into().into_vec() {
            match self.load_object(dependency) {
                Some(pending) => handle.pending.push(pending),
                None => handle.skipped += 1,
            }
        }

        handle
    }

    /// Load from a dynamic value
    ///
    /// Objects and arrays are loaded as in [`load`](Self::load); any other
    /// value is ignored and yields an empty handle.
    pub fn load_value(&self, value: serde_json::Value) -> LoadHandle {
        match DependencyInput::from_value(value) {
            Some(input) => self.load(input),
            None => {
                debug!("Ignoring load input that is neither an object nor an array");
                LoadHandle {
                    pending: Vec::new(),
                    skipped: 0,
                }
            }
        }
    }

    /// Report what `load` would do without resolving sources
    ///
    /// `validate` callbacks run so rejections show up; `init` callbacks do not.
    pub fn plan(&self, input: impl Into<DependencyInput>) -> Vec<PlannedDependency> {
        input
            .into()
            .into_vec()
            .into_iter()
            .map(|dependency| {
                let sources = dependency.sources();
                let (status, element_count) = match self.match_dependency(&dependency) {
                    MatchResult::NoSelector => (PlanStatus::NoSelector, 0),
                    MatchResult::NoMatch => (PlanStatus::NoMatch, 0),
                    MatchResult::Invalid(e) => (PlanStatus::InvalidSelector(e.to_string()), 0),
                    MatchResult::Rejected(elements) => (PlanStatus::Rejected, elements.len()),
                    MatchResult::Matched(elements) if sources.is_none() => {
                        (PlanStatus::NothingToLoad, elements.len())
                    }
                    MatchResult::Matched(elements) => (PlanStatus::Ready, elements.len()),
                };
                PlannedDependency {
                    name: dependency.name.clone(),
                    selector: dependency.selector.clone(),
                    status,
                    element_count,
                    sources: sources.unwrap_or_default(),
                }
            })
            .collect()
    }

    fn match_dependency(&self, dependency: &Dependency) -> MatchResult {
        let selector = match dependency.selector.as_deref() {
            Some(selector) if !selector.trim().is_empty() => selector,
            _ => return MatchResult::NoSelector,
        };

        let elements = match self.inner.document.select(selector, self.scope()) {
            Ok(elements) => elements,
            Err(e) => return MatchResult::Invalid(e),
        };

        if elements.is_empty() {
            return MatchResult::NoMatch;
        }

        if let Some(validate) = &dependency.validate {
            if !validate(&elements, dependency) {
                return MatchResult::Rejected(elements);
            }
        }

        MatchResult::Matched(elements)
    }

    fn load_object(&self, dependency: Dependency) -> Option<PendingLoad> {
        let console = &self.inner.console;
        let name = dependency.name.clone();

        let elements = match self.match_dependency(&dependency) {
            MatchResult::NoSelector => {
                console.debug(format_args!("No selector for {:?}, skipping", name));
                return None;
            }
            MatchResult::NoMatch => {
                console.debug(format_args!(
                    "No selection for {:?} in {:?}",
                    dependency.selector,
                    self.scope()
                ));
                return None;
            }
            MatchResult::Rejected(_) => {
                console.debug(format_args!("Validation rejected {:?}", name));
                return None;
            }
            MatchResult::Invalid(e) => {
                warn!("Dependency {:?} has an invalid selector: {}", name, e);
                self.inner.events.publish(LoadEvent::Failed {
                    name: name.clone(),
                    reason: e.to_string(),
                });
                return Some(PendingLoad {
                    name,
                    task: PendingTask::Failed(e),
                });
            }
            MatchResult::Matched(elements) => elements,
        };

        console.debug(format_args!(
            "Selection found for {:?} in {:?}: {} element(s)",
            dependency.selector,
            self.scope(),
            elements.len()
        ));

        if let Some(init) = &dependency.init {
            init(&elements, &dependency);
        }

        let sources = dependency.sources()?;

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let e = ModuleError::TaskFailed(format!("no Tokio runtime: {}", e));
                warn!("Dependency {:?} not loaded: {}", name, e);
                self.inner.events.publish(LoadEvent::Failed {
                    name: name.clone(),
                    reason: e.to_string(),
                });
                return Some(PendingLoad {
                    name,
                    task: PendingTask::Failed(e),
                });
            }
        };

        console.debug(format_args!("Loading sources... {}", sources.join(",")));
        let loader = self.clone();
        let task = runtime.spawn(async move { loader.run(dependency, elements, sources).await });

        Some(PendingLoad {
            name,
            task: PendingTask::Spawned(task),
        })
    }

    async fn run(
        self,
        dependency: Dependency,
        elements: ElementSet,
        sources: Vec<String>,
    ) -> Result<usize, ModuleError> {
        let name = dependency.name.clone();
        let result = self.instantiate(dependency, elements, &sources).await;

        match &result {
            Ok(instances) => {
                info!("Dependency {:?} loaded with {} module(s)", name, instances);
                self.inner.events.publish(LoadEvent::Registered {
                    name,
                    instances: *instances,
                });
            }
            Err(e) => {
                warn!("Dependency {:?} failed: {}", name, e);
                self.inner.events.publish(LoadEvent::Failed {
                    name,
                    reason: e.to_string(),
                });
            }
        }

        result
    }

    async fn instantiate(
        &self,
        dependency: Dependency,
        elements: ElementSet,
        sources: &[String],
    ) -> Result<usize, ModuleError> {
        let factories =
            SourceLoader::load_sources(self.inner.resolver.as_ref(), sources).await?;
        self.inner
            .console
            .debug(format_args!("Sources loaded... {}", sources.join(",")));

        let modules = factories
            .iter()
            .map(|factory| self.init_module(factory.as_ref(), &dependency, &elements))
            .collect::<Result<Vec<_>, _>>()?;

        let instances = modules.len();
        self.inner.registry.insert(
            dependency.name.clone(),
            RegistryEntry {
                dependency,
                modules,
                element_count: elements.len(),
                loaded_at: current_timestamp(),
            },
        );

        Ok(instances)
    }

    fn init_module(
        &self,
        factory: &dyn ModuleFactory,
        dependency: &Dependency,
        elements: &ElementSet,
    ) -> Result<Arc<dyn Component>, ModuleError> {
        self.inner.console.debug(format_args!(
            "{:?} constructing {} with {} element(s)",
            dependency.name,
            factory.name(),
            elements.len()
        ));
        factory.construct(dependency, elements, self)
    }
}

impl fmt::Debug for Initr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initr")
            .field("id", &self.inner.id)
            .field("options", &self.inner.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::console::MemorySink;
    use crate::module::loader::FactoryRegistry;
    use crate::module::scope::HtmlDocument;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Gauge {
        elements: usize,
    }

    impl Component for Gauge {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn loader(markup: &str) -> (Initr, Arc<FactoryRegistry>) {
        let factories = Arc::new(FactoryRegistry::new());
        factories.register_fn("gauge", |_, elements, _| {
            Ok(Arc::new(Gauge {
                elements: elements.len(),
            }) as Arc<dyn Component>)
        });
        let initr = Initr::with_registry(
            InitrOptions::default(),
            Arc::new(HtmlDocument::parse(markup)),
            factories.clone(),
            ModuleRegistry::new(),
        );
        (initr, factories)
    }

    #[tokio::test]
    async fn test_load_records_entry() {
        let (initr, _) = loader(r#"<p class="a"></p><p class="a"></p>"#);
        let handle = initr.load(
            Dependency::named("x")
                .with_selector(".a")
                .with_source("gauge"),
        );
        assert_eq!(handle.len(), 1);

        let outcomes = handle.wait().await;
        assert_eq!(outcomes[0].result.as_ref().ok(), Some(&1));

        let entry = initr.get_modules().get("x").unwrap();
        assert_eq!(entry.element_count, 2);
        assert_eq!(
            entry.modules[0].downcast_ref::<Gauge>().map(|p| p.elements),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_validate_and_init() {
        let (initr, _) = loader(r#"<ul class="list"><li></li><li></li></ul>"#);
        let calls = Arc::new(AtomicUsize::new(0));

        let seen = calls.clone();
        let accepted = Dependency::new()
            .with_selector(".list li")
            .with_validate(|elements, _| elements.len() >= 2)
            .with_init(move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let seen = calls.clone();
        let rejected = Dependency::new()
            .with_selector(".list li")
            .with_validate(|elements, _| elements.len() > 2)
            .with_init(move |_, _| {
                seen.fetch_add(10, Ordering::SeqCst);
            });

        let handle = initr.load(vec![accepted, rejected]);
        assert!(handle.is_empty());
        assert_eq!(handle.skipped(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(initr.get_modules().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_selector_reported() {
        let (initr, _) = loader("<p></p>");
        let mut events = initr.subscribe();

        let outcomes = initr
            .load(Dependency::named("bad").with_selector("p[").with_source("gauge"))
            .wait()
            .await;

        assert!(matches!(
            outcomes[0].result,
            Err(ModuleError::InvalidSelector(_))
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            LoadEvent::Failed { name: Some(n), .. } if n == "bad"
        ));
    }

    #[test]
    fn test_load_outside_runtime_fails_cleanly() {
        let (initr, _) = loader(r#"<p class="a"></p>"#);
        let mut events = initr.subscribe();

        let handle = initr.load(vec![
            Dependency::named("x").with_selector(".a").with_source("gauge"),
            Dependency::named("bare").with_selector(".a"),
        ]);
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.skipped(), 1);

        let outcomes = futures::executor::block_on(handle.wait());
        assert!(matches!(outcomes[0].result, Err(ModuleError::TaskFailed(_))));
        assert!(matches!(
            events.try_recv(),
            Ok(LoadEvent::Failed { name: Some(n), .. }) if n == "x"
        ));
        assert!(initr.get_modules().is_empty());
    }

    #[test]
    fn test_plan() {
        let (initr, _) = loader(r#"<div class="a"></div>"#);
        let plan = initr.plan(vec![
            Dependency::named("none"),
            Dependency::named("blank").with_selector(" "),
            Dependency::named("miss").with_selector(".b"),
            Dependency::named("bare").with_selector(".a"),
            Dependency::named("ready")
                .with_selector(".a")
                .with_source(vec!["gauge", "other"]),
        ]);

        let statuses: Vec<_> = plan.iter().map(|p| p.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                PlanStatus::NoSelector,
                PlanStatus::NoSelector,
                PlanStatus::NoMatch,
                PlanStatus::NothingToLoad,
                PlanStatus::Ready
            ]
        );
        assert_eq!(plan[4].element_count, 1);
        assert_eq!(plan[4].sources, vec!["gauge", "other"]);
        assert!(initr.get_modules().is_empty());
    }

    #[test]
    fn test_instances_are_tagged_distinctly() {
        let sink = Arc::new(MemorySink::new());
        let build = || {
            Initr::builder(
                Arc::new(HtmlDocument::parse("")),
                Arc::new(FactoryRegistry::new()),
            )
            .registry(ModuleRegistry::new())
            .log_level(LogLevel::Debug)
            .sink(sink.clone())
            .build()
        };

        let first = build();
        let second = build();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.console().tag(), second.console().tag());
        assert!(first.same_instance(&first.clone()));
        assert!(!first.same_instance(&second));

        // One "Starting..." record per instance
        assert_eq!(sink.count(LogLevel::Debug), 2);
    }
}
