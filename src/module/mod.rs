//! Conditional module loading
//!
//! Dependencies declare a selector and the sources that implement them.
//! A loader instance checks each selector against its scope and, only when
//! something matches, resolves the sources and constructs one instance per
//! source against the matched elements.
//!
//! ## Architecture
//!
//! - **Scope**: element queries over a parsed document ([`scope`])
//! - **Resolution**: source references map to factories ([`loader`])
//! - **Registry**: results keyed by dependency name, shared across instances ([`registry`])
//! - **Orchestration**: the [`Initr`] loader runs one task per matching dependency

pub mod api;
pub mod console;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod scope;
pub mod traits;
pub mod validation;

pub use api::{EventManager, LoadEvent};
pub use console::{Console, LogLevel, LogSink, MemorySink, TracingSink};
pub use loader::{factory_fn, FactoryRegistry, FnFactory, SourceLoader};
pub use manager::{
    Initr, InitrBuilder, InitrOptions, LoadHandle, LoadOutcome, PlanStatus, PlannedDependency,
};
pub use registry::{Dependency, DependencyInput, ModuleRegistry, RegistryEntry, Source};
pub use scope::{Element, ElementSet, HtmlDocument};
pub use traits::{Component, DomQuery, ModuleError, ModuleFactory, SourceResolver};
pub use validation::{DependencyValidator, ValidationResult};
