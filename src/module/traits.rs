//! Module system traits and interfaces
//!
//! Defines the capabilities the loader depends on: how the document is
//! queried, how a source reference turns into a factory, and how a factory
//! turns into a module instance.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::module::manager::Initr;
use crate::module::registry::descriptor::Dependency;
use crate::module::scope::ElementSet;

/// A constructed module instance
///
/// Instances are stored type-erased in the registry. Implementors return
/// `self` from [`Component::as_any`] so callers can recover the concrete
/// type with [`downcast_ref`](dyn Component::downcast_ref).
pub trait Component: Send + Sync + fmt::Debug {
    /// Borrow the instance as [`Any`]
    fn as_any(&self) -> &dyn Any;
}

impl dyn Component {
    /// Downcast to a concrete module type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Is this instance of type `T`?
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Constructor capability for resolved sources
///
/// A resolved source is never invoked as an arbitrary value: it must
/// implement this fixed signature. The loader calls [`construct`] once per
/// resolved source, in declaration order.
///
/// [`construct`]: ModuleFactory::construct
pub trait ModuleFactory: Send + Sync {
    /// Build one instance for the matched elements
    fn construct(
        &self,
        dependency: &Dependency,
        elements: &ElementSet,
        loader: &Initr,
    ) -> Result<Arc<dyn Component>, ModuleError>;

    /// Human-readable name for this factory (for debugging/logging)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Asynchronous source resolver
///
/// Turns one source reference into a factory. Implementations decide how
/// references are looked up; failures are returned, never retried by the
/// loader.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Resolve a single source reference
    async fn resolve(&self, reference: &str) -> Result<Arc<dyn ModuleFactory>, ModuleError>;
}

/// Document query capability
///
/// Given a selector and an optional scope selector, returns the matching
/// elements in document order. With a scope, only strict descendants of
/// the scope elements are returned.
pub trait DomQuery: Send + Sync {
    fn select(&self, selector: &str, scope: Option<&str>) -> Result<ElementSet, ModuleError>;
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Source could not be resolved: {0}")]
    UnresolvedSource(String),

    #[error("Timed out resolving source {reference} after {after:?}")]
    ResolveTimeout { reference: String, after: Duration },

    #[error("Module instantiation failed for {name}: {reason}")]
    Instantiation { name: String, reason: String },

    #[error("Load task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ModuleError {
    /// Instantiation failure for a dependency that may be unnamed
    pub fn instantiation(name: Option<&str>, reason: impl Into<String>) -> Self {
        ModuleError::Instantiation {
            name: name.unwrap_or("<unnamed>").to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::InvalidConfig(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::InvalidConfig(e.to_string())
    }
}
