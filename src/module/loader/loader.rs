//! Source loader implementation
//!
//! Resolves all references of one dependency through a [`SourceResolver`].

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use crate::module::traits::{ModuleError, ModuleFactory, SourceResolver};

/// Source loader for resolving a dependency's references
pub struct SourceLoader;

impl SourceLoader {
    /// Resolve every reference, returning factories in input order
    ///
    /// References are resolved concurrently; completion order does not
    /// affect the result order. The first failure fails the whole load and
    /// is returned as-is.
    pub async fn load_sources(
        resolver: &dyn SourceResolver,
        references: &[String],
    ) -> Result<Vec<Arc<dyn ModuleFactory>>, ModuleError> {
        debug!("Resolving {} source(s): {}", references.len(), references.join(","));

        let pending = references
            .iter()
            .map(|reference| resolver.resolve(reference));

        try_join_all(pending).await
    }
}
