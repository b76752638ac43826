//! Dependency descriptors and the shared module registry

pub mod descriptor;
pub mod store;

pub use descriptor::{Dependency, DependencyInput, InitFn, Source, ValidateFn};
pub use store::{ModuleRegistry, RegistryEntry, RegistryKey};
