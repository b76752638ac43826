//! Dependency validation
//!
//! Advisory checks for dependency lists: selectors, sources and registry
//! name collisions.

pub mod dependency_validator;

pub use dependency_validator::{DependencyValidator, ValidationResult};
