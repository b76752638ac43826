//! Source loading system
//!
//! Resolves source references to module factories, concurrently and in
//! declaration order.

pub mod factories;
pub mod loader;

pub use factories::{factory_fn, FactoryRegistry, FnFactory};
pub use loader::SourceLoader;
