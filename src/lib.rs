//! initr - conditional, selector-driven module loading
//!
//! Declare dependencies as a selector plus the source references that
//! implement them. A loader instance checks every selector against its
//! scope in a document and only resolves and constructs modules for the
//! dependencies that match. Results land in a registry shared by every
//! loader in the process.
//!
//! ## Design Principles
//!
//! 1. **Nothing loads without a match**: no selector or an empty selection means no work
//! 2. **Independent dependencies**: each matching dependency runs as its own task
//! 3. **Declaration order**: instances follow source order regardless of resolution order
//! 4. **Pluggable edges**: documents, resolvers and log sinks are traits
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use initr::{Dependency, FactoryRegistry, HtmlDocument, Initr, InitrOptions};
//!
//! # async fn run() {
//! let factories = Arc::new(FactoryRegistry::new());
//! let document = Arc::new(HtmlDocument::parse(r#"<input class="datepicker">"#));
//! let initr = Initr::new(InitrOptions::default(), document, factories);
//!
//! let outcomes = initr
//!     .load(Dependency::named("datepicker").with_selector(".datepicker").with_source("datepicker"))
//!     .wait()
//!     .await;
//! # let _ = outcomes;
//! # }
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{InitrConfig, LoggingConfig, ResolverConfig};
pub use module::*;
