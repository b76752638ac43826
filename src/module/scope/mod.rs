//! Selector scope matching
//!
//! Evaluates dependency selectors against a document scope. Matches are
//! snapshotted into owned [`Element`]s so they can move into load tasks.

pub mod elements;
pub mod html;

pub use elements::{Element, ElementSet};
pub use html::HtmlDocument;
