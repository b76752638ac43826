//! Loader notification API

pub mod events;

pub use events::{EventManager, LoadEvent};
