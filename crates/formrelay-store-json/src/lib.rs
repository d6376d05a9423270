//! JSON file backend for the formrelay record store.
//!
//! The whole store is one JSON object on disk, rewritten on every append.

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::JsonFileStore;
