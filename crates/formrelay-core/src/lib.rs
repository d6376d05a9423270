//! Core types and trait definitions for formrelay.
//!
//! This crate is deliberately free of HTTP, socket and filesystem code. The
//! store backend, the datagram channel and the server all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod form;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use record::{Clock, Fields, Record, SystemClock, Timestamp};
