//! The `RecordStore` trait.
//!
//! Implemented by storage backends (e.g. `formrelay-store-json`). The server
//! depends on this abstraction, not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use crate::record::{Fields, Record, Timestamp};

/// Abstraction over a record store backend.
///
/// The store is a mapping from timestamp to fields. Writes only ever add or
/// replace whole entries; there is no delete path.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the backing storage if it is missing. Idempotent.
  fn ensure_initialized(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert `record` under its timestamp, replacing any existing entry with
  /// the same key.
  ///
  /// A missing or unreadable store is treated as empty; only a failure to
  /// write is reported.
  fn append<'a>(
    &'a self,
    record: &'a Record,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read every well-formed entry currently in the store.
  fn load(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<Timestamp, Fields>, Self::Error>>
  + Send
  + '_;
}
