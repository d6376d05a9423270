//! Records: one timestamped form submission each.
//!
//! The timestamp is the record's key in the store. Two submissions rendered
//! with the same timestamp string collide, and the later one replaces the
//! earlier one.

use std::{collections::BTreeMap, fmt};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Field name to field value, one entry per `key=value` pair of a body.
pub type Fields = BTreeMap<String, String>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// ─── Timestamp ───────────────────────────────────────────────────────────────

/// A record key: the creation instant rendered as a string.
///
/// The rendering is `YYYY-MM-DD HH:MM:SS.ffffff` in local time, so
/// lexicographic order is chronological order.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
  /// The current local time at microsecond resolution.
  pub fn now() -> Self {
    Self(Local::now().format(TIMESTAMP_FORMAT).to_string())
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for Timestamp {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for Timestamp {
  fn from(s: &str) -> Self { Self(s.to_string()) }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of record timestamps.
pub trait Clock: Send + Sync {
  fn now(&self) -> Timestamp;
}

/// Reads the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Timestamp { Timestamp::now() }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub timestamp: Timestamp,
  pub fields:    Fields,
}

impl Record {
  pub fn new(timestamp: Timestamp, fields: Fields) -> Self {
    Self { timestamp, fields }
  }

  /// The datagram payload: a single-key object `{timestamp: fields}`.
  pub fn to_payload(&self) -> serde_json::Value {
    let mut map = serde_json::Map::with_capacity(1);
    map.insert(
      self.timestamp.to_string(),
      serde_json::Value::Object(
        self
          .fields
          .iter()
          .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
          .collect(),
      ),
    );
    serde_json::Value::Object(map)
  }

  pub fn to_payload_bytes(&self) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&self.to_payload())?)
  }

  /// Parse a datagram payload produced by [`Record::to_payload`].
  pub fn from_payload(payload: &str) -> Result<Self> {
    let map: BTreeMap<Timestamp, Fields> = serde_json::from_str(payload)?;
    let mut entries = map.into_iter();
    match (entries.next(), entries.next()) {
      (Some((timestamp, fields)), None) => Ok(Self { timestamp, fields }),
      (None, _) => Err(Error::Payload("empty object".to_string())),
      (Some(_), Some(_)) => {
        Err(Error::Payload("more than one top-level key".to_string()))
      }
    }
  }
}
