//! Error types for `formrelay-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed body: {0}")]
  MalformedBody(String),

  #[error("not a submission payload: {0}")]
  Payload(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
