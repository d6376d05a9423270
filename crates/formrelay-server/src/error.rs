//! Error types for the front end and for startup.
//!
//! Request errors are never turned into responses on their own; the
//! dispatcher renders the error view with [`Error::status`].

use axum::http::StatusCode;
use thiserror::Error;

/// A request-scoped failure. Every variant still produces a response.
#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed body: {0}")]
  MalformedBody(String),
  #[error("not found")]
  NotFound,
  #[error("payload error: {0}")]
  Payload(#[source] formrelay_core::Error),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<formrelay_core::Error> for Error {
  fn from(e: formrelay_core::Error) -> Self {
    match e {
      formrelay_core::Error::MalformedBody(msg) => Error::MalformedBody(msg),
      other => Error::Payload(other),
    }
  }
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::MalformedBody(_) => StatusCode::BAD_REQUEST,
      Error::NotFound => StatusCode::NOT_FOUND,
      Error::Payload(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// Failures while bringing the two listeners up.
#[derive(Debug, Error)]
pub enum StartupError {
  #[error("record store: {0}")]
  Store(#[from] formrelay_store_json::Error),
  #[error("datagram listener: {0}")]
  Datagram(#[from] formrelay_datagram::Error),
  #[error("failed to bind http listener on {addr}: {source}")]
  Bind {
    addr:   String,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to read local address: {0}")]
  LocalAddr(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_keep_their_status() {
    let malformed = Error::from(formrelay_core::Error::MalformedBody("no '='".into()));
    assert!(matches!(malformed, Error::MalformedBody(_)));
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let payload = Error::from(formrelay_core::Error::Payload("empty".into()));
    assert!(matches!(payload, Error::Payload(_)));
    assert_eq!(payload.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn lookup_and_store_failures_map_to_404_and_500() {
    assert_eq!(Error::NotFound.status(), StatusCode::NOT_FOUND);
    let io = std::io::Error::other("disk full");
    assert_eq!(Error::Store(Box::new(io)).status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
