//! Transport errors for the datagram channel.
//!
//! None of these ever escape to an HTTP client: the notifier swallows them
//! after logging, and the listener logs them and keeps receiving.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to bind {addr}: {source}")]
  Bind {
    addr:   String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to resolve {target}: {reason}")]
  Resolve { target: String, reason: String },

  #[error("failed to send datagram to {addr}: {source}")]
  Send {
    addr:   SocketAddr,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to receive datagram: {0}")]
  Receive(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
