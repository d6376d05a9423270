//! Fire-and-forget sender for submission payloads.

use std::{
  net::{Ipv4Addr, Ipv6Addr, SocketAddr},
  time::Duration,
};

use tokio::net::UdpSocket;

use crate::{Error, Result};

/// Upper bound on a single name lookup for the destination.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends one datagram per submission to a fixed destination.
///
/// Holds no socket between calls: every send binds an ephemeral socket,
/// uses it once and drops it.
#[derive(Debug, Clone)]
pub struct DatagramNotifier {
  host:    String,
  port:    u16,
  address: Option<SocketAddr>,
}

impl DatagramNotifier {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host:    host.into(),
      port,
      address: None,
    }
  }

  /// Resolve the destination now so later sends skip the lookup.
  ///
  /// On failure the notifier is returned unchanged and each send retries
  /// the lookup, still bounded by [`RESOLVE_TIMEOUT`].
  pub async fn pinned(mut self) -> Self {
    match self.lookup().await {
      Ok(addr) => {
        tracing::debug!(destination = %self.destination(), %addr, "datagram destination resolved");
        self.address = Some(addr);
      }
      Err(e) => {
        tracing::warn!(error = %e, "datagram destination unresolved, will retry per send");
      }
    }
    self
  }

  pub fn destination(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The pinned address, if [`pinned`](Self::pinned) resolved one.
  pub fn address(&self) -> Option<SocketAddr> { self.address }

  /// Send `payload` as a single datagram and return the bytes written.
  pub async fn send(&self, payload: &[u8]) -> Result<usize> {
    let addr = self.resolve().await?;
    let local: SocketAddr = if addr.is_ipv4() {
      (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
      (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await.map_err(|source| Error::Bind {
      addr: local.to_string(),
      source,
    })?;
    socket
      .send_to(payload, addr)
      .await
      .map_err(|source| Error::Send { addr, source })
  }

  /// Best-effort [`send`](Self::send): failures are logged and dropped so
  /// the caller's request carries on regardless.
  pub async fn notify(&self, payload: &[u8]) {
    match self.send(payload).await {
      Ok(sent) => {
        tracing::debug!(destination = %self.destination(), bytes = sent, "datagram sent");
      }
      Err(e) => {
        tracing::warn!(error = %e, "datagram notification dropped");
      }
    }
  }

  async fn resolve(&self) -> Result<SocketAddr> {
    match self.address {
      Some(addr) => Ok(addr),
      None => self.lookup().await,
    }
  }

  async fn lookup(&self) -> Result<SocketAddr> {
    let resolve_err = |reason: String| Error::Resolve {
      target: self.destination(),
      reason,
    };
    tokio::time::timeout(
      RESOLVE_TIMEOUT,
      tokio::net::lookup_host((self.host.as_str(), self.port)),
    )
    .await
    .map_err(|_| resolve_err(format!("timed out after {RESOLVE_TIMEOUT:?}")))?
    .map_err(|e| resolve_err(e.to_string()))?
    .next()
    .ok_or_else(|| resolve_err("no addresses".to_string()))
  }
}
