//! Background receiver for submission datagrams.

use std::net::SocketAddr;

use formrelay_core::Record;
use tokio::{net::UdpSocket, sync::mpsc::UnboundedSender};

use crate::{Error, Result};

/// Receive buffer size used unless [`DatagramListener::with_buffer_size`]
/// says otherwise. Longer payloads are cut short.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// One received datagram, decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
  pub from:      SocketAddr,
  pub payload:   String,
  /// The payload filled the whole receive buffer, so it may have been cut
  /// short.
  pub truncated: bool,
}

/// Logs every datagram that reaches its socket, forever.
#[derive(Debug)]
pub struct DatagramListener {
  socket:      UdpSocket,
  buffer_size: usize,
  sink:        Option<UnboundedSender<Datagram>>,
}

impl DatagramListener {
  pub async fn bind(host: &str, port: u16) -> Result<Self> {
    let socket =
      UdpSocket::bind((host, port))
        .await
        .map_err(|source| Error::Bind {
          addr: format!("{host}:{port}"),
          source,
        })?;
    Ok(Self {
      socket,
      buffer_size: DEFAULT_BUFFER_SIZE,
      sink: None,
    })
  }

  pub fn with_buffer_size(mut self, size: usize) -> Self {
    self.buffer_size = size.max(1);
    self
  }

  /// Also forward every received datagram to `sink`.
  pub fn with_sink(mut self, sink: UnboundedSender<Datagram>) -> Self {
    self.sink = Some(sink);
    self
  }

  pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
    self.socket.local_addr()
  }

  /// Receive until the task is dropped. No single datagram or receive
  /// error ends the loop.
  pub async fn run(self) {
    let mut buf = vec![0u8; self.buffer_size];
    loop {
      match self.socket.recv_from(&mut buf).await {
        Ok((len, from)) => {
          let datagram = self.inspect(&buf[..len], from);
          if let Some(sink) = &self.sink {
            // A dropped receiver only means nobody is watching any more.
            let _ = sink.send(datagram);
          }
        }
        Err(e) => {
          tracing::warn!(error = %Error::Receive(e), "datagram listener continuing");
        }
      }
    }
  }

  fn inspect(&self, bytes: &[u8], from: SocketAddr) -> Datagram {
    let truncated = bytes.len() >= self.buffer_size;
    if truncated {
      tracing::warn!(
        %from,
        bytes = bytes.len(),
        "datagram filled the receive buffer and may be truncated"
      );
    }

    let payload = match std::str::from_utf8(bytes) {
      Ok(text) => text.to_owned(),
      Err(e) => {
        tracing::warn!(%from, error = %e, "datagram is not valid UTF-8");
        String::from_utf8_lossy(bytes).into_owned()
      }
    };

    match Record::from_payload(&payload) {
      Ok(record) => tracing::info!(
        %from,
        timestamp = %record.timestamp,
        fields = record.fields.len(),
        %payload,
        "received submission"
      ),
      Err(_) => tracing::info!(%from, %payload, "received datagram"),
    }

    Datagram {
      from,
      payload,
      truncated,
    }
  }
}
