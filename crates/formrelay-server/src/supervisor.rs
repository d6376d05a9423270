//! Process supervisor: brings up the web server and the datagram listener
//! and keeps them running until shutdown.

use std::{future::Future, net::SocketAddr};

use axum::Router;
use formrelay_core::store::RecordStore;
use formrelay_datagram::{Datagram, DatagramListener, DatagramNotifier};
use formrelay_store_json::JsonFileStore;
use tokio::{net::TcpListener, sync::mpsc::UnboundedSender};

use crate::{AppState, ServerConfig, StartupError, router};

/// Both listeners, bound and ready to run.
///
/// The two units share nothing but the process: the web server owns the
/// record store, the datagram listener only logs.
pub struct Supervisor {
  http:          TcpListener,
  http_addr:     SocketAddr,
  datagram:      DatagramListener,
  datagram_addr: SocketAddr,
  app:           Router,
}

impl Supervisor {
  /// Initialise the store and bind both sockets.
  ///
  /// A configured port of `0` picks an ephemeral port; when the datagram
  /// port is `0` the notifier is pointed at whatever port was bound. The
  /// notifier's destination is resolved here, once.
  pub async fn start(mut config: ServerConfig) -> Result<Self, StartupError> {
    let store = JsonFileStore::new(&config.store_path);
    store.ensure_initialized().await?;

    let datagram = DatagramListener::bind(&config.host, config.datagram_port)
      .await?
      .with_buffer_size(config.datagram_buffer);
    let datagram_addr = datagram.local_addr().map_err(StartupError::LocalAddr)?;
    if config.datagram_port == 0 {
      config.datagram_port = datagram_addr.port();
    }

    let http = TcpListener::bind((config.host.as_str(), config.http_port))
      .await
      .map_err(|source| StartupError::Bind {
        addr: format!("{}:{}", config.host, config.http_port),
        source,
      })?;
    let http_addr = http.local_addr().map_err(StartupError::LocalAddr)?;

    let notifier = DatagramNotifier::new(config.datagram_host.clone(), config.datagram_port)
      .pinned()
      .await;

    tracing::info!(
      store = ?config.store_path,
      assets = ?config.asset_root,
      notify = %notifier.destination(),
      "supervisor ready"
    );

    Ok(Self {
      http,
      http_addr,
      datagram,
      datagram_addr,
      app: router(AppState::new(store, config).with_notifier(notifier)),
    })
  }

  pub fn http_addr(&self) -> SocketAddr { self.http_addr }

  pub fn datagram_addr(&self) -> SocketAddr { self.datagram_addr }

  /// Forward every datagram the listener receives to `sink`.
  pub fn with_datagram_sink(mut self, sink: UnboundedSender<Datagram>) -> Self {
    self.datagram = self.datagram.with_sink(sink);
    self
  }

  /// Run both units as independent tasks until `shutdown` resolves, then
  /// drop them. Requests already answered are already on disk, so nothing
  /// is drained.
  pub async fn run_until<F>(self, shutdown: F)
  where
    F: Future<Output = ()>,
  {
    let Self {
      http,
      http_addr,
      datagram,
      datagram_addr,
      app,
    } = self;

    let web = tokio::spawn(async move {
      tracing::info!("Running web server on http://{http_addr}");
      if let Err(e) = axum::serve(http, app).await {
        tracing::error!(error = %e, "web server stopped");
      }
    });
    let socket = tokio::spawn(async move {
      tracing::info!("Socket server running on {datagram_addr}");
      datagram.run().await;
    });

    shutdown.await;

    tracing::info!("Stopping servers...");
    web.abort();
    socket.abort();
  }
}
