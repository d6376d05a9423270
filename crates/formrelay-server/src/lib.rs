//! HTTP front end and process supervisor for formrelay.
//!
//! Exposes an axum [`Router`] that serves views and static assets on GET and
//! accepts form submissions on POST. Each submission is mirrored as a
//! datagram and then persisted to any [`RecordStore`].

pub mod assets;
pub mod error;
pub mod handlers;
pub mod supervisor;

pub use error::{Error, StartupError};
pub use supervisor::Supervisor;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::{Request, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::any,
};
use bytes::Bytes;
use formrelay_core::{Clock, SystemClock, store::RecordStore};
use formrelay_datagram::DatagramNotifier;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use assets::AssetRoot;
use handlers::{get, post};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `formrelay.toml` and the
/// environment. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  /// Bind address for both the HTTP and the datagram listener.
  pub host:              String,
  pub http_port:         u16,
  /// Where submissions are mirrored to.
  pub datagram_host:     String,
  pub datagram_port:     u16,
  pub store_path:        PathBuf,
  pub asset_root:        PathBuf,
  pub confirmation_path: String,
  pub max_body_bytes:    usize,
  pub datagram_buffer:   usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "0.0.0.0".to_string(),
      http_port:         3000,
      datagram_host:     "127.0.0.1".to_string(),
      datagram_port:     5000,
      store_path:        PathBuf::from("storage/data.json"),
      asset_root:        PathBuf::from("public"),
      confirmation_path: "/message".to_string(),
      max_body_bytes:    1024 * 1024,
      datagram_buffer:   formrelay_datagram::listener::DEFAULT_BUFFER_SIZE,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RecordStore> {
  pub store:    Arc<S>,
  pub notifier: Arc<DatagramNotifier>,
  pub assets:   Arc<AssetRoot>,
  pub clock:    Arc<dyn Clock>,
  pub config:   Arc<ServerConfig>,
}

impl<S: RecordStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self {
      store:    Arc::new(store),
      notifier: Arc::new(DatagramNotifier::new(
        config.datagram_host.clone(),
        config.datagram_port,
      )),
      assets:   Arc::new(AssetRoot::new(config.asset_root.clone())),
      clock:    Arc::new(SystemClock),
      config:   Arc::new(config),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_notifier(mut self, notifier: DatagramNotifier) -> Self {
    self.notifier = Arc::new(notifier);
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the front end.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/",        any(dispatch::<S>))
    .route("/{*path}", any(dispatch::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Read the whole body. A body that cannot be read in full, including one
/// over the size limit, is malformed.
async fn collect_body(req: Request<Body>, limit: usize) -> Result<Bytes, Error> {
  axum::body::to_bytes(req.into_body(), limit)
    .await
    .map_err(|e| Error::MalformedBody(format!("body could not be read: {e}")))
}

async fn dispatch<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let method = req.method().clone();
  let path = req.uri().path().to_owned();

  let result = match method.as_str() {
    "GET" | "HEAD" => get::handler(&state, &method, &path).await,
    "POST" => match collect_body(req, state.config.max_body_bytes).await {
      Ok(body) => post::handler(&state, &body).await,
      Err(e) => Err(e),
    },
    _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
  };

  match result {
    Ok(r) => r,
    Err(e) => handlers::error_page(&state, &method, e).await,
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
  };

  use axum::http::{Request, StatusCode, header};
  use formrelay_core::{Timestamp, store::RecordStore};
  use formrelay_store_json::JsonFileStore;
  use tempfile::TempDir;
  use tokio::net::UdpSocket;
  use tower::ServiceExt as _;

  /// Always returns the same timestamp.
  struct FixedClock(&'static str);

  impl Clock for FixedClock {
    fn now(&self) -> Timestamp { Timestamp::from(self.0) }
  }

  /// Returns strictly increasing timestamps.
  #[derive(Default)]
  struct CountingClock(AtomicUsize);

  impl Clock for CountingClock {
    fn now(&self) -> Timestamp {
      let n = self.0.fetch_add(1, Ordering::SeqCst);
      Timestamp::from(format!("2024-01-01 00:00:00.{n:06}"))
    }
  }

  struct Harness {
    state:     AppState<JsonFileStore>,
    datagrams: UdpSocket,
    _dir:      TempDir,
  }

  impl Harness {
    async fn next_datagram(&self) -> String {
      let mut buf = vec![0u8; 4096];
      let (len, _) = tokio::time::timeout(
        Duration::from_secs(5),
        self.datagrams.recv_from(&mut buf),
      )
      .await
      .expect("datagram should arrive")
      .unwrap();
      String::from_utf8(buf[..len].to_vec()).unwrap()
    }
  }

  async fn harness() -> Harness { harness_with(|c| c).await }

  async fn harness_with(
    tweak: impl FnOnce(ServerConfig) -> ServerConfig,
  ) -> Harness {
    let dir = TempDir::new().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir(&public).unwrap();
    std::fs::write(public.join("index.html"), "<h1>home page</h1>").unwrap();
    std::fs::write(public.join("message.html"), "<h1>thanks page</h1>").unwrap();
    std::fs::write(public.join("error.html"), "<h1>error page</h1>").unwrap();
    std::fs::write(public.join("style.css"), "body { color: red }").unwrap();
    std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

    let datagrams = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = tweak(ServerConfig {
      host: "127.0.0.1".to_string(),
      datagram_host: "127.0.0.1".to_string(),
      datagram_port: datagrams.local_addr().unwrap().port(),
      store_path: dir.path().join("storage").join("data.json"),
      asset_root: public,
      ..ServerConfig::default()
    });

    let store = JsonFileStore::new(&config.store_path);
    store.ensure_initialized().await.unwrap();

    Harness {
      state: AppState::new(store, config),
      datagrams,
      _dir: dir,
    }
  }

  async fn send(
    state: &AppState<JsonFileStore>,
    method: &str,
    uri: &str,
    body: &str,
  ) -> Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(body.to_string()))
      .unwrap();
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  // ── GET ─────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_root_serves_home_view() {
    let h = harness().await;
    let resp = send(&h.state, "GET", "/", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(ct.starts_with("text/html"), "Content-Type: {ct}");
    assert!(body_string(resp).await.contains("home page"));
  }

  #[tokio::test]
  async fn get_confirmation_serves_message_view() {
    let h = harness().await;
    let resp = send(&h.state, "GET", "/message", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("thanks page"));
  }

  #[tokio::test]
  async fn get_query_string_is_ignored() {
    let h = harness().await;
    let resp = send(&h.state, "GET", "/message?from=form", "").await;
    assert!(body_string(resp).await.contains("thanks page"));
  }

  #[tokio::test]
  async fn get_static_asset_has_content_type() {
    let h = harness().await;
    let resp = send(&h.state, "GET", "/style.css", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css");
    assert_eq!(body_string(resp).await, "body { color: red }");
  }

  #[tokio::test]
  async fn head_returns_headers_without_body() {
    let h = harness().await;
    let resp = send(&h.state, "HEAD", "/style.css", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "19");
    assert!(body_string(resp).await.is_empty());
  }

  #[tokio::test]
  async fn get_missing_file_returns_404_error_view() {
    let h = harness().await;
    let resp = send(&h.state, "GET", "/nonexistent.file", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_string(resp).await.contains("error page"));
  }

  #[tokio::test]
  async fn get_outside_asset_root_returns_404() {
    let h = harness().await;
    for uri in ["/../secret.txt", "/%2e%2e/secret.txt"] {
      let resp = send(&h.state, "GET", uri, "").await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
      let body = body_string(resp).await;
      assert!(!body.contains("top secret"), "{uri}: {body}");
    }
  }

  #[tokio::test]
  async fn missing_view_file_uses_builtin_page() {
    let h = harness().await;
    std::fs::remove_file(h.state.assets.root().join("index.html")).unwrap();
    let resp = send(&h.state, "GET", "/", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("<h1>Home</h1>"));
  }

  // ── POST ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn post_notifies_persists_and_redirects() {
    let h = harness().await;
    let state = h.state.clone().with_clock(Arc::new(FixedClock("2024-05-01 10:00:00.000001")));

    let resp = send(&state, "POST", "/anything", "name=Ada&city=London").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/message");
    assert!(body_string(resp).await.is_empty());

    let datagram = h.next_datagram().await;
    let payload: serde_json::Value = serde_json::from_str(&datagram).unwrap();
    assert_eq!(
      payload,
      serde_json::json!({
        "2024-05-01 10:00:00.000001": { "name": "Ada", "city": "London" }
      })
    );

    let stored = state.store.load().await.unwrap();
    assert_eq!(stored.len(), 1);
    let fields = &stored[&Timestamp::from("2024-05-01 10:00:00.000001")];
    assert_eq!(fields["name"], "Ada");
    assert_eq!(fields["city"], "London");
  }

  #[tokio::test]
  async fn post_decodes_plus_and_percent() {
    let h = harness().await;
    let resp = send(&h.state, "POST", "/", "message=hello+world%21").await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let stored = h.state.store.load().await.unwrap();
    let fields = stored.values().next().unwrap();
    assert_eq!(fields["message"], "hello world!");
  }

  #[tokio::test]
  async fn sequential_posts_are_all_stored() {
    let h = harness().await;
    let state = h.state.clone().with_clock(Arc::new(CountingClock::default()));

    for name in ["Ada", "Grace", "Edsger"] {
      let resp = send(&state, "POST", "/", &format!("name={name}")).await;
      assert_eq!(resp.status(), StatusCode::FOUND);
    }

    let stored = state.store.load().await.unwrap();
    assert_eq!(stored.len(), 3);
    let names: Vec<_> = stored.values().map(|f| f["name"].as_str()).collect();
    assert_eq!(names, ["Ada", "Grace", "Edsger"]);
  }

  #[tokio::test]
  async fn colliding_timestamps_keep_newest_submission() {
    let h = harness().await;
    let state = h.state.clone().with_clock(Arc::new(FixedClock("2024-05-01 10:00:00.000000")));

    send(&state, "POST", "/", "name=Ada&city=London").await;
    send(&state, "POST", "/", "name=Grace").await;

    let stored = state.store.load().await.unwrap();
    assert_eq!(stored.len(), 1);
    let fields = &stored[&Timestamp::from("2024-05-01 10:00:00.000000")];
    assert_eq!(fields.len(), 1);
    assert_eq!(fields["name"], "Grace");
  }

  #[tokio::test]
  async fn malformed_body_returns_400_and_stores_nothing() {
    let h = harness().await;
    let resp = send(&h.state, "POST", "/", "name=Ada&oops").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("error page"));
    assert!(h.state.store.load().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn empty_body_returns_400() {
    let h = harness().await;
    let resp = send(&h.state, "POST", "/", "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("error page"));
  }

  #[tokio::test]
  async fn oversized_body_returns_400() {
    let h = harness_with(|c| ServerConfig { max_body_bytes: 8, ..c }).await;
    let resp = send(&h.state, "POST", "/", "name=a-very-long-value").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("error page"));
    assert!(h.state.store.load().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn corrupt_store_is_replaced_by_new_record() {
    let h = harness().await;
    std::fs::write(&h.state.config.store_path, "{{{ not json").unwrap();

    let resp = send(&h.state, "POST", "/", "name=Ada").await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let stored = h.state.store.load().await.unwrap();
    assert_eq!(stored.len(), 1);
  }

  #[tokio::test]
  async fn storage_failure_returns_500_after_notifying() {
    let h = harness().await;
    let blocker = h.state.assets.root().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let state = AppState {
      store: Arc::new(JsonFileStore::new(blocker.join("data.json"))),
      ..h.state.clone()
    };

    let resp = send(&state, "POST", "/", "name=Ada").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(resp).await;
    assert!(body.contains("error page"), "{body}");

    // The datagram went out before the write was attempted.
    assert!(h.next_datagram().await.contains("Ada"));
  }

  #[tokio::test]
  async fn unreachable_datagram_listener_does_not_fail_post() {
    let scratch = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let dead_port = scratch.local_addr().unwrap().port();
    drop(scratch);
    let h = harness_with(|c| ServerConfig { datagram_port: dead_port, ..c }).await;

    let resp = send(&h.state, "POST", "/", "name=Ada").await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(h.state.store.load().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn custom_confirmation_path_is_used_for_redirect_and_view() {
    let h = harness_with(|c| ServerConfig {
      confirmation_path: "/thanks".to_string(),
      ..c
    })
    .await;

    let resp = send(&h.state, "POST", "/", "name=Ada").await;
    assert_eq!(resp.headers()[header::LOCATION], "/thanks");
    let resp = send(&h.state, "GET", "/thanks", "").await;
    assert!(body_string(resp).await.contains("thanks page"));
  }

  // ── Other methods ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unsupported_method_returns_405() {
    let h = harness().await;
    let resp = send(&h.state, "PUT", "/", "name=Ada").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  }
}
