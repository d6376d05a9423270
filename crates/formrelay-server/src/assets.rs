//! Static assets and HTML views, read from a single root directory.
//!
//! Request paths are resolved strictly inside the root: any `..`, absolute
//! or prefixed component is refused, and the final canonical path must
//! still live under the canonical root so a symlink cannot lead outside it.

use std::{
  io::ErrorKind,
  path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use formrelay_core::form::percent_decode;
use tokio::fs;

// ─── Views ───────────────────────────────────────────────────────────────────

/// The named pages the front end renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
  Home,
  Confirmation,
  Error,
}

impl View {
  pub fn file_name(self) -> &'static str {
    match self {
      View::Home => "index.html",
      View::Confirmation => "message.html",
      View::Error => "error.html",
    }
  }

  /// Served when the view's file is missing from the asset root.
  fn fallback(self) -> &'static str {
    match self {
      View::Home => "<!doctype html><title>Home</title><h1>Home</h1>",
      View::Confirmation => {
        "<!doctype html><title>Thank you</title><h1>Message received</h1>"
      }
      View::Error => "<!doctype html><title>Error</title><h1>Something went wrong</h1>",
    }
  }
}

// ─── Assets ──────────────────────────────────────────────────────────────────

/// A file found under the asset root.
#[derive(Debug, Clone)]
pub struct Asset {
  pub bytes:        Bytes,
  pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct AssetRoot {
  root: PathBuf,
}

impl AssetRoot {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Map a request path onto the root without touching the filesystem.
  ///
  /// Returns `None` for anything that is not a plain relative path.
  pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(request_path.trim_start_matches('/'));
    if decoded.is_empty() || decoded.contains('\0') {
      return None;
    }
    let relative = Path::new(&decoded);
    let plain = relative
      .components()
      .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    plain.then(|| self.root.join(relative))
  }

  /// Find and read the file a request path points at.
  pub async fn lookup(&self, request_path: &str) -> Option<Asset> {
    let candidate = self.resolve(request_path)?;

    let canonical = match fs::canonicalize(&candidate).await {
      Ok(path) => path,
      Err(e) => {
        if e.kind() != ErrorKind::NotFound {
          tracing::warn!(path = ?candidate, error = %e, "asset lookup failed");
        }
        return None;
      }
    };
    let root = match fs::canonicalize(&self.root).await {
      Ok(root) => root,
      Err(e) => {
        tracing::warn!(root = ?self.root, error = %e, "asset root unavailable");
        return None;
      }
    };
    if !canonical.starts_with(&root) {
      tracing::warn!(request_path, "refusing asset outside the asset root");
      return None;
    }

    match fs::metadata(&canonical).await {
      Ok(meta) if meta.is_file() => {}
      _ => return None,
    }
    match fs::read(&canonical).await {
      Ok(bytes) => Some(Asset {
        bytes:        Bytes::from(bytes),
        content_type: content_type_for(&candidate),
      }),
      Err(e) => {
        tracing::warn!(path = ?canonical, error = %e, "asset unreadable");
        None
      }
    }
  }

  /// Read a view's HTML, falling back to a built-in page if it is missing.
  pub async fn render(&self, view: View) -> Bytes {
    let path = self.root.join(view.file_name());
    match fs::read(&path).await {
      Ok(bytes) => Bytes::from(bytes),
      Err(e) => {
        tracing::warn!(?path, error = %e, "view unavailable, using built-in page");
        Bytes::from_static(view.fallback().as_bytes())
      }
    }
  }
}

/// Content type by file extension; unknown types are served as raw bytes.
pub fn content_type_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("html" | "htm") => "text/html",
    Some("css") => "text/css",
    Some("js" | "mjs") => "text/javascript",
    Some("json") => "application/json",
    Some("txt") => "text/plain",
    Some("xml") => "application/xml",
    Some("svg") => "image/svg+xml",
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("ico") => "image/vnd.microsoft.icon",
    Some("pdf") => "application/pdf",
    Some("woff") => "font/woff",
    Some("woff2") => "font/woff2",
    _ => "application/octet-stream",
  }
}
