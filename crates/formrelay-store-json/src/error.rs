//! Error type for `formrelay-store-json`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Something other than a regular file already occupies the store path.
  #[error("store path {0:?} exists but is not a file")]
  NotAFile(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
