//! [`JsonFileStore`], the JSON file implementation of [`RecordStore`].

use std::{
  collections::BTreeMap,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::Arc,
};

use serde::Serialize as _;
use serde_json::{Map, Value, ser::PrettyFormatter};
use tokio::{fs, io::AsyncWriteExt as _, sync::Mutex};

use formrelay_core::{Fields, Record, Timestamp, store::RecordStore};

use crate::{Error, Result};

type Document = Map<String, Value>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A record store backed by a single JSON document.
///
/// Every append is a whole-file read-modify-write. The write lock is held
/// from the read until the rewrite has landed, so concurrent appends from
/// parallel request handlers never lose each other's records.
///
/// Cloning is cheap; the path and lock are reference-counted.
#[derive(Clone)]
pub struct JsonFileStore {
  inner: Arc<Inner>,
}

struct Inner {
  path:       PathBuf,
  write_lock: Mutex<()>,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      inner: Arc::new(Inner {
        path:       path.into(),
        write_lock: Mutex::new(()),
      }),
    }
  }

  pub fn path(&self) -> &Path { &self.inner.path }

  /// Read the document, treating every failure as an empty store.
  async fn read_document(&self) -> Document {
    let path = self.path();
    let bytes = match fs::read(path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        tracing::debug!(?path, "store file absent, starting from empty");
        return Document::new();
      }
      Err(e) => {
        tracing::warn!(?path, error = %e, "store file unreadable, starting from empty");
        return Document::new();
      }
    };

    match serde_json::from_slice::<Value>(&bytes) {
      Ok(Value::Object(doc)) => doc,
      Ok(_) => {
        tracing::warn!(?path, "store file is not a JSON object, starting from empty");
        Document::new()
      }
      Err(e) => {
        tracing::warn!(?path, error = %e, "store file is corrupt, starting from empty");
        Document::new()
      }
    }
  }

  /// Replace the store file with `doc` via a sibling temp file and a rename.
  async fn write_document(&self, doc: &Document) -> Result<()> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
      &mut buf,
      PrettyFormatter::with_indent(b"    "),
    );
    doc.serialize(&mut ser)?;

    let path = self.path();
    let tmp = temp_path(path);
    fs::write(&tmp, &buf).await.map_err(|source| Error::Io {
      path: tmp.clone(),
      source,
    })?;
    if let Err(source) = fs::rename(&tmp, path).await {
      if let Err(e) = fs::remove_file(&tmp).await {
        tracing::warn!(path = ?tmp, error = %e, "could not remove temp file");
      }
      return Err(Error::Io {
        path: path.to_path_buf(),
        source,
      });
    }
    Ok(())
  }
}

fn temp_path(path: &Path) -> PathBuf {
  match path.file_name() {
    Some(name) => {
      let mut name = name.to_os_string();
      name.push(".tmp");
      path.with_file_name(name)
    }
    None => path.with_extension("tmp"),
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for JsonFileStore {
  type Error = Error;

  async fn ensure_initialized(&self) -> Result<()> {
    let path = self.path();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).await.map_err(|source| Error::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    match fs::metadata(path).await {
      Ok(meta) if meta.is_file() => return Ok(()),
      Ok(_) => return Err(Error::NotAFile(path.to_path_buf())),
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(source) => {
        return Err(Error::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    }

    let created = fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(path)
      .await;
    let mut file = match created {
      Ok(file) => file,
      // Another caller got there first.
      Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
      Err(source) => {
        return Err(Error::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };
    let io_err = |source| Error::Io {
      path: path.to_path_buf(),
      source,
    };
    file.write_all(b"{}").await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;

    tracing::info!(?path, "initialised empty record store");
    Ok(())
  }

  async fn append(&self, record: &Record) -> Result<()> {
    let _guard = self.inner.write_lock.lock().await;

    let mut doc = self.read_document().await;
    let fields = serde_json::to_value(&record.fields)?;
    if doc.insert(record.timestamp.to_string(), fields).is_some() {
      tracing::debug!(
        timestamp = %record.timestamp,
        "timestamp collision, replacing existing record"
      );
    }
    self.write_document(&doc).await?;

    tracing::debug!(
      timestamp = %record.timestamp,
      fields = record.fields.len(),
      records = doc.len(),
      "record persisted"
    );
    Ok(())
  }

  async fn load(&self) -> Result<BTreeMap<Timestamp, Fields>> {
    let doc = self.read_document().await;
    let mut records = BTreeMap::new();
    for (key, value) in doc {
      match serde_json::from_value::<Fields>(value) {
        Ok(fields) => {
          records.insert(Timestamp::from(key), fields);
        }
        Err(e) => {
          tracing::warn!(key = %key, error = %e, "skipping entry that is not a flat string map");
        }
      }
    }
    Ok(records)
  }
}
