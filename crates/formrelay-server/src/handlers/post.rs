//! POST handler: accept a form submission.
//!
//! The steps run in a fixed order: parse, notify, persist, respond. The
//! notification is best-effort; a failed persist turns into a server error
//! even though the datagram has already gone out.

use axum::response::Response;
use formrelay_core::{Record, form, store::RecordStore};

use crate::{AppState, error::Error, handlers::redirect};

pub async fn handler<S>(
  state: &AppState<S>,
  body: &[u8],
) -> Result<Response, Error>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let fields = form::parse(body)?;
  let record = Record::new(state.clock.now(), fields);

  let payload = record.to_payload_bytes()?;
  state.notifier.notify(&payload).await;

  state
    .store
    .append(&record)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(
    timestamp = %record.timestamp,
    fields = record.fields.len(),
    "submission stored"
  );
  Ok(redirect(&state.config.confirmation_path))
}
