//! GET and HEAD handlers for views and static assets.

use axum::{
  body::Body,
  http::{HeaderValue, Method, StatusCode, header},
  response::{IntoResponse, Response},
};
use formrelay_core::store::RecordStore;

use crate::{
  AppState,
  assets::View,
  error::Error,
  handlers::view_response,
};

pub async fn handler<S>(
  state: &AppState<S>,
  method: &Method,
  path: &str,
) -> Result<Response, Error>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  if path == "/" {
    return Ok(view_response(state, View::Home, StatusCode::OK, method).await);
  }
  if path == state.config.confirmation_path {
    return Ok(
      view_response(state, View::Confirmation, StatusCode::OK, method).await,
    );
  }

  let asset = state.assets.lookup(path).await.ok_or(Error::NotFound)?;
  let headers = [
    (header::CONTENT_TYPE, HeaderValue::from_static(asset.content_type)),
    (header::CONTENT_LENGTH, HeaderValue::from(asset.bytes.len())),
  ];

  if *method == Method::HEAD {
    Ok((StatusCode::OK, headers, Body::empty()).into_response())
  } else {
    Ok((StatusCode::OK, headers, Body::from(asset.bytes)).into_response())
  }
}
