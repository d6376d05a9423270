pub mod get;
pub mod post;

use axum::{
  body::Body,
  http::{Method, StatusCode, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use formrelay_core::store::RecordStore;

use crate::{AppState, assets::View, error::Error};

pub(super) const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

pub(super) fn html_response(
  status: StatusCode,
  body: Bytes,
  method: &Method,
) -> Response {
  let body = if *method == Method::HEAD {
    Body::empty()
  } else {
    Body::from(body)
  };
  (status, [(header::CONTENT_TYPE, CONTENT_TYPE_HTML)], body).into_response()
}

pub(super) async fn view_response<S>(
  state: &AppState<S>,
  view: View,
  status: StatusCode,
  method: &Method,
) -> Response
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  html_response(status, state.assets.render(view).await, method)
}

/// `302 Found` to `location`, with no body.
pub(super) fn redirect(location: &str) -> Response {
  (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Answer a failed request with the error view and the error's status.
pub(super) async fn error_page<S>(
  state: &AppState<S>,
  method: &Method,
  err: Error,
) -> Response
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let status = err.status();
  if status.is_server_error() {
    tracing::error!(error = %err, "request failed");
  } else {
    tracing::debug!(error = %err, %status, "request rejected");
  }
  view_response(state, View::Error, status, method).await
}
