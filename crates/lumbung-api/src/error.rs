//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use lumbung_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Translate a backend error into an HTTP-mappable one.
  ///
  /// The store's associated error type is opaque here, so the core taxonomy
  /// is recovered by walking the source chain; anything without a domain
  /// error inside is a plain 500.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = current {
      if let Some(core) = e.downcast_ref::<CoreError>() {
        return Self::from_core(core);
      }
      current = e.source();
    }
    Self::Store(Box::new(err))
  }

  fn from_core(err: &CoreError) -> Self {
    let message = err.to_string();
    match err {
      CoreError::ProgramNotFound(_)
      | CoreError::ItemNotFound(_)
      | CoreError::ProgramItemNotFound(_)
      | CoreError::RecipientNotFound(_)
      | CoreError::FamilyNotFound(_)
      | CoreError::ResidentNotFound(_) => Self::NotFound(message),
      CoreError::DuplicateAttachment { .. }
      | CoreError::DuplicateEnrollment { .. }
      | CoreError::ItemInUse(_) => Self::Conflict(message),
      CoreError::TargetModeMismatch { .. } => Self::BadRequest(message),
      CoreError::InvalidTransition(_) => Self::Unprocessable(message),
      CoreError::Serialization(_) => Self::Store(message.into()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => {
        (StatusCode::UNPROCESSABLE_ENTITY, m.clone())
      }
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

/// Read the acting administrator's id from the `x-actor-id` header.
/// Mutating routes require it; there is no ambient fallback.
pub fn actor_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
  let value = headers
    .get("x-actor-id")
    .ok_or_else(|| ApiError::BadRequest("missing x-actor-id header".into()))?;
  let text = value
    .to_str()
    .map_err(|_| ApiError::BadRequest("malformed x-actor-id header".into()))?;
  Uuid::parse_str(text)
    .map_err(|_| ApiError::BadRequest("x-actor-id is not a uuid".into()))
}
