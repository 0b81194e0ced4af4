//! Handlers for `/items` endpoints — the assistance catalog.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/items` | Live items only |
//! | `POST`   | `/items` | Body: `{"name":"Rice","kind":"goods","unit":"Kg"}` |
//! | `PUT`    | `/items/:id` | Partial update |
//! | `DELETE` | `/items/:id` | Soft delete; 409 while attached to a program |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lumbung_core::{
  item::{AssistanceItem, ItemUpdate, NewItem},
  store::AssistanceStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /items`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<AssistanceItem>>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let items = store.list_items().await.map_err(ApiError::from_store)?;
  Ok(Json(items))
}

/// `POST /items`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewItem>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let item = store.create_item(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /items/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ItemUpdate>,
) -> Result<Json<AssistanceItem>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let item = store
    .update_item(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(item))
}

/// `DELETE /items/:id`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.delete_item(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
