//! Handlers for `/programs` endpoints, including the program-item ledger.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/programs` | |
//! | `POST`   | `/programs` | Requires `x-actor-id` |
//! | `GET`    | `/programs/:id` | 404 if not found |
//! | `PUT`    | `/programs/:id` | Partial update; may trigger completion |
//! | `DELETE` | `/programs/:id` | Hard delete, cascades |
//! | `POST`   | `/programs/:id/complete` | Idempotent |
//! | `GET`    | `/programs/:id/items` | |
//! | `POST`   | `/programs/:id/items` | Body: `{"item_id":…,"quantity":10}` |
//! | `PUT`    | `/program-items/:id` | Body: `{"quantity":12.5}` |
//! | `DELETE` | `/program-items/:id` | Soft delete |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use lumbung_core::{
  program::{AssistanceProgram, NewProgram, ProgramItem, ProgramUpdate},
  store::AssistanceStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, actor_id};

// ─── Programs ────────────────────────────────────────────────────────────────

/// `GET /programs`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<AssistanceProgram>>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let programs = store.list_programs().await.map_err(ApiError::from_store)?;
  Ok(Json(programs))
}

/// `POST /programs`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  headers: HeaderMap,
  Json(body): Json<NewProgram>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let program = store
    .create_program(body, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(program)))
}

/// `GET /programs/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AssistanceProgram>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let program = store
    .get_program(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("program {id} not found")))?;
  Ok(Json(program))
}

/// `PUT /programs/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<ProgramUpdate>,
) -> Result<Json<AssistanceProgram>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let program = store
    .update_program(id, body, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(program))
}

/// `DELETE /programs/:id`
pub async fn remove<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .delete_program(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /programs/:id/complete`
pub async fn complete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Json<AssistanceProgram>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let program = store
    .complete_program(id, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(program))
}

// ─── Program-item ledger ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttachBody {
  pub item_id:  Uuid,
  pub quantity: f64,
}

/// `GET /programs/:id/items`
pub async fn list_items<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProgramItem>>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let lines = store
    .list_program_items(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(lines))
}

/// `POST /programs/:id/items`
pub async fn attach<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AttachBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let line = store
    .attach_item(id, body.item_id, body.quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(line)))
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
  pub quantity: f64,
}

/// `PUT /program-items/:id`
pub async fn update_quantity<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<QuantityBody>,
) -> Result<Json<ProgramItem>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let line = store
    .update_quantity(id, body.quantity)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(line))
}

/// `DELETE /program-items/:id`
pub async fn detach<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.detach_item(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
