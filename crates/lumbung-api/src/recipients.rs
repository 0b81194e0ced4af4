//! Handlers for recipient endpoints — enrollment and distribution tracking.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/programs/:id/recipients` | `?status=&search=&limit=&offset=` |
//! | `POST`   | `/programs/:id/recipients` | Body: `{"kind":"family","id":…}` |
//! | `POST`   | `/programs/:id/recipients/batch` | Best-effort bulk enroll |
//! | `GET`    | `/programs/:id/available-beneficiaries` | `?area=&search=…` |
//! | `GET`    | `/recipients/:id` | 404 if missing or unenrolled |
//! | `POST`   | `/recipients/:id/distribution` | Status update + cascade |
//! | `DELETE` | `/recipients/:id` | Soft delete (re-enrollable) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use lumbung_core::{
  recipient::{
    BatchEnrollment, BeneficiaryCandidate, BeneficiaryRef, DeliveryStatus,
    DistributionUpdate, Recipient,
  },
  store::{AssistanceStore, BeneficiaryFilter, RecipientFilter},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, actor_id};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<DeliveryStatus>,
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /programs/:id/recipients`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Recipient>>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = RecipientFilter {
    status: params.status,
    search: params.search,
    limit:  params.limit,
    offset: params.offset,
  };
  let recipients = store
    .list_recipients(id, &filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(recipients))
}

// ─── Enroll ──────────────────────────────────────────────────────────────────

/// `POST /programs/:id/recipients`
pub async fn enroll<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<BeneficiaryRef>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let recipient = store
    .enroll(id, body, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(recipient)))
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  pub beneficiaries: Vec<BeneficiaryRef>,
}

/// `POST /programs/:id/recipients/batch`
///
/// Always 200 when the program exists; per-beneficiary failures ride along
/// in the response body rather than failing the request.
pub async fn enroll_batch<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<BatchBody>,
) -> Result<Json<BatchEnrollment>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let report = store
    .enroll_batch(id, body.beneficiaries, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report))
}

// ─── Available beneficiaries ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AvailableParams {
  pub area:   Option<String>,
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /programs/:id/available-beneficiaries`
pub async fn available<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AvailableParams>,
) -> Result<Json<Vec<BeneficiaryCandidate>>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = BeneficiaryFilter {
    area:   params.area,
    search: params.search,
    limit:  params.limit,
    offset: params.offset,
  };
  let candidates = store
    .list_available_beneficiaries(id, &filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(candidates))
}

// ─── Single recipient ────────────────────────────────────────────────────────

/// `GET /recipients/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Recipient>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let recipient = store
    .get_recipient(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("recipient {id} not found")))?;
  Ok(Json(recipient))
}

/// `POST /recipients/:id/distribution`
pub async fn update_distribution<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<DistributionUpdate>,
) -> Result<Json<Recipient>, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let actor = actor_id(&headers)?;
  let recipient = store
    .update_distribution(id, body, actor)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(recipient))
}

/// `DELETE /recipients/:id`
pub async fn unenroll<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: AssistanceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.unenroll(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
