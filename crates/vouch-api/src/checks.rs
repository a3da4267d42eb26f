//! Handlers for `/checks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/checks/:id` | Single check |
//! | `POST` | `/checks/:id/execute` | Run the comparison now |
//! | `POST` | `/checks/:id/requests` | Body: [`IssueBody`]; returns 201 + request |
//! | `GET`  | `/checks/:id/request` | Most recent request for the check |
//! | `POST` | `/checks/:id/review` | Supervisor only. Body: [`ReviewBody`] |
//! | `POST` | `/checks/:id/zone` | Supervisor only. Body: [`ZoneBody`] |
//! | `GET`  | `/checks/:id/activity` | Audit trail, oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityLogEntry, EntityType},
  check::{Check, CheckStatus, Zone},
  lifecycle::ReviewDecision,
  request::{ResponseChannel, VerificationRequest},
  store::VerificationStore,
};
use vouch_engine::{Backend, Controller};

use crate::{error::ApiError, supervisor::Supervisor};

/// `GET /checks/:id`
pub async fn get_one<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Check>, ApiError> {
  let check = controller
    .store()
    .get_check(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("check {id} not found")))?;
  Ok(Json(check))
}

/// `POST /checks/:id/execute`
pub async fn execute<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Check>, ApiError> {
  Ok(Json(controller.execute(id).await?))
}

// ─── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  /// HR mail address.
  pub contact: String,
  pub channel: Option<ResponseChannel>,
}

/// `POST /checks/:id/requests`
pub async fn issue_request<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<IssueBody>,
) -> Result<impl IntoResponse, ApiError> {
  let request = controller
    .issue_request(id, &body.contact, body.channel)
    .await?;
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /checks/:id/request`
pub async fn latest_request<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<VerificationRequest>, ApiError> {
  let request = controller
    .store()
    .request_for_check(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no request issued for check {id}")))?;
  Ok(Json(request))
}

// ─── Supervision ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: ReviewDecision,
  pub note:     Option<String>,
}

/// `POST /checks/:id/review`
pub async fn review<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Supervisor(reviewer): Supervisor,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Check>, ApiError> {
  let check = controller
    .review(id, body.decision, &reviewer, body.note)
    .await?;
  Ok(Json(check))
}

#[derive(Debug, Deserialize)]
pub struct ZoneBody {
  pub zone:   Zone,
  pub status: Option<CheckStatus>,
  pub note:   Option<String>,
}

/// `POST /checks/:id/zone`
pub async fn reassign_zone<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Supervisor(supervisor): Supervisor,
  Path(id): Path<Uuid>,
  Json(body): Json<ZoneBody>,
) -> Result<Json<Check>, ApiError> {
  // The reassignment payload has no reviewer field; keep who did it in the
  // note.
  let note = match body.note {
    Some(note) => format!("{supervisor}: {note}"),
    None => supervisor,
  };
  let check = controller
    .reassign_zone(id, body.zone, body.status, Some(note))
    .await?;
  Ok(Json(check))
}

// ─── Activity ─────────────────────────────────────────────────────────────────

/// `GET /checks/:id/activity`
pub async fn activity<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActivityLogEntry>>, ApiError> {
  let entries = controller
    .store()
    .list_activity(EntityType::Check, Some(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}
