//! Handlers for `/requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/requests` | Optional `?status=PENDING\|RESPONDED\|CLOSED` |
//! | `POST` | `/requests` | Standalone request, not tied to a case; returns 201 |
//! | `GET`  | `/requests/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use vouch_core::{
  fact::FactRecord,
  request::{RequestStatus, ResponseChannel, VerificationRequest},
  store::VerificationStore,
};
use vouch_engine::{Backend, Controller};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<RequestStatus>,
}

/// `GET /requests[?status=<status>]`
pub async fn list<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<VerificationRequest>>, ApiError> {
  let requests = controller
    .store()
    .list_requests(params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(requests))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub claimed: FactRecord,
  pub contact: String,
  pub channel: Option<ResponseChannel>,
}

/// `POST /requests`
pub async fn create<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let request = controller
    .issue_standalone_request(body.claimed, &body.contact, body.channel)
    .await?;
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /requests/:id`
pub async fn get_one<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<VerificationRequest>, ApiError> {
  let request = controller
    .store()
    .get_request(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("request {id} not found")))?;
  Ok(Json(request))
}
