//! Handlers for `/clients` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/clients` | All clients |
//! | `POST` | `/clients` | Body: `{"name":"…","tier":"…"}`; returns 201 |
//! | `GET`  | `/clients/:id` | 404 if not found |
//! | `PUT`  | `/clients/:id/tier` | Body: `{"tier":"…"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;
use vouch_core::{case::Client, store::VerificationStore};
use vouch_engine::{Backend, Controller};

use crate::error::ApiError;

const DEFAULT_TIER: &str = "standard";

/// `GET /clients`
pub async fn list<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
) -> Result<Json<Vec<Client>>, ApiError> {
  let clients = controller
    .store()
    .list_clients()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(clients))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
  pub tier: Option<String>,
}

/// `POST /clients`
pub async fn create<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let tier = body.tier.as_deref().unwrap_or(DEFAULT_TIER);
  let client = controller.register_client(&body.name, tier).await?;
  Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /clients/:id`
pub async fn get_one<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Client>, ApiError> {
  let client = controller
    .store()
    .get_client(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;
  Ok(Json(client))
}

#[derive(Debug, Deserialize)]
pub struct TierBody {
  pub tier: String,
}

/// `PUT /clients/:id/tier`
pub async fn set_tier<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TierBody>,
) -> Result<Json<Client>, ApiError> {
  if body.tier.trim().is_empty() {
    return Err(ApiError::BadRequest("tier must not be empty".into()));
  }
  Ok(Json(controller.set_client_tier(id, &body.tier).await?))
}
