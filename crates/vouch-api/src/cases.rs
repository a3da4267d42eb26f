//! Handlers for `/cases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cases` | Optional `?clientId=` |
//! | `POST` | `/cases` | Body: [`CreateBody`]; returns 201 + case and checks |
//! | `GET`  | `/cases/:id` | Case with its checks |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_core::{
  case::Case,
  check::Check,
  store::VerificationStore,
};
use vouch_engine::{Backend, CheckSpec, Controller};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub client_id: Option<Uuid>,
}

/// `GET /cases[?clientId=<id>]`
pub async fn list<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Case>>, ApiError> {
  let cases = controller
    .store()
    .list_cases(params.client_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(cases))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub client_id:     Uuid,
  pub employee_name: String,
  pub checks:        Vec<CheckSpec>,
}

/// `POST /cases`
pub async fn create<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let opened = controller
    .open_case(body.client_id, &body.employee_name, body.checks)
    .await?;
  Ok((StatusCode::CREATED, Json(opened)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
  pub case:   Case,
  pub checks: Vec<Check>,
}

/// `GET /cases/:id`
pub async fn get_one<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CaseDetail>, ApiError> {
  let store = controller.store();
  let case = store
    .get_case(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("case {id} not found")))?;
  let checks = store.list_checks(id).await.map_err(ApiError::store)?;
  Ok(Json(CaseDetail { case, checks }))
}
