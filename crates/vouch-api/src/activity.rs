//! `GET /activity?entityType=<type>[&entityId=<id>]`: the audit log for any
//! entity kind, oldest first.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use uuid::Uuid;
use vouch_core::{
  activity::{ActivityLogEntry, EntityType},
  store::VerificationStore,
};
use vouch_engine::{Backend, Controller};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParams {
  pub entity_type: EntityType,
  pub entity_id:   Option<Uuid>,
}

pub async fn list<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityLogEntry>>, ApiError> {
  let entries = controller
    .store()
    .list_activity(params.entity_type, params.entity_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}
