//! `POST /replies`: push one inbound message through correlation and
//! ingestion, for transports that deliver mail by webhook instead of a polled
//! mailbox.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;
use uuid::Uuid;
use vouch_core::{activity::CorrelationSource, check::Check, fact::ResponseMethod};
use vouch_engine::{Backend, Controller, Ingested};
use vouch_extract::InboundMessage;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
  pub matched:     bool,
  pub check_id:    Option<Uuid>,
  pub correlation: Option<CorrelationSource>,
  pub method:      Option<ResponseMethod>,
  pub check:       Option<Check>,
}

impl From<Ingested> for IngestResponse {
  fn from(outcome: Ingested) -> Self {
    match outcome {
      Ingested::Unmatched => Self {
        matched:     false,
        check_id:    None,
        correlation: None,
        method:      None,
        check:       None,
      },
      Ingested::Matched { check_id, source, method, check } => Self {
        matched:     true,
        check_id:    Some(check_id),
        correlation: Some(source),
        method:      Some(method),
        check:       Some(check),
      },
    }
  }
}

/// `POST /replies`
pub async fn ingest<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(message): Json<InboundMessage>,
) -> Result<Json<IngestResponse>, ApiError> {
  let outcome = controller.ingest_reply(&message).await?;
  Ok(Json(outcome.into()))
}
