//! Stateless helpers: run the comparator or the normalizer on ad-hoc input.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/compare` | Body: [`CompareBody`]; returns the comparison result |
//! | `POST` | `/extract` | Body: an inbound message; returns what would be read from it |

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vouch_core::{
  activity::CorrelationSource,
  compare::{ComparisonResult, compare},
  fact::FactRecord,
  rules::RuleConfig,
};
use vouch_engine::{Backend, Controller};
use vouch_extract::{Correlation, Extraction, InboundMessage, correlate, normalize};

#[derive(Debug, Deserialize)]
pub struct CompareBody {
  pub claimed:  FactRecord,
  pub verified: FactRecord,
  /// Explicit rules; wins over `tier`.
  pub rules:    Option<RuleConfig>,
  /// Use the configured rules of this tier.
  pub tier:     Option<String>,
}

/// `POST /compare`
pub async fn compare_records<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(body): Json<CompareBody>,
) -> Json<ComparisonResult> {
  let rules = body.rules.unwrap_or_else(|| {
    *controller
      .rules()
      .for_tier(body.tier.as_deref().unwrap_or_default())
  });
  Json(compare(&body.claimed, &body.verified, &rules))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
  pub extraction:  Extraction,
  /// The check the message would be attributed to, if any.
  pub check_id:    Option<Uuid>,
  pub correlation: Option<CorrelationSource>,
}

/// `POST /extract`
pub async fn extract<B: Backend>(
  State(controller): State<Arc<Controller<B>>>,
  Json(message): Json<InboundMessage>,
) -> Json<ExtractResponse> {
  let (check_id, correlation) = match correlate(&message, &controller.registry()) {
    Correlation::Matched { check_id, source } => (Some(check_id), Some(source)),
    Correlation::Unresolved => (None, None),
  };
  Json(ExtractResponse { extraction: normalize(&message.body), check_id, correlation })
}
