//! The append-only activity log.
//!
//! Each entry's metadata is a typed payload selected by its action tag rather
//! than a free-form bag of optional fields. The log doubles as the source from
//! which the reply-correlation registry is rebuilt (see `EMAIL_SENT`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  Result,
  check::{CheckStatus, Zone},
  fact::{FactField, ResponseMethod},
  lifecycle::ReviewDecision,
  request::OutreachKind,
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
  Client,
  Case,
  Check,
  Request,
}

/// Which strategy tied an inbound reply to its check.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationSource {
  Thread,
  SubjectTag,
  BodyReference,
}

// ─── Action payloads ─────────────────────────────────────────────────────────

/// What happened, with its structured metadata. The variant name is the
/// `action` column; the payload is the `metadata` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
  tag = "action",
  content = "metadata",
  rename_all = "SCREAMING_SNAKE_CASE",
  rename_all_fields = "camelCase"
)]
pub enum ActivityAction {
  ClientRegistered {
    name: String,
    tier: String,
  },
  ClientTierChanged {
    previous_tier: String,
    new_tier:      String,
  },
  CaseOpened {
    check_ids: Vec<Uuid>,
  },
  EmailSent {
    request_id: Uuid,
    /// Transport-assigned id of the outbound message; the correlation key for
    /// replies that keep thread headers.
    message_id: String,
    to:         String,
    subject:    String,
    kind:       OutreachKind,
  },
  HrResponded {
    request_id:  Option<Uuid>,
    method:      ResponseMethod,
    correlation: CorrelationSource,
    message_id:  Option<String>,
    from:        Option<String>,
    fields:      Vec<FactField>,
  },
  CheckStarted,
  AwaitingReply,
  ComparisonCompleted {
    risk_score:        u8,
    zone:              Zone,
    discrepancy_count: usize,
    match_rate:        f64,
    advisory_failed:   bool,
  },
  CheckFailed {
    reason: String,
  },
  SupervisorReview {
    decision:        ReviewDecision,
    reviewer:        String,
    previous_zone:   Zone,
    previous_status: CheckStatus,
    new_zone:        Zone,
    new_status:      CheckStatus,
  },
  ZoneReassigned {
    previous_zone:   Zone,
    new_zone:        Zone,
    previous_status: CheckStatus,
    new_status:      CheckStatus,
  },
}

impl ActivityAction {
  /// The tag stored in the `action` column.
  /// Must match the `rename_all = "SCREAMING_SNAKE_CASE"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::ClientRegistered { .. } => "CLIENT_REGISTERED",
      Self::ClientTierChanged { .. } => "CLIENT_TIER_CHANGED",
      Self::CaseOpened { .. } => "CASE_OPENED",
      Self::EmailSent { .. } => "EMAIL_SENT",
      Self::HrResponded { .. } => "HR_RESPONDED",
      Self::CheckStarted => "CHECK_STARTED",
      Self::AwaitingReply => "AWAITING_REPLY",
      Self::ComparisonCompleted { .. } => "COMPARISON_COMPLETED",
      Self::CheckFailed { .. } => "CHECK_FAILED",
      Self::SupervisorReview { .. } => "SUPERVISOR_REVIEW",
      Self::ZoneReassigned { .. } => "ZONE_REASSIGNED",
    }
  }

  /// Serialise the payload (without the tag) for the `metadata` column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(
      full
        .get("metadata")
        .cloned()
        .unwrap_or(serde_json::Value::Null),
    )
  }

  /// Rebuild from the stored tag and payload.
  pub fn from_parts(action: &str, metadata: serde_json::Value) -> Result<Self> {
    let wrapped = if metadata.is_null() {
      serde_json::json!({ "action": action })
    } else {
      serde_json::json!({ "action": action, "metadata": metadata })
    };
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
  pub entry_id:    Uuid,
  pub entity_type: EntityType,
  pub entity_id:   Uuid,
  #[serde(flatten)]
  pub action:      ActivityAction,
  pub note:        String,
  /// Server-assigned; never changes after creation.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::VerificationStore::append_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub entity_type: EntityType,
  pub entity_id:   Uuid,
  pub action:      ActivityAction,
  pub note:        String,
}

impl NewActivity {
  pub fn check(check_id: Uuid, action: ActivityAction, note: impl Into<String>) -> Self {
    Self {
      entity_type: EntityType::Check,
      entity_id: check_id,
      action,
      note: note.into(),
    }
  }
}
