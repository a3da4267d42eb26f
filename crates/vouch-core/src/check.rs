//! Checks: one verifiable fact domain within a case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{compare::Discrepancy, fact::{FactField, FactRecord}};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// The fact domain a check verifies.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
  Employment,
  Education,
  Crime,
}

/// Where a check is in its lifecycle. `Verified` and `Rejected` are only
/// reachable through a supervisor review.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
  Verified,
  Rejected,
}

impl CheckStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      Self::Completed | Self::Failed | Self::Verified | Self::Rejected
    )
  }
}

/// Risk bucket. `Unset` until the check first executes; `Pending` while an
/// employment check waits for the employer's reply.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
  #[default]
  Unset,
  Pending,
  Green,
  Yellow,
  Red,
}

impl Zone {
  /// Green, yellow and red are the zones a comparison can produce.
  pub fn is_resolved(self) -> bool {
    matches!(self, Self::Green | Self::Yellow | Self::Red)
  }
}

// ─── Check ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
  pub check_id:       Uuid,
  pub case_id:        Uuid,
  pub check_type:     CheckType,
  pub claimed:        FactRecord,
  pub status:         CheckStatus,
  pub zone:           Zone,
  pub risk_score:     Option<u8>,
  pub discrepancies:  Vec<Discrepancy>,
  pub matches:        Vec<FactField>,
  pub match_rate:     Option<f64>,
  /// What the employer reported; `None` until a response arrives.
  pub verified:       Option<FactRecord>,
  /// Narrative summary; advisory only.
  pub summary:        Option<String>,
  /// Free text kept when a reply could not be parsed into fields.
  pub response_note:  Option<String>,
  pub failure_reason: Option<String>,
  pub created_at:     DateTime<Utc>,
  pub started_at:     Option<DateTime<Utc>>,
  pub completed_at:   Option<DateTime<Utc>>,
  /// Compare-and-set token; bumped by the store on every write.
  pub version:        u64,
}

/// Input to [`crate::store::VerificationStore::add_check`].
#[derive(Debug, Clone)]
pub struct NewCheck {
  pub case_id:    Uuid,
  pub check_type: CheckType,
  pub claimed:    FactRecord,
}

impl Check {
  /// A freshly opened check: pending, no zone, no score.
  pub fn open(input: NewCheck, now: DateTime<Utc>) -> Self {
    Self {
      check_id:       Uuid::new_v4(),
      case_id:        input.case_id,
      check_type:     input.check_type,
      claimed:        input.claimed,
      status:         CheckStatus::Pending,
      zone:           Zone::Unset,
      risk_score:     None,
      discrepancies:  Vec::new(),
      matches:        Vec::new(),
      match_rate:     None,
      verified:       None,
      summary:        None,
      response_note:  None,
      failure_reason: None,
      created_at:     now,
      started_at:     None,
      completed_at:   None,
      version:        0,
    }
  }
}
