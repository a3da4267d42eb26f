//! Clients and cases: the envelopes that own checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::check::{Check, CheckStatus, Zone};

/// An organisation purchasing verification services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
  pub client_id:  Uuid,
  pub name:       String,
  /// Service-tier label; selects the rule configuration.
  pub tier:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
  Open,
  InProgress,
  AwaitingReview,
  Completed,
}

/// One candidate's verification job for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
  pub case_id:       Uuid,
  pub client_id:     Uuid,
  pub employee_name: String,
  pub status:        CaseStatus,
  /// Worst resolved zone among the case's checks.
  pub risk_level:    Option<Zone>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::VerificationStore::add_case`].
#[derive(Debug, Clone)]
pub struct NewCase {
  pub client_id:     Uuid,
  pub employee_name: String,
}

/// Recompute a case's aggregate status and risk level from its checks.
///
/// - any check still pending or running → `IN_PROGRESS` (or `OPEN` if none
///   has started);
/// - all terminal, some completed but unreviewed → `AWAITING_REVIEW`;
/// - all reviewed or failed → `COMPLETED`.
pub fn aggregate(checks: &[Check]) -> (CaseStatus, Option<Zone>) {
  let risk_level = checks
    .iter()
    .map(|c| c.zone)
    .filter(|z| z.is_resolved())
    .max();

  let status = if checks.is_empty()
    || checks.iter().all(|c| {
      c.status == CheckStatus::Pending && c.started_at.is_none()
    }) {
    CaseStatus::Open
  } else if checks.iter().any(|c| !c.status.is_terminal()) {
    CaseStatus::InProgress
  } else if checks.iter().any(|c| c.status == CheckStatus::Completed) {
    CaseStatus::AwaitingReview
  } else {
    CaseStatus::Completed
  };

  (status, risk_level)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::check::{CheckType, NewCheck};

  fn check(status: CheckStatus, zone: Zone) -> Check {
    let mut c = Check::open(
      NewCheck {
        case_id:    Uuid::nil(),
        check_type: CheckType::Employment,
        claimed:    Default::default(),
      },
      Utc::now(),
    );
    c.status = status;
    c.zone = zone;
    if status != CheckStatus::Pending {
      c.started_at = Some(Utc::now());
    }
    c
  }

  #[test]
  fn untouched_case_is_open() {
    let (status, risk) = aggregate(&[check(CheckStatus::Pending, Zone::Unset)]);
    assert_eq!(status, CaseStatus::Open);
    assert_eq!(risk, None);
  }

  #[test]
  fn risk_level_is_worst_resolved_zone() {
    let (status, risk) = aggregate(&[
      check(CheckStatus::Completed, Zone::Green),
      check(CheckStatus::Completed, Zone::Red),
      check(CheckStatus::InProgress, Zone::Pending),
    ]);
    assert_eq!(status, CaseStatus::InProgress);
    assert_eq!(risk, Some(Zone::Red));
  }

  #[test]
  fn completed_checks_await_review() {
    let (status, _) = aggregate(&[
      check(CheckStatus::Completed, Zone::Yellow),
      check(CheckStatus::Verified, Zone::Green),
    ]);
    assert_eq!(status, CaseStatus::AwaitingReview);

    let (status, _) = aggregate(&[
      check(CheckStatus::Rejected, Zone::Red),
      check(CheckStatus::Failed, Zone::Unset),
    ]);
    assert_eq!(status, CaseStatus::Completed);
  }
}
