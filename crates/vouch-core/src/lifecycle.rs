//! The check state machine.
//!
//! `PENDING → IN_PROGRESS → COMPLETED | FAILED`, with supervisor review moving
//! a completed check to `VERIFIED` or `REJECTED`. Transitions are pure: the
//! caller loads a [`Check`], applies a [`CheckUpdate`] and persists the
//! returned value in a single write. Score and zone therefore always land in
//! the same update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  check::{Check, CheckStatus, Zone},
  compare::ComparisonResult,
  fact::FactRecord,
};

/// A supervisor's verdict on a resolved check.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
  Approved,
  Rejected,
}

impl ReviewDecision {
  pub fn outcome(self) -> (CheckStatus, Zone) {
    match self {
      Self::Approved => (CheckStatus::Verified, Zone::Green),
      Self::Rejected => (CheckStatus::Rejected, Zone::Red),
    }
  }
}

/// A requested change to a check.
#[derive(Debug, Clone)]
pub enum CheckUpdate {
  /// `PENDING → IN_PROGRESS`.
  Start,
  /// `IN_PROGRESS → PENDING`: no verified data yet. Score 0, zone `PENDING`.
  AwaitReply,
  /// Store what the employer sent without changing status.
  RecordResponse {
    verified: Option<FactRecord>,
    note:     Option<String>,
  },
  /// `IN_PROGRESS → COMPLETED` with the comparator's result.
  Resolve {
    result:  ComparisonResult,
    summary: Option<String>,
  },
  /// `PENDING | IN_PROGRESS → FAILED`. Zone is left alone.
  Fail { reason: String },
  /// `FAILED → PENDING`, so a request can be issued again.
  Reopen,
  /// Supervisor verdict on a terminal, non-failed check.
  Review { decision: ReviewDecision },
  /// Manual move between resolved zones, optionally with a new status.
  Reassign {
    zone:   Zone,
    status: Option<CheckStatus>,
  },
}

impl CheckUpdate {
  fn action(&self) -> &'static str {
    match self {
      Self::Start => "start",
      Self::AwaitReply => "await a reply",
      Self::RecordResponse { .. } => "record a response",
      Self::Resolve { .. } => "resolve",
      Self::Fail { .. } => "fail",
      Self::Reopen => "reopen",
      Self::Review { .. } => "be reviewed",
      Self::Reassign { .. } => "be reassigned",
    }
  }
}

impl Check {
  /// Apply `update`, returning the next state or an error if the transition is
  /// not allowed from the current status. `version` is left for the store to
  /// bump.
  pub fn apply(&self, update: CheckUpdate, now: DateTime<Utc>) -> Result<Check> {
    use CheckStatus as S;

    let invalid = |update: &CheckUpdate| Error::InvalidTransition {
      check_id: self.check_id,
      status:   self.status,
      action:   update.action(),
    };

    let mut next = self.clone();
    match update {
      CheckUpdate::Start => {
        if self.status != S::Pending {
          return Err(invalid(&update));
        }
        next.status = S::InProgress;
        next.started_at = Some(now);
        next.failure_reason = None;
      }
      CheckUpdate::AwaitReply => {
        if self.status != S::InProgress {
          return Err(invalid(&update));
        }
        next.status = S::Pending;
        next.risk_score = Some(0);
        next.zone = Zone::Pending;
      }
      CheckUpdate::RecordResponse { ref verified, ref note } => {
        if !matches!(self.status, S::Pending | S::InProgress) {
          return Err(invalid(&update));
        }
        if let Some(v) = verified {
          next.verified = Some(v.clone());
        }
        if let Some(n) = note {
          next.response_note = Some(n.clone());
        }
      }
      CheckUpdate::Resolve { result, summary } => {
        if self.status != S::InProgress {
          return Err(Error::InvalidTransition {
            check_id: self.check_id,
            status:   self.status,
            action:   "resolve",
          });
        }
        next.status = S::Completed;
        next.risk_score = Some(result.risk_score);
        next.zone = result.zone;
        next.discrepancies = result.discrepancies;
        next.matches = result.matches;
        next.match_rate = Some(result.match_rate);
        next.summary = summary;
        next.completed_at = Some(now);
      }
      CheckUpdate::Fail { reason } => {
        if !matches!(self.status, S::Pending | S::InProgress) {
          return Err(Error::InvalidTransition {
            check_id: self.check_id,
            status:   self.status,
            action:   "fail",
          });
        }
        next.status = S::Failed;
        next.failure_reason = Some(reason);
        next.completed_at = Some(now);
      }
      CheckUpdate::Reopen => {
        if self.status != S::Failed {
          return Err(invalid(&update));
        }
        next.status = S::Pending;
        next.failure_reason = None;
        next.started_at = None;
        next.completed_at = None;
      }
      CheckUpdate::Review { decision } => {
        if !matches!(self.status, S::Completed | S::Verified | S::Rejected) {
          return Err(invalid(&update));
        }
        let (status, zone) = decision.outcome();
        next.status = status;
        next.zone = zone;
      }
      CheckUpdate::Reassign { zone, status } => {
        if !self.zone.is_resolved() {
          return Err(Error::ZoneNotReassignable {
            check_id: self.check_id,
            zone:     self.zone,
          });
        }
        if !zone.is_resolved() {
          return Err(Error::NotATerminalZone(zone));
        }
        next.zone = zone;
        if let Some(status) = status {
          next.status = status;
        }
      }
    }
    Ok(next)
  }
}
