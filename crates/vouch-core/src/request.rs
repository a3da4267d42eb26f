//! Verification requests: a single outreach attempt and its event history.
//!
//! The event list is append-only and is the only record of how many
//! reminders were sent. There is no separate counter to drift out of sync.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, fact::FactRecord};

// ─── Channel ─────────────────────────────────────────────────────────────────

/// How the employer is expected to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseChannel {
  /// A shared spreadsheet the HR contact fills in.
  Sheet {
    #[serde(rename = "documentRef")]
    document_ref: String,
  },
  /// A free-text reply to the outbound message.
  Mailbox,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
  Pending,
  Responded,
  Closed,
}

// ─── Outreach events ─────────────────────────────────────────────────────────

/// The type of one notification. Serialised as `INITIAL`, `REMINDER_<n>` or
/// `ESCALATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum OutreachKind {
  Initial,
  /// The n-th reminder, counting from 1.
  Reminder(u32),
  Escalation,
}

impl fmt::Display for OutreachKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Initial => f.write_str("INITIAL"),
      Self::Reminder(n) => write!(f, "REMINDER_{n}"),
      Self::Escalation => f.write_str("ESCALATION"),
    }
  }
}

impl FromStr for OutreachKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "INITIAL" => Ok(Self::Initial),
      "ESCALATION" => Ok(Self::Escalation),
      other => other
        .strip_prefix("REMINDER_")
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .map(Self::Reminder)
        .ok_or_else(|| Error::UnknownOutreachKind(other.to_owned())),
    }
  }
}

impl From<OutreachKind> for String {
  fn from(kind: OutreachKind) -> Self { kind.to_string() }
}

impl TryFrom<String> for OutreachKind {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

/// One notification sent for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachEvent {
  pub kind:       OutreachKind,
  pub at:         DateTime<Utc>,
  pub message_id: Option<String>,
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
  pub request_id: Uuid,
  /// `None` for standalone requests not tied to a case.
  pub check_id:   Option<Uuid>,
  pub claimed:    FactRecord,
  pub contact:    String,
  pub channel:    Option<ResponseChannel>,
  pub status:     RequestStatus,
  pub created_at: DateTime<Utc>,
  pub events:     Vec<OutreachEvent>,
}

/// Input to [`crate::store::VerificationStore::add_request`].
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub check_id: Option<Uuid>,
  pub claimed:  FactRecord,
  pub contact:  String,
  pub channel:  Option<ResponseChannel>,
}

impl VerificationRequest {
  /// When the most recent notification went out, or creation time if none.
  pub fn last_outreach_at(&self) -> DateTime<Utc> {
    self
      .events
      .iter()
      .map(|e| e.at)
      .max()
      .unwrap_or(self.created_at)
  }

  pub fn reminders_sent(&self) -> u32 {
    self
      .events
      .iter()
      .filter(|e| matches!(e.kind, OutreachKind::Reminder(_)))
      .count() as u32
  }

  pub fn has_event(&self, kind: OutreachKind) -> bool {
    self.events.iter().any(|e| e.kind == kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outreach_kind_string_forms() {
    assert_eq!(OutreachKind::Reminder(2).to_string(), "REMINDER_2");
    assert_eq!(
      "REMINDER_12".parse::<OutreachKind>().unwrap(),
      OutreachKind::Reminder(12)
    );
    assert_eq!(
      "ESCALATION".parse::<OutreachKind>().unwrap(),
      OutreachKind::Escalation
    );
    assert!("REMINDER_0".parse::<OutreachKind>().is_err());
    assert!("REMINDER".parse::<OutreachKind>().is_err());
  }

  #[test]
  fn channel_serialises_with_kind_tag() {
    let channel = ResponseChannel::Sheet { document_ref: "abc".into() };
    let json = serde_json::to_value(&channel).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "sheet", "documentRef": "abc"}));
  }

  #[test]
  fn reminder_count_comes_from_events() {
    let t0 = Utc::now();
    let request = VerificationRequest {
      request_id: Uuid::new_v4(),
      check_id:   None,
      claimed:    FactRecord::default(),
      contact:    "hr@example.com".into(),
      channel:    Some(ResponseChannel::Mailbox),
      status:     RequestStatus::Pending,
      created_at: t0,
      events:     vec![
        OutreachEvent { kind: OutreachKind::Initial, at: t0, message_id: None },
        OutreachEvent {
          kind:       OutreachKind::Reminder(1),
          at:         t0 + chrono::Duration::hours(48),
          message_id: None,
        },
      ],
    };
    assert_eq!(request.reminders_sent(), 1);
    assert_eq!(request.last_outreach_at(), t0 + chrono::Duration::hours(48));
    assert!(!request.has_event(OutreachKind::Escalation));
  }
}
